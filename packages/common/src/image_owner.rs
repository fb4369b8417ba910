#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The parent record an uploaded image is attached to.
///
/// An image belongs to exactly one parent; logo and cover slots hold at most
/// one image each, products hold up to their plan's image limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum ImageOwner {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "product"))]
    Product,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "business_logo"))]
    BusinessLogo,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "business_cover"))]
    BusinessCover,
}

impl ImageOwner {
    /// Returns true when the slot holds a single image that is replaced on upload.
    pub fn is_single_slot(&self) -> bool {
        matches!(self, Self::BusinessLogo | Self::BusinessCover)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::BusinessLogo => "business_logo",
            Self::BusinessCover => "business_cover",
        }
    }
}

impl fmt::Display for ImageOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
