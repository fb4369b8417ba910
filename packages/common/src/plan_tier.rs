#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subscription tier bounding what a business may publish.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanTier {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "FREE"))]
    Free,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "BASIC"))]
    Basic,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "PREMIUM"))]
    Premium,
}

impl PlanTier {
    pub const ALL: &'static [PlanTier] = &[Self::Free, Self::Basic, Self::Premium];

    /// Ordering weight used when listing products: higher tiers surface first.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Basic => 1,
            Self::Premium => 2,
        }
    }

    /// Returns true for tiers that must be paid for (or granted as a trial).
    pub fn is_paid(&self) -> bool {
        !matches!(self, Self::Free)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Basic => "BASIC",
            Self::Premium => "PREMIUM",
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for PlanTier {
    fn default() -> Self {
        Self::Free
    }
}

/// Error when parsing an invalid tier string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTierError {
    invalid: String,
}

impl fmt::Display for ParseTierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Plan inválido '{}'. Valores válidos: {}",
            self.invalid,
            PlanTier::ALL
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseTierError {}

impl FromStr for PlanTier {
    type Err = ParseTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FREE" => Ok(Self::Free),
            "BASIC" => Ok(Self::Basic),
            "PREMIUM" => Ok(Self::Premium),
            _ => Err(ParseTierError {
                invalid: s.to_string(),
            }),
        }
    }
}
