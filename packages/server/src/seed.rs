use chrono::Utc;
use lules_common::{PlanTier, permission};
use sea_orm::sea_query::{Index, IndexCreateStatement, OnConflict, PostgresQueryBuilder};
use sea_orm::*;
use tracing::{info, warn};

use crate::entity::{payment, plan, product, review, role, role_permission};

/// Default roles seeded on startup.
const DEFAULT_ROLES: &[&str] = &[role::DEFAULT_ROLE, "moderator", "billing", "super_admin"];

/// Default role-permission mappings seeded on startup.
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    ("super_admin", permission::ALL),
    // Moderator
    ("moderator", permission::BAN_USERS),
    ("moderator", permission::MANAGE_CONTENT),
    ("moderator", permission::VIEW_DASHBOARD),
    // Billing
    ("billing", permission::MANAGE_PAYMENTS),
    ("billing", permission::MANAGE_PLANS),
    ("billing", permission::VIEW_DASHBOARD),
];

struct PlanSeed {
    tier: PlanTier,
    name: &'static str,
    description: &'static str,
    price_cents: i64,
    max_products: i32,
    max_images_per_product: i32,
    has_statistics: bool,
}

const DEFAULT_PLANS: &[PlanSeed] = &[
    PlanSeed {
        tier: PlanTier::Free,
        name: "Gratis",
        description: "Para empezar a vender en Lules Market",
        price_cents: 0,
        max_products: 10,
        max_images_per_product: 1,
        has_statistics: false,
    },
    PlanSeed {
        tier: PlanTier::Basic,
        name: "Básico",
        description: "Más productos, más fotos y estadísticas",
        price_cents: 9_900,
        max_products: 50,
        max_images_per_product: 3,
        has_statistics: true,
    },
    PlanSeed {
        tier: PlanTier::Premium,
        name: "Premium",
        description: "Máxima visibilidad y catálogo amplio",
        price_cents: 19_900,
        max_products: 500,
        max_images_per_product: 8,
        has_statistics: true,
    },
];

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut roles_inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(OnConflict::column(role::Column::Name).do_nothing().to_owned())
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => roles_inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => perms_inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

/// Seed the three subscription plans. Existing plans are left untouched.
pub async fn seed_plans(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut inserted = 0u32;
    for seed in DEFAULT_PLANS {
        let model = plan::ActiveModel {
            tier: Set(seed.tier),
            name: Set(seed.name.to_string()),
            description: Set(seed.description.to_string()),
            price_cents: Set(seed.price_cents),
            max_products: Set(seed.max_products),
            max_images_per_product: Set(seed.max_images_per_product),
            has_statistics: Set(seed.has_statistics),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let result = plan::Entity::insert(model)
            .on_conflict(OnConflict::column(plan::Column::Tier).do_nothing().to_owned())
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if inserted > 0 {
        info!("Seeded {} plans", inserted);
    }

    Ok(())
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite indexes, so they are
/// created manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // One review per author and product, and per author and business.
    // NULL targets never collide, so each index only constrains its own kind.
    create_index(
        db,
        "idx_review_author_product",
        Index::create()
            .if_not_exists()
            .unique()
            .table(review::Entity)
            .col(review::Column::AuthorId)
            .col(review::Column::ProductId)
            .to_owned(),
        true,
    )
    .await?;
    create_index(
        db,
        "idx_review_author_business",
        Index::create()
            .if_not_exists()
            .unique()
            .table(review::Entity)
            .col(review::Column::AuthorId)
            .col(review::Column::BusinessId)
            .to_owned(),
        true,
    )
    .await?;

    // Storefront and plan-limit queries:
    // SELECT ... FROM product WHERE business_id = ? ORDER BY created_at DESC
    create_index(
        db,
        "idx_product_business_created",
        Index::create()
            .if_not_exists()
            .table(product::Entity)
            .col(product::Column::BusinessId)
            .col(product::Column::CreatedAt)
            .to_owned(),
        false,
    )
    .await?;

    // Admin payment queue: filter by status, newest first.
    create_index(
        db,
        "idx_payment_status_created",
        Index::create()
            .if_not_exists()
            .table(payment::Entity)
            .col(payment::Column::Status)
            .col(payment::Column::CreatedAt)
            .to_owned(),
        false,
    )
    .await?;

    Ok(())
}

/// Run a `CREATE INDEX`. Failures of required (unique) indexes are errors,
/// the rest are only logged.
async fn create_index(
    db: &DatabaseConnection,
    name: &str,
    mut stmt: IndexCreateStatement,
    required: bool,
) -> Result<(), DbErr> {
    let sql = stmt.name(name).to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&sql).await {
        Ok(_) => {
            info!("Ensured index {} exists", name);
            Ok(())
        }
        Err(e) if required => Err(e),
        Err(e) => {
            warn!("Failed to create index {}: {}", name, e);
            Ok(())
        }
    }
}
