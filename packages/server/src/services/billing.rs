//! Payment review and trial grants.

use chrono::{Duration, Utc};
use lules_common::{PaymentStatus, PlanTier, permission};
use sea_orm::sea_query::LockType;
use sea_orm::*;
use serde_json::json;
use tracing::{info, warn};

use crate::cache::tags;
use crate::entity::{business, payment, trial, user};
use crate::error::AppError;
use crate::mail::{EmailMessage, send_best_effort, templates};
use crate::models::payment::PAID_PLAN_DAYS;
use crate::services::moderation::load_admin;
use crate::services::{audit, plans};
use crate::state::AppState;

pub struct BillingService<'a> {
    state: &'a AppState,
}

impl<'a> BillingService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Approve a pending payment and activate its plan for [`PAID_PLAN_DAYS`].
    pub async fn approve_payment(
        &self,
        actor_id: i32,
        payment_id: i32,
    ) -> Result<payment::Model, AppError> {
        let db = &self.state.db;
        let admin = load_admin(db, actor_id, permission::MANAGE_PAYMENTS).await?;

        let now = Utc::now();
        let expires_at = now + Duration::days(PAID_PLAN_DAYS);

        let txn = db.begin().await?;
        let pending = lock_pending_payment(&txn, payment_id).await?;

        let mut active: payment::ActiveModel = pending.into();
        active.status = Set(PaymentStatus::Approved);
        active.reviewed_by_id = Set(Some(admin.id));
        active.reviewed_at = Set(Some(now));
        active.updated_at = Set(now);
        let approved = active.update(&txn).await?;

        plans::assign_plan(&txn, approved.business_id, approved.plan_id, Some(expires_at), false)
            .await?;
        audit::record(
            &txn,
            audit::PAYMENT_APPROVED,
            "payment",
            approved.id,
            Some(admin.id),
            json!({ "business_id": approved.business_id, "tier": approved.tier, "expires_at": expires_at }),
        )
        .await?;
        txn.commit().await?;

        info!(payment_id, admin_id = admin.id, business_id = approved.business_id, "Payment approved");
        self.invalidate_business(approved.business_id);

        let tier = approved.tier;
        self.notify_owner(approved.business_id, |to, name| {
            templates::payment_approved(to, name, tier, expires_at)
        })
        .await;

        Ok(approved)
    }

    pub async fn reject_payment(
        &self,
        actor_id: i32,
        payment_id: i32,
    ) -> Result<payment::Model, AppError> {
        let db = &self.state.db;
        let admin = load_admin(db, actor_id, permission::MANAGE_PAYMENTS).await?;

        let now = Utc::now();
        let txn = db.begin().await?;
        let pending = lock_pending_payment(&txn, payment_id).await?;

        let mut active: payment::ActiveModel = pending.into();
        active.status = Set(PaymentStatus::Rejected);
        active.reviewed_by_id = Set(Some(admin.id));
        active.reviewed_at = Set(Some(now));
        active.updated_at = Set(now);
        let rejected = active.update(&txn).await?;

        audit::record(
            &txn,
            audit::PAYMENT_REJECTED,
            "payment",
            rejected.id,
            Some(admin.id),
            json!({ "business_id": rejected.business_id, "tier": rejected.tier }),
        )
        .await?;
        txn.commit().await?;

        info!(payment_id, admin_id = admin.id, "Payment rejected");

        let tier = rejected.tier;
        self.notify_owner(rejected.business_id, |to, name| {
            templates::payment_rejected(to, name, tier)
        })
        .await;

        Ok(rejected)
    }

    /// Grant the business its single trial of a paid tier.
    pub async fn grant_trial(
        &self,
        actor_id: i32,
        business_id: i32,
        tier: PlanTier,
        days: i64,
    ) -> Result<trial::Model, AppError> {
        let db = &self.state.db;
        let admin = load_admin(db, actor_id, permission::MANAGE_PLANS).await?;

        let target = business::Entity::find_by_id(business_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Negocio no encontrado".into()))?;
        if target.is_banned {
            return Err(AppError::Conflict("El negocio está suspendido".into()));
        }

        let used_trial = trial::Entity::find()
            .filter(trial::Column::BusinessId.eq(business_id))
            .count(db)
            .await?
            > 0;
        if used_trial {
            return Err(AppError::Conflict(
                "El negocio ya utilizó su período de prueba".into(),
            ));
        }

        let effective = plans::resolve_effective_plan(db, business_id).await?;
        if effective.plan.tier.is_paid() {
            return Err(AppError::Conflict(
                "El negocio ya tiene un plan pago activo".into(),
            ));
        }

        let granted_plan = plans::find_plan_by_tier(db, tier).await?;
        let now = Utc::now();
        let expires_at = now + Duration::days(days);

        let txn = db.begin().await?;
        let model = trial::ActiveModel {
            business_id: Set(business_id),
            plan_id: Set(granted_plan.id),
            granted_by_id: Set(admin.id),
            starts_at: Set(now),
            expires_at: Set(expires_at),
            is_active: Set(true),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("El negocio ya utilizó su período de prueba".into())
            }
            _ => AppError::from(e),
        })?;
        plans::assign_plan(&txn, business_id, granted_plan.id, Some(expires_at), true).await?;
        audit::record(
            &txn,
            audit::TRIAL_GRANTED,
            "business",
            business_id,
            Some(admin.id),
            json!({ "tier": tier, "days": days }),
        )
        .await?;
        txn.commit().await?;

        info!(business_id, admin_id = admin.id, %tier, days, "Trial granted");
        self.invalidate_business(business_id);

        self.notify_owner(business_id, |to, name| {
            templates::trial_granted(to, name, tier, expires_at)
        })
        .await;

        Ok(model)
    }

    fn invalidate_business(&self, business_id: i32) {
        self.state.cache.invalidate_tags(&[
            tags::business(business_id),
            tags::BUSINESSES.to_string(),
            tags::PRODUCTS.to_string(),
        ]);
    }

    /// Email the owner of `business_id`. Failures are only logged.
    async fn notify_owner<F>(&self, business_id: i32, build: F)
    where
        F: FnOnce(&str, &str) -> EmailMessage,
    {
        let db = &self.state.db;
        let recipient = async {
            let Some(target) = business::Entity::find_by_id(business_id).one(db).await? else {
                return Ok(None);
            };
            let owner = user::Entity::find_by_id(target.owner_id).one(db).await?;
            Ok::<_, DbErr>(owner.map(|o| (o.email, target.name)))
        };

        match recipient.await {
            Ok(Some((email, name))) => {
                send_best_effort(self.state.mailer.as_ref(), build(&email, &name)).await;
            }
            Ok(None) => warn!(business_id, "No owner to notify"),
            Err(e) => warn!(business_id, error = %e, "Could not load notification recipient"),
        }
    }
}

async fn lock_pending_payment(
    txn: &DatabaseTransaction,
    payment_id: i32,
) -> Result<payment::Model, AppError> {
    let model = payment::Entity::find_by_id(payment_id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Pago no encontrado".into()))?;
    if model.status != PaymentStatus::Pending {
        return Err(AppError::Conflict("El pago ya fue procesado".into()));
    }
    Ok(model)
}
