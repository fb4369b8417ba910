use axum::Json;
use axum::extract::State;
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::CronCaller;
use crate::models::cron::ExpirePlansResponse;
use crate::services::expiry;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/expire-plans",
    tag = "Cron",
    operation_id = "expirePlans",
    summary = "Expire lapsed plans",
    description = "Deactivates every active plan assignment and trial whose expiry has passed, then emails the owners. Authenticated with the cron secret as a bearer token. Safe to call repeatedly.",
    responses(
        (status = 200, description = "Run summary", body = ExpirePlansResponse),
        (status = 401, description = "Missing or wrong secret (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("cron_secret" = [])),
)]
#[instrument(skip_all)]
pub async fn expire_plans(
    _caller: CronCaller,
    State(state): State<AppState>,
) -> Result<Json<ExpirePlansResponse>, AppError> {
    let summary = expiry::expire_plans(&state).await?;
    info!(
        processed = summary.processed,
        expired = summary.expired,
        email_failures = summary.email_failures,
        "Cron plan expiry finished"
    );
    Ok(Json(summary))
}
