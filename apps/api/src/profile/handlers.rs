//! Axum route handlers for the tailored-profile API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::claim::get_claims_for_user;
use crate::models::opportunity::{get_opportunity, get_requirements};
use crate::models::profile::TailoredProfileRow;
use crate::profile::cache::{get_or_generate, CacheStatus};
use crate::profile::generator::ProfileContext;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TailoredProfileRequest {
    pub user_id: Uuid,
    /// Forces deletion and full recomputation of the cached profile.
    #[serde(default)]
    pub regenerate: bool,
}

#[derive(Debug, Serialize)]
pub struct TailoredProfileResponse {
    pub profile: TailoredProfileRow,
    pub cached: bool,
    pub status: CacheStatus,
}

/// POST /api/v1/opportunities/:id/tailored-profile
///
/// Get-or-generate. The cached row comes back without any LLM call; with
/// `regenerate = true` the existing row is deleted and the whole pipeline
/// reruns. Generation failures abort atomically — no partial profile is
/// ever persisted.
pub async fn handle_tailored_profile(
    State(state): State<AppState>,
    Path(opportunity_id): Path<Uuid>,
    Json(request): Json<TailoredProfileRequest>,
) -> Result<Json<TailoredProfileResponse>, AppError> {
    if !state.rate_limiter.check(&request.user_id.to_string()) {
        return Err(AppError::RateLimited);
    }

    let opportunity = get_opportunity(&state.db, opportunity_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Opportunity {opportunity_id} not found")))?;

    if opportunity.user_id != request.user_id {
        return Err(AppError::NotFound(format!(
            "Opportunity {opportunity_id} not found"
        )));
    }

    let claims = get_claims_for_user(&state.db, request.user_id).await?;
    if claims.is_empty() {
        return Err(AppError::Validation(
            "No claims found. Add claims before generating a tailored profile.".to_string(),
        ));
    }

    let requirements = get_requirements(&state.db, opportunity_id).await?;

    let ctx = ProfileContext {
        opportunity,
        requirements,
        claims,
    };

    let outcome = get_or_generate(
        state.profile_store.as_ref(),
        state.profile_generator.as_ref(),
        &ctx,
        request.user_id,
        opportunity_id,
        request.regenerate,
    )
    .await?;

    Ok(Json(TailoredProfileResponse {
        cached: outcome.cached(),
        status: outcome.status,
        profile: outcome.profile,
    }))
}
