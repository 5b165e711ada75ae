//! Axum route handlers for the matching API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::retriever::{retrieve, ClaimMatch, RetrievalParams};
use crate::matching::scorer::{score_opportunity, OpportunityScore, ScoringParams};
use crate::models::evidence::get_evidence_for_user;
use crate::models::opportunity::{get_opportunity, get_requirements};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct RelatedClaimsResponse {
    /// Set semantics — order carries no meaning.
    pub claims: Vec<ClaimMatch>,
    pub count: usize,
}

/// POST /api/v1/opportunities/:id/match
///
/// Scores the user's claims against the opportunity's requirements. Always
/// returns a score, even under partial retrieval failure — gaps absorb
/// whatever could not be matched.
pub async fn handle_match_opportunity(
    State(state): State<AppState>,
    Path(opportunity_id): Path<Uuid>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<OpportunityScore>, AppError> {
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

    let requirements = get_requirements(&state.db, opportunity_id).await?;

    let params = ScoringParams {
        match_threshold: state.config.match_threshold,
        max_candidates: state.config.retrieval_max_per_query,
        must_have_weight: state.config.must_have_weight,
    };

    let score = score_opportunity(
        state.embedder.as_ref(),
        state.claim_index.as_ref(),
        request.user_id,
        &requirements,
        params,
    )
    .await;

    Ok(Json(score))
}

/// GET /api/v1/users/:user_id/related-claims
///
/// Batched evidence-driven retrieval: surfaces the claims semantically
/// closest to the user's evidence, deduplicated across queries.
pub async fn handle_related_claims(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<RelatedClaimsResponse>, AppError> {
    if !state.rate_limiter.check(&user_id.to_string()) {
        return Err(AppError::RateLimited);
    }

    let evidence = get_evidence_for_user(&state.db, user_id).await?;

    let params = RetrievalParams {
        threshold: state.config.retrieval_threshold,
        max_per_query: state.config.retrieval_max_per_query,
    };

    let merged = retrieve(state.claim_index.as_ref(), user_id, &evidence, params).await;
    let claims: Vec<ClaimMatch> = merged.into_values().collect();
    let count = claims.len();

    Ok(Json(RelatedClaimsResponse { claims, count }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{exhausted_limiter, state_with_limiter};

    #[tokio::test]
    async fn test_related_claims_rejects_when_rate_limited() {
        let state = state_with_limiter(exhausted_limiter());

        let result = handle_related_claims(State(state), Path(Uuid::new_v4())).await;
        assert!(matches!(result, Err(AppError::RateLimited)));
    }
}
