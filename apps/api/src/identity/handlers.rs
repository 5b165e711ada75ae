//! Axum route handlers for the identity graph and skill-cluster views.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::identity::clusters::{project_skill_clusters, ClusterProjection};
use crate::identity::graph::{build_graph, IdentityGraph};
use crate::models::claim::{get_claims_for_user, get_links_for_user};
use crate::models::evidence::get_evidence_for_user;
use crate::state::AppState;

/// GET /api/v1/users/:user_id/identity-graph
///
/// Returns the claim-relationship graph derived from shared evidence.
/// A user with no claims gets an empty graph, not an error.
pub async fn handle_identity_graph(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<IdentityGraph>, AppError> {
    if !state.rate_limiter.check(&user_id.to_string()) {
        return Err(AppError::RateLimited);
    }

    let claims = get_claims_for_user(&state.db, user_id).await?;
    let links = get_links_for_user(&state.db, user_id).await?;
    let evidence = get_evidence_for_user(&state.db, user_id).await?;

    Ok(Json(build_graph(&claims, &links, &evidence)))
}

/// GET /api/v1/users/:user_id/skill-clusters
///
/// Returns the 2D skill-cluster projection, or counts and an explanatory
/// message when too few claims are embedded.
pub async fn handle_skill_clusters(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ClusterProjection>, AppError> {
    if !state.rate_limiter.check(&user_id.to_string()) {
        return Err(AppError::RateLimited);
    }

    let claims = get_claims_for_user(&state.db, user_id).await?;

    let projection = project_skill_clusters(
        state.projector.as_ref(),
        &claims,
        state.config.min_cluster_embeddings,
    )?;

    Ok(Json(projection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{exhausted_limiter, state_with_limiter};

    #[tokio::test]
    async fn test_identity_graph_rejects_when_rate_limited() {
        let state = state_with_limiter(exhausted_limiter());

        let result = handle_identity_graph(State(state), Path(Uuid::new_v4())).await;
        assert!(matches!(result, Err(AppError::RateLimited)));
    }

    #[tokio::test]
    async fn test_skill_clusters_rejects_when_rate_limited() {
        let state = state_with_limiter(exhausted_limiter());

        let result = handle_skill_clusters(State(state), Path(Uuid::new_v4())).await;
        assert!(matches!(result, Err(AppError::RateLimited)));
    }
}
