pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::identity::handlers as identity_handlers;
use crate::matching::handlers as matching_handlers;
use crate::profile::handlers as profile_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Identity views
        .route(
            "/api/v1/users/:user_id/identity-graph",
            get(identity_handlers::handle_identity_graph),
        )
        .route(
            "/api/v1/users/:user_id/skill-clusters",
            get(identity_handlers::handle_skill_clusters),
        )
        // Matching
        .route(
            "/api/v1/users/:user_id/related-claims",
            get(matching_handlers::handle_related_claims),
        )
        .route(
            "/api/v1/opportunities/:opportunity_id/match",
            post(matching_handlers::handle_match_opportunity),
        )
        // Tailored profiles
        .route(
            "/api/v1/opportunities/:opportunity_id/tailored-profile",
            post(profile_handlers::handle_tailored_profile),
        )
        .with_state(state)
}
