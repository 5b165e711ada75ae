use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::identity::clusters::Projector2d;
use crate::matching::retriever::ClaimIndex;
use crate::profile::cache::ProfileStore;
use crate::profile::generator::ProfileGenerator;
use crate::rate_limit::RateLimiter;

/// Shared application state injected into all route handlers via Axum
/// extractors. External collaborators are trait objects so tests and future
/// backends can swap them without touching handler code.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Opaque text → vector provider. May fail; callers degrade gracefully.
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// User-scoped nearest-neighbor lookup over claims.
    pub claim_index: Arc<dyn ClaimIndex>,
    /// Numeric collaborator for 2D skill-cluster projection.
    pub projector: Arc<dyn Projector2d>,
    /// Tailored-profile persistence.
    pub profile_store: Arc<dyn ProfileStore>,
    /// Tailored-profile pipeline.
    pub profile_generator: Arc<dyn ProfileGenerator>,
    /// Injected limiter with explicit start/stop lifecycle, owned by main.
    pub rate_limiter: Arc<RateLimiter>,
    pub config: Config,
}

#[cfg(test)]
pub mod test_support {
    //! Inert collaborators for handler tests that must fail before reaching
    //! any backend (the pool is lazy and never connects).

    use std::time::Duration;

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::embedding::EmbeddingError;
    use crate::errors::AppError;
    use crate::identity::clusters::LeadingComponentsProjector;
    use crate::matching::retriever::ClaimMatch;
    use crate::models::profile::TailoredProfileRow;
    use crate::profile::cache::NewProfile;
    use crate::profile::generator::{GeneratedProfile, ProfileContext};

    struct InertEmbedder;

    #[async_trait]
    impl EmbeddingProvider for InertEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Empty)
        }
    }

    struct InertIndex;

    #[async_trait]
    impl ClaimIndex for InertIndex {
        async fn find_by_embedding(
            &self,
            _user_id: Uuid,
            _vector: &[f32],
            _threshold: f32,
            _max_results: u32,
        ) -> anyhow::Result<Vec<ClaimMatch>> {
            Ok(vec![])
        }
    }

    struct InertStore;

    #[async_trait]
    impl ProfileStore for InertStore {
        async fn fetch_active(
            &self,
            _user_id: Uuid,
            _opportunity_id: Uuid,
        ) -> Result<Option<TailoredProfileRow>, AppError> {
            Ok(None)
        }

        async fn soft_delete(
            &self,
            _user_id: Uuid,
            _opportunity_id: Uuid,
        ) -> Result<u64, AppError> {
            Ok(0)
        }

        async fn insert_if_absent(
            &self,
            _user_id: Uuid,
            _opportunity_id: Uuid,
            _new_profile: &NewProfile,
        ) -> Result<Option<TailoredProfileRow>, AppError> {
            Ok(None)
        }
    }

    struct InertGenerator;

    #[async_trait]
    impl ProfileGenerator for InertGenerator {
        async fn generate(&self, _ctx: &ProfileContext) -> Result<GeneratedProfile, AppError> {
            Err(AppError::GenerationFailure("not wired in tests".to_string()))
        }
    }

    /// State whose only live collaborator is the given rate limiter.
    pub fn state_with_limiter(rate_limiter: RateLimiter) -> AppState {
        let config = Config {
            database_url: "postgres://unused".to_string(),
            anthropic_api_key: "unused".to_string(),
            embeddings_api_url: "http://unused".to_string(),
            embeddings_api_key: "unused".to_string(),
            embeddings_model: "unused".to_string(),
            port: 0,
            rust_log: "info".to_string(),
            database_max_connections: 1,
            match_threshold: 0.5,
            retrieval_threshold: 0.5,
            retrieval_max_per_query: 25,
            must_have_weight: 0.7,
            min_cluster_embeddings: 3,
            rate_limit_max_requests: 0,
            rate_limit_window_secs: 60,
        };

        AppState {
            db: PgPool::connect_lazy("postgres://localhost/unused")
                .expect("lazy pool from static url"),
            embedder: Arc::new(InertEmbedder),
            claim_index: Arc::new(InertIndex),
            projector: Arc::new(LeadingComponentsProjector),
            profile_store: Arc::new(InertStore),
            profile_generator: Arc::new(InertGenerator),
            rate_limiter: Arc::new(rate_limiter),
            config,
        }
    }

    /// Limiter that rejects every request.
    pub fn exhausted_limiter() -> RateLimiter {
        RateLimiter::new(0, Duration::from_secs(60))
    }
}
