//! Tailored Profile Cache — get-or-generate keyed by (user, opportunity).
//!
//! The read path returns an existing profile without touching the LLM. The
//! generate path runs the full pipeline and persists the result with a
//! single atomic insert-if-absent backed by the storage uniqueness
//! constraint (`ux_tailored_profiles_user_opportunity`, partial over
//! non-deleted rows). A concurrent insert loses the race cleanly: we re-read
//! and report the raced branch distinctly from a plain cache hit.
//!
//! Storage sits behind `ProfileStore` so the flow is testable without a live
//! database; `PgProfileStore` is the production backend.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::TailoredProfileRow;
use crate::profile::generator::{GeneratedProfile, ProfileContext, ProfileGenerator};

/// Which branch `get_or_generate` took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    /// Existing profile returned without generation.
    Hit,
    /// Pipeline ran and the new row was inserted.
    Generated,
    /// Pipeline ran but a concurrent request inserted first; their row is
    /// returned. Distinct from `Hit` so callers can see the race.
    RacedHit,
}

#[derive(Debug, Clone)]
pub struct ProfileOutcome {
    pub profile: TailoredProfileRow,
    pub status: CacheStatus,
}

impl ProfileOutcome {
    /// True when no generated content from this request was persisted.
    pub fn cached(&self) -> bool {
        matches!(self.status, CacheStatus::Hit | CacheStatus::RacedHit)
    }
}

/// Column values for a fresh profile row. The `*_original` snapshots are
/// fixed at insert time for audit; user edits later touch only the
/// unprefixed columns.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub narrative: String,
    pub narrative_original: String,
    pub resume_data: serde_json::Value,
    pub resume_data_original: serde_json::Value,
    pub talking_points: serde_json::Value,
    pub talking_points_original: serde_json::Value,
}

impl NewProfile {
    pub fn from_generated(generated: GeneratedProfile) -> Self {
        Self {
            narrative: generated.narrative.clone(),
            narrative_original: generated.narrative,
            resume_data: generated.resume_data.clone(),
            resume_data_original: generated.resume_data,
            talking_points: generated.talking_points.clone(),
            talking_points_original: generated.talking_points,
        }
    }
}

/// Persistence seam for tailored profiles. `insert_if_absent` must be atomic
/// with respect to concurrent inserts for the same live key and return
/// `None` when it loses.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch_active(
        &self,
        user_id: Uuid,
        opportunity_id: Uuid,
    ) -> Result<Option<TailoredProfileRow>, AppError>;

    /// Soft-deletes the active row, returning how many rows were affected.
    async fn soft_delete(&self, user_id: Uuid, opportunity_id: Uuid) -> Result<u64, AppError>;

    async fn insert_if_absent(
        &self,
        user_id: Uuid,
        opportunity_id: Uuid,
        new_profile: &NewProfile,
    ) -> Result<Option<TailoredProfileRow>, AppError>;
}

/// Returns the cached profile for (user, opportunity), generating it first
/// when absent. `regenerate = true` soft-deletes any existing row and reruns
/// the whole pipeline.
pub async fn get_or_generate(
    store: &dyn ProfileStore,
    generator: &dyn ProfileGenerator,
    ctx: &ProfileContext,
    user_id: Uuid,
    opportunity_id: Uuid,
    regenerate: bool,
) -> Result<ProfileOutcome, AppError> {
    if !regenerate {
        if let Some(existing) = store.fetch_active(user_id, opportunity_id).await? {
            info!(
                "Profile cache hit for user {} / opportunity {}",
                user_id, opportunity_id
            );
            return Ok(ProfileOutcome {
                profile: existing,
                status: CacheStatus::Hit,
            });
        }
    } else {
        let deleted = store.soft_delete(user_id, opportunity_id).await?;
        if deleted > 0 {
            info!(
                "Soft-deleted existing profile for user {} / opportunity {} before regeneration",
                user_id, opportunity_id
            );
        }
    }

    // Full pipeline before any write — a step failure leaves no row behind.
    let generated = generator.generate(ctx).await?;
    let new_profile = NewProfile::from_generated(generated);

    match store
        .insert_if_absent(user_id, opportunity_id, &new_profile)
        .await?
    {
        Some(inserted) => {
            info!(
                "Inserted tailored profile {} for user {} / opportunity {}",
                inserted.id, user_id, opportunity_id
            );
            Ok(ProfileOutcome {
                profile: inserted,
                status: CacheStatus::Generated,
            })
        }
        // Lost the insert race: another request committed first. Their
        // profile is just as valid — return it.
        None => match store.fetch_active(user_id, opportunity_id).await? {
            Some(existing) => Ok(ProfileOutcome {
                profile: existing,
                status: CacheStatus::RacedHit,
            }),
            None => Err(AppError::Conflict(
                "Profile insert conflicted but no active row is readable; retry the request"
                    .to_string(),
            )),
        },
    }
}

/// Postgres-backed store. Atomicity comes from the partial unique index on
/// (user_id, opportunity_id) over non-deleted rows.
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn fetch_active(
        &self,
        user_id: Uuid,
        opportunity_id: Uuid,
    ) -> Result<Option<TailoredProfileRow>, AppError> {
        Ok(sqlx::query_as::<_, TailoredProfileRow>(
            r#"
            SELECT * FROM tailored_profiles
            WHERE user_id = $1 AND opportunity_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(opportunity_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn soft_delete(&self, user_id: Uuid, opportunity_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE tailored_profiles
            SET deleted_at = now()
            WHERE user_id = $1 AND opportunity_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(opportunity_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn insert_if_absent(
        &self,
        user_id: Uuid,
        opportunity_id: Uuid,
        new_profile: &NewProfile,
    ) -> Result<Option<TailoredProfileRow>, AppError> {
        Ok(sqlx::query_as::<_, TailoredProfileRow>(
            r#"
            INSERT INTO tailored_profiles
                (id, user_id, opportunity_id,
                 narrative, narrative_original,
                 resume_data, resume_data_original,
                 talking_points, talking_points_original,
                 edited_fields)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id, opportunity_id) WHERE deleted_at IS NULL DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(opportunity_id)
        .bind(&new_profile.narrative)
        .bind(&new_profile.narrative_original)
        .bind(&new_profile.resume_data)
        .bind(&new_profile.resume_data_original)
        .bind(&new_profile.talking_points)
        .bind(&new_profile.talking_points_original)
        .bind(Vec::<String>::new())
        .fetch_optional(&self.pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;
    use serde_json::json;

    use crate::models::opportunity::OpportunityRow;

    // ────────────────────────────────────────────────────────────────────
    // Stubs
    // ────────────────────────────────────────────────────────────────────

    /// Map-backed store. `steal_next_insert` makes the next insert lose the
    /// race to a competitor row; `refuse_inserts` makes inserts fail without
    /// leaving anything readable behind.
    #[derive(Default)]
    struct InMemoryStore {
        rows: Mutex<HashMap<(Uuid, Uuid), TailoredProfileRow>>,
        steal_next_insert: AtomicBool,
        refuse_inserts: AtomicBool,
    }

    fn row_from_new(user_id: Uuid, opportunity_id: Uuid, p: &NewProfile) -> TailoredProfileRow {
        TailoredProfileRow {
            id: Uuid::new_v4(),
            user_id,
            opportunity_id,
            narrative: p.narrative.clone(),
            narrative_original: p.narrative_original.clone(),
            resume_data: p.resume_data.clone(),
            resume_data_original: p.resume_data_original.clone(),
            talking_points: p.talking_points.clone(),
            talking_points_original: p.talking_points_original.clone(),
            edited_fields: vec![],
            deleted_at: None,
            created_at: Utc::now(),
        }
    }

    #[async_trait]
    impl ProfileStore for InMemoryStore {
        async fn fetch_active(
            &self,
            user_id: Uuid,
            opportunity_id: Uuid,
        ) -> Result<Option<TailoredProfileRow>, AppError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .get(&(user_id, opportunity_id))
                .cloned())
        }

        async fn soft_delete(&self, user_id: Uuid, opportunity_id: Uuid) -> Result<u64, AppError> {
            let removed = self
                .rows
                .lock()
                .unwrap()
                .remove(&(user_id, opportunity_id));
            Ok(removed.map(|_| 1).unwrap_or(0))
        }

        async fn insert_if_absent(
            &self,
            user_id: Uuid,
            opportunity_id: Uuid,
            new_profile: &NewProfile,
        ) -> Result<Option<TailoredProfileRow>, AppError> {
            if self.refuse_inserts.load(Ordering::SeqCst) {
                return Ok(None);
            }

            let mut rows = self.rows.lock().unwrap();
            let key = (user_id, opportunity_id);

            if self.steal_next_insert.swap(false, Ordering::SeqCst) {
                // A concurrent request commits first; our insert finds the
                // key taken.
                let competitor = NewProfile {
                    narrative: "competitor narrative".to_string(),
                    narrative_original: "competitor narrative".to_string(),
                    resume_data: json!({"summary": "competitor"}),
                    resume_data_original: json!({"summary": "competitor"}),
                    talking_points: json!({"points": ["competitor"]}),
                    talking_points_original: json!({"points": ["competitor"]}),
                };
                rows.insert(key, row_from_new(user_id, opportunity_id, &competitor));
                return Ok(None);
            }

            if rows.contains_key(&key) {
                return Ok(None);
            }

            let row = row_from_new(user_id, opportunity_id, new_profile);
            rows.insert(key, row.clone());
            Ok(Some(row))
        }
    }

    struct StubGenerator {
        calls: AtomicUsize,
    }

    impl StubGenerator {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ProfileGenerator for StubGenerator {
        async fn generate(&self, _ctx: &ProfileContext) -> Result<GeneratedProfile, AppError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GeneratedProfile {
                talking_points: json!({"points": [format!("point from run {n}")]}),
                narrative: format!("narrative from run {n}"),
                resume_data: json!({"summary": format!("summary from run {n}")}),
            })
        }
    }

    fn make_ctx(user_id: Uuid, opportunity_id: Uuid) -> ProfileContext {
        ProfileContext {
            opportunity: OpportunityRow {
                id: opportunity_id,
                user_id,
                title: "Staff Engineer".to_string(),
                company: Some("Acme".to_string()),
                description: None,
                created_at: Utc::now(),
            },
            requirements: vec![],
            claims: vec![],
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // get_or_generate flow
    // ────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_second_call_returns_cached_profile() {
        let store = InMemoryStore::default();
        let generator = StubGenerator::new();
        let (user_id, opportunity_id) = (Uuid::new_v4(), Uuid::new_v4());
        let ctx = make_ctx(user_id, opportunity_id);

        let first = get_or_generate(&store, &generator, &ctx, user_id, opportunity_id, false)
            .await
            .unwrap();
        assert_eq!(first.status, CacheStatus::Generated);
        assert!(!first.cached());

        let second = get_or_generate(&store, &generator, &ctx, user_id, opportunity_id, false)
            .await
            .unwrap();
        assert_eq!(second.status, CacheStatus::Hit);
        assert!(second.cached());
        assert_eq!(second.profile.id, first.profile.id, "Same row on hit");
        assert_eq!(
            generator.calls.load(Ordering::SeqCst),
            1,
            "Hit must not rerun the pipeline"
        );
    }

    #[tokio::test]
    async fn test_regenerate_replaces_profile_with_new_row() {
        let store = InMemoryStore::default();
        let generator = StubGenerator::new();
        let (user_id, opportunity_id) = (Uuid::new_v4(), Uuid::new_v4());
        let ctx = make_ctx(user_id, opportunity_id);

        let first = get_or_generate(&store, &generator, &ctx, user_id, opportunity_id, false)
            .await
            .unwrap();

        let redone = get_or_generate(&store, &generator, &ctx, user_id, opportunity_id, true)
            .await
            .unwrap();
        assert_eq!(redone.status, CacheStatus::Generated);
        assert!(!redone.cached());
        assert_ne!(redone.profile.id, first.profile.id, "Fresh row on regenerate");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);

        // Only the replacement is active afterwards
        let active = store.fetch_active(user_id, opportunity_id).await.unwrap();
        assert_eq!(active.unwrap().id, redone.profile.id);
    }

    #[tokio::test]
    async fn test_lost_insert_race_returns_competitor_row() {
        let store = InMemoryStore::default();
        store.steal_next_insert.store(true, Ordering::SeqCst);
        let generator = StubGenerator::new();
        let (user_id, opportunity_id) = (Uuid::new_v4(), Uuid::new_v4());
        let ctx = make_ctx(user_id, opportunity_id);

        let outcome = get_or_generate(&store, &generator, &ctx, user_id, opportunity_id, false)
            .await
            .unwrap();
        assert_eq!(outcome.status, CacheStatus::RacedHit);
        assert!(outcome.cached());
        assert_eq!(
            outcome.profile.narrative, "competitor narrative",
            "Loser returns the winner's row, not its own output"
        );
        assert_eq!(
            generator.calls.load(Ordering::SeqCst),
            1,
            "Pipeline ran before losing the race"
        );
    }

    #[tokio::test]
    async fn test_unreadable_row_after_lost_race_is_conflict() {
        let store = InMemoryStore::default();
        store.refuse_inserts.store(true, Ordering::SeqCst);
        let generator = StubGenerator::new();
        let (user_id, opportunity_id) = (Uuid::new_v4(), Uuid::new_v4());
        let ctx = make_ctx(user_id, opportunity_id);

        let result = get_or_generate(&store, &generator, &ctx, user_id, opportunity_id, false).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    // ────────────────────────────────────────────────────────────────────
    // Row construction
    // ────────────────────────────────────────────────────────────────────

    #[test]
    fn test_snapshot_fields_match_generated_values() {
        let generated = GeneratedProfile {
            talking_points: json!({"points": ["Led the Rust rewrite"]}),
            narrative: "I led the Rust rewrite of our billing pipeline.".to_string(),
            resume_data: json!({"summary": "Rust systems engineer"}),
        };

        let new_profile = NewProfile::from_generated(generated.clone());

        assert_eq!(new_profile.narrative, generated.narrative);
        assert_eq!(new_profile.narrative_original, generated.narrative);
        assert_eq!(new_profile.resume_data_original, generated.resume_data);
        assert_eq!(new_profile.talking_points_original, generated.talking_points);
    }

    #[test]
    fn test_cached_flag_per_branch() {
        let row = row_from_new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            &NewProfile {
                narrative: "n".to_string(),
                narrative_original: "n".to_string(),
                resume_data: json!({}),
                resume_data_original: json!({}),
                talking_points: json!({"points": []}),
                talking_points_original: json!({"points": []}),
            },
        );
        let outcome = |status| ProfileOutcome {
            profile: row.clone(),
            status,
        };

        assert!(outcome(CacheStatus::Hit).cached());
        assert!(outcome(CacheStatus::RacedHit).cached());
        assert!(!outcome(CacheStatus::Generated).cached());
    }

    #[test]
    fn test_cache_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(CacheStatus::RacedHit).unwrap(),
            json!("raced_hit")
        );
        assert_eq!(serde_json::to_value(CacheStatus::Hit).unwrap(), json!("hit"));
    }
}
