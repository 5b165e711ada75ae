use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A generated narrative/resume artifact for one (user, opportunity) pair.
///
/// Invariant: at most one non-deleted profile per (user_id, opportunity_id),
/// enforced by a partial unique index in storage, not just in application
/// code. Regeneration soft-deletes and recreates rather than updating in
/// place; the `*_original` columns keep the as-generated values for audit
/// while the unprefixed columns absorb user edits.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TailoredProfileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub opportunity_id: Uuid,
    pub narrative: String,
    pub narrative_original: String,
    pub resume_data: Value,
    pub resume_data_original: Value,
    pub talking_points: Value,
    pub talking_points_original: Value,
    /// Field names the user has edited since generation.
    pub edited_fields: Vec<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
