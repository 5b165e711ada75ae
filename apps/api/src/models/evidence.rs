use chrono::{DateTime, NaiveDate, Utc};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A text fragment (resume line, story) supporting one or more claims.
/// Immutable once created, apart from soft-dismissal metadata.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvidenceRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub evidence_type: String,
    pub source_type: String,
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing, default)]
    pub embedding: Option<Vector>,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Returns all non-dismissed evidence for a user.
pub async fn get_evidence_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<EvidenceRow>, sqlx::Error> {
    sqlx::query_as::<_, EvidenceRow>(
        "SELECT * FROM evidence WHERE user_id = $1 AND dismissed_at IS NULL ORDER BY created_at, id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
