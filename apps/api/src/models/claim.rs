use chrono::{DateTime, Utc};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// What kind of thing a claim asserts about the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "claim_type", rename_all = "snake_case")]
pub enum ClaimType {
    Skill,
    Achievement,
    Attribute,
}

/// How strongly a piece of evidence supports a claim.
///
/// Currently inert metadata: scoring and graph edges do not weight by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "link_strength", rename_all = "snake_case")]
pub enum LinkStrength {
    Weak,
    Medium,
    Strong,
}

/// A documented skill, achievement, or attribute with a confidence score
/// and a precomputed embedding. Claims are never implicitly deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClaimRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub claim_type: ClaimType,
    pub label: String,
    pub description: Option<String>,
    /// Always within [0, 1].
    pub confidence: f64,
    #[serde(skip_serializing, default)]
    pub embedding: Option<Vector>,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// Many-to-many join between claims and evidence.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClaimEvidenceLinkRow {
    pub claim_id: Uuid,
    pub evidence_id: Uuid,
    pub strength: LinkStrength,
}

/// Returns all claims for a user, oldest first.
pub async fn get_claims_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<ClaimRow>, sqlx::Error> {
    sqlx::query_as::<_, ClaimRow>(
        "SELECT * FROM claims WHERE user_id = $1 ORDER BY created_at, id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Returns all claim-evidence links for a user's claims, in insertion order.
pub async fn get_links_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<ClaimEvidenceLinkRow>, sqlx::Error> {
    sqlx::query_as::<_, ClaimEvidenceLinkRow>(
        r#"
        SELECT l.claim_id, l.evidence_id, l.strength
        FROM claim_evidence_links l
        JOIN claims c ON c.id = l.claim_id
        WHERE c.user_id = $1
        ORDER BY l.created_at, l.claim_id, l.evidence_id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
