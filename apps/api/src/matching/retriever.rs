//! Semantic Retriever — batched nearest-neighbor claim lookup.
//!
//! Issues one index query per evidence embedding, scoped to the owning user,
//! and merges the results with first-seen-wins dedup by claim id. A single
//! query's failure is absorbed and the batch completes with whatever the
//! remaining queries surfaced — retrieval is never fatal.
//!
//! Output is set semantics: callers must not depend on merge order.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::models::claim::ClaimType;
use crate::models::evidence::EvidenceRow;

/// A claim surfaced by a nearest-neighbor query, with its similarity to the
/// query vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimMatch {
    pub claim_id: Uuid,
    pub label: String,
    pub claim_type: ClaimType,
    pub confidence: f64,
    /// Cosine similarity in [0, 1].
    pub similarity: f32,
}

/// Nearest-neighbor lookup over a user's claims.
///
/// The user scope is enforced server-side by the implementation — the trust
/// boundary lives here, never in the calling client.
#[async_trait]
pub trait ClaimIndex: Send + Sync {
    async fn find_by_embedding(
        &self,
        user_id: Uuid,
        vector: &[f32],
        threshold: f32,
        max_results: u32,
    ) -> Result<Vec<ClaimMatch>>;
}

/// Tuning knobs for a retrieval batch.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalParams {
    pub threshold: f32,
    pub max_per_query: u32,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            max_per_query: 25,
        }
    }
}

/// Claims merged across all queries of a batch, keyed by claim id.
pub type RetrievedClaims = HashMap<Uuid, ClaimMatch>;

/// Runs one nearest-neighbor query per evidence embedding and merges the
/// results.
///
/// - Empty `evidence_items` short-circuits: zero index queries are issued.
/// - Dedup is first-seen-wins: a claim id already in the merge keeps its
///   original payload; later occurrences are discarded without re-ranking.
/// - Evidence without an embedding, and queries that fail outright, are
///   logged and skipped.
pub async fn retrieve(
    index: &dyn ClaimIndex,
    user_id: Uuid,
    evidence_items: &[EvidenceRow],
    params: RetrievalParams,
) -> RetrievedClaims {
    let mut merged: RetrievedClaims = HashMap::new();

    if evidence_items.is_empty() {
        return merged;
    }

    for item in evidence_items {
        let vector = match &item.embedding {
            Some(v) => v.as_slice(),
            None => {
                warn!("Evidence {} has no embedding — skipping query", item.id);
                continue;
            }
        };

        let matches = match index
            .find_by_embedding(user_id, vector, params.threshold, params.max_per_query)
            .await
        {
            Ok(m) => m,
            Err(e) => {
                warn!(
                    "Claim lookup failed for evidence {} — continuing with partial results: {e}",
                    item.id
                );
                continue;
            }
        };

        for claim in matches {
            merged.entry(claim.claim_id).or_insert(claim);
        }
    }

    merged
}

/// pgvector-backed claim index. Similarity is `1 - cosine_distance`,
/// computed and filtered inside Postgres.
pub struct PgClaimIndex {
    pool: PgPool,
}

impl PgClaimIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClaimIndex for PgClaimIndex {
    async fn find_by_embedding(
        &self,
        user_id: Uuid,
        vector: &[f32],
        threshold: f32,
        max_results: u32,
    ) -> Result<Vec<ClaimMatch>> {
        let query_vector = Vector::from(vector.to_vec());

        let rows = sqlx::query_as::<_, (Uuid, String, ClaimType, f64, f64)>(
            r#"
            SELECT id, label, claim_type, confidence,
                   1 - (embedding <=> $2) AS similarity
            FROM claims
            WHERE user_id = $1
              AND embedding IS NOT NULL
              AND 1 - (embedding <=> $2) >= $3
            ORDER BY embedding <=> $2
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(&query_vector)
        .bind(threshold as f64)
        .bind(max_results as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(claim_id, label, claim_type, confidence, similarity)| ClaimMatch {
                    claim_id,
                    label,
                    claim_type,
                    confidence,
                    similarity: similarity as f32,
                },
            )
            .collect())
    }
}
