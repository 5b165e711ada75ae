//! Skill Cluster Projector — 2D projection of claim embeddings for the
//! visualization layer.
//!
//! This module owns the contract only: input validation, the minimum-data
//! gate, and node assembly. The dimensionality-reduction math itself is
//! delegated to an injected `Projector2d` collaborator.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::models::claim::{ClaimRow, ClaimType};

/// External numeric collaborator: reduces fixed-length embedding vectors to
/// 2D coordinates, one (x, y) per input vector, in input order.
pub trait Projector2d: Send + Sync {
    fn project(&self, vectors: &[Vec<f32>]) -> Result<Vec<(f32, f32)>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterNode {
    pub id: Uuid,
    pub label: String,
    pub claim_type: ClaimType,
    pub confidence: f64,
    pub x: f32,
    pub y: f32,
}

/// A labeled grouping of projected claims. Populated once the numeric
/// collaborator grows cluster assignment; absent until then.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterRegion {
    pub label: String,
    pub claim_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterProjection {
    pub nodes: Vec<ClusterNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<ClusterRegion>>,
    pub has_embeddings: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub embedding_count: usize,
    pub total_count: usize,
}

/// Projects a user's embedded claims to 2D.
///
/// Claims without embeddings are counted but not projected. Below
/// `min_embeddings` embedded claims, no projection is attempted: the result
/// reports `has_embeddings = false` with counts and an explanatory message.
pub fn project_skill_clusters(
    projector: &dyn Projector2d,
    claims: &[ClaimRow],
    min_embeddings: usize,
) -> Result<ClusterProjection> {
    let embedded: Vec<&ClaimRow> = claims.iter().filter(|c| c.embedding.is_some()).collect();
    let embedding_count = embedded.len();
    let total_count = claims.len();

    if embedding_count < min_embeddings {
        debug!(
            "Skipping cluster projection: {embedding_count}/{total_count} claims embedded, \
             need {min_embeddings}"
        );
        return Ok(ClusterProjection {
            nodes: vec![],
            regions: None,
            has_embeddings: false,
            message: Some(format!(
                "Not enough embedded claims to build a skill map: {embedding_count} of \
                 {total_count} claims have embeddings, at least {min_embeddings} are needed."
            )),
            embedding_count,
            total_count,
        });
    }

    let vectors: Vec<Vec<f32>> = embedded
        .iter()
        .filter_map(|c| c.embedding.as_ref().map(|v| v.as_slice().to_vec()))
        .collect();

    let coordinates = projector.project(&vectors)?;

    let nodes = embedded
        .iter()
        .zip(coordinates)
        .map(|(claim, (x, y))| ClusterNode {
            id: claim.id,
            label: claim.label.clone(),
            claim_type: claim.claim_type,
            confidence: claim.confidence,
            x,
            y,
        })
        .collect();

    Ok(ClusterProjection {
        nodes,
        regions: None,
        has_embeddings: true,
        message: None,
        embedding_count,
        total_count,
    })
}

/// Default collaborator until the real reducer service is wired in: projects
/// onto the first two embedding dimensions. Deterministic and dependency-free,
/// which also makes it the natural test double.
pub struct LeadingComponentsProjector;

impl Projector2d for LeadingComponentsProjector {
    fn project(&self, vectors: &[Vec<f32>]) -> Result<Vec<(f32, f32)>> {
        vectors
            .iter()
            .map(|v| match v.as_slice() {
                [x, y, ..] => Ok((*x, *y)),
                _ => Err(anyhow::anyhow!(
                    "Embedding has fewer than 2 dimensions ({})",
                    v.len()
                )),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pgvector::Vector;

    fn make_claim(label: &str, embedding: Option<Vec<f32>>) -> ClaimRow {
        ClaimRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            claim_type: ClaimType::Skill,
            label: label.to_string(),
            description: None,
            confidence: 0.8,
            embedding: embedding.map(Vector::from),
            source: "extraction".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_below_minimum_returns_counts_and_message() {
        let claims = vec![
            make_claim("Rust", Some(vec![0.1, 0.2])),
            make_claim("Go", None),
        ];

        let projection =
            project_skill_clusters(&LeadingComponentsProjector, &claims, 3).unwrap();

        assert!(!projection.has_embeddings);
        assert!(projection.nodes.is_empty());
        assert_eq!(projection.embedding_count, 1);
        assert_eq!(projection.total_count, 2);
        assert!(projection.message.is_some());
    }

    #[test]
    fn test_projection_assembles_nodes_in_order() {
        let claims = vec![
            make_claim("Rust", Some(vec![0.1, 0.9])),
            make_claim("Go", Some(vec![0.3, 0.4])),
            make_claim("Postgres", Some(vec![0.5, 0.6])),
        ];

        let projection =
            project_skill_clusters(&LeadingComponentsProjector, &claims, 3).unwrap();

        assert!(projection.has_embeddings);
        assert_eq!(projection.nodes.len(), 3);
        assert_eq!(projection.embedding_count, 3);
        assert_eq!(projection.nodes[0].label, "Rust");
        assert_eq!(projection.nodes[0].x, 0.1);
        assert_eq!(projection.nodes[0].y, 0.9);
        assert_eq!(projection.nodes[2].label, "Postgres");
    }

    #[test]
    fn test_unembedded_claims_counted_but_not_projected() {
        let claims = vec![
            make_claim("Rust", Some(vec![0.1, 0.2])),
            make_claim("Go", Some(vec![0.3, 0.4])),
            make_claim("Mentoring", Some(vec![0.5, 0.6])),
            make_claim("No embedding yet", None),
        ];

        let projection =
            project_skill_clusters(&LeadingComponentsProjector, &claims, 3).unwrap();

        assert_eq!(projection.nodes.len(), 3);
        assert_eq!(projection.embedding_count, 3);
        assert_eq!(projection.total_count, 4);
    }

    #[test]
    fn test_projector_error_propagates() {
        let claims = vec![
            make_claim("a", Some(vec![0.1])),
            make_claim("b", Some(vec![0.2])),
            make_claim("c", Some(vec![0.3])),
        ];

        let result = project_skill_clusters(&LeadingComponentsProjector, &claims, 3);
        assert!(result.is_err(), "1-dim vectors cannot project to 2D");
    }
}
