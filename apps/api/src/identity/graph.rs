//! Identity Graph Builder — derives a claim-relationship graph from shared
//! evidence links.
//!
//! Two claims get an edge when they share at least one evidence id; the edge
//! carries the intersecting evidence ids in encounter order. The pair scan
//! is O(n²) over claim count per user, which is fine while claim counts stay
//! in the tens-to-low-hundreds range. If they grow past that, rebuild around
//! an inverted index (evidence_id → claim_ids) for roughly O(n·k).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::claim::{ClaimEvidenceLinkRow, ClaimRow, ClaimType};
use crate::models::evidence::EvidenceRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: Uuid,
    pub claim_type: ClaimType,
    pub label: String,
    pub confidence: f64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: Uuid,
    pub target: Uuid,
    /// Evidence ids both claims link to, in encounter order.
    pub shared_evidence: Vec<Uuid>,
}

/// Evidence payload for the visualization consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEvidence {
    pub id: Uuid,
    pub body: String,
    pub evidence_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub evidence: Vec<GraphEvidence>,
}

/// Builds the claim-relationship graph for one user.
///
/// Zero claims produce an all-empty graph, not an error. Link `strength` is
/// deliberately ignored here — it stays inert metadata until product decides
/// whether it should weight edges.
pub fn build_graph(
    claims: &[ClaimRow],
    links: &[ClaimEvidenceLinkRow],
    evidence: &[EvidenceRow],
) -> IdentityGraph {
    let nodes: Vec<GraphNode> = claims
        .iter()
        .map(|c| GraphNode {
            id: c.id,
            claim_type: c.claim_type,
            label: c.label.clone(),
            confidence: c.confidence,
            description: c.description.clone(),
        })
        .collect();

    // Evidence ids per claim, preserving link encounter order
    let mut evidence_by_claim: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for link in links {
        evidence_by_claim
            .entry(link.claim_id)
            .or_default()
            .push(link.evidence_id);
    }

    let mut edges = Vec::new();
    for (i, a) in claims.iter().enumerate() {
        let a_evidence = match evidence_by_claim.get(&a.id) {
            Some(ids) => ids,
            None => continue,
        };

        for b in claims.iter().skip(i + 1) {
            let b_set: HashSet<Uuid> = match evidence_by_claim.get(&b.id) {
                Some(ids) => ids.iter().copied().collect(),
                None => continue,
            };

            let shared: Vec<Uuid> = a_evidence
                .iter()
                .copied()
                .filter(|id| b_set.contains(id))
                .collect();

            if !shared.is_empty() {
                edges.push(GraphEdge {
                    source: a.id,
                    target: b.id,
                    shared_evidence: shared,
                });
            }
        }
    }

    // Deduplicated evidence referenced by any claim's links
    let evidence_by_id: HashMap<Uuid, &EvidenceRow> = evidence.iter().map(|e| (e.id, e)).collect();
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut referenced = Vec::new();
    for link in links {
        if !seen.insert(link.evidence_id) {
            continue;
        }
        if let Some(row) = evidence_by_id.get(&link.evidence_id) {
            referenced.push(GraphEvidence {
                id: row.id,
                body: row.body.clone(),
                evidence_type: row.evidence_type.clone(),
            });
        }
    }

    IdentityGraph {
        nodes,
        edges,
        evidence: referenced,
    }
}
