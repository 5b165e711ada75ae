//! Requirement Matcher / Opportunity Scorer.
//!
//! For each opportunity requirement: embed the text, run a single
//! nearest-neighbor query over the user's claims, and take the best
//! candidate above the match threshold as `best_match`. Requirements no
//! claim clears become gaps. Category scores aggregate match counts, and
//! the overall score blends them with the configured must-have weight.
//!
//! Determinism: identical (requirements, claims) input always produces
//! identical output. Candidate ties break by similarity, then claim
//! confidence, then lexically-lowest claim id — no randomness anywhere.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::embedding::EmbeddingProvider;
use crate::matching::retriever::{ClaimIndex, ClaimMatch};
use crate::models::claim::ClaimType;
use crate::models::opportunity::{RequirementCategory, RequirementRow};

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

/// The highest-similarity claim found for a requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestMatch {
    pub claim_id: Uuid,
    pub label: String,
    pub claim_type: ClaimType,
    /// Cosine similarity in [0, 1].
    pub similarity: f32,
}

/// One requirement with its match outcome. `best_match = None` marks a gap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub requirement: String,
    pub category: RequirementCategory,
    pub best_match: Option<BestMatch>,
}

/// Category and overall scores, each 0–100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub overall: u32,
    pub must_have: u32,
    pub nice_to_have: u32,
}

/// Full match report for one opportunity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityScore {
    pub scores: ScoreSummary,
    pub label: String,
    /// Requirements with a best match, sorted descending by similarity.
    /// Truncation (e.g. top 5) is a caller concern.
    pub strengths: Vec<MatchResult>,
    /// Requirements no claim cleared, with their original text and category.
    pub gaps: Vec<MatchResult>,
}

/// Scoring policy knobs, sourced from `Config` — never hardcoded at call
/// sites.
#[derive(Debug, Clone, Copy)]
pub struct ScoringParams {
    pub match_threshold: f32,
    pub max_candidates: u32,
    pub must_have_weight: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            match_threshold: 0.5,
            max_candidates: 25,
            must_have_weight: 0.7,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scoring pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Scores a user's claims against an opportunity's requirements.
///
/// Embedding or index failures for a single requirement degrade to a gap;
/// the endpoint always returns a score computed over whatever retrieval
/// actually surfaced.
pub async fn score_opportunity(
    embedder: &dyn EmbeddingProvider,
    index: &dyn ClaimIndex,
    user_id: Uuid,
    requirements: &[RequirementRow],
    params: ScoringParams,
) -> OpportunityScore {
    let mut results: Vec<MatchResult> = Vec::with_capacity(requirements.len());

    for requirement in requirements {
        let best_match = match embedder.embed(&requirement.body).await {
            Ok(vector) => {
                match index
                    .find_by_embedding(user_id, &vector, params.match_threshold, params.max_candidates)
                    .await
                {
                    Ok(candidates) => pick_best(candidates).map(|c| BestMatch {
                        claim_id: c.claim_id,
                        label: c.label,
                        claim_type: c.claim_type,
                        similarity: c.similarity,
                    }),
                    Err(e) => {
                        warn!(
                            "Claim lookup failed for requirement '{}' — treating as gap: {e}",
                            requirement.body
                        );
                        None
                    }
                }
            }
            Err(e) => {
                warn!(
                    "Embedding failed for requirement '{}' — treating as gap: {e}",
                    requirement.body
                );
                None
            }
        };

        results.push(MatchResult {
            requirement: requirement.body.clone(),
            category: requirement.category,
            best_match,
        });
    }

    let scores = compute_scores(&results, params.must_have_weight);
    let label = score_label(scores.overall).to_string();

    let (mut strengths, gaps): (Vec<MatchResult>, Vec<MatchResult>) =
        results.into_iter().partition(|r| r.best_match.is_some());

    strengths.sort_by(|a, b| {
        let sa = a.best_match.as_ref().map(|m| m.similarity).unwrap_or(0.0);
        let sb = b.best_match.as_ref().map(|m| m.similarity).unwrap_or(0.0);
        sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
    });

    info!(
        "Scored opportunity for user {}: overall={} ({} strengths, {} gaps)",
        user_id,
        scores.overall,
        strengths.len(),
        gaps.len()
    );

    OpportunityScore {
        scores,
        label,
        strengths,
        gaps,
    }
}

/// Picks the best candidate deterministically: similarity desc, then
/// confidence desc, then claim id lexical asc as the stable final tiebreak.
pub fn pick_best(mut candidates: Vec<ClaimMatch>) -> Option<ClaimMatch> {
    candidates.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(a.claim_id.to_string().cmp(&b.claim_id.to_string()))
    });
    candidates.into_iter().next()
}

/// Aggregates category scores and the weighted overall score.
///
/// A category score is `round(100 * matched / total)`. A category with zero
/// requirements is excluded from the blend: the overall score is then the
/// other category's score, or 0 when both are empty.
pub fn compute_scores(results: &[MatchResult], must_have_weight: f64) -> ScoreSummary {
    let (must_matched, must_total) = count_category(results, RequirementCategory::MustHave);
    let (nice_matched, nice_total) = count_category(results, RequirementCategory::NiceToHave);

    let must_have = ratio_score(must_matched, must_total);
    let nice_to_have = ratio_score(nice_matched, nice_total);

    let overall = match (must_total > 0, nice_total > 0) {
        (true, true) => {
            let blended = must_have_weight * must_have as f64
                + (1.0 - must_have_weight) * nice_to_have as f64;
            blended.round() as u32
        }
        (true, false) => must_have,
        (false, true) => nice_to_have,
        (false, false) => 0,
    };

    ScoreSummary {
        overall,
        must_have,
        nice_to_have,
    }
}

fn count_category(results: &[MatchResult], category: RequirementCategory) -> (usize, usize) {
    let in_category: Vec<_> = results.iter().filter(|r| r.category == category).collect();
    let matched = in_category.iter().filter(|r| r.best_match.is_some()).count();
    (matched, in_category.len())
}

fn ratio_score(matched: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((100.0 * matched as f64) / total as f64).round() as u32
}

/// Maps an overall score to its consumer-facing label. The bands are exact
/// and consumed by UI and tests alike.
pub fn score_label(overall: u32) -> &'static str {
    match overall {
        90.. => "Exceptional Match",
        80..=89 => "Strong Alignment",
        60..=79 => "Good Alignment",
        40..=59 => "Developing Match",
        _ => "Low Alignment",
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
