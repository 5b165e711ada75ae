//! Tailored-profile generation pipeline.
//!
//! Flow: talking points → narrative → resume data, strictly in sequence.
//! Each step is an LLM call through `llm_client`; a failure at any step
//! aborts the whole pipeline with a `GenerationFailure` and nothing is
//! persisted — the cache layer inserts only a fully generated profile.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::claim::ClaimRow;
use crate::models::opportunity::{OpportunityRow, RequirementRow};
use crate::profile::prompts::{
    NARRATIVE_PROMPT_TEMPLATE, NARRATIVE_SYSTEM, RESUME_DATA_PROMPT_TEMPLATE, RESUME_DATA_SYSTEM,
    TALKING_POINTS_PROMPT_TEMPLATE, TALKING_POINTS_SYSTEM,
};

/// Inputs the pipeline works from, loaded by the handler.
#[derive(Debug, Clone)]
pub struct ProfileContext {
    pub opportunity: OpportunityRow,
    pub requirements: Vec<RequirementRow>,
    pub claims: Vec<ClaimRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TalkingPoints {
    pub points: Vec<String>,
}

/// Output of a complete pipeline run. Not yet persisted.
#[derive(Debug, Clone)]
pub struct GeneratedProfile {
    pub talking_points: Value,
    pub narrative: String,
    pub resume_data: Value,
}

/// Seam between the cache flow and the pipeline, so the flow is testable
/// without LLM calls.
#[async_trait]
pub trait ProfileGenerator: Send + Sync {
    async fn generate(&self, ctx: &ProfileContext) -> Result<GeneratedProfile, AppError>;
}

/// Production generator: the three-step pipeline over the Anthropic client.
pub struct LlmProfileGenerator {
    llm: LlmClient,
}

impl LlmProfileGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ProfileGenerator for LlmProfileGenerator {
    async fn generate(&self, ctx: &ProfileContext) -> Result<GeneratedProfile, AppError> {
        generate_profile(&self.llm, ctx).await
    }
}

/// Runs the full generation pipeline. Every step must succeed; partial
/// output is never returned.
pub async fn generate_profile(
    llm: &LlmClient,
    ctx: &ProfileContext,
) -> Result<GeneratedProfile, AppError> {
    // Step 1: talking points
    let talking_points = generate_talking_points(llm, ctx).await?;
    info!(
        "Generated {} talking points for opportunity {}",
        talking_points.points.len(),
        ctx.opportunity.id
    );

    // Step 2: narrative
    let narrative = generate_narrative(llm, ctx, &talking_points).await?;

    // Step 3: resume data
    let resume_data = generate_resume_data(llm, ctx, &talking_points, &narrative).await?;

    let talking_points_value = serde_json::to_value(&talking_points)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize talking points: {e}")))?;

    Ok(GeneratedProfile {
        talking_points: talking_points_value,
        narrative,
        resume_data,
    })
}

async fn generate_talking_points(
    llm: &LlmClient,
    ctx: &ProfileContext,
) -> Result<TalkingPoints, AppError> {
    let claims_json = serde_json::to_string_pretty(
        &ctx.claims
            .iter()
            .map(|c| {
                serde_json::json!({
                    "id": c.id,
                    "type": c.claim_type,
                    "label": c.label,
                    "description": c.description,
                    "confidence": c.confidence,
                })
            })
            .collect::<Vec<_>>(),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize claims: {e}")))?;

    let requirements_json = serde_json::to_string_pretty(
        &ctx.requirements
            .iter()
            .map(|r| serde_json::json!({ "text": r.body, "category": r.category }))
            .collect::<Vec<_>>(),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize requirements: {e}")))?;

    let prompt = TALKING_POINTS_PROMPT_TEMPLATE
        .replace("{claims_json}", &claims_json)
        .replace("{opportunity_title}", &ctx.opportunity.title)
        .replace("{requirements_json}", &requirements_json);

    let talking_points: TalkingPoints = llm
        .call_json(&prompt, TALKING_POINTS_SYSTEM)
        .await
        .map_err(|e| AppError::GenerationFailure(format!("Talking points step failed: {e}")))?;

    if talking_points.points.is_empty() {
        return Err(AppError::GenerationFailure(
            "Talking points step returned an empty list".to_string(),
        ));
    }

    Ok(talking_points)
}

async fn generate_narrative(
    llm: &LlmClient,
    ctx: &ProfileContext,
    talking_points: &TalkingPoints,
) -> Result<String, AppError> {
    let points_json = serde_json::to_string_pretty(&talking_points.points)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize points: {e}")))?;

    let prompt = NARRATIVE_PROMPT_TEMPLATE
        .replace("{talking_points_json}", &points_json)
        .replace("{opportunity_title}", &ctx.opportunity.title);

    llm.call_text(&prompt, NARRATIVE_SYSTEM)
        .await
        .map_err(|e| AppError::GenerationFailure(format!("Narrative step failed: {e}")))
}

async fn generate_resume_data(
    llm: &LlmClient,
    ctx: &ProfileContext,
    talking_points: &TalkingPoints,
    narrative: &str,
) -> Result<Value, AppError> {
    let points_json = serde_json::to_string_pretty(&talking_points.points)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize points: {e}")))?;

    let prompt = RESUME_DATA_PROMPT_TEMPLATE
        .replace("{talking_points_json}", &points_json)
        .replace("{narrative}", narrative)
        .replace("{opportunity_title}", &ctx.opportunity.title);

    let resume_data: Value = llm
        .call_json(&prompt, RESUME_DATA_SYSTEM)
        .await
        .map_err(|e| AppError::GenerationFailure(format!("Resume data step failed: {e}")))?;

    let non_empty = resume_data
        .as_object()
        .map(|o| !o.is_empty())
        .unwrap_or(false);
    if !non_empty {
        return Err(AppError::GenerationFailure(
            "Resume data step returned an empty object".to_string(),
        ));
    }

    Ok(resume_data)
}
