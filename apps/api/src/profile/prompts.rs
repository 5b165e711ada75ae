// All LLM prompt constants for the tailored-profile pipeline.

/// System prompt for talking-point extraction — enforces JSON-only output.
pub const TALKING_POINTS_SYSTEM: &str =
    "You are an expert career strategist selecting the strongest talking points \
    for a specific job opportunity from a candidate's verified claims. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT invent claims not present in the input.";

/// Talking-points prompt template.
/// Replace: {claims_json}, {opportunity_title}, {requirements_json}
pub const TALKING_POINTS_PROMPT_TEMPLATE: &str = r#"Select the candidate's strongest talking points for this opportunity.

CANDIDATE CLAIMS (source of truth — ONLY use these):
{claims_json}

OPPORTUNITY: {opportunity_title}

REQUIREMENTS:
{requirements_json}

Return a JSON object:
{
  "points": [
    "Led the Rust rewrite of the billing pipeline, directly covering the systems-programming requirement"
  ]
}

HARD RULES:
1. Every point MUST trace back to a claim above — no invention
2. Order points by relevance to the must-have requirements
3. 3 to 7 points, one sentence each"#;

/// System prompt for narrative generation — plain prose, no JSON.
pub const NARRATIVE_SYSTEM: &str =
    "You are an expert career writer producing a short first-person narrative \
    that positions a candidate for a specific opportunity. \
    Respond with the narrative text only — no preamble, no headers, no lists.";

/// Narrative prompt template.
/// Replace: {talking_points_json}, {opportunity_title}
pub const NARRATIVE_PROMPT_TEMPLATE: &str = r#"Write a 2-3 paragraph first-person narrative for the candidate applying to: {opportunity_title}

Build it strictly from these talking points:
{talking_points_json}

Keep it concrete and grounded — no generic filler, no facts beyond the talking points."#;

/// System prompt for resume-data generation — enforces JSON-only output.
pub const RESUME_DATA_SYSTEM: &str =
    "You are an expert resume writer producing structured resume data from \
    verified talking points. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT invent facts not present in the talking points.";

/// Resume-data prompt template.
/// Replace: {talking_points_json}, {narrative}, {opportunity_title}
pub const RESUME_DATA_PROMPT_TEMPLATE: &str = r#"Produce structured resume data tailored to: {opportunity_title}

TALKING POINTS (source of truth):
{talking_points_json}

NARRATIVE (for framing only):
{narrative}

Return a JSON object:
{
  "summary": "One-sentence positioning statement",
  "highlights": [
    "Architected distributed caching layer reducing p99 latency by 40%"
  ],
  "skills": ["Rust", "PostgreSQL"]
}

HARD RULES:
1. Every highlight MUST trace back to a talking point — no interpolation
2. 3 to 6 highlights, information-dense
3. Skills list only what the talking points support"#;
