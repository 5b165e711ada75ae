use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Requirement bucket within an opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "requirement_category", rename_all = "snake_case")]
pub enum RequirementCategory {
    MustHave,
    NiceToHave,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OpportunityRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub company: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One condition from an opportunity's must-have / nice-to-have list.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RequirementRow {
    pub id: Uuid,
    pub opportunity_id: Uuid,
    pub body: String,
    pub category: RequirementCategory,
}

pub async fn get_opportunity(
    pool: &PgPool,
    opportunity_id: Uuid,
) -> Result<Option<OpportunityRow>, sqlx::Error> {
    sqlx::query_as::<_, OpportunityRow>("SELECT * FROM opportunities WHERE id = $1")
        .bind(opportunity_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_requirements(
    pool: &PgPool,
    opportunity_id: Uuid,
) -> Result<Vec<RequirementRow>, sqlx::Error> {
    sqlx::query_as::<_, RequirementRow>(
        "SELECT * FROM requirements WHERE opportunity_id = $1 ORDER BY category, id",
    )
    .bind(opportunity_id)
    .fetch_all(pool)
    .await
}
