use log::{debug, info};
use sqlx::SqliteConnection;

use crate::{
    db::{sqlite::SqliteDatabaseError, traits::InsertResult},
    db_types::{NewRewardRule, RewardRule},
};

/// Adds a reward rule. If an active rule with the same match text exists, its id is returned instead.
pub async fn idempotent_insert(
    rule: &NewRewardRule,
    conn: &mut SqliteConnection,
) -> Result<InsertResult, SqliteDatabaseError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO reward_rules (match_text, reward, reward_type) VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            RETURNING id;
        "#,
    )
    .bind(rule.match_text.as_str())
    .bind(rule.reward)
    .bind(rule.reward_type.to_string())
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(id) = id {
        info!("🗃️ Reward rule '{}' ({} {}) saved with id {id}", rule.match_text, rule.reward, rule.reward_type);
        return Ok(InsertResult::Inserted(id));
    }
    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM reward_rules WHERE match_text = $1 AND deleted = 0")
        .bind(rule.match_text.as_str())
        .fetch_one(conn)
        .await?;
    debug!("🗃️ Reward rule '{}' already exists with id {id}", rule.match_text);
    Ok(InsertResult::AlreadyExists(id))
}

pub async fn soft_delete(match_text: &str, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query("UPDATE reward_rules SET deleted = 1 WHERE match_text = $1 AND deleted = 0")
        .bind(match_text)
        .execute(conn)
        .await?;
    let deleted = result.rows_affected() > 0;
    if deleted {
        info!("🗃️ Reward rule '{match_text}' deleted");
    }
    Ok(deleted)
}

/// Active rules in the order they were created.
pub async fn fetch_active(conn: &mut SqliteConnection) -> Result<Vec<RewardRule>, SqliteDatabaseError> {
    let rules = sqlx::query_as::<_, RewardRule>(
        r#"
        SELECT id, match_text, reward, reward_type, deleted, created_at
        FROM reward_rules
        WHERE deleted = 0
        ORDER BY id ASC"#,
    )
    .fetch_all(conn)
    .await?;
    Ok(rules)
}
