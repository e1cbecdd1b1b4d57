use sqlx::PgPool;

use crate::cache::Cache;
use crate::error::AppResult;
use crate::models::user::LeaderboardEntry;

const TOP_KEY: &str = "leaderboard:top";

/// Top users by balance, served from cache when warm.
pub async fn top(
    db: &PgPool,
    cache: &Cache,
    size: i64,
    cache_seconds: u64,
) -> AppResult<Vec<LeaderboardEntry>> {
    if cache_seconds > 0 {
        if let Some(entries) = cache.get_json::<Vec<LeaderboardEntry>>(TOP_KEY).await {
            return Ok(entries);
        }
    }

    let entries = sqlx::query_as::<_, LeaderboardEntry>(
        r#"SELECT id, display_name, photo_url, eco_coins, tier, streak
        FROM users
        ORDER BY eco_coins DESC, created_at ASC
        LIMIT $1"#,
    )
    .bind(size)
    .fetch_all(db)
    .await?;

    if cache_seconds > 0 {
        cache.set_json(TOP_KEY, &entries, cache_seconds).await;
    }
    Ok(entries)
}

/// Drops the cached ranking after any balance change.
pub async fn invalidate(cache: &Cache) {
    cache.del(TOP_KEY).await;
}
