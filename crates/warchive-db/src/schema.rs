//! Idempotent schema bootstrap for fresh databases.

use sqlx::PgPool;
use tracing::info;

use crate::error::DbResult;

const STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS photos (
        id BIGSERIAL PRIMARY KEY,
        city_id BIGINT NOT NULL,
        image_url TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        is_processed BOOLEAN NOT NULL DEFAULT false,
        is_failed BOOLEAN NOT NULL DEFAULT false,
        in_video BOOLEAN NOT NULL DEFAULT false
    )"#,
    r#"CREATE TABLE IF NOT EXISTS videos (
        id BIGSERIAL PRIMARY KEY,
        city_id BIGINT NOT NULL,
        time_range_start TIMESTAMPTZ NOT NULL,
        time_range_end TIMESTAMPTZ NOT NULL,
        video_url TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CHECK (time_range_start <= time_range_end)
    )"#,
    r#"CREATE INDEX IF NOT EXISTS photos_pending_idx
        ON photos (created_at, city_id)
        WHERE is_processed AND NOT is_failed AND NOT in_video"#,
    r#"CREATE INDEX IF NOT EXISTS videos_city_range_idx
        ON videos (city_id, time_range_start, time_range_end)"#,
];

/// Create the `photos` and `videos` tables if they do not exist.
pub async fn ensure_schema(pool: &PgPool) -> DbResult<()> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Schema ready");
    Ok(())
}
