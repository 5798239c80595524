use std::sync::Arc;

use anyhow::Context;
use handbook_core::{ArticleStatus, WorkflowService};
use handbook_db::{DbConfig, PgArticleStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let default_filter = "handbook_migrate=info,handbook_db=debug,handbook_core=info";
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DbConfig::from_env()?;

    let pool = handbook_db::create_pool(&config)
        .await
        .context("Failed to connect to database")?;
    tracing::info!(
        max_connections = config.max_connections,
        "Database connection pool created"
    );

    handbook_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    handbook_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let workflow = WorkflowService::new(Arc::new(PgArticleStore::new(pool)));
    let pending = workflow.list_by_status(ArticleStatus::Submitted).await?;
    tracing::info!(pending_reviews = pending.len(), "Review queue checked");

    Ok(())
}
