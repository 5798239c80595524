//! PostgreSQL implementation of [`VersionedRecordStore`].

use async_trait::async_trait;
use handbook_core::article::{Article, ArticleFilter, NewArticle};
use handbook_core::error::CoreError;
use handbook_core::state_machine::Transition;
use handbook_core::store::VersionedRecordStore;
use handbook_core::types::VersionNumber;

use crate::map_sqlx_error;
use crate::models::ArticleRow;
use crate::repositories::ArticleRepo;
use crate::DbPool;

/// Article store backed by the `articles` table.
#[derive(Clone)]
pub struct PgArticleStore {
    pool: DbPool,
}

impl PgArticleStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn convert(row: Option<ArticleRow>) -> Result<Option<Article>, CoreError> {
    row.map(Article::try_from).transpose()
}

fn stale(expected: &Article) -> CoreError {
    CoreError::Conflict(format!(
        "Article {} version {} was changed by someone else",
        expected.public_id, expected.version
    ))
}

#[async_trait]
impl VersionedRecordStore for PgArticleStore {
    async fn find(&self, filter: &ArticleFilter) -> Result<Option<Article>, CoreError> {
        let row = ArticleRepo::find(&self.pool, filter)
            .await
            .map_err(map_sqlx_error)?;
        convert(row)
    }

    async fn find_many(&self, filter: &ArticleFilter) -> Result<Vec<Article>, CoreError> {
        ArticleRepo::list(&self.pool, filter)
            .await
            .map_err(map_sqlx_error)?
            .into_iter()
            .map(Article::try_from)
            .collect()
    }

    async fn find_latest(&self, public_id: &str) -> Result<Option<Article>, CoreError> {
        let row = ArticleRepo::find_latest(&self.pool, public_id)
            .await
            .map_err(map_sqlx_error)?;
        convert(row)
    }

    async fn find_latest_approved(&self, public_id: &str) -> Result<Option<Article>, CoreError> {
        let row = ArticleRepo::find_latest_approved(&self.pool, public_id)
            .await
            .map_err(map_sqlx_error)?;
        convert(row)
    }

    async fn max_version(&self, public_id: &str) -> Result<Option<VersionNumber>, CoreError> {
        ArticleRepo::max_version(&self.pool, public_id)
            .await
            .map_err(map_sqlx_error)
    }

    async fn insert(&self, record: &NewArticle) -> Result<Article, CoreError> {
        let row = ArticleRepo::create(&self.pool, record)
            .await
            .map_err(map_sqlx_error)?;
        Article::try_from(row)
    }

    async fn save(
        &self,
        expected: &Article,
        transition: &Transition,
    ) -> Result<Article, CoreError> {
        let row = match transition {
            Transition::InPlace(next) => ArticleRepo::update_guarded(&self.pool, expected, next)
                .await
                .map_err(map_sqlx_error)?,
            Transition::Revision {
                retired,
                record,
                demote_approved,
            } => ArticleRepo::create_revision(
                &self.pool,
                expected,
                retired.as_ref(),
                record,
                *demote_approved,
            )
            .await
            .map_err(map_sqlx_error)?,
        };

        match row {
            Some(row) => Article::try_from(row),
            None => {
                tracing::debug!(
                    public_id = %expected.public_id,
                    version = expected.version,
                    revision = expected.revision,
                    "Guarded article write matched no row",
                );
                Err(stale(expected))
            }
        }
    }
}
