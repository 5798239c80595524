//! Repository for the `articles` table.

use handbook_core::article::{Article, ArticleFilter, ArticleStatus, NewArticle};
use handbook_core::types::VersionNumber;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres};

use crate::models::article::ArticleRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, public_id, version, status, title, description, content, \
    edited_by, is_editable, is_submitted, deny_text, approved_as, revision, created_at, \
    updated_at";

/// `WHERE` clause for an [`ArticleFilter`], bound by [`bind_filter`].
const FILTER: &str = "($1::TEXT IS NULL OR public_id = $1) \
    AND ($2::INTEGER IS NULL OR version = $2) \
    AND ($3::TEXT IS NULL OR status = $3) \
    AND ($4::TEXT IS NULL OR edited_by = $4) \
    AND ($5::BOOLEAN IS NULL OR is_editable = $5) \
    AND ($6::BOOLEAN IS NULL OR (approved_as IS NOT NULL) = $6)";

/// Guard shared by every conditional write: the row must still look exactly
/// like the snapshot the caller decided on.
const GUARD: &str = "id = $1 AND public_id = $2 AND version = $3 AND status = $4 AND revision = $5";

/// Lookup, insert and guarded-write operations for article records.
pub struct ArticleRepo;

impl ArticleRepo {
    // ── Lookups ──────────────────────────────────────────────────────

    /// The record matching `filter` with the highest version.
    pub async fn find(
        pool: &PgPool,
        filter: &ArticleFilter,
    ) -> Result<Option<ArticleRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM articles
             WHERE {FILTER}
             ORDER BY version DESC
             LIMIT 1"
        );
        bind_filter(sqlx::query_as(&query), filter)
            .fetch_optional(pool)
            .await
    }

    /// List records matching `filter`, ordered by `(public_id, version)`.
    pub async fn list(
        pool: &PgPool,
        filter: &ArticleFilter,
    ) -> Result<Vec<ArticleRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM articles
             WHERE {FILTER}
             ORDER BY public_id, version"
        );
        bind_filter(sqlx::query_as(&query), filter)
            .fetch_all(pool)
            .await
    }

    /// The most recently created record of `public_id`.
    pub async fn find_latest(
        pool: &PgPool,
        public_id: &str,
    ) -> Result<Option<ArticleRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM articles
             WHERE public_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, ArticleRow>(&query)
            .bind(public_id)
            .fetch_optional(pool)
            .await
    }

    /// The approved record of `public_id` with the highest version.
    pub async fn find_latest_approved(
        pool: &PgPool,
        public_id: &str,
    ) -> Result<Option<ArticleRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM articles
             WHERE public_id = $1 AND status = 'APPROVED'
             ORDER BY version DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, ArticleRow>(&query)
            .bind(public_id)
            .fetch_optional(pool)
            .await
    }

    /// Highest stored version of `public_id`, `None` if it has no records.
    pub async fn max_version(
        pool: &PgPool,
        public_id: &str,
    ) -> Result<Option<VersionNumber>, sqlx::Error> {
        let row: (Option<VersionNumber>,) =
            sqlx::query_as("SELECT MAX(version) FROM articles WHERE public_id = $1")
                .bind(public_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Insert a new record. Unique violations surface as database errors.
    pub async fn create(pool: &PgPool, record: &NewArticle) -> Result<ArticleRow, sqlx::Error> {
        insert_with(pool, record).await
    }

    /// Overwrite the row `expected` was read from with `next`.
    ///
    /// Returns `None` if the row no longer matches `expected` (it was
    /// changed or removed by someone else); nothing is written then.
    pub async fn update_guarded(
        pool: &PgPool,
        expected: &Article,
        next: &Article,
    ) -> Result<Option<ArticleRow>, sqlx::Error> {
        update_guarded_with(pool, expected, next).await
    }

    /// Insert a new revision of an article in a single transaction:
    ///
    /// 1. Rewrite the `expected` row as `retired` (guarded), if given
    /// 2. Clear `is_editable` on the editable approved record, if asked
    /// 3. Insert `record`
    ///
    /// Returns `None` if the guarded rewrite matched no row; the
    /// transaction is rolled back then.
    pub async fn create_revision(
        pool: &PgPool,
        expected: &Article,
        retired: Option<&Article>,
        record: &NewArticle,
        demote_approved: bool,
    ) -> Result<Option<ArticleRow>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if let Some(retired) = retired {
            let rewritten = update_guarded_with(&mut *tx, expected, retired).await?;
            if rewritten.is_none() {
                tx.rollback().await?;
                return Ok(None);
            }
        }

        if demote_approved {
            sqlx::query(
                "UPDATE articles SET is_editable = false, revision = revision + 1 \
                 WHERE public_id = $1 AND status = 'APPROVED' AND is_editable = true",
            )
            .bind(&record.public_id)
            .execute(&mut *tx)
            .await?;
        }

        let created = insert_with(&mut *tx, record).await?;

        tx.commit().await?;
        Ok(Some(created))
    }
}

async fn insert_with<'e, E>(executor: E, record: &NewArticle) -> Result<ArticleRow, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let query = format!(
        "INSERT INTO articles
            (public_id, version, status, title, description, content,
             edited_by, is_editable, is_submitted, deny_text)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, ArticleRow>(&query)
        .bind(&record.public_id)
        .bind(record.version)
        .bind(record.status.as_str())
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.content)
        .bind(&record.edited_by)
        .bind(record.is_editable)
        .bind(record.is_submitted)
        .bind(&record.deny_text)
        .fetch_one(executor)
        .await
}

async fn update_guarded_with<'e, E>(
    executor: E,
    expected: &Article,
    next: &Article,
) -> Result<Option<ArticleRow>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let query = format!(
        "UPDATE articles SET
            version = $6,
            status = $7,
            title = $8,
            description = $9,
            content = $10,
            edited_by = $11,
            is_editable = $12,
            is_submitted = $13,
            deny_text = $14,
            approved_as = $15,
            revision = revision + 1
         WHERE {GUARD}
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, ArticleRow>(&query)
        .bind(expected.id)
        .bind(&expected.public_id)
        .bind(expected.version)
        .bind(expected.status.as_str())
        .bind(expected.revision)
        .bind(next.version)
        .bind(next.status.as_str())
        .bind(&next.title)
        .bind(&next.description)
        .bind(&next.content)
        .bind(&next.edited_by)
        .bind(next.is_editable)
        .bind(next.is_submitted)
        .bind(&next.deny_text)
        .bind(next.approved_as)
        .fetch_optional(executor)
        .await
}

/// Bind the [`FILTER`] parameters in order.
fn bind_filter<'q>(
    query: QueryAs<'q, Postgres, ArticleRow, PgArguments>,
    filter: &'q ArticleFilter,
) -> QueryAs<'q, Postgres, ArticleRow, PgArguments> {
    query
        .bind(filter.public_id.as_deref())
        .bind(filter.version)
        .bind(filter.status.map(ArticleStatus::as_str))
        .bind(filter.edited_by.as_deref())
        .bind(filter.is_editable)
        .bind(filter.retired)
}
