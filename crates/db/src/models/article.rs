//! Article row model.

use handbook_core::article::{Article, ArticleStatus};
use handbook_core::error::CoreError;
use handbook_core::types::{DbId, Timestamp, VersionNumber};
use sqlx::FromRow;

/// A row from the `articles` table.
///
/// `status` is kept as text here; [`Article::try_from`] parses it.
#[derive(Debug, Clone, FromRow)]
pub struct ArticleRow {
    pub id: DbId,
    pub public_id: String,
    pub version: VersionNumber,
    pub status: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub edited_by: String,
    pub is_editable: bool,
    pub is_submitted: bool,
    pub deny_text: Option<String>,
    pub approved_as: Option<VersionNumber>,
    pub revision: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<ArticleRow> for Article {
    type Error = CoreError;

    fn try_from(row: ArticleRow) -> Result<Self, Self::Error> {
        let status: ArticleStatus = row.status.parse().map_err(|_| {
            CoreError::StorageUnavailable(format!(
                "Unreadable article row {}: unknown status '{}'",
                row.id, row.status
            ))
        })?;

        Ok(Article {
            id: row.id,
            public_id: row.public_id,
            version: row.version,
            status,
            title: row.title,
            description: row.description,
            content: row.content,
            edited_by: row.edited_by,
            is_editable: row.is_editable,
            is_submitted: row.is_submitted,
            deny_text: row.deny_text,
            approved_as: row.approved_as,
            revision: row.revision,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
