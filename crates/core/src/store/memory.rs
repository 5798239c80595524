//! In-memory [`VersionedRecordStore`].
//!
//! Uses `Arc<RwLock<...>>` internally, so clones share the same rows. Every
//! write takes the write lock for its whole duration, which makes each
//! [`VersionedRecordStore::save`] call atomic.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::VersionedRecordStore;
use crate::article::{Article, ArticleFilter, ArticleStatus, NewArticle};
use crate::error::CoreError;
use crate::state_machine::Transition;
use crate::types::{DbId, VersionNumber};

#[derive(Debug, Default)]
struct Storage {
    rows: BTreeMap<DbId, Article>,
    last_id: DbId,
}

impl Storage {
    fn of<'a>(&'a self, public_id: &'a str) -> impl Iterator<Item = &'a Article> + 'a {
        self.rows.values().filter(move |a| a.public_id == public_id)
    }

    fn check_guard(&self, expected: &Article) -> Result<(), CoreError> {
        let unchanged = self.rows.get(&expected.id).is_some_and(|row| {
            row.public_id == expected.public_id
                && row.version == expected.version
                && row.status == expected.status
                && row.revision == expected.revision
        });
        if unchanged {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "Article {} changed since it was read",
                expected.address()
            )))
        }
    }

    /// `(public_id, version)` must stay unique, ignoring the rows in `replaced`.
    fn check_version_free(
        &self,
        public_id: &str,
        version: VersionNumber,
        replaced: &[DbId],
    ) -> Result<(), CoreError> {
        if self
            .of(public_id)
            .any(|row| row.version == version && !replaced.contains(&row.id))
        {
            return Err(CoreError::Conflict(format!(
                "Article {public_id} already has version {version}"
            )));
        }
        Ok(())
    }

    /// Single working copy and single editable-approved rules for a record
    /// about to be added, ignoring rows in `released` that lose the flag.
    fn check_flags(&self, record: &NewArticle, released: &[DbId]) -> Result<(), CoreError> {
        let working_copy = record.is_working_copy();
        let editable_approved = record.status == ArticleStatus::Approved && record.is_editable;

        for row in self
            .of(&record.public_id)
            .filter(|row| !released.contains(&row.id))
        {
            if working_copy && row.is_working_copy() {
                return Err(CoreError::Conflict(format!(
                    "Article {} already has a working copy at version {}",
                    record.public_id, row.version
                )));
            }
            if editable_approved && row.status == ArticleStatus::Approved && row.is_editable {
                return Err(CoreError::Conflict(format!(
                    "Article {} already has an editable approved version {}",
                    record.public_id, row.version
                )));
            }
        }
        Ok(())
    }

    fn push(&mut self, record: &NewArticle) -> Article {
        self.last_id += 1;
        let now = chrono::Utc::now();
        let article = Article {
            id: self.last_id,
            public_id: record.public_id.clone(),
            version: record.version,
            status: record.status,
            title: record.title.clone(),
            description: record.description.clone(),
            content: record.content.clone(),
            edited_by: record.edited_by.clone(),
            is_editable: record.is_editable,
            is_submitted: record.is_submitted,
            deny_text: record.deny_text.clone(),
            approved_as: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        };
        self.rows.insert(article.id, article.clone());
        article
    }

    fn overwrite(&mut self, expected: &Article, next: &Article) -> Article {
        let mut row = next.clone();
        row.id = expected.id;
        row.public_id = expected.public_id.clone();
        row.created_at = expected.created_at;
        row.revision = expected.revision + 1;
        row.updated_at = chrono::Utc::now();
        self.rows.insert(row.id, row.clone());
        row
    }
}

/// An in-memory implementation of [`VersionedRecordStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryArticleStore {
    storage: Arc<RwLock<Storage>>,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, across all articles.
    pub async fn row_count(&self) -> usize {
        self.storage.read().await.rows.len()
    }
}

#[async_trait]
impl VersionedRecordStore for MemoryArticleStore {
    async fn find(&self, filter: &ArticleFilter) -> Result<Option<Article>, CoreError> {
        let storage = self.storage.read().await;
        Ok(storage
            .rows
            .values()
            .filter(|a| filter.matches(a))
            .max_by_key(|a| a.version)
            .cloned())
    }

    async fn find_many(&self, filter: &ArticleFilter) -> Result<Vec<Article>, CoreError> {
        let storage = self.storage.read().await;
        let mut found: Vec<Article> = storage
            .rows
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        found.sort_by_key(|a| (a.public_id.clone(), a.version));
        Ok(found)
    }

    async fn find_latest(&self, public_id: &str) -> Result<Option<Article>, CoreError> {
        let storage = self.storage.read().await;
        // Ids are handed out in creation order.
        Ok(storage.of(public_id).max_by_key(|a| a.id).cloned())
    }

    async fn find_latest_approved(&self, public_id: &str) -> Result<Option<Article>, CoreError> {
        let storage = self.storage.read().await;
        Ok(storage
            .of(public_id)
            .filter(|a| a.status == ArticleStatus::Approved)
            .max_by_key(|a| a.version)
            .cloned())
    }

    async fn max_version(&self, public_id: &str) -> Result<Option<VersionNumber>, CoreError> {
        let storage = self.storage.read().await;
        Ok(storage.of(public_id).map(|a| a.version).max())
    }

    async fn insert(&self, record: &NewArticle) -> Result<Article, CoreError> {
        let mut storage = self.storage.write().await;
        storage.check_version_free(&record.public_id, record.version, &[])?;
        storage.check_flags(record, &[])?;
        Ok(storage.push(record))
    }

    async fn save(
        &self,
        expected: &Article,
        transition: &Transition,
    ) -> Result<Article, CoreError> {
        let mut storage = self.storage.write().await;

        match transition {
            Transition::InPlace(next) => {
                storage.check_guard(expected)?;
                if next.version != expected.version {
                    let public_id = &expected.public_id;
                    storage.check_version_free(public_id, next.version, &[expected.id])?;
                }
                Ok(storage.overwrite(expected, next))
            }
            Transition::Revision {
                retired,
                record,
                demote_approved,
            } => {
                // Every check runs before the first mutation.
                let mut replaced = Vec::new();
                if let Some(retired) = retired {
                    storage.check_guard(expected)?;
                    if !retired.is_working_copy() {
                        replaced.push(expected.id);
                    }
                }
                let demoted: Vec<DbId> = if *demote_approved {
                    storage
                        .of(&record.public_id)
                        .filter(|a| a.status == ArticleStatus::Approved && a.is_editable)
                        .map(|a| a.id)
                        .collect()
                } else {
                    Vec::new()
                };
                let released: Vec<DbId> = replaced.iter().chain(&demoted).copied().collect();

                storage.check_version_free(&record.public_id, record.version, &[])?;
                storage.check_flags(record, &released)?;

                if let Some(retired) = retired {
                    storage.overwrite(expected, retired);
                }
                let now = chrono::Utc::now();
                for id in demoted {
                    if let Some(row) = storage.rows.get_mut(&id) {
                        row.is_editable = false;
                        row.revision += 1;
                        row.updated_at = now;
                    }
                }
                Ok(storage.push(record))
            }
        }
    }
}
