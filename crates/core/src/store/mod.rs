//! The record store seam between the workflow engine and durable storage.
//!
//! The workflow service only ever talks to a [`VersionedRecordStore`]. The
//! `db` crate provides the PostgreSQL implementation; [`MemoryArticleStore`]
//! backs tests and local tooling.

mod memory;

pub use memory::MemoryArticleStore;

use async_trait::async_trait;

use crate::article::{Article, ArticleFilter, NewArticle};
use crate::error::CoreError;
use crate::state_machine::Transition;
use crate::types::VersionNumber;

/// Keyed, versioned storage for article records.
///
/// Implementations must provide read-committed reads and must apply every
/// write conditionally:
///
/// - An in-place write only lands if the stored row still matches the
///   `expected` snapshot on `id`, `public_id`, `version`, `status` and
///   `revision`; otherwise it fails with [`CoreError::Conflict`] and
///   nothing is written.
/// - A [`Transition::Revision`] (guarded retirement, demotion, insert) is a
///   single transaction.
/// - Inserts that break `(public_id, version)` uniqueness, the single
///   working copy rule or the single editable-approved rule fail with
///   [`CoreError::Conflict`]. Retired submissions are not working copies.
#[async_trait]
pub trait VersionedRecordStore: Send + Sync {
    /// The record matching `filter` with the highest version.
    async fn find(&self, filter: &ArticleFilter) -> Result<Option<Article>, CoreError>;

    /// All records matching `filter`, ordered by `(public_id, version)`.
    async fn find_many(&self, filter: &ArticleFilter) -> Result<Vec<Article>, CoreError>;

    /// The most recently created record of `public_id`.
    async fn find_latest(&self, public_id: &str) -> Result<Option<Article>, CoreError>;

    /// The approved record of `public_id` with the highest version.
    async fn find_latest_approved(&self, public_id: &str) -> Result<Option<Article>, CoreError>;

    /// Highest version stored for `public_id`, `None` if the article is unknown.
    async fn max_version(&self, public_id: &str) -> Result<Option<VersionNumber>, CoreError>;

    /// Insert a brand-new record.
    async fn insert(&self, record: &NewArticle) -> Result<Article, CoreError>;

    /// Apply `transition`, computed from `expected`, as one conditional
    /// write. Returns the record the transition produced.
    async fn save(&self, expected: &Article, transition: &Transition) -> Result<Article, CoreError>;
}
