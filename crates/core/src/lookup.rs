//! Addressing schemes for picking one (or all) of an article's stored
//! revisions.
//!
//! Single-record lookups return [`CoreError::NotFound`] when nothing
//! matches; "all matching" lookups return an empty `Vec`. Every
//! single-record lookup is scoped by `public_id`.

use std::sync::Arc;

use crate::article::{validate_editor, validate_public_id, Article, ArticleFilter, ArticleStatus};
use crate::error::CoreError;
use crate::store::VersionedRecordStore;
use crate::types::VersionNumber;

/// Read-only resolver over a [`VersionedRecordStore`].
#[derive(Clone)]
pub struct LookupResolver {
    store: Arc<dyn VersionedRecordStore>,
}

impl LookupResolver {
    pub fn new(store: Arc<dyn VersionedRecordStore>) -> Self {
        Self { store }
    }

    /// Most recently created record of the article, whatever its status.
    pub async fn latest(&self, public_id: &str) -> Result<Article, CoreError> {
        validate_public_id(public_id)?;
        tracing::debug!(public_id, "Resolving latest article record");
        self.store
            .find_latest(public_id)
            .await?
            .ok_or_else(|| CoreError::article_not_found(format!("public_id={public_id}")))
    }

    /// Approved record with the highest version.
    pub async fn latest_approved(&self, public_id: &str) -> Result<Article, CoreError> {
        validate_public_id(public_id)?;
        tracing::debug!(public_id, "Resolving latest approved article");
        let key = format!("public_id={public_id} status=APPROVED");
        self.store
            .find_latest_approved(public_id)
            .await?
            .ok_or_else(|| CoreError::article_not_found(key))
    }

    pub async fn by_version(
        &self,
        public_id: &str,
        version: VersionNumber,
    ) -> Result<Article, CoreError> {
        validate_public_id(public_id)?;
        tracing::debug!(public_id, version, "Resolving article by version");
        let filter = ArticleFilter::default()
            .public_id(public_id)
            .version(version);
        let key = format!("public_id={public_id} version={version}");
        self.find_one(&filter, key).await
    }

    /// The record stored at `(public_id, version)` if it has `status`.
    /// Retired submissions are included.
    pub async fn by_version_and_status(
        &self,
        public_id: &str,
        version: VersionNumber,
        status: ArticleStatus,
    ) -> Result<Article, CoreError> {
        validate_public_id(public_id)?;
        tracing::debug!(public_id, version, %status, "Resolving article by version and status");
        let filter = ArticleFilter::default()
            .public_id(public_id)
            .version(version)
            .status(status);
        let key = format!("public_id={public_id} version={version} status={status}");
        self.find_one(&filter, key).await
    }

    /// Highest-version live record of the article in `status`. For
    /// `SUBMITTED` this is the submission awaiting a decision.
    pub async fn by_status(
        &self,
        public_id: &str,
        status: ArticleStatus,
    ) -> Result<Article, CoreError> {
        validate_public_id(public_id)?;
        tracing::debug!(public_id, %status, "Resolving article by status");
        let filter = ArticleFilter::default()
            .public_id(public_id)
            .status(status)
            .retired(false);
        let key = format!("public_id={public_id} status={status}");
        self.find_one(&filter, key).await
    }

    /// Every approved record of the article, oldest version first.
    pub async fn approved_lineage(&self, public_id: &str) -> Result<Vec<Article>, CoreError> {
        validate_public_id(public_id)?;
        let filter = ArticleFilter::default()
            .public_id(public_id)
            .status(ArticleStatus::Approved);
        self.store.find_many(&filter).await
    }

    /// Live records in `status` across all articles. For `SUBMITTED` this
    /// is the review queue.
    pub async fn all_by_status(&self, status: ArticleStatus) -> Result<Vec<Article>, CoreError> {
        let filter = ArticleFilter::default().status(status).retired(false);
        self.store.find_many(&filter).await
    }

    pub async fn by_editor_and_status(
        &self,
        edited_by: &str,
        status: ArticleStatus,
    ) -> Result<Vec<Article>, CoreError> {
        validate_editor(edited_by)?;
        let filter = ArticleFilter::default().edited_by(edited_by).status(status);
        self.store.find_many(&filter).await
    }

    /// Highest stored version of the article; `NotFound` if it has none.
    pub async fn max_version(&self, public_id: &str) -> Result<VersionNumber, CoreError> {
        self.store
            .max_version(public_id)
            .await?
            .ok_or_else(|| CoreError::article_not_found(format!("public_id={public_id}")))
    }

    async fn find_one(&self, filter: &ArticleFilter, key: String) -> Result<Article, CoreError> {
        self.store
            .find(filter)
            .await?
            .ok_or_else(|| CoreError::article_not_found(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::NewArticle;
    use crate::state_machine::Transition;
    use crate::store::MemoryArticleStore;
    use assert_matches::assert_matches;

    fn row(
        public_id: &str,
        version: VersionNumber,
        status: ArticleStatus,
        editor: &str,
    ) -> NewArticle {
        NewArticle {
            public_id: public_id.into(),
            version,
            status,
            title: format!("{public_id} v{version}"),
            description: String::new(),
            content: "body".into(),
            edited_by: editor.into(),
            is_editable: false,
            is_submitted: status == ArticleStatus::Submitted,
            deny_text: None,
        }
    }

    async fn seeded() -> LookupResolver {
        let store = MemoryArticleStore::new();
        for record in [
            row("a", 1, ArticleStatus::Approved, "alice"),
            row("a", 2, ArticleStatus::Approved, "bob"),
            row("a", 3, ArticleStatus::Editing, "alice"),
            row("b", 0, ArticleStatus::Submitted, "bob"),
        ] {
            store.insert(&record).await.unwrap();
        }
        LookupResolver::new(Arc::new(store))
    }

    /// Article "c": a submission at v0 approved as v1.
    async fn with_retired_submission() -> LookupResolver {
        let store = MemoryArticleStore::new();
        let draft = row("c", 0, ArticleStatus::Submitted, "carol");
        let submitted = store.insert(&draft).await.unwrap();
        let mut retired = submitted.clone();
        retired.approved_as = Some(1);
        let mut approved = row("c", 1, ArticleStatus::Approved, "carol");
        approved.is_editable = true;
        let transition = Transition::Revision {
            retired: Some(retired),
            record: approved,
            demote_approved: true,
        };
        store.save(&submitted, &transition).await.unwrap();
        LookupResolver::new(Arc::new(store))
    }

    #[tokio::test]
    async fn latest_and_latest_approved() {
        let resolver = seeded().await;
        assert_eq!(resolver.latest("a").await.unwrap().version, 3);
        assert_eq!(resolver.latest_approved("a").await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn latest_approved_is_stable_between_reads() {
        let resolver = seeded().await;
        let first = resolver.latest_approved("a").await.unwrap();
        let second = resolver.latest_approved("a").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn single_record_lookups_return_not_found() {
        let resolver = seeded().await;
        assert_matches!(
            resolver.latest("zzz").await,
            Err(CoreError::NotFound { .. })
        );
        assert_matches!(
            resolver.latest_approved("b").await,
            Err(CoreError::NotFound { .. })
        );
        assert_matches!(
            resolver.by_version("a", 9).await,
            Err(CoreError::NotFound { .. })
        );
        assert_matches!(
            resolver
                .by_version_and_status("a", 3, ArticleStatus::Approved)
                .await,
            Err(CoreError::NotFound { .. })
        );
        assert_matches!(
            resolver.by_status("a", ArticleStatus::Submitted).await,
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn blank_public_id_is_a_validation_error() {
        let resolver = seeded().await;
        assert_matches!(resolver.latest(" ").await, Err(CoreError::Validation(_)));
        assert_matches!(
            resolver.by_version("", 0).await,
            Err(CoreError::Validation(_))
        );
    }

    #[tokio::test]
    async fn status_lookups_are_scoped_by_public_id() {
        let resolver = seeded().await;
        let editing = resolver
            .by_status("a", ArticleStatus::Editing)
            .await
            .unwrap();
        assert_eq!(editing.public_id, "a");
        assert_matches!(
            resolver.by_status("b", ArticleStatus::Editing).await,
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn retired_submission_is_addressable_by_version_and_status() {
        let resolver = with_retired_submission().await;
        let retired = resolver
            .by_version_and_status("c", 0, ArticleStatus::Submitted)
            .await
            .unwrap();
        assert!(retired.is_submitted);
        assert_eq!(retired.approved_as, Some(1));

        let by_editor = resolver
            .by_editor_and_status("carol", ArticleStatus::Submitted)
            .await
            .unwrap();
        assert_eq!(by_editor.len(), 1);
    }

    #[tokio::test]
    async fn retired_submission_is_not_pending() {
        let resolver = with_retired_submission().await;
        assert_matches!(
            resolver.by_status("c", ArticleStatus::Submitted).await,
            Err(CoreError::NotFound { .. })
        );
        let queue = resolver
            .all_by_status(ArticleStatus::Submitted)
            .await
            .unwrap();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn list_queries_return_empty_collections() {
        let resolver = seeded().await;
        assert!(resolver.approved_lineage("b").await.unwrap().is_empty());
        let carol = resolver
            .by_editor_and_status("carol", ArticleStatus::Editing)
            .await
            .unwrap();
        assert!(carol.is_empty());
    }

    #[tokio::test]
    async fn approved_lineage_is_ordered_by_version() {
        let resolver = seeded().await;
        let versions: Vec<_> = resolver
            .approved_lineage("a")
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.version)
            .collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[tokio::test]
    async fn editor_and_status_listing() {
        let resolver = seeded().await;
        let alice_editing = resolver
            .by_editor_and_status("alice", ArticleStatus::Editing)
            .await
            .unwrap();
        assert_eq!(alice_editing.len(), 1);
        assert_eq!(alice_editing[0].version, 3);

        let queue = resolver
            .all_by_status(ArticleStatus::Submitted)
            .await
            .unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].public_id, "b");
    }
}
