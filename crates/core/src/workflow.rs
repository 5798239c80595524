//! Workflow service: the public entry point of the engine.
//!
//! Every write follows the same shape: resolve the addressed record, let
//! [`state_machine::decide`] compute the next state, then hand the record as
//! read plus the decision to [`VersionedRecordStore::save`], which applies
//! it only if the row is still unchanged.

use std::sync::Arc;

use crate::article::{
    generate_or_retain_public_id, validate_deny_text, validate_input, validate_public_id, Article,
    ArticleInput, ArticleStatus, EditorClaim, NewArticle, INITIAL_VERSION,
};
use crate::error::CoreError;
use crate::lookup::LookupResolver;
use crate::state_machine::{self, Command, Snapshot, Transition};
use crate::store::VersionedRecordStore;
use crate::types::VersionNumber;

/// Orchestrates article lifecycle commands against a record store.
#[derive(Clone)]
pub struct WorkflowService {
    store: Arc<dyn VersionedRecordStore>,
    lookup: LookupResolver,
}

impl WorkflowService {
    pub fn new(store: Arc<dyn VersionedRecordStore>) -> Self {
        let lookup = LookupResolver::new(Arc::clone(&store));
        Self { store, lookup }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a new article: version 0, `EDITING`, not editable.
    pub async fn create(&self, input: &ArticleInput) -> Result<Article, CoreError> {
        validate_input(input)?;
        let record = NewArticle {
            public_id: generate_or_retain_public_id(input.public_id.as_deref()),
            version: INITIAL_VERSION,
            status: ArticleStatus::Editing,
            title: input.title.clone(),
            description: input.description.clone(),
            content: input.content.clone(),
            edited_by: input.edited_by.clone(),
            is_editable: false,
            is_submitted: false,
            deny_text: None,
        };
        let article = self.store.insert(&record).await?;
        tracing::info!(
            public_id = %article.public_id,
            edited_by = %article.edited_by,
            "Article created"
        );
        Ok(article)
    }

    /// Edit the record at `(public_id, expected_version)`.
    ///
    /// Working copies are rewritten in place; approved history is never
    /// touched and instead yields a fresh working copy.
    pub async fn update(
        &self,
        public_id: &str,
        input: &ArticleInput,
        expected_version: VersionNumber,
    ) -> Result<Article, CoreError> {
        validate_public_id(public_id)?;
        validate_input(input)?;
        check_same_article(public_id, input)?;

        let current = self.lookup.by_version(public_id, expected_version).await?;
        self.apply(&current, Command::Edit(input)).await
    }

    /// Submit the article's working copy for review.
    pub async fn submit(&self, input: &ArticleInput) -> Result<Article, CoreError> {
        validate_input(input)?;
        let public_id = input
            .public_id
            .as_deref()
            .ok_or_else(|| CoreError::Validation("Public id must not be empty".into()))?;

        let current = self
            .lookup
            .by_status(public_id, ArticleStatus::Editing)
            .await?;
        self.apply(&current, Command::Submit(input)).await
    }

    /// Approve the pending submission, producing the next approved version.
    pub async fn approve(
        &self,
        public_id: &str,
        input: &ArticleInput,
    ) -> Result<Article, CoreError> {
        validate_public_id(public_id)?;
        validate_input(input)?;
        check_same_article(public_id, input)?;

        let current = self.approval_target(public_id, input.version).await?;
        self.apply(&current, Command::Approve(input)).await
    }

    /// Decline the article's record in `status`, sending it back to editing.
    pub async fn decline(
        &self,
        public_id: &str,
        status: ArticleStatus,
        reason: &str,
    ) -> Result<Article, CoreError> {
        validate_public_id(public_id)?;
        validate_deny_text(reason)?;

        let current = self.lookup.by_status(public_id, status).await?;
        self.apply(&current, Command::Decline { reason }).await
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub async fn get_by_public_id(
        &self,
        public_id: &str,
        status: ArticleStatus,
    ) -> Result<Article, CoreError> {
        self.lookup.by_status(public_id, status).await
    }

    pub async fn get_latest(&self, public_id: &str) -> Result<Article, CoreError> {
        self.lookup.latest(public_id).await
    }

    pub async fn get_latest_approved(&self, public_id: &str) -> Result<Article, CoreError> {
        self.lookup.latest_approved(public_id).await
    }

    pub async fn get_by_version(
        &self,
        public_id: &str,
        version: VersionNumber,
    ) -> Result<Article, CoreError> {
        self.lookup.by_version(public_id, version).await
    }

    pub async fn get_by_version_and_status(
        &self,
        public_id: &str,
        version: VersionNumber,
        status: ArticleStatus,
    ) -> Result<Article, CoreError> {
        self.lookup
            .by_version_and_status(public_id, version, status)
            .await
    }

    pub async fn list_by_status(&self, status: ArticleStatus) -> Result<Vec<Article>, CoreError> {
        self.lookup.all_by_status(status).await
    }

    pub async fn list_approved(&self, public_id: &str) -> Result<Vec<Article>, CoreError> {
        self.lookup.approved_lineage(public_id).await
    }

    pub async fn list_by_editor_and_status(
        &self,
        edited_by: &str,
        status: ArticleStatus,
    ) -> Result<Vec<Article>, CoreError> {
        self.lookup.by_editor_and_status(edited_by, status).await
    }

    /// Who holds the article's `EDITING` working copy, and at which version.
    pub async fn current_editor(&self, public_id: &str) -> Result<EditorClaim, CoreError> {
        let working_copy = self
            .lookup
            .by_status(public_id, ArticleStatus::Editing)
            .await?;
        Ok(EditorClaim {
            public_id: working_copy.public_id,
            edited_by: working_copy.edited_by,
            version: working_copy.version,
        })
    }

    // ── Internals ────────────────────────────────────────────────────

    /// The record an approval is addressed to: the requested version if
    /// given, else the pending submission, else the newest record so the
    /// state machine can report why it cannot be approved.
    async fn approval_target(
        &self,
        public_id: &str,
        version: Option<VersionNumber>,
    ) -> Result<Article, CoreError> {
        if let Some(version) = version {
            return self.lookup.by_version(public_id, version).await;
        }
        let pending = self
            .lookup
            .by_status(public_id, ArticleStatus::Submitted)
            .await;
        match pending {
            Err(CoreError::NotFound { .. }) => self.lookup.latest(public_id).await,
            other => other,
        }
    }

    async fn apply(&self, current: &Article, command: Command<'_>) -> Result<Article, CoreError> {
        let max_version = self.lookup.max_version(&current.public_id).await?;
        let snapshot = Snapshot {
            record: current,
            max_version,
        };

        let transition = state_machine::decide(&snapshot, &command).map_err(|err| {
            tracing::debug!(
                public_id = %current.public_id,
                version = current.version,
                status = %current.status,
                command = command.name(),
                error = %err,
                "Article command rejected"
            );
            err
        })?;

        let saved = match self.store.save(current, &transition).await {
            Ok(saved) => saved,
            Err(err @ CoreError::Conflict(_)) => {
                tracing::warn!(
                    public_id = %current.public_id,
                    version = current.version,
                    command = command.name(),
                    error = %err,
                    "Concurrent modification detected"
                );
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        tracing::info!(
            public_id = %saved.public_id,
            command = command.name(),
            from_status = %current.status,
            to_status = %transition.status(),
            version = saved.version,
            new_record = matches!(transition, Transition::Revision { .. }),
            "Article transition applied"
        );
        Ok(saved)
    }
}

/// A payload naming a different article than the address is a caller bug.
fn check_same_article(public_id: &str, input: &ArticleInput) -> Result<(), CoreError> {
    match input.public_id.as_deref() {
        Some(other) if other.trim() != public_id.trim() => Err(CoreError::Validation(format!(
            "Payload public id '{other}' does not match '{public_id}'"
        ))),
        _ => Ok(()),
    }
}
