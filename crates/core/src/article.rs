//! Article record model, status enum, caller payloads and field validation.
//!
//! Everything here is storage-agnostic. The `db` crate maps its rows onto
//! [`Article`] and the workflow service consumes [`ArticleInput`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp, VersionNumber};

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum length for an article title (characters).
pub const MAX_TITLE_LENGTH: usize = 255;

/// Maximum length for an article description (characters).
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Maximum length for a decline reason (characters).
pub const MAX_DENY_TEXT_LENGTH: usize = 2_000;

/// Version assigned to every newly created article.
pub const INITIAL_VERSION: VersionNumber = 0;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// All valid status names.
pub const VALID_STATUS_NAMES: &[&str] = &["EDITING", "SUBMITTED", "APPROVED", "DECLINED"];

/// Editorial lifecycle status of a stored article record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArticleStatus {
    Editing,
    Submitted,
    Approved,
    /// Accepted as a value, but no transition produces it.
    Declined,
}

impl ArticleStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [ArticleStatus; 4] = [
        ArticleStatus::Editing,
        ArticleStatus::Submitted,
        ArticleStatus::Approved,
        ArticleStatus::Declined,
    ];

    /// The canonical (database and wire) name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            ArticleStatus::Editing => "EDITING",
            ArticleStatus::Submitted => "SUBMITTED",
            ArticleStatus::Approved => "APPROVED",
            ArticleStatus::Declined => "DECLINED",
        }
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        ArticleStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid article status '{s}'. Must be one of: {}",
                    VALID_STATUS_NAMES.join(", ")
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One stored revision of an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    #[serde(skip_serializing)]
    pub id: DbId,
    pub public_id: String,
    pub version: VersionNumber,
    pub status: ArticleStatus,
    pub title: String,
    pub description: String,
    pub content: String,
    pub edited_by: String,
    pub is_editable: bool,
    /// Mirrors `status == SUBMITTED`.
    pub is_submitted: bool,
    pub deny_text: Option<String>,
    /// Set on a submission once it has been approved: the version of the
    /// approved record it produced. Such a row is retired history.
    pub approved_as: Option<VersionNumber>,
    /// Optimistic lock counter, bumped by every in-place write.
    pub revision: VersionNumber,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Article {
    /// A submission that was approved and kept as history.
    pub fn is_retired(&self) -> bool {
        self.approved_as.is_some()
    }

    /// A `SUBMITTED` record still waiting for approve/decline.
    pub fn is_pending_submission(&self) -> bool {
        self.status == ArticleStatus::Submitted && !self.is_retired()
    }

    /// The record currently holding the article's in-progress content.
    pub fn is_working_copy(&self) -> bool {
        self.status == ArticleStatus::Editing || self.is_pending_submission()
    }

    /// Human-readable address used in error messages and logs.
    pub fn address(&self) -> String {
        format!(
            "public_id={} version={} status={}",
            self.public_id, self.version, self.status
        )
    }
}

/// A record about to be inserted. The store assigns `id`, `revision` and
/// the timestamps. New records are never retired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub public_id: String,
    pub version: VersionNumber,
    pub status: ArticleStatus,
    pub title: String,
    pub description: String,
    pub content: String,
    pub edited_by: String,
    pub is_editable: bool,
    pub is_submitted: bool,
    pub deny_text: Option<String>,
}

impl NewArticle {
    pub fn is_working_copy(&self) -> bool {
        matches!(self.status, ArticleStatus::Editing | ArticleStatus::Submitted)
    }
}

/// Who is editing an article's working copy, and at which version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorClaim {
    pub public_id: String,
    pub edited_by: String,
    pub version: VersionNumber,
}

// ---------------------------------------------------------------------------
// Caller payload
// ---------------------------------------------------------------------------

/// Content payload carried by create/update/submit/approve commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArticleInput {
    /// Generated on create when `None`.
    #[serde(default)]
    pub public_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content: String,
    pub edited_by: String,
    /// Version the caller believes it is working on.
    #[serde(default)]
    pub version: Option<VersionNumber>,
    /// Revision the caller last read; checked before any write.
    #[serde(default)]
    pub revision: Option<VersionNumber>,
    #[serde(default)]
    pub is_editable: Option<bool>,
}

impl ArticleInput {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        content: impl Into<String>,
        edited_by: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            content: content.into(),
            edited_by: edited_by.into(),
            ..Self::default()
        }
    }

    pub fn with_public_id(mut self, public_id: impl Into<String>) -> Self {
        self.public_id = Some(public_id.into());
        self
    }

    pub fn with_version(mut self, version: VersionNumber) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_revision(mut self, revision: VersionNumber) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn with_editable(mut self, is_editable: bool) -> Self {
        self.is_editable = Some(is_editable);
        self
    }
}

// ---------------------------------------------------------------------------
// Query filter
// ---------------------------------------------------------------------------

/// Conjunctive filter for record queries. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    pub public_id: Option<String>,
    pub version: Option<VersionNumber>,
    pub status: Option<ArticleStatus>,
    pub edited_by: Option<String>,
    pub is_editable: Option<bool>,
    /// `Some(false)` keeps live records only, `Some(true)` retired ones only.
    pub retired: Option<bool>,
}

impl ArticleFilter {
    pub fn public_id(mut self, public_id: impl Into<String>) -> Self {
        self.public_id = Some(public_id.into());
        self
    }

    pub fn version(mut self, version: VersionNumber) -> Self {
        self.version = Some(version);
        self
    }

    pub fn status(mut self, status: ArticleStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn edited_by(mut self, edited_by: impl Into<String>) -> Self {
        self.edited_by = Some(edited_by.into());
        self
    }

    pub fn is_editable(mut self, is_editable: bool) -> Self {
        self.is_editable = Some(is_editable);
        self
    }

    pub fn retired(mut self, retired: bool) -> Self {
        self.retired = Some(retired);
        self
    }

    pub fn matches(&self, article: &Article) -> bool {
        self.public_id
            .as_deref()
            .map_or(true, |id| article.public_id == id)
            && self.version.map_or(true, |v| article.version == v)
            && self.status.map_or(true, |s| article.status == s)
            && self
                .edited_by
                .as_deref()
                .map_or(true, |who| article.edited_by == who)
            && self.is_editable.map_or(true, |e| article.is_editable == e)
            && self.retired.map_or(true, |r| article.is_retired() == r)
    }
}

// ---------------------------------------------------------------------------
// Public id
// ---------------------------------------------------------------------------

/// Return the caller's public id, or a fresh random one when absent.
pub fn generate_or_retain_public_id(public_id: Option<&str>) -> String {
    match public_id {
        Some(id) => id.trim().to_string(),
        None => uuid::Uuid::new_v4().to_string(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn require_not_blank(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_max_chars(field: &str, value: &str, max: usize) -> Result<(), CoreError> {
    if value.chars().count() > max {
        return Err(CoreError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Validate an article title (non-blank, <= 255 chars).
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    require_not_blank("Title", title)?;
    require_max_chars("Title", title, MAX_TITLE_LENGTH)
}

/// Validate an article description (may be empty, <= 500 chars).
pub fn validate_description(description: &str) -> Result<(), CoreError> {
    require_max_chars("Description", description, MAX_DESCRIPTION_LENGTH)
}

pub fn validate_content(content: &str) -> Result<(), CoreError> {
    require_not_blank("Content", content)
}

pub fn validate_editor(edited_by: &str) -> Result<(), CoreError> {
    require_not_blank("Editor", edited_by)
}

pub fn validate_public_id(public_id: &str) -> Result<(), CoreError> {
    require_not_blank("Public id", public_id)
}

/// Validate a decline reason (non-blank, <= 2000 chars).
pub fn validate_deny_text(reason: &str) -> Result<(), CoreError> {
    require_not_blank("Decline reason", reason)?;
    require_max_chars("Decline reason", reason, MAX_DENY_TEXT_LENGTH)
}

/// Validate every field a state-changing write depends on.
pub fn validate_input(input: &ArticleInput) -> Result<(), CoreError> {
    if let Some(public_id) = input.public_id.as_deref() {
        validate_public_id(public_id)?;
    }
    validate_title(&input.title)?;
    validate_description(&input.description)?;
    validate_content(&input.content)?;
    validate_editor(&input.edited_by)?;
    if let Some(version) = input.version {
        if version < 0 {
            return Err(CoreError::Validation("Version must not be negative".into()));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
