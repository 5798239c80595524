//! Article lifecycle state machine.
//!
//! [`decide`] is a pure function: it looks at a snapshot of the addressed
//! record and a command, and returns the write the workflow service should
//! perform. It never touches the store.
//!
//! Transition rules:
//! - `EDITING`   -- edit    --> `EDITING` (in place)
//! - `EDITING`   -- submit  --> `SUBMITTED` (in place)
//! - `SUBMITTED` -- edit    --> `SUBMITTED` (in place, content only)
//! - `SUBMITTED` -- approve --> `APPROVED` (new record at version + 1)
//! - `SUBMITTED` -- decline --> `EDITING` (in place, deny text set)
//! - `APPROVED` / `DECLINED` -- edit --> new `EDITING` working copy at
//!   max version + 1
//!
//! An approved submission stays `SUBMITTED` with `approved_as` set and
//! admits no further command.
//!
//! Everything else is an [`CoreError::InvalidTransition`].

use crate::article::{Article, ArticleInput, ArticleStatus, NewArticle};
use crate::error::CoreError;
use crate::types::VersionNumber;

/// A command requested against one stored record.
#[derive(Debug, Clone, Copy)]
pub enum Command<'a> {
    Edit(&'a ArticleInput),
    Submit(&'a ArticleInput),
    Approve(&'a ArticleInput),
    Decline { reason: &'a str },
}

impl Command<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Edit(_) => "edit",
            Command::Submit(_) => "submit",
            Command::Approve(_) => "approve",
            Command::Decline { .. } => "decline",
        }
    }

    fn input(&self) -> Option<&ArticleInput> {
        match self {
            Command::Edit(input) | Command::Submit(input) | Command::Approve(input) => Some(*input),
            Command::Decline { .. } => None,
        }
    }
}

/// The record a command is addressed to, plus the aggregate context the
/// decision needs.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub record: &'a Article,
    /// Highest version stored for the record's `public_id`.
    pub max_version: VersionNumber,
}

/// The write a decision asks the store to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Overwrite the addressed record, guarded by the snapshot it came from.
    InPlace(Article),
    /// Insert a new record for the same `public_id`.
    Revision {
        /// Guarded rewrite of the addressed record, if it changes too.
        retired: Option<Article>,
        record: NewArticle,
        /// Clear `is_editable` on the approved-and-editable record first.
        demote_approved: bool,
    },
}

impl Transition {
    pub fn status(&self) -> ArticleStatus {
        match self {
            Transition::InPlace(article) => article.status,
            Transition::Revision { record, .. } => record.status,
        }
    }
}

/// Decide the outcome of `command` against `snapshot`.
pub fn decide(snapshot: &Snapshot<'_>, command: &Command<'_>) -> Result<Transition, CoreError> {
    let current = snapshot.record;

    if let Some(input) = command.input() {
        check_revision(current, input)?;
    }

    let pending = current.is_pending_submission();
    match (current.status, command) {
        (ArticleStatus::Editing, Command::Edit(input)) => edit_working_copy(snapshot, input),
        (ArticleStatus::Submitted, Command::Edit(input)) if pending => {
            correct_submission(current, input)
        }
        (ArticleStatus::Approved | ArticleStatus::Declined, Command::Edit(input)) => {
            branch_working_copy(snapshot, input)
        }
        (ArticleStatus::Editing, Command::Submit(input)) => submit(current, input),
        (ArticleStatus::Submitted, Command::Approve(input)) if pending => approve(current, input),
        (ArticleStatus::Submitted, Command::Decline { reason }) if pending => {
            Ok(decline(current, reason))
        }
        (status, command) => Err(CoreError::InvalidTransition {
            status,
            command: command.name(),
        }),
    }
}

/// Reject a caller that read an older revision of the row.
fn check_revision(current: &Article, input: &ArticleInput) -> Result<(), CoreError> {
    match input.revision {
        Some(revision) if revision != current.revision => Err(CoreError::Conflict(format!(
            "Article {} was modified: expected revision {revision}, found {}",
            current.public_id, current.revision
        ))),
        _ => Ok(()),
    }
}

/// Reject a caller whose version does not match the record it addresses.
fn check_version(current: &Article, input: &ArticleInput) -> Result<(), CoreError> {
    match input.version {
        Some(version) if version != current.version => Err(CoreError::Conflict(format!(
            "Article {} is at version {}, request was for version {version}",
            current.public_id, current.version
        ))),
        _ => Ok(()),
    }
}

fn next_version(version: VersionNumber) -> Result<VersionNumber, CoreError> {
    version
        .checked_add(1)
        .ok_or_else(|| CoreError::Validation("Version number overflow".into()))
}

fn apply_content(target: &mut Article, input: &ArticleInput) {
    target.title = input.title.clone();
    target.description = input.description.clone();
    target.content = input.content.clone();
    target.edited_by = input.edited_by.clone();
}

fn edit_working_copy(
    snapshot: &Snapshot<'_>,
    input: &ArticleInput,
) -> Result<Transition, CoreError> {
    let current = snapshot.record;
    let version = match input.version {
        None => current.version,
        Some(v) if v == current.version => v,
        Some(v) if v > snapshot.max_version => v,
        Some(v) => {
            return Err(CoreError::Validation(format!(
                "Version {v} is not above the latest stored version {}",
                snapshot.max_version
            )));
        }
    };

    let mut next = current.clone();
    apply_content(&mut next, input);
    next.version = version;
    next.is_editable = input.is_editable.unwrap_or(current.is_editable);
    next.is_submitted = false;
    next.deny_text = None;
    Ok(Transition::InPlace(next))
}

fn correct_submission(current: &Article, input: &ArticleInput) -> Result<Transition, CoreError> {
    if input.version.is_some_and(|v| v != current.version) {
        return Err(CoreError::Validation(
            "The version of a submitted article cannot change".into(),
        ));
    }
    let mut next = current.clone();
    apply_content(&mut next, input);
    Ok(Transition::InPlace(next))
}

fn branch_working_copy(
    snapshot: &Snapshot<'_>,
    input: &ArticleInput,
) -> Result<Transition, CoreError> {
    let source = snapshot.record;
    Ok(Transition::Revision {
        retired: None,
        record: NewArticle {
            public_id: source.public_id.clone(),
            version: next_version(snapshot.max_version)?,
            status: ArticleStatus::Editing,
            title: input.title.clone(),
            description: input.description.clone(),
            content: input.content.clone(),
            edited_by: input.edited_by.clone(),
            is_editable: input.is_editable.unwrap_or(false),
            is_submitted: false,
            deny_text: None,
        },
        demote_approved: true,
    })
}

fn submit(current: &Article, input: &ArticleInput) -> Result<Transition, CoreError> {
    check_version(current, input)?;
    let mut next = current.clone();
    apply_content(&mut next, input);
    next.status = ArticleStatus::Submitted;
    next.is_editable = false;
    next.is_submitted = true;
    next.deny_text = None;
    Ok(Transition::InPlace(next))
}

fn approve(current: &Article, input: &ArticleInput) -> Result<Transition, CoreError> {
    check_version(current, input)?;

    let version = next_version(current.version)?;
    let mut retired = current.clone();
    retired.is_editable = false;
    retired.approved_as = Some(version);

    Ok(Transition::Revision {
        retired: Some(retired),
        record: NewArticle {
            public_id: current.public_id.clone(),
            version,
            status: ArticleStatus::Approved,
            title: input.title.clone(),
            description: input.description.clone(),
            content: input.content.clone(),
            edited_by: input.edited_by.clone(),
            is_editable: true,
            is_submitted: false,
            deny_text: None,
        },
        demote_approved: true,
    })
}

fn decline(current: &Article, reason: &str) -> Transition {
    let mut next = current.clone();
    next.status = ArticleStatus::Editing;
    next.is_submitted = false;
    next.is_editable = false;
    next.deny_text = Some(reason.to_string());
    Transition::InPlace(next)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn record(status: ArticleStatus, version: VersionNumber) -> Article {
        let now = chrono::Utc::now();
        Article {
            id: 1,
            public_id: "pid".into(),
            version,
            status,
            title: "T0".into(),
            description: "D0".into(),
            content: "C0".into(),
            edited_by: "alice".into(),
            is_editable: false,
            is_submitted: status == ArticleStatus::Submitted,
            deny_text: None,
            approved_as: None,
            revision: 3,
            created_at: now,
            updated_at: now,
        }
    }

    fn input() -> ArticleInput {
        ArticleInput::new("T1", "D1", "C1", "bob")
    }

    fn run(
        current: &Article,
        max_version: VersionNumber,
        command: Command<'_>,
    ) -> Result<Transition, CoreError> {
        let snapshot = Snapshot {
            record: current,
            max_version,
        };
        decide(&snapshot, &command)
    }

    fn in_place(result: Result<Transition, CoreError>) -> Article {
        match result {
            Ok(Transition::InPlace(next)) => next,
            other => panic!("expected an in-place write, got {other:?}"),
        }
    }

    // -- edit ----------------------------------------------------------------

    #[test]
    fn edit_updates_working_copy_in_place() {
        let current = record(ArticleStatus::Editing, 0);
        let payload = input().with_editable(true);
        let next = in_place(run(&current, 0, Command::Edit(&payload)));
        assert_eq!(next.id, current.id);
        assert_eq!(next.status, ArticleStatus::Editing);
        assert_eq!(next.version, 0);
        assert_eq!(next.title, "T1");
        assert_eq!(next.edited_by, "bob");
        assert!(next.is_editable);
        assert!(!next.is_submitted);
    }

    #[test]
    fn edit_clears_previous_deny_text() {
        let mut current = record(ArticleStatus::Editing, 0);
        current.deny_text = Some("too short".into());
        let next = in_place(run(&current, 0, Command::Edit(&input())));
        assert_eq!(next.deny_text, None);
    }

    #[test]
    fn edit_may_move_version_above_the_lineage() {
        let current = record(ArticleStatus::Editing, 4);
        let payload = input().with_version(6);
        let next = in_place(run(&current, 4, Command::Edit(&payload)));
        assert_eq!(next.version, 6);
    }

    #[test]
    fn edit_cannot_reuse_a_taken_version() {
        let current = record(ArticleStatus::Editing, 4);
        let payload = input().with_version(2);
        let result = run(&current, 4, Command::Edit(&payload));
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn edit_of_pending_submission_keeps_flags() {
        let current = record(ArticleStatus::Submitted, 1);
        let next = in_place(run(&current, 1, Command::Edit(&input())));
        assert_eq!(next.status, ArticleStatus::Submitted);
        assert!(next.is_submitted);
        assert!(!next.is_editable);
        assert_eq!(next.content, "C1");
    }

    #[test]
    fn edit_of_pending_submission_cannot_change_version() {
        let current = record(ArticleStatus::Submitted, 1);
        let payload = input().with_version(5);
        let result = run(&current, 1, Command::Edit(&payload));
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn edit_of_approved_record_branches_a_new_working_copy() {
        let current = record(ArticleStatus::Approved, 3);
        let transition = run(&current, 5, Command::Edit(&input())).unwrap();
        assert_matches!(
            transition,
            Transition::Revision { retired: None, record, demote_approved: true } => {
                assert_eq!(record.version, 6);
                assert_eq!(record.status, ArticleStatus::Editing);
                assert_eq!(record.public_id, "pid");
                assert!(!record.is_submitted);
                assert_eq!(record.content, "C1");
            }
        );
    }

    #[test]
    fn edit_of_declined_record_branches_like_approved() {
        let current = record(ArticleStatus::Declined, 2);
        assert_matches!(
            run(&current, 2, Command::Edit(&input())),
            Ok(Transition::Revision { record, .. }) if record.version == 3
        );
    }

    // -- submit --------------------------------------------------------------

    #[test]
    fn submit_moves_editing_to_submitted() {
        let current = record(ArticleStatus::Editing, 0);
        let payload = input().with_version(0);
        let next = in_place(run(&current, 0, Command::Submit(&payload)));
        assert_eq!(next.status, ArticleStatus::Submitted);
        assert_eq!(next.version, 0);
        assert!(next.is_submitted);
        assert!(!next.is_editable);
    }

    #[test]
    fn submit_with_wrong_version_conflicts() {
        let current = record(ArticleStatus::Editing, 2);
        let payload = input().with_version(1);
        let result = run(&current, 2, Command::Submit(&payload));
        assert_matches!(result, Err(CoreError::Conflict(_)));
    }

    #[test]
    fn submit_from_approved_is_invalid() {
        let current = record(ArticleStatus::Approved, 1);
        assert_matches!(
            run(&current, 1, Command::Submit(&input())),
            Err(CoreError::InvalidTransition {
                status: ArticleStatus::Approved,
                command: "submit"
            })
        );
    }

    // -- approve -------------------------------------------------------------

    #[test]
    fn approve_inserts_next_version_and_retires_submission() {
        let current = record(ArticleStatus::Submitted, 0);
        let payload = input().with_version(0);
        let transition = run(&current, 0, Command::Approve(&payload)).unwrap();
        assert_matches!(
            transition,
            Transition::Revision { retired: Some(retired), record, demote_approved: true } => {
                assert_eq!(record.version, 1);
                assert_eq!(record.status, ArticleStatus::Approved);
                assert!(record.is_editable);
                assert!(!record.is_submitted);

                assert_eq!(retired.version, 0);
                assert_eq!(retired.status, ArticleStatus::Submitted);
                assert!(retired.is_submitted);
                assert!(!retired.is_editable);
                assert_eq!(retired.approved_as, Some(1));
            }
        );
    }

    #[test]
    fn approve_of_editing_record_is_invalid() {
        let current = record(ArticleStatus::Editing, 0);
        assert_matches!(
            run(&current, 0, Command::Approve(&input())),
            Err(CoreError::InvalidTransition {
                status: ArticleStatus::Editing,
                command: "approve"
            })
        );
    }

    #[test]
    fn retired_submission_admits_no_command() {
        let mut current = record(ArticleStatus::Submitted, 0);
        current.approved_as = Some(1);
        let payload = input();
        for command in [
            Command::Edit(&payload),
            Command::Approve(&payload),
            Command::Decline { reason: "no" },
        ] {
            let result = run(&current, 1, command);
            assert_matches!(result, Err(CoreError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn approve_with_stale_version_conflicts() {
        let current = record(ArticleStatus::Submitted, 2);
        let payload = input().with_version(1);
        let result = run(&current, 2, Command::Approve(&payload));
        assert_matches!(result, Err(CoreError::Conflict(_)));
    }

    // -- decline -------------------------------------------------------------

    #[test]
    fn decline_rolls_back_to_editing_with_reason() {
        let current = record(ArticleStatus::Submitted, 0);
        let next = in_place(run(&current, 0, Command::Decline { reason: "reason" }));
        assert_eq!(next.status, ArticleStatus::Editing);
        assert_eq!(next.deny_text.as_deref(), Some("reason"));
        assert!(!next.is_submitted);
        assert_eq!(next.version, 0);
    }

    #[test]
    fn decline_of_editing_record_is_invalid() {
        let current = record(ArticleStatus::Editing, 0);
        assert_matches!(
            run(&current, 0, Command::Decline { reason: "x" }),
            Err(CoreError::InvalidTransition {
                command: "decline",
                ..
            })
        );
    }

    // -- revision guard ------------------------------------------------------

    #[test]
    fn stale_revision_conflicts_before_any_rule() {
        let current = record(ArticleStatus::Editing, 0);
        let payload = input().with_revision(2);
        let result = run(&current, 0, Command::Edit(&payload));
        assert_matches!(result, Err(CoreError::Conflict(_)));

        let payload = input().with_revision(3);
        assert!(run(&current, 0, Command::Edit(&payload)).is_ok());
    }

    #[test]
    fn decision_does_not_touch_the_snapshot() {
        let current = record(ArticleStatus::Submitted, 0);
        let before = current.clone();
        let _ = run(&current, 0, Command::Approve(&input()));
        assert_eq!(current, before);
    }
}
