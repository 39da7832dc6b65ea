//! Per-descriptor reconciliation state machine
//!
//! `reconcile` never blocks on input. Transitions that would replace or
//! remove something without `force` come back as a [`ConfirmationRequest`]
//! that the caller approves or declines.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{check_symlink, is_broken, link_contents, make_link, unlink, LinkStatus};
use crate::backup::backup_in_place;

/// What happened to a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkAction {
    Created,
    AlreadyCorrect,
    Updated,
    Skipped,
    Removed,
    Error,
}

impl std::fmt::Display for LinkAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::AlreadyCorrect => write!(f, "ok"),
            Self::Updated => write!(f, "updated"),
            Self::Skipped => write!(f, "skipped"),
            Self::Removed => write!(f, "removed"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Result of one reconciliation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkOutcome {
    pub action: LinkAction,
    pub message: String,
    /// Where a displaced regular file was moved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
    pub dry_run: bool,
}

impl LinkOutcome {
    fn new(action: LinkAction, message: impl Into<String>) -> Self {
        Self {
            action,
            message: message.into(),
            backup: None,
            dry_run: false,
        }
    }

    /// Outcome describing what a dry run would have done
    pub fn planned(action: LinkAction, message: impl Into<String>) -> Self {
        Self {
            dry_run: true,
            ..Self::new(action, message)
        }
    }

    /// Whether this outcome counts as a failure
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.action == LinkAction::Error
    }

    /// Outcome for a step that failed before reaching the filesystem
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LinkAction::Error, message)
    }

    /// Outcome for a target deliberately left alone
    pub fn skipped(message: impl Into<String>) -> Self {
        Self::new(LinkAction::Skipped, message)
    }
}

/// Mutation waiting on confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOperation {
    /// Replace whatever is at the target with a link to `source`
    Replace { source: PathBuf },
    /// Delete the link at the target
    Remove,
}

/// A transition that needs the caller's go-ahead
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub target: PathBuf,
    pub status: LinkStatus,
    pub operation: PendingOperation,
}

impl ConfirmationRequest {
    /// Question suitable for an interactive prompt
    #[must_use]
    pub fn prompt(&self) -> String {
        let target = self.target.display();
        match (&self.operation, &self.status) {
            (PendingOperation::Remove, LinkStatus::WrongTarget { actual }) => format!(
                "{target} points to {}. Remove it?",
                actual.display()
            ),
            (PendingOperation::Remove, _) => format!("Remove symlink {target}?"),
            (PendingOperation::Replace { .. }, LinkStatus::NotSymlink) => {
                format!("{target} is a regular file. Back it up and replace it with a symlink?")
            }
            (PendingOperation::Replace { .. }, LinkStatus::WrongTarget { actual }) => format!(
                "{target} points to {}. Replace it?",
                actual.display()
            ),
            (PendingOperation::Replace { .. }, _) => {
                format!("{target} is a broken symlink. Replace it?")
            }
        }
    }

    /// Carry out the pending operation
    ///
    /// The target is inspected again, so changes made while the prompt
    /// was open are taken into account.
    #[must_use]
    pub fn approve(self) -> LinkOutcome {
        match self.operation {
            PendingOperation::Replace { source } => reconcile_forced(&self.target, &source),
            PendingOperation::Remove => remove_forced(&self.target),
        }
    }

    /// Leave the target untouched
    #[must_use]
    pub fn decline(self) -> LinkOutcome {
        debug!(target = %self.target.display(), "declined");
        LinkOutcome::skipped(format!("Skipped {}", self.target.display()))
    }
}

/// Either a finished outcome or a request for confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkResult {
    Outcome(LinkOutcome),
    NeedsConfirmation(ConfirmationRequest),
}

impl LinkResult {
    /// Resolve with a confirmation callback
    pub fn resolve(self, confirm: &mut dyn FnMut(&ConfirmationRequest) -> bool) -> LinkOutcome {
        match self {
            Self::Outcome(outcome) => outcome,
            Self::NeedsConfirmation(request) => {
                if confirm(&request) {
                    request.approve()
                } else {
                    request.decline()
                }
            }
        }
    }
}

/// Bring `target` in line with `source`
pub fn reconcile(target: &Path, source: &Path, force: bool, dry_run: bool) -> LinkResult {
    if !source.exists() {
        return LinkResult::Outcome(LinkOutcome::error(format!(
            "Source does not exist: {}",
            source.display()
        )));
    }

    let status = check_symlink(target, source);
    let display = target.display();

    let outcome = match &status {
        LinkStatus::Correct => {
            LinkOutcome::new(LinkAction::AlreadyCorrect, format!("{display} already linked"))
        }
        LinkStatus::Missing if dry_run => {
            LinkOutcome::planned(LinkAction::Created, format!("Would create {display}"))
        }
        LinkStatus::Missing => create(target, source),
        LinkStatus::Broken | LinkStatus::WrongTarget { .. } | LinkStatus::NotSymlink if dry_run => {
            let verb = if status == LinkStatus::NotSymlink {
                "back up and replace"
            } else {
                "replace"
            };
            LinkOutcome::planned(
                LinkAction::Updated,
                format!("Would {verb} {display} ({})", status.label()),
            )
        }
        _ if force => replace(target, source, &status),
        _ => {
            return LinkResult::NeedsConfirmation(ConfirmationRequest {
                target: target.to_path_buf(),
                status: status.clone(),
                operation: PendingOperation::Replace {
                    source: source.to_path_buf(),
                },
            })
        }
    };

    LinkResult::Outcome(outcome)
}

/// Delete the symlink at `target`
///
/// `expected` is the source the link should resolve to; the confirmation
/// request carries the target's status against it. A path that exists but
/// is not a symlink is never touched.
pub fn remove_symlink(target: &Path, expected: &Path, force: bool) -> LinkResult {
    let meta = match fs::symlink_metadata(target) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return LinkResult::Outcome(LinkOutcome::skipped(format!(
                "{} does not exist",
                target.display()
            )))
        }
        Err(e) => return LinkResult::Outcome(failure(target, &e)),
    };

    if !meta.file_type().is_symlink() {
        return LinkResult::Outcome(LinkOutcome::error(format!(
            "Refusing to remove {}: not a symlink",
            target.display()
        )));
    }

    if force || is_broken(target) {
        return LinkResult::Outcome(remove_forced(target));
    }

    LinkResult::NeedsConfirmation(ConfirmationRequest {
        target: target.to_path_buf(),
        status: check_symlink(target, expected),
        operation: PendingOperation::Remove,
    })
}

fn reconcile_forced(target: &Path, source: &Path) -> LinkOutcome {
    match reconcile(target, source, true, false) {
        LinkResult::Outcome(outcome) => outcome,
        LinkResult::NeedsConfirmation(request) => request.decline(),
    }
}

fn remove_forced(target: &Path) -> LinkOutcome {
    if !target.is_symlink() {
        return LinkOutcome::error(format!(
            "Refusing to remove {}: not a symlink",
            target.display()
        ));
    }
    match unlink(target) {
        Ok(()) => {
            info!(target = %target.display(), "removed symlink");
            LinkOutcome::new(LinkAction::Removed, format!("Removed {}", target.display()))
        }
        Err(e) => failure(target, &e),
    }
}

fn create(target: &Path, source: &Path) -> LinkOutcome {
    if let Some(parent) = target.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            return failure(target, &e);
        }
    }

    let contents = link_contents(target, source);
    match make_link(&contents, target, source.is_dir()) {
        Ok(()) => {
            info!(target = %target.display(), link = %contents.display(), "created symlink");
            LinkOutcome::new(
                LinkAction::Created,
                format!("Linked {} -> {}", target.display(), contents.display()),
            )
        }
        Err(e) => failure(target, &e),
    }
}

/// What was moved out of the way of a new link
enum Displaced {
    Backup(PathBuf),
    Link(Option<PathBuf>),
}

fn replace(target: &Path, source: &Path, status: &LinkStatus) -> LinkOutcome {
    replace_with(target, source, status, create)
}

/// Displace what is at `target`, then link it with `link`
///
/// If linking fails the displaced file or link is put back.
fn replace_with(
    target: &Path,
    source: &Path,
    status: &LinkStatus,
    link: impl FnOnce(&Path, &Path) -> LinkOutcome,
) -> LinkOutcome {
    let displaced = if *status == LinkStatus::NotSymlink {
        match backup_in_place(target) {
            Ok(path) => Displaced::Backup(path),
            Err(e) => return LinkOutcome::error(e.to_string()),
        }
    } else {
        let previous = fs::read_link(target).ok();
        if let Err(e) = unlink(target) {
            return failure(target, &e);
        }
        Displaced::Link(previous)
    };

    let mut outcome = link(target, source);
    if outcome.is_error() {
        restore(target, &displaced);
        return outcome;
    }

    let backup = match displaced {
        Displaced::Backup(path) => Some(path),
        Displaced::Link(_) => None,
    };
    if outcome.action == LinkAction::Created {
        outcome.action = LinkAction::Updated;
        if let Some(path) = &backup {
            outcome.message = format!("{} (previous file saved to {})", outcome.message, path.display());
        }
    }
    outcome.backup = backup;
    outcome
}

fn restore(target: &Path, displaced: &Displaced) {
    let restored = match displaced {
        Displaced::Backup(backup) => fs::rename(backup, target),
        Displaced::Link(Some(previous)) => make_link(previous, target, false),
        Displaced::Link(None) => return,
    };
    match restored {
        Ok(()) => debug!(target = %target.display(), "restored previous entry"),
        Err(e) => warn!(target = %target.display(), error = %e, "could not restore previous entry"),
    }
}

fn failure(target: &Path, err: &io::Error) -> LinkOutcome {
    let message = if err.kind() == io::ErrorKind::PermissionDenied {
        let dir = target.parent().unwrap_or(target);
        format!(
            "Permission denied for {}. Check that you own {} or fix its permissions and retry",
            target.display(),
            dir.display()
        )
    } else {
        format!("Failed to update {}: {err}", target.display())
    };
    LinkOutcome::error(message)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("repo/config/AGENTS.md");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, "# Shared Agent Rules").unwrap();
        let target = dir.path().join("home/AGENTS.md");
        (dir, source, target)
    }

    fn outcome(result: LinkResult) -> LinkOutcome {
        match result {
            LinkResult::Outcome(outcome) => outcome,
            LinkResult::NeedsConfirmation(req) => panic!("unexpected confirmation: {req:?}"),
        }
    }

    #[test]
    fn test_missing_source_is_error_without_mutation() {
        let (dir, _source, target) = fixture();
        let result = outcome(reconcile(&target, &dir.path().join("nope"), true, false));
        assert_eq!(result.action, LinkAction::Error);
        assert!(!target.parent().unwrap().exists());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let (_dir, source, target) = fixture();
        let result = outcome(reconcile(&target, &source, false, true));
        assert_eq!(result.action, LinkAction::Created);
        assert!(result.dry_run);
        assert!(target.symlink_metadata().is_err());
    }

    #[test]
    fn test_wrong_target_needs_confirmation() {
        let (dir, source, target) = fixture();
        let other = dir.path().join("other.md");
        fs::write(&other, "x").unwrap();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        symlink(&other, &target).unwrap();

        let LinkResult::NeedsConfirmation(request) = reconcile(&target, &source, false, false)
        else {
            panic!("expected confirmation");
        };
        assert!(request.prompt().contains("points to"));

        let declined = request.clone().decline();
        assert_eq!(declined.action, LinkAction::Skipped);
        assert_eq!(fs::canonicalize(&target).unwrap(), fs::canonicalize(&other).unwrap());

        let approved = request.approve();
        assert_eq!(approved.action, LinkAction::Updated);
        assert_eq!(check_symlink(&target, &source), LinkStatus::Correct);
    }

    #[test]
    fn test_regular_file_is_backed_up_on_force() {
        let (_dir, source, target) = fixture();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "my own notes").unwrap();

        let result = outcome(reconcile(&target, &source, true, false));
        assert_eq!(result.action, LinkAction::Updated);
        let backup = result.backup.unwrap();
        assert_eq!(fs::read_to_string(backup).unwrap(), "my own notes");
        assert_eq!(check_symlink(&target, &source), LinkStatus::Correct);
    }

    #[test]
    fn test_broken_link_replaced_on_force() {
        let (dir, source, target) = fixture();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        symlink(dir.path().join("vanished"), &target).unwrap();

        let result = outcome(reconcile(&target, &source, true, false));
        assert_eq!(result.action, LinkAction::Updated);
        assert!(result.backup.is_none());
        assert_eq!(check_symlink(&target, &source), LinkStatus::Correct);
    }

    #[test]
    fn test_remove_valid_link_needs_confirmation() {
        let (_dir, source, target) = fixture();
        outcome(reconcile(&target, &source, false, false));

        let LinkResult::NeedsConfirmation(request) = remove_symlink(&target, &source, false)
        else {
            panic!("expected confirmation");
        };
        assert_eq!(request.status, LinkStatus::Correct);
        assert_eq!(request.approve().action, LinkAction::Removed);
        assert!(target.symlink_metadata().is_err());
        assert!(source.exists());
    }

    #[test]
    fn test_remove_broken_link_without_confirmation() {
        let (dir, source, target) = fixture();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        symlink(dir.path().join("vanished"), &target).unwrap();

        let result = outcome(remove_symlink(&target, &source, false));
        assert_eq!(result.action, LinkAction::Removed);
    }

    #[test]
    fn test_remove_request_carries_actual_status() {
        let (dir, source, target) = fixture();
        let other = dir.path().join("other.md");
        fs::write(&other, "x").unwrap();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        symlink(&other, &target).unwrap();

        let LinkResult::NeedsConfirmation(request) = remove_symlink(&target, &source, false)
        else {
            panic!("expected confirmation");
        };
        assert_eq!(request.status, LinkStatus::WrongTarget { actual: other.clone() });
        assert!(request.prompt().contains(&format!("points to {}", other.display())));

        assert_eq!(request.decline().action, LinkAction::Skipped);
        assert!(target.is_symlink());
    }

    #[test]
    fn test_failed_replace_restores_backup() {
        let (dir, source, target) = fixture();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "my own notes").unwrap();

        let result = replace_with(&target, &source, &LinkStatus::NotSymlink, |t, _| {
            failure(t, &io::Error::from(io::ErrorKind::Other))
        });
        assert!(result.is_error());
        assert!(result.backup.is_none());
        assert!(!target.is_symlink());
        assert_eq!(fs::read_to_string(&target).unwrap(), "my own notes");

        let entries = fs::read_dir(target.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
        drop(dir);
    }

    #[test]
    fn test_failed_replace_restores_previous_link() {
        let (dir, source, target) = fixture();
        let other = dir.path().join("other.md");
        fs::write(&other, "x").unwrap();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        symlink(&other, &target).unwrap();
        let status = check_symlink(&target, &source);

        let result = replace_with(&target, &source, &status, |t, _| {
            failure(t, &io::Error::from(io::ErrorKind::Other))
        });
        assert!(result.is_error());
        assert_eq!(fs::read_link(&target).unwrap(), other);
    }

    #[test]
    fn test_permission_denied_is_error_with_hint() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, source, target) = fixture();
        let parent = target.parent().unwrap();
        fs::create_dir_all(parent).unwrap();
        fs::set_permissions(parent, fs::Permissions::from_mode(0o555)).unwrap();

        // Permission bits do not bind a privileged user.
        if fs::write(parent.join(".writable"), "").is_ok() {
            fs::set_permissions(parent, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = outcome(reconcile(&target, &source, false, false));
        fs::set_permissions(parent, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(result.action, LinkAction::Error);
        assert!(result.message.contains("Permission denied"));
        assert!(result
            .message
            .contains(&format!("Check that you own {}", parent.display())));
        assert!(target.symlink_metadata().is_err());
    }

    #[test]
    fn test_resolve_with_callback() {
        let (dir, source, target) = fixture();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "keep me").unwrap();

        let mut asked = 0;
        let result = reconcile(&target, &source, false, false).resolve(&mut |_| {
            asked += 1;
            false
        });
        assert_eq!(asked, 1);
        assert_eq!(result.action, LinkAction::Skipped);
        assert_eq!(fs::read_to_string(&target).unwrap(), "keep me");
        drop(dir);
    }
}
