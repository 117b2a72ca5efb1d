//! Versioned file operations with Git-based version control.
//!
//! HIS stores every record as a YAML file and versions the whole data directory with a local
//! Git repository (`git2`/libgit2). This module provides:
//!
//! - **Atomic multi-file operations**: write several files and commit them in one commit, with
//!   rollback of file contents and created directories on failure
//! - **Structured commit messages**: a controlled vocabulary of domains and actions, plus
//!   `Author-*` and `Care-Location` trailers
//! - **Audit trail**: nothing is deleted; [`VersionedFileService::history`] reads the commit log
//!
//! ## Branch policy
//!
//! The store standardises on `refs/heads/main`.
//!
//! ## Commit message format
//!
//! ```text
//! case:close: Case closed
//!
//! Author-Name: Dr. Robert Koch
//! Author-Role: doctor
//! Author-Username: rkoch
//! Care-Location: General Hospital
//! ```
//!
//! Commit messages are labels. They never carry patient names or clinical text.

use crate::author::Author;
use crate::error::{HisError, HisResult};
use chrono::{DateTime, Utc};
use his_types::NonEmptyText;
use std::fmt;
use std::path::{Path, PathBuf};

const MAIN_REF: &str = "refs/heads/main";

/// Controlled vocabulary for commit message domains: which area of the hospital record a
/// commit touches.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HisCommitDomain {
    Store,
    Account,
    Facility,
    Patient,
    Case,
    Act,
    Order,
    Report,
}

impl HisCommitDomain {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Account => "account",
            Self::Facility => "facility",
            Self::Patient => "patient",
            Self::Case => "case",
            Self::Act => "act",
            Self::Order => "order",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for HisCommitDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controlled vocabulary for commit message actions.
///
/// - `Create`: a new record was written.
/// - `Update`: an existing record changed (assignment, new password, occupancy, ...).
/// - `Close`: a closeable record (case, act, order) was closed.
/// - `Reopen`: a closed record was reopened.
///
/// Records are never deleted, so there is no delete action.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HisCommitAction {
    Create,
    Update,
    Close,
    Reopen,
}

impl HisCommitAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Close => "close",
            Self::Reopen => "reopen",
        }
    }
}

impl fmt::Display for HisCommitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured, predictable commit message.
///
/// Rendering rules:
///
/// - Subject line: `<domain>:<action>: <summary>`
/// - A blank line, then the trailers `Author-Name`, `Author-Role`, `Author-Username` and
///   `Care-Location`, in that order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HisCommitMessage {
    domain: HisCommitDomain,
    action: HisCommitAction,
    summary: NonEmptyText,
    care_location: NonEmptyText,
}

impl HisCommitMessage {
    /// Create a new commit message.
    ///
    /// # Errors
    ///
    /// Returns `HisError::InvalidInput` if `summary` is empty or spans several lines,
    /// `HisError::MissingCareLocation` if `care_location` is empty and
    /// `HisError::InvalidCareLocation` if it spans several lines.
    pub fn new(
        domain: HisCommitDomain,
        action: HisCommitAction,
        summary: impl AsRef<str>,
        care_location: impl AsRef<str>,
    ) -> HisResult<Self> {
        let summary_str = summary.as_ref().trim();
        if summary_str.contains(['\n', '\r']) {
            return Err(HisError::InvalidInput(
                "commit summary must be single-line".into(),
            ));
        }
        let summary = NonEmptyText::new(summary_str)
            .map_err(|_| HisError::InvalidInput("commit summary must be non-empty".into()))?;

        let care_location_str = care_location.as_ref().trim();
        if care_location_str.contains(['\n', '\r']) {
            return Err(HisError::InvalidCareLocation);
        }
        let care_location =
            NonEmptyText::new(care_location_str).map_err(|_| HisError::MissingCareLocation)?;

        Ok(Self {
            domain,
            action,
            summary,
            care_location,
        })
    }

    /// Render the full commit message including the author trailers.
    ///
    /// # Errors
    ///
    /// Returns `HisError::InvalidAuthor` if the author fields cannot be rendered as trailers.
    pub fn render_with_author(&self, author: &Author) -> HisResult<String> {
        author.validate_commit_author()?;

        let mut rendered = format!("{}:{}: {}", self.domain, self.action, self.summary.as_str());

        rendered.push_str("\n\n");
        rendered.push_str("Author-Name: ");
        rendered.push_str(author.name.as_str());
        rendered.push('\n');
        rendered.push_str("Author-Role: ");
        rendered.push_str(author.role.as_str());
        rendered.push('\n');
        rendered.push_str("Author-Username: ");
        rendered.push_str(author.username.as_str());
        rendered.push('\n');
        rendered.push_str("Care-Location: ");
        rendered.push_str(self.care_location.as_str());

        Ok(rendered)
    }
}

/// Represents a file to be written and committed.
///
/// Used with [`VersionedFileService::write_and_commit_files`] to write multiple files
/// in a single atomic commit operation.
#[derive(Debug, Clone)]
pub struct FileToWrite<'a> {
    /// The relative path to the file within the repository directory.
    pub relative_path: &'a Path,
    /// The new content to write to the file.
    pub content: &'a str,
    /// The previous file content for rollback. `None` if this is a new file.
    pub old_content: Option<&'a str>,
}

/// One entry of the store's audit trail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditEntry {
    /// Commit id (hex).
    pub commit_id: String,
    /// Commit time.
    pub committed_at: DateTime<Utc>,
    /// Subject line, `<domain>:<action>: <summary>`.
    pub subject: String,
    /// Value of the `Author-Name` trailer, or the git author name.
    pub author_name: String,
    /// Value of the `Author-Username` trailer, if present.
    pub author_username: Option<String>,
    /// Value of the `Care-Location` trailer, if present.
    pub care_location: Option<String>,
}

/// Service for managing versioned files with Git version control.
///
/// Bundles the repository handle and its workdir. Opening is cheap, so callers open a fresh
/// service per operation instead of sharing a `git2::Repository` across threads.
pub struct VersionedFileService {
    repo: git2::Repository,
    workdir: PathBuf,
}

impl VersionedFileService {
    /// Create a new Git repository at the specified working directory.
    ///
    /// # Errors
    ///
    /// Returns [`HisError::GitInit`] if initialisation fails or the repository is bare.
    pub(crate) fn init(workdir: &Path) -> HisResult<Self> {
        let repo = git2::Repository::init(workdir).map_err(HisError::GitInit)?;
        let actual_workdir = repo
            .workdir()
            .ok_or_else(|| {
                HisError::GitInit(git2::Error::from_str("repository has no working directory"))
            })?
            .to_path_buf();
        Ok(Self {
            repo,
            workdir: actual_workdir,
        })
    }

    /// Open an existing Git repository at the specified working directory.
    ///
    /// Uses `NO_SEARCH` so a data directory nested inside some other checkout never commits
    /// into the outer repository.
    ///
    /// # Errors
    ///
    /// Returns [`HisError::GitOpen`] if no repository exists at `workdir` or it cannot be opened.
    pub(crate) fn open(workdir: &Path) -> HisResult<Self> {
        let repo = git2::Repository::open_ext(
            workdir,
            git2::RepositoryOpenFlags::NO_SEARCH,
            std::iter::empty::<&std::ffi::OsStr>(),
        )
        .map_err(HisError::GitOpen)?;
        // git2 may canonicalise the path, so take the workdir from the repository itself.
        let actual_workdir = repo
            .workdir()
            .ok_or_else(|| {
                HisError::GitOpen(git2::Error::from_str("repository has no working directory"))
            })?
            .to_path_buf();
        Ok(Self {
            repo,
            workdir: actual_workdir,
        })
    }

    /// Returns true if `workdir` already holds a repository.
    pub(crate) fn exists(workdir: &Path) -> bool {
        workdir.join(".git").is_dir()
    }

    fn ensure_main_head(&self) -> HisResult<()> {
        self.repo
            .set_head(MAIN_REF)
            .map_err(HisError::GitSetHead)?;
        Ok(())
    }

    /// Create a commit including only the provided paths.
    ///
    /// Paths may be workdir-relative or absolute paths under the workdir. Paths containing
    /// `..` are rejected.
    pub(crate) fn commit_paths(
        &self,
        author: &Author,
        message: &HisCommitMessage,
        relative_paths: &[PathBuf],
    ) -> HisResult<git2::Oid> {
        let rendered = message.render_with_author(author)?;
        self.commit_paths_rendered(author, &rendered, relative_paths)
    }

    /// Writes multiple files and commits them with rollback on failure.
    ///
    /// Creates any missing parent directories, writes all files and commits them in a single
    /// commit. On error:
    /// - files that previously existed are restored to their previous content
    /// - new files are removed
    /// - directories created during this operation are removed
    ///
    /// # Errors
    ///
    /// Returns [`HisError::FileWrite`] for filesystem failures and the `Git*` variants for
    /// commit failures.
    pub(crate) fn write_and_commit_files(
        &self,
        author: &Author,
        msg: &HisCommitMessage,
        files: &[FileToWrite<'_>],
    ) -> HisResult<git2::Oid> {
        let mut created_dirs: Vec<PathBuf> = Vec::new();
        let mut written_files: Vec<(PathBuf, Option<String>)> = Vec::new();

        let result: HisResult<git2::Oid> = (|| {
            let mut dirs_needed = std::collections::HashSet::new();
            for file in files {
                let full_path = self.workdir.join(file.relative_path);
                if let Some(parent) = full_path.parent() {
                    let mut current = parent;
                    while current != self.workdir && !current.exists() {
                        dirs_needed.insert(current.to_path_buf());
                        match current.parent() {
                            Some(parent_of_current) => current = parent_of_current,
                            None => break,
                        }
                    }
                }
            }

            // Shallowest first.
            let mut dirs_to_create: Vec<PathBuf> = dirs_needed.into_iter().collect();
            dirs_to_create.sort_by_key(|p| p.components().count());

            for dir in &dirs_to_create {
                std::fs::create_dir(dir).map_err(HisError::FileWrite)?;
                created_dirs.push(dir.clone());
            }

            for file in files {
                let full_path = self.workdir.join(file.relative_path);
                let old_content = file.old_content.map(|s| s.to_string());

                std::fs::write(&full_path, file.content).map_err(HisError::FileWrite)?;
                written_files.push((full_path, old_content));
            }

            let paths: Vec<PathBuf> = files
                .iter()
                .map(|f| f.relative_path.to_path_buf())
                .collect();
            self.commit_paths(author, msg, &paths)
        })();

        match result {
            Ok(oid) => Ok(oid),
            Err(write_error) => {
                for (full_path, old_content) in written_files.iter().rev() {
                    match old_content {
                        Some(contents) => {
                            let _ = std::fs::write(full_path, contents);
                        }
                        None => {
                            let _ = std::fs::remove_file(full_path);
                        }
                    }
                }

                // Deepest first.
                for dir in created_dirs.iter().rev() {
                    let _ = std::fs::remove_dir(dir);
                }

                tracing::warn!("rolled back {} file(s) after failed commit", written_files.len());
                Err(write_error)
            }
        }
    }

    /// Initialise a Git repository, commit initial files, and clean up on failure.
    ///
    /// If `workdir` did not exist beforehand it is removed entirely on failure; otherwise only
    /// the `.git` directory created here is removed (written files are already rolled back by
    /// [`Self::write_and_commit_files`]).
    ///
    /// # Errors
    ///
    /// Returns the initialisation error, or [`HisError::CleanupAfterInitialiseFailed`] if the
    /// cleanup failed as well.
    pub(crate) fn init_and_commit(
        workdir: &Path,
        author: &Author,
        message: &HisCommitMessage,
        files: &[FileToWrite<'_>],
    ) -> HisResult<()> {
        let existed = workdir.exists();

        let result: HisResult<()> = (|| {
            if !existed {
                std::fs::create_dir_all(workdir).map_err(HisError::StorageDirCreation)?;
            }
            let service = Self::init(workdir)?;
            service.write_and_commit_files(author, message, files)?;
            Ok(())
        })();

        match result {
            Ok(()) => Ok(()),
            Err(init_error) => {
                let cleanup = if existed {
                    let git_dir = workdir.join(".git");
                    if git_dir.exists() {
                        std::fs::remove_dir_all(git_dir)
                    } else {
                        Ok(())
                    }
                } else if workdir.exists() {
                    std::fs::remove_dir_all(workdir)
                } else {
                    Ok(())
                };

                if let Err(cleanup_err) = cleanup {
                    return Err(HisError::CleanupAfterInitialiseFailed {
                        path: workdir.to_path_buf(),
                        init_error: Box::new(init_error),
                        cleanup_error: cleanup_err,
                    });
                }
                Err(init_error)
            }
        }
    }

    /// Read the most recent `limit` commits, newest first.
    ///
    /// An empty repository yields an empty list.
    pub(crate) fn history(&self, limit: usize) -> HisResult<Vec<AuditEntry>> {
        if self.resolve_head_parents()?.is_empty() {
            return Ok(Vec::new());
        }

        let mut revwalk = self.repo.revwalk().map_err(HisError::GitRevwalk)?;
        revwalk.push_head().map_err(HisError::GitRevwalk)?;
        revwalk
            .set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)
            .map_err(HisError::GitRevwalk)?;

        let mut entries = Vec::new();
        for oid in revwalk.take(limit) {
            let oid = oid.map_err(HisError::GitRevwalk)?;
            let commit = self.repo.find_commit(oid).map_err(HisError::GitRevwalk)?;
            let message = commit.message().unwrap_or_default();

            let committed_at = DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0)
                .unwrap_or_default();
            let author_name = trailer_value(message, "Author-Name")
                .or_else(|| commit.author().name().map(str::to_string))
                .unwrap_or_default();

            entries.push(AuditEntry {
                commit_id: oid.to_string(),
                committed_at,
                subject: commit.summary().unwrap_or_default().to_string(),
                author_name,
                author_username: trailer_value(message, "Author-Username"),
                care_location: trailer_value(message, "Care-Location"),
            });
        }

        Ok(entries)
    }

    fn commit_paths_rendered(
        &self,
        author: &Author,
        message: &str,
        relative_paths: &[PathBuf],
    ) -> HisResult<git2::Oid> {
        self.ensure_main_head()?;
        let mut index = self.repo.index().map_err(HisError::GitIndex)?;

        for path in relative_paths {
            // `git2::Index::add_path` requires repo-workdir-relative paths.
            let rel = if path.is_absolute() {
                path.strip_prefix(&self.workdir)
                    .map_err(|_| {
                        HisError::InvalidInput(
                            "path is outside the repository working directory".into(),
                        )
                    })?
                    .to_path_buf()
            } else {
                path.to_path_buf()
            };

            if rel
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
            {
                return Err(HisError::InvalidInput(
                    "path must not contain parent directory references (..)".into(),
                ));
            }

            index.add_path(&rel).map_err(HisError::GitAdd)?;
        }
        index.write().map_err(HisError::GitIndex)?;

        self.commit_from_index(author, message, &mut index)
    }

    fn commit_from_index(
        &self,
        author: &Author,
        message: &str,
        index: &mut git2::Index,
    ) -> HisResult<git2::Oid> {
        author.validate_commit_author()?;

        let tree_id = index.write_tree().map_err(HisError::GitWriteTree)?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(HisError::GitFindTree)?;

        let sig = git2::Signature::now(author.name.as_str(), &author.email)
            .map_err(HisError::GitSignature)?;

        let parents = self.resolve_head_parents()?;
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .map_err(HisError::GitCommit)
    }

    /// Resolve the parent commit(s) for a new commit.
    ///
    /// An unborn `main` branch has no parents; otherwise the current `HEAD` commit is the
    /// single parent.
    fn resolve_head_parents(&self) -> HisResult<Vec<git2::Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => {
                let commit = head.peel_to_commit().map_err(HisError::GitPeel)?;
                Ok(vec![commit])
            }
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(vec![]),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(vec![]),
            Err(e) => Err(HisError::GitHead(e)),
        }
    }
}

fn trailer_value(message: &str, key: &str) -> Option<String> {
    message.lines().find_map(|line| {
        line.strip_prefix(key)
            .and_then(|rest| rest.strip_prefix(": "))
            .map(|value| value.trim().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_author() -> Author {
        Author {
            name: NonEmptyText::new("Florence Nightingale").unwrap(),
            role: NonEmptyText::new("nurse").unwrap(),
            username: NonEmptyText::new("fnightingale").unwrap(),
            email: "fnightingale@his.local".into(),
        }
    }

    fn message(action: HisCommitAction, summary: &str) -> HisCommitMessage {
        HisCommitMessage::new(HisCommitDomain::Case, action, summary, "St. Elsewhere").unwrap()
    }

    #[test]
    fn render_with_author_emits_subject_and_trailers() {
        let rendered = message(HisCommitAction::Close, "Case closed")
            .render_with_author(&test_author())
            .unwrap();

        assert_eq!(
            rendered,
            "case:close: Case closed\n\n\
             Author-Name: Florence Nightingale\n\
             Author-Role: nurse\n\
             Author-Username: fnightingale\n\
             Care-Location: St. Elsewhere"
        );
    }

    #[test]
    fn commit_message_rejects_multiline_fields() {
        let summary = HisCommitMessage::new(
            HisCommitDomain::Case,
            HisCommitAction::Create,
            "line one\nline two",
            "St. Elsewhere",
        );
        assert!(matches!(summary, Err(HisError::InvalidInput(_))));

        let location = HisCommitMessage::new(
            HisCommitDomain::Case,
            HisCommitAction::Create,
            "Case created",
            "Ward 1\nWard 2",
        );
        assert!(matches!(location, Err(HisError::InvalidCareLocation)));

        let missing = HisCommitMessage::new(
            HisCommitDomain::Case,
            HisCommitAction::Create,
            "Case created",
            "  ",
        );
        assert!(matches!(missing, Err(HisError::MissingCareLocation)));
    }

    #[test]
    fn init_and_commit_then_history() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let workdir = temp_dir.path().join("store");

        let files = [FileToWrite {
            relative_path: Path::new(".gitignore"),
            content: "*.tmp\n",
            old_content: None,
        }];
        VersionedFileService::init_and_commit(
            &workdir,
            &test_author(),
            &message(HisCommitAction::Create, "Store initialised"),
            &files,
        )
        .expect("init_and_commit should succeed");

        let service = VersionedFileService::open(&workdir).expect("open should succeed");
        let nested = Path::new("cases/ab/cd/record.yaml");
        service
            .write_and_commit_files(
                &test_author(),
                &message(HisCommitAction::Update, "Case updated"),
                &[FileToWrite {
                    relative_path: nested,
                    content: "x: 1\n",
                    old_content: None,
                }],
            )
            .expect("second commit should succeed");

        let history = service.history(10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].subject, "case:update: Case updated");
        assert_eq!(history[0].author_name, "Florence Nightingale");
        assert_eq!(history[0].author_username.as_deref(), Some("fnightingale"));
        assert_eq!(history[0].care_location.as_deref(), Some("St. Elsewhere"));
        assert_eq!(history[1].subject, "case:create: Store initialised");

        assert_eq!(service.history(1).unwrap().len(), 1);
    }

    #[test]
    fn failed_commit_rolls_back_files_and_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let workdir = temp_dir.path();
        VersionedFileService::init_and_commit(
            workdir,
            &test_author(),
            &message(HisCommitAction::Create, "Store initialised"),
            &[FileToWrite {
                relative_path: Path::new("existing.yaml"),
                content: "old\n",
                old_content: None,
            }],
        )
        .unwrap();

        let mut bad_author = test_author();
        bad_author.email = "broken\naddress".into();

        let service = VersionedFileService::open(workdir).unwrap();
        let result = service.write_and_commit_files(
            &bad_author,
            &message(HisCommitAction::Update, "Should not land"),
            &[
                FileToWrite {
                    relative_path: Path::new("existing.yaml"),
                    content: "new\n",
                    old_content: Some("old\n"),
                },
                FileToWrite {
                    relative_path: Path::new("fresh/dir/new.yaml"),
                    content: "new\n",
                    old_content: None,
                },
            ],
        );

        assert!(matches!(result, Err(HisError::InvalidAuthor(_))));
        assert_eq!(
            std::fs::read_to_string(workdir.join("existing.yaml")).unwrap(),
            "old\n"
        );
        assert!(!workdir.join("fresh").exists());
        assert_eq!(service.history(10).unwrap().len(), 1);
    }

    #[test]
    fn history_of_empty_repository_is_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let service = VersionedFileService::init(temp_dir.path()).unwrap();
        assert!(service.history(5).unwrap().is_empty());
    }

    #[test]
    fn parent_directory_references_are_rejected() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let service = VersionedFileService::init(temp_dir.path()).unwrap();
        let result = service.commit_paths(
            &test_author(),
            &message(HisCommitAction::Create, "escape"),
            &[PathBuf::from("../outside.yaml")],
        );
        assert!(matches!(result, Err(HisError::InvalidInput(_))));
    }
}
