//! The versioned record store.
//!
//! Every record is one YAML file:
//!
//! ```text
//! <data_dir>/<kind dir>/<s1>/<s2>/<uuid>/<kind>.yaml
//! ```
//!
//! The data directory is a single Git repository. A mutation writes all changed files and
//! commits them together through [`VersionedFileService`], so a multi-record change (closing a
//! transport order moves two rooms) is one commit or nothing.
//!
//! Reads go straight to the files. Writes are serialised by a store-wide lock.

use crate::author::Author;
use crate::config::CoreConfig;
use crate::constants::{DEFAULT_GITIGNORE, GITIGNORE_FILENAME};
use crate::error::{HisError, HisResult};
use crate::models::accounts::Account;
use crate::models::Record;
use crate::versioned_files::{
    AuditEntry, FileToWrite, HisCommitAction, HisCommitDomain, HisCommitMessage,
    VersionedFileService,
};
use his_uuid::ShardableUuid;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Files to write in one commit.
#[derive(Debug, Default)]
pub struct ChangeSet {
    files: Vec<(PathBuf, String)>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `record`, replacing an earlier entry for the same record.
    pub fn put<R: Record>(&mut self, record: &R) -> HisResult<()> {
        let path = record_path::<R>(record.id());
        let content = serde_yaml::to_string(record).map_err(HisError::YamlSerialization)?;
        match self.files.iter_mut().find(|(p, _)| *p == path) {
            Some(entry) => entry.1 = content,
            None => self.files.push((path, content)),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Workdir-relative path of a record file.
fn record_path<R: Record>(id: &ShardableUuid) -> PathBuf {
    id.sharded_dir(Path::new(R::DIR_NAME)).join(R::FILE_NAME)
}

/// Strictly parse a record from YAML text.
///
/// Uses `serde_path_to_error` so a schema mismatch names the failing field
/// (e.g. `employee.role.rank`).
pub fn parse_record<R: Record>(yaml_text: &str) -> HisResult<R> {
    let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
    serde_path_to_error::deserialize(deserializer).map_err(|err| {
        let path = err.path().to_string();
        let path = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        HisError::Schema {
            kind: R::KIND,
            path,
            detail: err.into_inner().to_string(),
        }
    })
}

/// Record files under one data directory, versioned with Git.
#[derive(Debug)]
pub struct Store {
    cfg: Arc<CoreConfig>,
    write_lock: Mutex<()>,
}

/// Exclusive write access to a [`Store`], handed out by [`Store::transaction`].
///
/// Reads go through `Deref` to the store.
pub struct Transaction<'a> {
    store: &'a Store,
    _guard: MutexGuard<'a, ()>,
}

impl Deref for Transaction<'_> {
    type Target = Store;

    fn deref(&self) -> &Store {
        self.store
    }
}

impl Transaction<'_> {
    /// Writes every file in `changes` and commits them as one commit.
    pub fn commit(
        &self,
        author: &Author,
        domain: HisCommitDomain,
        action: HisCommitAction,
        summary: &str,
        changes: ChangeSet,
    ) -> HisResult<()> {
        self.store
            .write_changes(author, domain, action, summary, changes)
    }

    /// Writes and commits a single record.
    pub fn save<R: Record>(
        &self,
        author: &Author,
        domain: HisCommitDomain,
        action: HisCommitAction,
        summary: &str,
        record: &R,
    ) -> HisResult<()> {
        let mut changes = ChangeSet::new();
        changes.put(record)?;
        self.commit(author, domain, action, summary, changes)
    }
}

impl Store {
    /// Opens the store at the configured data directory, creating the directory and its
    /// repository on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be created or opened.
    pub fn open_or_initialise(cfg: Arc<CoreConfig>) -> HisResult<Self> {
        let data_dir = cfg.data_dir();
        if VersionedFileService::exists(data_dir) {
            VersionedFileService::open(data_dir)?;
            tracing::debug!("opened record store at {}", data_dir.display());
        } else {
            let author = Author::system()?;
            let message = HisCommitMessage::new(
                HisCommitDomain::Store,
                HisCommitAction::Create,
                "Initialised record store",
                cfg.care_location().as_str(),
            )?;
            let files = [FileToWrite {
                relative_path: Path::new(GITIGNORE_FILENAME),
                content: DEFAULT_GITIGNORE,
                old_content: None,
            }];
            VersionedFileService::init_and_commit(data_dir, &author, &message, &files)?;
            tracing::info!("initialised record store at {}", data_dir.display());
        }

        Ok(Self {
            cfg,
            write_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// True while no account exists.
    pub fn is_empty(&self) -> bool {
        self.ids::<Account>().is_empty()
    }

    /// Loads the record with `id`.
    ///
    /// # Errors
    ///
    /// Returns `HisError::NotFound` if there is no such record, and `HisError::Schema` if the
    /// file does not parse.
    pub fn load<R: Record>(&self, id: &ShardableUuid) -> HisResult<R> {
        self.find(id)?.ok_or_else(|| HisError::NotFound {
            kind: R::KIND,
            id: id.to_string(),
        })
    }

    /// Like [`Store::load`], with `None` for a missing record.
    pub fn find<R: Record>(&self, id: &ShardableUuid) -> HisResult<Option<R>> {
        let path = self.cfg.data_dir().join(record_path::<R>(id));
        match fs::read_to_string(&path) {
            Ok(contents) => parse_record(&contents).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HisError::FileRead(e)),
        }
    }

    /// All records of one kind.
    ///
    /// Files that cannot be read or parsed are logged as warnings and skipped.
    pub fn list<R: Record>(&self) -> Vec<R> {
        let mut records = Vec::new();
        for id in self.ids::<R>() {
            let path = self.cfg.data_dir().join(record_path::<R>(&id));
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    tracing::warn!("failed to read {}: {} - {}", R::FILE_NAME, path.display(), e);
                    continue;
                }
            };
            match parse_record::<R>(&contents) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("failed to parse {}: {} - {}", R::FILE_NAME, path.display(), e);
                }
            }
        }
        records
    }

    /// Identifiers of every record directory of one kind holding a record file.
    fn ids<R: Record>(&self) -> Vec<ShardableUuid> {
        let kind_dir = self.cfg.record_dir(R::DIR_NAME);
        let mut ids = Vec::new();

        let s1_iter = match fs::read_dir(&kind_dir) {
            Ok(it) => it,
            Err(_) => return ids,
        };
        for s1 in s1_iter.flatten() {
            let s2_iter = match fs::read_dir(s1.path()) {
                Ok(it) => it,
                Err(_) => continue,
            };
            for s2 in s2_iter.flatten() {
                let id_iter = match fs::read_dir(s2.path()) {
                    Ok(it) => it,
                    Err(_) => continue,
                };
                for id_ent in id_iter.flatten() {
                    let id_path = id_ent.path();
                    if !id_path.join(R::FILE_NAME).is_file() {
                        continue;
                    }
                    let name = id_ent.file_name();
                    match name.to_str().map(ShardableUuid::parse) {
                        Some(Ok(id)) => ids.push(id),
                        _ => tracing::warn!(
                            "ignoring {} directory with invalid id: {}",
                            R::KIND,
                            id_path.display()
                        ),
                    }
                }
            }
        }
        ids
    }

    /// Resolves a full identifier or a unique prefix of one.
    ///
    /// # Errors
    ///
    /// Returns `HisError::InvalidInput` if `input` is neither, `HisError::NotFound` if nothing
    /// matches and `HisError::AmbiguousId` if a prefix matches several records.
    pub fn resolve_id<R: Record>(&self, input: &str) -> HisResult<ShardableUuid> {
        let input = input.trim();
        if ShardableUuid::is_canonical(input) {
            let id = ShardableUuid::parse(input)?;
            if self.cfg.data_dir().join(record_path::<R>(&id)).is_file() {
                return Ok(id);
            }
            return Err(HisError::NotFound {
                kind: R::KIND,
                id: input.to_string(),
            });
        }
        if !ShardableUuid::is_prefix(input) {
            return Err(HisError::InvalidInput(format!(
                "'{input}' is not a {} id (at least {} lowercase hex characters)",
                R::KIND,
                ShardableUuid::MIN_PREFIX_LEN
            )));
        }

        let mut matches = self.ids::<R>().into_iter().filter(|id| id.starts_with(input));
        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(id),
            (None, _) => Err(HisError::NotFound {
                kind: R::KIND,
                id: input.to_string(),
            }),
            (Some(_), Some(_)) => Err(HisError::AmbiguousId {
                kind: R::KIND,
                prefix: input.to_string(),
            }),
        }
    }

    /// Runs `f` while holding the store's write lock.
    ///
    /// Everything `f` reads through the [`Transaction`] stays current until it returns, so a
    /// check such as "username is free" or "room has a free place" still holds when the
    /// resulting change is committed. Calling [`Store::commit`] or [`Store::save`] inside `f`
    /// deadlocks; use the transaction's own methods.
    ///
    /// # Errors
    ///
    /// Returns `HisError::StoreLockPoisoned` if an earlier writer panicked, otherwise whatever
    /// `f` returns.
    pub fn transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> HisResult<T>) -> HisResult<T> {
        let guard = self
            .write_lock
            .lock()
            .map_err(|_| HisError::StoreLockPoisoned)?;
        f(&Transaction {
            store: self,
            _guard: guard,
        })
    }

    /// Writes every file in `changes` and commits them as one commit.
    ///
    /// On failure nothing stays written.
    pub fn commit(
        &self,
        author: &Author,
        domain: HisCommitDomain,
        action: HisCommitAction,
        summary: &str,
        changes: ChangeSet,
    ) -> HisResult<()> {
        self.transaction(|tx| tx.commit(author, domain, action, summary, changes))
    }

    /// Writes and commits a single record.
    pub fn save<R: Record>(
        &self,
        author: &Author,
        domain: HisCommitDomain,
        action: HisCommitAction,
        summary: &str,
        record: &R,
    ) -> HisResult<()> {
        self.transaction(|tx| tx.save(author, domain, action, summary, record))
    }

    // Callers hold the write lock.
    fn write_changes(
        &self,
        author: &Author,
        domain: HisCommitDomain,
        action: HisCommitAction,
        summary: &str,
        changes: ChangeSet,
    ) -> HisResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let message = HisCommitMessage::new(
            domain,
            action,
            summary,
            self.cfg.care_location().as_str(),
        )?;

        let mut old_contents = Vec::with_capacity(changes.len());
        for (path, _) in &changes.files {
            match fs::read_to_string(self.cfg.data_dir().join(path)) {
                Ok(contents) => old_contents.push(Some(contents)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => old_contents.push(None),
                Err(e) => return Err(HisError::FileRead(e)),
            }
        }

        let files: Vec<FileToWrite<'_>> = changes
            .files
            .iter()
            .zip(&old_contents)
            .map(|((path, content), old)| FileToWrite {
                relative_path: path,
                content,
                old_content: old.as_deref(),
            })
            .collect();

        let repo = VersionedFileService::open(self.cfg.data_dir())?;
        repo.write_and_commit_files(author, &message, &files)?;

        tracing::info!(
            "{}:{}: {} ({} file(s), by {})",
            domain,
            action,
            summary,
            files.len(),
            author.username
        );
        Ok(())
    }

    /// The most recent `limit` commits, newest first.
    pub fn audit_log(&self, limit: usize) -> HisResult<Vec<AuditEntry>> {
        VersionedFileService::open(self.cfg.data_dir())?.history(limit)
    }
}
