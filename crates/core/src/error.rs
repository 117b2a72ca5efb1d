#[derive(Debug, thiserror::Error)]
pub enum HisError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid text: {0}")]
    Text(#[from] his_types::TextError),
    #[error("invalid identifier: {0}")]
    Uuid(#[from] his_uuid::UuidError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("identifier prefix '{prefix}' matches more than one {kind}")]
    AmbiguousId { kind: &'static str, prefix: String },

    #[error("login incorrect")]
    InvalidCredentials,
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("username already taken: {0}")]
    DuplicateUsername(String),
    #[error("email address already in use: {0}")]
    DuplicateEmail(String),
    #[error("{kind} is already closed")]
    AlreadyClosed { kind: &'static str },
    #[error("{kind} is not closed")]
    NotClosed { kind: &'static str },
    #[error("{0} is already assigned")]
    AlreadyAssigned(String),
    #[error("room has no free capacity: {0}")]
    RoomFull(String),
    #[error("room is already empty: {0}")]
    RoomEmpty(String),
    #[error("not a valid TNM classification: {0}")]
    InvalidStaging(String),
    #[error("stored password hash is malformed")]
    InvalidPasswordHash,

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error(
        "initialise failed and cleanup also failed (path: {path}): init={init_error}; cleanup={cleanup_error}",
        path = path.display()
    )]
    CleanupAfterInitialiseFailed {
        path: std::path::PathBuf,
        #[source]
        init_error: Box<HisError>,
        cleanup_error: std::io::Error,
    },
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("{kind} schema mismatch at {path}: {detail}")]
    Schema {
        kind: &'static str,
        path: String,
        detail: String,
    },
    #[error("record store lock poisoned")]
    StoreLockPoisoned,

    #[error("failed to initialise git repository: {0}")]
    GitInit(git2::Error),
    #[error("failed to open git repository: {0}")]
    GitOpen(git2::Error),
    #[error("failed to access git index: {0}")]
    GitIndex(git2::Error),
    #[error("failed to add file to git index: {0}")]
    GitAdd(git2::Error),
    #[error("failed to write git tree: {0}")]
    GitWriteTree(git2::Error),
    #[error("failed to find git tree: {0}")]
    GitFindTree(git2::Error),
    #[error("failed to create git signature: {0}")]
    GitSignature(git2::Error),
    #[error("failed to create git commit: {0}")]
    GitCommit(git2::Error),
    #[error("failed to get git head: {0}")]
    GitHead(git2::Error),
    #[error("failed to set git head: {0}")]
    GitSetHead(git2::Error),
    #[error("failed to peel git commit: {0}")]
    GitPeel(git2::Error),
    #[error("failed to walk git history: {0}")]
    GitRevwalk(git2::Error),

    #[error("invalid Care-Location")]
    InvalidCareLocation,
    #[error("missing Care-Location")]
    MissingCareLocation,
    #[error("invalid commit author: {0}")]
    InvalidAuthor(String),
}

pub type HisResult<T> = std::result::Result<T, HisError>;
