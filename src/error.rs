use std::path::PathBuf;

/// error type for burlap operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("required field '{0}' not provided")]
    MissingField(&'static str),

    #[error("unknown info field: {0}")]
    UnknownField(String),

    #[error("field '{field}' has invalid value: {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error("invalid field assignment (expected name:value): {0}")]
    InvalidAssignment(String),

    #[error("field '{0}' is computed and cannot be assigned")]
    ReservedField(&'static str),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("symlink target too long at {path}: {len} bytes (max {max})")]
    SymlinkTargetTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("field index {index} out of range for schema (max {max})")]
    FieldIndexOutOfRange { index: usize, max: usize },

    #[error("field index {0} already set")]
    FieldAlreadySet(usize),

    #[error("value kind {got} not valid for field of kind {want}")]
    KindMismatch {
        want: &'static str,
        got: &'static str,
    },

    #[error("document exceeds maximum encodable size")]
    DocumentTooLarge,

    #[error("document truncated: need {need} bytes at offset {offset}, have {have}")]
    Truncated {
        offset: u32,
        need: usize,
        have: usize,
    },

    #[error("bad document magic")]
    BadMagic,

    #[error("unknown root schema id: {0:#010x}")]
    UnknownSchema(u32),

    #[error("document has no root value")]
    NoRoot,

    #[error("unresolved placeholder value: id {0}")]
    UnresolvedPlaceholder(u32),

    #[error("invalid value word: {0:#010x}")]
    InvalidValueWord(u32),

    #[error("bad artifact magic")]
    BadArtifactMagic,

    #[error("unknown compression tag: {0}")]
    UnknownCompression(u8),

    #[error("data block header mismatch: expected ({0}, {1}), found ({2}, {3})")]
    BlockOutOfOrder(u32, u32, u32, u32),

    #[error("trust verification failed: {0}")]
    Verify(String),

    #[error("invalid digest hex: {0}")]
    InvalidDigestHex(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
