use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Error)]
pub enum SGError
{
    #[error("storage empty")]
    StorageEmpty,
    #[error("storage not empty")]
    StorageNotEmpty,
    #[error("invalid level")]
    InvalidLevel,
    #[error("invalid parameter")]
    InvalidParameter,
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("invalid index")]
    InvalidIndex,
    #[error("serialization failed")]
    SerializationFailed,
    #[error("deserialization failed")]
    DeserializationFailed,
    #[error("LZ4 decompression failed")]
    LZ4DecompressionFailed,
    #[error("unsupported grid format")]
    UnsupportedFormat,
    #[error("failed to read buffer")]
    ReadBufferFailed,
    #[error("failed to write buffer")]
    WriteBufferFailed,
    #[error("file I/O error")]
    FileIOError,
}
