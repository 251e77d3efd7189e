use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum ScarifError {
    IoError(std::io::Error),
    /// Malformed tag stream: negative length, unknown tag type, truncated read.
    DecodeError(String),
    /// Compression marker of a container record that is neither gzip nor zlib.
    UnsupportedCompression(u8),
    /// Palette and packed data disagree.
    DataConsistencyError(String),
    EncodeError(String),
    ConfigError(String),
}

impl ScarifError {
    pub fn decode(msg: impl Into<String>) -> Self {
        ScarifError::DecodeError(msg.into())
    }

    pub fn data(msg: impl Into<String>) -> Self {
        ScarifError::DataConsistencyError(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        ScarifError::EncodeError(msg.into())
    }

    /// Errors that only invalidate the single container record being read.
    pub fn is_record_local(&self) -> bool {
        match self {
            ScarifError::DecodeError(_) => true,
            ScarifError::UnsupportedCompression(_) => true,
            ScarifError::DataConsistencyError(_) => true,
            ScarifError::IoError(_) => false,
            ScarifError::EncodeError(_) => false,
            ScarifError::ConfigError(_) => false,
        }
    }
}

impl fmt::Display for ScarifError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScarifError::IoError(err) => write!(f, "IO error: {}", err),
            ScarifError::DecodeError(msg) => write!(f, "Decode error: {}", msg),
            ScarifError::UnsupportedCompression(kind) => {
                write!(f, "Unrecognized compression type: {}", kind)
            }
            ScarifError::DataConsistencyError(msg) => write!(f, "Data error: {}", msg),
            ScarifError::EncodeError(msg) => write!(f, "Encode error: {}", msg),
            ScarifError::ConfigError(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl Error for ScarifError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ScarifError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ScarifError {
    fn from(err: std::io::Error) -> Self {
        ScarifError::IoError(err)
    }
}
