use crate::core::models::internals::Internal;
use crate::core::models::molecule_info::MoleculeInfo;
use crate::core::topology::connectivity::Connectivity;
use crate::core::topology::info::InternalInfo;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const HEADER_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Stream is too short to hold a header ({0} bytes)")]
    Truncated(usize),
    #[error("Unexpected magic tag {found:?} (expected {expected:?})")]
    BadMagic { expected: [u8; 4], found: [u8; 4] },
    #[error("Unsupported format version {found} (this build reads up to {supported})")]
    UnsupportedVersion { found: u16, supported: u16 },
    #[error("Failed to encode payload: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("Failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("Payload has {0} unread trailing bytes")]
    TrailingBytes(usize),
    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A container that can be written to and read back from a tagged binary
/// stream.
///
/// The stream is a 4-byte magic tag, a little-endian `u16` format version
/// and the `bincode` payload. Reading back reproduces the value exactly,
/// including group numbering and version stamps.
pub trait Streamable: Serialize + DeserializeOwned {
    const MAGIC: [u8; 4];
    const FORMAT_VERSION: u16;
}

impl Streamable for MoleculeInfo {
    const MAGIC: [u8; 4] = *b"MTMI";
    const FORMAT_VERSION: u16 = 1;
}

impl Streamable for Connectivity {
    const MAGIC: [u8; 4] = *b"MTCN";
    const FORMAT_VERSION: u16 = 1;
}

impl<T: Internal> Streamable for InternalInfo<T> {
    const MAGIC: [u8; 4] = *b"MTII";
    const FORMAT_VERSION: u16 = 1;
}

pub fn save<T: Streamable>(value: &T) -> Result<Vec<u8>, StreamError> {
    let config = bincode::config::standard();
    let payload = bincode::serde::encode_to_vec(value, config)?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&T::MAGIC);
    bytes.extend_from_slice(&T::FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

pub fn load<T: Streamable>(bytes: &[u8]) -> Result<T, StreamError> {
    if bytes.len() < HEADER_LEN {
        return Err(StreamError::Truncated(bytes.len()));
    }
    let (magic, rest) = bytes.split_at(4);
    let (version, payload) = rest.split_at(2);

    let found = [magic[0], magic[1], magic[2], magic[3]];
    if found != T::MAGIC {
        return Err(StreamError::BadMagic {
            expected: T::MAGIC,
            found,
        });
    }
    let version = u16::from_le_bytes([version[0], version[1]]);
    if version > T::FORMAT_VERSION {
        return Err(StreamError::UnsupportedVersion {
            found: version,
            supported: T::FORMAT_VERSION,
        });
    }

    let config = bincode::config::standard();
    let (value, read) = bincode::serde::decode_from_slice(payload, config)?;
    if read != payload.len() {
        return Err(StreamError::TrailingBytes(payload.len() - read));
    }
    Ok(value)
}

pub fn save_to_file<T: Streamable>(value: &T, path: &Path) -> Result<(), StreamError> {
    let bytes = save(value)?;
    fs::write(path, bytes).map_err(|source| StreamError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_from_file<T: Streamable>(path: &Path) -> Result<T, StreamError> {
    let bytes = fs::read(path).map_err(|source| StreamError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load(&bytes)
}
