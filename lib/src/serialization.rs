//! Persistence of fitted objects.
//!
//! Fitted transformers and models are stored as artifacts: a small header
//! `{format_version, kind}` followed by the object's parameters, both encoded
//! with bincode. Loading checks the version and that the file holds the kind
//! of object the caller asked for, so a label encoder can never be read back
//! as a preprocessing pipeline.
//!
//! Transformed matrices are plain bincode-encoded `Array2<f64>` values.

use ndarray::Array2;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Version written into every artifact header.
pub const FORMAT_VERSION: u32 = 1;

/// A trait for parameter representations that can be serialized to and from bytes.
///
/// Implementors should contain only plain numerical data (e.g., `Vec<f64>`,
/// scalars, class names).
pub trait SerializableParams: Sized {
    /// The error type returned during (de)serialization.
    type Error: Error + Send + Sync + 'static;

    /// Serialize the parameters into a byte buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, Self::Error>;

    /// Deserialize the parameters from a byte buffer.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Error>;
}

impl<T> SerializableParams for T
where
    T: Serialize + DeserializeOwned,
{
    type Error = bincode::Error;

    fn to_bytes(&self) -> Result<Vec<u8>, Self::Error> {
        bincode::serialize(self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Error> {
        bincode::deserialize(bytes)
    }
}

/// What an artifact file contains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    Pipeline,
    Encoder,
    Model,
    NetworkModel,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Pipeline => "pipeline",
            ArtifactKind::Encoder => "encoder",
            ArtifactKind::Model => "model",
            ArtifactKind::NetworkModel => "network model",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error on artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode artifact: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode artifact: {0}")]
    Decode(#[source] bincode::Error),

    #[error("unsupported artifact format version {found} (expected {expected})")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("artifact holds a {found}, expected a {expected}")]
    KindMismatch {
        expected: ArtifactKind,
        found: ArtifactKind,
    },

    #[error("corrupt artifact: {0}")]
    Corrupt(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactHeader {
    format_version: u32,
    kind: ArtifactKind,
}

/// Encode `payload` behind a header for `kind`.
pub fn encode_artifact<T: Serialize>(kind: ArtifactKind, payload: &T) -> Result<Vec<u8>, ArtifactError> {
    let header = ArtifactHeader {
        format_version: FORMAT_VERSION,
        kind,
    };
    let mut bytes = bincode::serialize(&header).map_err(ArtifactError::Encode)?;
    bincode::serialize_into(&mut bytes, payload).map_err(ArtifactError::Encode)?;
    Ok(bytes)
}

/// Decode an artifact, checking the header against `expected`.
pub fn decode_artifact<T: DeserializeOwned>(
    expected: ArtifactKind,
    bytes: &[u8],
) -> Result<T, ArtifactError> {
    let mut cursor = Cursor::new(bytes);
    let header: ArtifactHeader =
        bincode::deserialize_from(&mut cursor).map_err(ArtifactError::Decode)?;
    if header.format_version != FORMAT_VERSION {
        return Err(ArtifactError::VersionMismatch {
            expected: FORMAT_VERSION,
            found: header.format_version,
        });
    }
    if header.kind != expected {
        return Err(ArtifactError::KindMismatch {
            expected,
            found: header.kind,
        });
    }
    let payload = bincode::deserialize_from(&mut cursor).map_err(ArtifactError::Decode)?;
    let consumed = cursor.position() as usize;
    if consumed != bytes.len() {
        return Err(ArtifactError::Corrupt(format!(
            "{} trailing bytes after payload",
            bytes.len() - consumed
        )));
    }
    Ok(payload)
}

/// Write bytes to `path`, creating parent directories and replacing any
/// existing file.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ArtifactError::Io { path, source }
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    fs::write(path, bytes).map_err(io_err(path))
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// An object persisted as a tagged artifact.
pub trait ArtifactObject: Sized {
    /// Kind written into the header.
    const KIND: ArtifactKind;
    /// Plain serializable state of the object.
    type Payload: Serialize + DeserializeOwned;

    fn to_payload(&self) -> Self::Payload;

    /// Rebuild the object, rejecting payloads that decode but are inconsistent.
    fn from_payload(payload: Self::Payload) -> Result<Self, ArtifactError>;

    fn to_artifact_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        encode_artifact(Self::KIND, &self.to_payload())
    }

    fn from_artifact_bytes(bytes: &[u8]) -> Result<Self, ArtifactError> {
        Self::from_payload(decode_artifact(Self::KIND, bytes)?)
    }

    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ArtifactError> {
        write_bytes(path.as_ref(), &self.to_artifact_bytes()?)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        Self::from_artifact_bytes(&read_bytes(path.as_ref())?)
    }
}

/// Save a transformed matrix.
pub fn save_matrix<P: AsRef<Path>>(path: P, matrix: &Array2<f64>) -> Result<(), ArtifactError> {
    let bytes = bincode::serialize(matrix).map_err(ArtifactError::Encode)?;
    write_bytes(path.as_ref(), &bytes)
}

/// Load a matrix written by [`save_matrix`].
pub fn load_matrix<P: AsRef<Path>>(path: P) -> Result<Array2<f64>, ArtifactError> {
    let bytes = read_bytes(path.as_ref())?;
    bincode::deserialize(&bytes).map_err(ArtifactError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Weights {
        values: Vec<f64>,
    }

    #[test]
    fn test_serializable_params_bytes() {
        let w = Weights {
            values: vec![1.0, -2.5],
        };
        let bytes = w.to_bytes().unwrap();
        assert_eq!(Weights::from_bytes(&bytes).unwrap(), w);
    }

    #[test]
    fn test_artifact_kind_checked() {
        let bytes = encode_artifact(ArtifactKind::Encoder, &vec!["a".to_string()]).unwrap();
        let result: Result<Vec<String>, _> = decode_artifact(ArtifactKind::Pipeline, &bytes);
        assert!(matches!(
            result,
            Err(ArtifactError::KindMismatch {
                expected: ArtifactKind::Pipeline,
                found: ArtifactKind::Encoder
            })
        ));

        let ok: Vec<String> = decode_artifact(ArtifactKind::Encoder, &bytes).unwrap();
        assert_eq!(ok, vec!["a"]);
    }

    #[test]
    fn test_artifact_version_checked() {
        let header = ArtifactHeader {
            format_version: FORMAT_VERSION + 1,
            kind: ArtifactKind::Model,
        };
        let mut bytes = bincode::serialize(&header).unwrap();
        bincode::serialize_into(&mut bytes, &1u8).unwrap();

        let result: Result<u8, _> = decode_artifact(ArtifactKind::Model, &bytes);
        assert!(matches!(
            result,
            Err(ArtifactError::VersionMismatch { found, .. }) if found == FORMAT_VERSION + 1
        ));
    }

    #[test]
    fn test_truncated_artifact() {
        let bytes = encode_artifact(ArtifactKind::Model, &vec![1.0f64; 8]).unwrap();
        let result: Result<Vec<f64>, _> = decode_artifact(ArtifactKind::Model, &bytes[..bytes.len() - 3]);
        assert!(matches!(result, Err(ArtifactError::Decode(_))));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = encode_artifact(ArtifactKind::Model, &7u32).unwrap();
        bytes.push(0);
        let result: Result<u32, _> = decode_artifact(ArtifactKind::Model, &bytes);
        assert!(matches!(result, Err(ArtifactError::Corrupt(_))));
    }

    #[test]
    fn test_matrix_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/train.bin");
        let m = array![[1.0, 2.0], [3.0, 4.0]];
        save_matrix(&path, &m).unwrap();
        assert_eq!(load_matrix(&path).unwrap(), m);
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_matrix("/no/such/matrix.bin").unwrap_err();
        assert!(err.to_string().contains("/no/such/matrix.bin"));
    }
}
