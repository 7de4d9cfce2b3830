//! Blob db used by the `Save` and `Load` operators.
//!
//! A db is a single YAML document mapping blob names to their shape and
//! dtype-tagged element buffer:
//!
//! ```yaml
//! blobs:
//!   ids:
//!     shape: [3]
//!     values:
//!       dtype: int64
//!       data: [4, 0, 4]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{TensorAny, TensorData};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BlobRecord {
    shape:  Vec<usize>,
    values: TensorData,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DbFile {
    #[serde(default)]
    blobs: BTreeMap<String, BlobRecord>,
}

/// Named tensors stored together in one file
#[derive(Debug)]
pub struct BlobDb {
    path: PathBuf,
    file: DbFile,
}

impl BlobDb {
    /// Empty db; nothing touches the disk until `commit`
    pub fn create(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), file: DbFile::default() }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file = serde_yaml::from_str(&src)?;
        Ok(Self { path: path.to_path_buf(), file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store a copy of `tensor` under `name`, replacing any previous entry
    pub fn insert(&mut self, name: &str, tensor: &TensorAny) {
        let (shape, values) = tensor.to_data();
        self.file.blobs.insert(name.to_string(), BlobRecord { shape, values });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.file.blobs.contains_key(name)
    }

    /// Blob names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.file.blobs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.file.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file.blobs.is_empty()
    }

    /// Decode the blob stored under `name`
    pub fn get(&self, name: &str) -> Result<Option<TensorAny>, ConfigError> {
        let Some(record) = self.file.blobs.get(name) else {
            return Ok(None);
        };
        TensorAny::from_data(&record.shape, record.values.clone())
            .map(Some)
            .map_err(|source| ConfigError::Blob {
                path: self.path.display().to_string(),
                name: name.to_string(),
                source,
            })
    }

    /// Write the db to its path, replacing the file
    pub fn commit(&self) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(&self.file)?;
        fs::write(&self.path, yaml).map_err(|source| ConfigError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tensor::{Tensor, TensorError};

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("opgraph-db-{tag}-{}.yaml", std::process::id()))
    }

    #[test]
    fn commit_and_reopen_keep_dtypes() {
        let path = temp_path("reopen");
        let floats: TensorAny = Tensor::from_vec(vec![0.5f32, -1.25, 3.0], &[3, 1]).unwrap().into();
        let ints: TensorAny = Tensor::from_vec(vec![i64::MAX, -7], &[2]).unwrap().into();

        let mut db = BlobDb::create(&path);
        db.insert("w", &floats);
        db.insert("ids", &ints);
        db.commit().unwrap();

        let db = BlobDb::open(&path).unwrap();
        assert_eq!(db.names().collect::<Vec<_>>(), vec!["ids", "w"]);
        assert_eq!(db.get("w").unwrap(), Some(floats));
        assert_eq!(db.get("ids").unwrap(), Some(ints));
        assert_eq!(db.get("nope").unwrap(), None);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn reads_hand_written_document() {
        let path = temp_path("hand");
        std::fs::write(
            &path,
            "blobs:\n  x:\n    shape: [2]\n    values:\n      dtype: int32\n      data: [1, 2]\n  bad:\n    shape: [3]\n    values:\n      dtype: float64\n      data: [1.0]\n",
        )
        .unwrap();

        let db = BlobDb::open(&path).unwrap();
        assert!(db.contains("x"));
        assert_eq!(db.len(), 2);
        assert_eq!(db.get("x").unwrap().unwrap().dtype(), core_types::DataType::I32);
        match db.get("bad").unwrap_err() {
            ConfigError::Blob { name, source, .. } => {
                assert_eq!(name, "bad");
                assert!(matches!(source, TensorError::LengthMismatch { expected: 3, found: 1, .. }));
            }
            other => panic!("expected a blob error, got {other:?}"),
        }
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_reports_path() {
        let err = BlobDb::open("/nonexistent/blobs.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/blobs.yaml"));
    }
}
