use std::{
    collections::{BTreeMap, HashMap},
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::debug;
use tempfile::NamedTempFile;
use thiserror::Error;

/// 永続化領域へのアクセスで発生するエラー。
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage is unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("storage document {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// キーごとに1つの文字列を保存する永続化領域を表すtrait。
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueSlot {
    /// キーに保存されている値を読み込む。値が存在しない場合は`None`を返す。
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// キーの値を置き換える。
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// JSONファイルにキーと値を保存する永続化領域。
///
/// ファイルは`{"<key>": "<value>"}`形式のオブジェクトで、書き込みは常にファイル全体を置き換える。
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    /// 新しい`FileSlot`を返す。ファイルは最初の書き込み時に作成される。
    ///
    /// # Arguments
    ///
    /// * `path` - 保存先のファイルパス
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// ファイル全体を読み込む。ファイルが存在しない場合は空のmapを返す。
    fn read_document(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StorageError::Unavailable {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|source| StorageError::Malformed {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueSlot for FileSlot {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut document = self.read_document()?;
        Ok(document.remove(key))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        // 壊れたファイルは他のキーを含めて置き換える
        let mut document = self.read_document().unwrap_or_default();
        document.insert(key.to_string(), value.to_string());

        let content = serde_json::to_string_pretty(&document).map_err(|source| {
            StorageError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        replace_file(&self.path, |file| file.write_all(content.as_bytes())).map_err(|source| {
            StorageError::Unavailable {
                path: self.path.clone(),
                source,
            }
        })?;
        debug!("Wrote key {} to {}", key, self.path.display());

        Ok(())
    }
}

/// ファイルの内容を置き換える。
///
/// 内容は同じディレクトリの一時ファイルに書き込んでから`path`へ移動する。
/// `write_content`や移動が失敗した場合、既存のファイルは変更されず一時ファイルは削除される。
///
/// # Arguments
///
/// * `path` - 置き換えるファイルのパス
/// * `write_content` - 一時ファイルに内容を書き込む処理
fn replace_file<F>(path: &Path, write_content: F) -> io::Result<()>
where
    F: FnOnce(&mut NamedTempFile) -> io::Result<()>,
{
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut file = NamedTempFile::new_in(parent)?;
    write_content(&mut file)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| err.error)?;

    Ok(())
}

/// メモリ上にのみ保存する永続化領域。
///
/// データディレクトリが利用できない場合に利用し、内容はプロセス終了時に失われる。
#[derive(Debug, Default)]
pub struct MemorySlot {
    values: HashMap<String, String>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueSlot for MemorySlot {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        io::{self, Write},
    };

    use super::{replace_file, FileSlot, KeyValueSlot, MemorySlot, StorageError};

    /// ファイルが存在しない場合は値なしとなることを確認する。
    #[test]
    fn test_file_slot_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path().join("entries.json"));

        assert!(slot.read("key").unwrap().is_none());
    }

    /// 書き込んだ値を読み込めること、ディレクトリが作成されることを確認する。
    #[test]
    fn test_file_slot_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("entries.json");
        let mut slot = FileSlot::new(&path);

        slot.write("key", "[1,2]").unwrap();
        slot.write("other", "x").unwrap();

        assert_eq!(slot.read("key").unwrap().as_deref(), Some("[1,2]"));
        assert_eq!(slot.read("other").unwrap().as_deref(), Some("x"));
        assert!(path.exists());
    }

    /// 壊れたファイルは読み込み時にエラーとなり、書き込みで置き換えられることを確認する。
    #[test]
    fn test_file_slot_malformed_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries.json");
        fs::write(&path, "not json").unwrap();
        let mut slot = FileSlot::new(&path);

        assert!(matches!(
            slot.read("key"),
            Err(StorageError::Malformed { .. })
        ));

        slot.write("key", "[]").unwrap();
        assert_eq!(slot.read("key").unwrap().as_deref(), Some("[]"));
    }

    /// 保存先がディレクトリの場合は書き込みがエラーになることを確認する。
    #[test]
    fn test_file_slot_write_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut slot = FileSlot::new(dir.path());

        assert!(matches!(
            slot.write("key", "[]"),
            Err(StorageError::Unavailable { .. })
        ));
    }

    /// 書き込みが途中で失敗しても、既存の内容がそのまま読み込めることを確認する。
    #[test]
    fn test_replace_file_failure_keeps_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries.json");
        let mut slot = FileSlot::new(&path);
        slot.write("key", "[1]").unwrap();
        let previous = fs::read_to_string(&path).unwrap();

        let result = replace_file(&path, |file| {
            file.write_all(b"{\"key\": \"[1,")?;
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), previous);
        assert_eq!(slot.read("key").unwrap().as_deref(), Some("[1]"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    /// 保存先のディレクトリに一時ファイルが残らないことを確認する。
    #[test]
    fn test_file_slot_write_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut slot = FileSlot::new(dir.path().join("entries.json"));

        slot.write("key", "[]").unwrap();
        slot.write("key", "[1]").unwrap();

        let names = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["entries.json".to_string()]);
    }

    #[test]
    fn test_memory_slot() {
        let mut slot = MemorySlot::new();

        assert!(slot.read("key").unwrap().is_none());
        slot.write("key", "value").unwrap();
        assert_eq!(slot.read("key").unwrap().as_deref(), Some("value"));
    }
}
