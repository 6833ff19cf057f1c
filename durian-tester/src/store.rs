use durian_game::SnapshotStore;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Save slot backed by a single file on disk.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous save intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FileStoreError {
    fn io<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(std::io::Error) -> Self + 'a {
        move |source| Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for FileStore {
    type Error = FileStoreError;

    fn read(&self) -> Result<Option<String>, Self::Error> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(FileStoreError::io("read", &self.path)(err)),
        }
    }

    fn write(&self, raw: &str) -> Result<(), Self::Error> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(FileStoreError::io("create", dir))?;
        }
        let tmp_path = self.temp_path();
        {
            let mut tmp =
                File::create(&tmp_path).map_err(FileStoreError::io("create", &tmp_path))?;
            tmp.write_all(raw.as_bytes())
                .map_err(FileStoreError::io("write", &tmp_path))?;
            let _ = tmp.sync_all();
        }
        fs::rename(&tmp_path, &self.path).map_err(FileStoreError::io("replace", &self.path))
    }

    fn clear(&self) -> Result<(), Self::Error> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(FileStoreError::io("remove", &self.path)(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use durian_game::{PersistenceGateway, PlayerSnapshot};
    use tempfile::TempDir;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = TempDir::new().expect("tempdir");
        let store = FileStore::new(dir.path().join("save.json"));
        assert!(store.read().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn write_then_read_and_clear() {
        let dir = TempDir::new().expect("tempdir");
        let store = FileStore::new(dir.path().join("nested/slot/save.json"));
        store.write("{\"hello\":1}").unwrap();
        assert_eq!(store.read().unwrap().as_deref(), Some("{\"hello\":1}"));
        assert!(!store.temp_path().exists());

        store.write("second").unwrap();
        assert_eq!(store.read().unwrap().as_deref(), Some("second"));

        store.clear().unwrap();
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn gateway_round_trips_through_disk() {
        let dir = TempDir::new().expect("tempdir");
        let gateway = PersistenceGateway::new(FileStore::new(dir.path().join("save.json")));
        let mut snapshot = PlayerSnapshot::new_game(5);
        snapshot.character.name = "Han Li".into();
        assert!(gateway.save(&snapshot, 10));

        let loaded = gateway.load(20);
        assert_eq!(loaded.character.name, "Han Li");
        assert!(gateway.reset());
        assert_eq!(gateway.load(30).character.name, "Nameless Wanderer");
    }

    #[test]
    fn unreadable_path_surfaces_error() {
        let dir = TempDir::new().expect("tempdir");
        let store = FileStore::new(dir.path());
        let err = store.read().unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
