//! Persisted item values backed by a JSON or TOML file.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::{Context, bail};
use rulecfg::{MemoryStore, Value};

/// A values file loaded into a [`MemoryStore`].
///
/// The file holds one flat table mapping full item keys to values.
pub struct ValueFile {
    path: PathBuf,
    loaded: BTreeMap<String, Value>,
    store: MemoryStore,
}

impl ValueFile {
    /// Load `path`, or start empty when it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let loaded = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parse(&path, &content)?
        } else {
            debug!("{} not found, starting with defaults", path.display());
            BTreeMap::new()
        };
        let store = MemoryStore::with_values(loaded.clone());
        Ok(Self {
            path,
            loaded,
            store,
        })
    }

    pub fn store(&self) -> MemoryStore {
        self.store.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the store differs from what was loaded.
    pub fn is_dirty(&self) -> bool {
        self.store.snapshot() != self.loaded
    }

    /// Write the store back, keeping a timestamped backup of the previous
    /// file. Does nothing when no value changed.
    pub fn save(&mut self) -> anyhow::Result<bool> {
        if !self.is_dirty() {
            return Ok(false);
        }
        let values = self.store.snapshot();
        let s = match extension(&self.path) {
            "toml" | "tml" => toml::to_string_pretty(&values)?,
            "json" => serde_json::to_string_pretty(&values)?,
            ext => bail!("Unsupported values file extension: {ext}"),
        };

        if self.path.exists() {
            let bk = format!(
                "bk-{:?}.{}",
                SystemTime::now()
                    .duration_since(SystemTime::UNIX_EPOCH)?
                    .as_secs(),
                extension(&self.path)
            );
            let backup_path = self.path.with_extension(bk);
            fs::copy(&self.path, &backup_path)?;
            debug!("backup written to {}", backup_path.display());
        }
        fs::write(&self.path, s)?;
        self.loaded = values;
        Ok(true)
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|s| s.to_str()).unwrap_or("")
}

fn parse(path: &Path, content: &str) -> anyhow::Result<BTreeMap<String, Value>> {
    let values = match extension(path) {
        "toml" | "tml" => toml::from_str(content)?,
        "json" => serde_json::from_str(content)?,
        ext => bail!("Unsupported values file extension: {ext}"),
    };
    Ok(values)
}

/// Parse a command-line value as JSON, falling back to a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulecfg::Store;
    use serde_json::json;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("12.5"), json!(12.5));
        assert_eq!(parse_value("\"x\""), json!("x"));
        assert_eq!(parse_value("dark"), json!("dark"));
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = ValueFile::open(dir.path().join("absent.json")).unwrap();
        assert!(file.store().snapshot().is_empty());
        assert!(!file.is_dirty());
    }

    #[test]
    fn test_save_writes_backup_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.toml");
        fs::write(&path, "\"a.b\" = 1\n").unwrap();

        let mut file = ValueFile::open(&path).unwrap();
        assert_eq!(file.store().get("a.b"), Some(json!(1)));
        assert!(!file.save().unwrap());

        file.store().set("a.b", json!(2));
        assert!(file.save().unwrap());

        let backups = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains("bk-"))
            .count();
        assert_eq!(backups, 1);

        let reopened = ValueFile::open(&path).unwrap();
        assert_eq!(reopened.store().get("a.b"), Some(json!(2)));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.ini");
        fs::write(&path, "x").unwrap();
        assert!(ValueFile::open(&path).is_err());
    }
}
