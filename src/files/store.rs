use crate::error::{Error, Result};
use crate::files::FileRecord;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Façade over the persistent file documents plus an in-memory cache. The
/// cache is a write-through shadow of the directory: every mutation hits
/// disk first, and the two key/value sets agree whenever no operation is
/// in flight.
pub struct FileStore {
    dir: PathBuf,
    cache: BTreeMap<String, String>,
}

fn read_document(path: &Path) -> std::result::Result<FileRecord, String> {
    let data = fs::read(path).map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    let record: FileRecord = serde_json::from_slice(&data)
        .map_err(|err| format!("failed to parse {}: {err}", path.display()))?;
    Ok(record)
}

fn validate_name(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::InvalidFileName("(empty)".to_string()));
    }
    // The store is a flat namespace keyed by bare file names.
    if path.contains('/') || path.contains('\\') {
        return Err(Error::InvalidFileName(path.to_string()));
    }
    Ok(())
}

impl FileStore {
    /// Creates the store directory if needed and warms the cache from every
    /// readable document, collecting per-file warnings instead of failing
    /// the whole load.
    pub fn open(dir: PathBuf) -> io::Result<(Self, Vec<String>)> {
        fs::create_dir_all(&dir)?;

        let mut store = Self {
            dir,
            cache: BTreeMap::new(),
        };
        let mut warnings = Vec::new();

        let (records, load_warnings) = store.list();
        warnings.extend(load_warnings);
        for record in records {
            store.cache.insert(record.path, record.content);
        }

        Ok((store, warnings))
    }

    fn document_path(&self, path: &str) -> PathBuf {
        self.dir.join(format!("{path}.json"))
    }

    /// Reads the persistent store, not the cache, so callers observe what
    /// is actually durable.
    pub fn list(&self) -> (Vec<FileRecord>, Vec<String>) {
        let mut records = Vec::new();
        let mut warnings = Vec::new();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                warnings.push(format!("failed to read file store directory: {err}"));
                return (records, warnings);
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension() != Some(OsStr::new("json")) {
                continue;
            }
            match read_document(&path) {
                Ok(record) => records.push(record),
                Err(err) => warnings.push(err),
            }
        }

        records.sort_by(|a, b| a.path.cmp(&b.path));
        (records, warnings)
    }

    /// Zero-latency read for the editor.
    pub fn content_of(&self, path: &str) -> Option<&str> {
        self.cache.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.cache.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.cache.keys().map(String::as_str)
    }

    /// Durable upsert: the document is written atomically (tmp + rename)
    /// before the cache entry is updated.
    pub fn save(&mut self, path: &str, content: &str) -> Result<()> {
        validate_name(path)?;

        let record = FileRecord {
            path: path.to_string(),
            content: content.to_string(),
        };
        let bytes = serde_json::to_vec_pretty(&record).map_err(|err| Error::Persist(err.to_string()))?;

        let final_path = self.document_path(path);
        let tmp_path = self.dir.join(format!("{path}.json.tmp"));
        fs::write(&tmp_path, bytes)?;
        match fs::rename(&tmp_path, &final_path) {
            Ok(()) => {}
            Err(rename_err) => {
                if final_path.exists() {
                    fs::remove_file(&final_path)?;
                    fs::rename(&tmp_path, &final_path)?;
                } else {
                    return Err(rename_err.into());
                }
            }
        }

        self.cache.insert(path.to_string(), content.to_string());
        Ok(())
    }

    /// Removes the durable document first; the cache entry is only cleared
    /// once the delete succeeded.
    pub fn delete(&mut self, path: &str) -> Result<()> {
        validate_name(path)?;

        match fs::remove_file(self.document_path(path)) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound(path.to_string()));
            }
            Err(err) => return Err(err.into()),
        }

        self.cache.remove(path);
        Ok(())
    }

    /// Two-phase rename: write the new document, then delete the old one.
    /// An interruption between the phases can leave both names present but
    /// never loses content.
    pub fn rename(&mut self, old_path: &str, new_path: &str) -> Result<()> {
        validate_name(old_path)?;
        validate_name(new_path)?;
        if old_path == new_path {
            return Ok(());
        }
        if self.cache.contains_key(new_path) {
            return Err(Error::FileAlreadyExists(new_path.to_string()));
        }

        let content = self
            .cache
            .get(old_path)
            .cloned()
            .ok_or_else(|| Error::FileNotFound(old_path.to_string()))?;

        self.save(new_path, &content)?;
        self.delete(old_path)
    }

    /// Compares the cache against the persistent store, key by key. Any
    /// divergence is a `PersistenceInconsistency` naming the offending path.
    pub fn verify_consistent(&self) -> Result<()> {
        let (records, warnings) = self.list();
        if let Some(warning) = warnings.first() {
            return Err(Error::PersistenceInconsistency {
                detail: warning.clone(),
            });
        }

        let durable: BTreeMap<&str, &str> = records
            .iter()
            .map(|record| (record.path.as_str(), record.content.as_str()))
            .collect();

        for (path, content) in &self.cache {
            match durable.get(path.as_str()) {
                Some(stored) if *stored == content.as_str() => {}
                Some(_) => {
                    return Err(Error::PersistenceInconsistency {
                        detail: format!("content differs for {path}"),
                    });
                }
                None => {
                    return Err(Error::PersistenceInconsistency {
                        detail: format!("{path} is cached but not stored"),
                    });
                }
            }
        }
        for path in durable.keys() {
            if !self.cache.contains_key(*path) {
                return Err(Error::PersistenceInconsistency {
                    detail: format!("{path} is stored but not cached"),
                });
            }
        }
        Ok(())
    }
}
