// src/store.rs
//
// Single-document JSON store. The whole entity graph is loaded, mutated in
// memory and written back as one file.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::client_ops::{Clock, RealClock};
use crate::error::{Error, Result};
use crate::model::Document;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 6;

/// Cloneable handle to the document on disk.
///
/// Writers go through [`Store::update`], which serializes load/mutate/save
/// behind one gate shared by every clone of the handle. Plain [`Store::load`]
/// never waits on that gate and sees the last saved snapshot.
#[derive(Clone)]
pub struct Store<C: Clock = RealClock> {
    path: PathBuf,
    gate: Arc<Mutex<()>>,
    clock: C,
}

impl Store<RealClock> {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, RealClock)
    }
}

impl<C: Clock> Store<C> {
    pub fn with_clock(path: impl Into<PathBuf>, clock: C) -> Self {
        Store {
            path: path.into(),
            gate: Arc::new(Mutex::new(())),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last saved document. A missing file reads as an empty
    /// document; the file itself is created by the first write.
    pub fn load(&self) -> Result<Document> {
        if !self.path.exists() {
            debug!("No document at {} yet; starting empty", self.path.display());
            return Ok(Document::default());
        }

        let raw = fs::read_to_string(&self.path).map_err(|e| self.store_error(e))?;
        let doc: Document = serde_json::from_str(&raw).map_err(|e| self.store_error(e))?;
        debug!(
            "Loaded store: {} projects, {} mailboxes, {} emails, {} classifications",
            doc.projects.len(),
            doc.mailboxes.len(),
            doc.emails.len(),
            doc.classifications.len()
        );
        Ok(doc)
    }

    /// Overwrite the document. Written to a uniquely named sibling file first,
    /// then renamed into place.
    pub fn save(&self, doc: &Document) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.store_error(e))?;
        }

        let body = serde_json::to_string_pretty(doc).map_err(|e| self.store_error(e))?;
        let tmp = self.tmp_path();
        fs::write(&tmp, body).map_err(|e| self.store_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            warn!("Failed to move {} into place: {}", tmp.display(), e);
            let _ = fs::remove_file(&tmp);
            self.store_error(e)
        })?;
        Ok(())
    }

    /// Run one mutating operation atomically with respect to other writers.
    /// The document is saved only when `f` succeeds.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Document) -> Result<T>,
    {
        let _guard = self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut doc = self.load()?;
        let out = f(&mut doc)?;
        self.save(&doc)?;
        Ok(out)
    }

    /// `<kind>_<millis>_<6 base36 chars>`; unique in practice, not guaranteed.
    pub fn new_id(&self, kind: &str) -> String {
        format!("{}_{}_{}", kind, self.clock.now().timestamp_millis(), random_suffix())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// `.<file>.<pid>.<suffix>.tmp`, so concurrent saves never share a temp file.
    fn tmp_path(&self) -> PathBuf {
        let file = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "db.json".to_string());
        let name = format!(".{}.{}.{}.tmp", file, std::process::id(), random_suffix());
        self.path.with_file_name(name)
    }

    fn store_error(&self, err: impl std::fmt::Display) -> Error {
        Error::Store {
            path: self.path.display().to_string(),
            detail: err.to_string(),
        }
    }
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}
