use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::error::Result;

pub const PROCESSED_SUFFIX: &str = "_processed.csv";
pub const ALLOWED_EXTENSIONS: [&str; 1] = ["csv"];
const PARTIAL_SUFFIX: &str = ".partial";

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("valid filename regex"));

/// Reduce a client-supplied file name to a safe single path component.
/// Accented letters are folded to their ASCII base first (`é` -> `e`).
pub fn secure_filename(name: &str) -> String {
    let folded: String = name.nfkd().filter(char::is_ascii).collect();
    let joined = folded
        .replace(['/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(&joined, "");
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');

    if cleaned.is_empty() {
        "upload.csv".to_string()
    } else {
        cleaned.to_string()
    }
}

/// True when the name has an allowed extension (case-insensitive).
pub fn is_allowed_file(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Name of the cleaned file produced for an upload, e.g. `a.csv` -> `a_processed.csv`
pub fn processed_file_name(original: &str) -> String {
    let secured = secure_filename(original);
    let stem = Path::new(&secured)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or(secured.clone());
    format!("{stem}{PROCESSED_SUFFIX}")
}

/// Directory holding raw uploads and their processed copies
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Open the store, creating the directory if it does not exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the raw upload under a unique name so concurrent uploads of the
    /// same file never collide.
    pub fn save_upload(&self, original_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self
            .root
            .join(format!("{}_{}", Uuid::new_v4(), secure_filename(original_name)));
        fs::write(&path, bytes)?;
        debug!("Saved upload to {}", path.display());
        Ok(path)
    }

    pub fn processed_path(&self, original_name: &str) -> PathBuf {
        self.root.join(processed_file_name(original_name))
    }

    /// Keep a copy of a cleaned export. The bytes go to a uniquely named
    /// partial file first and are renamed into place, so readers and the
    /// retention sweep never see a half-written `_processed.csv`.
    pub fn write_processed(&self, original_name: &str, contents: &[u8]) -> Result<PathBuf> {
        let target = self.processed_path(original_name);
        let partial = self
            .root
            .join(format!(".{}{}", Uuid::new_v4(), PARTIAL_SUFFIX));

        fs::write(&partial, contents)?;
        if let Err(e) = fs::rename(&partial, &target) {
            self.remove(&partial);
            return Err(e.into());
        }

        debug!("Wrote processed file {}", target.display());
        Ok(target)
    }

    /// Best-effort delete; failures are logged, not returned.
    pub fn remove(&self, path: &Path) {
        if !path.exists() {
            return;
        }
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }

    /// Delete the oldest processed files until at most `keep` remain.
    /// Returns the names of the removed files. Files another sweep deletes
    /// first are skipped.
    pub fn clean_up_processed(&self, keep: usize) -> Result<Vec<String>> {
        let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(PROCESSED_SUFFIX) {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if !metadata.is_file() {
                continue;
            }
            files.push((metadata.modified()?, entry.path()));
        }

        if files.len() <= keep {
            return Ok(Vec::new());
        }

        files.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        let excess = files.len() - keep;

        let mut removed = Vec::with_capacity(excess);
        for (_, path) in files.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            info!("Removed old processed file: {}", name);
            removed.push(name);
        }

        Ok(removed)
    }
}
