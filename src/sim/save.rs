/// Best-score persistence.
///
/// ## File format:
///   Key-value lines. Only one key is used:
///
///     balloon_best_v1=<decimal integer>
///
/// Stored as best.dat in the save directory. Unknown lines are ignored
/// on read and dropped on write.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub const BEST_KEY: &str = "balloon_best_v1";
const BEST_FILE: &str = "best.dat";

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("stored value for {key} is not an integer: {value:?}")]
    Malformed { key: &'static str, value: String },
}

/// Durable storage for the single best-score value.
pub trait BestStore {
    /// Stored best, or 0 when nothing has been stored yet.
    fn load(&self) -> Result<i32, SaveError>;
    fn store(&mut self, best: i32) -> Result<(), SaveError>;
}

// ══════════════════════════════════════════════════════════════
// Paths
// ══════════════════════════════════════════════════════════════

/// Directory for best.dat and the log file.
pub fn save_dir() -> PathBuf {
    // 1. Try exe directory (works for local/portable installs)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            // System installs won't be writable
            let test_path = parent.join(".write_test_balloonpop");
            if std::fs::write(&test_path, "").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return parent.to_path_buf();
            }
        }
    }

    // 2. XDG data home (~/.local/share/balloonpop) for system installs
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/balloonpop");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    // 3. Fallback to CWD
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

// ══════════════════════════════════════════════════════════════
// File store
// ══════════════════════════════════════════════════════════════

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    /// best.dat in the default save directory.
    pub fn in_save_dir() -> Self {
        Self::new(save_dir().join(BEST_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BestStore for FileStore {
    fn load(&self) -> Result<i32, SaveError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => parse_best(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(source) => Err(SaveError::Io { path: self.path.clone(), source }),
        }
    }

    fn store(&mut self, best: i32) -> Result<(), SaveError> {
        std::fs::write(&self.path, serialize(best))
            .map_err(|source| SaveError::Io { path: self.path.clone(), source })
    }
}

// ══════════════════════════════════════════════════════════════
// In-memory store (tests)
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    pub value: Option<i32>,
}

#[cfg(test)]
impl BestStore for MemoryStore {
    fn load(&self) -> Result<i32, SaveError> {
        Ok(self.value.unwrap_or(0))
    }

    fn store(&mut self, best: i32) -> Result<(), SaveError> {
        self.value = Some(best);
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════
// Serialization
// ══════════════════════════════════════════════════════════════

fn serialize(best: i32) -> String {
    format!("{}={}\n", BEST_KEY, best)
}

fn parse_best(content: &str) -> Result<i32, SaveError> {
    let prefix = format!("{}=", BEST_KEY);
    for line in content.lines() {
        if let Some(val) = line.trim().strip_prefix(prefix.as_str()) {
            let val = val.trim();
            if val.is_empty() {
                return Ok(0);
            }
            return val.parse().map_err(|_| SaveError::Malformed {
                key: BEST_KEY,
                value: val.to_string(),
            });
        }
    }
    Ok(0)
}
