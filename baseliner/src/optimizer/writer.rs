//! Applying baseline changes.
//!
//! The optimizer decides on [`BaselineChange`]s against its in-memory digest
//! map and hands each one to a [`BaselineWriter`]. [`FsWriter`] mutates the
//! tree; [`CheckWriter`] only reports.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::{OptimizerError, OptimizerResult};

/// Why a baseline is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// Every search path reaching it falls back to an equal baseline.
    Redundant,
    /// No search path reaches it.
    Unreachable,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalReason::Redundant => write!(f, "redundant"),
            RemovalReason::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// One file-level change to the baseline tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BaselineChange {
    /// Copy `source` to the root baseline `dest`. `sources` lists every
    /// predecessor that agreed on the value.
    Promote {
        dest: PathBuf,
        source: PathBuf,
        sources: Vec<PathBuf>,
    },
    Remove {
        path: PathBuf,
        reason: RemovalReason,
    },
}

impl BaselineChange {
    /// The file created, overwritten, or deleted.
    pub fn target(&self) -> &Path {
        match self {
            BaselineChange::Promote { dest, .. } => dest,
            BaselineChange::Remove { path, .. } => path,
        }
    }

    /// One-line description, phrased as a proposal in check mode.
    pub fn describe(&self, check: bool) -> String {
        match self {
            BaselineChange::Promote { dest, sources, .. } => {
                let sources: Vec<String> =
                    sources.iter().map(|s| s.display().to_string()).collect();
                format!(
                    "{} {} from {}",
                    if check { "Can promote" } else { "Promoted" },
                    dest.display(),
                    sources.join(", ")
                )
            }
            BaselineChange::Remove { path, reason } => format!(
                "{} {} ({})",
                if check { "Can remove" } else { "Removed" },
                path.display(),
                reason
            ),
        }
    }
}

/// Sink for baseline changes.
pub trait BaselineWriter {
    /// Apply one change.
    ///
    /// # Errors
    ///
    /// Returns an I/O error wrapped in [`OptimizerError`]. The optimizer
    /// aborts the pass on the first failure.
    fn apply(&self, change: &BaselineChange) -> OptimizerResult<()>;

    /// Whether changes are only reported, never applied.
    fn is_check_only(&self) -> bool {
        false
    }
}

/// Writes changes to disk.
///
/// Promotions copy to a temporary sibling and rename it into place, so a
/// baseline is never observed half-written.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsWriter;

impl FsWriter {
    fn copy(source: &Path, dest: &Path) -> OptimizerResult<()> {
        let write_failed = |e| OptimizerError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        };

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }

        let extension = dest
            .extension()
            .map(|e| format!("{}.tmp", e.to_string_lossy()))
            .unwrap_or_else(|| "tmp".to_string());
        let temp = dest.with_extension(extension);

        fs::copy(source, &temp).map_err(|e| OptimizerError::ReadFailed {
            path: source.to_path_buf(),
            source: e,
        })?;
        fs::rename(&temp, dest).map_err(write_failed)
    }
}

impl BaselineWriter for FsWriter {
    fn apply(&self, change: &BaselineChange) -> OptimizerResult<()> {
        match change {
            BaselineChange::Promote { dest, source, .. } => Self::copy(source, dest)?,
            BaselineChange::Remove { path, .. } => {
                fs::remove_file(path).map_err(|e| OptimizerError::RemoveFailed {
                    path: path.clone(),
                    source: e,
                })?
            }
        }
        info!("{}", change.describe(false));
        Ok(())
    }
}

/// Reports changes without touching disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckWriter;

impl BaselineWriter for CheckWriter {
    fn apply(&self, change: &BaselineChange) -> OptimizerResult<()> {
        info!("{}", change.describe(true));
        Ok(())
    }

    fn is_check_only(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_describe() {
        let promote = BaselineChange::Promote {
            dest: PathBuf::from("/w/foo-expected.txt"),
            source: PathBuf::from("/w/platform/linux/foo-expected.txt"),
            sources: vec![
                PathBuf::from("/w/platform/linux/foo-expected.txt"),
                PathBuf::from("/w/platform/win/foo-expected.txt"),
            ],
        };
        assert_eq!(
            promote.describe(true),
            concat!(
                "Can promote /w/foo-expected.txt from /w/platform/linux/foo-expected.txt, ",
                "/w/platform/win/foo-expected.txt"
            )
        );

        let remove = BaselineChange::Remove {
            path: PathBuf::from("/w/platform/win/foo-expected.txt"),
            reason: RemovalReason::Unreachable,
        };
        assert_eq!(
            remove.describe(true),
            "Can remove /w/platform/win/foo-expected.txt (unreachable)"
        );
        assert_eq!(
            remove.describe(false),
            "Removed /w/platform/win/foo-expected.txt (unreachable)"
        );
        assert_eq!(remove.target(), Path::new("/w/platform/win/foo-expected.txt"));
    }

    #[test]
    fn test_fs_writer_promotes_into_new_directory() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("platform/win/foo-expected.txt");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, "a").unwrap();
        let dest = temp.path().join("virtual/v/foo-expected.txt");

        FsWriter
            .apply(&BaselineChange::Promote {
                dest: dest.clone(),
                source: source.clone(),
                sources: vec![source.clone()],
            })
            .unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "a");
        assert!(source.exists());
        assert!(!temp.path().join("virtual/v/foo-expected.txt.tmp").exists());
    }

    #[test]
    fn test_fs_writer_removes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("foo-expected.txt");
        fs::write(&path, "a").unwrap();

        FsWriter
            .apply(&BaselineChange::Remove {
                path: path.clone(),
                reason: RemovalReason::Redundant,
            })
            .unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_fs_writer_remove_missing_fails() {
        let temp = TempDir::new().unwrap();
        let result = FsWriter.apply(&BaselineChange::Remove {
            path: temp.path().join("gone-expected.txt"),
            reason: RemovalReason::Redundant,
        });
        assert!(matches!(result, Err(OptimizerError::RemoveFailed { .. })));
    }

    #[test]
    fn test_check_writer_leaves_disk_alone() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("foo-expected.txt");
        fs::write(&path, "a").unwrap();

        let writer = CheckWriter;
        assert!(writer.is_check_only());
        writer
            .apply(&BaselineChange::Remove {
                path: path.clone(),
                reason: RemovalReason::Redundant,
            })
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_change_serializes_with_action_tag() {
        let change = BaselineChange::Remove {
            path: PathBuf::from("/w/foo-expected.txt"),
            reason: RemovalReason::Redundant,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["action"], "remove");
        assert_eq!(json["reason"], "redundant");
    }
}
