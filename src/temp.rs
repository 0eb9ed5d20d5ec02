//! Per-run temporary files
//!
//! Every file a pipeline run creates besides its final output is reserved
//! through [`TempFiles`]. Names carry a random per-run namespace, so runs that
//! share an output directory never collide. Removal is best-effort: failures
//! are logged and never replace the run's own result.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// What an intermediate audio file is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentRole {
    /// The speaker reading out their own name
    NameAnnouncement,
    /// Generated silence
    Silence,
    /// The speaker reading the requested line
    SpokenText,
    /// Everything one speaker contributes, ready for final assembly
    SpeakerFinal,
}

impl SegmentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NameAnnouncement => "name",
            Self::Silence => "silence",
            Self::SpokenText => "text",
            Self::SpeakerFinal => "speaker",
        }
    }
}

/// A waveform file owned by one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSegment {
    pub path: PathBuf,
    pub role: SegmentRole,
}

/// Tracks every temporary file of one run and removes them all at the end
#[derive(Debug)]
pub struct TempFiles {
    dir: PathBuf,
    namespace: String,
    files: Vec<PathBuf>,
    counter: usize,
}

impl TempFiles {
    /// Start a fresh namespace inside `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            namespace: Uuid::new_v4().simple().to_string(),
            files: Vec::new(),
            counter: 0,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files reserved and not yet cleaned up
    pub fn tracked(&self) -> &[PathBuf] {
        &self.files
    }

    /// Reserve a tracked path. Nothing is created on disk.
    pub fn reserve(&mut self, label: &str, extension: &str) -> PathBuf {
        self.counter += 1;
        let name = format!(
            "tmp-{}-{:03}-{}.{}",
            self.namespace, self.counter, label, extension
        );
        let path = self.dir.join(name);
        self.files.push(path.clone());
        path
    }

    /// Reserve a WAV path for a segment
    pub fn reserve_segment(&mut self, role: SegmentRole) -> AudioSegment {
        AudioSegment {
            path: self.reserve(role.as_str(), "wav"),
            role,
        }
    }

    /// Reserve a path for a concat manifest
    pub fn reserve_manifest(&mut self) -> PathBuf {
        self.reserve("concat", "txt")
    }

    /// Remove every tracked file. Returns how many were actually deleted.
    pub async fn cleanup(&mut self) -> usize {
        let mut removed = 0;
        for file in self.files.drain(..) {
            match tokio::fs::remove_file(&file).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    log::warn!("Failed to delete temp file {}: {}", file.display(), e);
                }
            }
        }
        log::debug!("Removed {} temp files for run {}", removed, self.namespace);
        removed
    }
}

impl Drop for TempFiles {
    // Covers runs whose future was dropped before `cleanup` ran.
    fn drop(&mut self) {
        for file in self.files.drain(..) {
            match std::fs::remove_file(&file) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    log::warn!("Failed to delete temp file {}: {}", file.display(), e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_namespaced_and_unique() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = TempFiles::new(dir.path());
        let mut second = TempFiles::new(dir.path());

        let a = first.reserve_segment(SegmentRole::SpokenText);
        let b = first.reserve_segment(SegmentRole::SpokenText);
        let c = second.reserve_segment(SegmentRole::SpokenText);

        assert_ne!(a.path, b.path);
        assert_ne!(a.path, c.path);
        assert_ne!(first.namespace(), second.namespace());
        let name = a.path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.contains(first.namespace()));
        assert!(name.ends_with("-text.wav"));
        assert_eq!(a.role, SegmentRole::SpokenText);
    }

    #[tokio::test]
    async fn cleanup_removes_written_files_and_ignores_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        let mut temp = TempFiles::new(dir.path());

        let written = temp.reserve_segment(SegmentRole::Silence);
        std::fs::write(&written.path, b"x").unwrap();
        let manifest = temp.reserve_manifest();
        std::fs::write(&manifest, b"file 'x'").unwrap();
        let _never_written = temp.reserve_segment(SegmentRole::NameAnnouncement);

        assert_eq!(temp.tracked().len(), 3);
        assert_eq!(temp.cleanup().await, 2);
        assert!(temp.tracked().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn drop_removes_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut temp = TempFiles::new(dir.path());
            let segment = temp.reserve_segment(SegmentRole::SpeakerFinal);
            std::fs::write(&segment.path, b"x").unwrap();
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
