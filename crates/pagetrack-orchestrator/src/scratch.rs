//! Per-job scratch file lifetime
//!
//! A [`JobScratch`] owns the local paths a job may write. The Cleanup stage
//! calls [`JobScratch::cleanup`]; if a job never gets there, dropping the
//! guard removes the same files.

use pagetrack_browser::CapturePaths;
use std::path::Path;
use tracing::{debug, info, warn};

pub struct JobScratch {
    paths: CapturePaths,
    cleaned: bool,
}

impl JobScratch {
    pub fn new(paths: CapturePaths) -> Self {
        Self { paths, cleaned: false }
    }

    pub fn paths(&self) -> &CapturePaths {
        &self.paths
    }

    /// Remove every scratch file, returning how many existed
    pub async fn cleanup(&mut self) -> usize {
        info!("Cleaning up local files for this job");
        let mut removed = 0;
        for path in self.paths.all() {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {
                    debug!("Removed local file: {}", path.display());
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Error removing local file {}: {}", path.display(), e),
            }
        }
        self.cleaned = true;
        removed
    }
}

fn remove_quietly(path: &Path) {
    if std::fs::remove_file(path).is_ok() {
        debug!("Removed leftover file: {}", path.display());
    }
}

impl Drop for JobScratch {
    fn drop(&mut self) {
        if !self.cleaned {
            for path in self.paths.all() {
                remove_quietly(path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths_in(dir: &Path) -> CapturePaths {
        CapturePaths {
            raw_image: dir.join("temp.png"),
            normalized_image: dir.join("shot.jpg"),
            html: dir.join("page.html"),
        }
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        std::fs::write(&paths.normalized_image, b"jpeg").unwrap();

        let mut scratch = JobScratch::new(paths.clone());
        assert_eq!(scratch.cleanup().await, 1);
        assert_eq!(scratch.cleanup().await, 0);
        assert!(!paths.normalized_image.exists());
    }

    #[test]
    fn test_drop_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        for path in paths.all() {
            std::fs::write(path, b"x").unwrap();
        }

        drop(JobScratch::new(paths.clone()));

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
