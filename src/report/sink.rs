use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::ReportError;

use super::ReportArtifact;

/// Export mechanism for a rendered report. The engine only names the file and
/// its MIME type.
pub trait ReportSink: Send + Sync {
    fn deliver(&self, artifact: &ReportArtifact) -> Result<(), ReportError>;
}

/// Writes each artifact into a directory under its own file name.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, artifact: &ReportArtifact) -> PathBuf {
        self.dir.join(&artifact.file_name)
    }
}

impl ReportSink for DirectorySink {
    fn deliver(&self, artifact: &ReportArtifact) -> Result<(), ReportError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(artifact), &artifact.body)?;
        Ok(())
    }
}

/// Keeps delivered artifacts in memory.
#[derive(Default)]
pub struct CollectingSink {
    delivered: Mutex<Vec<ReportArtifact>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<ReportArtifact> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReportSink for CollectingSink {
    fn deliver(&self, artifact: &ReportArtifact) -> Result<(), ReportError> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(artifact.clone());
        Ok(())
    }
}
