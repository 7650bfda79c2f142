//! Model description loading
//!
//! The description file must be readable before the pipeline starts; a
//! missing or empty file is a fatal setup error.

use std::path::Path;

use contracts::TrackError;
use tracing::info;

/// Loaded model description resource.
#[derive(Debug, Clone)]
pub struct ModelDescription {
    name: String,
    content: String,
}

impl ModelDescription {
    /// Read the description file at `path`.
    ///
    /// # Errors
    /// `TrackError::ModelLoad` when the file is unreadable or empty.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrackError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let content = std::fs::read_to_string(path)
            .map_err(|err| TrackError::model_load(&display, err.to_string()))?;
        if content.trim().is_empty() {
            return Err(TrackError::model_load(&display, "description file is empty"));
        }

        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("model")
            .to_string();

        info!(name, bytes = content.len(), "model description loaded");
        Ok(Self { name, content })
    }

    /// Model name (file stem of the description file).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw description content.
    pub fn content(&self) -> &str {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_reads_name_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pattern.wrl");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#VRML V2.0 utf8").unwrap();

        let model = ModelDescription::load(&path).unwrap();
        assert_eq!(model.name(), "pattern");
        assert!(model.content().contains("VRML"));
    }

    #[test]
    fn missing_file_is_model_load_error() {
        let err = ModelDescription::load("/nonexistent/pattern.wrl").unwrap_err();
        assert!(matches!(err, TrackError::ModelLoad { .. }));
    }

    #[test]
    fn empty_file_is_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wrl");
        std::fs::write(&path, "  \n").unwrap();

        let err = ModelDescription::load(&path).unwrap_err();
        assert!(matches!(err, TrackError::ModelLoad { .. }));
    }
}
