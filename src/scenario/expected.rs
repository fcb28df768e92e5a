//! Expected-failures manifest.

use std::io;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};

use super::ScenarioLogError;

/// Lines of a manifest listing scenarios known to fail.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExpectedFailures {
    lines: Vec<String>,
}

impl ExpectedFailures {
    /// A manifest that lists nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Builds a manifest from its text.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_owned).collect(),
        }
    }

    /// Reads the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioLogError::Io`] when the file cannot be read.
    pub fn load(path: &Utf8Path) -> Result<Self, ScenarioLogError> {
        let io_error = |err: io::Error| ScenarioLogError::Io {
            path: path.to_string(),
            message: err.to_string(),
        };
        let parent = path
            .parent()
            .filter(|dir| !dir.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let file_name = path.file_name().ok_or_else(|| ScenarioLogError::Io {
            path: path.to_string(),
            message: String::from("manifest path is missing a filename"),
        })?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(io_error)?;
        let text = dir.read_to_string(file_name).map_err(io_error)?;
        Ok(Self::from_text(&text))
    }

    /// Whether any manifest line mentions `scenario_ref`.
    #[must_use]
    pub fn contains(&self, scenario_ref: &str) -> bool {
        !scenario_ref.is_empty() && self.lines.iter().any(|line| line.contains(scenario_ref))
    }
}
