use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wxr_common::platform::runtime_library_name;

/// Manifest format version understood by every 1.x loader.
pub const FILE_FORMAT_VERSION: &str = "1.0.0";

/// The JSON document the OpenXR loader reads to find an active runtime.
#[derive(Debug, Serialize, Deserialize)]
pub struct RuntimeManifest {
    pub file_format_version: String,
    pub runtime: RuntimeEntry,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RuntimeEntry {
    pub library_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RuntimeManifest {
    /// Manifest for `library`, or for the runtime library installed next to
    /// the running binary.
    pub fn for_library(library: Option<PathBuf>) -> anyhow::Result<Self> {
        let library = match library {
            Some(path) => path,
            None => default_library_path()?,
        };
        Ok(Self {
            file_format_version: FILE_FORMAT_VERSION.to_string(),
            runtime: RuntimeEntry {
                library_path: library.display().to_string(),
                name: Some("WXR".to_string()),
            },
        })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `library_path` resolved the way the loader does: relative paths are
    /// taken from the manifest's directory.
    pub fn resolved_library(&self, manifest_path: &Path) -> PathBuf {
        let library = PathBuf::from(&self.runtime.library_path);
        if library.is_absolute() {
            return library;
        }
        manifest_path
            .parent()
            .map(|dir| dir.join(&library))
            .unwrap_or(library)
    }
}

fn default_library_path() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| anyhow::anyhow!("cannot determine directory of {}", exe.display()))?;
    Ok(dir.join(runtime_library_name()))
}
