use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// One downloadable variable family of a model.
#[derive(Debug, Clone, Deserialize)]
pub struct DataTypeSettings {
    /// Coverage-id template containing a `{run_time}` placeholder.
    pub coverage_id: String,
    /// Static forecast window as hours relative to the run time,
    /// `[start, end]`. When absent the window is resolved with a
    /// DescribeCoverage request instead.
    #[serde(default)]
    pub time_offsets: Option<[i64; 2]>,
}

/// Per-model section of `model_settings.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    pub server: String,
    pub get_capabilities_path: String,
    #[serde(default)]
    pub describe_coverage_path: Option<String>,
    pub get_coverage_path: String,
    pub data_types: BTreeMap<String, DataTypeSettings>,
}

impl ModelSettings {
    /// Load the section for `model` from a settings file mapping model names
    /// to their settings.
    pub fn load(path: impl AsRef<Path>, model: &str) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).map_err(|e| Error::SettingsRead(path.to_path_buf(), e))?;
        let mut models: BTreeMap<String, ModelSettings> = serde_json::from_reader(file)?;
        models.remove(model).ok_or_else(|| {
            Error::Settings(format!("model {model} not present in {}", path.display()))
        })
    }
}

/// `user_settings.json`: per-model API keys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserSettings {
    #[serde(default)]
    pub api_keys: BTreeMap<String, String>,
}

impl UserSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).map_err(|e| Error::SettingsRead(path.to_path_buf(), e))?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn api_key(&self, model: &str) -> Option<&str> {
        self.api_keys.get(model).map(String::as_str)
    }
}
