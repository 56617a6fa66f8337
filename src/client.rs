use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::catalog::latest_run_in_capabilities;
use crate::error::{Error, Result};
use crate::settings::{DataTypeSettings, ModelSettings, UserSettings};
use crate::template::CoverageIdTemplate;
use crate::time::{format_subset_time, parse_run_time};
use crate::transport::{RetryPolicy, Transport};
use crate::window::{window_from_description, CoverageWindow};

/// The one WCS version the service speaks.
pub const WCS_VERSION: &str = "2.0.1";

const GRIB_FORMAT: &str = "application/wmo-grib";
const RUN_INFO_FILE: &str = "run_info.json";

const CAPABILITIES_QUERY: [(&str, &str); 3] = [
    ("service", "WCS"),
    ("version", WCS_VERSION),
    ("language", "eng"),
];

/// Outcome of the reachability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Online,
    Offline,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServiceStatus::Online => "online",
            ServiceStatus::Offline => "offline",
        })
    }
}

/// Record persisted next to the downloaded files, one per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_time: String,
    pub start_time: String,
    pub end_time: String,
}

/// Everything one run download produced.
#[derive(Debug, Clone)]
pub struct RunArtifact {
    pub run_time: String,
    pub window: CoverageWindow,
    /// GRIB files in subset-time order, one per hour of the window.
    pub files: Vec<PathBuf>,
    pub metadata_path: PathBuf,
    pub size_bytes: u64,
}

/// Client for one model of the coverage service.
///
/// A client owns its settings snapshot: templates are parsed and endpoints
/// validated at construction, so later calls only fail on the network or the
/// filesystem.
#[derive(Debug, Clone)]
pub struct Client {
    settings: ModelSettings,
    templates: BTreeMap<String, CoverageIdTemplate>,
    transport: Transport,
}

impl Client {
    pub fn new(settings: ModelSettings, api_key: Option<&str>) -> Result<Self> {
        Self::with_retry(settings, api_key, RetryPolicy::default())
    }

    pub fn with_retry(
        settings: ModelSettings,
        api_key: Option<&str>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let mut templates = BTreeMap::new();
        for (name, data_type) in &settings.data_types {
            let template = CoverageIdTemplate::parse(&data_type.coverage_id)?;
            if let Some([start, end]) = data_type.time_offsets {
                if end < start {
                    return Err(Error::Settings(format!(
                        "data type {name}: time_offsets end {end} precedes start {start}"
                    )));
                }
            }
            templates.insert(name.clone(), template);
        }

        endpoint_url(&settings.server, &settings.get_capabilities_path)?;
        endpoint_url(&settings.server, &settings.get_coverage_path)?;
        if let Some(path) = &settings.describe_coverage_path {
            endpoint_url(&settings.server, path)?;
        }

        let transport = Transport::new(api_key, retry)?;
        Ok(Self {
            settings,
            templates,
            transport,
        })
    }

    /// Wire a client from the two settings files, picking the section and
    /// API key for `model`.
    pub fn from_settings_files(
        model_settings: impl AsRef<Path>,
        user_settings: impl AsRef<Path>,
        model: &str,
    ) -> Result<Self> {
        let settings = ModelSettings::load(model_settings, model)?;
        let user = UserSettings::load(user_settings)?;
        Self::new(settings, user.api_key(model))
    }

    /// Configured data-type names for this model.
    pub fn data_types(&self) -> Vec<&str> {
        self.settings.data_types.keys().map(String::as_str).collect()
    }

    /// One GetCapabilities probe, single attempt, no retry.
    pub fn status(&self) -> ServiceStatus {
        let Ok(url) = self.endpoint(&self.settings.get_capabilities_path) else {
            return ServiceStatus::Offline;
        };
        if self.transport.probe(&url, &CAPABILITIES_QUERY) {
            ServiceStatus::Online
        } else {
            ServiceStatus::Offline
        }
    }

    /// Discover the most recent run published for `data_type`.
    ///
    /// `Ok(None)` is the normal "no run published yet" outcome; transport
    /// failures are errors.
    pub fn latest_run(&self, data_type: &str) -> Result<Option<String>> {
        let template = self.template(data_type)?;
        let url = self.endpoint(&self.settings.get_capabilities_path)?;
        let body = self.transport.get(&url, &CAPABILITIES_QUERY)?;
        let xml = String::from_utf8_lossy(&body);
        Ok(latest_run_in_capabilities(&xml, template))
    }

    /// Resolve the forecast-hour window for a run of `data_type`.
    ///
    /// Data types with configured `time_offsets` resolve statically from the
    /// run time; the rest ask the DescribeCoverage endpoint.
    pub fn resolve_window(&self, data_type: &str, run_time: &str) -> Result<CoverageWindow> {
        if let Some(offsets) = self.data_type(data_type)?.time_offsets {
            let run = parse_run_time(run_time)?;
            return CoverageWindow::from_offsets(run, offsets);
        }

        let path = self.settings.describe_coverage_path.as_deref().ok_or_else(|| {
            Error::Settings(format!(
                "data type {data_type} has no time_offsets and the model settings \
                 carry no describe_coverage_path"
            ))
        })?;
        let coverage_id = self.templates[data_type].format(run_time);
        let url = self.endpoint(path)?;
        let query = [
            ("service", "WCS"),
            ("version", WCS_VERSION),
            ("coverageID", coverage_id.as_str()),
        ];
        let body = self.transport.get(&url, &query)?;
        let xml = String::from_utf8_lossy(&body);
        window_from_description(&xml, &coverage_id)
    }

    /// Download every forecast hour of `run_time` into `output_dir`.
    ///
    /// The directory is owned by the run: prior contents are removed before
    /// writing, so a re-download never mixes hours from different runs. One
    /// GRIB file is written per hour, then the `run_info.json` record. Any
    /// single-hour failure aborts the download and leaves the partially
    /// populated directory without a metadata record.
    pub fn download_run(
        &self,
        data_type: &str,
        run_time: &str,
        output_dir: impl AsRef<Path>,
    ) -> Result<RunArtifact> {
        let output_dir = output_dir.as_ref();
        let coverage_id = self.template(data_type)?.format(run_time);
        let window = self.resolve_window(data_type, run_time)?;

        if output_dir.exists() {
            warn!("clearing previous contents of {}", output_dir.display());
            fs::remove_dir_all(output_dir)?;
        }
        fs::create_dir_all(output_dir)?;

        let url = self.endpoint(&self.settings.get_coverage_path)?;
        let mut files = Vec::with_capacity(window.hour_count());
        let mut size_bytes: u64 = 0;

        for subset in window.hours() {
            let subset_time = format_subset_time(subset);
            let subset_param = format!("time({subset_time})");
            let query = [
                ("service", "WCS"),
                ("version", WCS_VERSION),
                ("coverageid", coverage_id.as_str()),
                ("subset", subset_param.as_str()),
                ("format", GRIB_FORMAT),
            ];

            let body = self.transport.get(&url, &query)?;
            let path = output_dir.join(grib_file_name(data_type, run_time, &subset_time));
            fs::write(&path, &body)?;
            info!("downloaded {}", path.display());

            size_bytes += body.len() as u64;
            files.push(path);
        }

        let metadata = RunMetadata {
            run_time: run_time.to_string(),
            start_time: format_subset_time(window.start),
            end_time: format_subset_time(window.end),
        };
        let metadata_path = write_run_metadata(output_dir, &metadata)?;
        info!("run info saved: {}", metadata_path.display());

        Ok(RunArtifact {
            run_time: run_time.to_string(),
            window,
            files,
            metadata_path,
            size_bytes,
        })
    }

    /// Discover the latest run and download it in one go.
    ///
    /// Fails before any fetch when no run is discoverable, so the output
    /// directory is left untouched.
    pub fn download_latest(
        &self,
        data_type: &str,
        output_dir: impl AsRef<Path>,
    ) -> Result<RunArtifact> {
        let run_time = self
            .latest_run(data_type)?
            .ok_or_else(|| Error::NoRunAvailable(data_type.to_string()))?;
        info!("latest {data_type} run: {run_time}");
        self.download_run(data_type, &run_time, output_dir)
    }

    fn data_type(&self, name: &str) -> Result<&DataTypeSettings> {
        self.settings
            .data_types
            .get(name)
            .ok_or_else(|| Error::UnknownDataType(name.to_string()))
    }

    fn template(&self, name: &str) -> Result<&CoverageIdTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| Error::UnknownDataType(name.to_string()))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        endpoint_url(&self.settings.server, path)
    }
}

fn endpoint_url(server: &str, path: &str) -> Result<Url> {
    Ok(Url::parse(&format!("{server}{path}"))?)
}

fn grib_file_name(data_type: &str, run_time: &str, subset_time: &str) -> String {
    format!("{data_type}_{run_time}_{subset_time}.grib")
}

fn write_run_metadata(output_dir: &Path, metadata: &RunMetadata) -> Result<PathBuf> {
    let path = output_dir.join(RUN_INFO_FILE);
    fs::write(&path, serde_json::to_vec_pretty(metadata)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings() -> ModelSettings {
        let json = r#"{
            "server": "https://public-api.meteofrance.fr/public/arome/1.0",
            "get_capabilities_path": "/wcs/GetCapabilities",
            "describe_coverage_path": "/wcs/DescribeCoverage",
            "get_coverage_path": "/wcs/GetCoverage",
            "data_types": {
                "rain": {
                    "coverage_id": "RAIN___{run_time}",
                    "time_offsets": [0, 3]
                },
                "wind": {
                    "coverage_id": "WIND___{run_time}"
                }
            }
        }"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn construction_validates_templates() {
        let mut settings = test_settings();
        settings
            .data_types
            .get_mut("rain")
            .unwrap()
            .coverage_id = "RAIN_NO_PLACEHOLDER".to_string();
        assert!(matches!(
            Client::new(settings, None),
            Err(Error::InvalidTemplate(_))
        ));
    }

    #[test]
    fn construction_validates_offsets() {
        let mut settings = test_settings();
        settings.data_types.get_mut("rain").unwrap().time_offsets = Some([3, 0]);
        assert!(matches!(Client::new(settings, None), Err(Error::Settings(_))));
    }

    #[test]
    fn construction_validates_server_url() {
        let mut settings = test_settings();
        settings.server = "not a url".to_string();
        assert!(matches!(Client::new(settings, None), Err(Error::Url(_))));
    }

    #[test]
    fn data_types_lists_configured_names() {
        let client = Client::new(test_settings(), None).unwrap();
        assert_eq!(client.data_types(), vec!["rain", "wind"]);
    }

    #[test]
    fn unknown_data_type_is_rejected_before_any_request() {
        let client = Client::new(test_settings(), None).unwrap();
        assert!(matches!(
            client.resolve_window("snow", "2024-11-17T15.00.00Z"),
            Err(Error::UnknownDataType(_))
        ));
    }

    #[test]
    fn static_window_resolves_without_network() {
        let client = Client::new(test_settings(), None).unwrap();
        let window = client
            .resolve_window("rain", "2024-11-17T15.00.00Z")
            .unwrap();
        assert_eq!(format_subset_time(window.start), "2024-11-17T15:00:00Z");
        assert_eq!(format_subset_time(window.end), "2024-11-17T18:00:00Z");
        assert_eq!(window.hour_count(), 4);
    }

    #[test]
    fn static_window_requires_a_valid_run_time() {
        let client = Client::new(test_settings(), None).unwrap();
        assert!(matches!(
            client.resolve_window("rain", "2024-11-17T15:00:00Z"),
            Err(Error::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn dynamic_resolution_without_describe_path_is_a_settings_error() {
        let mut settings = test_settings();
        settings.describe_coverage_path = None;
        let client = Client::new(settings, None).unwrap();
        assert!(matches!(
            client.resolve_window("wind", "2024-11-17T15.00.00Z"),
            Err(Error::Settings(_))
        ));
    }

    #[test]
    fn grib_file_names_encode_type_run_and_subset() {
        assert_eq!(
            grib_file_name("rain", "2024-11-17T15.00.00Z", "2024-11-17T16:00:00Z"),
            "rain_2024-11-17T15.00.00Z_2024-11-17T16:00:00Z.grib"
        );
    }

    #[test]
    fn run_metadata_round_trips_through_run_info_file() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = RunMetadata {
            run_time: "2024-11-17T15.00.00Z".to_string(),
            start_time: "2024-11-17T15:00:00Z".to_string(),
            end_time: "2024-11-17T18:00:00Z".to_string(),
        };

        let path = write_run_metadata(dir.path(), &metadata).unwrap();
        assert_eq!(path.file_name().unwrap(), RUN_INFO_FILE);

        let read: RunMetadata =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(read, metadata);

        // A second write for the same directory replaces the record.
        let later = RunMetadata {
            run_time: "2024-11-17T18.00.00Z".to_string(),
            ..metadata
        };
        write_run_metadata(dir.path(), &later).unwrap();
        let read: RunMetadata =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(read.run_time, "2024-11-17T18.00.00Z");
    }
}
