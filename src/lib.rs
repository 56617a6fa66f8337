#![forbid(unsafe_code)]

//! Rust client for Météo-France NWP coverage services (WCS 2.0.1).
//!
//! The service publishes each model run as a set of coverages, one per
//! variable family, named `<prefix><run_time><suffix>`. Retrieving a run is
//! a three-step protocol: discover the latest run time from the
//! GetCapabilities listing, resolve the valid forecast-hour window (either
//! from a DescribeCoverage time-period envelope or from static per-data-type
//! offsets), then fetch one GRIB file per hour with GetCoverage.
//!
//! **Quick start**
//! ```no_run
//! use meteofrance_wcs::Client;
//!
//! let client = Client::from_settings_files(
//!     "settings/model_settings.json",
//!     "settings/user_settings.json",
//!     "arome001",
//! )?;
//!
//! if let Some(run_time) = client.latest_run("rain")? {
//!     let artifact = client.download_run("rain", &run_time, "grib_files")?;
//!     println!("{} files, {} bytes", artifact.files.len(), artifact.size_bytes);
//! }
//! # Ok::<(), meteofrance_wcs::Error>(())
//! ```
//!
//! Notes:
//! - All requests are sequential blocking I/O; slow responses are retried
//!   per [`RetryPolicy`] (forever by default), other failures abort at once.
//! - Downloading clears the output directory first; one directory holds
//!   exactly one run.

mod catalog;
mod client;
mod error;
mod settings;
mod template;
mod time;
mod transport;
mod window;

pub use crate::client::{
    Client, RunArtifact, RunMetadata, ServiceStatus, WCS_VERSION,
};
pub use crate::error::{Error, Result};
pub use crate::settings::{DataTypeSettings, ModelSettings, UserSettings};
pub use crate::template::CoverageIdTemplate;
pub use crate::time::{RUN_TIME_FORMAT, SUBSET_TIME_FORMAT};
pub use crate::transport::{RetryPolicy, Transport};
pub use crate::window::CoverageWindow;
