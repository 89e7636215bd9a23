/*! Configuration

Workers get a flat `key -> value` map from the job ([RawConfig]), that is resolved once
into an immutable [ConfigurationContext]. Keys are listed in [keys].
!*/
mod context;
pub mod keys;

use std::{fs::File, io::BufReader, path::Path};

pub use context::{log_configurations, AppendSettings, ConfigurationContext, MismatchPolicy, RawConfig};

use crate::error::Error;

/// Load a raw configuration from a JSON object of strings.
pub fn load_json(path: &Path) -> Result<RawConfig, Error> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
