//! Loading and saving [`RunnerConfig`] files.
//!
//! # Example YAML
//!
//! ```yaml
//! help_command: help
//! validate_raw_flags: false
//! defaults:
//!   verbosity: 2
//!   timeout_secs: 10
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use cmdtree_core::RunnerConfig;

use crate::error::Result;

/// YAML file persistence for [`RunnerConfig`].
///
/// # Examples
///
/// ```no_run
/// use cmdtree_core::RunnerConfig;
/// use cmdtree_manifest::ConfigFile;
///
/// let mut config = RunnerConfig::load("cmdtree.yml").unwrap();
/// config.validate_raw_flags = false;
/// config.save("cmdtree.yml").unwrap();
/// ```
pub trait ConfigFile: Sized {
    /// Loads configuration from a YAML file.
    ///
    /// Missing fields take their defaults, so an empty document is valid.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::ManifestError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::ManifestError::YamlError) if parsing
    /// fails.
    fn load(path: impl AsRef<Path>) -> Result<Self>;

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::ManifestError::IoError) if the file cannot
    /// be written, or [`YamlError`](crate::ManifestError::YamlError) if
    /// serialization fails.
    fn save(&self, path: impl AsRef<Path>) -> Result<()>;
}

impl ConfigFile for RunnerConfig {
    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}

/// Loads runner configuration from a YAML file. See [`ConfigFile::load`].
pub fn load_config(path: impl AsRef<Path>) -> Result<RunnerConfig> {
    RunnerConfig::load(path)
}

/// Saves runner configuration as YAML. See [`ConfigFile::save`].
pub fn save_config(config: &RunnerConfig, path: impl AsRef<Path>) -> Result<()> {
    config.save(path)
}
