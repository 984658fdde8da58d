use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use strum::{Display, EnumString};
use thiserror::Error;

use crate::compression::Compression;
use crate::features::DegeneratePolicy;
use crate::noise::{InvalidResolution, Resolution};
use crate::settings::{BeamSetup, Directive};

/// Source of generated events
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Display,
    EnumString,
    Eq,
    PartialEq,
    Hash,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    /// The built-in toy generator
    #[default]
    Toy,
    /// Replay events from HepMC2 files
    HepMC,
}

/// Run configuration read from a YAML file
///
/// All entries are optional. Command line options take precedence.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Number of generation attempts per class
    pub events: Option<u64>,
    pub beams: BeamSetup,
    pub outdir: Option<PathBuf>,
    pub compression: Option<Compression>,
    pub seed: Option<u64>,
    pub generator: Option<GeneratorKind>,
    pub non_diffractive_input: Option<PathBuf>,
    pub diffractive_input: Option<PathBuf>,
    /// Additional generator directives
    pub directives: Vec<Directive>,
    pub empty_events: Option<DegeneratePolicy>,
    pub degenerate_rapidity: Option<DegeneratePolicy>,
    pub resolution: Resolution,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Open {
            path: path.to_owned(),
            source,
        })?;
        let config: Self = serde_yaml::from_reader(BufReader::new(file))
            .map_err(|source| ConfigError::Parse {
                path: path.to_owned(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ecm = self.beams.ecm;
        if !(ecm.is_finite() && ecm > 0.) {
            return Err(ConfigError::InvalidEnergy(ecm));
        }
        self.resolution.validate()?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to open configuration file {path:?}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse configuration file {path:?}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Invalid centre-of-mass energy {0}")]
    InvalidEnergy(f64),
    #[error(transparent)]
    InvalidResolution(#[from] InvalidResolution),
}
