//! `evfeat` extracts kinematic features from generated proton-proton
//! collision events for the classification of diffractive and
//! non-diffractive processes.
//!
//! For each of the two event classes, a [generator](generator::Generator)
//! is configured, a fixed number of events is generated, and the
//! resulting rows are written to one CSV file per class. There are two
//! kinds of output:
//!
//! - one row per event with aggregated, smeared quantities
//!   ([EventFeatures](features::EventFeatures)),
//! - one row per final-state particle with exact kinematics
//!   ([ParticleFeatures](features::ParticleFeatures)).
//!
//! ## Most relevant modules
//!
//! - [prelude] exports a list of the most relevant classes and objects
//! - [run] contains the driver and lists the steps that are performed
//! - [generator] defines the interface to event generators, implemented
//!   by the [toy] generator and the [hepmc2] replay
//! - [features] for the extracted quantities
//! - [writer] for writing rows to a file
//!

/// Event class labels
pub mod class;
/// YAML run configuration
pub mod config;
/// Output compression
pub mod compression;
/// Scattering event class
pub mod event;
/// Feature extraction
pub mod features;
/// Four-vector class
pub mod four_vector;
/// Event generator interface
pub mod generator;
/// Replay of HepMC2 event files
pub mod hepmc2;
/// Detector resolution
pub mod noise;
/// Particle class
pub mod particle;
/// Most important exports
pub mod prelude;
/// Progress bar
pub mod progress_bar;
/// Orchestration of a complete run
pub mod run;
/// Generator configuration
pub mod settings;
/// Toy event generator
pub mod toy;
/// Common traits
pub mod traits;
/// CSV writer
pub mod writer;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_REV: Option<&str> = option_env!("VERGEN_GIT_SHA");
pub const GIT_BRANCH: Option<&str> = option_env!("VERGEN_GIT_BRANCH");
