use std::path::PathBuf;

use clap::Parser;
use evfeat::compression::Compression;
use evfeat::config::GeneratorKind;
use evfeat::settings::Directive;

/// Options shared by all feature extraction programs
#[derive(Debug, Clone, Parser)]
pub(crate) struct CommonOpt {
    /// YAML run configuration.
    ///
    /// Options given on the command line take precedence over the
    /// entries in the configuration file.
    #[clap(long, value_parser)]
    pub(crate) config: Option<PathBuf>,

    /// Centre-of-mass energy in GeV [default: 13000].
    #[clap(long)]
    pub(crate) ecm: Option<f64>,

    /// Output directory [default: current directory].
    #[clap(long, short, value_parser)]
    pub(crate) outdir: Option<PathBuf>,

    #[clap(long,
                help = "Compress output files.
Possible settings are 'bzip2', 'gzip', 'zstd', 'lz4'.
Compression levels can be set with algorithm_level e.g. 'zstd_5'.
Maximum levels are 'gzip_9', 'zstd_19', 'lz4_16'.")]
    pub(crate) compression: Option<Compression>,

    /// Random number generator seed [default: 0].
    #[clap(long)]
    pub(crate) seed: Option<u64>,

    /// Verbosity level
    #[clap(
        short,
        long,
        default_value = "Info",
        help = "Verbosity level.
Possible values with increasing amount of output are
'off', 'error', 'warn', 'info', 'debug', 'trace'.\n"
    )]
    pub(crate) loglevel: String,

    #[clap(
        long,
        help = "Event generator [default: toy].
Possible settings are
'toy': built-in toy model of proton-proton collisions,
'hepmc': replay events from the files given by --non-diffractive-input
and --diffractive-input.\n"
    )]
    pub(crate) generator: Option<GeneratorKind>,

    /// HepMC2 file with non-diffractive events, optionally compressed.
    #[clap(long, value_parser)]
    pub(crate) non_diffractive_input: Option<PathBuf>,

    /// HepMC2 file with diffractive events, optionally compressed.
    #[clap(long, value_parser)]
    pub(crate) diffractive_input: Option<PathBuf>,

    /// Additional generator directive of the form 'Group:key = value'.
    ///
    /// Can be given multiple times. The directives are applied to both
    /// event classes after the default settings.
    #[clap(long = "set", value_name = "DIRECTIVE")]
    pub(crate) directives: Vec<Directive>,
}
