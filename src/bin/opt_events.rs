use crate::opt_common::CommonOpt;

use clap::Parser;
use evfeat::features::DegeneratePolicy;

#[derive(Debug, Clone, Parser)]
#[clap(about, author, version)]
pub(crate) struct Opt {
    /// Number of events generated for each class [default: 1000].
    #[clap(short = 'n', long)]
    pub(crate) events: Option<u64>,

    #[clap(flatten)]
    pub(crate) common: CommonOpt,

    #[clap(
        long,
        help = "Treatment of events without final-state particles [default: keep].
Possible settings are
'keep': write undefined averages as NaN,
'skip': don't write a row,
'zero': write zero for undefined averages.\n"
    )]
    pub(crate) empty_events: Option<DegeneratePolicy>,

    /// Relative transverse momentum resolution [default: 0.05].
    #[clap(long)]
    pub(crate) pt_resolution: Option<f64>,

    /// Relative pseudorapidity resolution [default: 0.03].
    #[clap(long)]
    pub(crate) eta_resolution: Option<f64>,

    /// Relative azimuthal angle resolution [default: 0.02].
    #[clap(long)]
    pub(crate) phi_resolution: Option<f64>,

    /// Relative energy resolution [default: 0.05].
    #[clap(long)]
    pub(crate) energy_resolution: Option<f64>,
}
