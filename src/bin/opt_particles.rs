use crate::opt_common::CommonOpt;

use clap::Parser;
use evfeat::features::DegeneratePolicy;

#[derive(Debug, Clone, Parser)]
#[clap(about, author, version)]
pub(crate) struct Opt {
    /// Number of events generated for each class [default: 5000].
    #[clap(short = 'n', long)]
    pub(crate) events: Option<u64>,

    #[clap(flatten)]
    pub(crate) common: CommonOpt,

    #[clap(
        long,
        help = "Treatment of particles with undefined rapidity, i.e. E = |pz| [default: keep].
Possible settings are
'keep': write the rapidity as computed, e.g. inf,
'skip': don't write a row for the particle,
'zero': write zero rapidity.\n"
    )]
    pub(crate) degenerate_rapidity: Option<DegeneratePolicy>,
}
