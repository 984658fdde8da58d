mod common;
mod opt_common;
mod opt_particles;

use crate::common::{init_logging, load_config, Setup};
use crate::opt_particles::Opt;

use anyhow::{Context, Result};
use clap::Parser;
use evfeat::features::ParticleFeatures;
use log::{debug, info};

const DEFAULT_EVENTS: u64 = 5000;

fn main() -> Result<()> {
    let args = argfile::expand_args_from(
        std::env::args_os(),
        argfile::parse_fromfile,
        argfile::PREFIX,
    )
    .with_context(|| "Failed to read argument file")?;
    let opt = Opt::parse_from(args);
    init_logging("evfeat-particles", &opt.common.loglevel);
    debug!("settings: {:#?}", opt);

    let config = load_config(&opt.common)?;
    let policy = opt
        .degenerate_rapidity
        .or(config.degenerate_rapidity)
        .unwrap_or_default();
    let nevents = opt.events.or(config.events).unwrap_or(DEFAULT_EVENTS);

    let setup = Setup::new(opt.common, config, nevents)?;
    setup.run(ParticleFeatures::new(policy))?;
    info!("done");
    Ok(())
}
