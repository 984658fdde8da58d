mod common;
mod opt_common;
mod opt_events;

use crate::common::{init_logging, load_config, Setup};
use crate::opt_events::Opt;

use anyhow::{Context, Result};
use clap::Parser;
use evfeat::features::EventFeatures;
use evfeat::noise::{NoiseModel, Resolution};
use log::{debug, info};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

const DEFAULT_EVENTS: u64 = 1000;

fn main() -> Result<()> {
    let args = argfile::expand_args_from(
        std::env::args_os(),
        argfile::parse_fromfile,
        argfile::PREFIX,
    )
    .with_context(|| "Failed to read argument file")?;
    let opt = Opt::parse_from(args);
    init_logging("evfeat-events", &opt.common.loglevel);
    debug!("settings: {:#?}", opt);

    let config = load_config(&opt.common)?;
    let resolution = resolution(&opt, &config.resolution);
    resolution.validate()?;
    debug!("resolution: {resolution:?}");
    let policy = opt.empty_events.or(config.empty_events).unwrap_or_default();
    let nevents = opt.events.or(config.events).unwrap_or(DEFAULT_EVENTS);

    let setup = Setup::new(opt.common, config, nevents)?;
    // noise independent of the random numbers used by the toy generator
    let mut rng = Xoshiro256Plus::seed_from_u64(setup.seed);
    rng.jump();
    let features = EventFeatures::new(NoiseModel::new(rng), resolution, policy);
    setup.run(features)?;
    info!("done");
    Ok(())
}

/// Detector resolution with command line options taking precedence
fn resolution(opt: &Opt, config: &Resolution) -> Resolution {
    Resolution {
        pt: opt.pt_resolution.unwrap_or(config.pt),
        eta: opt.eta_resolution.unwrap_or(config.eta),
        phi: opt.phi_resolution.unwrap_or(config.phi),
        energy: opt.energy_resolution.unwrap_or(config.energy),
    }
}
