use std::fs::create_dir_all;
use std::path::PathBuf;

use crate::opt_common::CommonOpt;

use anyhow::{bail, Context, Result};
use env_logger::Env;
use evfeat::{
    class::EventClass,
    compression::Compression,
    config::{GeneratorKind, RunConfig},
    generator::Generator,
    hepmc2::HepMCGenerator,
    run::{Driver, Outputs, RunPlan},
    toy::{ToyGenerator, ToyOptionsBuilder},
    traits::Extract,
    GIT_BRANCH, GIT_REV, VERSION,
};
use log::{info, warn};

pub(crate) fn init_logging(name: &str, loglevel: &str) {
    let env = Env::default().filter_or("EVFEAT_LOG", loglevel);
    env_logger::init_from_env(env);

    if let (Some(rev), Some(branch)) = (GIT_REV, GIT_BRANCH) {
        info!("{name} {VERSION} rev {rev} ({branch})");
    } else {
        info!("{name} {VERSION}");
    }
}

/// Read the configuration file, if any
pub(crate) fn load_config(opt: &CommonOpt) -> Result<RunConfig> {
    match &opt.config {
        Some(path) => {
            info!("Reading configuration from {path:?}");
            Ok(RunConfig::from_file(path)?)
        }
        None => Ok(RunConfig::default()),
    }
}

/// Everything needed for a run, with command line options merged into the configuration
#[derive(Debug)]
pub(crate) struct Setup {
    plan: RunPlan,
    outdir: PathBuf,
    compression: Option<Compression>,
    pub(crate) seed: u64,
    generator: GeneratorKind,
    non_diffractive_input: Option<PathBuf>,
    diffractive_input: Option<PathBuf>,
}

impl Setup {
    pub(crate) fn new(opt: CommonOpt, config: RunConfig, nevents: u64) -> Result<Self> {
        let mut beams = config.beams;
        if let Some(ecm) = opt.ecm {
            beams.ecm = ecm;
        }
        if !(beams.ecm.is_finite() && beams.ecm > 0.) {
            bail!("Invalid centre-of-mass energy {}", beams.ecm);
        }
        let mut directives = config.directives;
        directives.extend(opt.directives);
        let setup = Self {
            plan: RunPlan {
                nevents,
                beams,
                directives,
            },
            outdir: opt.outdir.or(config.outdir).unwrap_or_else(|| PathBuf::from(".")),
            compression: opt.compression.or(config.compression),
            seed: opt.seed.or(config.seed).unwrap_or_default(),
            generator: opt.generator.or(config.generator).unwrap_or_default(),
            non_diffractive_input: opt.non_diffractive_input.or(config.non_diffractive_input),
            diffractive_input: opt.diffractive_input.or(config.diffractive_input),
        };
        if setup.generator == GeneratorKind::Toy
            && (setup.non_diffractive_input.is_some() || setup.diffractive_input.is_some())
        {
            warn!("Input files are ignored by the toy generator");
        }
        Ok(setup)
    }

    pub(crate) fn run<X: Extract>(self, extractor: X) -> Result<()> {
        match self.generator {
            GeneratorKind::Toy => {
                let options = ToyOptionsBuilder::default().seed(self.seed).build()?;
                self.run_with(ToyGenerator::new(options), extractor)
            }
            GeneratorKind::HepMC => {
                let mut generator = HepMCGenerator::new();
                if let Some(path) = &self.non_diffractive_input {
                    generator = generator.with_input(EventClass::NonDiffractive, path);
                }
                if let Some(path) = &self.diffractive_input {
                    generator = generator.with_input(EventClass::Diffractive, path);
                }
                self.run_with(generator, extractor)
            }
        }
    }

    fn run_with<G: Generator, X: Extract>(self, generator: G, extractor: X) -> Result<()> {
        create_dir_all(&self.outdir)
            .with_context(|| format!("Failed to create output directory {:?}", self.outdir))?;
        let outputs = Outputs::create(&self.outdir, self.compression)?;
        let driver = Driver::new(generator, extractor, self.plan, outputs);
        let (summary, outputs) = driver.run()?;
        for output in outputs {
            output.finish().context("Failed to finish output file")?;
        }
        info!("Run summary:\n{summary}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::Parser;
    use evfeat::settings::Directive;

    fn opt(args: &[&str]) -> CommonOpt {
        CommonOpt::try_parse_from(std::iter::once("evfeat").chain(args.iter().copied())).unwrap()
    }

    fn config() -> RunConfig {
        let yaml = r#"
beams:
  ecm: 7000
outdir: from_config
compression: bzip2
seed: 11
generator: hepmc
non_diffractive_input: nd.hepmc
diffractive_input: diff.hepmc
directives:
  - "Random:seed = 5"
  - "PhaseSpace:pTHatMin = 10"
"#;
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn config_without_options() {
        let _ = env_logger::builder().is_test(true).try_init();
        let setup = Setup::new(opt(&[]), config(), 10).unwrap();
        assert_eq!(setup.plan.nevents, 10);
        assert_eq!(setup.plan.beams.ecm, 7000.);
        assert_eq!(setup.outdir, PathBuf::from("from_config"));
        assert_eq!(setup.compression, Some(Compression::Bzip2));
        assert_eq!(setup.seed, 11);
        assert_eq!(setup.generator, GeneratorKind::HepMC);
        assert_eq!(setup.non_diffractive_input, Some(PathBuf::from("nd.hepmc")));
        assert_eq!(setup.plan.directives.len(), 2);
    }

    #[test]
    fn options_override_config() {
        let _ = env_logger::builder().is_test(true).try_init();
        let opt = opt(&[
            "--ecm",
            "900",
            "-o",
            "from_cli",
            "--compression",
            "zstd_3",
            "--seed",
            "4",
            "--generator",
            "toy",
            "--diffractive-input",
            "other.hepmc",
            "--set",
            "Random:seed = 6",
            "--set",
            "SoftQCD:doubleDiffractive = off",
        ]);
        let setup = Setup::new(opt, config(), 10).unwrap();
        assert_eq!(setup.plan.beams.ecm, 900.);
        assert_eq!(setup.outdir, PathBuf::from("from_cli"));
        assert_eq!(setup.compression, Some(Compression::Zstd(3)));
        assert_eq!(setup.seed, 4);
        assert_eq!(setup.generator, GeneratorKind::Toy);
        assert_eq!(setup.non_diffractive_input, Some(PathBuf::from("nd.hepmc")));
        assert_eq!(setup.diffractive_input, Some(PathBuf::from("other.hepmc")));

        // command line directives come last and win
        let expected: Vec<Directive> = [
            "Random:seed = 5",
            "PhaseSpace:pTHatMin = 10",
            "Random:seed = 6",
            "SoftQCD:doubleDiffractive = off",
        ]
        .iter()
        .map(|d| d.parse().unwrap())
        .collect();
        assert_eq!(setup.plan.directives, expected);
        let settings = setup.plan.settings(EventClass::Diffractive);
        assert_eq!(settings.get_u64("Random:seed").unwrap(), Some(6));
    }

    #[test]
    fn defaults() {
        let _ = env_logger::builder().is_test(true).try_init();
        let setup = Setup::new(opt(&[]), RunConfig::default(), 0).unwrap();
        assert_eq!(setup.plan.beams.ecm, 13000.);
        assert_eq!(setup.outdir, PathBuf::from("."));
        assert_eq!(setup.compression, None);
        assert_eq!(setup.seed, 0);
        assert_eq!(setup.generator, GeneratorKind::Toy);
        assert!(setup.plan.directives.is_empty());
    }

    #[test]
    fn invalid_energy() {
        let _ = env_logger::builder().is_test(true).try_init();
        assert!(Setup::new(opt(&["--ecm=-1"]), RunConfig::default(), 1).is_err());
    }
}
