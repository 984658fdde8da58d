use std::fmt::{self, Display};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use log::{debug, info, warn};
use thiserror::Error;

use crate::class::EventClass;
use crate::compression::{CompressedWriter, Compression};
use crate::generator::{Generated, Generator, Statistics};
use crate::progress_bar::{Progress, ProgressBar};
use crate::settings::{BeamSetup, Directive, Settings};
use crate::traits::{CsvRecord, Extract};
use crate::writer::{CsvWriter, OutputFile, WriteError};

/// Stage of a run
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Stage {
    NonDiffractive,
    Diffractive,
    Done,
}

impl Stage {
    /// The class of events generated in this stage
    pub fn class(self) -> Option<EventClass> {
        match self {
            Stage::NonDiffractive => Some(EventClass::NonDiffractive),
            Stage::Diffractive => Some(EventClass::Diffractive),
            Stage::Done => None,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Stage::NonDiffractive => Stage::Diffractive,
            Stage::Diffractive | Stage::Done => Stage::Done,
        }
    }
}

/// What to generate
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunPlan {
    /// Number of generation attempts per class
    pub nevents: u64,
    pub beams: BeamSetup,
    /// Additional generator directives for all classes
    pub directives: Vec<Directive>,
}

impl RunPlan {
    /// Fresh generator settings for the given class
    pub fn settings(&self, class: EventClass) -> Settings {
        Settings::for_class(&self.beams, class, &self.directives)
    }
}

/// One output per event class
pub struct Outputs<W: Write, R> {
    non_diffractive: CsvWriter<W, R>,
    diffractive: CsvWriter<W, R>,
}

impl<R: CsvRecord> Outputs<CompressedWriter<File>, R> {
    /// Create the default output files in `outdir`
    ///
    /// Both files are created up front with their headers.
    pub fn create(outdir: &Path, compression: Option<Compression>) -> Result<Self, WriteError> {
        let create = |class| OutputFile::for_class::<R>(outdir, class, compression).create::<R>();
        Ok(Self::new(
            create(EventClass::NonDiffractive)?,
            create(EventClass::Diffractive)?,
        ))
    }
}

impl<W: Write, R: CsvRecord> Outputs<W, R> {
    pub fn new(non_diffractive: CsvWriter<W, R>, diffractive: CsvWriter<W, R>) -> Self {
        Self {
            non_diffractive,
            diffractive,
        }
    }

    pub fn get_mut(&mut self, class: EventClass) -> &mut CsvWriter<W, R> {
        match class {
            EventClass::NonDiffractive => &mut self.non_diffractive,
            EventClass::Diffractive => &mut self.diffractive,
        }
    }

    /// Flush all outputs and return the writers, ordered by class label
    pub fn finish(self) -> Result<[W; 2], WriteError> {
        Ok([self.non_diffractive.finish()?, self.diffractive.finish()?])
    }
}

/// Counts for a single class
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseSummary {
    pub class: EventClass,
    pub attempted: u64,
    pub generated: u64,
    pub failed: u64,
    pub rows: u64,
    pub degenerate: u64,
    /// Warnings reported by the generator during this phase
    pub warnings: Vec<String>,
}

impl PhaseSummary {
    fn new(class: EventClass) -> Self {
        Self {
            class,
            attempted: 0,
            generated: 0,
            failed: 0,
            rows: 0,
            degenerate: 0,
            warnings: Vec::new(),
        }
    }
}

/// Summary of a complete run
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub phases: Vec<PhaseSummary>,
    /// Statistics reported by the generator
    pub statistics: Statistics,
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.statistics)?;
        for phase in &self.phases {
            writeln!(
                f,
                "{}: {} attempted, {} generated, {} failed, {} rows written, {} degenerate",
                phase.class,
                phase.attempted,
                phase.generated,
                phase.failed,
                phase.rows,
                phase.degenerate
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum RunError<E: std::error::Error + 'static> {
    #[error("Failed to initialise generator for {class} events")]
    Init {
        class: EventClass,
        #[source]
        source: E,
    },
    #[error("Failed to generate {class} event {index}")]
    Generate {
        class: EventClass,
        index: u64,
        #[source]
        source: E,
    },
    #[error("Failed to write output")]
    Write(#[from] WriteError),
}

/// Generate events of all classes and write the extracted rows
///
/// Runs through the stages non-diffractive, diffractive, done. The
/// generator is initialised from scratch for each class.
pub struct Driver<G, X: Extract, W: Write> {
    generator: G,
    extractor: X,
    plan: RunPlan,
    outputs: Outputs<W, X::Row>,
}

impl<G, X, W> Driver<G, X, W>
where
    G: Generator,
    X: Extract,
    W: Write,
{
    pub fn new(generator: G, extractor: X, plan: RunPlan, outputs: Outputs<W, X::Row>) -> Self {
        Self {
            generator,
            extractor,
            plan,
            outputs,
        }
    }

    /// Run all stages and return the summary together with the finished outputs
    pub fn run(mut self) -> Result<(RunSummary, [W; 2]), RunError<G::Error>> {
        let mut phases = Vec::new();
        let mut stage = Stage::NonDiffractive;
        while let Some(class) = stage.class() {
            phases.push(self.run_phase(class)?);
            stage = stage.next();
        }
        debug!("Reached stage {stage:?}");
        let outputs = self.outputs.finish()?;
        let summary = RunSummary {
            phases,
            statistics: self.generator.statistics(),
        };
        Ok((summary, outputs))
    }

    fn run_phase(&mut self, class: EventClass) -> Result<PhaseSummary, RunError<G::Error>> {
        let settings = self.plan.settings(class);
        debug!("Generator settings for {class} events:");
        for directive in settings.directives() {
            debug!("  {directive}");
        }
        self.generator
            .init(class, &settings)
            .map_err(|source| RunError::Init { class, source })?;

        let nevents = self.plan.nevents;
        info!("Generating {nevents} {class} events");
        let mut summary = PhaseSummary::new(class);
        let output = self.outputs.get_mut(class);
        let progress = ProgressBar::new(nevents, &format!("{class} events:"));
        for index in 0..nevents {
            summary.attempted += 1;
            let generated = self
                .generator
                .next_event()
                .map_err(|source| RunError::Generate { class, index, source });
            let generated = match generated {
                Ok(generated) => generated,
                Err(err) => {
                    progress.finish();
                    report_warnings(&self.generator, class);
                    return Err(err);
                }
            };
            match generated {
                Generated::Event(event) => {
                    summary.generated += 1;
                    let extracted = self.extractor.extract(index, class, &event);
                    summary.degenerate += extracted.degenerate;
                    for row in &extracted.rows {
                        output.write(row)?;
                    }
                    summary.rows += extracted.rows.len() as u64;
                }
                Generated::Failed => {
                    debug!("Failed to generate {class} event {index}, skipping");
                    summary.failed += 1;
                }
            }
            progress.inc(1);
        }
        progress.finish();
        summary.warnings = report_warnings(&self.generator, class);

        info!(
            "Wrote {} rows from {} {class} events",
            summary.rows, summary.generated
        );
        if summary.failed > 0 {
            info!("Skipped {} failed {class} events", summary.failed);
        }
        if summary.degenerate > 0 {
            warn!(
                "Encountered {} undefined quantities in {class} events",
                summary.degenerate
            );
        }
        Ok(summary)
    }
}

// only called once logging is enabled again
fn report_warnings<G: Generator>(generator: &G, class: EventClass) -> Vec<String> {
    let statistics = generator.statistics();
    let warnings = statistics
        .current(class)
        .map(|phase| phase.warnings.clone())
        .unwrap_or_default();
    for warning in &warnings {
        warn!("{warning}");
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;
    use std::io::Read;

    use crate::event::{Event, EventBuilder};
    use crate::features::{DegeneratePolicy, EventFeatures, EventRow, ParticleFeatures, ParticleRow};
    use crate::noise::{NoiseModel, Resolution};
    use crate::particle::{Particle, Status};
    use crate::toy::{ToyGenerator, ToyOptionsBuilder};

    use particle_id::ParticleID;

    fn log_init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Generates the same event over and over, failing every `fail_every`th attempt
    #[derive(Default)]
    struct StubGenerator {
        event: Event,
        fail_every: Option<u64>,
        attempt: u64,
        inits: Vec<(EventClass, Settings)>,
        stats: Statistics,
    }

    impl StubGenerator {
        fn new(particles: &[Particle]) -> Self {
            let mut event = EventBuilder::new();
            for p in particles {
                event.add(*p);
            }
            Self {
                event: event.build(),
                ..Default::default()
            }
        }
    }

    impl Generator for StubGenerator {
        type Error = Infallible;

        fn init(&mut self, class: EventClass, settings: &Settings) -> Result<(), Self::Error> {
            self.inits.push((class, settings.clone()));
            self.attempt = 0;
            self.stats.start(class);
            Ok(())
        }

        fn next_event(&mut self) -> Result<Generated, Self::Error> {
            self.attempt += 1;
            let stats = self.stats.current_mut().unwrap();
            if let Some(n) = self.fail_every {
                if self.attempt % n == 0 {
                    stats.record_failed();
                    return Ok(Generated::Failed);
                }
            }
            stats.record_accepted("stub");
            Ok(Generated::Event(self.event.clone()))
        }

        fn statistics(&self) -> Statistics {
            self.stats.clone()
        }
    }

    fn pion() -> Particle {
        Particle::new(ParticleID::new(211), Status::Final, [1.2, 0.3, 0.4, 1.0].into())
    }

    fn photon() -> Particle {
        Particle::new(ParticleID::new(22), Status::Final, [0.7, 0.1, -0.5, 0.3].into())
    }

    fn beam() -> Particle {
        Particle::new(ParticleID::new(2212), Status::Beam, [6500., 0., 0., 6500.].into())
    }

    fn memory_outputs<R: CsvRecord>() -> Outputs<Vec<u8>, R> {
        Outputs::new(
            CsvWriter::new(Vec::new()).unwrap(),
            CsvWriter::new(Vec::new()).unwrap(),
        )
    }

    fn plan(nevents: u64) -> RunPlan {
        RunPlan {
            nevents,
            ..Default::default()
        }
    }

    fn lines(out: &[u8]) -> Vec<String> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(|l| l.to_owned())
            .collect()
    }

    #[test]
    fn stages() {
        assert_eq!(Stage::NonDiffractive.next(), Stage::Diffractive);
        assert_eq!(Stage::Diffractive.next(), Stage::Done);
        assert_eq!(Stage::Done.next(), Stage::Done);
        assert_eq!(Stage::Done.class(), None);
    }

    #[test]
    fn event_level() {
        log_init();
        let mut generator = StubGenerator::new(&[beam(), pion()]);
        let features = EventFeatures::new(NoiseModel::seeded(0), Resolution::default(), DegeneratePolicy::Keep);
        let driver = Driver::new(&mut generator, features, plan(10), memory_outputs());
        let (summary, [nd, diff]) = driver.run().unwrap();

        let nd = lines(&nd);
        let diff = lines(&diff);
        assert_eq!(nd.len(), 11);
        assert_eq!(diff.len(), 11);
        assert_eq!(nd[0], EventRow::HEADER.join(","));
        assert_eq!(diff[0], EventRow::HEADER.join(","));
        assert!(nd[1..].iter().all(|l| l.starts_with("0,1,1,")));
        assert!(diff[1..].iter().all(|l| l.starts_with("1,1,1,")));

        assert_eq!(summary.phases.len(), 2);
        for phase in &summary.phases {
            assert_eq!(phase.attempted, 10);
            assert_eq!(phase.generated, 10);
            assert_eq!(phase.rows, 10);
            assert_eq!(phase.failed, 0);
        }
        assert_eq!(summary.statistics.phases().len(), 2);

        // settings are rebuilt for each class
        let [(nd_class, nd_settings), (diff_class, diff_settings)] = generator.inits.as_slice() else {
            panic!("expected two initialisations")
        };
        assert_eq!(*nd_class, EventClass::NonDiffractive);
        assert_eq!(*diff_class, EventClass::Diffractive);
        assert_eq!(nd_settings.get_flag("HardQCD:all"), Ok(Some(true)));
        assert_eq!(nd_settings.get("SoftQCD:singleDiffractive"), None);
        assert_eq!(diff_settings.get_flag("HardQCD:all"), Ok(Some(false)));
        assert_eq!(diff_settings.get_flag("SoftQCD:centralDiffractive"), Ok(Some(true)));
    }

    #[test]
    fn particle_level() {
        log_init();
        let generator = StubGenerator::new(&[beam(), pion(), photon()]);
        let driver = Driver::new(generator, ParticleFeatures::default(), plan(10), memory_outputs());
        let (summary, [nd, diff]) = driver.run().unwrap();

        let nd = lines(&nd);
        let diff = lines(&diff);
        assert_eq!(nd.len(), 1 + 20);
        assert_eq!(diff.len(), 1 + 20);
        assert_eq!(nd[0], ParticleRow::HEADER.join(","));
        assert!(nd[1].starts_with("0,211,1,"));
        assert!(nd[2].starts_with("0,22,0,"));
        assert!(nd[20].starts_with("9,22,0,"));
        assert!(nd[1..].iter().all(|l| l.ends_with(",0")));
        assert!(diff[1..].iter().all(|l| l.ends_with(",1")));
        assert_eq!(summary.phases[1].rows, 20);
    }

    #[test]
    fn failures_are_skipped() {
        log_init();
        let mut generator = StubGenerator::new(&[pion(), photon()]);
        generator.fail_every = Some(3);
        let driver = Driver::new(generator, ParticleFeatures::default(), plan(10), memory_outputs());
        let (summary, [nd, _]) = driver.run().unwrap();

        for phase in &summary.phases {
            assert_eq!(phase.attempted, 10);
            assert_eq!(phase.failed, 3);
            assert_eq!(phase.generated, 7);
            assert_eq!(phase.rows, 14);
        }
        // event indices count attempts
        let nd = lines(&nd);
        let indices: Vec<_> = nd[1..]
            .iter()
            .map(|l| l.split(',').next().unwrap().to_owned())
            .collect();
        assert!(!indices.contains(&"2".to_owned()));
        assert!(indices.contains(&"3".to_owned()));
    }

    #[test]
    fn empty_run() {
        log_init();
        let generator = StubGenerator::new(&[pion()]);
        let features = EventFeatures::new(NoiseModel::seeded(0), Resolution::default(), DegeneratePolicy::Keep);
        let driver = Driver::new(generator, features, plan(0), memory_outputs());
        let (summary, [nd, diff]) = driver.run().unwrap();
        assert_eq!(lines(&nd).len(), 1);
        assert_eq!(lines(&diff).len(), 1);
        assert!(summary.phases.iter().all(|p| p.attempted == 0));
    }

    #[test]
    fn empty_events() {
        log_init();
        let features = |policy| EventFeatures::new(NoiseModel::seeded(0), Resolution::default(), policy);

        let driver = Driver::new(StubGenerator::new(&[beam()]), features(DegeneratePolicy::Skip), plan(5), memory_outputs());
        let (summary, [nd, _]) = driver.run().unwrap();
        assert_eq!(lines(&nd).len(), 1);
        assert_eq!(summary.phases[0].degenerate, 5);
        assert_eq!(summary.phases[0].generated, 5);
        assert_eq!(summary.phases[0].rows, 0);

        let driver = Driver::new(StubGenerator::new(&[beam()]), features(DegeneratePolicy::Zero), plan(5), memory_outputs());
        let (_, [nd, _]) = driver.run().unwrap();
        let nd = lines(&nd);
        assert_eq!(nd.len(), 6);
        assert_eq!(nd[1], "0,0,0,0.0,0.0,0.0,0.0,0.0,0.0,0.0");
    }

    #[test]
    fn toy_run_to_files() {
        log_init();
        let dir = tempfile::tempdir().unwrap();
        let options = ToyOptionsBuilder::default()
            .seed(3)
            .failure_rate(0.2)
            .build()
            .unwrap();
        let outputs = Outputs::<CompressedWriter<File>, ParticleRow>::create(
            dir.path(),
            Some(Compression::Gzip(6)),
        ).unwrap();
        let mut plan = plan(20);
        plan.directives.push("Random:seed = 17".parse().unwrap());
        let driver = Driver::new(
            ToyGenerator::new(options),
            ParticleFeatures::default(),
            plan,
            outputs,
        );
        let (summary, outputs) = driver.run().unwrap();
        for output in outputs {
            output.finish().unwrap();
        }

        for (phase, name) in summary
            .phases
            .iter()
            .zip(["non_diffractive_particles.csv.gz", "diffractive_particles.csv.gz"])
        {
            assert_eq!(phase.attempted, 20);
            assert_eq!(phase.generated + phase.failed, 20);
            let mut content = String::new();
            flate2::read::GzDecoder::new(std::fs::File::open(dir.path().join(name)).unwrap())
                .read_to_string(&mut content)
                .unwrap();
            assert_eq!(content.lines().count() as u64, 1 + phase.rows);
        }
        assert!(summary.to_string().contains("diffractive"));
    }

    #[test]
    fn generator_warnings_in_summary() {
        use crate::hepmc2::HepMCGenerator;

        log_init();
        let mut input = tempfile::NamedTempFile::new().unwrap();
        writeln!(input, "E 0 -1 -1.0 -1.0 -1.0 101 -1 3 1 2 0 1 1.0").unwrap();
        writeln!(input, "P 3 211 0.3 0.4 1.0 1.2 0.1396 1 0 0 0 0").unwrap();
        input.flush().unwrap();
        let generator = HepMCGenerator::new()
            .with_input(EventClass::NonDiffractive, input.path())
            .with_input(EventClass::Diffractive, input.path());
        let driver = Driver::new(generator, ParticleFeatures::default(), plan(3), memory_outputs());
        let (summary, _) = driver.run().unwrap();

        for phase in &summary.phases {
            assert_eq!(phase.generated, 1);
            assert_eq!(phase.failed, 2);
            // reported once per exhausted file
            assert_eq!(phase.warnings.len(), 1);
            assert!(phase.warnings[0].starts_with("No more events"));
        }
    }

    #[test]
    fn init_failure_is_fatal() {
        log_init();
        let mut plan = plan(5);
        plan.directives.push("Beams:eCM = 1.".parse().unwrap());
        let driver = Driver::new(
            ToyGenerator::default(),
            ParticleFeatures::default(),
            plan,
            memory_outputs(),
        );
        let err = driver.run().unwrap_err();
        assert!(matches!(
            err,
            RunError::Init {
                class: EventClass::NonDiffractive,
                ..
            }
        ));
    }
}
