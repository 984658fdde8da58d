use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use audec::auto_decompress;
use log::{debug, info, trace};
use nom::{
    bytes::complete::take_while1,
    character::complete::{i32, space1},
    number::complete::double,
    sequence::preceded,
    IResult,
};
use particle_id::ParticleID;
use thiserror::Error;

use crate::{
    class::EventClass,
    event::{Event, EventBuilder},
    generator::{Generated, Generator, Statistics},
    particle::{Particle, Status},
    settings::Settings,
};

const HEPMC_FINAL: i32 = 1;
const HEPMC_BEAM: i32 = 4;
const REPLAY_PROCESS: &str = "replayed";

/// Replay events from (potentially compressed) HepMC2 event files
///
/// Each event class is read from its own file, typically written by a
/// full event generator configured for the corresponding processes.
/// Generator directives cannot be applied to pre-generated events and
/// are ignored.
///
/// Malformed event records and attempts beyond the end of a file count
/// as failed events.
#[derive(Default)]
pub struct HepMCGenerator {
    inputs: BTreeMap<EventClass, PathBuf>,
    source: Option<Source>,
    stats: Statistics,
}

impl HepMCGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read events of the given class from `path`
    pub fn with_input(mut self, class: EventClass, path: impl Into<PathBuf>) -> Self {
        self.inputs.insert(class, path.into());
        self
    }
}

impl Generator for HepMCGenerator {
    type Error = HepMCError;

    fn init(&mut self, class: EventClass, settings: &Settings) -> Result<(), Self::Error> {
        self.source = None;
        let path = self.inputs.get(&class).ok_or(HepMCError::NoInput(class))?;
        info!("Replaying {class} events from {path:?}");
        for directive in settings.directives() {
            debug!("Ignoring generator directive `{directive}`");
        }
        self.source = Some(Source::open(path)?);
        self.stats.start(class);
        Ok(())
    }

    fn next_event(&mut self) -> Result<Generated, Self::Error> {
        let (Some(source), Some(stats)) = (self.source.as_mut(), self.stats.current_mut()) else {
            return Err(HepMCError::NotInitialised);
        };
        let Some(record) = source.read_record()? else {
            if !source.exhausted {
                stats.record_warning(format!("No more events in {:?}", source.path));
                source.exhausted = true;
            }
            stats.record_failed();
            return Ok(Generated::Failed);
        };
        let event = String::from_utf8(record)
            .map_err(HepMCError::from)
            .and_then(|record| parse_record(&record));
        match event {
            Ok(event) => {
                stats.record_accepted(REPLAY_PROCESS);
                Ok(Generated::Event(event))
            }
            Err(err) => {
                debug!("Skipping event record: {err}");
                stats.record_warning(format!("Skipped event record in {:?}: {err}", source.path));
                stats.record_failed();
                Ok(Generated::Failed)
            }
        }
    }

    fn statistics(&self) -> Statistics {
        self.stats.clone()
    }
}

struct Source {
    path: PathBuf,
    reader: Box<dyn BufRead>,
    // first line of the next record
    pending: Option<Vec<u8>>,
    exhausted: bool,
}

impl Source {
    fn open(path: &Path) -> Result<Self, HepMCError> {
        let file = File::open(path).map_err(|source| HepMCError::Open {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self {
            path: path.to_owned(),
            reader: auto_decompress(BufReader::new(file)),
            pending: None,
            exhausted: false,
        })
    }

    // raw bytes, the encoding is checked per record
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, std::io::Error> {
        let mut line = Vec::new();
        if self.reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Read the next event record, starting with an `E` line
    fn read_record(&mut self) -> Result<Option<Vec<u8>>, std::io::Error> {
        let mut record = match self.pending.take() {
            Some(line) => line,
            None => loop {
                match self.read_line()? {
                    Some(line) if line.starts_with(b"E") => break line,
                    Some(_) => {}
                    None => return Ok(None),
                }
            },
        };
        while let Some(line) = self.read_line()? {
            if line.starts_with(b"E") {
                self.pending = Some(line);
                break;
            }
            if line.starts_with(b"HepMC::") {
                break;
            }
            record.push(b'\n');
            record.extend_from_slice(&line);
        }
        trace!("Read HepMC record:\n{}", String::from_utf8_lossy(&record));
        Ok(Some(record))
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
enum EnergyUnit {
    MeV,
    #[default]
    GeV,
}

/// Parse a HepMC2 event record
fn parse_record(record: &str) -> Result<Event, HepMCError> {
    if !record.starts_with('E') {
        return Err(HepMCError::BadRecordStart(record.to_owned()));
    }
    let mut energy_unit = EnergyUnit::GeV;
    let mut particles = Vec::new();
    for line in record.lines().skip(1) {
        match line.as_bytes().first() {
            Some(b'V') | Some(b'F') | Some(b'H') | Some(b'C') | Some(b'N') => {}
            Some(b'P') => particles.push(parse_particle_line(line)?),
            Some(b'U') => energy_unit = parse_units_line(line)?,
            _ => {
                if !line.trim().is_empty() {
                    return Err(HepMCError::BadEntry(line.to_owned()));
                }
            }
        }
    }
    let scale = match energy_unit {
        EnergyUnit::GeV => 1.,
        EnergyUnit::MeV => 1e-3,
    };
    let mut event = EventBuilder::with_capacity(particles.len());
    for (id, status, p) in particles {
        let p = p.map(|p| scale * p);
        event.add(Particle::new(id, status, p.into()));
    }
    Ok(event.build())
}

fn parse_units_line(line: &str) -> Result<EnergyUnit, HepMCError> {
    debug_assert!(line.starts_with('U'));
    let (_, energy) = any_entry(&line[1..])?;
    match energy {
        "GEV" => Ok(EnergyUnit::GeV),
        "MEV" => Ok(EnergyUnit::MeV),
        _ => Err(HepMCError::InvalidEnergyUnit(energy.to_owned())),
    }
}

fn parse_particle_line(line: &str) -> Result<(ParticleID, Status, [f64; 4]), HepMCError> {
    debug_assert!(line.starts_with('P'));
    let (rest, _barcode) = any_entry(&line[1..])?;
    let (rest, id) = i32_entry(rest)?;
    let (rest, px) = double_entry(rest)?;
    let (rest, py) = double_entry(rest)?;
    let (rest, pz) = double_entry(rest)?;
    let (rest, e) = double_entry(rest)?;
    let (rest, _m) = any_entry(rest)?;
    let (_, status) = i32_entry(rest)?;
    let status = match status {
        HEPMC_FINAL => Status::Final,
        HEPMC_BEAM => Status::Beam,
        _ => Status::Intermediate,
    };
    Ok((ParticleID::new(id), status, [e, px, py, pz]))
}

/// Error reading HepMC event records
#[derive(Debug, Error)]
pub enum HepMCError {
    #[error("No input file for {0} events")]
    NoInput(EventClass),
    #[error("Failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Error parsing line in event record: {0}")]
    ParseError(String),
    #[error("Record does not start with 'E': {0}")]
    BadRecordStart(String),
    #[error("Line does not correspond to a known entry type: {0}")]
    BadEntry(String),
    #[error("Invalid energy unit: {0}")]
    InvalidEnergyUnit(String),
    #[error("Event record is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("Generator used before initialisation")]
    NotInitialised,
}

impl From<nom::Err<nom::error::Error<&str>>> for HepMCError {
    fn from(source: nom::Err<nom::error::Error<&str>>) -> Self {
        Self::ParseError(source.to_string())
    }
}

fn double_entry(line: &str) -> IResult<&str, f64> {
    preceded(space1, double)(line)
}

fn any_entry(line: &str) -> IResult<&str, &str> {
    preceded(space1, non_space)(line)
}

fn i32_entry(line: &str) -> IResult<&str, i32> {
    preceded(space1, i32)(line)
}

fn non_space(line: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_ascii_whitespace())(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    const RECORDS: &str = "
HepMC::Version 2.06.09
HepMC::IO_GenEvent-START_EVENT_LISTING
E 0 -1 -1.0 -1.0 -1.0 101 -1 3 1 2 0 1 1.0
N 1 \"0\"
U GEV MM
C 1.0 0.1
V -1 0 0 0 0 0 1 2 0
P 1 2212 0 0 6500 6500 0.938 4 0 0 -1 0
P 3 211 0.3 0.4 1.0 1.2 0.1396 1 0 0 0 0
P 4 22 -1.0 0.0 0.0 1.0 0 1 0 0 0 0
P 5 21 1 1 1 2 0 2 0 0 0 0
E 1 -1 -1.0 -1.0 -1.0 101 -1 3 1 2 0 1 1.0
U MEV MM
P 1 2212 0 0 6500000 6500000 938 4 0 0 -1 0
P 2 -211 300 400 1000 1200 139.6 1 0 0 0 0
E 2 -1 -1.0 -1.0 -1.0 101 -1 3 1 2 0 1 1.0
X this is not a valid line
HepMC::IO_GenEvent-END_EVENT_LISTING
";

    fn log_init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn write_input() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(RECORDS.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn particle_line() {
        let (id, status, p) =
            parse_particle_line("P 3 -211 0.3 0.4 1.0 1.2 0.1396 1 0 0 0 0").unwrap();
        assert_eq!(id, ParticleID::new(-211));
        assert_eq!(status, Status::Final);
        assert_eq!(p, [1.2, 0.3, 0.4, 1.0]);
        assert!(parse_particle_line("P 3 -211 0.3").is_err());
    }

    #[test]
    fn replay() {
        log_init();
        let input = write_input();
        let class = EventClass::Diffractive;
        let mut generator = HepMCGenerator::new().with_input(class, input.path());
        generator.init(class, &Settings::new().with("SoftQCD:all", "on")).unwrap();

        let Generated::Event(first) = generator.next_event().unwrap() else {
            panic!("first event failed")
        };
        assert_eq!(first.len(), 4);
        assert_eq!(first.final_state().count(), 2);
        let pion = first.final_state().next().unwrap();
        assert_eq!(pion.id(), ParticleID::new(211));
        assert!(pion.is_charged());
        assert!((pion.p().pt() - 0.5).abs() < 1e-12);

        // MeV are converted to GeV
        let Generated::Event(second) = generator.next_event().unwrap() else {
            panic!("second event failed")
        };
        let pion = second.final_state().next().unwrap();
        assert!((pion.p().e() - 1.2).abs() < 1e-12);

        // malformed record
        assert_eq!(generator.next_event().unwrap(), Generated::Failed);
        // end of file
        assert_eq!(generator.next_event().unwrap(), Generated::Failed);
        assert_eq!(generator.next_event().unwrap(), Generated::Failed);

        let stats = generator.statistics();
        let phase = &stats.phases()[0].1;
        assert_eq!(phase.attempted, 5);
        assert_eq!(phase.total_accepted(), 2);
        assert_eq!(phase.failed, 3);
        // one warning for the bad record, one for the end of the file
        assert_eq!(phase.warnings.len(), 2);
        assert!(phase.warnings[0].starts_with("Skipped event record"));
        assert!(phase.warnings[1].starts_with("No more events"));
    }

    #[test]
    fn invalid_utf8_record_is_skipped() {
        log_init();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"E 0 -1 -1.0 -1.0 -1.0 101 -1 3 1 2 0 1 1.0\nP 3 211 0.3 0.4 1.0 1.2 0.1396 1 0 0 0 0\n")
            .unwrap();
        file.write_all(b"E 1 -1 -1.0 -1.0 -1.0 101 -1 3 1 2 0 1 1.0\nN 1 \"\xff\xfe\"\n")
            .unwrap();
        file.write_all(b"E 2 -1 -1.0 -1.0 -1.0 101 -1 3 1 2 0 1 1.0\r\nP 3 22 -1.0 0.0 0.0 1.0 0 1 0 0 0 0\r\n")
            .unwrap();
        file.flush().unwrap();

        let class = EventClass::NonDiffractive;
        let mut generator = HepMCGenerator::new().with_input(class, file.path());
        generator.init(class, &Settings::new()).unwrap();
        assert!(matches!(generator.next_event().unwrap(), Generated::Event(_)));
        assert_eq!(generator.next_event().unwrap(), Generated::Failed);
        let Generated::Event(last) = generator.next_event().unwrap() else {
            panic!("record after the invalid one failed")
        };
        assert_eq!(last.final_state().next().unwrap().id(), ParticleID::new(22));

        let stats = generator.statistics();
        let phase = stats.current(class).unwrap();
        assert_eq!(phase.failed, 1);
        assert!(phase.warnings[0].contains("UTF-8"));
    }

    #[test]
    fn missing_input() {
        let mut generator =
            HepMCGenerator::new().with_input(EventClass::NonDiffractive, "/does/not/exist.hepmc");
        assert!(matches!(
            generator.init(EventClass::Diffractive, &Settings::new()),
            Err(HepMCError::NoInput(EventClass::Diffractive))
        ));
        assert!(matches!(
            generator.init(EventClass::NonDiffractive, &Settings::new()),
            Err(HepMCError::Open { .. })
        ));
        assert!(matches!(generator.next_event(), Err(HepMCError::NotInitialised)));
    }
}
