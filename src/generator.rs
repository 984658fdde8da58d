use std::collections::BTreeMap;
use std::fmt::{self, Display};

use crate::class::EventClass;
use crate::event::Event;
use crate::settings::Settings;

/// Outcome of a single generation attempt
#[derive(Clone, Debug, PartialEq)]
pub enum Generated {
    /// A successfully generated event
    Event(Event),
    /// The attempt failed and the event should be skipped
    Failed,
}

/// Interface to an event generator
///
/// Errors returned from any of the methods are fatal. Recoverable
/// failures of single events are reported as [Generated::Failed].
/// Warnings arising while generating events should be recorded with
/// [PhaseStatistics::record_warning] instead of being logged, since
/// logging is suspended while the event loop shows its progress.
pub trait Generator {
    type Error: std::error::Error + Send + Sync + 'static;

    /// (Re-)initialise the generator for events of the given class
    ///
    /// Any configuration from a previous initialisation is discarded.
    fn init(&mut self, class: EventClass, settings: &Settings) -> Result<(), Self::Error>;

    /// Try to generate the next event
    fn next_event(&mut self) -> Result<Generated, Self::Error>;

    /// Summary of all events generated so far
    fn statistics(&self) -> Statistics;
}

impl<G: Generator + ?Sized> Generator for &mut G {
    type Error = G::Error;

    fn init(&mut self, class: EventClass, settings: &Settings) -> Result<(), Self::Error> {
        (**self).init(class, settings)
    }

    fn next_event(&mut self) -> Result<Generated, Self::Error> {
        (**self).next_event()
    }

    fn statistics(&self) -> Statistics {
        (**self).statistics()
    }
}

/// Generator statistics for one initialisation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhaseStatistics {
    pub attempted: u64,
    pub failed: u64,
    /// Number of accepted events per subprocess
    pub accepted: BTreeMap<String, u64>,
    /// Warnings to be reported at the end of the phase
    pub warnings: Vec<String>,
}

impl PhaseStatistics {
    pub fn record_accepted(&mut self, process: &str) {
        self.attempted += 1;
        *self.accepted.entry(process.to_owned()).or_default() += 1;
    }

    pub fn record_failed(&mut self) {
        self.attempted += 1;
        self.failed += 1;
    }

    pub fn record_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn total_accepted(&self) -> u64 {
        self.accepted.values().sum()
    }
}

/// Generator statistics for all phases of a run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    phases: Vec<(EventClass, PhaseStatistics)>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start collecting statistics for a new phase
    pub fn start(&mut self, class: EventClass) {
        self.phases.push((class, PhaseStatistics::default()))
    }

    /// Statistics of the current phase, if any
    pub fn current_mut(&mut self) -> Option<&mut PhaseStatistics> {
        self.phases.last_mut().map(|(_, s)| s)
    }

    pub fn phases(&self) -> &[(EventClass, PhaseStatistics)] {
        self.phases.as_slice()
    }

    /// Statistics of the most recent phase, if it is for the given class
    pub fn current(&self, class: EventClass) -> Option<&PhaseStatistics> {
        match self.phases.last() {
            Some((c, stats)) if *c == class => Some(stats),
            _ => None,
        }
    }
}

impl Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const RULE: &str =
            "*--------------------------------------------------------------*";
        writeln!(f, "{RULE}")?;
        writeln!(f, "| {:<30} {:>9} {:>9} {:>9} |", "subprocess", "tried", "accepted", "failed")?;
        writeln!(f, "{RULE}")?;
        for (class, stats) in &self.phases {
            writeln!(
                f,
                "| {:<30} {:>9} {:>9} {:>9} |",
                class.to_string(),
                stats.attempted,
                stats.total_accepted(),
                stats.failed
            )?;
            for (process, accepted) in &stats.accepted {
                writeln!(f, "|   {:<28} {:>9} {:>9} {:>9} |", process, "", accepted, "")?;
            }
        }
        write!(f, "{RULE}")
    }
}
