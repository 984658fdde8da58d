use rand::Rng;
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::class::EventClass;
use crate::event::Event;
use crate::four_vector::FourVector;
use crate::noise::{NoiseModel, Resolution};
use crate::particle::Particle;
use crate::traits::{CsvRecord, Extract, Extraction};

/// What to do with quantities that are mathematically undefined
///
/// This applies to the averages over events without final-state
/// particles and to the rapidity of particles with E = |pz|.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Display,
    EnumString,
    Eq,
    PartialEq,
    Hash,
    Deserialize,
    Serialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    /// Write the value as computed, e.g. `NaN` or `inf`
    #[default]
    Keep,
    /// Don't write the affected row
    Skip,
    /// Replace undefined values by zero
    Zero,
}

/// Measured kinematic quantities of a single particle
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Kinematics {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub energy: f64,
}

impl From<&FourVector> for Kinematics {
    fn from(p: &FourVector) -> Self {
        Self {
            pt: p.pt(),
            eta: p.eta(),
            phi: p.phi(),
            energy: p.e(),
        }
    }
}

/// Running sum and sum of squares
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Moments {
    n: u64,
    sum: f64,
    sum_sq: f64,
}

impl Moments {
    pub fn add(&mut self, x: f64) {
        self.n += 1;
        self.sum += x;
        self.sum_sq += x * x;
    }

    pub fn count(&self) -> u64 {
        self.n
    }

    /// The arithmetic mean, `NaN` without entries
    pub fn mean(&self) -> f64 {
        self.sum / self.n as f64
    }

    /// The population variance sum_sq/n - mean², `NaN` without entries
    pub fn variance(&self) -> f64 {
        let mean = self.mean();
        self.sum_sq / self.n as f64 - mean * mean
    }
}

/// One row per event
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct EventRow {
    #[serde(rename = "Class")]
    pub class: u8,
    #[serde(rename = "TotalMultiplicity")]
    pub total_multiplicity: u64,
    #[serde(rename = "ChargedMultiplicity")]
    pub charged_multiplicity: u64,
    #[serde(rename = "Mean_pT")]
    pub mean_pt: f64,
    #[serde(rename = "Var_pT")]
    pub var_pt: f64,
    #[serde(rename = "Mean_Eta")]
    pub mean_eta: f64,
    #[serde(rename = "Var_Eta")]
    pub var_eta: f64,
    #[serde(rename = "Mean_Phi")]
    pub mean_phi: f64,
    #[serde(rename = "Var_Phi")]
    pub var_phi: f64,
    #[serde(rename = "TotalEnergy")]
    pub total_energy: f64,
}

impl CsvRecord for EventRow {
    const KIND: &'static str = "events";
    const HEADER: &'static [&'static str] = &[
        "Class",
        "TotalMultiplicity",
        "ChargedMultiplicity",
        "Mean_pT",
        "Var_pT",
        "Mean_Eta",
        "Var_Eta",
        "Mean_Phi",
        "Var_Phi",
        "TotalEnergy",
    ];
}

/// One row per final-state particle
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ParticleRow {
    #[serde(rename = "Event")]
    pub event: u64,
    #[serde(rename = "ParticleID")]
    pub particle_id: i32,
    #[serde(rename = "Charged")]
    pub charged: u8,
    #[serde(rename = "pT")]
    pub pt: f64,
    #[serde(rename = "Eta")]
    pub eta: f64,
    #[serde(rename = "Phi")]
    pub phi: f64,
    #[serde(rename = "Rapidity")]
    pub rapidity: f64,
    #[serde(rename = "Energy")]
    pub energy: f64,
    #[serde(rename = "Class")]
    pub class: u8,
}

impl CsvRecord for ParticleRow {
    const KIND: &'static str = "particles";
    const HEADER: &'static [&'static str] = &[
        "Event",
        "ParticleID",
        "Charged",
        "pT",
        "Eta",
        "Phi",
        "Rapidity",
        "Energy",
        "Class",
    ];
}

/// Accumulates the event-level features of a single event
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct EventAggregator {
    charged: u64,
    pt: Moments,
    eta: Moments,
    phi: Moments,
    energy: f64,
}

impl EventAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, k: &Kinematics, charged: bool) {
        if charged {
            self.charged += 1;
        }
        self.pt.add(k.pt);
        self.eta.add(k.eta);
        self.phi.add(k.phi);
        self.energy += k.energy;
    }

    pub fn multiplicity(&self) -> u64 {
        self.pt.count()
    }

    /// The event row, or `None` if it has to be skipped
    ///
    /// Averages are undefined for events without particles; they are
    /// treated according to `policy`.
    pub fn finish(self, class: EventClass, policy: DegeneratePolicy) -> Option<EventRow> {
        let row = EventRow {
            class: class.label(),
            total_multiplicity: self.multiplicity(),
            charged_multiplicity: self.charged,
            mean_pt: self.pt.mean(),
            var_pt: self.pt.variance(),
            mean_eta: self.eta.mean(),
            var_eta: self.eta.variance(),
            mean_phi: self.phi.mean(),
            var_phi: self.phi.variance(),
            total_energy: self.energy,
        };
        if self.multiplicity() > 0 {
            return Some(row);
        }
        match policy {
            DegeneratePolicy::Keep => Some(row),
            DegeneratePolicy::Skip => None,
            DegeneratePolicy::Zero => Some(EventRow {
                mean_pt: 0.,
                var_pt: 0.,
                mean_eta: 0.,
                var_eta: 0.,
                mean_phi: 0.,
                var_phi: 0.,
                ..row
            }),
        }
    }
}

/// Aggregated and smeared event-level features
#[derive(Clone, Debug)]
pub struct EventFeatures<R = Xoshiro256Plus> {
    noise: NoiseModel<R>,
    resolution: Resolution,
    policy: DegeneratePolicy,
}

impl<R> EventFeatures<R> {
    pub fn new(noise: NoiseModel<R>, resolution: Resolution, policy: DegeneratePolicy) -> Self {
        Self {
            noise,
            resolution,
            policy,
        }
    }
}

impl<R: Rng> Extract for EventFeatures<R> {
    type Row = EventRow;

    fn extract(
        &mut self,
        _index: u64,
        class: EventClass,
        event: &Event,
    ) -> Extraction<EventRow> {
        let mut aggregator = EventAggregator::new();
        for particle in event.final_state() {
            let measured = self
                .noise
                .smear_kinematics(&Kinematics::from(particle.p()), &self.resolution);
            aggregator.add(&measured, particle.is_charged());
        }
        let degenerate = (aggregator.multiplicity() == 0) as u64;
        Extraction {
            rows: aggregator.finish(class, self.policy).into_iter().collect(),
            degenerate,
        }
    }
}

/// Exact kinematics of each final-state particle
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ParticleFeatures {
    policy: DegeneratePolicy,
}

impl ParticleFeatures {
    pub fn new(policy: DegeneratePolicy) -> Self {
        Self { policy }
    }

    /// The row for a single particle, or `None` if it has to be skipped
    pub fn row(&self, index: u64, class: EventClass, particle: &Particle) -> Option<ParticleRow> {
        let p = particle.p();
        let kin = Kinematics::from(p);
        let mut rapidity = p.rapidity();
        if !rapidity.is_finite() {
            match self.policy {
                DegeneratePolicy::Keep => {}
                DegeneratePolicy::Skip => return None,
                DegeneratePolicy::Zero => rapidity = 0.,
            }
        }
        Some(ParticleRow {
            event: index,
            particle_id: particle.id().id(),
            charged: particle.is_charged() as u8,
            pt: kin.pt,
            eta: kin.eta,
            phi: kin.phi,
            rapidity,
            energy: kin.energy,
            class: class.label(),
        })
    }
}

impl Extract for ParticleFeatures {
    type Row = ParticleRow;

    fn extract(
        &mut self,
        index: u64,
        class: EventClass,
        event: &Event,
    ) -> Extraction<ParticleRow> {
        let mut res = Extraction::default();
        for particle in event.final_state() {
            if !particle.p().rapidity().is_finite() {
                res.degenerate += 1;
            }
            res.rows.extend(self.row(index, class, particle));
        }
        res
    }
}
