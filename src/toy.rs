use std::f64::consts::PI;

use crate::class::EventClass;
use crate::event::{Event, EventBuilder};
use crate::four_vector::FourVector;
use crate::generator::{Generated, Generator, Statistics};
use crate::particle::{Particle, Status};
use crate::settings::{Settings, SettingsError};

use derive_builder::Builder;
use log::{debug, info, trace};
use particle_id::ParticleID;
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_distr::{Exp, Normal, Poisson};
use rand_xoshiro::Xoshiro256Plus;
use strum::Display;
use thiserror::Error;

const PROTON_MASS: f64 = 0.938272;
const MIN_ECM: f64 = 10.;

// soft particle spectrum
const MEAN_SOFT_PT: f64 = 0.45;
const MEAN_DIFFRACTIVE_PT: f64 = 0.35;
const MEAN_RECOIL_PT: f64 = 0.3;

// hard scattering
const PT_HAT_MIN: f64 = 10.;
const PT_HAT_POWER: f64 = 5.;
const JET_WIDTH: f64 = 0.15;

// range of momentum fractions lost by diffractive protons
const XI_MIN: f64 = 1e-6;
const XI_MAX: f64 = 0.05;
// lightest diffractive system
const MIN_DIFFRACTIVE_MASS: f64 = 1.2;

/// Hadrons emitted by the toy fragmentation as (PDG id, mass, relative abundance)
///
/// Neutral pions are replaced by photons.
const SPECIES: [(i32, f64, f64); 10] = [
    (211, 0.13957, 0.27),
    (-211, 0.13957, 0.27),
    (22, 0., 0.25),
    (321, 0.493677, 0.04),
    (-321, 0.493677, 0.04),
    (130, 0.497611, 0.04),
    (2212, PROTON_MASS, 0.03),
    (-2212, PROTON_MASS, 0.03),
    (2112, 0.939565, 0.015),
    (-2112, 0.939565, 0.015),
];

/// Processes known to the toy generator
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq, Ord, PartialOrd, Hash)]
enum Process {
    #[strum(serialize = "hard QCD")]
    HardQcd,
    #[strum(serialize = "soft non-diffractive")]
    NonDiffractive,
    #[strum(serialize = "single diffractive")]
    SingleDiffractive,
    #[strum(serialize = "double diffractive")]
    DoubleDiffractive,
    #[strum(serialize = "central diffractive")]
    CentralDiffractive,
}

impl Process {
    const ALL: [Process; 5] = [
        Process::HardQcd,
        Process::NonDiffractive,
        Process::SingleDiffractive,
        Process::DoubleDiffractive,
        Process::CentralDiffractive,
    ];

    /// Directive switching the process on or off
    fn switch(self) -> &'static str {
        use Process::*;
        match self {
            HardQcd => "HardQCD:all",
            NonDiffractive => "SoftQCD:nonDiffractive",
            SingleDiffractive => "SoftQCD:singleDiffractive",
            DoubleDiffractive => "SoftQCD:doubleDiffractive",
            CentralDiffractive => "SoftQCD:centralDiffractive",
        }
    }

    fn is_soft(self) -> bool {
        self != Process::HardQcd
    }

    /// Relative rate, roughly the cross section in mb at LHC energies
    fn relative_rate(self) -> f64 {
        use Process::*;
        match self {
            HardQcd => 55.,
            NonDiffractive => 55.,
            SingleDiffractive => 12.8,
            DoubleDiffractive => 8.8,
            CentralDiffractive => 1.2,
        }
    }
}

const KNOWN_KEYS: [&str; 11] = [
    "Beams:eCM",
    "Beams:idA",
    "Beams:idB",
    "HardQCD:all",
    "SoftQCD:all",
    "SoftQCD:nonDiffractive",
    "SoftQCD:singleDiffractive",
    "SoftQCD:doubleDiffractive",
    "SoftQCD:centralDiffractive",
    "Random:setSeed",
    "Random:seed",
];

/// Options for the [ToyGenerator]
#[derive(Builder, Copy, Clone, Debug, PartialEq)]
pub struct ToyOptions {
    /// Initial random number seed
    ///
    /// The `Random:seed` directive reseeds the generator on initialisation.
    #[builder(default)]
    seed: u64,
    /// Probability for a generation attempt to fail
    #[builder(default = "0.")]
    failure_rate: f64,
}

impl Default for ToyOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            failure_rate: 0.,
        }
    }
}

/// A simple stochastic model of proton-proton collisions
///
/// The toy generator produces events with a plausible structure for
/// the supported processes: beam particles, soft hadrons with an
/// exponential transverse momentum spectrum, hard back-to-back jets for
/// hard QCD, and surviving protons and forward diffractive systems for
/// diffraction. It is meant for testing and demonstrating the feature
/// extraction, not for physics studies.
pub struct ToyGenerator {
    options: ToyOptions,
    rng: Xoshiro256Plus,
    model: Option<Model>,
    stats: Statistics,
}

impl ToyGenerator {
    pub fn new(options: ToyOptions) -> Self {
        Self {
            options,
            rng: Xoshiro256Plus::seed_from_u64(options.seed),
            model: None,
            stats: Statistics::new(),
        }
    }
}

impl Default for ToyGenerator {
    fn default() -> Self {
        Self::new(ToyOptions::default())
    }
}

impl Generator for ToyGenerator {
    type Error = ToyError;

    fn init(&mut self, class: EventClass, settings: &Settings) -> Result<(), Self::Error> {
        self.model = None;
        if !(0. ..=1.).contains(&self.options.failure_rate) {
            return Err(ToyError::InvalidFailureRate(self.options.failure_rate));
        }
        for directive in settings.directives() {
            if !KNOWN_KEYS.iter().any(|key| directive.sets(key)) {
                return Err(ToyError::UnknownKey(directive.key().to_owned()));
            }
        }
        if let Some(seed) = settings.get_u64("Random:seed")? {
            debug!("Reseeding toy generator with seed {seed}");
            self.rng = Xoshiro256Plus::seed_from_u64(seed);
        }
        let model = Model::new(settings)?;
        info!(
            "Toy generator initialised for {class} events at √s = {} GeV with processes {}",
            model.ecm,
            model
                .processes
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.model = Some(model);
        self.stats.start(class);
        Ok(())
    }

    fn next_event(&mut self) -> Result<Generated, Self::Error> {
        let Some(model) = self.model.as_ref() else {
            return Err(ToyError::NotInitialised);
        };
        let Some(stats) = self.stats.current_mut() else {
            return Err(ToyError::NotInitialised);
        };
        if self.rng.gen_bool(self.options.failure_rate) {
            stats.record_failed();
            return Ok(Generated::Failed);
        }
        let process = model.processes[model.choice.sample(&mut self.rng)];
        match model.generate(process, &mut self.rng) {
            Ok(event) => {
                trace!("Generated {process} event with {} particles", event.len());
                stats.record_accepted(&process.to_string());
                Ok(Generated::Event(event))
            }
            Err(err) => {
                debug!("Failed to generate {process} event: {err}");
                stats.record_failed();
                Ok(Generated::Failed)
            }
        }
    }

    fn statistics(&self) -> Statistics {
        self.stats.clone()
    }
}

/// Error sampling a single event
#[derive(Debug, Error)]
#[error("Sampling error: {0}")]
struct SamplingError(String);

struct Model {
    ecm: f64,
    beams: [ParticleID; 2],
    p_beam: f64,
    y_beam: f64,
    processes: Vec<Process>,
    choice: WeightedIndex<f64>,
    species: WeightedIndex<f64>,
    soft_multiplicity: Poisson<f64>,
    soft_pt: Exp<f64>,
    diffractive_pt: Exp<f64>,
    recoil_pt: Exp<f64>,
    jet_spread: Normal<f64>,
}

impl Model {
    fn new(settings: &Settings) -> Result<Self, ToyError> {
        let ecm = settings.get_f64("Beams:eCM")?.unwrap_or(13000.);
        if !(ecm.is_finite() && ecm >= MIN_ECM) {
            return Err(ToyError::InvalidEnergy(ecm));
        }
        let id_a = settings.get_i32("Beams:idA")?.unwrap_or(2212);
        let id_b = settings.get_i32("Beams:idB")?.unwrap_or(2212);
        for id in [id_a, id_b] {
            if id.unsigned_abs() != 2212 {
                return Err(ToyError::UnsupportedBeam(id));
            }
        }

        let soft_all = settings.get_flag("SoftQCD:all")?.unwrap_or(false);
        let mut processes = Vec::new();
        for process in Process::ALL {
            let default = process.is_soft() && soft_all;
            if settings.get_flag(process.switch())?.unwrap_or(default) {
                processes.push(process);
            }
        }
        if processes.is_empty() {
            return Err(ToyError::NoProcesses);
        }
        let choice = WeightedIndex::new(processes.iter().map(|p| p.relative_rate()))
            .map_err(distribution_err)?;
        let species = WeightedIndex::new(SPECIES.iter().map(|s| s.2))
            .map_err(distribution_err)?;

        let e_beam = ecm / 2.;
        let p_beam = (e_beam * e_beam - PROTON_MASS * PROTON_MASS).sqrt();
        let log_ecm = ecm.ln();
        Ok(Self {
            ecm,
            beams: [ParticleID::new(id_a), ParticleID::new(id_b)],
            p_beam,
            y_beam: ((e_beam + p_beam) / PROTON_MASS).ln(),
            processes,
            choice,
            species,
            soft_multiplicity: Poisson::new(1.2 * log_ecm * log_ecm)
                .map_err(distribution_err)?,
            soft_pt: Exp::new(1. / MEAN_SOFT_PT).map_err(distribution_err)?,
            diffractive_pt: Exp::new(1. / MEAN_DIFFRACTIVE_PT)
                .map_err(distribution_err)?,
            recoil_pt: Exp::new(1. / MEAN_RECOIL_PT).map_err(distribution_err)?,
            jet_spread: Normal::new(0., JET_WIDTH).map_err(distribution_err)?,
        })
    }

    fn generate<R: Rng>(&self, process: Process, rng: &mut R) -> Result<Event, SamplingError> {
        use Process::*;

        let mut event = EventBuilder::with_capacity(128);
        for (beam, side) in self.beams.iter().zip([1., -1.]) {
            let p = [self.ecm / 2., 0., 0., side * self.p_beam];
            event.add(Particle::new(*beam, Status::Beam, p.into()));
        }
        match process {
            HardQcd => {
                self.add_jets(&mut event, rng)?;
                self.add_soft(&mut event, rng);
            }
            NonDiffractive => self.add_soft(&mut event, rng),
            SingleDiffractive => {
                let side = if rng.gen_bool(0.5) { 1. } else { -1. };
                let xi = self.sample_xi(rng);
                self.add_recoil_proton(&mut event, -side, xi, rng);
                let mass = (xi.sqrt() * self.ecm).max(MIN_DIFFRACTIVE_MASS);
                let centre = side * (self.y_beam - (mass / PROTON_MASS).ln());
                self.add_system(&mut event, mass, centre, rng)?;
            }
            DoubleDiffractive => {
                for side in [1., -1.] {
                    let xi = self.sample_xi(rng);
                    let mass = (xi.sqrt() * self.ecm).max(MIN_DIFFRACTIVE_MASS);
                    let centre = side * (self.y_beam - (mass / PROTON_MASS).ln());
                    self.add_system(&mut event, mass, centre, rng)?;
                }
            }
            CentralDiffractive => {
                let xi = [self.sample_xi(rng), self.sample_xi(rng)];
                self.add_recoil_proton(&mut event, 1., xi[0], rng);
                self.add_recoil_proton(&mut event, -1., xi[1], rng);
                let mass = ((xi[0] * xi[1]).sqrt() * self.ecm).max(MIN_DIFFRACTIVE_MASS);
                let centre = 0.5 * (xi[0] / xi[1]).ln();
                self.add_system(&mut event, mass, centre, rng)?;
            }
        }
        Ok(event.build())
    }

    fn sample_xi<R: Rng>(&self, rng: &mut R) -> f64 {
        rng.gen_range(XI_MIN.ln()..XI_MAX.ln()).exp()
    }

    fn emit<R: Rng>(&self, event: &mut EventBuilder, pt: f64, eta: f64, rng: &mut R) {
        let (id, mass, _) = SPECIES[self.species.sample(rng)];
        let phi = rng.gen_range(-PI..PI);
        let p = FourVector::from_pt_eta_phi_m(pt, eta, phi, mass);
        event.add(Particle::new(ParticleID::new(id), Status::Final, p));
    }

    /// Soft particles spread over the central rapidity plateau
    fn add_soft<R: Rng>(&self, event: &mut EventBuilder, rng: &mut R) {
        let n = self.soft_multiplicity.sample(rng) as usize;
        let eta_max = (self.y_beam - 2.).max(1.);
        for _ in 0..n {
            let pt = self.soft_pt.sample(rng);
            let eta = rng.gen_range(-eta_max..eta_max);
            self.emit(event, pt, eta, rng);
        }
    }

    /// Two back-to-back jets, each fragmenting into a few hadrons
    fn add_jets<R: Rng>(&self, event: &mut EventBuilder, rng: &mut R) -> Result<(), SamplingError> {
        let u: f64 = rng.gen_range(f64::EPSILON..1.);
        let pt_hat = PT_HAT_MIN * u.powf(-1. / (PT_HAT_POWER - 1.));
        if 2. * pt_hat >= self.ecm {
            return Err(SamplingError(format!(
                "Hard scale {pt_hat} GeV exceeds available energy"
            )));
        }
        let phi = rng.gen_range(-PI..PI);
        for dphi in [0., PI] {
            let eta_jet = rng.gen_range(-2.5..2.5);
            let jet = FourVector::from_pt_eta_phi_m(pt_hat, eta_jet, phi + dphi, 0.);
            event.add(Particle::new(
                particle_id::sm_elementary_particles::gluon,
                Status::Intermediate,
                jet,
            ));
            let nhadrons = rng.gen_range(2..=6);
            let fractions: Vec<f64> = (0..nhadrons).map(|_| rng.gen_range(0.05..1.)).collect();
            let norm: f64 = fractions.iter().sum();
            for z in fractions {
                let eta = eta_jet + self.jet_spread.sample(rng);
                self.emit(event, z / norm * pt_hat, eta, rng);
            }
        }
        Ok(())
    }

    /// A proton surviving the collision on the given side after losing a fraction `xi` of its momentum
    fn add_recoil_proton<R: Rng>(&self, event: &mut EventBuilder, side: f64, xi: f64, rng: &mut R) {
        let pt = self.recoil_pt.sample(rng);
        let phi = rng.gen_range(-PI..PI);
        let pz = side * (1. - xi) * self.p_beam;
        let e = (PROTON_MASS * PROTON_MASS + pt * pt + pz * pz).sqrt();
        let p = [e, pt * phi.cos(), pt * phi.sin(), pz];
        let id = if side > 0. { self.beams[0] } else { self.beams[1] };
        event.add(Particle::new(id, Status::Final, p.into()));
    }

    /// Decay products of a diffractive system with the given mass and rapidity
    fn add_system<R: Rng>(
        &self,
        event: &mut EventBuilder,
        mass: f64,
        centre: f64,
        rng: &mut R,
    ) -> Result<(), SamplingError> {
        let log_mass = mass.ln();
        let multiplicity = Poisson::new((2. * log_mass).max(0.5))
            .map_err(|err| SamplingError(err.to_string()))?;
        let n = 1 + multiplicity.sample(rng) as usize;
        let half_width = log_mass.max(0.5);
        for _ in 0..n {
            let pt = self.diffractive_pt.sample(rng);
            let eta = centre + rng.gen_range(-half_width..half_width);
            self.emit(event, pt, eta, rng);
        }
        Ok(())
    }
}

fn distribution_err(err: impl std::fmt::Display) -> ToyError {
    ToyError::Distribution(err.to_string())
}

#[derive(Debug, Error)]
pub enum ToyError {
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("Unknown setting: {0}")]
    UnknownKey(String),
    #[error("Invalid centre-of-mass energy {0} GeV: has to be at least 10 GeV")]
    InvalidEnergy(f64),
    #[error("Unsupported beam particle {0}: only protons and antiprotons are supported")]
    UnsupportedBeam(i32),
    #[error("No processes switched on")]
    NoProcesses,
    #[error("Failure rate {0} is not a probability")]
    InvalidFailureRate(f64),
    #[error("Failed to set up distribution: {0}")]
    Distribution(String),
    #[error("Generator used before initialisation")]
    NotInitialised,
}
