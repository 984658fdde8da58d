pub use crate::{
    class::EventClass,
    features::{DegeneratePolicy, EventFeatures, ParticleFeatures},
    generator::{Generated, Generator},
    hepmc2::HepMCGenerator,
    noise::{NoiseModel, Resolution},
    run::{Driver, Outputs, RunPlan},
    settings::{BeamSetup, Directive, Settings},
    toy::{ToyGenerator, ToyOptions, ToyOptionsBuilder},
    traits::Extract,
};
