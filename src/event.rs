use crate::particle::Particle;

use std::convert::From;
use std::default::Default;

#[derive(PartialEq, Debug, Clone, Default)]
pub struct EventBuilder {
    particles: Vec<Particle>,
}

impl EventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            particles: Vec::with_capacity(cap),
        }
    }

    pub fn add(&mut self, particle: Particle) -> &mut Self {
        self.particles.push(particle);
        self
    }

    pub fn build(self) -> Event {
        Event {
            particles: self.particles,
        }
    }
}

impl From<EventBuilder> for Event {
    fn from(b: EventBuilder) -> Self {
        b.build()
    }
}

/// A generated event
///
/// The particles are kept in the order of the event record, including
/// beam and intermediate particles.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Event {
    particles: Vec<Particle>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// All particles in the event record
    pub fn particles(&self) -> &[Particle] {
        self.particles.as_slice()
    }

    /// The final-state particles, in event record order
    pub fn final_state(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(|p| p.is_final())
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

impl From<Vec<Particle>> for Event {
    fn from(particles: Vec<Particle>) -> Self {
        Self { particles }
    }
}
