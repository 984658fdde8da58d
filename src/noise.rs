//! Gaussian smearing to emulate a finite detector resolution
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::Kinematics;

/// Relative resolutions of the measured quantities
#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Resolution {
    /// Relative transverse momentum resolution
    pub pt: f64,
    /// Relative pseudorapidity resolution
    pub eta: f64,
    /// Relative azimuthal angle resolution
    pub phi: f64,
    /// Relative energy resolution
    pub energy: f64,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            pt: 0.05,
            eta: 0.03,
            phi: 0.02,
            energy: 0.05,
        }
    }
}

impl Resolution {
    /// Perfect resolution, i.e. no smearing at all
    pub fn exact() -> Self {
        Self {
            pt: 0.,
            eta: 0.,
            phi: 0.,
            energy: 0.,
        }
    }

    /// Check that all resolutions are finite and non-negative
    pub fn validate(&self) -> Result<(), InvalidResolution> {
        let entries = [
            ("pt", self.pt),
            ("eta", self.eta),
            ("phi", self.phi),
            ("energy", self.energy),
        ];
        for (name, value) in entries {
            if !(value.is_finite() && value >= 0.) {
                return Err(InvalidResolution { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Error, PartialEq)]
#[error("Invalid {name} resolution {value}: has to be a non-negative number")]
pub struct InvalidResolution {
    name: &'static str,
    value: f64,
}

/// Source of Gaussian noise
///
/// A single random number generator is advanced across all calls, so
/// the noise is reproducible for a fixed seed.
#[derive(Clone, Debug)]
pub struct NoiseModel<R = Xoshiro256Plus> {
    rng: R,
}

impl NoiseModel<Xoshiro256Plus> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(Xoshiro256Plus::seed_from_u64(seed))
    }
}

impl<R: Rng> NoiseModel<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Draw from a normal distribution with mean `value` and standard deviation `rel_err * |value|`
    ///
    /// Non-finite values are returned unchanged.
    pub fn smear(&mut self, value: f64, rel_err: f64) -> f64 {
        if !value.is_finite() {
            return value;
        }
        let z: f64 = self.rng.sample(StandardNormal);
        value + rel_err * value.abs() * z
    }

    /// Smear transverse momentum, pseudorapidity, azimuthal angle, and energy, in that order
    pub fn smear_kinematics(&mut self, k: &Kinematics, resolution: &Resolution) -> Kinematics {
        Kinematics {
            pt: self.smear(k.pt, resolution.pt),
            eta: self.smear(k.eta, resolution.eta),
            phi: self.smear(k.phi, resolution.phi),
            energy: self.smear(k.energy, resolution.energy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let mut first = NoiseModel::seeded(7);
        let mut second = NoiseModel::seeded(7);
        let values: Vec<_> = (0..100).map(|i| first.smear(i as f64, 0.05)).collect();
        let repeated: Vec<_> = (0..100).map(|i| second.smear(i as f64, 0.05)).collect();
        assert_eq!(values, repeated);

        let mut other = NoiseModel::seeded(8);
        let different: Vec<_> = (0..100).map(|i| other.smear(i as f64, 0.05)).collect();
        assert_ne!(values, different);
    }

    #[test]
    fn advances_across_calls() {
        let mut noise = NoiseModel::seeded(0);
        let a = noise.smear(10., 0.1);
        let b = noise.smear(10., 0.1);
        assert_ne!(a, b);
    }

    #[test]
    fn degenerate_inputs() {
        let mut noise = NoiseModel::seeded(0);
        assert_eq!(noise.smear(0., 0.05), 0.);
        assert_eq!(noise.smear(3., 0.), 3.);
        assert!(noise.smear(f64::NAN, 0.05).is_nan());
        assert_eq!(noise.smear(f64::INFINITY, 0.05), f64::INFINITY);
    }

    #[test]
    fn spread() {
        const N: usize = 20_000;
        let mut noise = NoiseModel::seeded(1);
        let samples: Vec<_> = (0..N).map(|_| noise.smear(-4., 0.05)).collect();
        let mean = samples.iter().sum::<f64>() / N as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / N as f64;
        assert!((mean + 4.).abs() < 0.01);
        // standard deviation 0.05 * |-4| = 0.2
        assert!((var.sqrt() - 0.2).abs() < 0.01);
    }

    #[test]
    fn validate() {
        assert!(Resolution::default().validate().is_ok());
        assert!(Resolution::exact().validate().is_ok());
        let negative = Resolution {
            phi: -0.1,
            ..Default::default()
        };
        assert!(negative.validate().is_err());
        let nan = Resolution {
            pt: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }
}
