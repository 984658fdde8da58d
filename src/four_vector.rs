use serde::{Deserialize, Serialize};

/// Smallest transverse momentum used when computing the pseudorapidity
///
/// Particles along the beam axis get a large but finite pseudorapidity.
const TINY_PT: f64 = 1e-20;

/// A basic four-vector
///
/// The zero component is the energy/time component. The remainder are
/// the spatial components, with the beam along the third (z) axis.
#[derive(Deserialize, Serialize, PartialEq, PartialOrd, Debug, Clone, Copy, Default)]
pub struct FourVector {
    p: [f64; 4],
}

impl FourVector {
    /// Construct a new four-vector
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct from transverse momentum, pseudorapidity, azimuthal angle, and mass
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, m: f64) -> Self {
        let pz = pt * eta.sinh();
        let e = (m * m + pt * pt + pz * pz).sqrt();
        [e, pt * phi.cos(), pt * phi.sin(), pz].into()
    }

    /// The energy component
    pub fn e(&self) -> f64 {
        self.p[0]
    }

    pub fn px(&self) -> f64 {
        self.p[1]
    }

    pub fn py(&self) -> f64 {
        self.p[2]
    }

    /// The longitudinal momentum
    pub fn pz(&self) -> f64 {
        self.p[3]
    }

    /// The spatial norm \sqrt{\sum v_i^2} with i = 1,2,3
    pub fn spatial_norm(&self) -> f64 {
        self.spatial_norm_sq().sqrt()
    }

    /// The square \sum v_i^2 with i = 1,2,3 of the spatial norm
    pub fn spatial_norm_sq(&self) -> f64 {
        self.p.iter().skip(1).map(|e| e * e).sum()
    }

    /// The square of the transverse momentum
    pub fn pt_sq(&self) -> f64 {
        self.p[1] * self.p[1] + self.p[2] * self.p[2]
    }

    /// The scalar transverse momentum
    pub fn pt(&self) -> f64 {
        self.pt_sq().sqrt()
    }

    /// The invariant mass square v_0^2 - \sum v_i^2 with i = 1,2,3
    pub fn m_sq(&self) -> f64 {
        self.p[0] * self.p[0] - self.spatial_norm_sq()
    }

    /// The azimuthal angle in (-π, π]
    pub fn phi(&self) -> f64 {
        self.py().atan2(self.px())
    }

    /// The pseudorapidity
    pub fn eta(&self) -> f64 {
        let pz = self.pz();
        let eta = ((self.spatial_norm() + pz.abs()) / self.pt().max(TINY_PT)).ln();
        if pz > 0. {
            eta
        } else {
            -eta
        }
    }

    /// The rapidity 1/2 ln((E + pz)/(E - pz))
    ///
    /// Not finite for E = |pz|.
    pub fn rapidity(&self) -> f64 {
        rapidity(self.e(), self.pz())
    }
}

/// The rapidity 1/2 ln((E + pz)/(E - pz)) for energy `e` and longitudinal momentum `pz`
pub fn rapidity(e: f64, pz: f64) -> f64 {
    0.5 * ((e + pz) / (e - pz)).ln()
}

impl From<[f64; 4]> for FourVector {
    fn from(p: [f64; 4]) -> FourVector {
        FourVector { p }
    }
}

impl std::ops::Index<usize> for FourVector {
    type Output = f64;

    fn index(&self, i: usize) -> &Self::Output {
        &self.p[i]
    }
}
