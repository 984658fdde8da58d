use crate::four_vector::FourVector;

use particle_id::ParticleID;
use strum::Display;

/// Position of a particle in the history of an event
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    /// Incoming beam particle
    Beam,
    /// Intermediate particle that decays or fragments further
    Intermediate,
    /// Stable end product of the simulation
    Final,
}

/// A particle in a generated event
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Particle {
    id: ParticleID,
    status: Status,
    p: FourVector,
}

impl Particle {
    pub fn new(id: ParticleID, status: Status, p: FourVector) -> Self {
        Self { id, status, p }
    }

    /// The PDG particle id
    pub fn id(&self) -> ParticleID {
        self.id
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Whether the particle is a final-state particle
    pub fn is_final(&self) -> bool {
        self.status == Status::Final
    }

    /// Whether the particle carries electric charge
    pub fn is_charged(&self) -> bool {
        three_charge(self.id) != 0
    }

    /// The four-momentum
    pub fn p(&self) -> &FourVector {
        &self.p
    }
}

// three times the electric charge of the quarks d, u, s, c, b, t
const QUARK_THREE_CHARGE: [i32; 6] = [-1, 2, -1, 2, -1, 2];

fn quark_three_charge(q: i32) -> Option<i32> {
    match q {
        1..=6 => Some(QUARK_THREE_CHARGE[(q - 1) as usize]),
        _ => None,
    }
}

/// Three times the electric charge of the particle with the given id
///
/// Follows the PDG Monte Carlo numbering scheme. Hadron charges are
/// derived from the quark content encoded in the id, ions from the
/// proton number. Unknown ids are treated as neutral.
pub fn three_charge(id: ParticleID) -> i32 {
    let Some(abs_id) = id.id().checked_abs() else {
        return 0;
    };
    let charge = match abs_id {
        1..=6 => QUARK_THREE_CHARGE[(abs_id - 1) as usize],
        11 | 13 | 15 | 17 => -3,
        24 | 34 | 37 => 3,
        1..=100 => 0,
        1_000_000_000.. => 3 * ((abs_id / 10_000) % 1000),
        _ => hadron_three_charge(abs_id),
    };
    if id.id() < 0 {
        -charge
    } else {
        charge
    }
}

fn hadron_three_charge(abs_id: i32) -> i32 {
    let q3 = (abs_id / 10) % 10;
    let q2 = (abs_id / 100) % 10;
    let q1 = (abs_id / 1000) % 10;
    let charge = if q1 == 0 {
        // meson q qbar; for down-type first quarks the antiquark comes first
        let (Some(c2), Some(c3)) = (quark_three_charge(q2), quark_three_charge(q3)) else {
            return 0;
        };
        if q2 % 2 == 1 {
            c3 - c2
        } else {
            c2 - c3
        }
    } else if q3 == 0 {
        // diquark
        quark_three_charge(q1).unwrap_or(0) + quark_three_charge(q2).unwrap_or(0)
    } else {
        [q1, q2, q3].into_iter().filter_map(quark_three_charge).sum()
    };
    charge
}
