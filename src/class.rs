use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Class of collision process
///
/// The class is a label assigned according to the generator
/// configuration that produced an event, not a property of the event
/// itself.
#[derive(
    Copy,
    Clone,
    Debug,
    Display,
    EnumIter,
    EnumString,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Deserialize,
    Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventClass {
    /// Hard QCD processes
    NonDiffractive = 0,
    /// Single, double, and central diffraction
    Diffractive = 1,
}

impl EventClass {
    /// Numeric label written to the output files
    pub const fn label(self) -> u8 {
        self as u8
    }

    /// Generator directives selecting the processes of this class
    pub fn process_directives(self) -> &'static [(&'static str, &'static str)] {
        use EventClass::*;
        match self {
            NonDiffractive => &[("HardQCD:all", "on")],
            Diffractive => &[
                ("HardQCD:all", "off"),
                ("SoftQCD:singleDiffractive", "on"),
                ("SoftQCD:doubleDiffractive", "on"),
                ("SoftQCD:centralDiffractive", "on"),
            ],
        }
    }
}
