use std::fmt::{self, Display};
use std::str::FromStr;

use crate::class::EventClass;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    static ref DIRECTIVE_RE: Regex = Regex::new(
        r"^\s*(?P<key>[[:alnum:]_]+(?::[[:alnum:]_]+)*)\s*=\s*(?P<value>\S(?:.*\S)?)\s*$"
    ).unwrap();
}

/// A single generator directive of the form `Group:key = value`
#[derive(Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Directive {
    key: String,
    value: String,
}

impl Directive {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether this directive sets `key`, ignoring case
    pub fn sets(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }
}

impl Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.key, self.value)
    }
}

impl FromStr for Directive {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(captures) = DIRECTIVE_RE.captures(s) else {
            return Err(SettingsError::InvalidDirective(s.to_owned()));
        };
        Ok(Directive::new(&captures["key"], &captures["value"]))
    }
}

impl TryFrom<String> for Directive {
    type Error = SettingsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Directive> for String {
    fn from(d: Directive) -> Self {
        d.to_string()
    }
}

/// Beam configuration shared by all phases of a run
#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BeamSetup {
    /// Centre-of-mass energy in GeV
    pub ecm: f64,
    /// PDG id of the first beam particle
    pub id_a: i32,
    /// PDG id of the second beam particle
    pub id_b: i32,
}

/// LHC proton-proton collisions at 13 TeV
impl Default for BeamSetup {
    fn default() -> Self {
        Self {
            ecm: 13000.,
            id_a: 2212,
            id_b: 2212,
        }
    }
}

/// Immutable generator configuration
///
/// Directives are kept in the order in which they were added. When a
/// key is set more than once, the last value wins.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Settings {
    directives: Vec<Directive>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// The complete configuration for generating events of the given class
    ///
    /// The settings start from scratch, so nothing carries over from
    /// a previous phase. `extra` directives are applied last and can
    /// override the defaults.
    pub fn for_class(beams: &BeamSetup, class: EventClass, extra: &[Directive]) -> Self {
        let mut settings = Settings::new()
            .with("Beams:eCM", beams.ecm)
            .with("Beams:idA", beams.id_a)
            .with("Beams:idB", beams.id_b);
        for (key, value) in class.process_directives() {
            settings = settings.with(*key, *value);
        }
        extra
            .iter()
            .cloned()
            .fold(settings, |s, d| s.with_directive(d))
    }

    pub fn with(self, key: impl Into<String>, value: impl ToString) -> Self {
        self.with_directive(Directive::new(key, value.to_string()))
    }

    pub fn with_directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn directives(&self) -> &[Directive] {
        self.directives.as_slice()
    }

    /// The value of the last directive setting `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.directives
            .iter()
            .rev()
            .find(|d| d.sets(key))
            .map(|d| d.value())
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, SettingsError> {
        self.get_parsed(key, "a number")
    }

    pub fn get_i32(&self, key: &str) -> Result<Option<i32>, SettingsError> {
        self.get_parsed(key, "an integer")
    }

    pub fn get_u64(&self, key: &str) -> Result<Option<u64>, SettingsError> {
        self.get_parsed(key, "a non-negative integer")
    }

    /// The value of a flag, accepting `on`/`off`, `true`/`false`, `yes`/`no`, and `1`/`0`
    pub fn get_flag(&self, key: &str) -> Result<Option<bool>, SettingsError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        match value.to_ascii_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => Ok(Some(true)),
            "off" | "false" | "no" | "0" => Ok(Some(false)),
            _ => Err(invalid_value(key, value, "a flag")),
        }
    }

    fn get_parsed<T: FromStr>(
        &self,
        key: &str,
        expected: &'static str,
    ) -> Result<Option<T>, SettingsError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        value
            .parse()
            .map(Some)
            .map_err(|_| invalid_value(key, value, expected))
    }
}

fn invalid_value(key: &str, value: &str, expected: &'static str) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
        expected,
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SettingsError {
    #[error("Not a directive of the form `Group:key = value`: {0}")]
    InvalidDirective(String),
    #[error("Invalid value `{value}` for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}
