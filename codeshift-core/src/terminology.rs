//! Registry of supported terminologies.
//!
//! Each terminology maps to a [`TerminologyProfile`] describing how its
//! release folders are laid out. Lookup goes through a fixed table rather than
//! by type name, so an unknown terminology is an ordinary error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::labels::DEFAULT_UNDEFINED_TOKENS;
use crate::locator::FileMarkers;

/// Terminologies with a registered analyser.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terminology {
    /// Operationen- und Prozedurenschlüssel (German procedure classification).
    Ops,
    /// ICD-10 German Modification (diagnoses).
    Icd10Gm,
}

/// Per-terminology settings used when analysing a release.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminologyProfile {
    pub markers: FileMarkers,
    pub undefined_tokens: Vec<String>,
}

type ProfileFactory = fn() -> TerminologyProfile;

static REGISTRY: &[(Terminology, &str, ProfileFactory)] = &[
    (Terminology::Ops, "ops", german_release_profile),
    (Terminology::Icd10Gm, "icd10gm", german_release_profile),
];

/// BfArM releases: `liesmich` read-me files and `umsteiger` crosswalks.
fn german_release_profile() -> TerminologyProfile {
    TerminologyProfile {
        markers: FileMarkers::default(),
        undefined_tokens: DEFAULT_UNDEFINED_TOKENS
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}

impl Terminology {
    /// All registered terminologies.
    pub fn all() -> impl Iterator<Item = Terminology> {
        REGISTRY.iter().map(|(t, _, _)| *t)
    }

    /// Canonical identifier, e.g. `"icd10gm"`.
    pub fn as_str(&self) -> &'static str {
        REGISTRY
            .iter()
            .find(|(t, _, _)| t == self)
            .map(|(_, name, _)| *name)
            .unwrap_or("unknown")
    }

    /// Build the profile registered for this terminology.
    pub fn profile(&self) -> TerminologyProfile {
        REGISTRY
            .iter()
            .find(|(t, _, _)| t == self)
            .map(|(_, _, factory)| factory())
            .unwrap_or_else(german_release_profile)
    }
}

impl FromStr for Terminology {
    type Err = Error;

    /// Case-insensitive; punctuation is ignored so `ICD-10-GM` and `icd10gm`
    /// both resolve.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        REGISTRY
            .iter()
            .find(|(_, name, _)| *name == normalized)
            .map(|(t, _, _)| *t)
            .ok_or_else(|| Error::UnknownTerminology {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for Terminology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
