use serde::{Deserialize, Serialize};
use std::fmt;

use crate::key::slugify;

// Sponsor-laden and historical entrant names -> constructor lineage.
// Keys are already slugified, so "F1" has been stripped.
const TEAM_ALIASES: &[(&str, &str)] = &[
    ("red-bull-racing", "red-bull"),
    ("red-bull-racing-honda", "red-bull"),
    ("red-bull-racing-honda-rbpt", "red-bull"),
    ("oracle-red-bull-racing", "red-bull"),
    ("mercedes-amg-petronas", "mercedes"),
    ("mercedes-amg-petronas-team", "mercedes"),
    ("mercedes-amg", "mercedes"),
    ("scuderia-ferrari", "ferrari"),
    ("scuderia-ferrari-mission-winnow", "ferrari"),
    ("scuderia-ferrari-hp", "ferrari"),
    ("mclaren-team", "mclaren"),
    ("mclaren-mercedes", "mclaren"),
    ("aston-martin-aramco", "aston-martin"),
    ("aston-martin-aramco-cognizant", "aston-martin"),
    ("racing-point", "aston-martin"),
    ("bwt-racing-point", "aston-martin"),
    ("alpine-team", "alpine"),
    ("bwt-alpine", "alpine"),
    ("renault", "alpine"),
    ("alphatauri", "racing-bulls"),
    ("scuderia-alphatauri", "racing-bulls"),
    ("alpha-tauri", "racing-bulls"),
    ("rb", "racing-bulls"),
    ("visa-cash-app-rb", "racing-bulls"),
    ("toro-rosso", "racing-bulls"),
    ("alfa-romeo", "sauber"),
    ("alfa-romeo-racing", "sauber"),
    ("kick-sauber", "sauber"),
    ("stake-team-kick-sauber", "sauber"),
    ("haas-team", "haas"),
    ("moneygram-haas", "haas"),
    ("williams-racing", "williams"),
];

/// Constructor identity that survives sponsor and rebrand name changes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(String);

impl TeamId {
    pub fn resolve(raw: &str) -> Self {
        let slug = slugify(raw);
        let canonical = TEAM_ALIASES
            .iter()
            .find(|(alias, _)| *alias == slug)
            .map(|(_, canonical)| canonical.to_string())
            .unwrap_or(slug);
        Self(canonical)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
