use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::McpmError;

/// Registries a version can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Modrinth,
    Hangar,
    Geyser,
    /// PaperMC's Fill service; serves server jars only.
    Paper,
}

/// Registry used when a manifest entry names none.
pub const DEFAULT_PLUGIN_SOURCE: Source = Source::Modrinth;

impl Source {
    pub const ALL: [Source; 4] = [Source::Modrinth, Source::Hangar, Source::Geyser, Source::Paper];

    /// Identifier used in `mcpm.toml` and `mcpm.lock`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Modrinth => "modrinth",
            Source::Hangar => "hangar",
            Source::Geyser => "geyser",
            Source::Paper => "paper",
        }
    }

    pub fn is_plugin_registry(&self) -> bool {
        !matches!(self, Source::Paper)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Modrinth => write!(f, "Modrinth"),
            Source::Hangar => write!(f, "Hangar"),
            Source::Geyser => write!(f, "GeyserMC"),
            Source::Paper => write!(f, "Paper"),
        }
    }
}

impl FromStr for Source {
    type Err = McpmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|source| source.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| McpmError::Manifest(format!("unknown plugin source '{}'", s)))
    }
}

/// Server software a project runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerKind {
    Paper,
    Folia,
    Velocity,
    Waterfall,
    Travertine,
}

impl ServerKind {
    pub const ALL: [ServerKind; 5] = [
        ServerKind::Paper,
        ServerKind::Folia,
        ServerKind::Velocity,
        ServerKind::Waterfall,
        ServerKind::Travertine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerKind::Paper => "paper",
            ServerKind::Folia => "folia",
            ServerKind::Velocity => "velocity",
            ServerKind::Waterfall => "waterfall",
            ServerKind::Travertine => "travertine",
        }
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerKind {
    type Err = McpmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServerKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                McpmError::Manifest(format!(
                    "unsupported loader '{}' (expected one of: paper, folia, velocity, waterfall, travertine)",
                    s
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_round_trip_through_their_identifiers() {
        for source in Source::ALL {
            assert_eq!(source.as_str().parse::<Source>().unwrap(), source);
            let json = serde_json::to_string(&source).unwrap();
            assert_eq!(json, format!("\"{}\"", source.as_str()));
        }
    }

    #[test]
    fn only_the_server_registry_is_not_a_plugin_registry() {
        assert!(Source::Modrinth.is_plugin_registry());
        assert!(Source::Hangar.is_plugin_registry());
        assert!(Source::Geyser.is_plugin_registry());
        assert!(!Source::Paper.is_plugin_registry());
    }

    #[test]
    fn unknown_loader_is_rejected() {
        assert_eq!("Velocity".parse::<ServerKind>().unwrap(), ServerKind::Velocity);
        assert!("forge".parse::<ServerKind>().is_err());
    }
}
