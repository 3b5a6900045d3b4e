//! Normalized topic definitions
//!
//! Every stored article carries exactly one of these topics.

use serde::Deserialize;
use std::fmt;

/// The tracked news topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Politics,
    Economy,
    Social,
    Culture,
    Science,
    Sports,
}

impl Topic {
    /// Converts the topic to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Politics => "politics",
            Self::Economy => "economy",
            Self::Social => "social",
            Self::Culture => "culture",
            Self::Science => "science",
            Self::Sports => "sports",
        }
    }

    /// Parses a topic from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "politics" => Some(Self::Politics),
            "economy" => Some(Self::Economy),
            "social" => Some(Self::Social),
            "culture" => Some(Self::Culture),
            "science" => Some(Self::Science),
            "sports" => Some(Self::Sports),
            _ => None,
        }
    }

    /// Returns all topics
    pub fn all_topics() -> Vec<Self> {
        vec![
            Self::Politics,
            Self::Economy,
            Self::Social,
            Self::Culture,
            Self::Science,
            Self::Sports,
        ]
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
