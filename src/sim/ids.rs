//! Typed signal identifiers.
//!
//! Joined signals are reported by the simulator under composite ids of the
//! form `cluster_<junction>_<junction>_#<n>more`. The parsing of that format
//! is confined to [`SignalId::cluster_members`].

use serde::{Deserialize, Serialize};

/// Identifier of a traffic signal (a single junction or a joined cluster).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalId(String);

impl SignalId {
    /// Creates a signal id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the id names a joined cluster of junctions.
    #[must_use]
    pub fn is_cluster(&self) -> bool {
        self.0.contains('#')
    }

    /// Junction ids that make up the signal.
    ///
    /// For a plain junction this is the id itself. For a cluster it is every
    /// `_`-separated part after the leading `cluster` tag, up to the part
    /// carrying the `#` suffix.
    #[must_use]
    pub fn cluster_members(&self) -> Vec<&str> {
        if !self.is_cluster() {
            return vec![self.as_str()];
        }
        self.0
            .split('_')
            .skip(1)
            .take_while(|part| !part.contains('#'))
            .filter(|part| !part.is_empty())
            .collect()
    }
}

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SignalId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SignalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
