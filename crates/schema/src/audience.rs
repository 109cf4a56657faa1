//! Audiences and per-field visibility
//!
//! Every field carries a fixed-shape [`VisibilityMatrix`] with one entry per
//! [`Audience`]. The projector reads exactly one entry per field per call;
//! nothing else in the crate decides what a consumer may see.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseAudienceError;

/// The fixed set of consumers of projected component data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    /// In-game UI shown to the player
    Player,
    /// Prompt text sent to the language model
    Llm,
    /// Another autonomous agent perceiving this entity
    Agent,
    /// The human operator outside the fiction
    User,
    /// Developer tooling (inspectors, debug panels)
    Dev,
}

impl Audience {
    /// All audiences in declaration order.
    pub const ALL: [Audience; 5] = [
        Audience::Player,
        Audience::Llm,
        Audience::Agent,
        Audience::User,
        Audience::Dev,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Llm => "llm",
            Self::Agent => "agent",
            Self::User => "user",
            Self::Dev => "dev",
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Audience {
    type Err = ParseAudienceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "player" => Ok(Self::Player),
            "llm" => Ok(Self::Llm),
            "agent" => Ok(Self::Agent),
            "user" => Ok(Self::User),
            "dev" => Ok(Self::Dev),
            _ => Err(ParseAudienceError(s.to_string())),
        }
    }
}

/// How a single field appears to a single audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Omitted from the projection entirely
    Hidden,
    /// Raw value included
    #[default]
    Visible,
    /// Passed through a summarization hook instead of included raw
    Summarized,
}

/// One [`Visibility`] per audience.
///
/// Adding an audience is a compile error at every construction site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisibilityMatrix {
    pub player: Visibility,
    pub llm: Visibility,
    pub agent: Visibility,
    pub user: Visibility,
    pub dev: Visibility,
}

impl Default for VisibilityMatrix {
    fn default() -> Self {
        Self::uniform(Visibility::Visible)
    }
}

impl VisibilityMatrix {
    /// Same visibility for every audience.
    pub const fn uniform(visibility: Visibility) -> Self {
        Self {
            player: visibility,
            llm: visibility,
            agent: visibility,
            user: visibility,
            dev: visibility,
        }
    }

    /// Visible to `audiences`, hidden from everyone else.
    pub fn visible_only_to(audiences: &[Audience]) -> Self {
        audiences
            .iter()
            .fold(Self::uniform(Visibility::Hidden), |matrix, audience| {
                matrix.with(*audience, Visibility::Visible)
            })
    }

    pub fn get(&self, audience: Audience) -> Visibility {
        match audience {
            Audience::Player => self.player,
            Audience::Llm => self.llm,
            Audience::Agent => self.agent,
            Audience::User => self.user,
            Audience::Dev => self.dev,
        }
    }

    pub fn set(&mut self, audience: Audience, visibility: Visibility) {
        let slot = match audience {
            Audience::Player => &mut self.player,
            Audience::Llm => &mut self.llm,
            Audience::Agent => &mut self.agent,
            Audience::User => &mut self.user,
            Audience::Dev => &mut self.dev,
        };
        *slot = visibility;
    }

    /// Returns a copy with one audience changed.
    pub fn with(mut self, audience: Audience, visibility: Visibility) -> Self {
        self.set(audience, visibility);
        self
    }

    /// Audiences for which the field is not hidden.
    pub fn audiences_seeing(&self) -> Vec<Audience> {
        Audience::ALL
            .into_iter()
            .filter(|audience| self.get(*audience) != Visibility::Hidden)
            .collect()
    }
}
