use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Bodies tracked by the engine.
///
/// Declaration order is the canonical order: in every pair the body that is
/// declared first is `body1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Body {
    Sun,
    Moon,
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
}

impl Body {
    pub const ALL: [Body; 10] = [
        Body::Sun,
        Body::Moon,
        Body::Mercury,
        Body::Venus,
        Body::Mars,
        Body::Jupiter,
        Body::Saturn,
        Body::Uranus,
        Body::Neptune,
        Body::Pluto,
    ];

    /// Upper-case tag used in storage and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Body::Sun => "SUN",
            Body::Moon => "MOON",
            Body::Mercury => "MERCURY",
            Body::Venus => "VENUS",
            Body::Mars => "MARS",
            Body::Jupiter => "JUPITER",
            Body::Saturn => "SATURN",
            Body::Uranus => "URANUS",
            Body::Neptune => "NEPTUNE",
            Body::Pluto => "PLUTO",
        }
    }

    /// Index into [`Body::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// The Moon covers an orb window in hours, so its pairs need the fine scan step.
    pub fn is_fast(self) -> bool {
        matches!(self, Body::Moon)
    }

    /// All 45 unordered pairs, each in canonical order, in a fixed sequence.
    pub fn pairs() -> impl Iterator<Item = (Body, Body)> {
        let n = Body::ALL.len();
        (0..n).flat_map(move |i| (i + 1..n).map(move |j| (Body::ALL[i], Body::ALL[j])))
    }

    /// Order two bodies canonically.
    pub fn canonical_pair(a: Body, b: Body) -> (Body, Body) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown body: {0}")]
pub struct UnknownBody(pub String);

impl FromStr for Body {
    type Err = UnknownBody;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Body::ALL
            .into_iter()
            .find(|b| b.name() == upper)
            .ok_or_else(|| UnknownBody(s.to_string()))
    }
}
