//! Engine configuration: loop bounds, reseed cadence, and log verbosity.

use std::fmt;

use seubench_error::{BenchError, Result};
use serde::{Deserialize, Serialize};

/// How much detail the structured log carries for each mismatching sub-block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintMode {
    /// List every mismatching `(index: [expected, actual])` pair, up to the
    /// configured cap.
    #[default]
    Robust,
    /// One aggregate count per tag.
    Terse,
}

impl PrintMode {
    /// Header value for the `printing:` field.
    #[must_use]
    pub const fn header_flag(self) -> u8 {
        match self {
            Self::Robust => 1,
            Self::Terse => 0,
        }
    }
}

/// Number of iterations in the measured region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LoopCountRepr", into = "LoopCountRepr")]
pub enum LoopCount {
    Fixed(u64),
    /// Run until the process is reset externally.
    Unbounded,
}

impl LoopCount {
    /// Whether another iteration is allowed after `completed` iterations.
    #[must_use]
    pub const fn allows(self, completed: u64) -> bool {
        match self {
            Self::Fixed(limit) => completed < limit,
            Self::Unbounded => true,
        }
    }
}

impl fmt::Display for LoopCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(count) => write!(f, "{count}"),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

impl std::str::FromStr for LoopCount {
    type Err = BenchError;

    fn from_str(value: &str) -> Result<Self> {
        if value.eq_ignore_ascii_case("unbounded") {
            return Ok(Self::Unbounded);
        }
        value.parse::<u64>().map(Self::Fixed).map_err(|_| {
            BenchError::invalid_config(
                "loop_count",
                format!("expected a count or \"unbounded\", got {value:?}"),
            )
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum LoopCountRepr {
    Count(u64),
    Word(String),
}

impl TryFrom<LoopCountRepr> for LoopCount {
    type Error = BenchError;

    fn try_from(repr: LoopCountRepr) -> Result<Self> {
        match repr {
            LoopCountRepr::Count(count) => Ok(Self::Fixed(count)),
            LoopCountRepr::Word(word) => word.parse(),
        }
    }
}

impl From<LoopCount> for LoopCountRepr {
    fn from(count: LoopCount) -> Self {
        match count {
            LoopCount::Fixed(count) => Self::Count(count),
            LoopCount::Unbounded => Self::Word("unbounded".to_owned()),
        }
    }
}

/// Descriptive fields printed once in the log header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunHeader {
    pub hw: String,
    pub mitigation: String,
    pub version: String,
    pub facility: String,
}

impl Default for RunHeader {
    fn default() -> Self {
        Self {
            hw: "Zybo ZYNQ7010".to_owned(),
            mitigation: "none".to_owned(),
            version: "0.1-zybo".to_owned(),
            facility: "GSFC 2017".to_owned(),
        }
    }
}

/// Settings consumed by [`crate::IterationEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Iterations between the two synchronization markers.
    pub loop_count: LoopCount,
    /// Iterations run before the start marker; 0 disables warm-up.
    pub warmup_count: u64,
    /// Iterations between forced fresh reseeds.
    pub change_rate: u64,
    pub printing: PrintMode,
    /// Cap on `(index: [expected, actual])` pairs listed per sub-block.
    pub max_logged_pairs: usize,
    /// Emit `# i, total, affected, checksum` lines at cadence boundaries.
    pub heartbeat: bool,
    pub header: RunHeader,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            loop_count: LoopCount::Fixed(2),
            warmup_count: 2,
            change_rate: 250,
            printing: PrintMode::Robust,
            max_logged_pairs: 64,
            heartbeat: true,
            header: RunHeader::default(),
        }
    }
}

impl EngineConfig {
    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.change_rate == 0 {
            return Err(BenchError::invalid_config(
                "change_rate",
                "must be greater than zero",
            ));
        }
        if self.printing == PrintMode::Robust && self.max_logged_pairs == 0 {
            return Err(BenchError::invalid_config(
                "max_logged_pairs",
                "robust printing needs room for at least one pair",
            ));
        }
        Ok(())
    }
}
