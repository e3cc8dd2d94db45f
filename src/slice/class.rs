//! Traffic classes (slice types) and their fixed codepoint/name tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Service class of a slice. The declaration order is the scheduler's queue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SliceType {
    #[serde(rename = "URLLC", alias = "urllc")]
    Urllc,
    #[serde(rename = "eMBB", alias = "embb")]
    Embb,
    #[serde(rename = "mMTC", alias = "mmtc")]
    Mmtc,
}

impl SliceType {
    pub const COUNT: usize = 3;
    pub const ALL: [SliceType; SliceType::COUNT] =
        [SliceType::Urllc, SliceType::Embb, SliceType::Mmtc];

    /// Class used for packets whose DSCP matches no class.
    pub const DEFAULT: SliceType = SliceType::Embb;

    /// Index of the class queue inside a slice scheduler.
    pub fn index(self) -> usize {
        match self {
            SliceType::Urllc => 0,
            SliceType::Embb => 1,
            SliceType::Mmtc => 2,
        }
    }

    pub fn from_index(idx: usize) -> Option<SliceType> {
        SliceType::ALL.get(idx).copied()
    }

    /// DSCP codepoint marked on the class's packets.
    pub fn dscp(self) -> u8 {
        match self {
            SliceType::Urllc => 46,
            SliceType::Embb => 40,
            SliceType::Mmtc => 8,
        }
    }

    pub fn from_dscp(dscp: u8) -> Option<SliceType> {
        match dscp {
            46 => Some(SliceType::Urllc),
            40 => Some(SliceType::Embb),
            8 => Some(SliceType::Mmtc),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SliceType::Urllc => "URLLC",
            SliceType::Embb => "eMBB",
            SliceType::Mmtc => "mMTC",
        }
    }
}

impl fmt::Display for SliceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SliceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SliceType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown slice type '{s}' (expected URLLC, eMBB or mMTC)"))
    }
}
