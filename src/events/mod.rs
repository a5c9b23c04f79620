pub mod channel;
pub mod producer;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use channel::{Delivery, MessageBroker, Subscription};
pub use producer::{EventProducer, TopicProducer};

/// How a specific identity diverges between the two stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyKind {
    /// Present on both sides, but semantic comparison reports inequality.
    Neq,
    /// Present in base, absent from target.
    TargetMissing,
    /// Present in target, absent from base.
    BaseMissing,
}

impl fmt::Display for InconsistencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Neq => f.write_str("neq"),
            Self::TargetMissing => f.write_str("target_missing"),
            Self::BaseMissing => f.write_str("base_missing"),
        }
    }
}

/// Which store the producing validation pass treated as base.
///
/// The repair consumer orients itself from this tag, so one consumer serves
/// both forward and reverse migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Source is base; repairs flow into the target store.
    SrcToDst,
    /// Target is base; repairs flow into the source store.
    DstToSrc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SrcToDst => f.write_str("src_to_dst"),
            Self::DstToSrc => f.write_str("dst_to_src"),
        }
    }
}

/// Notice that one identity diverges between base and target.
///
/// Flat and versionless; events are not deduplicated upstream, so consumers
/// must repair idempotently under replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InconsistentEvent {
    pub id: i64,
    pub kind: InconsistencyKind,
    pub direction: Direction,
}
