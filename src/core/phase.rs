use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use super::error::{Result, SyncError};

/// Traffic-shifting phase of an online migration.
///
/// Exactly one phase is active at any instant. The names double as the wire
/// names an external control plane uses to flip phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    /// Writes go to the source store only.
    SrcOnly = 0,
    /// Source is authoritative; target is written best-effort.
    SrcFirst = 1,
    /// Target is authoritative; source is written best-effort.
    DstFirst = 2,
    /// Writes go to the target store only.
    DstOnly = 3,
}

impl Phase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SrcOnly => "src_only",
            Self::SrcFirst => "src_first",
            Self::DstFirst => "dst_first",
            Self::DstOnly => "dst_only",
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::SrcOnly),
            1 => Some(Self::SrcFirst),
            2 => Some(Self::DstFirst),
            3 => Some(Self::DstOnly),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "src_only" => Ok(Self::SrcOnly),
            "src_first" => Ok(Self::SrcFirst),
            "dst_first" => Ok(Self::DstFirst),
            "dst_only" => Ok(Self::DstOnly),
            other => Err(SyncError::UnknownPhaseName(other.to_string())),
        }
    }
}

/// Lock-free holder of the active phase.
///
/// The phase is stored as a raw `u8` tag in a single atomic, so readers never
/// block and a swap is observed by the very next write that loads the cell.
/// The tag carries no dependent payload; relaxed ordering is sufficient.
pub struct PhaseCell {
    tag: AtomicU8,
}

impl PhaseCell {
    pub fn new(phase: Phase) -> Self {
        Self {
            tag: AtomicU8::new(phase as u8),
        }
    }

    /// Swap in a new phase.
    pub fn store(&self, phase: Phase) {
        self.tag.store(phase as u8, Ordering::Relaxed);
    }

    /// Swap in a raw phase tag as received from an external control plane.
    ///
    /// An out-of-range tag is not rejected here; it surfaces as
    /// [`SyncError::UnknownPhase`] on the next [`PhaseCell::load`], failing
    /// the write that observed it before either store is touched.
    pub fn store_raw(&self, tag: u8) {
        self.tag.store(tag, Ordering::Relaxed);
    }

    /// Read the active phase, rejecting unknown tags.
    pub fn load(&self) -> Result<Phase> {
        let tag = self.tag.load(Ordering::Relaxed);
        Phase::from_tag(tag).ok_or(SyncError::UnknownPhase(tag))
    }
}
