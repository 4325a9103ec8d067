//! Inbound control channel activity

use std::fmt;

/// Radio unit id
pub type UnitId = u32;

/// How the activity was learned
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    /// A channel grant: the start of a transmission
    Grant,

    /// A grant update: an ongoing transmission, repeated
    Update,
}

impl AsRef<str> for ActivityKind {
    fn as_ref(&self) -> &str {
        match self {
            ActivityKind::Grant => "grant",
            ActivityKind::Update => "update",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// A single activity report from the control channel
///
/// Activity names a talkgroup, the frequency (Hz) the
/// talkgroup is using, and possibly the unit which is
/// transmitting.
///
/// ```
/// use trunkcore::{Activity, ActivityKind};
///
/// let act = Activity::grant(0, 1001, 851.0125e6)
///     .with_source(4_201_337)
///     .with_emergency(true);
/// assert_eq!(ActivityKind::Grant, act.kind);
/// assert_eq!(Some(4_201_337), act.source);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Activity {
    /// Grant or update
    pub kind: ActivityKind,

    /// Trunked system number
    pub sys_num: u32,

    /// Talkgroup number
    pub talkgroup: u32,

    /// Voice channel frequency, in Hz
    pub freq: f64,

    /// Transmitting unit, if known
    pub source: Option<UnitId>,

    /// Encrypted voice
    pub encrypted: bool,

    /// Emergency call
    pub emergency: bool,

    /// Full duplex
    pub duplex: bool,

    /// Digital mode flag reported by the control channel
    pub mode: bool,

    /// Phase 2 TDMA voice channel
    pub phase2_tdma: bool,

    /// TDMA timeslot
    pub tdma_slot: u8,
}

impl Activity {
    /// Channel grant with no flags set
    pub fn grant(sys_num: u32, talkgroup: u32, freq: f64) -> Self {
        Self::new(ActivityKind::Grant, sys_num, talkgroup, freq)
    }

    /// Grant update with no flags set
    pub fn update(sys_num: u32, talkgroup: u32, freq: f64) -> Self {
        Self::new(ActivityKind::Update, sys_num, talkgroup, freq)
    }

    /// Activity with no flags set
    pub fn new(kind: ActivityKind, sys_num: u32, talkgroup: u32, freq: f64) -> Self {
        Self {
            kind,
            sys_num,
            talkgroup,
            freq,
            source: None,
            encrypted: false,
            emergency: false,
            duplex: false,
            mode: false,
            phase2_tdma: false,
            tdma_slot: 0,
        }
    }

    /// Attribute the activity to a unit
    pub fn with_source(mut self, unit: UnitId) -> Self {
        self.source = Some(unit);
        self
    }

    /// Set the emergency flag
    pub fn with_emergency(mut self, emergency: bool) -> Self {
        self.emergency = emergency;
        self
    }

    /// Set the encryption flag
    pub fn with_encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    /// Phase 2 TDMA on the given slot
    pub fn with_tdma_slot(mut self, slot: u8) -> Self {
        self.phase2_tdma = true;
        self.tdma_slot = slot;
        self
    }
}
