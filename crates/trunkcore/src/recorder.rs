//! Recorder capability contract
//!
//! A [`Recorder`] captures one voice channel while it is
//! bound to a [`Call`](crate::Call). This crate never looks
//! inside a recorder. Filters, demodulators, and vocoders are
//! the implementation's business. Any type which satisfies
//! the trait is interchangeable, including the pure-software
//! [`SoftRecorder`](soft::SoftRecorder).
//!
//! Recorders are owned by a [`RecorderPool`](crate::RecorderPool).
//! Everything else refers to them by [`RecorderHandle`].

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::activity::UnitId;
use crate::call::Call;
use crate::numbering::SourceId;

pub mod soft;

/// Recorder lifecycle state
///
/// ```txt
///  AVAILABLE --start()--> ACTIVE --stop()--> INACTIVE
///      ^                                        |
///      +---------------reset()------------------+
/// ```
///
/// A recorder which has just been released is `INACTIVE`.
/// It becomes eligible for a new call only after a reset
/// sweep returns it to `AVAILABLE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::EnumIter)]
pub enum RecorderState {
    /// Idle and ready for assignment
    Available,

    /// Bound to a call
    Active,

    /// Released; awaiting reset
    Inactive,
}

impl AsRef<str> for RecorderState {
    fn as_ref(&self) -> &str {
        match self {
            RecorderState::Available => "available",
            RecorderState::Active => "active",
            RecorderState::Inactive => "inactive",
        }
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Recorder kind
///
/// Kind is data. It only selects which pool a recorder
/// belongs to. Only the *trunked* kinds are subject to
/// admission control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::EnumIter)]
pub enum RecorderKind {
    /// Trunked digital voice
    Digital,

    /// Trunked analog voice
    Analog,

    /// Conventional digital channel
    DigitalConventional,

    /// Conventional analog channel
    AnalogConventional,

    /// Raw capture for debugging
    Debug,

    /// Raw baseband capture for signal diagnostics
    Diagnostic,
}

impl RecorderKind {
    /// True for the kinds subject to admission control
    pub fn is_trunked(&self) -> bool {
        matches!(self, RecorderKind::Digital | RecorderKind::Analog)
    }

    /// True for the conventional kinds
    pub fn is_conventional(&self) -> bool {
        matches!(
            self,
            RecorderKind::DigitalConventional | RecorderKind::AnalogConventional
        )
    }

    /// True for analog voice kinds
    pub fn is_analog(&self) -> bool {
        matches!(
            self,
            RecorderKind::Analog | RecorderKind::AnalogConventional
        )
    }
}

impl AsRef<str> for RecorderKind {
    fn as_ref(&self) -> &str {
        match self {
            RecorderKind::Digital => "digital",
            RecorderKind::Analog => "analog",
            RecorderKind::DigitalConventional => "digital conventional",
            RecorderKind::AnalogConventional => "analog conventional",
            RecorderKind::Debug => "debug",
            RecorderKind::Diagnostic => "diagnostic",
        }
    }
}

impl fmt::Display for RecorderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// One contiguous burst of captured voice
#[derive(Clone, Debug, PartialEq)]
pub struct Transmission {
    /// Unit which was transmitting, if known
    pub source: Option<UnitId>,

    /// Wall-clock start of the burst
    pub start_time: DateTime<Utc>,

    /// Wall-clock end of the burst
    pub stop_time: DateTime<Utc>,

    /// Offset of the burst into the recording, in seconds
    pub start_offset: f64,

    /// Length of the burst, in seconds
    pub length: f64,

    /// Decode errors seen during the burst
    pub error_count: u32,

    /// Signal spikes seen during the burst
    pub spike_count: u32,
}

/// Non-owning reference to a pooled recorder
///
/// Handles are plain data. They name a recorder by its
/// owning source, kind, and pool position, and carry the
/// recorder number so a stale handle can be detected.
///
/// Every time a pool binds a recorder to a call, the
/// recorder's activation count advances. The handle given
/// to the call records it. Once the recorder is bound
/// again, handles from earlier activations no longer reach
/// it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecorderHandle {
    source: SourceId,
    kind: RecorderKind,
    index: usize,
    num: u32,
    activation: u64,
}

impl RecorderHandle {
    pub(crate) fn new(source: SourceId, kind: RecorderKind, index: usize, num: u32, activation: u64) -> Self {
        Self {
            source,
            kind,
            index,
            num,
            activation,
        }
    }

    /// Owning source
    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Recorder kind, which names the pool
    pub fn kind(&self) -> RecorderKind {
        self.kind
    }

    /// Position within the pool
    pub fn index(&self) -> usize {
        self.index
    }

    /// Recorder number
    pub fn num(&self) -> u32 {
        self.num
    }

    /// Activation this handle was issued for
    ///
    /// Zero for handles which name a recorder that was
    /// never bound to a call.
    pub fn activation(&self) -> u64 {
        self.activation
    }
}

impl fmt::Display for RecorderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} recorder {} (source {}, slot {})",
            self.kind, self.num, self.source, self.index
        )
    }
}

/// Everything a recorder factory needs to know
///
/// A [`SourceBuilder`](crate::SourceBuilder) hands one of
/// these to its factory for every recorder it creates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecorderSpec {
    /// Unique recorder number
    pub num: u32,

    /// Kind of recorder to create
    pub kind: RecorderKind,

    /// Owning source
    pub source: SourceId,

    /// Source center frequency, in Hz
    pub center: f64,

    /// Source sampling rate, in Hz
    pub rate: f64,
}

/// A schedulable voice recorder
///
/// Implementations must follow the [`RecorderState`]
/// lifecycle. None of these methods may block: starting
/// the underlying capture pipeline is fire-and-forget, and
/// failure is reported as `false` from
/// [`start()`](Recorder::start).
pub trait Recorder: Send + fmt::Debug {
    /// Unique recorder number
    fn num(&self) -> u32;

    /// Recorder kind
    fn kind(&self) -> RecorderKind;

    /// Current lifecycle state
    fn state(&self) -> RecorderState;

    /// Bind to `call` and begin recording
    ///
    /// Transitions `AVAILABLE` → `ACTIVE`. Returns `false`,
    /// without changing state, if the recorder is not
    /// `AVAILABLE` or cannot start.
    fn start(&mut self, call: &Call) -> bool;

    /// Stop recording
    ///
    /// Transitions `ACTIVE` → `INACTIVE` and flushes any
    /// in-flight transmission to the transmission list.
    fn stop(&mut self);

    /// Acknowledge a release
    ///
    /// Transitions `INACTIVE` → `AVAILABLE`. Returns `false`
    /// if the recorder was in any other state.
    fn reset(&mut self) -> bool;

    /// Re-attribute the in-flight recording to `unit`
    ///
    /// Best effort. Does nothing unless `ACTIVE`.
    fn set_source_unit(&mut self, unit: UnitId);

    /// Length of the current recording, in seconds
    fn current_length(&self) -> f64;

    /// Time since voice was last written
    fn since_last_write(&self, now: DateTime<Utc>) -> Duration;

    /// True when no signal is present
    ///
    /// A recorder which is not `ACTIVE` is always idle.
    fn is_idle(&self) -> bool;

    /// Completed transmissions, in order
    fn transmission_list(&self) -> Vec<Transmission>;

    /// Discard completed transmissions
    fn clear_transmission_list(&mut self);

    /// Tuned frequency, in Hz, or zero if untuned
    fn freq(&self) -> f64 {
        0.0
    }
}
