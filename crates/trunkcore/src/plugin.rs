//! Plugin notification hooks
//!
//! Plugins observe call activity without influencing it.
//! Every hook is fire-and-forget: the scheduler calls it
//! and moves on. Hooks are never invoked while a recorder
//! pool is locked, so a slow plugin cannot stall allocation.
//! Plugins should still return quickly and hand any real
//! work to their own threads.

use std::fmt;

use crate::activity::UnitId;
use crate::call::Call;
use crate::recorder::RecorderHandle;
use crate::system::System;

/// Kind of unit signaling event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::EnumIter)]
pub enum SignalKind {
    /// Ordinary unit activity, like keying up
    Normal,

    /// Unit declared an emergency
    Emergency,

    /// Emergency acknowledged
    EmergencyAck,

    /// Radio check request
    RadioCheck,

    /// Radio check acknowledged
    RadioCheckAck,

    /// Radio stun (disable) request
    RadioStun,

    /// Radio stun acknowledged
    RadioStunAck,

    /// Radio revive (re-enable) request
    RadioRevive,

    /// Radio revive acknowledged
    RadioReviveAck,

    /// Unrecognized signaling
    Unknown,
}

impl AsRef<str> for SignalKind {
    fn as_ref(&self) -> &str {
        match self {
            SignalKind::Normal => "normal",
            SignalKind::Emergency => "emergency",
            SignalKind::EmergencyAck => "emergency ack",
            SignalKind::RadioCheck => "radio check",
            SignalKind::RadioCheckAck => "radio check ack",
            SignalKind::RadioStun => "radio stun",
            SignalKind::RadioStunAck => "radio stun ack",
            SignalKind::RadioRevive => "radio revive",
            SignalKind::RadioReviveAck => "radio revive ack",
            SignalKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Observer of call lifecycle events
///
/// All methods have empty default implementations;
/// implement only the ones you need.
pub trait Plugin: Send + Sync {
    /// A unit was attributed to a call, or sent signaling
    ///
    /// Fired whenever a call learns of a new source unit.
    /// `signaling` names the signaling protocol, if the
    /// event came from in-band signaling.
    fn unit_signal(
        &self,
        _unit: UnitId,
        _signaling: Option<&str>,
        _kind: SignalKind,
        _call: Option<&Call>,
        _system: Option<&System>,
        _recorder: Option<RecorderHandle>,
    ) {
    }

    /// A call began recording
    fn call_start(&self, _call: &Call) {}

    /// A call was concluded and handed off
    fn call_end(&self, _call: &Call) {}
}
