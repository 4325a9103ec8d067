//! Call state machine
//!
//! A [`Call`] tracks one burst of activity on a talkgroup,
//! from the first grant until it is handed to the
//! [`CallConcluder`]. Calls are created by a [`CallFactory`]
//! in the `MONITORING` state. They enter `RECORDING` only
//! when a source binds a recorder to them; see
//! [`Source::allocate()`](crate::Source::allocate).
//!
//! ```txt
//!              allocate() ok
//!  MONITORING -------------> RECORDING
//!      |   ^                     |
//!      |   +---- supersede() ----+
//!      |                         |
//!      +--- conclude_call() -----+---> CONCLUDED
//! ```
//!
//! `conclude_call()` only acts on `RECORDING` calls and on
//! `MONITORING` calls which have been superseded. It runs at
//! most once.

use std::fmt;
use std::sync::Arc;

#[cfg(not(test))]
use log::{debug, error, info, warn};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as error;
#[cfg(test)]
use std::println as info;
#[cfg(test)]
use std::println as warn;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use trunktags::Talkgroup;

use crate::activity::{Activity, ActivityKind, UnitId};
use crate::concluder::{CallConcluder, RecordingConfig};
use crate::numbering::{Numbering, SourceId};
use crate::plugin::SignalKind;
use crate::recorder::{Recorder, RecorderHandle, RecorderKind, RecorderState, Transmission};
use crate::source::SourceLookup;
use crate::system::System;

/// Call lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::EnumIter)]
pub enum CallState {
    /// Tracked, but not recorded
    ///
    /// See [`MonitoringState`] for the reason.
    Monitoring,

    /// Bound to a recorder
    Recording,

    /// Handed to the concluder; terminal
    Concluded,
}

impl AsRef<str> for CallState {
    fn as_ref(&self) -> &str {
        match self {
            CallState::Monitoring => "monitoring",
            CallState::Recording => "recording",
            CallState::Concluded => "concluded",
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Why a call is not being recorded
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::EnumIter)]
pub enum MonitoringState {
    /// Not yet evaluated for admission
    Unspecified,

    /// The talkgroup is never recorded
    IgnoredTalkgroup,

    /// No recorder capacity at admission time
    NoRecorder,

    /// A newer call has taken over
    Superseded,
}

impl AsRef<str> for MonitoringState {
    fn as_ref(&self) -> &str {
        match self {
            MonitoringState::Unspecified => "unspecified",
            MonitoringState::IgnoredTalkgroup => "ignored talkgroup",
            MonitoringState::NoRecorder => "no recorder",
            MonitoringState::Superseded => "superseded",
        }
    }
}

impl fmt::Display for MonitoringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// A rejected call update
#[derive(Error, Clone, Debug, PartialEq)]
pub enum CallError {
    /// The activity belongs to some other call
    #[error(
        "update mismatch: call is talkgroup {call_talkgroup} at {call_freq} Hz, \
         update is talkgroup {talkgroup} at {freq} Hz"
    )]
    Mismatch {
        /// Talkgroup of the call
        call_talkgroup: u32,

        /// Frequency of the call (Hz)
        call_freq: f64,

        /// Talkgroup of the activity
        talkgroup: u32,

        /// Frequency of the activity (Hz)
        freq: f64,
    },

    /// The call has already been concluded
    #[error("call {call_num} has already concluded")]
    Concluded {
        /// Call number
        call_num: u64,
    },
}

/// Snapshot of the recorder bound to a call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecorderStats {
    /// Recorder number
    pub num: u32,

    /// Owning source
    pub source: SourceId,

    /// Recorder kind
    pub kind: RecorderKind,

    /// Recorder state, if the recorder could be reached
    pub state: Option<RecorderState>,
}

/// Snapshot of a call, for status reporting
#[derive(Clone, Debug, PartialEq)]
pub struct CallStats {
    /// `sysnum_talkgroup_starttime`
    pub id: String,

    /// Call number
    pub call_num: u64,

    /// Frequency (Hz)
    pub freq: f64,

    /// System number
    pub sys_num: u32,

    /// System short name
    pub short_name: String,

    /// Talkgroup number
    pub talkgroup: u32,

    /// Talkgroup tag
    pub talkgroup_tag: String,

    /// Time since start, or start to stop
    pub elapsed: Duration,

    /// Recording length, in seconds
    pub length: f64,

    /// Lifecycle state
    pub state: CallState,

    /// Monitoring sub-state
    pub monitoring_state: MonitoringState,

    /// Talkgroup priority
    pub priority: Option<i32>,

    /// Phase 2 TDMA
    pub phase2: bool,

    /// Conventional channel
    pub conventional: bool,

    /// Encrypted voice
    pub encrypted: bool,

    /// Emergency
    pub emergency: bool,

    /// Digital mode flag
    pub mode: bool,

    /// Full duplex
    pub duplex: bool,

    /// Start time
    pub start_time: DateTime<Utc>,

    /// Stop time, once concluded
    pub stop_time: Option<DateTime<Utc>>,

    /// Current unit
    pub source_unit: Option<UnitId>,

    /// Bound recorder
    pub recorder: Option<RecorderStats>,
}

/// Creates calls
///
/// The factory draws call numbers from an injected
/// [`Numbering`] and stamps every call with the shared
/// [`System`] and [`RecordingConfig`].
#[derive(Clone, Debug)]
pub struct CallFactory {
    system: Arc<System>,
    config: Arc<RecordingConfig>,
    numbering: Arc<Numbering>,
}

impl CallFactory {
    /// New factory
    pub fn new(system: Arc<System>, config: Arc<RecordingConfig>, numbering: Arc<Numbering>) -> Self {
        Self {
            system,
            config,
            numbering,
        }
    }

    /// Shared system
    pub fn system(&self) -> &Arc<System> {
        &self.system
    }

    /// Shared recording configuration
    pub fn config(&self) -> &Arc<RecordingConfig> {
        &self.config
    }

    /// Create a trunked call from its first activity
    ///
    /// The call copies its priority and tag from the
    /// `talkgroup`, if the talkgroup is known. A unit named
    /// by the activity is attributed immediately, and the
    /// system's plugins are told about it.
    pub fn make(&self, activity: &Activity, talkgroup: Option<&Talkgroup>, now: DateTime<Utc>) -> Call {
        if activity.sys_num != self.system.sys_num() {
            warn!(
                "[{}]\tactivity for system {} on talkgroup {}",
                self.system.short_name(),
                activity.sys_num,
                activity.talkgroup
            );
        }

        let mut call = Call::new(
            self.numbering.next_call(),
            self.system.clone(),
            self.config.clone(),
            activity.talkgroup,
            activity.freq,
            now,
        );
        call.encrypted = activity.encrypted;
        call.emergency = activity.emergency;
        call.duplex = activity.duplex;
        call.mode = activity.mode;
        call.phase2_tdma = activity.phase2_tdma;
        call.set_tdma_slot(activity.tdma_slot);
        call.was_update = activity.kind == ActivityKind::Update;

        if let Some(tg) = talkgroup {
            call.priority = Some(tg.priority());
            call.analog = tg.mode().is_analog();
            call.set_talkgroup_tag(tg.alpha_tag());
        }

        if let Some(unit) = activity.source {
            call.source_unit = Some(unit);
            call.notify_unit(unit);
        }

        debug!("{}\tcreated from {}", call, activity.kind);
        call
    }

    /// Create a call on a conventional channel
    ///
    /// Conventional calls have no priority. They are bound
    /// to a dedicated recorder rather than admitted.
    pub fn make_conventional(&self, talkgroup: u32, freq: f64, now: DateTime<Utc>) -> Call {
        let mut call = Call::new(
            self.numbering.next_call(),
            self.system.clone(),
            self.config.clone(),
            talkgroup,
            freq,
            now,
        );
        call.conventional = true;
        debug!("{}\tcreated conventional call", call);
        call
    }
}

/// A tracked call
///
/// See the [module documentation](crate::call).
///
/// A call owns the handle of the recorder bound to it.
/// Calls cannot be cloned, so the handle can never be
/// released twice.
#[derive(Debug)]
pub struct Call {
    call_num: u64,
    system: Arc<System>,
    config: Arc<RecordingConfig>,
    talkgroup: u32,
    talkgroup_tag: String,
    talkgroup_display: String,
    freq: f64,
    source_unit: Option<UnitId>,
    state: CallState,
    monitoring: MonitoringState,
    priority: Option<i32>,
    recorder: Option<RecorderHandle>,
    debug_recorder: Option<RecorderHandle>,
    diagnostic_recorder: Option<RecorderHandle>,
    transmissions: Vec<Transmission>,
    start_time: DateTime<Utc>,
    last_update: DateTime<Utc>,
    stop_time: Option<DateTime<Utc>>,
    final_length: f64,
    idle_count: u32,
    encrypted: bool,
    emergency: bool,
    duplex: bool,
    mode: bool,
    phase2_tdma: bool,
    tdma_slot: u8,
    analog: bool,
    conventional: bool,
    was_update: bool,
}

impl Call {
    fn new(
        call_num: u64,
        system: Arc<System>,
        config: Arc<RecordingConfig>,
        talkgroup: u32,
        freq: f64,
        now: DateTime<Utc>,
    ) -> Self {
        let mut out = Self {
            call_num,
            system,
            config,
            talkgroup,
            talkgroup_tag: String::new(),
            talkgroup_display: String::new(),
            freq,
            source_unit: None,
            state: CallState::Monitoring,
            monitoring: MonitoringState::Unspecified,
            priority: None,
            recorder: None,
            debug_recorder: None,
            diagnostic_recorder: None,
            transmissions: Vec::new(),
            start_time: now,
            last_update: now,
            stop_time: None,
            final_length: 0.0,
            idle_count: 0,
            encrypted: false,
            emergency: false,
            duplex: false,
            mode: false,
            phase2_tdma: false,
            tdma_slot: 0,
            analog: false,
            conventional: false,
            was_update: false,
        };
        out.update_talkgroup_display();
        out
    }

    /// Apply a follow-on activity report
    ///
    /// The activity must name this call's talkgroup and
    /// frequency. If it does not, nothing about the call
    /// changes and [`CallError::Mismatch`] is returned. This
    /// holds in every state, including a superseded call
    /// which still holds its recorder. Rejected updates are
    /// logged here at `warn`.
    ///
    /// Otherwise the last-update time is refreshed. If the
    /// activity names a new unit, the unit is attributed to
    /// the call and `Ok(true)` is returned.
    pub fn update<L>(&mut self, activity: &Activity, sources: &L, now: DateTime<Utc>) -> Result<bool, CallError>
    where
        L: SourceLookup + ?Sized,
    {
        if self.state == CallState::Concluded {
            let err = CallError::Concluded {
                call_num: self.call_num,
            };
            warn!("{}\tupdate dropped: {}", self, err);
            return Err(err);
        }

        if activity.freq != self.freq || activity.talkgroup != self.talkgroup {
            let err = CallError::Mismatch {
                call_talkgroup: self.talkgroup,
                call_freq: self.freq,
                talkgroup: activity.talkgroup,
                freq: activity.freq,
            };
            warn!("{}\tupdate dropped: {}", self, err);
            return Err(err);
        }

        self.last_update = now;
        Ok(match activity.source {
            Some(unit) => self.add_source(unit, sources),
            None => false,
        })
    }

    /// Attribute the call to `unit`
    ///
    /// Returns `false` if the unit is already the current
    /// source. A recording call forwards the new unit to its
    /// recorder. Plugins are notified.
    pub fn add_source<L>(&mut self, unit: UnitId, sources: &L) -> bool
    where
        L: SourceLookup + ?Sized,
    {
        if self.source_unit == Some(unit) {
            return false;
        }
        self.source_unit = Some(unit);

        if self.state == CallState::Recording {
            if let Some(handle) = self.recorder {
                if reach(sources, handle, |rec| rec.set_source_unit(unit)).is_none() {
                    warn!("{}\tcannot reach {} to set unit {}", self, handle, unit);
                }
            }
        }

        self.notify_unit(unit);
        true
    }

    fn notify_unit(&self, unit: UnitId) {
        for plugin in self.system.plugins() {
            plugin.unit_signal(
                unit,
                None,
                SignalKind::Normal,
                Some(self),
                Some(self.system.as_ref()),
                self.recorder,
            );
        }
    }

    /// Retire this call in favor of a newer one
    ///
    /// The call returns to `MONITORING` with the
    /// `SUPERSEDED` sub-state. Any bound recorder stays bound
    /// until [`conclude_call()`](Call::conclude_call), and
    /// admission will not bind another. Returns `false` if
    /// the call has already concluded.
    pub fn supersede(&mut self) -> bool {
        if self.state == CallState::Concluded {
            return false;
        }
        self.state = CallState::Monitoring;
        self.monitoring = MonitoringState::Superseded;
        true
    }

    /// Conclude the call and hand it off
    ///
    /// Acts only when the call is `RECORDING`, or is
    /// `MONITORING` and superseded. In that case:
    ///
    /// 1. the stop time is stamped `now`;
    /// 2. any bound recorder is stopped, its length and
    ///    transmissions are pulled into the call, and it is
    ///    returned to its pool as `INACTIVE`;
    /// 3. debug and diagnostic recorders are released;
    /// 4. the call becomes `CONCLUDED`;
    /// 5. the `concluder` and every plugin's `call_end()`
    ///    receive the call.
    ///
    /// A call without a recorder concludes with a length of
    /// zero. Returns `true` if the call was handed off. A
    /// second invocation does nothing and returns `false`.
    pub fn conclude_call<L>(&mut self, sources: &L, concluder: &dyn CallConcluder, now: DateTime<Utc>) -> bool
    where
        L: SourceLookup + ?Sized,
    {
        let eligible = match self.state {
            CallState::Recording => true,
            CallState::Monitoring => self.monitoring == MonitoringState::Superseded,
            CallState::Concluded => false,
        };
        if !eligible {
            return false;
        }

        self.stop_time = Some(now);
        if self.state == CallState::Recording && self.recorder.is_none() {
            error!("{}\tstate is recording, but no recorder is assigned", self);
        }

        match self.recorder.take() {
            Some(handle) => {
                let last_write = reach(sources, handle, |rec| rec.since_last_write(now));
                info!(
                    "{}\tConcluding recorded call - last update: {}s\trecorder last write: {}\tcall elapsed: {}",
                    self,
                    self.since_last_update(now).num_seconds(),
                    last_write.map_or_else(|| "-".to_owned(), format_secs),
                    self.elapsed(now).num_seconds()
                );
                match sources.find_source(handle.source()).and_then(|s| s.release(handle)) {
                    Some(released) => {
                        self.final_length = released.length;
                        self.transmissions.extend(released.transmissions);
                    }
                    None => {
                        error!("{}\tcannot release {}", self, handle);
                        self.final_length = 0.0;
                    }
                }
            }
            None => {
                info!(
                    "{}\tConcluding call without recorder - last update: {}s\tcall elapsed: {}",
                    self,
                    self.since_last_update(now).num_seconds(),
                    self.elapsed(now).num_seconds()
                );
                self.final_length = 0.0;
            }
        }

        if self.was_update {
            info!("{}\tCall was UPDATE not GRANT", self);
        }

        for handle in [self.debug_recorder.take(), self.diagnostic_recorder.take()]
            .into_iter()
            .flatten()
        {
            if sources
                .find_source(handle.source())
                .and_then(|s| s.release(handle))
                .is_none()
            {
                warn!("{}\tcannot release {}", self, handle);
            }
        }

        self.state = CallState::Concluded;
        concluder.conclude(self, &self.system, &self.config);
        for plugin in self.system.plugins() {
            plugin.call_end(self);
        }
        true
    }

    /// Advisory idle check
    ///
    /// True if the call's recorder reports no signal. Calls
    /// which are not recording are always idle. This never
    /// changes the call's state; acting on it is the
    /// caller's decision.
    pub fn is_idle<L>(&self, sources: &L) -> bool
    where
        L: SourceLookup + ?Sized,
    {
        if self.state != CallState::Recording {
            return true;
        }
        match self.recorder.and_then(|h| reach(sources, h, |rec| rec.is_idle())) {
            Some(true) => {
                debug!("{}\trecorder is idle (count {})", self, self.idle_count);
                true
            }
            Some(false) => false,
            None => true,
        }
    }

    /// Time since the last activity report
    pub fn since_last_update(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_update
    }

    /// Time since the recorder last wrote voice
    ///
    /// `None` unless the call is recording.
    pub fn since_last_voice_update<L>(&self, sources: &L, now: DateTime<Utc>) -> Option<Duration>
    where
        L: SourceLookup + ?Sized,
    {
        if self.state != CallState::Recording {
            return None;
        }
        self.recorder
            .and_then(|h| reach(sources, h, |rec| rec.since_last_write(now)))
    }

    /// Time since the call started
    ///
    /// Measured to the stop time once the call concludes.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        self.stop_time.unwrap_or(now) - self.start_time
    }

    /// Recording length so far, in seconds
    ///
    /// For a concluded call, this is the final length. A call
    /// which is not recording has a length of zero.
    pub fn current_length<L>(&self, sources: &L) -> f64
    where
        L: SourceLookup + ?Sized,
    {
        match self.state {
            CallState::Concluded => self.final_length,
            CallState::Recording => self
                .recorder
                .and_then(|h| reach(sources, h, |rec| rec.current_length()))
                .unwrap_or(0.0),
            CallState::Monitoring => 0.0,
        }
    }

    /// Status snapshot
    pub fn stats<L>(&self, now: DateTime<Utc>, sources: &L) -> CallStats
    where
        L: SourceLookup + ?Sized,
    {
        let recorder = self.recorder.map(|h| RecorderStats {
            num: h.num(),
            source: h.source(),
            kind: h.kind(),
            state: reach(sources, h, |rec| rec.state()),
        });

        CallStats {
            id: format!(
                "{}_{}_{}",
                self.sys_num(),
                self.talkgroup,
                self.start_time.timestamp()
            ),
            call_num: self.call_num,
            freq: self.freq,
            sys_num: self.sys_num(),
            short_name: self.system.short_name().to_owned(),
            talkgroup: self.talkgroup,
            talkgroup_tag: self.talkgroup_tag.clone(),
            elapsed: self.elapsed(now),
            length: self.current_length(sources),
            state: self.state,
            monitoring_state: self.monitoring,
            priority: self.priority,
            phase2: self.phase2_tdma,
            conventional: self.conventional,
            encrypted: self.encrypted,
            emergency: self.emergency,
            mode: self.mode,
            duplex: self.duplex,
            start_time: self.start_time,
            stop_time: self.stop_time,
            source_unit: self.source_unit,
            recorder,
        }
    }

    pub(crate) fn attach(&mut self, handle: RecorderHandle) -> bool {
        if let Some(held) = self.recorder {
            error!("{}\tcannot attach {}: call already holds {}", self, handle, held);
            return false;
        }
        self.recorder = Some(handle);
        self.state = CallState::Recording;
        true
    }

    pub(crate) fn refuse(&mut self, reason: MonitoringState) {
        self.state = CallState::Monitoring;
        self.monitoring = reason;
    }

    pub(crate) fn attach_debug(&mut self, handle: RecorderHandle) -> bool {
        attach_auxiliary(&mut self.debug_recorder, handle)
    }

    pub(crate) fn attach_diagnostic(&mut self, handle: RecorderHandle) -> bool {
        attach_auxiliary(&mut self.diagnostic_recorder, handle)
    }

    fn update_talkgroup_display(&mut self) {
        let tag = self.talkgroup_tag.trim();
        self.talkgroup_tag = if tag.is_empty() {
            "-".to_owned()
        } else {
            tag.to_owned()
        };
        self.talkgroup_display = self
            .system
            .talkgroup_display_format()
            .format(self.talkgroup, &self.talkgroup_tag);
    }

    /// Call number
    pub fn call_num(&self) -> u64 {
        self.call_num
    }

    /// Shared system
    pub fn system(&self) -> &Arc<System> {
        &self.system
    }

    /// Shared recording configuration
    pub fn config(&self) -> &Arc<RecordingConfig> {
        &self.config
    }

    /// System number
    pub fn sys_num(&self) -> u32 {
        self.system.sys_num()
    }

    /// System short name
    pub fn short_name(&self) -> &str {
        self.system.short_name()
    }

    /// Talkgroup number
    pub fn talkgroup(&self) -> u32 {
        self.talkgroup
    }

    /// Talkgroup tag, or `-` if there is none
    pub fn talkgroup_tag(&self) -> &str {
        &self.talkgroup_tag
    }

    /// Set the talkgroup tag
    ///
    /// Whitespace is trimmed. An empty tag becomes `-`.
    pub fn set_talkgroup_tag<S: Into<String>>(&mut self, tag: S) {
        self.talkgroup_tag = tag.into();
        self.update_talkgroup_display();
    }

    /// Talkgroup, formatted per the system display format
    pub fn talkgroup_display(&self) -> &str {
        &self.talkgroup_display
    }

    /// Current frequency (Hz)
    pub fn freq(&self) -> f64 {
        self.freq
    }

    /// Change the current frequency (Hz)
    pub fn set_freq(&mut self, freq: f64) {
        if freq != self.freq {
            self.freq = freq;
        }
    }

    /// Unit currently attributed to the call
    pub fn current_source_id(&self) -> Option<UnitId> {
        self.source_unit
    }

    /// Lifecycle state
    pub fn state(&self) -> CallState {
        self.state
    }

    /// Why the call is not recorded
    ///
    /// Kept after conclusion for reporting.
    pub fn monitoring_state(&self) -> MonitoringState {
        self.monitoring
    }

    /// Priority copied from the talkgroup, if it is known
    pub fn priority(&self) -> Option<i32> {
        self.priority
    }

    /// Bound recorder
    ///
    /// Always `Some` while the call is `RECORDING`.
    pub fn recorder(&self) -> Option<RecorderHandle> {
        self.recorder
    }

    /// Bound debug recorder
    pub fn debug_recorder(&self) -> Option<RecorderHandle> {
        self.debug_recorder
    }

    /// Bound diagnostic recorder
    pub fn diagnostic_recorder(&self) -> Option<RecorderHandle> {
        self.diagnostic_recorder
    }

    /// Transmissions collected at conclusion
    pub fn transmissions(&self) -> &[Transmission] {
        &self.transmissions
    }

    /// Start time
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Time of the last accepted activity
    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    /// Stop time, once concluded
    pub fn stop_time(&self) -> Option<DateTime<Utc>> {
        self.stop_time
    }

    /// Length at conclusion, in seconds
    pub fn final_length(&self) -> f64 {
        self.final_length
    }

    /// Idle counter, maintained by the caller
    pub fn idle_count(&self) -> u32 {
        self.idle_count
    }

    /// Advance the idle counter
    pub fn increase_idle_count(&mut self) {
        self.idle_count = self.idle_count.saturating_add(1);
    }

    /// Zero the idle counter
    pub fn reset_idle_count(&mut self) {
        self.idle_count = 0;
    }

    /// Encrypted voice
    pub fn encrypted(&self) -> bool {
        self.encrypted
    }

    /// Set the encryption flag
    pub fn set_encrypted(&mut self, encrypted: bool) {
        self.encrypted = encrypted;
    }

    /// Emergency call
    pub fn emergency(&self) -> bool {
        self.emergency
    }

    /// Flag the call as an emergency
    ///
    /// Once set, the emergency flag stays set.
    pub fn set_emergency(&mut self, emergency: bool) {
        self.emergency |= emergency;
    }

    /// Full duplex
    pub fn duplex(&self) -> bool {
        self.duplex
    }

    /// Digital mode flag
    pub fn mode(&self) -> bool {
        self.mode
    }

    /// Phase 2 TDMA
    pub fn phase2_tdma(&self) -> bool {
        self.phase2_tdma
    }

    /// Set the phase 2 TDMA flag
    pub fn set_phase2_tdma(&mut self, phase2: bool) {
        self.phase2_tdma = phase2;
    }

    /// TDMA timeslot
    pub fn tdma_slot(&self) -> u8 {
        self.tdma_slot
    }

    /// Set the TDMA timeslot
    ///
    /// Set the phase 2 flag first. A nonzero slot on a
    /// non-TDMA call is stored, but reported as an error.
    pub fn set_tdma_slot(&mut self, slot: u8) {
        self.tdma_slot = slot;
        if slot != 0 && !self.phase2_tdma {
            error!("{}\tTDMA slot {} set, but TDMA is off", self, slot);
        }
    }

    /// Analog voice
    pub fn is_analog(&self) -> bool {
        self.analog
    }

    /// Set the analog flag
    pub fn set_is_analog(&mut self, analog: bool) {
        self.analog = analog;
    }

    /// Conventional channel
    pub fn is_conventional(&self) -> bool {
        self.conventional
    }

    /// True if the call began with an update, not a grant
    pub fn was_update(&self) -> bool {
        self.was_update
    }

    /// Conversation mode of the call's system
    pub fn conversation_mode(&self) -> bool {
        self.system.conversation_mode()
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]\t{}C\tTG: {}\tFreq: {}",
            self.system.short_name(),
            self.call_num,
            self.talkgroup_display,
            format_freq(self.freq)
        )
    }
}

/// Format a frequency (Hz) in MHz for log lines
pub(crate) fn format_freq(freq: f64) -> String {
    format!("{:.6} MHz", freq / 1.0e6)
}

fn format_secs(duration: Duration) -> String {
    format!("{:.2}s", duration.num_milliseconds() as f64 / 1000.0)
}

fn attach_auxiliary(slot: &mut Option<RecorderHandle>, handle: RecorderHandle) -> bool {
    if let Some(held) = *slot {
        error!("cannot attach {}: call already holds {}", handle, held);
        return false;
    }
    *slot = Some(handle);
    true
}

fn reach<L, F, R>(sources: &L, handle: RecorderHandle, f: F) -> Option<R>
where
    L: SourceLookup + ?Sized,
    F: FnOnce(&mut dyn Recorder) -> R,
{
    sources.find_source(handle.source())?.with_recorder(handle, f)
}
