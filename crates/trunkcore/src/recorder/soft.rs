//! Pure-software recorder
//!
//! [`SoftRecorder`] satisfies the [`Recorder`] contract
//! without any signal processing. "Voice" is fed to it by a
//! [`SoftRecorderTap`], which shares its state. This is
//! useful for testing schedulers and as a reference for
//! real implementations.
//!
//! ```
//! use trunkcore::recorder::soft::SoftRecorder;
//! use trunkcore::{Recorder, RecorderKind, RecorderSpec, RecorderState, SourceId};
//!
//! let spec = RecorderSpec {
//!     num: 0,
//!     kind: RecorderKind::Digital,
//!     source: SourceId(0),
//!     center: 851.0e6,
//!     rate: 8.0e6,
//! };
//! let rec = SoftRecorder::new(&spec);
//! let tap = rec.tap();
//! assert_eq!(RecorderState::Available, rec.state());
//! assert_eq!(RecorderState::Available, tap.state());
//! ```

use std::sync::Arc;

#[cfg(not(test))]
use log::{debug, error, warn};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as error;
#[cfg(test)]
use std::println as warn;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::activity::UnitId;
use crate::call::Call;
use crate::recorder::{Recorder, RecorderKind, RecorderSpec, RecorderState, Transmission};

/// Software recorder
#[derive(Debug)]
pub struct SoftRecorder {
    num: u32,
    kind: RecorderKind,
    shared: Arc<Mutex<SoftState>>,
}

/// Feeds simulated activity to a [`SoftRecorder`]
///
/// Taps are cheap to clone and may outlive the recorder.
#[derive(Clone, Debug)]
pub struct SoftRecorderTap {
    num: u32,
    shared: Arc<Mutex<SoftState>>,
}

impl SoftRecorder {
    /// New recorder, in the `AVAILABLE` state
    pub fn new(spec: &RecorderSpec) -> Self {
        Self {
            num: spec.num,
            kind: spec.kind,
            shared: Arc::new(Mutex::new(SoftState::new())),
        }
    }

    /// New boxed recorder and its tap
    ///
    /// Convenient as a [`SourceBuilder`](crate::SourceBuilder)
    /// factory when the caller wants to keep the taps.
    pub fn boxed(spec: &RecorderSpec) -> (Box<dyn Recorder>, SoftRecorderTap) {
        let rec = Self::new(spec);
        let tap = rec.tap();
        (Box::new(rec), tap)
    }

    /// Obtain a tap for feeding activity
    pub fn tap(&self) -> SoftRecorderTap {
        SoftRecorderTap {
            num: self.num,
            shared: self.shared.clone(),
        }
    }
}

impl Recorder for SoftRecorder {
    fn num(&self) -> u32 {
        self.num
    }

    fn kind(&self) -> RecorderKind {
        self.kind
    }

    fn state(&self) -> RecorderState {
        self.shared.lock().state
    }

    fn start(&mut self, call: &Call) -> bool {
        let mut st = self.shared.lock();
        if st.state != RecorderState::Available {
            warn!(
                "soft recorder {}: refusing to start in state {}",
                self.num, st.state
            );
            return false;
        }

        st.state = RecorderState::Active;
        st.talkgroup = Some(call.talkgroup());
        st.freq = call.freq();
        st.call_num = Some(call.call_num());
        st.source = call.current_source_id();
        st.squelched = true;
        st.length = 0.0;
        st.current = None;
        st.transmissions.clear();
        st.last_write = Some(call.last_update());
        st.starts += 1;
        debug!(
            "soft recorder {}: started for call {} on talkgroup {}",
            self.num,
            call.call_num(),
            call.talkgroup()
        );
        true
    }

    fn stop(&mut self) {
        let mut st = self.shared.lock();
        if st.state != RecorderState::Active {
            error!(
                "soft recorder {}: trying to stop a recorder which is {}",
                self.num, st.state
            );
            return;
        }
        st.close_transmission();
        st.state = RecorderState::Inactive;
        debug!(
            "soft recorder {}: stopped after {:.2} s",
            self.num, st.length
        );
    }

    fn reset(&mut self) -> bool {
        let mut st = self.shared.lock();
        if st.state != RecorderState::Inactive {
            return false;
        }
        st.state = RecorderState::Available;
        st.talkgroup = None;
        st.call_num = None;
        st.freq = 0.0;
        true
    }

    fn set_source_unit(&mut self, unit: UnitId) {
        let mut st = self.shared.lock();
        if st.state != RecorderState::Active || st.source == Some(unit) {
            return;
        }
        // a different unit begins a new transmission
        st.close_transmission();
        st.source = Some(unit);
    }

    fn current_length(&self) -> f64 {
        self.shared.lock().length
    }

    fn since_last_write(&self, now: DateTime<Utc>) -> Duration {
        match self.shared.lock().last_write {
            Some(last) => now - last,
            None => Duration::zero(),
        }
    }

    fn is_idle(&self) -> bool {
        let st = self.shared.lock();
        st.state != RecorderState::Active || st.squelched
    }

    fn transmission_list(&self) -> Vec<Transmission> {
        self.shared.lock().transmissions.clone()
    }

    fn clear_transmission_list(&mut self) {
        self.shared.lock().transmissions.clear();
    }

    fn freq(&self) -> f64 {
        self.shared.lock().freq
    }
}

impl SoftRecorderTap {
    /// Recorder number
    pub fn num(&self) -> u32 {
        self.num
    }

    /// Recorder state
    pub fn state(&self) -> RecorderState {
        self.shared.lock().state
    }

    /// Talkgroup the recorder is bound to, if any
    pub fn talkgroup(&self) -> Option<u32> {
        self.shared.lock().talkgroup
    }

    /// Call number the recorder is bound to, if any
    pub fn call_num(&self) -> Option<u64> {
        self.shared.lock().call_num
    }

    /// Unit the recording is attributed to
    pub fn source_unit(&self) -> Option<UnitId> {
        self.shared.lock().source
    }

    /// Number of times the recorder has started
    pub fn starts(&self) -> u64 {
        self.shared.lock().starts
    }

    /// Write `seconds` of voice, ending at `now`
    ///
    /// Opens a transmission if none is in progress and
    /// un-squelches the recorder. Returns `false` if the
    /// recorder is not `ACTIVE`.
    pub fn voice(&self, now: DateTime<Utc>, seconds: f64) -> bool {
        let mut st = self.shared.lock();
        if st.state != RecorderState::Active {
            return false;
        }

        let seconds = f64::max(seconds, 0.0);
        if st.current.is_none() {
            let start_offset = st.length;
            let source = st.source;
            st.current = Some(Transmission {
                source,
                start_time: now - duration_from_secs(seconds),
                stop_time: now,
                start_offset,
                length: 0.0,
                error_count: 0,
                spike_count: 0,
            });
        }
        if let Some(tx) = st.current.as_mut() {
            tx.length += seconds;
            tx.stop_time = now;
        }
        st.length += seconds;
        st.last_write = Some(now);
        st.squelched = false;
        true
    }

    /// Count decode errors against the current transmission
    pub fn errors(&self, errors: u32, spikes: u32) {
        let mut st = self.shared.lock();
        if let Some(tx) = st.current.as_mut() {
            tx.error_count += errors;
            tx.spike_count += spikes;
        }
    }

    /// Close the current transmission and squelch
    pub fn end_transmission(&self) {
        let mut st = self.shared.lock();
        st.close_transmission();
    }

    /// Set the squelch flag directly
    pub fn set_squelched(&self, squelched: bool) {
        self.shared.lock().squelched = squelched;
    }
}

#[derive(Debug)]
struct SoftState {
    state: RecorderState,
    talkgroup: Option<u32>,
    call_num: Option<u64>,
    freq: f64,
    source: Option<UnitId>,
    squelched: bool,
    last_write: Option<DateTime<Utc>>,
    length: f64,
    current: Option<Transmission>,
    transmissions: Vec<Transmission>,
    starts: u64,
}

impl SoftState {
    fn new() -> Self {
        Self {
            state: RecorderState::Available,
            talkgroup: None,
            call_num: None,
            freq: 0.0,
            source: None,
            squelched: true,
            last_write: None,
            length: 0.0,
            current: None,
            transmissions: Vec::new(),
            starts: 0,
        }
    }

    fn close_transmission(&mut self) {
        if let Some(tx) = self.current.take() {
            self.transmissions.push(tx);
        }
        self.squelched = true;
    }
}

fn duration_from_secs(seconds: f64) -> Duration {
    Duration::milliseconds((seconds * 1000.0).round() as i64)
}
