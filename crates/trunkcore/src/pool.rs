//! Per-source, per-kind recorder pools

use std::fmt;

#[cfg(not(test))]
use log::{debug, error, info, trace, warn};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as error;
#[cfg(test)]
use std::println as info;
#[cfg(test)]
use std::println as trace;
#[cfg(test)]
use std::println as warn;

use parking_lot::Mutex;
use thiserror::Error;
use trunktags::PRIORITY_NEVER_RECORD;

use crate::call::Call;
use crate::numbering::SourceId;
use crate::recorder::{Recorder, RecorderHandle, RecorderKind, RecorderState, Transmission};

/// Why a pool declined to bind a recorder
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refusal {
    /// The talkgroup is never recorded
    #[error("talkgroup priority is -1")]
    IgnoredTalkgroup,

    /// Too few recorders are free for this priority
    #[error("priority {priority} exceeds {available} available recorders")]
    Reserved {
        /// Requested priority
        priority: i32,

        /// Recorders available at the time of the check
        available: usize,
    },

    /// No recorder is available
    #[error("no {kind} recorders available")]
    Exhausted {
        /// Kind of pool which was searched
        kind: RecorderKind,
    },

    /// The pool does not serve this purpose
    #[error("{kind} recorders cannot be used for this call")]
    WrongKind {
        /// Kind of pool which was asked
        kind: RecorderKind,
    },

    /// A specific recorder was requested, but it is busy
    #[error("recorder in slot {index} is not available")]
    Busy {
        /// Pool position
        index: usize,
    },
}

/// Recorder counts by state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolCensus {
    /// Ready for assignment
    pub available: usize,

    /// Bound to a call
    pub active: usize,

    /// Released and awaiting reset
    pub inactive: usize,
}

impl PoolCensus {
    /// Total recorders counted
    pub fn total(&self) -> usize {
        self.available + self.active + self.inactive
    }
}

impl fmt::Display for PoolCensus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} available, {} active, {} inactive",
            self.available, self.active, self.inactive
        )
    }
}

/// What a recorder leaves behind when it is released
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Released {
    /// Recording length at release, in seconds
    pub(crate) length: f64,

    /// Transmissions pulled off the recorder
    pub(crate) transmissions: Vec<Transmission>,
}

/// A fixed collection of recorders of one kind
///
/// Every operation which reads or changes recorder state
/// does so under the pool's lock. Count checks and binding
/// happen in a single critical section, so two calls can
/// never be bound to the same recorder.
///
/// Recorders are kept in the order they were added. Scans
/// always proceed in that order.
///
/// Binding and releasing are reserved to this crate. A
/// recorder is only ever bound on behalf of a [`Call`],
/// which then owns the handle until it concludes.
#[derive(Debug)]
pub struct RecorderPool {
    source: SourceId,
    kind: RecorderKind,
    slots: Mutex<Vec<Slot>>,
}

#[derive(Debug)]
struct Slot {
    recorder: Box<dyn Recorder>,
    activation: u64,
}

impl Slot {
    fn bind(&mut self, source: SourceId, kind: RecorderKind, index: usize) -> RecorderHandle {
        self.activation += 1;
        RecorderHandle::new(source, kind, index, self.recorder.num(), self.activation)
    }
}

impl RecorderPool {
    /// Empty pool
    pub fn new(source: SourceId, kind: RecorderKind) -> Self {
        Self {
            source,
            kind,
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Owning source
    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Kind of recorders in this pool
    pub fn kind(&self) -> RecorderKind {
        self.kind
    }

    /// Add a recorder to the end of the pool
    ///
    /// The returned handle names the slot. It has not been
    /// bound to any call.
    pub fn push(&self, recorder: Box<dyn Recorder>) -> RecorderHandle {
        if recorder.kind() != self.kind {
            warn!(
                "source {}: adding {} recorder {} to the {} pool",
                self.source,
                recorder.kind(),
                recorder.num(),
                self.kind
            );
        }
        let mut slots = self.slots.lock();
        let handle = RecorderHandle::new(self.source, self.kind, slots.len(), recorder.num(), 0);
        slots.push(Slot {
            recorder,
            activation: 0,
        });
        handle
    }

    /// Number of recorders in the pool
    pub fn capacity(&self) -> usize {
        self.slots.lock().len()
    }

    /// Number of `AVAILABLE` recorders
    pub fn available(&self) -> usize {
        count_available(&self.slots.lock())
    }

    /// Count recorders by state
    ///
    /// The census is taken under one lock, so its total
    /// always equals the pool capacity.
    pub fn census(&self) -> PoolCensus {
        let slots = self.slots.lock();
        let mut out = PoolCensus::default();
        for slot in slots.iter() {
            match slot.recorder.state() {
                RecorderState::Available => out.available += 1,
                RecorderState::Active => out.active += 1,
                RecorderState::Inactive => out.inactive += 1,
            }
        }
        out
    }

    /// State of every recorder, in pool order
    pub fn states(&self) -> Vec<RecorderState> {
        self.slots.lock().iter().map(|s| s.recorder.state()).collect()
    }

    /// Bind the first available recorder to `call`
    ///
    /// When `priority` is given, the capacity reservation
    /// rule applies:
    ///
    /// * a priority of `-1` is refused without consulting
    ///   the pool at all;
    /// * a priority greater than the number of `AVAILABLE`
    ///   recorders is refused.
    ///
    /// When `priority` is `None`, the call is bound if any
    /// recorder is available.
    ///
    /// The first `AVAILABLE` recorder, in pool order, is
    /// started. If it refuses to start, the scan continues.
    pub(crate) fn acquire(&self, priority: Option<i32>, call: &Call) -> Result<RecorderHandle, Refusal> {
        if priority == Some(PRIORITY_NEVER_RECORD) {
            return Err(Refusal::IgnoredTalkgroup);
        }

        let mut slots = self.slots.lock();
        if let Some(priority) = priority {
            let available = count_available(&slots);
            trace!(
                "source {}: {} of {} {} recorders available for priority {}",
                self.source,
                available,
                slots.len(),
                self.kind,
                priority
            );
            if i64::from(priority) > available as i64 {
                return Err(Refusal::Reserved {
                    priority,
                    available,
                });
            }
        }

        for (index, slot) in slots.iter_mut().enumerate() {
            if slot.recorder.state() != RecorderState::Available {
                continue;
            }
            if slot.recorder.start(call) {
                return Ok(slot.bind(self.source, self.kind, index));
            }
            warn!(
                "source {}: {} recorder {} failed to start",
                self.source,
                self.kind,
                slot.recorder.num()
            );
        }

        Err(Refusal::Exhausted { kind: self.kind })
    }

    /// Bind one specific recorder to `call`
    ///
    /// Used for dedicated recorders, which skip admission
    /// control. Fails unless the recorder is `AVAILABLE`.
    pub(crate) fn bind(&self, index: usize, call: &Call) -> Result<RecorderHandle, Refusal> {
        let mut slots = self.slots.lock();
        let slot = slots.get_mut(index).ok_or(Refusal::Busy { index })?;
        if slot.recorder.state() == RecorderState::Available && slot.recorder.start(call) {
            Ok(slot.bind(self.source, self.kind, index))
        } else {
            Err(Refusal::Busy { index })
        }
    }

    /// Stop a recorder and collect what it captured
    ///
    /// The recorder's length is read, the recorder is
    /// stopped (becoming `INACTIVE`), and its transmission
    /// list is pulled off and cleared.
    ///
    /// Returns `None` unless the handle names an `ACTIVE`
    /// recorder in this pool and was issued for its current
    /// activation.
    pub(crate) fn release(&self, handle: RecorderHandle) -> Option<Released> {
        let mut slots = self.slots.lock();
        let rec = self.lookup_bound(&mut slots, handle)?;
        if rec.state() != RecorderState::Active {
            error!(
                "source {} {} pool: cannot release {}: recorder is {}",
                self.source,
                self.kind,
                handle,
                rec.state()
            );
            return None;
        }

        let length = rec.current_length();
        rec.stop();
        let transmissions = rec.transmission_list();
        rec.clear_transmission_list();
        debug!(
            "source {}: released {} recorder {} after {:.2} s",
            self.source,
            self.kind,
            rec.num(),
            length
        );
        Some(Released {
            length,
            transmissions,
        })
    }

    /// Return one `INACTIVE` recorder to service
    ///
    /// Any handle which names the recorder's slot will do.
    pub fn mark_available(&self, handle: RecorderHandle) -> bool {
        let mut slots = self.slots.lock();
        match self.lookup_slot(&mut slots, handle) {
            Some(slot) => slot.recorder.reset(),
            None => false,
        }
    }

    /// Return every `INACTIVE` recorder to service
    ///
    /// Returns the number of recorders reset.
    pub fn reset_sweep(&self) -> usize {
        let mut slots = self.slots.lock();
        let mut count = 0;
        for slot in slots.iter_mut() {
            if slot.recorder.state() == RecorderState::Inactive && slot.recorder.reset() {
                trace!(
                    "source {}: {} recorder {} is available",
                    self.source,
                    self.kind,
                    slot.recorder.num()
                );
                count += 1;
            }
        }
        count
    }

    /// Run `f` against the recorder named by `handle`
    ///
    /// The handle must be from the recorder's current
    /// activation. The pool is locked while `f` runs. Keep
    /// it short.
    pub fn with_recorder<F, R>(&self, handle: RecorderHandle, f: F) -> Option<R>
    where
        F: FnOnce(&mut dyn Recorder) -> R,
    {
        let mut slots = self.slots.lock();
        self.lookup_bound(&mut slots, handle).map(|rec| f(rec))
    }

    /// Log every recorder and its state
    pub fn log_recorders(&self) {
        let slots = self.slots.lock();
        for (index, slot) in slots.iter().enumerate() {
            info!(
                "[ source {} ] {:>20} recorder {:>3} (slot {:>2}): {}",
                self.source,
                self.kind,
                slot.recorder.num(),
                index,
                slot.recorder.state()
            );
        }
    }

    fn lookup_slot<'a>(&self, slots: &'a mut [Slot], handle: RecorderHandle) -> Option<&'a mut Slot> {
        if handle.source() != self.source || handle.kind() != self.kind {
            error!(
                "source {} {} pool: handle for foreign {}",
                self.source, self.kind, handle
            );
            return None;
        }
        match slots.get_mut(handle.index()) {
            Some(slot) if slot.recorder.num() == handle.num() => Some(slot),
            _ => {
                error!(
                    "source {} {} pool: stale handle {}",
                    self.source, self.kind, handle
                );
                None
            }
        }
    }

    fn lookup_bound<'a>(&self, slots: &'a mut [Slot], handle: RecorderHandle) -> Option<&'a mut dyn Recorder> {
        let slot = self.lookup_slot(slots, handle)?;
        if slot.activation != handle.activation() {
            error!(
                "source {} {} pool: {} is from activation {}, recorder is on activation {}",
                self.source,
                self.kind,
                handle,
                handle.activation(),
                slot.activation
            );
            return None;
        }
        Some(slot.recorder.as_mut())
    }
}

fn count_available(slots: &[Slot]) -> usize {
    slots
        .iter()
        .filter(|s| s.recorder.state() == RecorderState::Available)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use assert_approx_eq::assert_approx_eq;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::activity::Activity;
    use crate::builder::SystemBuilder;
    use crate::call::CallFactory;
    use crate::concluder::RecordingConfig;
    use crate::numbering::Numbering;
    use crate::recorder::soft::{SoftRecorder, SoftRecorderTap};
    use crate::recorder::RecorderSpec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn pool(count: u32) -> (RecorderPool, Vec<SoftRecorderTap>) {
        let pool = RecorderPool::new(SourceId(0), RecorderKind::Digital);
        let mut taps = Vec::new();
        for num in 0..count {
            let (rec, tap) = SoftRecorder::boxed(&RecorderSpec {
                num,
                kind: RecorderKind::Digital,
                source: SourceId(0),
                center: 851.0e6,
                rate: 8.0e6,
            });
            pool.push(rec);
            taps.push(tap);
        }
        (pool, taps)
    }

    fn call(tg: u32) -> Call {
        let factory = CallFactory::new(
            SystemBuilder::new(0, "test").build(),
            Arc::new(RecordingConfig::default()),
            Arc::new(Numbering::new()),
        );
        factory.make(&Activity::grant(0, tg, 851.5e6), None, t0())
    }

    #[test]
    fn test_priority_boundary() {
        let (pool, _taps) = pool(3);
        let c = call(1);

        // priority == available succeeds
        let handle = pool.acquire(Some(3), &c).expect("bind");
        assert_eq!(0, handle.index());
        assert_eq!(2, pool.available());

        // priority == available + 1 fails
        assert_eq!(
            Err(Refusal::Reserved {
                priority: 3,
                available: 2
            }),
            pool.acquire(Some(3), &c)
        );
        assert_eq!(2, pool.available());
    }

    #[test]
    fn test_never_record() {
        let (pool, _taps) = pool(2);
        let c = call(1);
        assert_eq!(
            Err(Refusal::IgnoredTalkgroup),
            pool.acquire(Some(PRIORITY_NEVER_RECORD), &c)
        );
        assert_eq!(2, pool.census().available);
    }

    #[test]
    fn test_unprioritized_and_exhausted() {
        let (pool, _taps) = pool(2);
        let c = call(1);
        assert_eq!(0, pool.acquire(None, &c).unwrap().index());
        assert_eq!(1, pool.acquire(None, &c).unwrap().index());
        assert_eq!(
            Err(Refusal::Exhausted {
                kind: RecorderKind::Digital
            }),
            pool.acquire(None, &c)
        );

        // nonpositive priorities always pass the reservation check
        assert_eq!(
            Err(Refusal::Exhausted {
                kind: RecorderKind::Digital
            }),
            pool.acquire(Some(0), &c)
        );
    }

    #[test]
    fn test_release_and_sweep() {
        let (pool, taps) = pool(2);
        let c = call(1);

        let first = pool.acquire(Some(1), &c).unwrap();
        assert!(taps[0].voice(t0() + Duration::seconds(1), 1.25));
        taps[0].end_transmission();

        let released = pool.release(first).expect("release");
        assert_approx_eq!(1.25, released.length);
        assert_eq!(1, released.transmissions.len());
        assert_eq!(
            vec![RecorderState::Inactive, RecorderState::Available],
            pool.states()
        );

        // released recorder is skipped until reset
        let second = pool.acquire(Some(1), &c).unwrap();
        assert_eq!(1, second.index());
        assert_eq!(Err(Refusal::Busy { index: 0 }), pool.bind(0, &c));

        let census = pool.census();
        assert_eq!(pool.capacity(), census.total());
        assert_eq!(1, census.inactive);

        assert_eq!(1, pool.reset_sweep());
        assert_eq!(0, pool.reset_sweep());
        assert_eq!(0, pool.bind(0, &c).unwrap().index());
        assert_eq!(2, pool.census().active);
    }

    #[test]
    fn test_stale_handles() {
        let (pool, _taps) = pool(1);
        let c = call(1);
        let handle = pool.acquire(None, &c).unwrap();
        assert_eq!(1, handle.activation());

        let stale = RecorderHandle::new(SourceId(0), RecorderKind::Digital, 0, 99, 1);
        assert!(pool.release(stale).is_none());
        let foreign = RecorderHandle::new(SourceId(1), RecorderKind::Digital, 0, 0, 1);
        assert!(pool.release(foreign).is_none());
        assert_eq!(RecorderState::Active, pool.states()[0]);

        assert!(!pool.mark_available(handle));
        assert!(pool.release(handle).is_some());

        // a second release finds the recorder inactive
        assert!(pool.release(handle).is_none());
        assert!(pool.mark_available(handle));
        assert_eq!(Some(true), pool.with_recorder(handle, |r| r.is_idle()));
    }

    #[test]
    fn test_earlier_activation_is_refused() {
        let (pool, taps) = pool(1);
        let a = call(1);
        let b = call(2);

        let old = pool.acquire(None, &a).unwrap();
        assert!(pool.release(old).is_some());
        assert_eq!(1, pool.reset_sweep());

        let new = pool.acquire(None, &b).unwrap();
        assert_eq!(old.index(), new.index());
        assert_eq!(old.num(), new.num());
        assert_eq!(2, new.activation());
        assert!(taps[0].voice(t0() + Duration::seconds(1), 2.0));

        // the old handle cannot touch the new call's recording
        assert!(pool.release(old).is_none());
        assert!(pool.with_recorder(old, |r| r.current_length()).is_none());
        assert_eq!(RecorderState::Active, pool.states()[0]);
        assert_eq!(Some(2), taps[0].talkgroup());

        let released = pool.release(new).expect("current activation");
        assert_approx_eq!(2.0, released.length);
    }
}
