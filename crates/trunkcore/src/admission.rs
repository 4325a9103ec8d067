//! Admission control
//!
//! A source decides which calls get its trunked recorders.
//! Given a call with priority `p`:
//!
//! 1. `p == -1`: the talkgroup is never recorded. The call
//!    is marked `IGNORED_TG` and the pool is not consulted.
//! 2. `p` greater than the number of `AVAILABLE` recorders:
//!    the call is refused and marked `NO_RECORDER`. This
//!    keeps recorders in reserve for more urgent calls.
//! 3. Otherwise the first `AVAILABLE` recorder, in pool
//!    order, is started and the call becomes `RECORDING`.
//!
//! Calls with no known talkgroup skip the first two rules.
//! This is a heuristic. It does not preempt running calls.
//!
//! A call holds at most one recorder. Superseded calls, and
//! calls which already hold a recorder, are never admitted.

#[cfg(not(test))]
use log::{error, info, warn};

#[cfg(test)]
use std::println as error;
#[cfg(test)]
use std::println as info;
#[cfg(test)]
use std::println as warn;

use trunktags::Talkgroup;

use crate::call::{Call, CallState, MonitoringState};
use crate::pool::Refusal;
use crate::recorder::{RecorderHandle, RecorderKind};
use crate::source::Source;

/// Outcome of an admission request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// A recorder was bound; the call is `RECORDING`
    Recording(RecorderHandle),

    /// The talkgroup is never recorded
    Ignored,

    /// No recorder could be bound
    NoRecorder,
}

impl Admission {
    /// True if a recorder was bound
    pub fn is_recording(&self) -> bool {
        matches!(self, Admission::Recording(_))
    }

    /// The bound recorder, if any
    pub fn handle(&self) -> Option<RecorderHandle> {
        match self {
            Admission::Recording(h) => Some(*h),
            _ => None,
        }
    }
}

impl Source {
    /// Admit `call` to a trunked pool
    ///
    /// `kind` must be [`RecorderKind::Digital`] or
    /// [`RecorderKind::Analog`]. On success, the recorder is
    /// started and attached to the call. On refusal, the
    /// call's monitoring sub-state records why. Refusals are
    /// policy outcomes, not errors.
    ///
    /// Calls which are not `MONITORING`, superseded calls,
    /// and calls which still hold a recorder are left alone.
    pub fn allocate(&self, kind: RecorderKind, priority: Option<i32>, call: &mut Call) -> Admission {
        if let Some(admission) = already_decided(call) {
            return admission;
        }

        if !kind.is_trunked() {
            error!("{}\t{}", call, Refusal::WrongKind { kind });
            call.refuse(MonitoringState::NoRecorder);
            return Admission::NoRecorder;
        }

        let pool = self.pool(kind);
        match pool.acquire(priority, call) {
            Ok(handle) => {
                if !call.attach(handle) {
                    self.unwind(handle);
                    return Admission::NoRecorder;
                }
                info!(
                    "{}\tStarting {} recorder {} on source {}",
                    call,
                    kind,
                    handle.num(),
                    self.id()
                );
                Admission::Recording(handle)
            }
            Err(Refusal::IgnoredTalkgroup) => {
                call.refuse(MonitoringState::IgnoredTalkgroup);
                info!("{}\tNot recording talkgroup. Priority is -1.", call);
                Admission::Ignored
            }
            Err(refusal) => {
                call.refuse(MonitoringState::NoRecorder);
                error!("{}\tNot recording call: {}", call, refusal);
                if matches!(refusal, Refusal::Exhausted { .. }) {
                    pool.log_recorders();
                }
                Admission::NoRecorder
            }
        }
    }

    /// Admit `call` to the trunked digital pool
    ///
    /// The call's priority is taken from `talkgroup`. Unknown
    /// talkgroups are admitted if any recorder is free.
    pub fn get_digital_recorder(&self, talkgroup: Option<&Talkgroup>, call: &mut Call) -> Admission {
        self.allocate(RecorderKind::Digital, talkgroup.map(Talkgroup::priority), call)
    }

    /// Admit `call` to the trunked analog pool
    ///
    /// The call's priority is taken from `talkgroup`. Unknown
    /// talkgroups are admitted if any recorder is free.
    pub fn get_analog_recorder(&self, talkgroup: Option<&Talkgroup>, call: &mut Call) -> Admission {
        self.allocate(RecorderKind::Analog, talkgroup.map(Talkgroup::priority), call)
    }

    /// Bind a dedicated conventional recorder to `call`
    ///
    /// No admission control applies. The recorder must be
    /// `AVAILABLE`.
    pub fn bind_dedicated(&self, handle: RecorderHandle, call: &mut Call) -> Admission {
        if let Some(admission) = already_decided(call) {
            return admission;
        }
        if handle.source() != self.id() || !handle.kind().is_conventional() {
            error!("{}\tcannot bind {} on source {}", call, handle, self.id());
            call.refuse(MonitoringState::NoRecorder);
            return Admission::NoRecorder;
        }

        match self.pool(handle.kind()).bind(handle.index(), call) {
            Ok(bound) => {
                if !call.attach(bound) {
                    self.unwind(bound);
                    return Admission::NoRecorder;
                }
                info!("{}\tStarting {}", call, bound);
                Admission::Recording(bound)
            }
            Err(refusal) => {
                warn!("{}\t{}", call, refusal);
                call.refuse(MonitoringState::NoRecorder);
                Admission::NoRecorder
            }
        }
    }

    /// Attach a debug recorder to `call`, if one is free
    ///
    /// A call holds at most one debug recorder.
    pub fn get_debug_recorder(&self, call: &mut Call) -> Option<RecorderHandle> {
        if call.debug_recorder().is_some() {
            return None;
        }
        let handle = self.auxiliary(RecorderKind::Debug, call)?;
        if !call.attach_debug(handle) {
            self.unwind(handle);
            return None;
        }
        Some(handle)
    }

    /// Attach a diagnostic recorder to `call`, if one is free
    ///
    /// A call holds at most one diagnostic recorder.
    pub fn get_diagnostic_recorder(&self, call: &mut Call) -> Option<RecorderHandle> {
        if call.diagnostic_recorder().is_some() {
            return None;
        }
        let handle = self.auxiliary(RecorderKind::Diagnostic, call)?;
        if !call.attach_diagnostic(handle) {
            self.unwind(handle);
            return None;
        }
        Some(handle)
    }

    fn auxiliary(&self, kind: RecorderKind, call: &Call) -> Option<RecorderHandle> {
        if call.state() == CallState::Concluded {
            return None;
        }
        match self.pool(kind).acquire(None, call) {
            Ok(handle) => Some(handle),
            Err(refusal) => {
                warn!("{}\t{}", call, refusal);
                None
            }
        }
    }

    // return a recorder which was started but could not be attached
    fn unwind(&self, handle: RecorderHandle) {
        if self.release(handle).is_none() || !self.mark_available(handle) {
            error!("[ source {} ] {} could not be returned to service", self.id(), handle);
        }
    }
}

fn already_decided(call: &Call) -> Option<Admission> {
    match call.state() {
        CallState::Monitoring => {}
        CallState::Recording => {
            warn!("{}\tadmission requested for a call which is already recording", call);
            return Some(call.recorder().map_or(Admission::NoRecorder, Admission::Recording));
        }
        CallState::Concluded => {
            warn!("{}\tadmission requested for a concluded call", call);
            return Some(Admission::NoRecorder);
        }
    }

    if call.monitoring_state() == MonitoringState::Superseded {
        warn!("{}\tadmission refused: call is superseded", call);
        return Some(Admission::NoRecorder);
    }
    if let Some(held) = call.recorder() {
        error!("{}\tadmission refused: call already holds {}", call, held);
        return Some(Admission::NoRecorder);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};
    use trunktags::{TalkgroupMode, PRIORITY_NEVER_RECORD};

    use crate::activity::Activity;
    use crate::builder::{SourceBuilder, SystemBuilder};
    use crate::call::CallFactory;
    use crate::concluder::RecordingConfig;
    use crate::numbering::Numbering;
    use crate::pool::PoolCensus;
    use crate::recorder::soft::SoftRecorder;
    use crate::recorder::{Recorder, RecorderSpec, RecorderState};
    use crate::system::System;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 4, 21, 0, 0).unwrap()
    }

    fn soft(spec: &RecorderSpec) -> Box<dyn Recorder> {
        Box::new(SoftRecorder::new(spec))
    }

    struct Fixture {
        factory: CallFactory,
        numbering: Arc<Numbering>,
        source: Source,
    }

    fn fixture(digital: usize, analog: usize) -> Fixture {
        let numbering = Arc::new(Numbering::new());
        let source = SourceBuilder::new(852.0e6, 8.0e6)
            .with_digital_recorders(digital)
            .with_analog_recorders(analog)
            .with_diagnostic_recorders(1)
            .build(&numbering, soft);
        Fixture {
            factory: CallFactory::new(
                SystemBuilder::new(0, "admit").build(),
                Arc::new(RecordingConfig::default()),
                numbering.clone(),
            ),
            numbering,
            source,
        }
    }

    fn talkgroup(number: u32, priority: i32) -> Talkgroup {
        Talkgroup::trunked(0, number, TalkgroupMode::Digital).with_priority(priority)
    }

    fn call(fx: &Fixture, tg: u32) -> Call {
        fx.factory
            .make(&Activity::grant(0, tg, 851.0e6 + f64::from(tg) * 12_500.0), None, t0())
    }

    fn census(fx: &Fixture, kind: RecorderKind) -> PoolCensus {
        fx.source.pool(kind).census()
    }

    fn noop(_: &Call, _: &System, _: &RecordingConfig) {}

    #[test]
    fn test_scenario_capacity_reservation() {
        let fx = fixture(2, 0);

        let mut first = call(&fx, 1);
        let admitted = fx.source.get_digital_recorder(Some(&talkgroup(1, 1)), &mut first);
        let handle = admitted.handle().expect("first call records");
        assert_eq!(0, handle.index());
        assert_eq!(CallState::Recording, first.state());
        assert_eq!(Some(handle), first.recorder());

        let mut second = call(&fx, 2);
        let admitted = fx.source.get_digital_recorder(Some(&talkgroup(2, 2)), &mut second);
        assert_eq!(Admission::NoRecorder, admitted);
        assert_eq!(CallState::Monitoring, second.state());
        assert_eq!(MonitoringState::NoRecorder, second.monitoring_state());
        assert!(second.recorder().is_none());
        assert_eq!(1, fx.source.get_num_available_digital_recorders());
    }

    #[test]
    fn test_scenario_never_record() {
        let fx = fixture(2, 0);
        let mut c = call(&fx, 1);
        let admitted =
            fx.source
                .get_digital_recorder(Some(&talkgroup(1, PRIORITY_NEVER_RECORD)), &mut c);
        assert_eq!(Admission::Ignored, admitted);
        assert_eq!(CallState::Monitoring, c.state());
        assert_eq!(MonitoringState::IgnoredTalkgroup, c.monitoring_state());

        // even with every recorder available
        assert_eq!(2, census(&fx, RecorderKind::Digital).available);
    }

    #[test]
    fn test_scenario_release_and_reuse() {
        let fx = fixture(2, 0);
        let mut first = call(&fx, 1);
        let released = fx
            .source
            .get_digital_recorder(Some(&talkgroup(1, 1)), &mut first)
            .handle()
            .expect("records");
        assert!(first.conclude_call(&fx.source, &noop, t0()));
        assert_eq!(Some(RecorderState::Inactive), fx.source.recorder_state(released));

        let mut second = call(&fx, 2);
        let bound = fx
            .source
            .get_digital_recorder(Some(&talkgroup(2, 1)), &mut second)
            .handle()
            .expect("one recorder is still available");
        assert_ne!(released.index(), bound.index());

        // the released recorder stays out of service until swept
        let mut third = call(&fx, 3);
        assert_eq!(
            Admission::NoRecorder,
            fx.source.get_digital_recorder(None, &mut third)
        );

        assert_eq!(1, fx.source.reset_sweep());
        let mut fourth = call(&fx, 4);
        assert_eq!(
            Some(released.index()),
            fx.source
                .get_digital_recorder(None, &mut fourth)
                .handle()
                .map(|h| h.index())
        );
    }

    #[test]
    fn test_priority_boundary() {
        let fx = fixture(4, 0);
        let mut holder = call(&fx, 9);
        fx.source.get_digital_recorder(None, &mut holder);
        assert_eq!(3, fx.source.get_num_available_digital_recorders());

        let mut over = call(&fx, 10);
        assert_eq!(
            Admission::NoRecorder,
            fx.source.get_digital_recorder(Some(&talkgroup(10, 4)), &mut over)
        );
        assert_eq!(3, fx.source.get_num_available_digital_recorders());

        let mut at = call(&fx, 11);
        assert!(fx
            .source
            .get_digital_recorder(Some(&talkgroup(11, 3)), &mut at)
            .is_recording());
        assert_eq!(2, fx.source.get_num_available_digital_recorders());
    }

    #[test]
    fn test_unknown_talkgroup_and_exhaustion() {
        let fx = fixture(1, 1);
        let mut a = call(&fx, 1);
        assert!(fx.source.get_digital_recorder(None, &mut a).is_recording());

        let mut b = call(&fx, 2);
        assert_eq!(Admission::NoRecorder, fx.source.get_digital_recorder(None, &mut b));
        assert_eq!(MonitoringState::NoRecorder, b.monitoring_state());

        // analog pool is separate
        let mut c = call(&fx, 3);
        let handle = fx.source.get_analog_recorder(None, &mut c).handle().expect("analog");
        assert_eq!(RecorderKind::Analog, handle.kind());
    }

    #[test]
    fn test_refusal_is_not_final() {
        let fx = fixture(1, 0);
        let mut a = call(&fx, 1);
        assert!(fx.source.get_digital_recorder(None, &mut a).is_recording());

        let mut b = call(&fx, 2);
        assert_eq!(Admission::NoRecorder, fx.source.get_digital_recorder(None, &mut b));

        assert!(a.conclude_call(&fx.source, &noop, t0()));
        fx.source.reset_sweep();
        assert!(fx.source.get_digital_recorder(None, &mut b).is_recording());
        assert_eq!(CallState::Recording, b.state());

        // a recording call keeps its recorder
        let again = fx.source.get_digital_recorder(None, &mut b);
        assert_eq!(b.recorder(), again.handle());
    }

    #[test]
    fn test_wrong_kind() {
        let fx = fixture(1, 0);
        let mut c = call(&fx, 1);
        assert_eq!(
            Admission::NoRecorder,
            fx.source.allocate(RecorderKind::Diagnostic, None, &mut c)
        );
        assert_eq!(1, census(&fx, RecorderKind::Diagnostic).available);
    }

    #[test]
    fn test_dedicated() {
        let fx = fixture(0, 0);
        let conv = fx
            .source
            .create_conventional_recorder(RecorderKind::AnalogConventional, &fx.numbering, soft)
            .expect("conventional recorder");

        let mut c = fx.factory.make_conventional(1, 853.0e6, t0());
        let bound = fx.source.bind_dedicated(conv, &mut c).handle().expect("dedicated");
        assert_eq!(conv.index(), bound.index());
        assert_eq!(conv.num(), bound.num());
        assert_eq!(CallState::Recording, c.state());
        assert_eq!(Some(bound), c.recorder());

        let diag = fx.source.get_diagnostic_recorder(&mut c).expect("diagnostic");
        assert_eq!(Some(diag), c.diagnostic_recorder());
        assert!(fx.source.get_diagnostic_recorder(&mut c).is_none());

        // a second call cannot take the same dedicated recorder
        let mut d = fx.factory.make_conventional(1, 853.0e6, t0());
        assert_eq!(Admission::NoRecorder, fx.source.bind_dedicated(conv, &mut d));

        assert!(c.conclude_call(&fx.source, &noop, t0()));
        assert_eq!(Admission::NoRecorder, fx.source.bind_dedicated(conv, &mut d));
        assert!(fx.source.mark_available(conv));
        let rebound = fx.source.bind_dedicated(conv, &mut d).handle().expect("dedicated");
        assert_eq!(conv.index(), rebound.index());
        assert_eq!(bound.activation() + 1, rebound.activation());

        // the first call's handle no longer reaches the recorder
        assert!(fx.source.recorder_state(bound).is_none());
        assert_eq!(Some(RecorderState::Active), fx.source.recorder_state(rebound));
    }

    #[test]
    fn test_superseded_call_keeps_one_recorder() {
        let fx = fixture(2, 0);
        let mut c = call(&fx, 1);
        let held = fx.source.get_digital_recorder(None, &mut c).handle().expect("records");

        assert!(c.supersede());
        assert_eq!(CallState::Monitoring, c.state());
        assert_eq!(MonitoringState::Superseded, c.monitoring_state());
        assert_eq!(Some(held), c.recorder());

        // no second recorder is bound
        assert_eq!(Admission::NoRecorder, fx.source.get_digital_recorder(None, &mut c));
        assert_eq!(Some(held), c.recorder());
        assert_eq!(MonitoringState::Superseded, c.monitoring_state());
        let after = census(&fx, RecorderKind::Digital);
        assert_eq!(1, after.active);
        assert_eq!(1, after.available);

        // nor a dedicated one
        let conv = fx
            .source
            .create_conventional_recorder(RecorderKind::DigitalConventional, &fx.numbering, soft)
            .expect("conventional recorder");
        assert_eq!(Admission::NoRecorder, fx.source.bind_dedicated(conv, &mut c));
        assert_eq!(Some(RecorderState::Available), fx.source.recorder_state(conv));

        // concluding releases the one recorder it holds
        assert!(c.conclude_call(&fx.source, &noop, t0()));
        assert_eq!(
            vec![RecorderState::Inactive, RecorderState::Available],
            fx.source.pool(RecorderKind::Digital).states()
        );
    }

    #[test]
    fn test_one_auxiliary_recorder_per_call() {
        let fx = fixture(1, 0);
        let source = SourceBuilder::new(852.0e6, 8.0e6)
            .with_diagnostic_recorders(2)
            .build(&fx.numbering, soft);

        let mut c = call(&fx, 1);
        let diag = source.get_diagnostic_recorder(&mut c).expect("diagnostic");
        assert!(source.get_diagnostic_recorder(&mut c).is_none());
        assert_eq!(Some(diag), c.diagnostic_recorder());

        let census = source.pool(RecorderKind::Diagnostic).census();
        assert_eq!(1, census.active);
        assert_eq!(1, census.available);
    }

    #[test]
    fn test_census_invariant() {
        let fx = fixture(3, 0);
        let mut calls: Vec<Call> = (1..=5).map(|tg| call(&fx, tg)).collect();
        for (i, c) in calls.iter_mut().enumerate() {
            fx.source.get_digital_recorder(None, c);
            if i % 2 == 0 {
                c.conclude_call(&fx.source, &noop, t0());
            }
            let census = census(&fx, RecorderKind::Digital);
            assert_eq!(3, census.total());
        }

        for c in calls.iter() {
            if c.state() == CallState::Recording {
                assert!(c.recorder().is_some());
            }
        }
    }

    #[test]
    fn test_concurrent_allocation() {
        let fx = fixture(4, 0);
        let source = Arc::new(fx.source);
        let factory = fx.factory;

        let threads: Vec<_> = (0..8)
            .map(|tg| {
                let source = source.clone();
                let mut c = factory.make(&Activity::grant(0, tg, 851.0e6), None, t0());
                std::thread::spawn(move || source.get_digital_recorder(None, &mut c).handle())
            })
            .collect();

        let mut bound: Vec<usize> = threads
            .into_iter()
            .filter_map(|t| t.join().expect("thread panicked"))
            .map(|h| h.index())
            .collect();
        bound.sort_unstable();
        assert_eq!(vec![0, 1, 2, 3], bound);
        assert_eq!(4, source.pool(RecorderKind::Digital).census().active);
    }
}
