use std::sync::Arc;

#[cfg(not(test))]
use log::{debug, info, warn};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as info;
#[cfg(test)]
use std::println as warn;

use chrono::{DateTime, Duration, Utc};
use trunktags::Talkgroups;

use crate::activity::Activity;
use crate::admission::Admission;
use crate::call::{Call, CallFactory, CallState, MonitoringState};
use crate::concluder::{CallConcluder, RecordingConfig};
use crate::numbering::Numbering;
use crate::recorder::RecorderKind;
use crate::source::Source;
use crate::system::System;

/// Call registry and housekeeping driver
///
/// The tracker owns every live [`Call`] on one system. Feed
/// it control channel activity with
/// [`handle_activity()`](CallTracker::handle_activity) and
/// call [`manage_calls()`](CallTracker::manage_calls)
/// periodically, about once per second. Concluded calls
/// are handed to the tracker's [`CallConcluder`] and
/// dropped.
///
/// Create one with a
/// [`CallTrackerBuilder`](crate::CallTrackerBuilder).
pub struct CallTracker {
    call_timeout: Duration,
    factory: CallFactory,
    talkgroups: Arc<Talkgroups>,
    sources: Vec<Arc<Source>>,
    concluder: Box<dyn CallConcluder>,
    calls: Vec<Call>,
}

impl CallTracker {
    pub(crate) fn new(
        call_timeout: Duration,
        system: Arc<System>,
        config: Arc<RecordingConfig>,
        talkgroups: Arc<Talkgroups>,
        sources: Vec<Arc<Source>>,
        numbering: Arc<Numbering>,
        concluder: Box<dyn CallConcluder>,
    ) -> Self {
        Self {
            call_timeout,
            factory: CallFactory::new(system, config, numbering),
            talkgroups,
            sources,
            concluder,
            calls: Vec::new(),
        }
    }

    /// Apply one activity report
    ///
    /// If a live call matches the activity's talkgroup and
    /// frequency, it is updated. Otherwise:
    ///
    /// 1. any live call which conflicts with the activity is
    ///    superseded and concluded, whether or not it was
    ///    recording. A call conflicts if it has the same
    ///    talkgroup on another frequency, or another
    ///    talkgroup on the same frequency. A call which never
    ///    recorded is handed off with a length of zero;
    /// 2. a new call is created, with its priority taken from
    ///    the talkgroup directory;
    /// 3. the first source which covers the frequency runs
    ///    admission control for the call.
    ///
    /// Returns the number of the call which received the
    /// activity, or `None` if the activity is for another
    /// system.
    pub fn handle_activity(&mut self, activity: &Activity, now: DateTime<Utc>) -> Option<u64> {
        let system = self.factory.system().clone();
        if activity.sys_num != system.sys_num() {
            warn!(
                "[{}]\tignoring activity for system {}",
                system.short_name(),
                activity.sys_num
            );
            return None;
        }

        let sources = &self.sources;
        if let Some(call) = self
            .calls
            .iter_mut()
            .find(|c| c.talkgroup() == activity.talkgroup && c.freq() == activity.freq)
        {
            // rejected updates are logged by the call
            let _ = call.update(activity, sources, now);
            return Some(call.call_num());
        }

        self.supersede_conflicts(activity, now);

        let talkgroup = self
            .talkgroups
            .find_talkgroup(activity.sys_num, activity.talkgroup);
        let mut call = self.factory.make(activity, talkgroup, now);
        let kind = match talkgroup {
            Some(tg) if tg.mode().is_analog() => RecorderKind::Analog,
            _ => RecorderKind::Digital,
        };

        match self.sources.iter().find(|s| s.covers(activity.freq)) {
            Some(source) => {
                if let Admission::Recording(_) = source.allocate(kind, call.priority(), &mut call) {
                    for plugin in system.plugins() {
                        plugin.call_start(&call);
                    }
                }
            }
            None => warn!("{}\tno source covers this frequency", call),
        }

        let call_num = call.call_num();
        self.calls.push(call);
        Some(call_num)
    }

    fn supersede_conflicts(&mut self, activity: &Activity, now: DateTime<Utc>) {
        let sources = &self.sources;
        let concluder = self.concluder.as_ref();
        self.calls.retain_mut(|call| {
            let same_tg = call.talkgroup() == activity.talkgroup;
            let same_freq = call.freq() == activity.freq;
            if call.state() == CallState::Concluded || same_tg == same_freq {
                return true;
            }
            info!(
                "{}\tsuperseded by talkgroup {} at {} Hz",
                call, activity.talkgroup, activity.freq
            );
            call.supersede();
            call.conclude_call(sources, concluder, now);
            false
        });
    }

    /// Periodic housekeeping
    ///
    /// 1. Calls which have timed out, and calls which were
    ///    superseded, are concluded and dropped.
    /// 2. Recording calls have their idle counters advanced
    ///    or reset. This is advisory only.
    /// 3. Every source runs its reset sweep, returning
    ///    released recorders to service.
    ///
    /// Returns the number of calls handed to the concluder.
    pub fn manage_calls(&mut self, now: DateTime<Utc>) -> usize {
        let timeout = self.call_timeout;
        let sources = &self.sources;
        let concluder = self.concluder.as_ref();
        let mut concluded = 0;

        self.calls.retain_mut(|call| {
            let superseded = call.state() == CallState::Monitoring
                && call.monitoring_state() == MonitoringState::Superseded;
            if superseded || call.since_last_update(now) >= timeout {
                if call.conclude_call(sources, concluder, now) {
                    concluded += 1;
                } else {
                    debug!("{}\tdropped without recording ({})", call, call.monitoring_state());
                }
                return false;
            }

            if call.state() == CallState::Recording {
                if call.is_idle(sources) {
                    call.increase_idle_count();
                } else {
                    call.reset_idle_count();
                }
            }
            true
        });

        for source in &self.sources {
            source.reset_sweep();
        }
        concluded
    }

    /// Conclude and drop every live call
    ///
    /// Used at shutdown. Recording calls are handed to the
    /// concluder; the rest are dropped. Returns the number of
    /// calls handed to the concluder.
    pub fn conclude_all(&mut self, now: DateTime<Utc>) -> usize {
        let mut concluded = 0;
        for mut call in self.calls.drain(..) {
            if call.conclude_call(&self.sources, self.concluder.as_ref(), now) {
                concluded += 1;
            }
        }
        concluded
    }

    /// Live calls
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Live call by number
    pub fn call(&self, call_num: u64) -> Option<&Call> {
        self.calls.iter().find(|c| c.call_num() == call_num)
    }

    /// Shared sources
    pub fn sources(&self) -> &[Arc<Source>] {
        &self.sources
    }

    /// Shared system
    pub fn system(&self) -> &Arc<System> {
        self.factory.system()
    }

    /// Talkgroup directory
    pub fn talkgroups(&self) -> &Talkgroups {
        &self.talkgroups
    }

    /// Call timeout
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }
}

impl std::fmt::Debug for CallTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallTracker")
            .field("call_timeout", &self.call_timeout)
            .field("system", self.factory.system())
            .field("sources", &self.sources.len())
            .field("calls", &self.calls.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use chrono::TimeZone;
    use trunktags::{Talkgroup, TalkgroupMode};

    use crate::builder::{CallTrackerBuilder, SourceBuilder, SystemBuilder};
    use crate::plugin::Plugin;
    use crate::recorder::soft::{SoftRecorder, SoftRecorderTap};
    use crate::recorder::RecorderState;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 5, 6, 0, 0).unwrap()
    }

    fn secs(s: i64) -> Duration {
        Duration::seconds(s)
    }

    #[derive(Default)]
    struct Starts(Mutex<Vec<u32>>);

    impl Plugin for Starts {
        fn call_start(&self, call: &Call) {
            self.0.lock().unwrap().push(call.talkgroup());
        }
    }

    struct Fixture {
        tracker: CallTracker,
        taps: Vec<SoftRecorderTap>,
        concluded: Arc<Mutex<Vec<(u64, u32, f64)>>>,
        starts: Arc<Starts>,
    }

    fn fixture(digital: usize, analog: usize) -> Fixture {
        let starts = Arc::new(Starts::default());
        let system = SystemBuilder::new(1, "county").with_plugin(starts.clone()).build();
        let numbering = Arc::new(Numbering::new());

        let mut taps = Vec::new();
        let source = SourceBuilder::new(852.0e6, 8.0e6)
            .with_digital_recorders(digital)
            .with_analog_recorders(analog)
            .build(&numbering, |spec| {
                let (rec, tap) = SoftRecorder::boxed(spec);
                taps.push(tap);
                rec
            });

        let talkgroups: Talkgroups = vec![
            Talkgroup::trunked(1, 100, TalkgroupMode::Digital).with_priority(1),
            Talkgroup::trunked(1, 200, TalkgroupMode::Digital).with_priority(2),
            Talkgroup::trunked(1, 300, TalkgroupMode::Analog).with_priority(1),
            Talkgroup::trunked(1, 400, TalkgroupMode::DigitalEncrypted).with_priority(-1),
        ]
        .into_iter()
        .collect();

        let concluded = Arc::new(Mutex::new(Vec::new()));
        let sink = concluded.clone();
        let tracker = CallTrackerBuilder::new().with_call_timeout(3.0).build(
            system,
            Arc::new(talkgroups),
            vec![Arc::new(source)],
            numbering,
            Box::new(move |call: &Call, _: &System, _: &RecordingConfig| {
                sink.lock()
                    .unwrap()
                    .push((call.call_num(), call.talkgroup(), call.final_length()));
            }),
        );

        Fixture {
            tracker,
            taps,
            concluded,
            starts,
        }
    }

    #[test]
    fn test_grant_update_timeout() {
        let mut fx = fixture(2, 0);
        let freq = 851.0125e6;

        let num = fx
            .tracker
            .handle_activity(&Activity::grant(1, 100, freq).with_source(7), t0())
            .expect("call");
        let call = fx.tracker.call(num).expect("live call");
        assert_eq!(CallState::Recording, call.state());
        assert_eq!(Some(1), call.priority());
        assert_eq!(vec![100], *fx.starts.0.lock().unwrap());

        assert!(fx.taps[0].voice(t0() + secs(1), 1.0));

        // updates refresh the call
        assert_eq!(
            Some(num),
            fx.tracker
                .handle_activity(&Activity::update(1, 100, freq).with_source(8), t0() + secs(2))
        );
        assert_eq!(1, fx.tracker.calls().len());
        assert_eq!(Some(8), fx.taps[0].source_unit());

        assert_eq!(0, fx.tracker.manage_calls(t0() + secs(4)));
        assert_eq!(1, fx.tracker.manage_calls(t0() + secs(5)));
        assert!(fx.tracker.calls().is_empty());
        assert_eq!(vec![(num, 100, 1.0)], *fx.concluded.lock().unwrap());

        // sweep ran after conclusion
        assert_eq!(RecorderState::Available, fx.taps[0].state());
    }

    #[test]
    fn test_supersede_on_new_talkgroup() {
        let mut fx = fixture(2, 0);
        let freq = 851.0125e6;

        let first = fx.tracker.handle_activity(&Activity::grant(1, 100, freq), t0()).unwrap();
        let second = fx
            .tracker
            .handle_activity(&Activity::grant(1, 200, freq), t0() + secs(1))
            .unwrap();
        assert_ne!(first, second);

        // first call was concluded immediately
        assert!(fx.tracker.call(first).is_none());
        assert_eq!(1, fx.concluded.lock().unwrap().len());

        // recorder 0 is inactive until the sweep; priority 2 needs 2 free
        let call = fx.tracker.call(second).unwrap();
        assert_eq!(MonitoringState::NoRecorder, call.monitoring_state());
        assert_eq!(RecorderState::Inactive, fx.taps[0].state());

        fx.tracker.manage_calls(t0() + secs(1));
        assert_eq!(RecorderState::Available, fx.taps[0].state());
    }

    #[test]
    fn test_same_talkgroup_moves() {
        let mut fx = fixture(2, 0);
        let first = fx
            .tracker
            .handle_activity(&Activity::grant(1, 100, 851.0125e6), t0())
            .unwrap();
        let second = fx
            .tracker
            .handle_activity(&Activity::grant(1, 100, 852.5e6), t0() + secs(1))
            .unwrap();

        assert!(fx.tracker.call(first).is_none());
        let call = fx.tracker.call(second).unwrap();
        assert_eq!(CallState::Recording, call.state());
        assert_eq!(1, call.recorder().unwrap().index());
    }

    #[test]
    fn test_unrecorded_conflicts_are_superseded() {
        let mut fx = fixture(1, 0);
        let (f1, f2) = (851.0125e6, 852.5e6);

        // priority 2 needs two free recorders
        let first = fx.tracker.handle_activity(&Activity::grant(1, 200, f1), t0()).unwrap();
        assert_eq!(
            MonitoringState::NoRecorder,
            fx.tracker.call(first).unwrap().monitoring_state()
        );

        // same talkgroup moves to another frequency
        let second = fx
            .tracker
            .handle_activity(&Activity::grant(1, 200, f2), t0() + secs(1))
            .unwrap();
        assert!(fx.tracker.call(first).is_none());
        assert_eq!(1, fx.tracker.calls().len());
        assert_eq!(vec![(first, 200, 0.0)], *fx.concluded.lock().unwrap());

        // another talkgroup takes over the frequency
        let third = fx
            .tracker
            .handle_activity(&Activity::grant(1, 100, f2), t0() + secs(2))
            .unwrap();
        assert!(fx.tracker.call(second).is_none());
        assert_eq!(1, fx.tracker.calls().len());
        assert_eq!(CallState::Recording, fx.tracker.call(third).unwrap().state());
        assert_eq!(2, fx.concluded.lock().unwrap().len());
        assert!(fx.starts.0.lock().unwrap().contains(&100));
    }

    #[test]
    fn test_kinds_and_coverage() {
        let mut fx = fixture(1, 1);

        let ignored = fx
            .tracker
            .handle_activity(&Activity::grant(1, 400, 851.0e6), t0())
            .unwrap();
        assert_eq!(
            MonitoringState::IgnoredTalkgroup,
            fx.tracker.call(ignored).unwrap().monitoring_state()
        );

        let analog = fx
            .tracker
            .handle_activity(&Activity::grant(1, 300, 851.5e6), t0())
            .unwrap();
        let handle = fx.tracker.call(analog).unwrap().recorder().unwrap();
        assert_eq!(RecorderKind::Analog, handle.kind());

        let outside = fx
            .tracker
            .handle_activity(&Activity::grant(1, 100, 860.0e6), t0())
            .unwrap();
        let call = fx.tracker.call(outside).unwrap();
        assert_eq!(CallState::Monitoring, call.state());
        assert_eq!(MonitoringState::Unspecified, call.monitoring_state());

        assert_eq!(None, fx.tracker.handle_activity(&Activity::grant(2, 100, 851.0e6), t0()));
        assert_eq!(vec![300], *fx.starts.0.lock().unwrap());

        // unrecorded calls time out without a hand-off
        assert_eq!(1, fx.tracker.manage_calls(t0() + secs(3)));
        assert!(fx.tracker.calls().is_empty());
    }

    #[test]
    fn test_idle_accounting_and_shutdown() {
        let mut fx = fixture(1, 0);
        let num = fx
            .tracker
            .handle_activity(&Activity::grant(1, 100, 851.0e6), t0())
            .unwrap();

        fx.tracker.manage_calls(t0() + secs(1));
        fx.tracker.manage_calls(t0() + secs(2));
        assert_eq!(2, fx.tracker.call(num).unwrap().idle_count());

        assert!(fx.taps[0].voice(t0() + secs(2), 0.5));
        fx.tracker.manage_calls(t0() + secs(2));
        assert_eq!(0, fx.tracker.call(num).unwrap().idle_count());
        assert_eq!(CallState::Recording, fx.tracker.call(num).unwrap().state());

        fx.tracker
            .handle_activity(&Activity::grant(1, 200, 851.5e6), t0() + secs(2));
        assert_eq!(2, fx.tracker.calls().len());
        assert_eq!(1, fx.tracker.conclude_all(t0() + secs(3)));
        assert!(fx.tracker.calls().is_empty());
        assert_eq!(vec![(num, 100, 0.5)], *fx.concluded.lock().unwrap());
    }
}
