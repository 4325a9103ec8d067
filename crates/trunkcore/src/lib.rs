//! # trunkcore: Trunked Radio Call Scheduling
//!
//! This crate decides, in real time, which radio calls get
//! recorded. A trunked radio system has many more talkgroups
//! than a receiver has recorders. As the control channel
//! announces activity, each [`Call`] competes for a scarce
//! pool of [`Recorder`]s on the [`Source`] (receiver) which
//! covers its frequency.
//!
//! The crate provides
//!
//! * the [`Call`] state machine, which runs from first
//!   activity to a single hand-off to a [`CallConcluder`];
//! * per-source, per-kind [`RecorderPool`]s;
//! * admission control, which binds calls to recorders by
//!   talkgroup priority; see [`Source::allocate()`];
//! * a [`CallTracker`], which owns the live calls and does
//!   periodic housekeeping.
//!
//! Signal acquisition, demodulation, and audio encoding are
//! *not* part of this crate. Recorders are consumed through
//! the [`Recorder`] trait. A pure-software implementation,
//! [`SoftRecorder`](recorder::soft::SoftRecorder), is
//! provided for testing.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use chrono::{Duration, TimeZone, Utc};
//! use trunkcore::recorder::soft::SoftRecorder;
//! use trunkcore::{
//!     Activity, Call, CallState, CallTrackerBuilder, Numbering, RecordingConfig,
//!     SourceBuilder, System, SystemBuilder,
//! };
//! use trunktags::{Talkgroup, TalkgroupMode, Talkgroups};
//!
//! // ids for calls, sources, and recorders
//! let numbering = Arc::new(Numbering::new());
//!
//! // one receiver with two digital recorders
//! let mut taps = Vec::new();
//! let source = SourceBuilder::new(852.0e6, 8.0e6)
//!     .with_digital_recorders(2)
//!     .build(&numbering, |spec| {
//!         let (rec, tap) = SoftRecorder::boxed(spec);
//!         taps.push(tap);
//!         rec
//!     });
//!
//! let talkgroups: Talkgroups = vec![
//!     Talkgroup::trunked(0, 1001, TalkgroupMode::Digital)
//!         .with_alpha_tag("Fire Disp")
//!         .with_priority(1),
//! ]
//! .into_iter()
//! .collect();
//!
//! let mut tracker = CallTrackerBuilder::new()
//!     .with_call_timeout(3.0)
//!     .build(
//!         SystemBuilder::new(0, "metro").build(),
//!         Arc::new(talkgroups),
//!         vec![Arc::new(source)],
//!         numbering,
//!         Box::new(|call: &Call, _: &System, _: &RecordingConfig| {
//!             println!("{} finished: {:.1} s", call, call.final_length());
//!         }),
//!     );
//!
//! // a channel grant starts a recorded call
//! let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let num = tracker
//!     .handle_activity(&Activity::grant(0, 1001, 851.0125e6).with_source(42), t0)
//!     .unwrap();
//! assert_eq!(CallState::Recording, tracker.call(num).unwrap().state());
//!
//! // the recorder captures some voice
//! taps[0].voice(t0 + Duration::seconds(1), 1.0);
//!
//! // with no further activity, the call times out
//! assert_eq!(1, tracker.manage_calls(t0 + Duration::seconds(3)));
//! assert!(tracker.calls().is_empty());
//! ```
//!
//! ## Recorder lifecycle
//!
//! Recorders move between three states:
//!
//! * `AVAILABLE`: ready for a new call
//! * `ACTIVE`: bound to exactly one call
//! * `INACTIVE`: released by a concluded call
//!
//! A released recorder is *not* immediately reusable. It
//! returns to service only when the source runs its
//! [reset sweep](Source::reset_sweep), which the
//! [`CallTracker`] does at the end of every
//! [`manage_calls()`](CallTracker::manage_calls).
//!
//! ## Logging
//!
//! This crate logs through the [log](https://docs.rs/log)
//! facade. Admission decisions are logged at `info`, and
//! invariant violations at `error`.
//!
//! ## Threading
//!
//! Sources may be shared between threads. Each pool
//! serializes its count checks and binds under one lock.
//! Calls are plain values owned by one thread at a time.
//! Plugin hooks and the concluder are never invoked while a
//! pool lock is held.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod activity;
mod admission;
mod builder;
pub mod call;
mod concluder;
mod numbering;
mod plugin;
mod pool;
pub mod recorder;
mod source;
mod system;
mod tracker;

pub use activity::{Activity, ActivityKind, UnitId};
pub use admission::Admission;
pub use builder::{CallTrackerBuilder, SourceBuilder, SystemBuilder};
pub use call::{
    Call, CallError, CallFactory, CallState, CallStats, MonitoringState, RecorderStats,
};
pub use concluder::{CallConcluder, RecordingConfig};
pub use numbering::{Numbering, Sequence, SourceId};
pub use plugin::{Plugin, SignalKind};
pub use pool::{PoolCensus, RecorderPool, Refusal};
pub use recorder::{
    Recorder, RecorderHandle, RecorderKind, RecorderSpec, RecorderState, Transmission,
};
pub use source::{Source, SourceLookup};
pub use system::{System, TalkgroupDisplayFormat};
pub use tracker::CallTracker;
