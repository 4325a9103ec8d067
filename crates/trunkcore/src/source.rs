//! Receivers and their recorder pools

use std::sync::Arc;

#[cfg(not(test))]
use log::{debug, info, warn};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as info;
#[cfg(test)]
use std::println as warn;

use crate::builder::SourceBuilder;
use crate::call::format_freq;
use crate::numbering::{Numbering, SourceId};
use crate::pool::{RecorderPool, Released};
use crate::recorder::{Recorder, RecorderHandle, RecorderKind, RecorderSpec, RecorderState};

/// A physical receiver
///
/// A source covers the band `center ± rate/2` and owns one
/// [`RecorderPool`] for every [`RecorderKind`]. Pools never
/// share recorders. Only the trunked pools are subject to
/// admission control; see [`Source::allocate()`].
///
/// Sources are shared between the call tracker and anything
/// else which needs to inspect them, so every method takes
/// `&self`. Build one with a [`SourceBuilder`].
#[derive(Debug)]
pub struct Source {
    id: SourceId,
    driver: String,
    device: String,
    antenna: String,
    center: f64,
    rate: f64,
    error: f64,
    min_hz: f64,
    max_hz: f64,
    digital: RecorderPool,
    analog: RecorderPool,
    digital_conventional: RecorderPool,
    analog_conventional: RecorderPool,
    debug: RecorderPool,
    diagnostic: RecorderPool,
}

impl Source {
    pub(crate) fn from_builder(cfg: &SourceBuilder, id: SourceId) -> Self {
        let half = cfg.rate() / 2.0;
        let out = Self {
            id,
            driver: cfg.driver().to_owned(),
            device: cfg.device().to_owned(),
            antenna: cfg.antenna().to_owned(),
            center: cfg.center(),
            rate: cfg.rate(),
            error: cfg.error(),
            min_hz: cfg.center() - half,
            max_hz: cfg.center() + half,
            digital: RecorderPool::new(id, RecorderKind::Digital),
            analog: RecorderPool::new(id, RecorderKind::Analog),
            digital_conventional: RecorderPool::new(id, RecorderKind::DigitalConventional),
            analog_conventional: RecorderPool::new(id, RecorderKind::AnalogConventional),
            debug: RecorderPool::new(id, RecorderKind::Debug),
            diagnostic: RecorderPool::new(id, RecorderKind::Diagnostic),
        };
        info!(
            "[ source {} ] {} - {} to {} ({})",
            id,
            format_freq(out.center),
            format_freq(out.min_hz),
            format_freq(out.max_hz),
            out.device
        );
        out
    }

    pub(crate) fn create_recorders<F>(&self, cfg: &SourceBuilder, numbering: &Numbering, factory: &mut F)
    where
        F: FnMut(&RecorderSpec) -> Box<dyn Recorder>,
    {
        let plan = [
            (RecorderKind::Digital, cfg.digital_recorders()),
            (RecorderKind::Analog, cfg.analog_recorders()),
            (RecorderKind::Debug, cfg.debug_recorders()),
            (RecorderKind::Diagnostic, cfg.diagnostic_recorders()),
        ];
        for (kind, count) in plan {
            for _ in 0..count {
                self.create_recorder(kind, numbering, &mut *factory);
            }
        }
    }

    /// Add a conventional recorder
    ///
    /// Conventional recorders are dedicated to one channel.
    /// Bind them with [`Source::bind_dedicated()`]. Returns
    /// `None` if `kind` is not a conventional kind.
    pub fn create_conventional_recorder<F>(
        &self,
        kind: RecorderKind,
        numbering: &Numbering,
        mut factory: F,
    ) -> Option<RecorderHandle>
    where
        F: FnMut(&RecorderSpec) -> Box<dyn Recorder>,
    {
        if !kind.is_conventional() {
            warn!(
                "[ source {} ] {} is not a conventional recorder kind",
                self.id, kind
            );
            return None;
        }
        Some(self.create_recorder(kind, numbering, &mut factory))
    }

    fn create_recorder<F>(&self, kind: RecorderKind, numbering: &Numbering, factory: &mut F) -> RecorderHandle
    where
        F: FnMut(&RecorderSpec) -> Box<dyn Recorder>,
    {
        let spec = RecorderSpec {
            num: numbering.next_recorder(),
            kind,
            source: self.id,
            center: self.center,
            rate: self.rate,
        };
        let handle = self.pool(kind).push(factory(&spec));
        debug!("[ source {} ] created {}", self.id, handle);
        handle
    }

    /// Source id
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Driver name
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Device string
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Antenna port
    pub fn antenna(&self) -> &str {
        &self.antenna
    }

    /// Center frequency (Hz)
    pub fn center(&self) -> f64 {
        self.center
    }

    /// Sampling rate (Hz)
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Frequency correction (Hz)
    pub fn error(&self) -> f64 {
        self.error
    }

    /// Lowest covered frequency (Hz)
    pub fn min_hz(&self) -> f64 {
        self.min_hz
    }

    /// Highest covered frequency (Hz)
    pub fn max_hz(&self) -> f64 {
        self.max_hz
    }

    /// True if `freq` (Hz) is within the covered band
    pub fn covers(&self, freq: f64) -> bool {
        freq >= self.min_hz && freq <= self.max_hz
    }

    /// The pool for recorders of `kind`
    pub fn pool(&self, kind: RecorderKind) -> &RecorderPool {
        match kind {
            RecorderKind::Digital => &self.digital,
            RecorderKind::Analog => &self.analog,
            RecorderKind::DigitalConventional => &self.digital_conventional,
            RecorderKind::AnalogConventional => &self.analog_conventional,
            RecorderKind::Debug => &self.debug,
            RecorderKind::Diagnostic => &self.diagnostic,
        }
    }

    fn pools(&self) -> [&RecorderPool; 6] {
        [
            &self.digital,
            &self.analog,
            &self.digital_conventional,
            &self.analog_conventional,
            &self.debug,
            &self.diagnostic,
        ]
    }

    /// Available trunked digital recorders
    pub fn get_num_available_digital_recorders(&self) -> usize {
        self.digital.available()
    }

    /// Available trunked analog recorders
    pub fn get_num_available_analog_recorders(&self) -> usize {
        self.analog.available()
    }

    /// All digital recorders, trunked and conventional
    pub fn digital_recorder_count(&self) -> usize {
        self.digital.capacity() + self.digital_conventional.capacity()
    }

    /// All analog recorders, trunked and conventional
    pub fn analog_recorder_count(&self) -> usize {
        self.analog.capacity() + self.analog_conventional.capacity()
    }

    /// Debug recorders
    pub fn debug_recorder_count(&self) -> usize {
        self.debug.capacity()
    }

    /// Diagnostic recorders
    pub fn diagnostic_recorder_count(&self) -> usize {
        self.diagnostic.capacity()
    }

    /// State of the recorder named by `handle`
    pub fn recorder_state(&self, handle: RecorderHandle) -> Option<RecorderState> {
        self.with_recorder(handle, |rec| rec.state())
    }

    /// Run `f` against the recorder named by `handle`
    ///
    /// Returns `None` if the handle belongs to another
    /// source or is stale. A handle is stale once its
    /// recorder has been bound to a later call.
    pub fn with_recorder<F, R>(&self, handle: RecorderHandle, f: F) -> Option<R>
    where
        F: FnOnce(&mut dyn Recorder) -> R,
    {
        if handle.source() != self.id {
            return None;
        }
        self.pool(handle.kind()).with_recorder(handle, f)
    }

    /// Stop a recorder and collect what it captured
    ///
    /// Only the call which holds `handle` may do this, when
    /// it concludes.
    pub(crate) fn release(&self, handle: RecorderHandle) -> Option<Released> {
        if handle.source() != self.id {
            warn!(
                "[ source {} ] cannot release {}: wrong source",
                self.id, handle
            );
            return None;
        }
        self.pool(handle.kind()).release(handle)
    }

    /// Acknowledge the release of one recorder
    pub fn mark_available(&self, handle: RecorderHandle) -> bool {
        handle.source() == self.id && self.pool(handle.kind()).mark_available(handle)
    }

    /// Return every `INACTIVE` recorder to service
    ///
    /// This is the reset sweep. Returns the number of
    /// recorders which became `AVAILABLE`.
    pub fn reset_sweep(&self) -> usize {
        let count: usize = self.pools().iter().map(|p| p.reset_sweep()).sum();
        if count > 0 {
            debug!("[ source {} ] reset {} recorders", self.id, count);
        }
        count
    }

    /// Log every recorder on this source
    pub fn print_recorders(&self) {
        info!(
            "[ source {}: {} ] {}",
            self.id,
            format_freq(self.center),
            self.device
        );
        for pool in self.pools() {
            pool.log_recorders();
        }
    }
}

/// Finds sources by id
///
/// Calls refer to their recorders by handle. Methods which
/// need to reach a recorder take a `SourceLookup` to resolve
/// the handle's source.
pub trait SourceLookup {
    /// The source with the given `id`
    fn find_source(&self, id: SourceId) -> Option<&Source>;
}

impl SourceLookup for Source {
    fn find_source(&self, id: SourceId) -> Option<&Source> {
        if self.id == id {
            Some(self)
        } else {
            None
        }
    }
}

impl SourceLookup for [Arc<Source>] {
    fn find_source(&self, id: SourceId) -> Option<&Source> {
        self.iter().map(|s| s.as_ref()).find(|s| s.id() == id)
    }
}

impl SourceLookup for Vec<Arc<Source>> {
    fn find_source(&self, id: SourceId) -> Option<&Source> {
        self.as_slice().find_source(id)
    }
}

impl SourceLookup for [Source] {
    fn find_source(&self, id: SourceId) -> Option<&Source> {
        self.iter().find(|s| s.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    use crate::recorder::soft::SoftRecorder;

    fn soft(spec: &RecorderSpec) -> Box<dyn Recorder> {
        Box::new(SoftRecorder::new(spec))
    }

    #[test]
    fn test_coverage() {
        let numbering = Numbering::new();
        let src = SourceBuilder::new(852.0e6, 4.0e6).build(&numbering, soft);
        assert_approx_eq!(850.0e6, src.min_hz());
        assert_approx_eq!(854.0e6, src.max_hz());
        assert!(src.covers(850.0e6));
        assert!(src.covers(854.0e6));
        assert!(!src.covers(854.0125e6));
        assert!(!src.covers(849.9e6));
    }

    #[test]
    fn test_pools_and_counts() {
        let numbering = Numbering::new();
        let src = SourceBuilder::new(852.0e6, 4.0e6)
            .with_digital_recorders(3)
            .with_analog_recorders(2)
            .with_debug_recorder(true)
            .with_diagnostic_recorders(1)
            .build(&numbering, soft);

        let conv = src
            .create_conventional_recorder(RecorderKind::AnalogConventional, &numbering, soft)
            .expect("conventional");
        assert_eq!(RecorderKind::AnalogConventional, conv.kind());
        assert_eq!(7, conv.num());
        assert!(src
            .create_conventional_recorder(RecorderKind::Digital, &numbering, soft)
            .is_none());

        assert_eq!(3, src.digital_recorder_count());
        assert_eq!(3, src.analog_recorder_count());
        assert_eq!(1, src.debug_recorder_count());
        assert_eq!(1, src.diagnostic_recorder_count());
        assert_eq!(3, src.get_num_available_digital_recorders());
        assert_eq!(2, src.get_num_available_analog_recorders());
        assert_eq!(Some(RecorderState::Available), src.recorder_state(conv));

        src.print_recorders();
    }

    #[test]
    fn test_lookup() {
        let numbering = Numbering::new();
        let sources: Vec<Arc<Source>> = (0..3)
            .map(|i| {
                Arc::new(
                    SourceBuilder::new(851.0e6 + f64::from(i) * 8.0e6, 8.0e6)
                        .build(&numbering, soft),
                )
            })
            .collect();

        assert_eq!(Some(SourceId(2)), sources.find_source(SourceId(2)).map(|s| s.id()));
        assert!(sources.find_source(SourceId(3)).is_none());
        assert!(sources[0].find_source(SourceId(1)).is_none());
    }
}
