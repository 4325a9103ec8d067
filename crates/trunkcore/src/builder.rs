use std::path::PathBuf;
use std::sync::Arc;

use trunktags::Talkgroups;

use crate::concluder::{CallConcluder, RecordingConfig};
use crate::numbering::Numbering;
use crate::plugin::Plugin;
use crate::recorder::{Recorder, RecorderSpec};
use crate::source::Source;
use crate::system::{System, TalkgroupDisplayFormat};
use crate::tracker::CallTracker;

/// Builds a [`Source`]
///
/// A source is one physical receiver. All you need to
/// provide is its center frequency and sampling rate, both
/// in Hz. The source covers `center ± rate/2`.
///
/// Recorder pools are sized here and never change size.
/// Conventional recorders are added to a built source with
/// [`Source::create_conventional_recorder()`].
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct SourceBuilder {
    center: f64,
    rate: f64,
    error: f64,
    driver: String,
    device: String,
    antenna: String,
    digital_recorders: usize,
    analog_recorders: usize,
    debug_recorders: usize,
    diagnostic_recorders: usize,
}

impl SourceBuilder {
    /// New source with no recorders
    ///
    /// Negative sampling rates are treated as zero.
    pub fn new(center: f64, rate: f64) -> Self {
        Self {
            center,
            rate: f64::max(rate, 0.0),
            error: 0.0,
            driver: String::new(),
            device: String::new(),
            antenna: String::new(),
            digital_recorders: 0,
            analog_recorders: 0,
            debug_recorders: 0,
            diagnostic_recorders: 0,
        }
    }

    /// Build the source
    ///
    /// The `factory` is called once per recorder, in pool
    /// order: digital, analog, debug, then diagnostic. The
    /// source and recorder numbers are drawn from
    /// `numbering`.
    pub fn build<F>(&self, numbering: &Numbering, mut factory: F) -> Source
    where
        F: FnMut(&RecorderSpec) -> Box<dyn Recorder>,
    {
        let source = Source::from_builder(self, numbering.next_source());
        source.create_recorders(self, numbering, &mut factory);
        source
    }

    /// Frequency correction, in Hz
    pub fn with_error(&mut self, error: f64) -> &mut Self {
        self.error = error;
        self
    }

    /// Driver name, like `osmosdr` or `usrp`
    pub fn with_driver<S: Into<String>>(&mut self, driver: S) -> &mut Self {
        self.driver = driver.into();
        self
    }

    /// Device string, passed through to the driver
    pub fn with_device<S: Into<String>>(&mut self, device: S) -> &mut Self {
        self.device = device.into();
        self
    }

    /// Antenna port
    pub fn with_antenna<S: Into<String>>(&mut self, antenna: S) -> &mut Self {
        self.antenna = antenna.into();
        self
    }

    /// Size of the trunked digital pool
    pub fn with_digital_recorders(&mut self, count: usize) -> &mut Self {
        self.digital_recorders = count;
        self
    }

    /// Size of the trunked analog pool
    pub fn with_analog_recorders(&mut self, count: usize) -> &mut Self {
        self.analog_recorders = count;
        self
    }

    /// Enable the debug recorder
    ///
    /// A source has at most one debug recorder.
    pub fn with_debug_recorder(&mut self, enable: bool) -> &mut Self {
        self.debug_recorders = usize::from(enable);
        self
    }

    /// Size of the diagnostic pool
    pub fn with_diagnostic_recorders(&mut self, count: usize) -> &mut Self {
        self.diagnostic_recorders = count;
        self
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

    /// Size of the trunked digital pool
    pub fn digital_recorders(&self) -> usize {
        self.digital_recorders
    }

    /// Size of the trunked analog pool
    pub fn analog_recorders(&self) -> usize {
        self.analog_recorders
    }

    /// Number of debug recorders (zero or one)
    pub fn debug_recorders(&self) -> usize {
        self.debug_recorders
    }

    /// Size of the diagnostic pool
    pub fn diagnostic_recorders(&self) -> usize {
        self.diagnostic_recorders
    }
}

/// Builds a [`System`]
#[derive(Clone)]
pub struct SystemBuilder {
    sys_num: u32,
    short_name: String,
    system_type: String,
    display_format: TalkgroupDisplayFormat,
    conversation_mode: bool,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl SystemBuilder {
    /// New system
    ///
    /// The `short_name` identifies the system in logs.
    pub fn new<S: Into<String>>(sys_num: u32, short_name: S) -> Self {
        Self {
            sys_num,
            short_name: short_name.into(),
            system_type: "p25".to_owned(),
            display_format: TalkgroupDisplayFormat::default(),
            conversation_mode: false,
            plugins: Vec::new(),
        }
    }

    /// Build the system
    ///
    /// Systems are shared by every call on the system, so
    /// they are returned behind an `Arc`.
    pub fn build(&self) -> Arc<System> {
        Arc::new(System::new(
            self.sys_num,
            self.short_name.clone(),
            self.system_type.clone(),
            self.display_format,
            self.conversation_mode,
            self.plugins.clone(),
        ))
    }

    /// System type, like `p25`, `smartnet`, or `conventional`
    pub fn with_system_type<S: Into<String>>(&mut self, system_type: S) -> &mut Self {
        self.system_type = system_type.into();
        self
    }

    /// How talkgroups appear in log lines
    pub fn with_talkgroup_display_format(&mut self, format: TalkgroupDisplayFormat) -> &mut Self {
        self.display_format = format;
        self
    }

    /// Record across transmissions on the same talkgroup
    pub fn with_conversation_mode(&mut self, enable: bool) -> &mut Self {
        self.conversation_mode = enable;
        self
    }

    /// Register a plugin
    pub fn with_plugin(&mut self, plugin: Arc<dyn Plugin>) -> &mut Self {
        self.plugins.push(plugin);
        self
    }

    /// System number
    pub fn sys_num(&self) -> u32 {
        self.sys_num
    }

    /// Short name
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// System type
    pub fn system_type(&self) -> &str {
        &self.system_type
    }

    /// Talkgroup display format
    pub fn talkgroup_display_format(&self) -> TalkgroupDisplayFormat {
        self.display_format
    }

    /// Conversation mode
    pub fn conversation_mode(&self) -> bool {
        self.conversation_mode
    }
}

/// Builds a [`CallTracker`]
///
/// The default call timeout is 3 seconds.
///
/// The API specified by the builder is part of this crate's
/// API. The actual default values are *not*, however, and
/// are subject to revision in any minor release.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct CallTrackerBuilder {
    call_timeout: f64,
    capture_dir: PathBuf,
    temp_dir: PathBuf,
}

impl CallTrackerBuilder {
    /// New tracker with default options
    pub fn new() -> Self {
        Self {
            call_timeout: 3.0,
            capture_dir: PathBuf::from("."),
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Build a tracker
    ///
    /// The tracker shares the `system`, the talkgroup
    /// directory, and the `sources`. Call numbers are drawn
    /// from `numbering`.
    pub fn build(
        &self,
        system: Arc<System>,
        talkgroups: Arc<Talkgroups>,
        sources: Vec<Arc<Source>>,
        numbering: Arc<Numbering>,
        concluder: Box<dyn CallConcluder>,
    ) -> CallTracker {
        let config = Arc::new(RecordingConfig::new(
            self.capture_dir.clone(),
            self.temp_dir.clone(),
        ));
        CallTracker::new(
            chrono::Duration::milliseconds((self.call_timeout * 1000.0).round() as i64),
            system,
            config,
            talkgroups,
            sources,
            numbering,
            concluder,
        )
    }

    /// Call timeout (seconds)
    ///
    /// A call with no activity for this long is concluded.
    /// Clamped to `[0.5, 3600.0]`.
    pub fn with_call_timeout(&mut self, seconds: f64) -> &mut Self {
        self.call_timeout = f64::clamp(seconds, 0.5, 3600.0);
        self
    }

    /// Directory for finished recordings
    pub fn with_capture_dir<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.capture_dir = dir.into();
        self
    }

    /// Directory for recordings in progress
    pub fn with_temp_dir<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.temp_dir = dir.into();
        self
    }

    /// Call timeout (seconds)
    pub fn call_timeout(&self) -> f64 {
        self.call_timeout
    }

    /// Directory for finished recordings
    pub fn capture_dir(&self) -> &std::path::Path {
        &self.capture_dir
    }

    /// Directory for recordings in progress
    pub fn temp_dir(&self) -> &std::path::Path {
        &self.temp_dir
    }
}

impl Default for CallTrackerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_source_builder() {
        let mut builder = SourceBuilder::new(852.0e6, -1.0);
        assert_approx_eq!(0.0, builder.rate());

        builder
            .with_digital_recorders(4)
            .with_debug_recorder(true)
            .with_driver("osmosdr")
            .with_device("rtl=0");
        assert_eq!(4, builder.digital_recorders());
        assert_eq!(1, builder.debug_recorders());
        assert_eq!("rtl=0", builder.device());
    }

    #[test]
    fn test_tracker_builder() {
        let mut builder = CallTrackerBuilder::default();
        assert_approx_eq!(3.0, builder.call_timeout());
        builder.with_call_timeout(0.0).with_capture_dir("/srv/audio");
        assert_approx_eq!(0.5, builder.call_timeout());
        assert_eq!(std::path::Path::new("/srv/audio"), builder.capture_dir());
    }

    #[test]
    fn test_system_builder() {
        let sys = SystemBuilder::new(3, "county")
            .with_talkgroup_display_format(TalkgroupDisplayFormat::IdTag)
            .with_conversation_mode(true)
            .build();
        assert_eq!(3, sys.sys_num());
        assert_eq!("county", sys.short_name());
        assert_eq!("p25", sys.system_type());
        assert!(sys.conversation_mode());
        assert!(sys.plugins().is_empty());
    }
}
