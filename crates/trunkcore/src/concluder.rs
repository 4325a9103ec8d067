//! Call Concluder hand-off

use std::path::{Path, PathBuf};

use crate::call::Call;
use crate::system::System;

/// Where finished recordings go
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordingConfig {
    capture_dir: PathBuf,
    temp_dir: PathBuf,
}

impl RecordingConfig {
    /// New configuration
    pub fn new<P, Q>(capture_dir: P, temp_dir: Q) -> Self
    where
        P: Into<PathBuf>,
        Q: Into<PathBuf>,
    {
        Self {
            capture_dir: capture_dir.into(),
            temp_dir: temp_dir.into(),
        }
    }

    /// Directory for finished recordings
    pub fn capture_dir(&self) -> &Path {
        &self.capture_dir
    }

    /// Directory for recordings in progress
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }
}

/// Receives every concluded call, exactly once
///
/// [`Call::conclude_call()`](crate::Call::conclude_call)
/// invokes the concluder after the call's recorder has been
/// stopped and its transmissions merged into the call. The
/// call is final at that point. Post-processing and upload
/// belong to the concluder.
///
/// Concluders should not block. Copy what you need out of
/// the call and hand it to a worker.
///
/// Closures implement this trait:
///
/// ```
/// use trunkcore::{Call, CallConcluder, RecordingConfig, System};
///
/// let log = |call: &Call, _: &System, _: &RecordingConfig| {
///     println!("call {} lasted {:.1} s", call.call_num(), call.final_length());
/// };
/// let concluder: &dyn CallConcluder = &log;
/// # let _ = concluder;
/// ```
pub trait CallConcluder {
    /// Accept a concluded call
    fn conclude(&self, call: &Call, system: &System, config: &RecordingConfig);
}

impl<F> CallConcluder for F
where
    F: Fn(&Call, &System, &RecordingConfig),
{
    fn conclude(&self, call: &Call, system: &System, config: &RecordingConfig) {
        self(call, system, config)
    }
}
