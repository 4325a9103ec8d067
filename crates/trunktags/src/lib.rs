//! # trunktags: Talkgroup Directory
//!
//! This crate holds the metadata that a trunked radio call
//! recorder consults when it decides what to record:
//!
//! * [`Talkgroup`]: a logical channel with a recording
//!   *priority*, tags, and a preferred network access code
//!   (NAC). Conventional channels are talkgroups keyed by
//!   frequency.
//!
//! * [`Talkgroups`]: a read-only directory which looks up
//!   talkgroups by number or by frequency.
//!
//! * [`UnitTags`]: human-readable aliases for the ids of
//!   individual radios.
//!
//! For the scheduler which consumes this directory, see the
//! companion crate `trunkcore`.
//!
//! ## Priorities
//!
//! Lower priority numbers are *more* urgent. A priority of
//! [`PRIORITY_NEVER_RECORD`] (`-1`) means calls on the
//! talkgroup are never recorded.
//!
//! ```
//! use trunktags::{Talkgroup, TalkgroupMode, Talkgroups, PRIORITY_NEVER_RECORD};
//!
//! let mut dir = Talkgroups::new();
//! dir.add(
//!     Talkgroup::trunked(0, 1001, TalkgroupMode::Digital)
//!         .with_alpha_tag("Fire Disp")
//!         .with_priority(1),
//! );
//! dir.add(
//!     Talkgroup::trunked(0, 1002, TalkgroupMode::DigitalEncrypted)
//!         .with_priority(PRIORITY_NEVER_RECORD),
//! );
//!
//! assert!(dir.find_talkgroup(0, 1001).unwrap().is_recordable());
//! assert!(!dir.find_talkgroup(0, 1002).unwrap().is_recordable());
//! ```
//!
//! Loading these tables from files is left to the caller.

mod directory;
mod talkgroup;
pub mod unittags;

pub use directory::Talkgroups;
pub use talkgroup::{
    ParseModeErr, Talkgroup, TalkgroupMode, PRIORITY_DEFAULT, PRIORITY_NEVER_RECORD,
};
pub use unittags::{UnitTag, UnitTagErr, UnitTags};
