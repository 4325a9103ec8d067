//! Talkgroup directory

#[cfg(not(test))]
use log::debug;

#[cfg(test)]
use std::println as debug;

use crate::talkgroup::Talkgroup;

/// Directory of known talkgroups and conventional channels
///
/// The directory maps `(system number, talkgroup number)`
/// or `(system number, frequency)` to [`Talkgroup`] metadata.
/// When more than one entry matches, the first one added wins.
///
/// ```
/// use trunktags::{Talkgroup, TalkgroupMode, Talkgroups};
///
/// let mut dir = Talkgroups::new();
/// dir.add(Talkgroup::trunked(0, 101, TalkgroupMode::Digital).with_priority(2));
/// dir.add(Talkgroup::conventional(1, 7, 453.5e6, 0.0));
///
/// assert_eq!(2, dir.find_talkgroup(0, 101).unwrap().priority());
/// assert!(dir.find_talkgroup(1, 101).is_none());
/// assert_eq!(7, dir.find_talkgroup_by_freq(1, 453.5e6).unwrap().number());
/// ```
///
/// Once loaded, the directory is read-only. Share it behind
/// an `Arc` with the call scheduler.
#[derive(Clone, Debug, Default)]
pub struct Talkgroups {
    talkgroups: Vec<Talkgroup>,
}

impl Talkgroups {
    /// Empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a talkgroup to the end of the directory
    pub fn add(&mut self, talkgroup: Talkgroup) {
        debug!(
            "talkgroups: adding sys {} talkgroup {}",
            talkgroup.sys_num(),
            talkgroup
        );
        self.talkgroups.push(talkgroup);
    }

    /// Find a talkgroup by number
    pub fn find_talkgroup(&self, sys_num: u32, number: u32) -> Option<&Talkgroup> {
        self.talkgroups
            .iter()
            .find(|tg| tg.sys_num() == sys_num && tg.number() == number)
    }

    /// Find a conventional channel by frequency
    ///
    /// The `freq` (Hz) must match exactly.
    pub fn find_talkgroup_by_freq(&self, sys_num: u32, freq: f64) -> Option<&Talkgroup> {
        self.talkgroups
            .iter()
            .find(|tg| tg.sys_num() == sys_num && tg.freq() == freq)
    }

    /// Iterate over all entries, in the order added
    pub fn iter(&self) -> std::slice::Iter<'_, Talkgroup> {
        self.talkgroups.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.talkgroups.len()
    }

    /// True if the directory has no entries
    pub fn is_empty(&self) -> bool {
        self.talkgroups.is_empty()
    }
}

impl FromIterator<Talkgroup> for Talkgroups {
    fn from_iter<I: IntoIterator<Item = Talkgroup>>(iter: I) -> Self {
        let mut out = Self::new();
        for tg in iter {
            out.add(tg);
        }
        out
    }
}

impl<'a> IntoIterator for &'a Talkgroups {
    type Item = &'a Talkgroup;
    type IntoIter = std::slice::Iter<'a, Talkgroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
