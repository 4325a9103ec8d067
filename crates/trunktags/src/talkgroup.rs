//! Talkgroups and their recording metadata

use std::fmt;

use strum::EnumMessage;
use thiserror::Error;

/// Priority sentinel meaning "never record this talkgroup"
pub const PRIORITY_NEVER_RECORD: i32 = -1;

/// Default recording priority for trunked talkgroups
///
/// Talkgroup tables which do not specify a priority give
/// every talkgroup this priority.
pub const PRIORITY_DEFAULT: i32 = 1;

/// Talkgroup operating mode
///
/// Talkgroup tables describe each talkgroup with a short
/// mode code, like "`D`" for digital or "`A`" for analog.
///
/// ```
/// use trunktags::TalkgroupMode;
///
/// let mode = TalkgroupMode::from_code("DE").expect("known mode");
/// assert_eq!(TalkgroupMode::DigitalEncrypted, mode);
/// assert!(mode.is_encrypted());
/// assert!(!mode.is_analog());
///
/// assert_eq!("DE", mode.as_code_str());
/// assert_eq!("Digital, encrypted", &format!("{}", mode));
/// ```
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum_macros::EnumMessage,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum TalkgroupMode {
    /// Analog FM voice
    #[strum(serialize = "A", detailed_message = "Analog")]
    Analog,

    /// Digital voice
    #[strum(serialize = "D", detailed_message = "Digital")]
    Digital,

    /// Digital voice, encrypted
    #[strum(serialize = "DE", serialize = "E", detailed_message = "Digital, encrypted")]
    DigitalEncrypted,

    /// Mixed analog and digital
    #[strum(serialize = "M", detailed_message = "Mixed analog/digital")]
    Mixed,

    /// Phase II TDMA digital voice
    #[strum(serialize = "T", detailed_message = "TDMA")]
    Tdma,

    /// Phase II TDMA digital voice, encrypted
    #[strum(serialize = "TE", detailed_message = "TDMA, encrypted")]
    TdmaEncrypted,

    /// Conventional channel
    #[strum(serialize = "Z", detailed_message = "Conventional")]
    Conventional,
}

/// Unrecognized talkgroup mode code
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
#[error("unrecognized talkgroup mode: \"{0}\"")]
pub struct ParseModeErr(pub String);

impl TalkgroupMode {
    /// Parse a talkgroup table mode code
    ///
    /// Codes are case-insensitive and surrounding whitespace
    /// is ignored.
    pub fn from_code<S>(code: S) -> Result<Self, ParseModeErr>
    where
        S: AsRef<str>,
    {
        let code = code.as_ref().trim();
        str::parse(code).map_err(|_| ParseModeErr(code.to_owned()))
    }

    /// Mode code, like "`D`"
    pub fn as_code_str(&self) -> &'static str {
        self.get_serializations()[0]
    }

    /// Human-readable string representation
    pub fn as_display_str(&self) -> &'static str {
        self.get_detailed_message().unwrap_or_else(|| self.as_code_str())
    }

    /// True if calls on this talkgroup need an analog recorder
    pub fn is_analog(&self) -> bool {
        matches!(self, Self::Analog)
    }

    /// True if traffic on this talkgroup is encrypted
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::DigitalEncrypted | Self::TdmaEncrypted)
    }

    /// True if this talkgroup uses Phase II TDMA
    pub fn is_tdma(&self) -> bool {
        matches!(self, Self::Tdma | Self::TdmaEncrypted)
    }
}

impl AsRef<str> for TalkgroupMode {
    fn as_ref(&self) -> &'static str {
        self.as_code_str()
    }
}

impl fmt::Display for TalkgroupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str(self.as_code_str())
        } else {
            f.write_str(self.as_display_str())
        }
    }
}

/// A talkgroup or conventional channel
///
/// Talkgroups are the logical channels of a radio system.
/// Each one carries a recording *priority*: lower numbers
/// are more urgent, and [`PRIORITY_NEVER_RECORD`] means
/// that calls on the talkgroup are never recorded.
///
/// ```
/// use trunktags::{Talkgroup, TalkgroupMode};
///
/// let tg = Talkgroup::trunked(0, 101, TalkgroupMode::Digital)
///     .with_alpha_tag("Fire Dispatch")
///     .with_priority(2);
/// assert_eq!(2, tg.priority());
/// assert!(tg.is_recordable());
/// ```
///
/// Talkgroups are immutable once they are handed to the
/// scheduler, except for their [activity flag](Talkgroup::is_active).
#[derive(Clone, Debug, PartialEq)]
pub struct Talkgroup {
    sys_num: u32,
    number: u32,
    mode: TalkgroupMode,
    alpha_tag: String,
    description: String,
    tag: String,
    group: String,
    priority: i32,
    preferred_nac: Option<u32>,
    freq: f64,
    tone: f64,
    active: bool,
}

impl Talkgroup {
    /// New trunked talkgroup
    ///
    /// The talkgroup receives the [default](PRIORITY_DEFAULT)
    /// priority.
    pub fn trunked(sys_num: u32, number: u32, mode: TalkgroupMode) -> Self {
        Self {
            sys_num,
            number,
            mode,
            alpha_tag: String::new(),
            description: String::new(),
            tag: String::new(),
            group: String::new(),
            priority: PRIORITY_DEFAULT,
            preferred_nac: None,
            freq: 0.0,
            tone: 0.0,
            active: false,
        }
    }

    /// New conventional channel
    ///
    /// Conventional channels are keyed by frequency (Hz) and
    /// have a squelch `tone` (Hz, or zero for carrier squelch).
    /// Their priority is always zero.
    pub fn conventional(sys_num: u32, number: u32, freq: f64, tone: f64) -> Self {
        Self {
            freq,
            tone,
            priority: 0,
            ..Self::trunked(sys_num, number, TalkgroupMode::Conventional)
        }
    }

    /// Set the short alphanumeric tag
    pub fn with_alpha_tag<S: Into<String>>(mut self, alpha_tag: S) -> Self {
        self.alpha_tag = alpha_tag.into();
        self
    }

    /// Set the long description
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    /// Set the service tag, like "`Law Dispatch`"
    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tag = tag.into();
        self
    }

    /// Set the group (category), like "`County Fire`"
    pub fn with_group<S: Into<String>>(mut self, group: S) -> Self {
        self.group = group.into();
        self
    }

    /// Set the recording priority
    ///
    /// Lower values are more urgent. Use
    /// [`PRIORITY_NEVER_RECORD`] to ignore the talkgroup.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the preferred network access code
    ///
    /// A NAC of zero means "no preference."
    pub fn with_preferred_nac(mut self, nac: u32) -> Self {
        self.preferred_nac = if nac == 0 { None } else { Some(nac) };
        self
    }

    /// Owning system number
    pub fn sys_num(&self) -> u32 {
        self.sys_num
    }

    /// Talkgroup number
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Operating mode
    pub fn mode(&self) -> TalkgroupMode {
        self.mode
    }

    /// Short alphanumeric tag
    pub fn alpha_tag(&self) -> &str {
        &self.alpha_tag
    }

    /// Long description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Service tag
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Group (category)
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Recording priority
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// True unless the priority is [`PRIORITY_NEVER_RECORD`]
    pub fn is_recordable(&self) -> bool {
        self.priority != PRIORITY_NEVER_RECORD
    }

    /// Preferred network access code, if any
    pub fn preferred_nac(&self) -> Option<u32> {
        self.preferred_nac
    }

    /// Channel frequency (Hz), for conventional channels
    pub fn freq(&self) -> f64 {
        self.freq
    }

    /// Squelch tone (Hz), for conventional channels
    pub fn tone(&self) -> f64 {
        self.tone
    }

    /// True if the talkgroup has been marked active
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Mark the talkgroup active or inactive
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// One-line summary, suitable for menus
    pub fn menu_string(&self) -> String {
        format!(
            "{:5} - {:<15} {:<20} {:<15} {:<40}",
            self.number, self.alpha_tag, self.tag, self.group, self.description
        )
    }
}

impl fmt::Display for Talkgroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alpha_tag.is_empty() {
            write!(f, "{}", self.number)
        } else {
            write!(f, "{} ({})", self.number, self.alpha_tag)
        }
    }
}
