//! Trunked system identity

use std::fmt;
use std::sync::Arc;

use strum::EnumMessage;

use crate::plugin::Plugin;

/// How talkgroups are rendered in log lines
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum_macros::EnumMessage,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum TalkgroupDisplayFormat {
    /// Number only, like `1001`
    #[default]
    #[strum(serialize = "id")]
    Id,

    /// Number then tag, like `1001 (Fire Disp)`
    #[strum(serialize = "id_tag")]
    IdTag,

    /// Tag then number, like `Fire Disp (1001)`
    #[strum(serialize = "tag_id")]
    TagId,
}

impl TalkgroupDisplayFormat {
    /// Configuration string for this format
    pub fn as_str(&self) -> &'static str {
        self.get_serializations()[0]
    }

    /// Render a talkgroup number and tag
    ///
    /// Number columns are padded so log lines align.
    pub fn format(&self, number: u32, tag: &str) -> String {
        match self {
            TalkgroupDisplayFormat::Id => format!("{:>10}", number),
            TalkgroupDisplayFormat::IdTag => format!("{:>10} ({:>23})", number, tag),
            TalkgroupDisplayFormat::TagId => format!("{:>23} ({:>10})", tag, number),
        }
    }
}

impl AsRef<str> for TalkgroupDisplayFormat {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TalkgroupDisplayFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trunked or conventional radio system
///
/// The `System` is read-only once built. Every call on the
/// system shares it through an `Arc`. Construct it with a
/// [`SystemBuilder`](crate::SystemBuilder).
pub struct System {
    sys_num: u32,
    short_name: String,
    system_type: String,
    display_format: TalkgroupDisplayFormat,
    conversation_mode: bool,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl System {
    pub(crate) fn new(
        sys_num: u32,
        short_name: String,
        system_type: String,
        display_format: TalkgroupDisplayFormat,
        conversation_mode: bool,
        plugins: Vec<Arc<dyn Plugin>>,
    ) -> Self {
        Self {
            sys_num,
            short_name,
            system_type,
            display_format,
            conversation_mode,
            plugins,
        }
    }

    /// System number
    pub fn sys_num(&self) -> u32 {
        self.sys_num
    }

    /// Short name, used in log lines and file names
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// System type, like `p25` or `conventional`
    pub fn system_type(&self) -> &str {
        &self.system_type
    }

    /// Talkgroup display format
    pub fn talkgroup_display_format(&self) -> TalkgroupDisplayFormat {
        self.display_format
    }

    /// Conversation mode
    ///
    /// In conversation mode, a call keeps recording across
    /// several transmissions on the same talkgroup.
    pub fn conversation_mode(&self) -> bool {
        self.conversation_mode
    }

    /// Registered plugins
    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("sys_num", &self.sys_num)
            .field("short_name", &self.short_name)
            .field("system_type", &self.system_type)
            .field("display_format", &self.display_format)
            .field("conversation_mode", &self.conversation_mode)
            .field("plugins", &self.plugins.len())
            .finish()
    }
}
