//! Argument datatypes and the free-text alias table that resolves them.
//!
//! Type names written in a syntax string (`<count: int>`, `[where: voice-channel]`)
//! are normalized before lookup: every non-letter is dropped, the rest is
//! lowercased and a single trailing plural `s` is removed. `Integers`,
//! `voice channels` and `voice-channel` therefore all resolve.

use std::fmt;

use strsim::levenshtein;
use vidar_common::{ChannelKind, OptionKind};

/// Which channel categories a channel argument accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelScope {
    All,
    Text,
    Voice,
    Stage,
    Category,
    Announcement,
    Thread,
    Forum,
}

impl ChannelScope {
    pub fn kinds(self) -> Vec<ChannelKind> {
        match self {
            ChannelScope::All => ChannelKind::ALL.to_vec(),
            ChannelScope::Text => vec![ChannelKind::GuildText],
            ChannelScope::Voice => vec![ChannelKind::GuildVoice],
            ChannelScope::Stage => vec![ChannelKind::GuildStageVoice],
            ChannelScope::Category => vec![ChannelKind::GuildCategory],
            ChannelScope::Announcement => vec![ChannelKind::GuildAnnouncement],
            ChannelScope::Thread => vec![
                ChannelKind::AnnouncementThread,
                ChannelKind::PrivateThread,
                ChannelKind::PublicThread,
            ],
            ChannelScope::Forum => vec![ChannelKind::GuildForum],
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            ChannelScope::All => "channel",
            ChannelScope::Text => "text channel",
            ChannelScope::Voice => "voice channel",
            ChannelScope::Stage => "stage channel",
            ChannelScope::Category => "category channel",
            ChannelScope::Announcement => "announcement channel",
            ChannelScope::Thread => "thread channel",
            ChannelScope::Forum => "forum channel",
        }
    }
}

/// Datatype of a command argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgType {
    String,
    Integer,
    Float,
    Boolean,
    User,
    Role,
    Mentionable,
    Attachment,
    Channel(ChannelScope),
}

/// Wire-level primitive an argument's value travels as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    String,
    Number,
    Boolean,
}

/// Canonical spellings offered when an unknown type name is close to one of them.
const KNOWN_NAMES: &[&str] = &[
    "string",
    "integer",
    "number",
    "float",
    "boolean",
    "user",
    "role",
    "mentionable",
    "attachment",
    "file",
    "channel",
    "voice channel",
    "text channel",
    "stage channel",
    "category channel",
    "thread channel",
    "announcement channel",
    "forum channel",
];

fn normalize(raw: &str) -> String {
    let mut value: String = raw
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect();
    if value.ends_with('s') {
        value.pop();
    }
    value
}

fn channel_prefix(prefix: &str) -> ChannelScope {
    match prefix {
        "" | "all" => ChannelScope::All,
        "voice" | "vc" => ChannelScope::Voice,
        "stage" => ChannelScope::Stage,
        "category" | "cat" => ChannelScope::Category,
        "thread" => ChannelScope::Thread,
        "announcement" | "announcements" | "news" => ChannelScope::Announcement,
        "forum" | "forums" => ChannelScope::Forum,
        _ => ChannelScope::Text,
    }
}

impl ArgType {
    /// Types that may carry a fixed list of choices.
    pub const CHOICE_COMPATIBLE: [ArgType; 3] =
        [ArgType::String, ArgType::Integer, ArgType::Float];

    /// Resolve a free-text type name. `None` means the name is not known.
    pub fn resolve(raw: &str) -> Option<ArgType> {
        let value = normalize(raw);
        if let Some(prefix) = value.strip_suffix("channel") {
            return Some(ArgType::Channel(channel_prefix(prefix)));
        }
        let resolved = match value.as_str() {
            "string" | "str" => ArgType::String,
            "int" | "integer" | "intg" => ArgType::Integer,
            "num" | "number" | "float" => ArgType::Float,
            "bool" | "boolean" => ArgType::Boolean,
            "user" => ArgType::User,
            "role" => ArgType::Role,
            "mention" | "mentionable" => ArgType::Mentionable,
            "attachment" | "file" | "image" => ArgType::Attachment,
            "vc" | "voice" => ArgType::Channel(ChannelScope::Voice),
            _ => return None,
        };
        Some(resolved)
    }

    /// Closest canonical type name to an unknown input, if any is near enough.
    pub fn suggest(raw: &str) -> Option<&'static str> {
        let input = raw.trim().to_lowercase();
        let mut best: Option<(&str, usize)> = None;
        for &name in KNOWN_NAMES {
            let distance = levenshtein(&input, name);
            if distance <= 2 && best.is_none_or(|(_, d)| distance < d) {
                best = Some((name, distance));
            }
        }
        best.map(|(name, _)| name)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ArgType::Integer | ArgType::Float)
    }

    pub fn is_channel(self) -> bool {
        matches!(self, ArgType::Channel(_))
    }

    pub fn is_choice_compatible(self) -> bool {
        Self::CHOICE_COMPATIBLE.contains(&self)
    }

    /// Channel categories accepted by a channel argument; empty for other types.
    pub fn channel_kinds(self) -> Vec<ChannelKind> {
        match self {
            ArgType::Channel(scope) => scope.kinds(),
            _ => Vec::new(),
        }
    }

    pub fn primitive(self) -> Primitive {
        match self {
            ArgType::Integer | ArgType::Float => Primitive::Number,
            ArgType::Boolean => Primitive::Boolean,
            _ => Primitive::String,
        }
    }

    pub fn option_kind(self) -> OptionKind {
        match self {
            ArgType::String => OptionKind::String,
            ArgType::Integer => OptionKind::Integer,
            ArgType::Float => OptionKind::Number,
            ArgType::Boolean => OptionKind::Boolean,
            ArgType::User => OptionKind::User,
            ArgType::Role => OptionKind::Role,
            ArgType::Mentionable => OptionKind::Mentionable,
            ArgType::Attachment => OptionKind::Attachment,
            ArgType::Channel(_) => OptionKind::Channel,
        }
    }

    /// The name this type is written as in a syntax string.
    pub fn keyword(self) -> &'static str {
        match self {
            ArgType::String => "string",
            ArgType::Integer => "integer",
            ArgType::Float => "number",
            ArgType::Boolean => "boolean",
            ArgType::User => "user",
            ArgType::Role => "role",
            ArgType::Mentionable => "mentionable",
            ArgType::Attachment => "attachment",
            ArgType::Channel(scope) => scope.keyword(),
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
