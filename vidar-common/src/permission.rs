//! Guild permission flags.
//!
//! Names are accepted in any of the spellings hosts commonly use
//! (`MANAGE_GUILD`, `ManageGuild`, `manage guild`) and are always displayed
//! in the platform's SCREAMING_SNAKE form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Permission {
    CreateInstantInvite,
    KickMembers,
    BanMembers,
    Administrator,
    ManageChannels,
    ManageGuild,
    AddReactions,
    ViewAuditLog,
    PrioritySpeaker,
    Stream,
    ViewChannel,
    SendMessages,
    SendTtsMessages,
    ManageMessages,
    EmbedLinks,
    AttachFiles,
    ReadMessageHistory,
    MentionEveryone,
    UseExternalEmojis,
    ViewGuildInsights,
    Connect,
    Speak,
    MuteMembers,
    DeafenMembers,
    MoveMembers,
    UseVad,
    ChangeNickname,
    ManageNicknames,
    ManageRoles,
    ManageWebhooks,
    ManageGuildExpressions,
    UseApplicationCommands,
    RequestToSpeak,
    ManageEvents,
    ManageThreads,
    CreatePublicThreads,
    CreatePrivateThreads,
    UseExternalStickers,
    SendMessagesInThreads,
    UseEmbeddedActivities,
    ModerateMembers,
}

// Bit position in the platform bitfield is the table index.
const TABLE: &[(Permission, &str)] = &[
    (Permission::CreateInstantInvite, "CREATE_INSTANT_INVITE"),
    (Permission::KickMembers, "KICK_MEMBERS"),
    (Permission::BanMembers, "BAN_MEMBERS"),
    (Permission::Administrator, "ADMINISTRATOR"),
    (Permission::ManageChannels, "MANAGE_CHANNELS"),
    (Permission::ManageGuild, "MANAGE_GUILD"),
    (Permission::AddReactions, "ADD_REACTIONS"),
    (Permission::ViewAuditLog, "VIEW_AUDIT_LOG"),
    (Permission::PrioritySpeaker, "PRIORITY_SPEAKER"),
    (Permission::Stream, "STREAM"),
    (Permission::ViewChannel, "VIEW_CHANNEL"),
    (Permission::SendMessages, "SEND_MESSAGES"),
    (Permission::SendTtsMessages, "SEND_TTS_MESSAGES"),
    (Permission::ManageMessages, "MANAGE_MESSAGES"),
    (Permission::EmbedLinks, "EMBED_LINKS"),
    (Permission::AttachFiles, "ATTACH_FILES"),
    (Permission::ReadMessageHistory, "READ_MESSAGE_HISTORY"),
    (Permission::MentionEveryone, "MENTION_EVERYONE"),
    (Permission::UseExternalEmojis, "USE_EXTERNAL_EMOJIS"),
    (Permission::ViewGuildInsights, "VIEW_GUILD_INSIGHTS"),
    (Permission::Connect, "CONNECT"),
    (Permission::Speak, "SPEAK"),
    (Permission::MuteMembers, "MUTE_MEMBERS"),
    (Permission::DeafenMembers, "DEAFEN_MEMBERS"),
    (Permission::MoveMembers, "MOVE_MEMBERS"),
    (Permission::UseVad, "USE_VAD"),
    (Permission::ChangeNickname, "CHANGE_NICKNAME"),
    (Permission::ManageNicknames, "MANAGE_NICKNAMES"),
    (Permission::ManageRoles, "MANAGE_ROLES"),
    (Permission::ManageWebhooks, "MANAGE_WEBHOOKS"),
    (Permission::ManageGuildExpressions, "MANAGE_GUILD_EXPRESSIONS"),
    (Permission::UseApplicationCommands, "USE_APPLICATION_COMMANDS"),
    (Permission::RequestToSpeak, "REQUEST_TO_SPEAK"),
    (Permission::ManageEvents, "MANAGE_EVENTS"),
    (Permission::ManageThreads, "MANAGE_THREADS"),
    (Permission::CreatePublicThreads, "CREATE_PUBLIC_THREADS"),
    (Permission::CreatePrivateThreads, "CREATE_PRIVATE_THREADS"),
    (Permission::UseExternalStickers, "USE_EXTERNAL_STICKERS"),
    (Permission::SendMessagesInThreads, "SEND_MESSAGES_IN_THREADS"),
    (Permission::UseEmbeddedActivities, "USE_EMBEDDED_ACTIVITIES"),
    (Permission::ModerateMembers, "MODERATE_MEMBERS"),
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown permission '{0}'")]
pub struct PermissionParseError(pub String);

impl Permission {
    fn index(self) -> usize {
        TABLE
            .iter()
            .position(|(perm, _)| *perm == self)
            .unwrap_or_default()
    }

    pub fn name(self) -> &'static str {
        TABLE[self.index()].1
    }

    /// The flag's value in the platform permission bitfield.
    pub fn bit(self) -> u64 {
        1u64 << self.index()
    }

    /// Combine a set of permissions into the platform bitfield.
    pub fn bitfield<'a>(perms: impl IntoIterator<Item = &'a Permission>) -> u64 {
        perms.into_iter().fold(0, |acc, perm| acc | perm.bit())
    }
}

fn squash(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

impl FromStr for Permission {
    type Err = PermissionParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = squash(raw);
        if wanted.is_empty() {
            return Err(PermissionParseError(raw.to_string()));
        }
        TABLE
            .iter()
            .find(|(_, name)| squash(name) == wanted)
            .map(|(perm, _)| *perm)
            .ok_or_else(|| PermissionParseError(raw.to_string()))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for Permission {
    type Error = PermissionParseError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<Permission> for String {
    fn from(perm: Permission) -> Self {
        perm.name().to_string()
    }
}
