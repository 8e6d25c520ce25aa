//! Channel categories as understood by the platform.

use serde::{Deserialize, Serialize};

/// Platform channel categories that a channel argument can be limited to.
///
/// The discriminants are the numeric codes used in the wire payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum ChannelKind {
    GuildText = 0,
    GuildVoice = 2,
    GuildCategory = 4,
    GuildAnnouncement = 5,
    AnnouncementThread = 10,
    PublicThread = 11,
    PrivateThread = 12,
    GuildStageVoice = 13,
    GuildForum = 15,
}

impl ChannelKind {
    /// Every guild channel category an argument can accept.
    pub const ALL: [ChannelKind; 9] = [
        ChannelKind::GuildText,
        ChannelKind::GuildVoice,
        ChannelKind::GuildCategory,
        ChannelKind::GuildAnnouncement,
        ChannelKind::AnnouncementThread,
        ChannelKind::PublicThread,
        ChannelKind::PrivateThread,
        ChannelKind::GuildStageVoice,
        ChannelKind::GuildForum,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_thread(self) -> bool {
        matches!(
            self,
            ChannelKind::AnnouncementThread | ChannelKind::PublicThread | ChannelKind::PrivateThread
        )
    }
}

impl From<ChannelKind> for u8 {
    fn from(kind: ChannelKind) -> Self {
        kind.code()
    }
}

impl TryFrom<u8> for ChannelKind {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        ChannelKind::ALL
            .into_iter()
            .find(|kind| kind.code() == code)
            .ok_or_else(|| format!("unknown channel kind code {code}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_kinds_are_flagged() {
        assert!(ChannelKind::PublicThread.is_thread());
        assert!(!ChannelKind::GuildForum.is_thread());
    }

    #[test]
    fn serializes_as_numeric_code() {
        let json = serde_json::to_string(&vec![ChannelKind::GuildVoice, ChannelKind::GuildForum])
            .unwrap();
        assert_eq!(json, "[2,15]");
        let back: Vec<ChannelKind> = serde_json::from_str("[13]").unwrap();
        assert_eq!(back, vec![ChannelKind::GuildStageVoice]);
    }

    #[test]
    fn rejects_unknown_code() {
        assert!(ChannelKind::try_from(1).is_err());
    }
}
