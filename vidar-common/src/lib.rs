//! Shared platform types for the vidar crates.
//!
//! This crate carries the vocabulary of the chat platform that both the
//! command compiler and hosts need to agree on: channel categories, wire
//! option kinds, permission flags and supported locales.

mod channel;
mod locale;
mod option;
mod permission;

pub use channel::ChannelKind;
pub use locale::{LOCALES, is_locale};
pub use option::OptionKind;
pub use permission::{Permission, PermissionParseError};
