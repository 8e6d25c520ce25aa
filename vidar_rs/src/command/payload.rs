//! Serde model of the platform's application-command schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vidar_common::{ChannelKind, OptionKind, Permission};

use crate::argument::{Argument, ChoiceValue, Number};

use super::model::{CommandTree, Node, SubcommandNode, SubgroupNode};

/// Application command type for slash commands.
pub const CHAT_INPUT: u8 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPayload {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub description_localizations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionPayload>,
    /// Bitfield of permissions members need before the platform shows the command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_member_permissions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionPayload {
    #[serde(rename = "type")]
    pub kind: OptionKind,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub description_localizations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChoicePayload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionPayload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channel_types: Vec<ChannelKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u16>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub autocomplete: bool,
}

/// `{ name, value }` pair used for both fixed choices and autocomplete suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoicePayload {
    pub name: String,
    pub value: ChoiceValue,
}

impl From<ChoiceValue> for ChoicePayload {
    fn from(value: ChoiceValue) -> Self {
        Self {
            name: value.to_string(),
            value,
        }
    }
}

impl OptionPayload {
    fn container(
        kind: OptionKind,
        name: &str,
        description: &str,
        locales: &BTreeMap<String, String>,
    ) -> Self {
        Self {
            kind,
            name: name.to_string(),
            description: description.to_string(),
            description_localizations: locales.clone(),
            required: false,
            choices: Vec::new(),
            options: Vec::new(),
            channel_types: Vec::new(),
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            autocomplete: false,
        }
    }
}

impl From<&Argument> for OptionPayload {
    fn from(arg: &Argument) -> Self {
        let mut option = OptionPayload::container(
            arg.datatype.option_kind(),
            &arg.name,
            &arg.description,
            &arg.localizations,
        );
        option.required = arg.required;
        option.choices = arg.choices.iter().cloned().map(ChoicePayload::from).collect();
        option.channel_types = arg.datatype.channel_kinds();
        option.min_value = arg.min;
        option.max_value = arg.max;
        option.min_length = arg.min_length;
        option.max_length = arg.max_length;
        option.autocomplete = arg.autocomplete;
        option
    }
}

impl From<&SubcommandNode> for OptionPayload {
    fn from(node: &SubcommandNode) -> Self {
        let mut option = OptionPayload::container(
            OptionKind::SubCommand,
            &node.name,
            &node.description,
            &node.localizations,
        );
        option.options = node.arguments.iter().map(OptionPayload::from).collect();
        option
    }
}

impl From<&SubgroupNode> for OptionPayload {
    fn from(node: &SubgroupNode) -> Self {
        let mut option = OptionPayload::container(
            OptionKind::SubCommandGroup,
            &node.name,
            &node.description,
            &node.localizations,
        );
        option.options = node.subcommands.iter().map(OptionPayload::from).collect();
        option
    }
}

/// Compile a sealed command's parts into its registration payload.
pub(crate) fn compile(
    name: &str,
    description: &str,
    localizations: &BTreeMap<String, String>,
    tree: &CommandTree,
    permissions: &[Permission],
) -> CommandPayload {
    let mut options: Vec<OptionPayload> = tree.arguments.iter().map(OptionPayload::from).collect();
    options.extend(tree.children.iter().map(|node| match node {
        Node::Subcommand(sub) => OptionPayload::from(sub),
        Node::Subgroup(group) => OptionPayload::from(group),
    }));
    let default_member_permissions = (!permissions.is_empty())
        .then(|| Permission::bitfield(permissions).to_string());
    CommandPayload {
        name: name.to_string(),
        kind: CHAT_INPUT,
        description: description.to_string(),
        description_localizations: localizations.clone(),
        options,
        default_member_permissions,
    }
}
