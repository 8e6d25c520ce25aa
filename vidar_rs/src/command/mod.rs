//! Command model: the builder that accumulates declarations, the sealed
//! [`CommandSpec`] it produces and the wire payload computed at sealing.

mod builder;
pub mod docs;
pub mod model;
pub mod payload;

pub use builder::{ArgumentOptions, CommandBuilder, HandlerMap};
pub use docs::DocEntry;
pub use model::{
    CommandSpec, CommandTree, Handler, Node, Requirement, RouteTable, SubcommandNode,
    SubgroupNode,
};
pub use payload::{ChoicePayload, CommandPayload, OptionPayload};
