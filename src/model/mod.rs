//! # Editing Graph Model
//!
//! Clean DTOs for the OpenStreetMap-style graph the splitter works on:
//! tagged nodes, ways as ordered node chains, and tag edits.
//!
//! Design rule: this module is pure data. No I/O, no locking.

pub mod node;
pub mod way;
pub mod primitive;
pub mod tags;

pub use node::{Node, NodeId};
pub use way::{Way, WayId};
pub use primitive::PrimitiveId;
pub use tags::{TagMap, TagChanges, apply_changes, changes};
