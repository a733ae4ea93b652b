// src/tree/mod.rs
//
// Path-addressable node tree.
//
// Every controllable parameter and command of an instrument lives at a
// unique slash-separated path. Nodes are stored in an arena owned by the
// tree and refer to each other by index, so handles stay valid when the
// tree is moved to another thread.
//
// Key principles:
// - One node type, tagged with a kind; behavior comes from the kind's
//   capabilities and schema, not from a type hierarchy
// - Structural children are built lazily, exactly once per slot
// - Paths are derived from parent links, never stored on structural nodes

mod arena;
mod diagnostics;
mod lazy;
mod node;
mod schema;

pub use arena::*;
pub use diagnostics::*;
pub use lazy::*;
pub use node::*;
pub use schema::*;
