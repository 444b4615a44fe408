//! RECAST Core
//!
//! Value model, type catalog and operation resolution.
//! Nothing in this crate performs I/O; recording and encoding live in
//! `recast_persist` and `recast_codec`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builtins;
pub mod error;
pub mod id;
pub mod resolve;
pub mod statement;
pub mod types;
pub mod value;

// Re-exports
pub use error::{CallError, RecastError, RecastResult};
pub use id::{ObjectId, SessionId};
pub use statement::{Expression, Operation, Statement};
pub use types::{
    ClassBuilder, ClassInfo, ClassKind, PersistenceHint, PropertyDescriptor, class_for_name,
};
pub use value::{IdentityKey, Value};
