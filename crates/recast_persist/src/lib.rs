//! RECAST Persistence
//!
//! Per-type persistence delegates and the memoizing encoder that turns an
//! object graph into construct and mutate operations against fresh
//! counterparts.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod array;
pub mod collection;
pub mod constant;
pub mod delegate;
pub mod encoder;
pub mod fault;
pub mod identity;
pub mod proxy;
pub mod registry;
pub mod value;

// Re-exports
pub use array::ArrayPersistenceDelegate;
pub use collection::{
    CollectionPersistenceDelegate, MappingPersistenceDelegate, SequencePersistenceDelegate,
};
pub use constant::ConstantPersistenceDelegate;
pub use delegate::{DefaultPersistenceDelegate, PersistenceDelegate};
pub use encoder::{Encode, Encoder, EncoderState};
pub use fault::{FaultSink, LogFaultSink};
pub use identity::IdentityRegistry;
pub use proxy::ProxyPersistenceDelegate;
pub use registry::DelegateRegistry;
pub use value::ValuePersistenceDelegate;
