//! RECAST Codec
//!
//! Export and import sessions over a human-readable tagged tree. The export
//! session drives the persistence encoder and prints the operations it
//! records; the import session replays them to rebuild equivalent graphs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod escape;
pub mod export;
pub mod import;
pub mod reader;

#[cfg(test)]
mod fixtures;

// Re-exports
pub use config::CodecConfig;
pub use error::{CodecError, CodecResult};
pub use export::XmlEncoder;
pub use import::XmlDecoder;
pub use reader::{Event, TagReader};
