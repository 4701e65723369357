//! # GdsLift Bridge
//!
//! A flat, handle-based boundary API over parsing and extraction, meant
//! for hosts that cannot hold Rust references across calls (FFI, wasm
//! embeddings, scripting runtimes). Libraries are loaded into a
//! [`LibraryRegistry`] and addressed by opaque integer [`Handle`]s; every
//! failure is also mirrored into a `last_error` string the host can poll.

pub mod registry;

pub use registry::{BridgeError, Handle, HandleError, LibraryRegistry};
