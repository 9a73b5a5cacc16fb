//! LMDB storage backend for the tally state engine.
//!
//! Implements the `tally-store` traits using the `heed` LMDB bindings. The
//! four logical maps live as named databases within a single environment;
//! one LMDB write transaction per engine operation gives the atomic
//! multi-map commit the engine relies on.

pub mod environment;
pub mod error;
pub mod state;

pub use environment::{LmdbConfig, LmdbEnvironment};
pub use error::LmdbError;
pub use state::LmdbStateStore;
