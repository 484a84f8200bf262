//! spotmix-state — embedded cluster state store.
//!
//! Backed by [redb](https://docs.rs/redb), holds the task and node records
//! that the placement policy reads through its cluster view.
//!
//! # Architecture
//!
//! Tasks and nodes are JSON-serialized into redb's `&[u8]` value columns.
//! Tasks are keyed by `{namespace}/{name}`, nodes by name.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across scoring threads.

pub mod error;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use store::StateStore;
