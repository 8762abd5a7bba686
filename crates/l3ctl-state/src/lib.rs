//! l3ctl-state — embedded state store for l3ctl.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage for the records the L3 engine reads: ports, subnets, port
//! bindings, agents and routers.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns.
//! Bindings use the composite key `{port_id}@{host}`.
//!
//! The engine never talks to `StateStore` directly; it goes through the
//! narrow traits in [`collaborators`], which `StateStore` implements. The
//! store is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`) and can be
//! shared across tasks.

pub mod collaborators;
pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use collaborators::{AgentRegistry, BindingStore, PortStore, RouterStore};
pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
