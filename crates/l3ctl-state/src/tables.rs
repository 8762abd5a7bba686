//! redb table definitions for the l3ctl state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain types).

use redb::TableDefinition;

/// Ports keyed by `{port_id}`.
pub const PORTS: TableDefinition<&str, &[u8]> = TableDefinition::new("ports");

/// Subnets keyed by `{subnet_id}`.
pub const SUBNETS: TableDefinition<&str, &[u8]> = TableDefinition::new("subnets");

/// Port bindings keyed by `{port_id}@{host}`.
pub const BINDINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("bindings");

/// Agents keyed by `{agent_id}`.
pub const AGENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("agents");

/// Routers keyed by `{router_id}`.
pub const ROUTERS: TableDefinition<&str, &[u8]> = TableDefinition::new("routers");
