//! StateStore — redb-backed state persistence for l3ctl.
//!
//! Provides typed CRUD operations over ports, subnets, bindings, agents and
//! routers. All values are JSON-serialized into redb's `&[u8]` value columns.
//! The store supports both on-disk and in-memory backends (the latter for
//! testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, TableHandle};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use l3ctl_core::RequestContext;
use l3ctl_core::constants::AGENT_TYPE_L3;

use crate::collaborators::{AgentRegistry, BindingStore, PortStore, RouterStore};
use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Decode a stored record, naming the table and key on failure.
fn decode<T: DeserializeOwned>(table: JsonTable, key: &str, bytes: &[u8]) -> StateResult<T> {
    serde_json::from_slice(bytes).map_err(|e| StateError::Deserialize {
        table: table.name().to_string(),
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(PORTS).map_err(map_err!(Table))?;
        txn.open_table(SUBNETS).map_err(map_err!(Table))?;
        txn.open_table(BINDINGS).map_err(map_err!(Table))?;
        txn.open_table(AGENTS).map_err(map_err!(Table))?;
        txn.open_table(ROUTERS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Generic JSON helpers ───────────────────────────────────────

    fn put_json<T: Serialize>(&self, table: JsonTable, key: &str, record: &T) -> StateResult<()> {
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(table).map_err(map_err!(Table))?;
            table
                .insert(key, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, table_def: JsonTable, key: &str) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(table_def).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => Ok(Some(decode(table_def, key, guard.value())?)),
            None => Ok(None),
        }
    }

    fn list_json<T: DeserializeOwned>(&self, table_def: JsonTable) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(table_def).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            results.push(decode(table_def, key.value(), value.value())?);
        }
        Ok(results)
    }

    fn delete_key(&self, table: JsonTable, key: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(table).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }

    // ── Ports ──────────────────────────────────────────────────────

    /// Insert or update a port.
    pub fn put_port(&self, port: &Port) -> StateResult<()> {
        self.put_json(PORTS, &port.id, port)?;
        debug!(port_id = %port.id, "port stored");
        Ok(())
    }

    pub fn port(&self, port_id: &str) -> StateResult<Option<Port>> {
        self.get_json(PORTS, port_id)
    }

    pub fn list_ports(&self) -> StateResult<Vec<Port>> {
        self.list_json(PORTS)
    }

    /// Delete a port by ID. Returns true if it existed.
    pub fn delete_port(&self, port_id: &str) -> StateResult<bool> {
        let existed = self.delete_key(PORTS, port_id)?;
        debug!(%port_id, existed, "port deleted");
        Ok(existed)
    }

    // ── Subnets ────────────────────────────────────────────────────

    pub fn put_subnet(&self, subnet: &Subnet) -> StateResult<()> {
        self.put_json(SUBNETS, &subnet.id, subnet)
    }

    pub fn subnet(&self, subnet_id: &str) -> StateResult<Option<Subnet>> {
        self.get_json(SUBNETS, subnet_id)
    }

    // ── Bindings ───────────────────────────────────────────────────

    /// Insert or update the binding of a port on a host.
    pub fn put_binding(&self, binding: &PortBinding) -> StateResult<()> {
        let key = binding.table_key();
        self.put_json(BINDINGS, &key, binding)?;
        debug!(%key, segments = binding.segments.len(), "binding stored");
        Ok(())
    }

    pub fn binding(&self, port_id: &str, host: &str) -> StateResult<Option<PortBinding>> {
        self.get_json(BINDINGS, &binding_key(port_id, host))
    }

    // ── Agents ─────────────────────────────────────────────────────

    pub fn put_agent(&self, agent: &Agent) -> StateResult<()> {
        self.put_json(AGENTS, &agent.id, agent)?;
        debug!(agent_id = %agent.id, host = %agent.host, "agent stored");
        Ok(())
    }

    pub fn agent(&self, agent_id: &str) -> StateResult<Option<Agent>> {
        self.get_json(AGENTS, agent_id)
    }

    pub fn list_agents(&self) -> StateResult<Vec<Agent>> {
        self.list_json(AGENTS)
    }

    // ── Routers ────────────────────────────────────────────────────

    pub fn put_router(&self, router: &Router) -> StateResult<()> {
        self.put_json(ROUTERS, &router.id, router)
    }

    pub fn router(&self, router_id: &str) -> StateResult<Option<Router>> {
        self.get_json(ROUTERS, router_id)
    }

    pub fn list_routers(&self) -> StateResult<Vec<Router>> {
        self.list_json(ROUTERS)
    }
}

// ── Collaborator impls ─────────────────────────────────────────────

impl PortStore for StateStore {
    fn get_port(&self, _ctx: &RequestContext, port_id: &str) -> StateResult<Option<Port>> {
        self.port(port_id)
    }

    fn get_subnet(&self, _ctx: &RequestContext, subnet_id: &str) -> StateResult<Option<Subnet>> {
        self.subnet(subnet_id)
    }

    fn ports_on_subnet(&self, _ctx: &RequestContext, subnet_id: &str) -> StateResult<Vec<Port>> {
        let ports = self
            .list_ports()?
            .into_iter()
            .filter(|port| port.on_subnet(subnet_id))
            .collect();
        Ok(ports)
    }
}

impl BindingStore for StateStore {
    fn get_bound_port_context(
        &self,
        _ctx: &RequestContext,
        port_id: &str,
        host: &str,
    ) -> StateResult<Option<BoundPortContext>> {
        let Some(binding) = self.binding(port_id, host)? else {
            return Ok(None);
        };
        let Some(port) = self.port(port_id)? else {
            return Ok(None);
        };
        Ok(Some(BoundPortContext {
            port,
            network: BoundNetwork {
                id: binding.network_id,
                segments: binding.segments,
            },
        }))
    }
}

impl AgentRegistry for StateStore {
    fn get_enabled_agent_on_host(
        &self,
        _ctx: &RequestContext,
        agent_type: &str,
        host: &str,
    ) -> StateResult<Option<Agent>> {
        let agent = self.list_agents()?.into_iter().find(|agent| {
            agent.agent_type == agent_type && agent.host == host && agent.admin_state_up
        });
        Ok(agent)
    }

    fn get_l3_agents(&self, _ctx: &RequestContext) -> StateResult<Vec<Agent>> {
        let agents = self
            .list_agents()?
            .into_iter()
            .filter(|agent| agent.agent_type == AGENT_TYPE_L3)
            .collect();
        Ok(agents)
    }

    fn get_agent(&self, _ctx: &RequestContext, agent_id: &str) -> StateResult<Option<Agent>> {
        self.agent(agent_id)
    }
}

impl RouterStore for StateStore {
    fn unscheduled_routers(&self, router_ids: &[RouterId]) -> StateResult<Vec<RouterId>> {
        let mut unscheduled = Vec::new();
        for router_id in router_ids {
            match self.router(router_id)? {
                Some(router) if !router.is_scheduled() => unscheduled.push(router.id),
                _ => {}
            }
        }
        Ok(unscheduled)
    }

    fn bind_router_if_unscheduled(&self, router_id: &str, agent_id: &str) -> StateResult<bool> {
        // redb admits one write transaction at a time, so the check and the
        // update below cannot interleave with another bind.
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let bound;
        {
            let mut table = txn.open_table(ROUTERS).map_err(map_err!(Table))?;
            let current: Option<Router> = match table.get(router_id).map_err(map_err!(Read))? {
                Some(guard) => Some(decode(ROUTERS, router_id, guard.value())?),
                None => None,
            };
            bound = match current {
                Some(mut router) if !router.is_scheduled() => {
                    router.agent_id = Some(agent_id.to_string());
                    let value = serde_json::to_vec(&router).map_err(map_err!(Serialize))?;
                    table
                        .insert(router_id, value.as_slice())
                        .map_err(map_err!(Write))?;
                    true
                }
                _ => false,
            };
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%router_id, %agent_id, bound, "router bind attempted");
        Ok(bound)
    }

    fn count_routers_on_agent(&self, agent_id: &str) -> StateResult<usize> {
        let count = self
            .list_routers()?
            .iter()
            .filter(|router| router.agent_id.as_deref() == Some(agent_id))
            .count();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RequestContext {
        RequestContext::admin()
    }

    fn test_port(id: &str, subnet_id: &str) -> Port {
        Port {
            id: id.to_string(),
            network_id: "net-1".to_string(),
            device_owner: "compute:nova".to_string(),
            device_id: "vm-1".to_string(),
            mac_address: "fa:16:3e:00:00:01".to_string(),
            admin_state_up: true,
            fixed_ips: vec![FixedIp {
                subnet_id: subnet_id.to_string(),
                ip_address: "10.0.0.5".to_string(),
            }],
            binding_host: Some("compute-1".to_string()),
        }
    }

    fn test_agent(id: &str, host: &str, agent_type: &str, admin_state_up: bool) -> Agent {
        Agent {
            id: id.to_string(),
            host: host.to_string(),
            topic: "l3_agent".to_string(),
            agent_type: agent_type.to_string(),
            admin_state_up,
        }
    }

    fn test_router(id: &str, agent_id: Option<&str>) -> Router {
        Router {
            id: id.to_string(),
            name: format!("router-{id}"),
            agent_id: agent_id.map(str::to_string),
        }
    }

    #[test]
    fn port_crud() {
        let store = StateStore::open_in_memory().unwrap();
        let port = test_port("p1", "s1");
        store.put_port(&port).unwrap();

        assert_eq!(store.port("p1").unwrap(), Some(port));
        assert_eq!(store.list_ports().unwrap().len(), 1);
        assert!(store.delete_port("p1").unwrap());
        assert!(!store.delete_port("p1").unwrap());
        assert!(store.port("p1").unwrap().is_none());
    }

    #[test]
    fn ports_on_subnet_filters_by_fixed_ip() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_port(&test_port("p1", "s1")).unwrap();
        store.put_port(&test_port("p2", "s2")).unwrap();
        store.put_port(&test_port("p3", "s1")).unwrap();

        let mut ids: Vec<String> = store
            .ports_on_subnet(&ctx(), "s1")
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["p1", "p3"]);
    }

    #[test]
    fn bound_port_context_requires_binding_and_port() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_port(&test_port("p1", "s1")).unwrap();
        assert!(
            store
                .get_bound_port_context(&ctx(), "p1", "compute-1")
                .unwrap()
                .is_none()
        );

        store
            .put_binding(&PortBinding {
                port_id: "p1".to_string(),
                host: "compute-1".to_string(),
                network_id: "net-1".to_string(),
                segments: vec![NetworkSegment {
                    network_type: "vxlan".to_string(),
                    segmentation_id: Some(1001),
                    physical_network: None,
                }],
            })
            .unwrap();

        let bound = store
            .get_bound_port_context(&ctx(), "p1", "compute-1")
            .unwrap()
            .unwrap();
        assert_eq!(bound.port.id, "p1");
        assert_eq!(bound.network.id, "net-1");
        assert_eq!(bound.network.segments[0].segmentation_id, Some(1001));

        // Other hosts see no binding.
        assert!(
            store
                .get_bound_port_context(&ctx(), "p1", "compute-2")
                .unwrap()
                .is_none()
        );

        // Binding without a port record is not a bound context.
        store.delete_port("p1").unwrap();
        assert!(
            store
                .get_bound_port_context(&ctx(), "p1", "compute-1")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn enabled_agent_on_host_skips_disabled_and_other_types() {
        let store = StateStore::open_in_memory().unwrap();
        store
            .put_agent(&test_agent("a1", "host-1", AGENT_TYPE_L3, false))
            .unwrap();
        store
            .put_agent(&test_agent("a2", "host-1", "DHCP agent", true))
            .unwrap();

        assert!(
            store
                .get_enabled_agent_on_host(&ctx(), AGENT_TYPE_L3, "host-1")
                .unwrap()
                .is_none()
        );

        store
            .put_agent(&test_agent("a1", "host-1", AGENT_TYPE_L3, true))
            .unwrap();
        let agent = store
            .get_enabled_agent_on_host(&ctx(), AGENT_TYPE_L3, "host-1")
            .unwrap()
            .unwrap();
        assert_eq!(agent.id, "a1");
    }

    #[test]
    fn l3_agents_only() {
        let store = StateStore::open_in_memory().unwrap();
        store
            .put_agent(&test_agent("a1", "host-1", AGENT_TYPE_L3, true))
            .unwrap();
        store
            .put_agent(&test_agent("a2", "host-2", AGENT_TYPE_L3, false))
            .unwrap();
        store
            .put_agent(&test_agent("a3", "host-3", "Open vSwitch agent", true))
            .unwrap();

        let agents = store.get_l3_agents(&ctx()).unwrap();
        assert_eq!(agents.len(), 2);
        assert!(agents.iter().all(Agent::is_l3));
    }

    #[test]
    fn unscheduled_routers_preserves_order_and_skips_unknown() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_router(&test_router("r1", None)).unwrap();
        store.put_router(&test_router("r2", Some("a1"))).unwrap();
        store.put_router(&test_router("r3", None)).unwrap();

        let ids = vec![
            "r3".to_string(),
            "r2".to_string(),
            "missing".to_string(),
            "r1".to_string(),
        ];
        assert_eq!(store.unscheduled_routers(&ids).unwrap(), vec!["r3", "r1"]);
    }

    #[test]
    fn bind_is_compare_and_set() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_router(&test_router("r1", None)).unwrap();

        assert!(store.bind_router_if_unscheduled("r1", "a1").unwrap());
        assert!(!store.bind_router_if_unscheduled("r1", "a2").unwrap());
        assert!(!store.bind_router_if_unscheduled("missing", "a1").unwrap());

        let router = store.router("r1").unwrap().unwrap();
        assert_eq!(router.agent_id.as_deref(), Some("a1"));
        assert_eq!(store.count_routers_on_agent("a1").unwrap(), 1);
        assert_eq!(store.count_routers_on_agent("a2").unwrap(), 0);
    }

    #[test]
    fn concurrent_binds_assign_once() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_router(&test_router("r1", None)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store
                        .bind_router_if_unscheduled("r1", &format!("a{i}"))
                        .unwrap()
                })
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|bound| *bound)
            .count();
        assert_eq!(wins, 1);
    }

    #[test]
    fn corrupt_record_names_table_and_key() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_port(&test_port("p1", "s1")).unwrap();
        let txn = store.db.begin_write().unwrap();
        {
            let mut table = txn.open_table(PORTS).unwrap();
            table.insert("p9", b"not json".as_slice()).unwrap();
        }
        txn.commit().unwrap();

        let err = store.port("p9").unwrap_err();
        assert!(matches!(
            &err,
            StateError::Deserialize { table, key, .. } if table == "ports" && key == "p9"
        ));
        assert!(err.to_string().starts_with("corrupt ports record \"p9\""));

        // Listing fails on the same record, not on the healthy one.
        let err = store.list_ports().unwrap_err();
        assert!(matches!(err, StateError::Deserialize { key, .. } if key == "p9"));
        assert!(store.port("p1").unwrap().is_some());
    }

    #[test]
    fn persistent_store_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("l3ctl.redb");
        {
            let store = StateStore::open(&path).unwrap();
            store.put_port(&test_port("p1", "s1")).unwrap();
        }
        let store = StateStore::open(&path).unwrap();
        assert!(store.port("p1").unwrap().is_some());
    }
}
