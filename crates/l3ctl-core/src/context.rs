//! Caller context threaded through collaborator calls.

use serde::{Deserialize, Serialize};

/// Identity of the request that originated an event or RPC.
///
/// Collaborators use it to scope lookups; the engine itself only
/// elevates it when it needs to see every agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub request_id: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, tenant_id: Option<String>) -> Self {
        Self {
            request_id: request_id.into(),
            tenant_id,
            is_admin: false,
        }
    }

    /// Context with full visibility, used for internal housekeeping.
    pub fn admin() -> Self {
        Self {
            request_id: "admin".to_string(),
            tenant_id: None,
            is_admin: true,
        }
    }

    /// Returns this context if it is already an admin one, or an
    /// elevated copy otherwise.
    pub fn elevated(&self) -> RequestContext {
        if self.is_admin {
            return self.clone();
        }
        RequestContext {
            is_admin: true,
            ..self.clone()
        }
    }
}
