//! Request gate subsystem.
//!
//! # Data Flow
//! ```text
//! Request
//!     → scope check (static assets skip the gate)
//!     → AuthProvider::resolve (user + refreshed cookies)
//!     → GateRules::plan
//!     → redirect | attach note | pass through
//!     → Set-Cookie for any refreshed session
//! ```

pub mod middleware;
pub mod plan;

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::auth::{AuthProvider, SupabaseAuth};
use crate::config::GateConfig;
use crate::notes::{HttpNotesApi, NotesApi};
use crate::routing::GateScope;

pub use middleware::gate_middleware;
pub use plan::{GatePlan, GateRules};

/// Everything the gate needs for one request.
pub struct Gate {
    pub rules: GateRules,
    pub scope: GateScope,
    pub auth: Arc<dyn AuthProvider>,
    pub notes: Arc<dyn NotesApi>,
}

impl Gate {
    /// Build the gate with HTTP collaborators sharing one client.
    pub fn from_config(config: &GateConfig, client: reqwest::Client) -> Self {
        let auth = SupabaseAuth::new(client.clone(), &config.auth);
        let notes = HttpNotesApi::new(client, &config.notes, &config.upstream.base_url());
        Self::new(config, Arc::new(auth), Arc::new(notes))
    }

    pub fn new(config: &GateConfig, auth: Arc<dyn AuthProvider>, notes: Arc<dyn NotesApi>) -> Self {
        Self {
            rules: GateRules::new(config.gate.clone()),
            scope: GateScope::from_config(&config.scope),
            auth,
            notes,
        }
    }
}

/// Shared, swappable handle to the current gate.
#[derive(Clone)]
pub struct GateHandle(Arc<ArcSwap<Gate>>);

impl GateHandle {
    pub fn new(gate: Gate) -> Self {
        Self(Arc::new(ArcSwap::from_pointee(gate)))
    }

    pub fn load(&self) -> Arc<Gate> {
        self.0.load_full()
    }

    pub fn replace(&self, gate: Gate) {
        self.0.store(Arc::new(gate));
    }
}
