//! Everything a handler needs, held behind one `Arc` and injected with
//! axum's `State` extractor (§9 "Global singletons... become values threaded
//! through constructors or placed in one process-wide context").

use std::sync::Arc;

use auth::DirectoryClient;
use auth::SessionCodec;
use config::RoleMapConfig;
use dal::DbConnectParams;
use engine::{MacTraceEngine, VlanChangeEngine};
use governor::HostLoadGuard;

pub struct AppState {
    pub db: DbConnectParams,
    pub session: Arc<SessionCodec>,
    pub host_load: Arc<HostLoadGuard>,
    pub trace_engine: Arc<MacTraceEngine>,
    pub vlan_engine: Arc<VlanChangeEngine>,
    pub roles: RoleMapConfig,
    pub directory: Option<Arc<DirectoryClient>>,
}

pub type SharedState = Arc<AppState>;
