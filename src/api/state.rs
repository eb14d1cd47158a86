use crate::auth::{TokenIssuer, UserStore};
use crate::detect::IncidentManager;
use crate::maintenance::MaintenanceStore;
use crate::monitor::LiveMetrics;
use crate::storage::Pool;

#[derive(Clone)]
pub struct AppState {
    pub live: LiveMetrics,
    pub incidents: IncidentManager,
    pub maintenance: MaintenanceStore,
    pub users: UserStore,
    pub tokens: TokenIssuer,
}

impl AppState {
    /// Wire every store to one pool.
    pub fn new(pool: Pool, live: LiveMetrics, tokens: TokenIssuer) -> Self {
        Self {
            live,
            incidents: IncidentManager::new(pool.clone()),
            maintenance: MaintenanceStore::new(pool.clone()),
            users: UserStore::new(pool),
            tokens,
        }
    }
}
