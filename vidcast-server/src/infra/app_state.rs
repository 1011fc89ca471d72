use std::fmt;
use std::sync::Arc;

use vidcast_core::SessionController;

use crate::infra::config::Config;
use crate::websocket::hub::BroadcastHub;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SessionController>,
    pub hub: Arc<BroadcastHub>,
    pub config: Arc<Config>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
