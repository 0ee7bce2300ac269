use std::sync::Arc;

use crate::attendance::AttendanceService;
use crate::clock::Clock;
use crate::config::Config;
use crate::store::{AttendanceStore, UserStore};
use crate::utils::user_cache::UserCache;

/// Shared application state, registered once as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub attendance: AttendanceService,
    pub users: Arc<dyn UserStore>,
    pub user_cache: UserCache,
}

impl AppState {
    pub fn new(
        config: Config,
        users: Arc<dyn UserStore>,
        records: Arc<dyn AttendanceStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let attendance = AttendanceService::new(users.clone(), records, clock, config.policy());
        Self {
            user_cache: UserCache::new(config.user_cache_ttl_secs),
            config,
            attendance,
            users,
        }
    }
}
