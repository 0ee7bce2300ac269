use std::time::Duration;

use moka::future::Cache;

use crate::model::user::UserProfile;
use crate::store::{StoreError, UserStore};

const MAX_CAPACITY: u64 = 50_000;

/// Profiles of recently authenticated users, keyed by user id.
#[derive(Clone)]
pub struct UserCache {
    inner: Cache<u64, UserProfile>,
}

impl UserCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(MAX_CAPACITY)
                .time_to_live(Duration::from_secs(ttl_secs))
                .build(),
        }
    }

    /// Returns the cached profile or loads it from `users`. Missing users are
    /// not cached.
    pub async fn get_or_load(
        &self,
        user_id: u64,
        users: &dyn UserStore,
    ) -> Result<Option<UserProfile>, StoreError> {
        if let Some(profile) = self.inner.get(&user_id).await {
            return Ok(Some(profile));
        }

        let profile = users.get_user(user_id).await?.as_ref().map(UserProfile::from);
        if let Some(profile) = &profile {
            self.inner.insert(user_id, profile.clone()).await;
        }
        Ok(profile)
    }

    pub async fn invalidate(&self, user_id: u64) {
        self.inner.invalidate(&user_id).await;
    }
}
