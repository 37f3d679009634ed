//! Public player profile page.

use std::sync::Arc;

use tracing::error;

use crate::db::LeagueStore;
use crate::error::AppResult;
use crate::models::Profile;
use crate::services::ViewCache;

pub struct PlayerProfileView {
    store: Arc<dyn LeagueStore>,
    profile: ViewCache<Option<Profile>>,
}

impl PlayerProfileView {
    pub fn new(store: Arc<dyn LeagueStore>) -> Self {
        Self {
            store,
            profile: ViewCache::default(),
        }
    }

    /// Load one profile. A missing profile is `Ok(None)`.
    pub async fn load(&self, player_id: &str) -> AppResult<Option<Profile>> {
        let profile = match self.store.fetch_profile(player_id).await {
            Ok(profile) => Some(profile),
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                error!(player_id, error = %e, "Error fetching player");
                return Err(e);
            }
        };

        self.profile.replace(profile.clone());
        Ok(profile)
    }

    pub fn profile(&self) -> Option<Profile> {
        self.profile.snapshot()
    }

    pub fn unmount(&self) {
        self.profile.unmount();
    }
}
