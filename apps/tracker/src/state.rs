use std::sync::Arc;
use std::time::Duration;

use domain_events::{EventAnalytics, EventRepository, EventService};
use domain_users::{IdentityCache, IdentityProvider, TeamDirectory, UserRepository, UserService};

/// Every service the commands need, sharing one identity cache
pub struct Services<U: UserRepository + 'static, E: EventRepository> {
    pub users: UserService<U>,
    pub events: EventService<E, U>,
    pub analytics: EventAnalytics<E>,
    pub cache: Arc<IdentityCache<U>>,
}

impl<U: UserRepository + 'static, E: EventRepository> Services<U, E> {
    pub fn new(
        user_repository: Arc<U>,
        event_repository: Arc<E>,
        provider: Arc<dyn IdentityProvider>,
        cache_ttl: Duration,
    ) -> Self {
        let directory = TeamDirectory::new(Arc::clone(&user_repository));
        let cache = Arc::new(IdentityCache::new(provider, directory.clone(), cache_ttl));

        Self {
            users: UserService::new(user_repository, Arc::clone(&cache)),
            events: EventService::new(Arc::clone(&event_repository), directory),
            analytics: EventAnalytics::new(event_repository),
            cache,
        }
    }
}
