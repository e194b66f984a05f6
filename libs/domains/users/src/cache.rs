//! TTL cache of resolved callers, keyed by bearer token

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument};

use crate::directory::TeamDirectory;
use crate::error::{UserError, UserResult};
use crate::identity::IdentityProvider;
use crate::models::User;
use crate::repository::UserRepository;

#[derive(Debug, Clone)]
struct CacheEntry {
    user: User,
    inserted_at: Instant,
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn parse_bearer(header: Option<&str>) -> UserResult<&str> {
    let header = header.map(str::trim).unwrap_or_default();
    let (scheme, token) = header
        .split_once(char::is_whitespace)
        .ok_or_else(UserError::unauthenticated)?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(UserError::unauthenticated());
    }
    Ok(token)
}

/// Memoizes identity provider lookups merged with the local profile.
///
/// Entries older than `ttl` are never served; [`IdentityCache::sweep`] evicts
/// them and [`IdentityCache::spawn_sweeper`] runs it periodically.
pub struct IdentityCache<R: UserRepository> {
    provider: Arc<dyn IdentityProvider>,
    directory: TeamDirectory<R>,
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl<R: UserRepository> IdentityCache<R> {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        directory: TeamDirectory<R>,
        ttl: Duration,
    ) -> Self {
        Self {
            provider,
            directory,
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Resolve a bearer token to the caller's profile
    #[instrument(skip_all)]
    pub async fn resolve(&self, token: &str) -> UserResult<User> {
        if token.trim().is_empty() {
            return Err(UserError::unauthenticated());
        }

        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(token) {
                if entry.inserted_at.elapsed() <= self.ttl {
                    debug!(user_id = %entry.user.id, "Identity cache hit");
                    return Ok(entry.user.clone());
                }
            }
        }

        debug!("Identity cache miss");
        let profile = self.provider.lookup(token).await?;
        let local = self.directory.get_record(&profile.id).await?;
        let user = self.directory.resolve(profile.merge(local)).await?;

        let mut entries = self.entries.write().await;
        entries.insert(
            token.to_string(),
            CacheEntry {
                user: user.clone(),
                inserted_at: Instant::now(),
            },
        );
        Ok(user)
    }

    /// Replace every cached entry for `user.id` with the updated profile
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn refresh(&self, user: &User) -> usize {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let mut refreshed = 0;
        for entry in entries.values_mut().filter(|e| e.user.id == user.id) {
            entry.user = user.clone();
            entry.inserted_at = now;
            refreshed += 1;
        }
        debug!(refreshed, "Refreshed cached identities");
        refreshed
    }

    /// Evict entries older than the TTL; returns how many were removed
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.inserted_at.elapsed() <= ttl);
        let evicted = before - entries.len();
        debug!(evicted, remaining = entries.len(), "Swept identity cache");
        evicted
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<R: UserRepository + 'static> IdentityCache<R> {
    /// Run [`sweep`](Self::sweep) every `interval` until `shutdown` flips to true
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Identity cache sweeper started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep().await;
                    }
                    result = shutdown.changed() => {
                        if result.is_err() || *shutdown.borrow() {
                            info!("Identity cache sweeper stopped");
                            break;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MockIdentityProvider;
    use crate::models::{IdentityProfile, UserRecord};
    use crate::repository::{InMemoryUserRepository, UserRepository};

    const TTL: Duration = Duration::from_secs(300);

    fn profile(id: &str) -> IdentityProfile {
        IdentityProfile {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            first_name: "Provider".to_string(),
            last_name: "Name".to_string(),
            name: "Provider Name".to_string(),
            is_team_lead: false,
        }
    }

    fn provider_returning(id: &'static str, times: usize) -> Arc<dyn IdentityProvider> {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_lookup()
            .times(times)
            .returning(move |_| Ok(profile(id)));
        Arc::new(provider)
    }

    fn cache_with(
        provider: Arc<dyn IdentityProvider>,
        repo: InMemoryUserRepository,
    ) -> IdentityCache<InMemoryUserRepository> {
        IdentityCache::new(provider, TeamDirectory::new(Arc::new(repo)), TTL)
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer(Some("Bearer abc")).unwrap(), "abc");
        assert_eq!(parse_bearer(Some("  bearer   abc  ")).unwrap(), "abc");
        assert!(parse_bearer(None).is_err());
        assert!(parse_bearer(Some("Bearer")).is_err());
        assert!(parse_bearer(Some("Basic abc")).is_err());
        assert!(parse_bearer(Some("")).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_provider_call_within_ttl() {
        let cache = cache_with(provider_returning("u1", 1), InMemoryUserRepository::new());

        let first = cache.resolve("token").await.unwrap();
        tokio::time::advance(Duration::from_secs(299)).await;
        let second = cache.resolve("token").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_after_ttl() {
        let cache = cache_with(provider_returning("u1", 2), InMemoryUserRepository::new());

        cache.resolve("token").await.unwrap();
        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        cache.resolve("token").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_token_is_not_cached() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_lookup()
            .times(2)
            .returning(|_| Err(UserError::unauthenticated()));
        let cache = cache_with(Arc::new(provider), InMemoryUserRepository::new());

        for _ in 0..2 {
            let err = cache.resolve("bad").await.unwrap_err();
            assert!(matches!(err, UserError::Unauthenticated(_)));
        }
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_blank_token_skips_provider() {
        let cache = cache_with(provider_returning("u1", 0), InMemoryUserRepository::new());
        assert!(matches!(
            cache.resolve("  ").await,
            Err(UserError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn test_local_record_merged_and_manager_resolved() {
        let repo = InMemoryUserRepository::new();
        repo.upsert(UserRecord {
            id: "lead".to_string(),
            email: "lead@example.com".to_string(),
            first_name: "Lena".to_string(),
            last_name: "Lead".to_string(),
            name: "Lena Lead".to_string(),
            is_team_lead: true,
            team_lead: None,
        })
        .await
        .unwrap();
        repo.upsert(UserRecord {
            id: "u1".to_string(),
            email: "old@example.com".to_string(),
            first_name: "Local".to_string(),
            last_name: "Name".to_string(),
            name: "Local Name".to_string(),
            is_team_lead: false,
            team_lead: Some("lead".to_string()),
        })
        .await
        .unwrap();

        let cache = cache_with(provider_returning("u1", 1), repo);
        let user = cache.resolve("token").await.unwrap();

        assert_eq!(user.email, "u1@example.com");
        assert_eq!(user.name, "Local Name");
        assert_eq!(user.team_lead.map(|l| l.name), Some("Lena Lead".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_updates_every_token_for_user() {
        let cache = cache_with(provider_returning("u1", 2), InMemoryUserRepository::new());
        let mut user = cache.resolve("phone").await.unwrap();
        cache.resolve("laptop").await.unwrap();

        user.name = "Renamed".to_string();
        tokio::time::advance(Duration::from_secs(200)).await;
        assert_eq!(cache.refresh(&user).await, 2);

        // Refreshed timestamps keep the entries alive past the original TTL
        tokio::time::advance(Duration::from_secs(200)).await;
        assert_eq!(cache.resolve("phone").await.unwrap().name, "Renamed");
        assert_eq!(cache.resolve("laptop").await.unwrap().name, "Renamed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_evicts_only_expired() {
        let cache = cache_with(provider_returning("u1", 2), InMemoryUserRepository::new());
        cache.resolve("old").await.unwrap();
        tokio::time::advance(Duration::from_secs(200)).await;
        cache.resolve("new").await.unwrap();
        tokio::time::advance(Duration::from_secs(150)).await;

        assert_eq!(cache.sweep().await, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_and_stops_on_shutdown() {
        let cache = Arc::new(cache_with(
            provider_returning("u1", 1),
            InMemoryUserRepository::new(),
        ));
        cache.resolve("token").await.unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = Arc::clone(&cache).spawn_sweeper(Duration::from_secs(60), shutdown_rx);

        tokio::time::sleep(TTL + Duration::from_secs(61)).await;
        assert!(cache.is_empty().await);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
