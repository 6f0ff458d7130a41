//! A short-lived cache of caller roles.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use crate::identity::CallerId;

use super::Role;

/// How long a looked-up role is trusted when no other TTL is configured.
pub const DEFAULT_ROLE_CACHE_TTL: Duration = Duration::from_secs(60);

/// Marks the point at which a role lookup started.
///
/// A lookup result is only cached if no role changed since the lookup started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupTicket(u64);

/// Maps callers to their stored role for a limited time.
///
/// `None` is cached for callers without a role entry. Entries expire after the TTL
/// and are dropped early by [RoleCache::invalidate] whenever a user's role changes.
#[derive(Debug)]
pub struct RoleCache {
    ttl: Duration,
    inner: Mutex<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<CallerId, (Option<Role>, Instant)>,
    /// Bumped by every invalidation.
    generation: u64,
}

impl RoleCache {
    /// Create an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Get the cached stored role for `caller`.
    ///
    /// The outer `None` means nothing is cached, the inner `None` means the caller
    /// has no role entry.
    pub fn get(&self, caller: &CallerId) -> Option<Option<Role>> {
        let mut inner = self.lock();

        match inner.entries.get(caller) {
            Some((role, fetched_at)) if fetched_at.elapsed() < self.ttl => Some(*role),
            Some(_) => {
                inner.entries.remove(caller);
                None
            }
            None => None,
        }
    }

    /// Call before reading a role from the store, then pass the ticket to
    /// [RoleCache::insert].
    pub fn start_lookup(&self) -> LookupTicket {
        LookupTicket(self.lock().generation)
    }

    /// Remember `role` for `caller` unless a role changed since `ticket` was taken.
    ///
    /// Expired entries of all callers are dropped.
    pub fn insert(&self, caller: CallerId, role: Option<Role>, ticket: LookupTicket) {
        let mut inner = self.lock();

        let ttl = self.ttl;
        inner
            .entries
            .retain(|_, (_, fetched_at)| fetched_at.elapsed() < ttl);

        if inner.generation != ticket.0 {
            tracing::debug!("not caching the role of {caller}, a role changed during lookup");
            return;
        }

        inner.entries.insert(caller, (role, Instant::now()));
    }

    /// Forget the cached role of the user with ID `user_id`.
    pub fn invalidate(&self, user_id: &str) {
        let mut inner = self.lock();

        inner.entries.remove(&CallerId::new(user_id));
        inner.generation += 1;
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().entries.len()
    }

    // The map is always left consistent, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RoleCache {
    fn default() -> Self {
        Self::new(DEFAULT_ROLE_CACHE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{
        identity::CallerId,
        role::{Role, RoleCache},
    };

    #[test]
    fn returns_cached_role() {
        let cache = RoleCache::default();
        let caller = CallerId::new("user_a");

        cache.insert(caller.clone(), Some(Role::Admin), cache.start_lookup());

        assert_eq!(cache.get(&caller), Some(Some(Role::Admin)));
        assert_eq!(cache.get(&CallerId::new("user_b")), None);
    }

    #[test]
    fn caches_missing_role_entry() {
        let cache = RoleCache::default();
        let caller = CallerId::new("user_a");

        cache.insert(caller.clone(), None, cache.start_lookup());

        assert_eq!(cache.get(&caller), Some(None));
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = RoleCache::new(Duration::ZERO);
        let caller = CallerId::new("user_a");

        cache.insert(caller.clone(), Some(Role::Admin), cache.start_lookup());

        assert_eq!(cache.get(&caller), None);
    }

    #[test]
    fn insert_sweeps_expired_entries_of_other_callers() {
        let cache = RoleCache::new(Duration::from_millis(20));
        for user in ["user_a", "user_b", "user_c"] {
            cache.insert(CallerId::new(user), Some(Role::Member), cache.start_lookup());
        }
        std::thread::sleep(Duration::from_millis(30));

        cache.insert(CallerId::new("user_d"), Some(Role::Member), cache.start_lookup());

        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_forgets_user() {
        let cache = RoleCache::default();
        let caller = CallerId::new("user_a");
        cache.insert(caller.clone(), Some(Role::Admin), cache.start_lookup());

        cache.invalidate("user_a");

        assert_eq!(cache.get(&caller), None);
    }

    #[test]
    fn lookup_racing_an_invalidation_is_not_cached() {
        let cache = RoleCache::default();
        let caller = CallerId::new("user_a");

        let ticket = cache.start_lookup();
        cache.invalidate("user_a");
        cache.insert(caller.clone(), Some(Role::Member), ticket);

        assert_eq!(cache.get(&caller), None);
    }
}
