//! Profile lookup pipeline: cache → coalescer → rate limiter → source.

use std::sync::Arc;

use hovercard_api::UserPayload;
use hovercard_core::{LevelDescriptor, ProfileRecord, Subject, UserId};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, info, warn};

use crate::cache::TimeBoundedCache;
use crate::coalesce::RequestCoalescer;
use crate::rate_limit::RateLimiter;
use crate::source::ProfileSource;

/// Resolves usernames to profile records without ever failing.
///
/// Owns its cache, in-flight map, and rate limiter, so independent instances
/// never share state.
pub struct ProfileFetcher<S> {
    source: Arc<S>,
    cache: Arc<TimeBoundedCache>,
    coalescer: RequestCoalescer<ProfileRecord>,
    limiter: Arc<RateLimiter>,
}

impl<S: ProfileSource> ProfileFetcher<S> {
    /// Create a fetcher with default TTL, capacity, and rate limit.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_parts(source, TimeBoundedCache::default(), RateLimiter::default())
    }

    /// Create a fetcher from explicitly configured parts.
    #[must_use]
    pub fn with_parts(source: S, cache: TimeBoundedCache, limiter: RateLimiter) -> Self {
        Self {
            source: Arc::new(source),
            cache: Arc::new(cache),
            coalescer: RequestCoalescer::new(),
            limiter: Arc::new(limiter),
        }
    }

    /// Fetch the profile for `raw_key`.
    ///
    /// Invalid keys resolve to [`ProfileRecord::unknown`] without touching the
    /// cache or the network. Source failures resolve to a cached placeholder
    /// so repeated hovers do not hammer the API within the TTL window.
    pub async fn fetch(&self, raw_key: &str, force_refresh: bool) -> ProfileRecord {
        let Subject::Valid(key) = Subject::parse(raw_key) else {
            debug!(key = %raw_key, "Ignoring invalid subject key");
            return ProfileRecord::unknown();
        };

        if !force_refresh && let Some(hit) = self.cache.get(key.as_str()) {
            return hit;
        }

        let source = Arc::clone(&self.source);
        let cache = Arc::clone(&self.cache);
        let limiter = Arc::clone(&self.limiter);
        let username = key.as_str().to_owned();
        let outcome = self
            .coalescer
            .run(key.as_str(), move || async move {
                let response = limiter
                    .schedule(|| {
                        info!(%username, "Requesting profile");
                        source.user_info(&username)
                    })
                    .await;
                let record = match response {
                    Ok(user) => profile_from_payload(&username, &user),
                    Err(err) => {
                        let err: anyhow::Error = err.into();
                        warn!(%username, error = %err, "Profile lookup failed; caching placeholder");
                        ProfileRecord::placeholder(username.as_str())
                    }
                };
                cache.put(&username, record.clone());
                record
            })
            .await;

        outcome.unwrap_or_else(|err| {
            warn!(key = %key, error = %err, "Profile lookup abandoned");
            ProfileRecord::placeholder(key.into_inner())
        })
    }

    /// Drop the cached profile for `raw_key` so the next fetch hits the source.
    pub fn invalidate(&self, raw_key: &str) {
        if let Subject::Valid(key) = Subject::parse(raw_key) {
            self.cache.invalidate(key.as_str());
        }
    }

    /// Drop every cached profile.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Shared cache handle.
    #[must_use]
    pub fn cache(&self) -> &TimeBoundedCache {
        &self.cache
    }

    /// Number of lookups currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.coalescer.in_flight()
    }
}

/// Map a raw API user into a normalized record for `username`.
#[must_use]
pub fn profile_from_payload(username: &str, user: &UserPayload) -> ProfileRecord {
    let mut roles: Vec<String> = Vec::new();
    for role in user.roles() {
        if !roles.contains(&role) {
            roles.push(role);
        }
    }

    ProfileRecord {
        username: username.to_owned(),
        id: user.id().map(UserId),
        avatar: user.avatar(),
        roles,
        level: user.level().map(|level| LevelDescriptor {
            name: level.name,
            color: level.color,
        }),
        points: user.points(),
        joined_at: user.join_date().as_deref().and_then(parse_join_date),
    }
}

/// Parse the join date formats the forum API has been seen to emit.
fn parse_join_date(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    let datetime = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    if let Ok(ts) = PrimitiveDateTime::parse(raw, datetime) {
        return Some(ts.assume_utc());
    }
    let date = format_description!("[year]-[month]-[day]");
    Date::parse(raw, date)
        .ok()
        .map(|day| day.midnight().assume_utc())
}
