//! Stateful daily quota gate.
//!
//! Wraps the pure policy in `ladle_core::quota` with its two counters:
//! the generation log for authenticated users (success entries today) and
//! an expiring per-IP counter for guests. Both checks are read-then-write
//! without compare-and-swap, so a burst of concurrent requests from one
//! identity can transiently exceed the nominal limit; accepted for this
//! domain.

use std::sync::Arc;

use ladle_core::quota::{self, QuotaDecision, UNLIMITED};
use ladle_core::request::Requester;
use ladle_core::types::{DbId, Timestamp};

use crate::cache::TtlStore;
use crate::clock::{start_of_next_day, Clock};
use crate::store::{GenerationLogStore, StoreError, UserStore};

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaCheck {
    /// The request may proceed; `remaining` is the optimistic count left
    /// (or the unlimited sentinel for premium accounts).
    Allowed { remaining: i64 },
    /// The daily limit is spent until `retry_at`.
    Denied { message: String, retry_at: Timestamp },
}

/// Enforces per-identity daily generation limits.
pub struct QuotaGate {
    users: Arc<dyn UserStore>,
    log: Arc<dyn GenerationLogStore>,
    guest_counters: TtlStore<i64>,
    clock: Arc<dyn Clock>,
}

impl QuotaGate {
    pub fn new(
        users: Arc<dyn UserStore>,
        log: Arc<dyn GenerationLogStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            log,
            guest_counters: TtlStore::new(Arc::clone(&clock)),
            clock,
        }
    }

    /// Check whether the requester may generate now, reserving a slot on
    /// the relevant counter when allowed.
    pub async fn check(&self, requester: &Requester) -> Result<QuotaCheck, StoreError> {
        let now = self.clock.now();
        match requester {
            Requester::User { id } => self.check_user(*id, now).await,
            Requester::Guest { ip } => Ok(self.check_guest(&ip.to_string(), now)),
        }
    }

    /// Remaining generations for display, without reserving a slot.
    pub async fn remaining(&self, requester: &Requester) -> Result<i64, StoreError> {
        let now = self.clock.now();
        match requester {
            Requester::User { id } => {
                let account = self
                    .users
                    .find(*id)
                    .await?
                    .ok_or_else(|| StoreError(format!("user {id} not found")))?;
                if quota::is_premium(&account.tier, account.premium_until, now) {
                    return Ok(UNLIMITED);
                }
                let used = self.log.count_success_on(*id, now.date_naive()).await?;
                Ok((quota::FREE_DAILY_LIMIT - used).max(0))
            }
            Requester::Guest { ip } => {
                let used = self
                    .guest_counters
                    .get(&Self::guest_key(&ip.to_string(), now))
                    .unwrap_or(0);
                Ok((quota::GUEST_DAILY_LIMIT - used).max(0))
            }
        }
    }

    async fn check_user(&self, id: DbId, now: Timestamp) -> Result<QuotaCheck, StoreError> {
        let account = self
            .users
            .find(id)
            .await?
            .ok_or_else(|| StoreError(format!("user {id} not found")))?;
        let premium = quota::is_premium(&account.tier, account.premium_until, now);

        let count = if premium {
            0
        } else {
            self.log.count_success_on(id, now.date_naive()).await?
        };

        match quota::decide_user(premium, count) {
            QuotaDecision::Allowed { remaining } => {
                if !premium {
                    // Informational counter; the log stays authoritative.
                    if let Err(e) = self.users.increment_daily_counter(id).await {
                        tracing::warn!(user_id = id, error = %e, "Failed to bump daily counter");
                    }
                }
                Ok(QuotaCheck::Allowed { remaining })
            }
            QuotaDecision::Denied { message } => Ok(QuotaCheck::Denied {
                message,
                retry_at: start_of_next_day(now),
            }),
        }
    }

    fn check_guest(&self, ip: &str, now: Timestamp) -> QuotaCheck {
        let key = Self::guest_key(ip, now);
        let count = self.guest_counters.get(&key).unwrap_or(0);

        match quota::decide_guest(count) {
            QuotaDecision::Allowed { remaining } => {
                self.guest_counters
                    .increment_until(&key, start_of_next_day(now));
                QuotaCheck::Allowed { remaining }
            }
            QuotaDecision::Denied { message } => QuotaCheck::Denied {
                message,
                retry_at: start_of_next_day(now),
            },
        }
    }

    fn guest_key(ip: &str, now: Timestamp) -> String {
        format!("guest:{ip}:{}", now.date_naive())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::testing::{MemoryLogStore, MemoryUserStore};
    use chrono::{Duration, TimeZone, Utc};
    use ladle_core::quota::{FREE_DAILY_LIMIT, GUEST_DAILY_LIMIT};

    fn noon() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn gate_with(
        users: Arc<MemoryUserStore>,
        log: Arc<MemoryLogStore>,
        clock: ManualClock,
    ) -> QuotaGate {
        QuotaGate::new(users, log, Arc::new(clock))
    }

    fn guest(ip: &str) -> Requester {
        Requester::Guest {
            ip: ip.parse().unwrap(),
        }
    }

    // -- Guests --

    #[tokio::test]
    async fn guest_allowed_three_times_then_denied() {
        let clock = ManualClock::new(noon());
        let gate = gate_with(
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryLogStore::new(Arc::new(clock.clone()))),
            clock,
        );
        let requester = guest("203.0.113.9");

        for expected_remaining in (0..GUEST_DAILY_LIMIT).rev() {
            match gate.check(&requester).await.unwrap() {
                QuotaCheck::Allowed { remaining } => assert_eq!(remaining, expected_remaining),
                QuotaCheck::Denied { .. } => panic!("should be allowed"),
            }
        }
        assert!(matches!(
            gate.check(&requester).await.unwrap(),
            QuotaCheck::Denied { .. },
        ));
    }

    #[tokio::test]
    async fn guest_ips_count_independently() {
        let clock = ManualClock::new(noon());
        let gate = gate_with(
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryLogStore::new(Arc::new(clock.clone()))),
            clock,
        );

        let first = guest("203.0.113.9");
        for _ in 0..GUEST_DAILY_LIMIT {
            assert!(matches!(
                gate.check(&first).await.unwrap(),
                QuotaCheck::Allowed { .. },
            ));
        }
        assert!(matches!(
            gate.check(&first).await.unwrap(),
            QuotaCheck::Denied { .. },
        ));

        // A different IP still has its full allowance.
        match gate.check(&guest("198.51.100.4")).await.unwrap() {
            QuotaCheck::Allowed { remaining } => assert_eq!(remaining, GUEST_DAILY_LIMIT - 1),
            QuotaCheck::Denied { .. } => panic!("fresh IP should be allowed"),
        }
    }

    #[tokio::test]
    async fn guest_count_resets_on_day_rollover() {
        let clock = ManualClock::new(noon());
        let gate = gate_with(
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryLogStore::new(Arc::new(clock.clone()))),
            clock.clone(),
        );
        let requester = guest("203.0.113.9");

        for _ in 0..GUEST_DAILY_LIMIT {
            gate.check(&requester).await.unwrap();
        }
        assert!(matches!(
            gate.check(&requester).await.unwrap(),
            QuotaCheck::Denied { .. },
        ));

        clock.advance(Duration::days(1));
        match gate.check(&requester).await.unwrap() {
            QuotaCheck::Allowed { remaining } => assert_eq!(remaining, GUEST_DAILY_LIMIT - 1),
            QuotaCheck::Denied { .. } => panic!("new day should reset the counter"),
        }
    }

    #[tokio::test]
    async fn guest_denial_expires_at_next_midnight() {
        let clock = ManualClock::new(noon());
        let gate = gate_with(
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryLogStore::new(Arc::new(clock.clone()))),
            clock,
        );
        let requester = guest("203.0.113.9");
        for _ in 0..GUEST_DAILY_LIMIT {
            gate.check(&requester).await.unwrap();
        }
        match gate.check(&requester).await.unwrap() {
            QuotaCheck::Denied { retry_at, .. } => {
                assert_eq!(retry_at, Utc.with_ymd_and_hms(2026, 6, 2, 0, 0, 0).unwrap());
            }
            QuotaCheck::Allowed { .. } => panic!("should be denied"),
        }
    }

    // -- Users --

    #[tokio::test]
    async fn free_user_remaining_tracks_success_count() {
        let clock = ManualClock::new(noon());
        let users = Arc::new(MemoryUserStore::default());
        users.add_free_user(7);
        let log = Arc::new(MemoryLogStore::new(Arc::new(clock.clone())));
        log.record_successes(7, 4).await;
        let gate = gate_with(users, log, clock);

        match gate.check(&Requester::User { id: 7 }).await.unwrap() {
            QuotaCheck::Allowed { remaining } => {
                assert_eq!(remaining, FREE_DAILY_LIMIT - 4 - 1);
            }
            QuotaCheck::Denied { .. } => panic!("should be allowed"),
        }
    }

    #[tokio::test]
    async fn free_user_denied_at_limit() {
        let clock = ManualClock::new(noon());
        let users = Arc::new(MemoryUserStore::default());
        users.add_free_user(7);
        let log = Arc::new(MemoryLogStore::new(Arc::new(clock.clone())));
        log.record_successes(7, FREE_DAILY_LIMIT).await;
        let gate = gate_with(users, log, clock);

        assert!(matches!(
            gate.check(&Requester::User { id: 7 }).await.unwrap(),
            QuotaCheck::Denied { .. },
        ));
    }

    #[tokio::test]
    async fn premium_user_is_unlimited() {
        let clock = ManualClock::new(noon());
        let users = Arc::new(MemoryUserStore::default());
        users.add_premium_user(3, Some(noon() + Duration::days(30)));
        let log = Arc::new(MemoryLogStore::new(Arc::new(clock.clone())));
        log.record_successes(3, 500).await;
        let gate = gate_with(users, log, clock);

        match gate.check(&Requester::User { id: 3 }).await.unwrap() {
            QuotaCheck::Allowed { remaining } => assert_eq!(remaining, UNLIMITED),
            QuotaCheck::Denied { .. } => panic!("premium should never be denied"),
        }
    }

    #[tokio::test]
    async fn lapsed_premium_counts_as_free() {
        let clock = ManualClock::new(noon());
        let users = Arc::new(MemoryUserStore::default());
        users.add_premium_user(3, Some(noon() - Duration::days(1)));
        let log = Arc::new(MemoryLogStore::new(Arc::new(clock.clone())));
        log.record_successes(3, FREE_DAILY_LIMIT).await;
        let gate = gate_with(users, log, clock);

        assert!(matches!(
            gate.check(&Requester::User { id: 3 }).await.unwrap(),
            QuotaCheck::Denied { .. },
        ));
    }

    #[tokio::test]
    async fn remaining_does_not_reserve_a_slot() {
        let clock = ManualClock::new(noon());
        let gate = gate_with(
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryLogStore::new(Arc::new(clock.clone()))),
            clock,
        );
        let requester = guest("203.0.113.9");

        assert_eq!(gate.remaining(&requester).await.unwrap(), GUEST_DAILY_LIMIT);
        assert_eq!(gate.remaining(&requester).await.unwrap(), GUEST_DAILY_LIMIT);
    }
}
