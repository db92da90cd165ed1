//! Daily generation quota policy.
//!
//! Pure decision logic only: counting today's successes and incrementing
//! guest counters is the pipeline's quota gate's job. Keeping the policy
//! side-effect free lets tests pin "today" and the observed counts exactly.

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Successful generations a free-tier user may run per day.
pub const FREE_DAILY_LIMIT: i64 = 10;

/// Generations a guest IP may run per day.
pub const GUEST_DAILY_LIMIT: i64 = 3;

/// Sentinel for "no limit" (premium accounts).
pub const UNLIMITED: i64 = -1;

/// Account tier exempt from daily limits.
pub const PREMIUM_TIER: &str = "premium";

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Outcome of a quota check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaDecision {
    /// The request may proceed. `remaining` is the count left after this
    /// request (optimistically reserved), or [`UNLIMITED`].
    Allowed { remaining: i64 },
    /// The daily limit is spent.
    Denied { message: String },
}

impl QuotaDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, QuotaDecision::Allowed { .. })
    }
}

/// Whether an account currently counts as premium: the tier must be
/// `"premium"` and the expiry must be absent or in the future.
pub fn is_premium(tier: &str, premium_until: Option<Timestamp>, now: Timestamp) -> bool {
    tier == PREMIUM_TIER && premium_until.map_or(true, |until| until > now)
}

/// Decide for an authenticated user given today's successful-generation
/// count. The remaining figure reserves a slot for the request being
/// decided, so a burst of concurrent requests can transiently exceed the
/// limit; accepted for this domain.
pub fn decide_user(premium: bool, today_success_count: i64) -> QuotaDecision {
    if premium {
        return QuotaDecision::Allowed {
            remaining: UNLIMITED,
        };
    }
    if today_success_count >= FREE_DAILY_LIMIT {
        return QuotaDecision::Denied {
            message: format!(
                "You have reached your daily limit of {FREE_DAILY_LIMIT} recipe generations. \
                 Upgrade to Premium for unlimited generations!"
            ),
        };
    }
    QuotaDecision::Allowed {
        remaining: FREE_DAILY_LIMIT - today_success_count - 1,
    }
}

/// Decide for a guest given the IP's counter for today.
pub fn decide_guest(today_count: i64) -> QuotaDecision {
    if today_count >= GUEST_DAILY_LIMIT {
        return QuotaDecision::Denied {
            message: format!(
                "You have reached your daily limit of {GUEST_DAILY_LIMIT} recipe generations. \
                 Sign up for free to get {FREE_DAILY_LIMIT} generations per day!"
            ),
        };
    }
    QuotaDecision::Allowed {
        remaining: GUEST_DAILY_LIMIT - today_count - 1,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    // -- Premium check --

    #[test]
    fn premium_tier_without_expiry_is_premium() {
        assert!(is_premium("premium", None, Utc::now()));
    }

    #[test]
    fn premium_tier_with_future_expiry_is_premium() {
        let now = Utc::now();
        assert!(is_premium("premium", Some(now + Duration::days(30)), now));
    }

    #[test]
    fn premium_tier_with_past_expiry_is_not_premium() {
        let now = Utc::now();
        assert!(!is_premium("premium", Some(now - Duration::days(1)), now));
    }

    #[test]
    fn free_tier_is_never_premium() {
        assert!(!is_premium("free", None, Utc::now()));
    }

    // -- User decisions --

    #[test]
    fn premium_user_is_always_allowed() {
        let decision = decide_user(true, 10_000);
        assert_eq!(decision, QuotaDecision::Allowed { remaining: UNLIMITED });
    }

    #[test]
    fn free_user_remaining_decreases_monotonically() {
        for count in 0..FREE_DAILY_LIMIT {
            match decide_user(false, count) {
                QuotaDecision::Allowed { remaining } => {
                    assert_eq!(remaining, FREE_DAILY_LIMIT - count - 1);
                }
                QuotaDecision::Denied { .. } => panic!("should be allowed at count {count}"),
            }
        }
    }

    #[test]
    fn free_user_denied_at_limit() {
        assert!(!decide_user(false, FREE_DAILY_LIMIT).is_allowed());
    }

    #[test]
    fn free_user_denial_mentions_premium_upgrade() {
        match decide_user(false, FREE_DAILY_LIMIT) {
            QuotaDecision::Denied { message } => assert!(message.contains("Premium")),
            QuotaDecision::Allowed { .. } => panic!("should be denied"),
        }
    }

    // -- Guest decisions --

    #[test]
    fn guest_allowed_below_limit() {
        assert_eq!(decide_guest(0), QuotaDecision::Allowed { remaining: 2 });
        assert_eq!(decide_guest(2), QuotaDecision::Allowed { remaining: 0 });
    }

    #[test]
    fn guest_denied_at_limit() {
        assert!(!decide_guest(GUEST_DAILY_LIMIT).is_allowed());
    }

    #[test]
    fn guest_denial_mentions_signing_up() {
        match decide_guest(GUEST_DAILY_LIMIT) {
            QuotaDecision::Denied { message } => assert!(message.contains("Sign up")),
            QuotaDecision::Allowed { .. } => panic!("should be denied"),
        }
    }
}
