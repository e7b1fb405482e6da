//! Brute-force lockout policy.
//!
//! The policy itself is a pure predicate; recording failures is delegated to
//! the credential store as a single atomic statement so concurrent attempts
//! against one account cannot race the counter.

use chrono::{DateTime, Utc};

/// Return the lockout deadline when the account is currently suspended.
///
/// A user is suspended iff a lockout instant is set, lies in the future, and
/// the failure counter has reached `max_failures`.
#[must_use]
pub fn suspension(
    failed_count: i32,
    login_blocked_until: Option<DateTime<Utc>>,
    max_failures: i32,
) -> Option<DateTime<Utc>> {
    match login_blocked_until {
        Some(until) if until > Utc::now() && failed_count >= max_failures => Some(until),
        _ => None,
    }
}
