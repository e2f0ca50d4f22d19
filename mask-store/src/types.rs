// mask-store/src/types.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Plan tier a masked address was created under
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Premium,
}

impl Plan {
    /// Lifetime granted to a mapping created under this plan
    pub fn ttl(&self) -> Duration {
        match self {
            Plan::Free => Duration::hours(24),
            Plan::Premium => Duration::days(7),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Premium => "premium",
        }
    }
}

/// Error for a plan string outside the known set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown plan: {0:?}")]
pub struct UnknownPlan(pub String);

impl std::str::FromStr for Plan {
    type Err = UnknownPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Plan::Free),
            "premium" => Ok(Plan::Premium),
            other => Err(UnknownPlan(other.to_string())),
        }
    }
}

/// Lifecycle state of a mapping
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MappingStatus {
    Active,
    Expired,
}

impl MappingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingStatus::Active => "active",
            MappingStatus::Expired => "expired",
        }
    }
}

/// Error for a status string outside the known set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mapping status: {0:?}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for MappingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MappingStatus::Active),
            "expired" => Ok(MappingStatus::Expired),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A masked address bound to the real address it forwards to.
///
/// `expires_at` is fixed at creation from the plan's lifetime and never
/// advances afterwards. `status` trails behind it: the sweeper flips it
/// once the expiry has passed, so a mapping can still read `Active` here
/// while already being past `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaskedMapping {
    #[serde(rename = "maskedAddress")]
    pub masked_address: String,
    #[serde(rename = "realAddress")]
    pub real_address: String,
    pub plan: Plan,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    pub status: MappingStatus,
}

impl MaskedMapping {
    /// Assemble a fresh `Active` mapping; the expiry is `now` plus the
    /// plan's lifetime. Timestamps are held at millisecond precision so
    /// a mapping reads back identically from every store backend.
    pub fn new(masked_address: &str, real_address: &str, plan: Plan, now: DateTime<Utc>) -> Self {
        let created_at = truncate_to_millis(now);
        Self {
            masked_address: masked_address.to_string(),
            real_address: real_address.to_string(),
            plan,
            created_at,
            expires_at: created_at + plan.ttl(),
            status: MappingStatus::Active,
        }
    }

    /// Whether this mapping should be treated as dead at `now`.
    ///
    /// The timestamp is authoritative: a mapping past `expires_at` is
    /// expired even if no sweep has flipped its status yet.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == MappingStatus::Expired || now >= self.expires_at
    }
}

fn truncate_to_millis(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(t.timestamp_millis()).unwrap_or(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_plan_ttl() {
        assert_eq!(Plan::Free.ttl(), Duration::hours(24));
        assert_eq!(Plan::Premium.ttl(), Duration::days(7));
    }

    #[test]
    fn test_plan_from_str() {
        assert_eq!(Plan::from_str("free").unwrap(), Plan::Free);
        assert_eq!(Plan::from_str("premium").unwrap(), Plan::Premium);
        assert!(Plan::from_str("gold").is_err());
        // Exact strings only; the API contract is lowercase.
        assert!(Plan::from_str("Free").is_err());
        assert!(Plan::from_str("").is_err());
    }

    #[test]
    fn test_new_mapping_expiry_from_plan() {
        let now = Utc::now();
        let free = MaskedMapping::new("x@mask.test", "real@example.com", Plan::Free, now);
        assert_eq!(free.expires_at - free.created_at, Duration::hours(24));
        assert_eq!(free.status, MappingStatus::Active);

        let premium = MaskedMapping::new("y@mask.test", "real@example.com", Plan::Premium, now);
        assert_eq!(premium.expires_at - premium.created_at, Duration::days(7));
    }

    #[test]
    fn test_is_expired_at_timestamp_wins_over_status() {
        let now = Utc::now();
        let mapping = MaskedMapping::new("x@mask.test", "real@example.com", Plan::Free, now);

        assert!(!mapping.is_expired_at(now));
        assert!(!mapping.is_expired_at(now + Duration::hours(23)));
        // Boundary is inclusive: at the expiry instant the mapping is dead.
        assert!(mapping.is_expired_at(mapping.expires_at));
        assert!(mapping.is_expired_at(now + Duration::hours(25)));

        // Status Expired wins even before the timestamp.
        let mut flipped = mapping.clone();
        flipped.status = MappingStatus::Expired;
        assert!(flipped.is_expired_at(now));
    }

    #[test]
    fn test_mapping_json_shape() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let mapping = MaskedMapping::new("tok@mask.test", "real@example.com", Plan::Free, now);
        let json = serde_json::to_value(&mapping).unwrap();

        assert_eq!(json["maskedAddress"], "tok@mask.test");
        assert_eq!(json["realAddress"], "real@example.com");
        assert_eq!(json["plan"], "free");
        assert_eq!(json["status"], "active");
        assert!(json["createdAt"].is_string());
        assert!(json["expiresAt"].is_string());
    }
}
