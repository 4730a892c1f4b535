use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted link record.
///
/// The persistent store is the authoritative source for everything in this
/// struct; the expiration tracker only ever holds `code -> deadline` hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// The short code identifying this link.
    pub code: ShortCode,
    /// The normalized absolute target URL.
    pub target: String,
    /// The owning user, or `None` for an anonymous link.
    pub owner: Option<Uuid>,
    /// When the link was created.
    pub created_at: Timestamp,
    /// When the link expires, if ever.
    pub expires_at: Option<Timestamp>,
    /// Redirect count. Mutated only by the redirect path.
    pub hit_count: u64,
    /// Last redirect time. Mutated only by the redirect path.
    pub last_used_at: Option<Timestamp>,
}

impl LinkRecord {
    /// Creates a fresh record with zeroed usage counters.
    pub fn new(
        code: ShortCode,
        target: impl Into<String>,
        owner: Option<Uuid>,
        expires_at: Option<Timestamp>,
    ) -> Self {
        Self {
            code,
            target: target.into(),
            owner,
            created_at: Timestamp::now(),
            expires_at,
            hit_count: 0,
            last_used_at: None,
        }
    }

    /// Returns `true` if the record carries a deadline that has passed.
    pub fn is_expired(&self, as_of: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= as_of)
    }
}

/// Normalizes a target URL, defaulting the scheme to `https://` when absent.
///
/// Returns `None` for targets that cannot name a host at all.
pub fn normalize_target(target: &str) -> Option<String> {
    let trimmed = target.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some((scheme, rest)) = trimmed.split_once("://") {
        let scheme = scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return None;
        }
        if rest.is_empty() {
            return None;
        }
        return Some(format!("{}://{}", scheme, rest));
    }

    Some(format!("https://{}", trimmed))
}
