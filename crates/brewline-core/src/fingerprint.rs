//! # Order Fingerprint
//!
//! Tamper-detection hash stored on every order.
//!
//! ```text
//! message = "{branch_id}|{order_number}|{total_cents}|{cashier_id}|{timestamp}"
//! hash    = hex(HMAC-SHA256(secret, message))
//! ```
//!
//! `timestamp` is RFC 3339 UTC with millisecond precision. Any change to the
//! stored branch, number, total, cashier or time makes [`OrderFingerprint::verify`]
//! fail, and without the server secret a matching hash can't be forged.

use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;

type HmacSha256 = Hmac<Sha256>;

/// The order fields covered by the hash.
#[derive(Debug, Clone, Copy)]
pub struct FingerprintInput<'a> {
    pub branch_id: &'a str,
    pub order_number: i64,
    pub total: Money,
    pub cashier_id: &'a str,
    pub timestamp: DateTime<Utc>,
}

impl FingerprintInput<'_> {
    fn message(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.branch_id,
            self.order_number,
            self.total.cents(),
            self.cashier_id,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

/// Keyed order hasher.
#[derive(Clone)]
pub struct OrderFingerprint {
    mac: HmacSha256,
}

impl OrderFingerprint {
    /// Creates a hasher keyed with `secret`. An empty secret is rejected.
    pub fn new(secret: impl AsRef<[u8]>) -> CoreResult<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(ValidationError::required("order hash secret").into());
        }

        let mac = HmacSha256::new_from_slice(secret).map_err(|_| ValidationError::InvalidFormat {
            field: "order hash secret".to_string(),
            reason: "unusable key length".to_string(),
        })?;

        Ok(OrderFingerprint { mac })
    }

    /// Lowercase hex HMAC of the order fields.
    pub fn sign(&self, input: &FingerprintInput<'_>) -> String {
        let mut mac = self.mac.clone();
        mac.update(input.message().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time check of a stored hash against the order fields.
    pub fn verify(&self, input: &FingerprintInput<'_>, hash: &str) -> bool {
        let Ok(expected) = hex::decode(hash) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(input.message().as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

impl fmt::Debug for OrderFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderFingerprint").finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
