//! Order-independent digest of a state snapshot, used for novelty only.
//!
//! The digest covers mode, a coarse per-item inventory bucket, the alert set
//! and the violation set. Counters that change on every request
//! (`state_version`, `orders_total`, event timestamps) are left out so that
//! revisiting the same situation yields the same signature.

use std::fmt;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::snapshot::StateSnapshot;

/// Bytes of the SHA-256 digest kept in a signature.
const SIGNATURE_BYTES: usize = 16;

/// Upper bound (inclusive) of the `low` inventory bucket.
pub const LOW_STOCK_MAX: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSignature(String);

impl StateSignature {
    pub fn of(snapshot: &StateSnapshot) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(canonical_form(snapshot).as_bytes());
        let digest = hasher.finalize();

        let mut hex = String::with_capacity(SIGNATURE_BYTES * 2);
        for byte in &digest[..SIGNATURE_BYTES] {
            let _ = write!(hex, "{byte:02x}");
        }
        StateSignature(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse quantity bucket so small stock changes do not count as new states.
pub fn inventory_bucket(quantity: i64) -> &'static str {
    match quantity {
        q if q < 0 => "negative",
        0 => "empty",
        q if q <= LOW_STOCK_MAX => "low",
        _ => "stocked",
    }
}

/// Line-oriented canonical encoding. BTree collections give a stable order.
fn canonical_form(snapshot: &StateSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "mode={}", snapshot.mode.as_deref().unwrap_or("-"));
    for (item, qty) in &snapshot.inventory {
        let _ = writeln!(out, "item:{item}={}", inventory_bucket(*qty));
    }
    for alert in &snapshot.alerts {
        let _ = writeln!(out, "alert={alert}");
    }
    for violation in &snapshot.violations {
        let _ = writeln!(out, "violation={violation}");
    }
    out
}
