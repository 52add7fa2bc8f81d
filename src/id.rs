//! ID generation for projects, tasks and dependency edges.

use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Prefix for project IDs.
pub const PROJECT_PREFIX: &str = "pj";

/// Prefix for task IDs.
pub const TASK_PREFIX: &str = "tk";

/// Prefix for dependency edge IDs.
pub const DEPENDENCY_PREFIX: &str = "dp";

/// Generate a unique ID from content + entropy.
/// Format: prefix + "-" + 10 hex chars of SHA256(seed + timestamp + random)
pub fn generate_id(prefix: &str, seed: &str, created_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(created_at.timestamp_nanos_opt().unwrap_or(0).to_le_bytes());
    hasher.update(rand::rng().random::<[u8; 8]>());
    let hash = hasher.finalize();
    // 10 hex chars = 40 bits
    format!(
        "{}-{:010x}",
        prefix,
        u64::from_be_bytes([hash[0], hash[1], hash[2], hash[3], hash[4], 0, 0, 0]) >> 24
    )
}
