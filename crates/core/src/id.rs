//! Entry identifiers
//!
//! An id is `initials + base62(ticks) + two random base62 chars`, where a tick
//! is 100ms counted from 2025-01-01T00:00:00Z. Ids from the same user sort
//! roughly by capture time; the random tail separates ids minted in the same
//! tick.

use chrono::Utc;
use rand::Rng;

const BASE62: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// 2025-01-01T00:00:00Z in Unix milliseconds
pub const ID_EPOCH_MS: i64 = 1_735_689_600_000;

/// Tick length in milliseconds
pub const TICK_MS: i64 = 100;

/// Generate a new entry id for `initials` from the current time
pub fn generate_id(initials: &str) -> String {
    generate_id_at(initials, Utc::now().timestamp_millis(), &mut rand::thread_rng())
}

/// Generate an id for an explicit Unix-millisecond timestamp
pub fn generate_id_at<R: Rng + ?Sized>(initials: &str, now_ms: i64, rng: &mut R) -> String {
    let mut id = String::with_capacity(initials.len() + 8);
    id.push_str(initials);
    id.push_str(&encode_base62(ticks_since_epoch(now_ms)));
    for _ in 0..2 {
        id.push(BASE62[rng.gen_range(0..BASE62.len())] as char);
    }
    id
}

/// Ticks elapsed since the id epoch, rounded to the nearest tick
fn ticks_since_epoch(now_ms: i64) -> u64 {
    let elapsed = now_ms - ID_EPOCH_MS;
    let ticks = (elapsed + TICK_MS / 2).div_euclid(TICK_MS);
    ticks.max(0) as u64
}

/// Base-62 encoding, most significant digit first; zero encodes as ""
pub fn encode_base62(mut value: u64) -> String {
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE62[(value % 62) as usize]);
        value /= 62;
    }
    digits.iter().rev().map(|&b| b as char).collect()
}
