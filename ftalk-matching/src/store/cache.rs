//! Redis mirror of live-session state.
//!
//! Everything here is an accelerator with a bounded TTL; the relational
//! store stays authoritative. Writes are fire-and-forget — a failed cache
//! write is logged and never fails the request.

use ftalk_shared::clients::redis::RedisClient;
use uuid::Uuid;

const PAIR_PREFIX: &str = "ftalk:pair";
const USER_MATCH_PREFIX: &str = "ftalk:user_match";
const COOLDOWN_PREFIX: &str = "ftalk:cooldown";
const PRESENCE_PREFIX: &str = "ftalk:presence";
const MATCH_LOCK_PREFIX: &str = "ftalk:match_lock";
const SESSION_MSGS_PREFIX: &str = "ftalk:session_msgs";
const ONLINE_COUNT_KEY: &str = "ftalk:online_count";

const PAIR_TTL: u64 = 3600; // mirror of a live pairing, 1h cap
const PRESENCE_TTL: u64 = 3600;
const SESSION_TTL: u64 = 3600;
const ONLINE_COUNT_TTL: u64 = 15;

fn pair_cooldown_key(a: &Uuid, b: &Uuid) -> String {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    format!("{COOLDOWN_PREFIX}:{lo}:{hi}")
}

// --- Active pair mirror ---

pub async fn set_active_pair(redis: &RedisClient, match_id: &Uuid, user_a: &Uuid, user_b: &Uuid) {
    let key = format!("{PAIR_PREFIX}:{match_id}");
    let val = serde_json::json!({ "user_a": user_a, "user_b": user_b }).to_string();
    if let Err(e) = redis.set(&key, &val, PAIR_TTL).await {
        tracing::warn!(error = %e, "failed to mirror active pair");
    }

    let _ = redis.set(&format!("{USER_MATCH_PREFIX}:{user_a}"), &match_id.to_string(), PAIR_TTL).await;
    let _ = redis.set(&format!("{USER_MATCH_PREFIX}:{user_b}"), &match_id.to_string(), PAIR_TTL).await;
}

/// Drop the per-user mappings when a pairing dissolves. The
/// `ftalk:pair:{match_id}` mirror is left to expire on its own TTL.
pub async fn clear_active_pair(redis: &RedisClient, user_a: &Uuid, user_b: &Uuid) {
    let _ = redis.del(&format!("{USER_MATCH_PREFIX}:{user_a}")).await;
    let _ = redis.del(&format!("{USER_MATCH_PREFIX}:{user_b}")).await;
}

// --- Skip cooldowns ---

pub async fn set_skip_cooldown(redis: &RedisClient, a: &Uuid, b: &Uuid, ttl_secs: u64) {
    let _ = redis.set(&pair_cooldown_key(a, b), "1", ttl_secs).await;
}

/// Batch cooldown check for one user against many candidates.
/// Returns flags in `candidate_ids` order; on a cache failure everything
/// reads as not-cooling-down (worst case is one early re-pair).
pub async fn skip_cooldowns_batch(
    redis: &RedisClient,
    user_id: &Uuid,
    candidate_ids: &[Uuid],
) -> Vec<bool> {
    if candidate_ids.is_empty() {
        return vec![];
    }
    let keys: Vec<String> = candidate_ids
        .iter()
        .map(|cid| pair_cooldown_key(user_id, cid))
        .collect();
    redis.exists_multi(&keys).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to batch check skip cooldowns");
        vec![false; candidate_ids.len()]
    })
}

// --- Per-user match lock ---

/// NX lock serializing concurrent find-match attempts by the same user.
pub async fn acquire_match_lock(redis: &RedisClient, user_id: &Uuid) -> bool {
    let key = format!("{MATCH_LOCK_PREFIX}:{user_id}");
    redis.set_nx(&key, "1", 5).await.unwrap_or(false)
}

pub async fn release_match_lock(redis: &RedisClient, user_id: &Uuid) {
    let _ = redis.del(&format!("{MATCH_LOCK_PREFIX}:{user_id}")).await;
}

// --- Presence ---

pub async fn set_presence(redis: &RedisClient, user_id: &Uuid, socket_id: &str) {
    let _ = redis.set(&format!("{PRESENCE_PREFIX}:{user_id}"), socket_id, PRESENCE_TTL).await;
}

pub async fn clear_presence(redis: &RedisClient, user_id: &Uuid) {
    let _ = redis.del(&format!("{PRESENCE_PREFIX}:{user_id}")).await;
}

// --- Session message counter ---

pub async fn increment_session_msgs(redis: &RedisClient, session_id: &Uuid) {
    let key = format!("{SESSION_MSGS_PREFIX}:{session_id}");
    let _ = redis.incr(&key).await;
    let _ = redis.expire(&key, SESSION_TTL as i64).await;
}

pub async fn clear_session_msgs(redis: &RedisClient, session_id: &Uuid) {
    let _ = redis.del(&format!("{SESSION_MSGS_PREFIX}:{session_id}")).await;
}

// --- Online count (read-through) ---

pub async fn cached_online_count(redis: &RedisClient) -> Option<i64> {
    match redis.get(ONLINE_COUNT_KEY).await {
        Ok(Some(v)) => v.parse::<i64>().ok(),
        _ => None,
    }
}

pub async fn store_online_count(redis: &RedisClient, count: i64) {
    let _ = redis.set(ONLINE_COUNT_KEY, &count.to_string(), ONLINE_COUNT_TTL).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_key_ignores_argument_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(pair_cooldown_key(&a, &b), pair_cooldown_key(&b, &a));
    }

    #[test]
    fn cooldown_key_distinguishes_pairs() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        assert_ne!(pair_cooldown_key(&a, &b), pair_cooldown_key(&a, &c));
    }
}
