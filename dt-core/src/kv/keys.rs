//! KV key layout.
//!
//! All business keys are built here so the layout lives in one place.

/// Prefix of the idempotency result cache: first successful bet result
/// for a key, returned verbatim to duplicate requests.
pub const PREFIX_BET_IDEM_RESULT: &str = "bet:idem:result:";
/// Prefix of the in-flight idempotency lock (SET-NX + TTL).
pub const PREFIX_BET_IDEM_LOCK: &str = "bet:idem:lock:";
/// Prefix of the round info cache (betting window for countdowns).
pub const PREFIX_ROUND_INFO: &str = "game:round:";
/// Prefix of the draw result cache.
pub const PREFIX_ROUND_RESULT: &str = "game:result:";

/// `bet:idem:result:{idempotency_key}`
pub fn idem_result_key(idempotency_key: &str) -> String {
    format!("{PREFIX_BET_IDEM_RESULT}{idempotency_key}")
}

/// `bet:idem:lock:{idempotency_key}`
pub fn idem_lock_key(idempotency_key: &str) -> String {
    format!("{PREFIX_BET_IDEM_LOCK}{idempotency_key}")
}

/// `game:round:{round_id}`
pub fn round_info_key(round_id: &str) -> String {
    format!("{PREFIX_ROUND_INFO}{round_id}")
}

/// `game:result:{round_id}`
pub fn round_result_key(round_id: &str) -> String {
    format!("{PREFIX_ROUND_RESULT}{round_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_shapes() {
        assert_eq!(idem_result_key("K1"), "bet:idem:result:K1");
        assert_eq!(idem_lock_key("K1"), "bet:idem:lock:K1");
        assert_eq!(round_info_key("R1"), "game:round:R1");
        assert_eq!(round_result_key("R1"), "game:result:R1");
    }
}
