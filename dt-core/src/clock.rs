//! Single clock source.
//!
//! Every persisted timestamp in the system is Unix milliseconds taken
//! from here, so window comparisons (`now >= bet_start_time`) and stored
//! times can never disagree about their origin.

use time::OffsetDateTime;

/// Current wall time as Unix milliseconds.
pub fn now_ms() -> i64 {
    let now = OffsetDateTime::now_utc();
    (now.unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_ms_is_thirteen_digits() {
        let now = now_ms();
        assert!(now > 1_600_000_000_000);
        assert!(now < 10_000_000_000_000);
    }
}
