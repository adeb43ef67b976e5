//! Stable numeric business codes.
//!
//! Every API response carries one of these in its envelope. The values
//! are part of the wire contract with the integrating platforms and must
//! never be renumbered.

/// Success.
pub const SUCCESS: u32 = 0;
/// Malformed or missing request parameters.
pub const BAD_REQUEST: u32 = 1000;
/// A request with the same idempotency key is currently in flight.
pub const DUPLICATE_IN_FLIGHT: u32 = 2001;
/// The idempotency key was already committed (the prior result is returned).
pub const DUPLICATE_KEY: u32 = 2002;
/// The round state does not allow betting.
pub const INVALID_STATE: u32 = 2003;
/// The betting window has not opened yet.
pub const BET_WINDOW_NOT_START: u32 = 2004;
/// The betting window has closed.
pub const BET_WINDOW_CLOSED: u32 = 2005;
/// The user already bet on the opposite side in this round.
pub const CONFLICTING_BET: u32 = 2006;
/// The user balance does not cover the stake.
pub const INSUFFICIENT_BALANCE: u32 = 2007;
/// The round state does not allow submitting a draw result.
pub const INVALID_STATE_DRAW: u32 = 2008;
/// The round cannot be ended before a draw result exists.
pub const INVALID_STATE_GAME_END: u32 = 2009;
/// Resource not found.
pub const NOT_FOUND: u32 = 4004;
/// Internal error; details are logged under the trace id.
pub const SYSTEM_ERROR: u32 = 5000;

/// Default human-readable message for a business code.
pub fn default_message(code: u32) -> &'static str {
    match code {
        SUCCESS => "success",
        BAD_REQUEST => "bad request",
        DUPLICATE_IN_FLIGHT => "duplicate request in flight, retry later",
        DUPLICATE_KEY => "duplicate request",
        INVALID_STATE => "operation not allowed in current state",
        BET_WINDOW_NOT_START => "bet window not started",
        BET_WINDOW_CLOSED => "bet window closed",
        CONFLICTING_BET => "cannot bet on both dragon and tiger in the same round",
        INSUFFICIENT_BALANCE => "insufficient balance",
        INVALID_STATE_DRAW => "draw not allowed in current state",
        INVALID_STATE_GAME_END => "game end not allowed before draw",
        NOT_FOUND => "not found",
        SYSTEM_ERROR => "system busy, retry later",
        _ => "unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_messages() {
        for code in [
            SUCCESS,
            BAD_REQUEST,
            DUPLICATE_IN_FLIGHT,
            DUPLICATE_KEY,
            INVALID_STATE,
            BET_WINDOW_NOT_START,
            BET_WINDOW_CLOSED,
            CONFLICTING_BET,
            INSUFFICIENT_BALANCE,
            INVALID_STATE_DRAW,
            INVALID_STATE_GAME_END,
            NOT_FOUND,
            SYSTEM_ERROR,
        ] {
            assert_ne!(default_message(code), "unknown error", "code {code}");
        }
        assert_eq!(default_message(31337), "unknown error");
    }
}
