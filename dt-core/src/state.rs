//! Round lifecycle state machine.
//!
//! States and events are stored as integer codes; logic works with the
//! enums. Only the transitions listed in [`RoundState::apply`] are legal
//! — everything else is an [`InvalidTransition`] error. Settlement moves
//! a round `drawn` → `settled` inside the draw engine's transaction and
//! is deliberately not an operator event.

use thiserror::Error;

/// Lifecycle state of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundState {
    Init,
    Betting,
    Sealed,
    Dealt,
    Drawn,
    Settled,
    Finished,
}

/// Operator-driven lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameEvent {
    GameStart,
    GameStop,
    NewCard,
    GameDraw,
    GameEnd,
}

/// A state/event pair outside the legal transition table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {state} --{event}--> ?")]
pub struct InvalidTransition {
    pub state: RoundState,
    pub event: GameEvent,
}

impl RoundState {
    /// Storage code of this state.
    pub fn code(self) -> i16 {
        match self {
            RoundState::Init => 1,
            RoundState::Betting => 2,
            RoundState::Sealed => 3,
            RoundState::Dealt => 4,
            RoundState::Drawn => 5,
            RoundState::Settled => 6,
            RoundState::Finished => 7,
        }
    }

    /// State for a storage code. Unknown codes read as `Init`.
    pub fn from_code(code: i16) -> Self {
        match code {
            2 => RoundState::Betting,
            3 => RoundState::Sealed,
            4 => RoundState::Dealt,
            5 => RoundState::Drawn,
            6 => RoundState::Settled,
            7 => RoundState::Finished,
            _ => RoundState::Init,
        }
    }

    /// Name used in audit rows and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            RoundState::Init => "init",
            RoundState::Betting => "betting",
            RoundState::Sealed => "sealed",
            RoundState::Dealt => "dealt",
            RoundState::Drawn => "drawn",
            RoundState::Settled => "settled",
            RoundState::Finished => "finished",
        }
    }

    /// Next state for an operator event, or an error when the pair is
    /// not in the transition table.
    pub fn apply(self, event: GameEvent) -> Result<RoundState, InvalidTransition> {
        match (self, event) {
            (RoundState::Init, GameEvent::GameStart) => Ok(RoundState::Betting),
            (RoundState::Betting, GameEvent::GameStop) => Ok(RoundState::Sealed),
            (RoundState::Sealed, GameEvent::NewCard) => Ok(RoundState::Dealt),
            (RoundState::Dealt, GameEvent::GameDraw) => Ok(RoundState::Drawn),
            (RoundState::Drawn, GameEvent::GameEnd) => Ok(RoundState::Finished),
            (RoundState::Settled, GameEvent::GameEnd) => Ok(RoundState::Finished),
            (state, event) => Err(InvalidTransition { state, event }),
        }
    }
}

impl std::fmt::Display for RoundState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GameEvent {
    /// Storage/wire code of this event.
    pub fn code(self) -> i16 {
        match self {
            GameEvent::GameStart => 1,
            GameEvent::GameStop => 2,
            GameEvent::NewCard => 3,
            GameEvent::GameDraw => 4,
            GameEvent::GameEnd => 5,
        }
    }

    /// Event for a wire code.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(GameEvent::GameStart),
            2 => Some(GameEvent::GameStop),
            3 => Some(GameEvent::NewCard),
            4 => Some(GameEvent::GameDraw),
            5 => Some(GameEvent::GameEnd),
            _ => None,
        }
    }

    /// Name used in audit rows and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            GameEvent::GameStart => "game_start",
            GameEvent::GameStop => "game_stop",
            GameEvent::NewCard => "new_card",
            GameEvent::GameDraw => "game_draw",
            GameEvent::GameEnd => "game_end",
        }
    }
}

impl std::fmt::Display for GameEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [RoundState; 7] = [
        RoundState::Init,
        RoundState::Betting,
        RoundState::Sealed,
        RoundState::Dealt,
        RoundState::Drawn,
        RoundState::Settled,
        RoundState::Finished,
    ];
    const ALL_EVENTS: [GameEvent; 5] = [
        GameEvent::GameStart,
        GameEvent::GameStop,
        GameEvent::NewCard,
        GameEvent::GameDraw,
        GameEvent::GameEnd,
    ];

    #[test]
    fn legal_transitions() {
        assert_eq!(
            RoundState::Init.apply(GameEvent::GameStart),
            Ok(RoundState::Betting)
        );
        assert_eq!(
            RoundState::Betting.apply(GameEvent::GameStop),
            Ok(RoundState::Sealed)
        );
        assert_eq!(
            RoundState::Sealed.apply(GameEvent::NewCard),
            Ok(RoundState::Dealt)
        );
        assert_eq!(
            RoundState::Dealt.apply(GameEvent::GameDraw),
            Ok(RoundState::Drawn)
        );
        assert_eq!(
            RoundState::Drawn.apply(GameEvent::GameEnd),
            Ok(RoundState::Finished)
        );
        assert_eq!(
            RoundState::Settled.apply(GameEvent::GameEnd),
            Ok(RoundState::Finished)
        );
    }

    #[test]
    fn every_other_pair_is_rejected() {
        let legal = [
            (RoundState::Init, GameEvent::GameStart),
            (RoundState::Betting, GameEvent::GameStop),
            (RoundState::Sealed, GameEvent::NewCard),
            (RoundState::Dealt, GameEvent::GameDraw),
            (RoundState::Drawn, GameEvent::GameEnd),
            (RoundState::Settled, GameEvent::GameEnd),
        ];
        for state in ALL_STATES {
            for event in ALL_EVENTS {
                let expect_ok = legal.contains(&(state, event));
                assert_eq!(state.apply(event).is_ok(), expect_ok, "{state} --{event}->");
            }
        }
    }

    #[test]
    fn legal_transitions_never_decrease_the_code() {
        for state in ALL_STATES {
            for event in ALL_EVENTS {
                if let Ok(next) = state.apply(event) {
                    assert!(next.code() > state.code(), "{state} --{event}-> {next}");
                }
            }
        }
    }

    #[test]
    fn codes_round_trip() {
        for state in ALL_STATES {
            assert_eq!(RoundState::from_code(state.code()), state);
        }
        for event in ALL_EVENTS {
            assert_eq!(GameEvent::from_code(event.code()), Some(event));
        }
        assert_eq!(RoundState::from_code(0), RoundState::Init);
        assert_eq!(RoundState::from_code(99), RoundState::Init);
        assert_eq!(GameEvent::from_code(0), None);
        assert_eq!(GameEvent::from_code(6), None);
    }
}
