use serde::{Deserialize, Serialize};

/// Request body for `POST /api/game_event`.
///
/// Event codes: 1 = game_start, 2 = game_stop, 3 = new_card,
/// 4 = game_draw, 5 = game_end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEventRequest {
    pub game_id: String,
    pub room_id: String,
    pub game_round_id: String,
    pub event_type: i16,
}

/// Success payload of `POST /api/game_event` for `game_start`.
///
/// Other events answer with an empty `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEventData {
    /// Opening of the betting window, Unix milliseconds.
    pub bet_start_time: i64,
    /// Close of the betting window, Unix milliseconds.
    pub bet_stop_time: i64,
    /// Window length in seconds, for frontend countdowns.
    pub countdown_second: i64,
}

/// Request body for `POST /api/drawresult`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRequest {
    pub game_id: String,
    pub room_id: String,
    pub game_round_id: String,
    /// Raw outcome string, e.g. `D9,T8,Rd`.
    pub card_list: String,
    /// Operator-reported draw time, Unix milliseconds. Informational.
    #[serde(default)]
    pub draw_time: Option<i64>,
}
