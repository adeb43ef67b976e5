pub mod bet;
pub mod envelope;
pub mod events;
pub mod game_event;
pub mod round;
pub mod user;

pub use bet::{BetData, BetRequest};
pub use envelope::ApiResponse;
pub use events::{
    BetPlacedPayload, GameDrawReadyPayload, GameDrawnPayload, GameEndedPayload,
    GameStartedPayload, OrderSettledPayload,
};
pub use game_event::{DrawRequest, GameEventData, GameEventRequest};
pub use round::{RoundDetail, RoundInfoSnapshot, RoundResultSnapshot};
pub use user::{BalanceData, BetRecordItem, BetRecordsData};
