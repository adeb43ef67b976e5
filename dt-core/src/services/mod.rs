//! Request-scoped engines.
//!
//! Each service is constructed once with its pool/KV handles and shared
//! by reference across request tasks. Transactions are opened per call;
//! nothing here holds state between requests.

pub mod bet;
pub mod draw;
pub mod game_event;
pub mod idempotency;
pub mod round;

pub use bet::{BetConfig, BetError, BetInput, BetService};
pub use draw::{DrawError, DrawInput, DrawOutput, DrawService, Winner};
pub use game_event::{
    GameEventInput, GameEventOutput, LifecycleConfig, LifecycleError, LifecycleService,
};
pub use idempotency::{IdemBegin, IdemConfig, IdemCoordinator, InFlightLock};
pub use round::RoundQueryService;
