pub mod clock;
pub mod player;

pub use clock::{Clock, ManualClock, SystemClock};
pub use player::{PlaybackState, PlayerService, TickOutcome, TransportEvent};
