#![deny(warnings)]

//! The game runtime: a day clock driven by wall-clock deltas, a narrative
//! sequencer that gates it, and the session that wires both to the market
//! and the scripted traders.

pub mod clock;
pub mod narrative;
pub mod session;

pub use clock::{ClockPhase, ClockState, DayOutcome, GameClock};
pub use narrative::{scripts, NarrativeAction, NarrativeMessage, NarrativeSequencer};
pub use session::{GameSession, SessionError};
