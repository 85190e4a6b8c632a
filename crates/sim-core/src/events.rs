//! Typed events and the queue that carries them to the presentation layer.
//!
//! The engine never calls into the UI. Every externally visible change is
//! pushed onto the [`EventBus`] as a [`GameEvent`]; the caller drains the
//! queue after each frame and redraws from what it finds.

use crate::account::TradeRejection;
use crate::{Instrument, Trade};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// An economic actor on the scoreboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorId {
    /// The human at the keyboard.
    Player,
    /// The randomized trader.
    Monkey,
    /// The index accumulator.
    Rock,
}

impl ActorId {
    /// Short label for logs and the end-of-run summary.
    pub fn label(self) -> &'static str {
        match self {
            ActorId::Player => "you",
            ActorId::Monkey => "the monkey",
            ActorId::Rock => "the rock",
        }
    }
}

/// Who delivers a narrative message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The tutorial narrator.
    Granny,
    /// The monkey, on the rare occasion it has something to say.
    Monkey,
}

/// Which narrative script is loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptId {
    /// Tutorial played before the clock starts.
    Intro,
    /// Wrap-up played after the run finishes.
    Ending,
}

/// Net worth of every actor, captured the moment the game finishes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scoreboard {
    /// The player's net worth.
    pub player: f64,
    /// The randomized trader's net worth.
    pub monkey: f64,
    /// The index accumulator's net worth.
    pub rock: f64,
}

impl Scoreboard {
    /// Actor with the highest net worth; ties go to the player.
    pub fn leader(&self) -> ActorId {
        let mut leader = (ActorId::Player, self.player);
        for (actor, worth) in [(ActorId::Monkey, self.monkey), (ActorId::Rock, self.rock)] {
            if worth > leader.1 {
                leader = (actor, worth);
            }
        }
        leader.0
    }
}

/// A notification for the presentation layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A fresh game began (also emitted after a restart).
    GameStarted,
    /// The clock left the pre-game gate; days start counting.
    ClockStarted,
    /// A new simulation day began.
    DayAdvanced { day: u64 },
    /// The year rolled over.
    YearAdvanced { year: u32 },
    /// Every instrument took its price step for the day.
    PricesUpdated { day: u64 },
    /// A pay day credited an actor.
    SalaryPaid { actor: ActorId, amount: f64 },
    /// A buy or sell went through.
    TradeExecuted { actor: ActorId, trade: Trade },
    /// A buy or sell was refused; nothing changed.
    TradeRejected {
        actor: ActorId,
        instrument: Option<Instrument>,
        reason: TradeRejection,
    },
    /// The order-ticket selection changed.
    InstrumentSelected { instrument: Option<Instrument> },
    /// The order-ticket cash amount changed.
    OrderCashChanged { cash: f64 },
    /// A narrative message is now on screen.
    MessageShown {
        index: usize,
        speaker: Speaker,
        text: String,
    },
    /// The on-screen message was dismissed.
    MessageAcknowledged { index: usize },
    /// A narrative script was loaded from the top.
    ScriptStarted { script: ScriptId },
    /// The narrative released the trading controls.
    TradingUiRevealed,
    /// The narrative asked for the final scoreboard.
    ScoreboardRevealed,
    /// The run reached its end condition.
    GameFinished { day: u64, scores: Scoreboard },
}

/// FIFO queue of pending events.
#[derive(Debug, Default)]
pub struct EventBus {
    queue: VecDeque<GameEvent>,
}

impl EventBus {
    /// Queue an event for the next drain.
    pub fn push(&mut self, event: GameEvent) {
        self.queue.push_back(event);
    }

    /// Remove and return every pending event, oldest first.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        self.queue.drain(..).collect()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bus_drains_in_fifo_order() {
        let mut bus = EventBus::default();
        bus.push(GameEvent::GameStarted);
        bus.push(GameEvent::DayAdvanced { day: 1 });
        bus.push(GameEvent::DayAdvanced { day: 2 });
        assert_eq!(bus.len(), 3);
        let drained = bus.drain();
        assert_eq!(
            drained,
            vec![
                GameEvent::GameStarted,
                GameEvent::DayAdvanced { day: 1 },
                GameEvent::DayAdvanced { day: 2 },
            ]
        );
        assert!(bus.is_empty());
    }

    #[test]
    fn events_serialize_with_a_type_tag() {
        let value = serde_json::to_value(GameEvent::DayAdvanced { day: 3 }).unwrap();
        assert_eq!(value, json!({ "type": "day_advanced", "day": 3 }));

        let value = serde_json::to_value(GameEvent::TradeRejected {
            actor: ActorId::Player,
            instrument: None,
            reason: TradeRejection::NoInstrumentSelected,
        })
        .unwrap();
        assert_eq!(value["type"], "trade_rejected");
        assert_eq!(value["reason"], "no_instrument_selected");
    }

    #[test]
    fn scoreboard_leader_prefers_the_player_on_ties() {
        let scores = Scoreboard {
            player: 1_000.0,
            monkey: 1_000.0,
            rock: 900.0,
        };
        assert_eq!(scores.leader(), ActorId::Player);
        let scores = Scoreboard {
            player: 900.0,
            monkey: 950.0,
            rock: 1_200.0,
        };
        assert_eq!(scores.leader(), ActorId::Rock);
    }
}
