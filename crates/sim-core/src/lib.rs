#![deny(warnings)]

//! Core domain models and invariants for the market simulation.
//!
//! This crate defines the instruments, trades, portfolios, and accounts
//! shared by every economic actor, plus the game configuration and the typed
//! event vocabulary the presentation layer consumes.

pub mod account;
pub mod config;
pub mod events;

pub use account::{Account, TradeRejection};
pub use config::{
    validate_config, GameConfig, RandomTraderConfig, RandomWalkConfig, ValidationError,
};
pub use events::{ActorId, EventBus, GameEvent, Scoreboard, ScriptId, Speaker};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Quantities and cash amounts closer to zero than this are treated as zero.
///
/// Cash-denominated buys produce fractional holdings, so comparisons against
/// "all of a holding" must absorb float dust.
pub const DUST: f64 = 1e-9;

/// A tradable instrument. The set is closed: five themed instruments, with
/// [`Instrument::World`] standing in for the broad market as a whole.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    /// A shiny red apple.
    Apple,
    /// A dependable potato.
    Potato,
    /// A fish of uncertain freshness.
    Fish,
    /// A snowball. Prone to melting.
    Snowball,
    /// The whole wide world: the broad-market aggregate.
    World,
}

impl Instrument {
    /// Every instrument, in stable (derive `Ord`) order.
    pub const ALL: [Instrument; 5] = [
        Instrument::Apple,
        Instrument::Potato,
        Instrument::Fish,
        Instrument::Snowball,
        Instrument::World,
    ];

    /// The broad-market aggregate; the accumulator trader's designated
    /// target.
    pub const MARKET_INDEX: Instrument = Instrument::World;

    /// Lowercase name used in config keys, CSV file stems, and logs.
    pub fn name(self) -> &'static str {
        match self {
            Instrument::Apple => "apple",
            Instrument::Potato => "potato",
            Instrument::Fish => "fish",
            Instrument::Snowball => "snowball",
            Instrument::World => "world",
        }
    }

    /// Parse a lowercase instrument name, as produced by [`Instrument::name`].
    pub fn from_name(name: &str) -> Option<Instrument> {
        let name = name.trim().to_ascii_lowercase();
        Instrument::ALL.into_iter().find(|i| i.name() == name)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Side of a trade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    /// Cash out, units in.
    Buy,
    /// Units out, cash in.
    Sell,
}

/// An executed trade. Appended to an account's history and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Instrument traded.
    pub instrument: Instrument,
    /// Buy or sell.
    pub direction: TradeDirection,
    /// Execution price in dollars per unit (> 0).
    pub price: f64,
    /// Units exchanged (> 0; fractional units are legal).
    pub quantity: f64,
    /// Simulation day the trade executed on.
    pub day: u64,
}

impl Trade {
    /// Cash moved by this trade: `price * quantity`.
    pub fn cash_value(&self) -> f64 {
        self.price * self.quantity
    }
}

/// Anything that can quote a latest per-unit price for an instrument.
///
/// The market history implements this; tests and valuation helpers can use a
/// plain price map instead.
pub trait PriceSource {
    /// Latest known price for the instrument, in dollars per unit.
    fn latest_price(&self, instrument: Instrument) -> f64;
}

impl PriceSource for BTreeMap<Instrument, f64> {
    fn latest_price(&self, instrument: Instrument) -> f64 {
        self.get(&instrument).copied().unwrap_or(0.0)
    }
}

/// Non-negative holdings per instrument. Absent keys read as zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    holdings: BTreeMap<Instrument, f64>,
}

impl Portfolio {
    /// Units held of `instrument`; 0.0 when none.
    pub fn holding(&self, instrument: Instrument) -> f64 {
        self.holdings.get(&instrument).copied().unwrap_or(0.0)
    }

    /// Whether no instrument is held.
    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Held instruments with their quantities, in stable instrument order.
    pub fn iter(&self) -> impl Iterator<Item = (Instrument, f64)> + '_ {
        self.holdings.iter().map(|(i, q)| (*i, *q))
    }

    /// Mark-to-market value of all holdings.
    pub fn value<P: PriceSource>(&self, prices: &P) -> f64 {
        self.holdings
            .iter()
            .map(|(i, q)| q * prices.latest_price(*i))
            .sum()
    }

    pub(crate) fn add(&mut self, instrument: Instrument, quantity: f64) {
        *self.holdings.entry(instrument).or_insert(0.0) += quantity;
    }

    pub(crate) fn remove(&mut self, instrument: Instrument, quantity: f64) {
        let remaining = (self.holding(instrument) - quantity).max(0.0);
        if remaining <= DUST {
            self.holdings.remove(&instrument);
        } else {
            self.holdings.insert(instrument, remaining);
        }
    }
}
