#![deny(warnings)]

//! Price history: random-walk generation and day-indexed lookup.
//!
//! Each instrument keeps a bounded window of daily closes. The walk is a
//! drifted coin flip: a uniform draw against a threshold, scaled to dollars,
//! floored so prices never reach zero. Markets come in two flavours:
//! synthetic (every day appends a walk step) and preloaded from historical
//! close tables (the day cursor moves, the data does not).

pub mod data;

pub use data::{load_close_table, load_price_tables, read_close_table, PriceDataError, PriceRow};

use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_core::{Instrument, PriceSource, RandomWalkConfig};
use std::collections::{BTreeMap, VecDeque};

/// Bounded day-indexed history of positive prices for one instrument.
///
/// `first_day` is the simulation day of the oldest retained sample; once the
/// window is full, each append drops the oldest sample and slides the window
/// forward one day.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceSeries {
    prices: VecDeque<f64>,
    first_day: u64,
    cap: usize,
}

impl PriceSeries {
    /// Series holding a single opening sample for day 0.
    pub fn with_start(price: f64, cap: usize) -> Self {
        let mut prices = VecDeque::new();
        prices.push_back(price);
        PriceSeries {
            prices,
            first_day: 0,
            cap: cap.max(1),
        }
    }

    /// Series preloaded from historical closes, oldest first. The window
    /// covers the whole table; nothing is ever dropped.
    pub fn from_closes(closes: Vec<f64>) -> Result<Self, PriceDataError> {
        if closes.is_empty() {
            return Err(PriceDataError::EmptyTable);
        }
        for (idx, close) in closes.iter().enumerate() {
            if !close.is_finite() || *close <= 0.0 {
                return Err(PriceDataError::InvalidClose {
                    row: idx + 1,
                    close: *close,
                });
            }
        }
        let cap = closes.len();
        Ok(PriceSeries {
            prices: closes.into(),
            first_day: 0,
            cap,
        })
    }

    /// Most recently appended price.
    pub fn latest(&self) -> f64 {
        self.prices.back().copied().unwrap_or(0.0)
    }

    /// Day of the oldest retained sample.
    pub fn first_day(&self) -> u64 {
        self.first_day
    }

    /// Day of the newest retained sample.
    pub fn last_day(&self) -> u64 {
        self.first_day + self.prices.len().saturating_sub(1) as u64
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Never true: a series always holds at least its opening sample.
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Price on `day`, clamped to the retained window.
    ///
    /// Days before the window read the oldest sample, days after the newest
    /// read the latest. Lookups never fail and never return NaN.
    pub fn price_on(&self, day: u64) -> f64 {
        let offset = day.saturating_sub(self.first_day) as usize;
        let idx = offset.min(self.prices.len().saturating_sub(1));
        self.prices.get(idx).copied().unwrap_or(0.0)
    }

    /// Take one random-walk step and return the new price:
    /// `next = max(floor, last + (u - drift) * step_scale)` with `u` uniform
    /// in [0, 1).
    pub fn advance(&mut self, walk: &RandomWalkConfig, rng: &mut impl Rng) -> f64 {
        let u: f64 = rng.gen();
        let next = (self.latest() + (u - walk.drift) * walk.step_scale).max(walk.floor);
        self.push(next);
        next
    }

    /// Retained samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.prices.iter().copied()
    }

    fn push(&mut self, price: f64) {
        if self.prices.len() == self.cap {
            self.prices.pop_front();
            self.first_day += 1;
        }
        self.prices.push_back(price);
    }
}

/// Day-indexed price history for the whole instrument set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketHistory {
    series: BTreeMap<Instrument, PriceSeries>,
    current_day: u64,
    synthetic: bool,
}

impl MarketHistory {
    /// Synthetic market opened at the configured starting prices.
    pub fn from_starting_prices(
        starting: &BTreeMap<Instrument, f64>,
        window: usize,
    ) -> Result<Self, PriceDataError> {
        let mut series = BTreeMap::new();
        for instrument in Instrument::ALL {
            let price = starting
                .get(&instrument)
                .copied()
                .ok_or(PriceDataError::MissingInstrument(instrument))?;
            series.insert(instrument, PriceSeries::with_start(price, window));
        }
        Ok(MarketHistory {
            series,
            current_day: 0,
            synthetic: true,
        })
    }

    /// Preloaded market over historical close tables, one per instrument.
    /// Advancing past the end of a table clamps at its last close.
    pub fn from_close_tables(
        tables: &BTreeMap<Instrument, Vec<PriceRow>>,
    ) -> Result<Self, PriceDataError> {
        let mut series = BTreeMap::new();
        for instrument in Instrument::ALL {
            let rows = tables
                .get(&instrument)
                .ok_or(PriceDataError::MissingInstrument(instrument))?;
            let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
            series.insert(instrument, PriceSeries::from_closes(closes)?);
        }
        Ok(MarketHistory {
            series,
            current_day: 0,
            synthetic: false,
        })
    }

    /// Day of the last processed sample.
    pub fn current_day(&self) -> u64 {
        self.current_day
    }

    /// Advance one day. Synthetic markets step every series exactly once, in
    /// stable instrument order; preloaded markets only move the day cursor.
    pub fn advance_day(&mut self, walk: &RandomWalkConfig, rng: &mut impl Rng) {
        self.current_day += 1;
        if self.synthetic {
            for series in self.series.values_mut() {
                series.advance(walk, rng);
            }
        }
    }

    /// Price of `instrument` on `day`, clamped to the retained window.
    pub fn price_on(&self, instrument: Instrument, day: u64) -> f64 {
        self.series
            .get(&instrument)
            .map(|s| s.price_on(day))
            .unwrap_or(0.0)
    }

    /// Sum of all member prices on `day`: the market aggregate the index
    /// instrument tracks.
    pub fn market_index_on(&self, day: u64) -> f64 {
        self.series.values().map(|s| s.price_on(day)).sum()
    }

    /// Latest market aggregate.
    pub fn market_index_latest(&self) -> f64 {
        self.market_index_on(self.current_day)
    }

    /// Per-day values for the chart: the selected instrument's retained
    /// window, or the market aggregate across the common window when nothing
    /// is selected.
    pub fn chart_series(&self, selection: Option<Instrument>) -> Vec<f64> {
        match selection {
            Some(instrument) => self
                .series
                .get(&instrument)
                .map(|s| s.samples().collect())
                .unwrap_or_default(),
            None => {
                let first = self
                    .series
                    .values()
                    .map(|s| s.first_day())
                    .max()
                    .unwrap_or(0);
                (first..=self.current_day)
                    .map(|day| self.market_index_on(day))
                    .collect()
            }
        }
    }

    /// The retained series for one instrument.
    pub fn series(&self, instrument: Instrument) -> Option<&PriceSeries> {
        self.series.get(&instrument)
    }
}

impl PriceSource for MarketHistory {
    fn latest_price(&self, instrument: Instrument) -> f64 {
        self.price_on(instrument, self.current_day)
    }
}
