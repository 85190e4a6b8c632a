//! The shared actor ledger.
//!
//! One [`Account`] per economic actor (the player and each scripted trader).
//! Every operation verifies its preconditions first and either applies the
//! whole effect or leaves the account untouched; nothing in here panics on
//! bad input.

use crate::{Instrument, Portfolio, PriceSource, Trade, TradeDirection, DUST};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a buy or sell was refused. Travels in the event stream so the
/// presentation layer can show the failure cue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeRejection {
    /// Amount or price was zero, negative, or not finite.
    #[error("order amount or price is not a positive finite number")]
    InvalidAmount,
    /// The order cash exceeds the account balance.
    #[error("order cash exceeds the account balance")]
    InsufficientFunds,
    /// The order quantity exceeds the held amount.
    #[error("order quantity exceeds the held amount")]
    InsufficientHoldings,
    /// A trade was requested with no instrument selected.
    #[error("no instrument is selected")]
    NoInstrumentSelected,
}

/// Cash, holdings, and trade history for one economic actor.
///
/// Unit convention: buys are cash-denominated (spend `cash`, receive
/// `cash / price` units), sells are quantity-denominated (give `quantity`
/// units, receive `quantity * price` in cash).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    balance: f64,
    portfolio: Portfolio,
    trades: Vec<Trade>,
    total_invested: f64,
}

impl Account {
    /// Open an account holding `starting_balance` in cash and nothing else.
    pub fn new(starting_balance: f64) -> Self {
        Account {
            balance: starting_balance.max(0.0),
            portfolio: Portfolio::default(),
            trades: Vec::new(),
            total_invested: 0.0,
        }
    }

    /// Cash on hand.
    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Current holdings.
    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// Every executed trade, oldest first.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Cash spent on buys and not yet recouped by sells. Never negative.
    pub fn total_invested(&self) -> f64 {
        self.total_invested
    }

    /// Spend `cash` on `instrument` at `price`, crediting `cash / price`
    /// units.
    ///
    /// Rejects, with no state change, when the cash or price is not a
    /// positive finite number or when `cash` exceeds the balance.
    pub fn buy_with_cash(
        &mut self,
        instrument: Instrument,
        cash: f64,
        price: f64,
        day: u64,
    ) -> Result<Trade, TradeRejection> {
        if !cash.is_finite() || cash <= 0.0 || !price.is_finite() || price <= 0.0 {
            return Err(TradeRejection::InvalidAmount);
        }
        if cash > self.balance + DUST {
            return Err(TradeRejection::InsufficientFunds);
        }
        let trade = Trade {
            instrument,
            direction: TradeDirection::Buy,
            price,
            quantity: cash / price,
            day,
        };
        // max(0.0) absorbs float dust when the whole balance is spent.
        self.balance = (self.balance - cash).max(0.0);
        self.total_invested += cash;
        self.portfolio.add(instrument, trade.quantity);
        self.trades.push(trade.clone());
        Ok(trade)
    }

    /// Sell `quantity` units of `instrument` at `price`, crediting
    /// `quantity * price` in cash.
    ///
    /// Rejects, with no state change, when the quantity or price is not a
    /// positive finite number or when `quantity` exceeds the held amount.
    /// A hair of float dust above the holding is clamped, so "sell the whole
    /// position" works after a cash-denominated buy.
    pub fn sell_units(
        &mut self,
        instrument: Instrument,
        quantity: f64,
        price: f64,
        day: u64,
    ) -> Result<Trade, TradeRejection> {
        if !quantity.is_finite() || quantity <= 0.0 || !price.is_finite() || price <= 0.0 {
            return Err(TradeRejection::InvalidAmount);
        }
        let held = self.portfolio.holding(instrument);
        if quantity > held + DUST {
            return Err(TradeRejection::InsufficientHoldings);
        }
        let trade = Trade {
            instrument,
            direction: TradeDirection::Sell,
            price,
            quantity: quantity.min(held),
            day,
        };
        self.balance += trade.cash_value();
        self.total_invested = (self.total_invested - trade.cash_value()).max(0.0);
        self.portfolio.remove(instrument, trade.quantity);
        self.trades.push(trade.clone());
        Ok(trade)
    }

    /// Credit `amount` without recording a trade (salary and pickups).
    /// Non-positive or non-finite amounts are ignored.
    pub fn deposit(&mut self, amount: f64) {
        if amount.is_finite() && amount > 0.0 {
            self.balance += amount;
        }
    }

    /// Mark-to-market value of the holdings alone.
    pub fn portfolio_value<P: PriceSource>(&self, prices: &P) -> f64 {
        self.portfolio.value(prices)
    }

    /// Cash plus mark-to-market holdings.
    pub fn net_worth<P: PriceSource>(&self, prices: &P) -> f64 {
        self.balance + self.portfolio.value(prices)
    }

    /// Unrealized gain on the open position, rounded to whole dollars for
    /// display.
    pub fn profit<P: PriceSource>(&self, prices: &P) -> f64 {
        (self.portfolio.value(prices) - self.total_invested).round()
    }
}
