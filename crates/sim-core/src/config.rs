//! Game configuration and validation.
//!
//! [`GameConfig`] is plain serde data so the binary can load it from JSON;
//! [`validate_config`] is the single gate every session constructor runs
//! before touching the rest of the engine.

use crate::Instrument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Parameters of the per-day random-walk price step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomWalkConfig {
    /// Threshold for the uniform draw: draws below it move the price down,
    /// above it up. 0.45 gives the walk a gentle upward bias.
    pub drift: f64,
    /// Dollars of movement per unit of draw.
    pub step_scale: f64,
    /// Prices never fall below this.
    pub floor: f64,
}

impl Default for RandomWalkConfig {
    fn default() -> Self {
        RandomWalkConfig {
            drift: 0.45,
            step_scale: 10.0,
            floor: 1.0,
        }
    }
}

/// Behavioural knobs for the randomized ("monkey") trader.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomTraderConfig {
    /// Chance per day that the trader does anything at all.
    pub act_probability: f64,
    /// Chance that an acting day buys rather than sells.
    pub buy_probability: f64,
}

impl Default for RandomTraderConfig {
    fn default() -> Self {
        RandomTraderConfig {
            act_probability: 0.2,
            buy_probability: 0.5,
        }
    }
}

/// Complete game parameters.
///
/// `Default` reproduces the classic run: one second per day, sixty days per
/// year, ages twenty through eighty, a salary every twenty days.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Master seed; every subsystem RNG stream derives from it.
    pub rng_seed: u64,
    /// Player starting cash in dollars.
    pub starting_balance: f64,
    /// Starting cash for each scripted trader.
    pub trader_starting_balance: f64,
    /// Real seconds per simulated day.
    pub seconds_per_day: f64,
    /// Simulated days per simulated year.
    pub days_per_year: u64,
    /// The player's age when the game opens.
    pub starting_year: u32,
    /// The age at which the game ends.
    pub final_year: u32,
    /// Hard stop in days, reached together with `final_year` under the
    /// default parameters.
    pub max_game_days: u64,
    /// Salary credited to every actor on each pay day.
    pub salary_amount: f64,
    /// Days between pay days.
    pub salary_period_days: u64,
    /// Dollars added or removed per order-ticket step.
    pub order_step: f64,
    /// Price samples retained per instrument.
    pub price_window: usize,
    /// Random-walk parameters.
    pub walk: RandomWalkConfig,
    /// Randomized-trader parameters.
    pub monkey: RandomTraderConfig,
    /// Opening price per instrument; must cover the whole set.
    pub starting_prices: BTreeMap<Instrument, f64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        let starting_prices = [
            (Instrument::Apple, 100.0),
            (Instrument::Potato, 25.0),
            (Instrument::Fish, 40.0),
            (Instrument::Snowball, 10.0),
            (Instrument::World, 250.0),
        ]
        .into_iter()
        .collect();
        GameConfig {
            rng_seed: 42,
            starting_balance: 1_000.0,
            trader_starting_balance: 1_000.0,
            seconds_per_day: 1.0,
            days_per_year: 60,
            starting_year: 20,
            final_year: 80,
            max_game_days: 3_600,
            salary_amount: 100.0,
            salary_period_days: 20,
            order_step: 100.0,
            price_window: 100,
            walk: RandomWalkConfig::default(),
            monkey: RandomTraderConfig::default(),
            starting_prices,
        }
    }
}

impl GameConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<GameConfig, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Validation errors for configuration invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite.
    #[error("non-finite numeric value encountered")]
    NonFinite,
    /// Monetary amounts must be non-negative.
    #[error("negative monetary value is invalid")]
    NegativeMoney,
    /// Tick length must be strictly positive.
    #[error("seconds per day must be > 0")]
    NonPositiveTick,
    /// Day-based periods must be at least one day.
    #[error("day and year periods must be >= 1")]
    EmptyPeriod,
    /// The game must span at least one year.
    #[error("final year {final_year} must be after starting year {starting_year}")]
    YearRangeEmpty {
        /// Configured opening year.
        starting_year: u32,
        /// Configured closing year.
        final_year: u32,
    },
    /// Probabilities live in [0, 1].
    #[error("probability {0} is outside [0, 1]")]
    InvalidProbability(f64),
    /// The order ticket must move by a positive amount.
    #[error("order step must be > 0")]
    NonPositiveOrderStep,
    /// The price window must hold at least one sample.
    #[error("price window must hold at least one sample")]
    EmptyPriceWindow,
    /// Every instrument needs an opening price.
    #[error("missing starting price for {0}")]
    MissingStartingPrice(Instrument),
    /// Opening prices must be strictly positive.
    #[error("starting price for {0} must be > 0")]
    NonPositivePrice(Instrument),
}

/// Validate a game configuration, including instrument coverage.
pub fn validate_config(config: &GameConfig) -> Result<(), ValidationError> {
    for amount in [
        config.starting_balance,
        config.trader_starting_balance,
        config.salary_amount,
    ] {
        if !amount.is_finite() {
            return Err(ValidationError::NonFinite);
        }
        if amount < 0.0 {
            return Err(ValidationError::NegativeMoney);
        }
    }
    if !config.seconds_per_day.is_finite() || config.seconds_per_day <= 0.0 {
        return Err(ValidationError::NonPositiveTick);
    }
    if config.days_per_year == 0 || config.salary_period_days == 0 || config.max_game_days == 0 {
        return Err(ValidationError::EmptyPeriod);
    }
    if config.final_year <= config.starting_year {
        return Err(ValidationError::YearRangeEmpty {
            starting_year: config.starting_year,
            final_year: config.final_year,
        });
    }
    for p in [
        config.monkey.act_probability,
        config.monkey.buy_probability,
        config.walk.drift,
    ] {
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(ValidationError::InvalidProbability(p));
        }
    }
    if !config.walk.step_scale.is_finite()
        || config.walk.step_scale <= 0.0
        || !config.walk.floor.is_finite()
        || config.walk.floor <= 0.0
    {
        return Err(ValidationError::NonFinite);
    }
    if !config.order_step.is_finite() || config.order_step <= 0.0 {
        return Err(ValidationError::NonPositiveOrderStep);
    }
    if config.price_window == 0 {
        return Err(ValidationError::EmptyPriceWindow);
    }
    for instrument in Instrument::ALL {
        match config.starting_prices.get(&instrument) {
            None => return Err(ValidationError::MissingStartingPrice(instrument)),
            Some(price) if !price.is_finite() || *price <= 0.0 => {
                return Err(ValidationError::NonPositivePrice(instrument))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults_validate() {
        let config = GameConfig::default();
        assert_eq!(validate_config(&config), Ok(()));
        assert_eq!(config.final_year - config.starting_year, 60);
        assert_eq!(
            config.max_game_days,
            (config.final_year - config.starting_year) as u64 * config.days_per_year
        );
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config = GameConfig::from_json_str(r#"{ "rng_seed": 7, "salary_amount": 250.0 }"#)
            .unwrap();
        assert_eq!(config.rng_seed, 7);
        assert_eq!(config.salary_amount, 250.0);
        assert_eq!(config.days_per_year, 60);
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn config_json_roundtrip() {
        let config = GameConfig::default();
        let s = serde_json::to_string_pretty(&config).unwrap();
        let back = GameConfig::from_json_str(&s).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn missing_starting_price_is_rejected() {
        let mut config = GameConfig::default();
        config.starting_prices.remove(&Instrument::Snowball);
        assert_eq!(
            validate_config(&config),
            Err(ValidationError::MissingStartingPrice(Instrument::Snowball))
        );
    }

    #[test]
    fn bad_knobs_are_rejected() {
        let mut config = GameConfig::default();
        config.seconds_per_day = 0.0;
        assert_eq!(validate_config(&config), Err(ValidationError::NonPositiveTick));

        let mut config = GameConfig::default();
        config.final_year = config.starting_year;
        assert!(matches!(
            validate_config(&config),
            Err(ValidationError::YearRangeEmpty { .. })
        ));

        let mut config = GameConfig::default();
        config.monkey.act_probability = 1.5;
        assert_eq!(
            validate_config(&config),
            Err(ValidationError::InvalidProbability(1.5))
        );

        let mut config = GameConfig::default();
        config.starting_balance = -1.0;
        assert_eq!(validate_config(&config), Err(ValidationError::NegativeMoney));
    }

    proptest! {
        #[test]
        fn positive_tick_lengths_validate(tick in 0.001f64..120.0) {
            let mut config = GameConfig::default();
            config.seconds_per_day = tick;
            prop_assert!(validate_config(&config).is_ok());
        }

        #[test]
        fn unit_interval_probabilities_validate(act in 0.0f64..=1.0, buy in 0.0f64..=1.0) {
            let mut config = GameConfig::default();
            config.monkey.act_probability = act;
            config.monkey.buy_probability = buy;
            prop_assert!(validate_config(&config).is_ok());
        }
    }
}
