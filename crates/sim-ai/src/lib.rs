#![deny(warnings)]

//! Scripted competitors: the monkey and the rock.
//!
//! Both run over the same [`Account`] ledger the player uses. The rock is a
//! deterministic index accumulator; the monkey trades at random from its own
//! seeded stream. Each is updated exactly once per simulated day by the
//! session's day loop.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sim_core::{
    Account, ActorId, EventBus, GameEvent, Instrument, PriceSource, RandomTraderConfig,
};
use sim_econ::MarketHistory;
use tracing::debug;

/// What a scripted trader does with its day.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraderPolicy {
    /// Buy one unit of `target` for as long as the balance covers the
    /// price. Never sells.
    IndexAccumulator {
        /// The instrument to accumulate, normally the market aggregate.
        target: Instrument,
    },
    /// Sometimes buy something affordable, sometimes sell something held,
    /// mostly do nothing.
    Randomized(RandomTraderConfig),
}

/// An automated market participant with its own ledger and RNG stream.
pub struct ScriptedTrader {
    actor: ActorId,
    account: Account,
    policy: TraderPolicy,
    rng: ChaCha8Rng,
}

impl ScriptedTrader {
    /// The rock: accumulates `target` whenever it can afford a unit.
    pub fn index_accumulator(
        actor: ActorId,
        starting_balance: f64,
        target: Instrument,
        seed: u64,
    ) -> Self {
        ScriptedTrader {
            actor,
            account: Account::new(starting_balance),
            policy: TraderPolicy::IndexAccumulator { target },
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// The monkey: trades at random per `config`, reproducibly from `seed`.
    pub fn randomized(
        actor: ActorId,
        starting_balance: f64,
        config: RandomTraderConfig,
        seed: u64,
    ) -> Self {
        ScriptedTrader {
            actor,
            account: Account::new(starting_balance),
            policy: TraderPolicy::Randomized(config),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Which scoreboard entry this trader fills.
    pub fn actor(&self) -> ActorId {
        self.actor
    }

    /// The trader's ledger.
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// The policy this trader runs.
    pub fn policy(&self) -> &TraderPolicy {
        &self.policy
    }

    /// Credit salary or other windfalls.
    pub fn deposit(&mut self, amount: f64) {
        self.account.deposit(amount);
    }

    /// Cash plus mark-to-market holdings at the latest prices.
    pub fn net_worth(&self, market: &MarketHistory) -> f64 {
        self.account.net_worth(market)
    }

    /// Run one day of the policy. Executed trades are pushed as
    /// [`GameEvent::TradeExecuted`]; a day with nothing to do changes
    /// nothing and emits nothing.
    pub fn update(&mut self, market: &MarketHistory, events: &mut EventBus) {
        match self.policy {
            TraderPolicy::IndexAccumulator { target } => self.accumulate(target, market, events),
            TraderPolicy::Randomized(config) => self.trade_at_random(config, market, events),
        }
    }

    fn accumulate(&mut self, target: Instrument, market: &MarketHistory, events: &mut EventBus) {
        let day = market.current_day();
        let price = market.latest_price(target);
        if price <= 0.0 {
            return;
        }
        while self.account.balance() >= price {
            match self.account.buy_with_cash(target, price, price, day) {
                Ok(trade) => {
                    debug!(actor = ?self.actor, %target, price, day, "accumulated one unit");
                    events.push(GameEvent::TradeExecuted {
                        actor: self.actor,
                        trade,
                    });
                }
                Err(_) => break,
            }
        }
    }

    fn trade_at_random(
        &mut self,
        config: RandomTraderConfig,
        market: &MarketHistory,
        events: &mut EventBus,
    ) {
        if !self.rng.gen_bool(config.act_probability) {
            return;
        }
        let day = market.current_day();
        if self.rng.gen_bool(config.buy_probability) {
            let affordable: Vec<Instrument> = Instrument::ALL
                .into_iter()
                .filter(|i| {
                    let price = market.latest_price(*i);
                    price > 0.0 && price <= self.account.balance()
                })
                .collect();
            let Some(&pick) = affordable.choose(&mut self.rng) else {
                return;
            };
            let price = market.latest_price(pick);
            let max_units = (self.account.balance() / price).floor() as u64;
            if max_units == 0 {
                return;
            }
            let units = self.rng.gen_range(1..=max_units);
            // min() guards the rare case where units * price rounds a hair
            // above the balance.
            let cash = (units as f64 * price).min(self.account.balance());
            if let Ok(trade) = self.account.buy_with_cash(pick, cash, price, day) {
                debug!(actor = ?self.actor, %pick, units, price, day, "random buy");
                events.push(GameEvent::TradeExecuted {
                    actor: self.actor,
                    trade,
                });
            }
        } else {
            let held: Vec<(Instrument, u64)> = self
                .account
                .portfolio()
                .iter()
                .filter_map(|(instrument, quantity)| {
                    let whole = quantity.floor() as u64;
                    (whole >= 1).then_some((instrument, whole))
                })
                .collect();
            let Some(&(pick, whole)) = held.choose(&mut self.rng) else {
                return;
            };
            let price = market.latest_price(pick);
            if price <= 0.0 {
                return;
            }
            let units = self.rng.gen_range(1..=whole);
            if let Ok(trade) = self.account.sell_units(pick, units as f64, price, day) {
                debug!(actor = ?self.actor, %pick, units, price, day, "random sell");
                events.push(GameEvent::TradeExecuted {
                    actor: self.actor,
                    trade,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn starting_prices() -> BTreeMap<Instrument, f64> {
        [
            (Instrument::Apple, 100.0),
            (Instrument::Potato, 25.0),
            (Instrument::Fish, 40.0),
            (Instrument::Snowball, 10.0),
            (Instrument::World, 250.0),
        ]
        .into_iter()
        .collect()
    }

    fn market() -> MarketHistory {
        MarketHistory::from_starting_prices(&starting_prices(), 100).unwrap()
    }

    #[test]
    fn the_rock_buys_while_it_can_afford_the_index() {
        let market = market();
        let mut events = EventBus::default();
        let mut rock =
            ScriptedTrader::index_accumulator(ActorId::Rock, 1_000.0, Instrument::World, 1);
        rock.update(&market, &mut events);
        // 1000 / 250: four whole units, then broke.
        assert_eq!(rock.account().trades().len(), 4);
        assert_eq!(rock.account().balance(), 0.0);
        assert_eq!(rock.account().portfolio().holding(Instrument::World), 4.0);
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn the_rock_waits_for_salary_and_resumes() {
        let market = market();
        let mut events = EventBus::default();
        let mut rock =
            ScriptedTrader::index_accumulator(ActorId::Rock, 100.0, Instrument::World, 1);
        rock.update(&market, &mut events);
        assert!(rock.account().trades().is_empty());

        rock.deposit(100.0);
        rock.update(&market, &mut events);
        assert!(rock.account().trades().is_empty());

        rock.deposit(100.0);
        rock.update(&market, &mut events);
        assert_eq!(rock.account().trades().len(), 1);
        assert_eq!(rock.account().balance(), 50.0);
    }

    #[test]
    fn a_broke_monkey_with_nothing_to_sell_is_a_permanent_noop() {
        let market = market();
        let mut events = EventBus::default();
        let mut monkey = ScriptedTrader::randomized(
            ActorId::Monkey,
            0.0,
            RandomTraderConfig {
                act_probability: 1.0,
                buy_probability: 0.5,
            },
            99,
        );
        for _ in 0..500 {
            monkey.update(&market, &mut events);
        }
        assert!(monkey.account().trades().is_empty());
        assert_eq!(monkey.account().balance(), 0.0);
        assert!(monkey.account().portfolio().is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn an_eager_monkey_buys_whole_units_it_can_afford() {
        let market = market();
        let mut events = EventBus::default();
        let mut monkey = ScriptedTrader::randomized(
            ActorId::Monkey,
            1_000.0,
            RandomTraderConfig {
                act_probability: 1.0,
                buy_probability: 1.0,
            },
            7,
        );
        monkey.update(&market, &mut events);
        assert_eq!(monkey.account().trades().len(), 1);
        let trade = &monkey.account().trades()[0];
        assert!(trade.cash_value() <= 1_000.0);
        assert!(trade.quantity >= 1.0 - 1e-9);
        assert!(monkey.account().balance() >= 0.0);
    }

    #[test]
    fn a_sleepy_monkey_never_trades() {
        let market = market();
        let mut events = EventBus::default();
        let mut monkey = ScriptedTrader::randomized(
            ActorId::Monkey,
            1_000.0,
            RandomTraderConfig {
                act_probability: 0.0,
                buy_probability: 0.5,
            },
            7,
        );
        for _ in 0..200 {
            monkey.update(&market, &mut events);
        }
        assert!(monkey.account().trades().is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn same_seed_same_monkey() {
        let market = market();
        let config = RandomTraderConfig::default();
        let mut events = EventBus::default();
        let mut a = ScriptedTrader::randomized(ActorId::Monkey, 1_000.0, config, 42);
        let mut b = ScriptedTrader::randomized(ActorId::Monkey, 1_000.0, config, 42);
        for _ in 0..300 {
            a.update(&market, &mut events);
            b.update(&market, &mut events);
        }
        assert_eq!(a.account().trades(), b.account().trades());
        assert_eq!(a.account().balance(), b.account().balance());
    }

    proptest! {
        #[test]
        fn the_monkey_never_corrupts_its_ledger(seed in 0u64..5_000) {
            let market = market();
            let mut events = EventBus::default();
            let mut monkey = ScriptedTrader::randomized(
                ActorId::Monkey,
                1_000.0,
                RandomTraderConfig { act_probability: 0.8, buy_probability: 0.5 },
                seed,
            );
            for _ in 0..100 {
                monkey.update(&market, &mut events);
                prop_assert!(monkey.account().balance() >= 0.0);
                for (_, quantity) in monkey.account().portfolio().iter() {
                    prop_assert!(quantity > 0.0);
                }
            }
            prop_assert_eq!(monkey.account().trades().len(), events.len());
        }
    }
}
