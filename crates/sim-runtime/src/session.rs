//! The assembled game.
//!
//! [`GameSession`] owns every subsystem and is the only type a frontend
//! needs: feed it wall-clock deltas and player commands, drain the event
//! queue, redraw. All randomness flows from the configured master seed
//! through per-subsystem streams, so two sessions with the same
//! configuration and the same command timeline produce identical runs.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_ai::ScriptedTrader;
use sim_core::{
    validate_config, Account, ActorId, EventBus, GameConfig, GameEvent, Instrument, PriceSource,
    Scoreboard, ScriptId, TradeRejection, ValidationError,
};
use sim_econ::{MarketHistory, PriceDataError, PriceRow};
use thiserror::Error;
use tracing::{debug, info};

use crate::clock::{ClockState, GameClock};
use crate::narrative::{scripts, NarrativeAction, NarrativeMessage, NarrativeSequencer};

/// Errors raised while assembling a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),
    /// Price data was missing or malformed.
    #[error("price data: {0}")]
    PriceData(#[from] PriceDataError),
}

/// Mix a stream label into the master seed so each subsystem draws from its
/// own independent stream. SplitMix64 finisher keeps the streams apart even
/// for adjacent seeds.
fn stream_seed(seed: u64, label: &str) -> u64 {
    let mut h = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
    for b in label.bytes() {
        h = h.wrapping_add(u64::from(b)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    }
    h = (h ^ (h >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    h ^ (h >> 31)
}

/// One full run of the game.
pub struct GameSession {
    config: GameConfig,
    clock: GameClock,
    market: MarketHistory,
    /// Opening market state, kept so a restart replays from the same prices.
    initial_market: MarketHistory,
    market_rng: ChaCha8Rng,
    ledger: Account,
    monkey: ScriptedTrader,
    rock: ScriptedTrader,
    narrative: NarrativeSequencer,
    events: EventBus,
    selected: Option<Instrument>,
    order_cash: f64,
    trading_ui_revealed: bool,
    scoreboard_revealed: bool,
}

impl GameSession {
    /// Session over a synthetic random-walk market opened at the configured
    /// starting prices.
    pub fn new(config: GameConfig) -> Result<Self, SessionError> {
        validate_config(&config)?;
        let market =
            MarketHistory::from_starting_prices(&config.starting_prices, config.price_window)?;
        Ok(Self::assemble(config, market))
    }

    /// Session over preloaded historical close tables, one per instrument.
    pub fn with_price_tables(
        config: GameConfig,
        tables: &BTreeMap<Instrument, Vec<PriceRow>>,
    ) -> Result<Self, SessionError> {
        validate_config(&config)?;
        let market = MarketHistory::from_close_tables(tables)?;
        Ok(Self::assemble(config, market))
    }

    fn assemble(config: GameConfig, market: MarketHistory) -> Self {
        let seed = config.rng_seed;
        let monkey = ScriptedTrader::randomized(
            ActorId::Monkey,
            config.trader_starting_balance,
            config.monkey,
            stream_seed(seed, "monkey"),
        );
        let rock = ScriptedTrader::index_accumulator(
            ActorId::Rock,
            config.trader_starting_balance,
            Instrument::MARKET_INDEX,
            stream_seed(seed, "rock"),
        );
        let mut events = EventBus::default();
        events.push(GameEvent::GameStarted);
        events.push(GameEvent::ScriptStarted {
            script: ScriptId::Intro,
        });
        info!(seed, "session assembled");
        GameSession {
            clock: GameClock::new(&config),
            initial_market: market.clone(),
            market,
            market_rng: ChaCha8Rng::seed_from_u64(stream_seed(seed, "market")),
            ledger: Account::new(config.starting_balance),
            monkey,
            rock,
            narrative: NarrativeSequencer::new(ScriptId::Intro, scripts::intro()),
            events,
            selected: None,
            order_cash: config.order_step,
            trading_ui_revealed: false,
            scoreboard_revealed: false,
            config,
        }
    }

    /// Advance the simulation by `delta` wall-clock seconds.
    ///
    /// The narrative runs first so a message acknowledged last frame can
    /// release the clock this frame. Each day crossed by the clock then plays
    /// out in full: salary, prices, traders, year roll, end check.
    pub fn update(&mut self, delta: f64) {
        let actions = self.narrative.update(delta, &mut self.events);
        self.apply_actions(actions);

        let pending = self.clock.accumulate(delta);
        for _ in 0..pending {
            let day = self.clock.begin_day();
            self.events.push(GameEvent::DayAdvanced { day });
            if day % self.config.salary_period_days == 0 {
                self.pay_salaries(day);
            }
            self.market
                .advance_day(&self.config.walk, &mut self.market_rng);
            debug_assert_eq!(day, self.market.current_day());
            self.events.push(GameEvent::PricesUpdated { day });
            self.monkey.update(&self.market, &mut self.events);
            self.rock.update(&self.market, &mut self.events);
            let outcome = self.clock.end_day();
            if let Some(year) = outcome.year_advanced {
                self.events.push(GameEvent::YearAdvanced { year });
            }
            if outcome.finished {
                self.finish(day);
                break;
            }
        }
    }

    /// Select `instrument` for the chart and the order ticket.
    pub fn select_instrument(&mut self, instrument: Instrument) {
        if self.selected != Some(instrument) {
            self.selected = Some(instrument);
            self.events.push(GameEvent::InstrumentSelected {
                instrument: Some(instrument),
            });
        }
    }

    /// Drop the selection; the chart falls back to the market aggregate.
    pub fn clear_selection(&mut self) {
        if self.selected.is_some() {
            self.selected = None;
            self.events
                .push(GameEvent::InstrumentSelected { instrument: None });
        }
    }

    /// Raise the order ticket by one step.
    pub fn increment_order(&mut self) {
        self.order_cash += self.config.order_step;
        self.events.push(GameEvent::OrderCashChanged {
            cash: self.order_cash,
        });
    }

    /// Lower the order ticket by one step, stopping at zero.
    pub fn decrement_order(&mut self) {
        let next = (self.order_cash - self.config.order_step).max(0.0);
        if next != self.order_cash {
            self.order_cash = next;
            self.events.push(GameEvent::OrderCashChanged {
                cash: self.order_cash,
            });
        }
    }

    /// Spend the order ticket on the selected instrument at the latest price.
    ///
    /// Returns whether the trade went through. A refused order changes
    /// nothing; the reason goes out as [`GameEvent::TradeRejected`].
    pub fn buy(&mut self) -> bool {
        let Some(instrument) = self.selected else {
            self.reject(None, TradeRejection::NoInstrumentSelected);
            return false;
        };
        let price = self.market.latest_price(instrument);
        let day = self.market.current_day();
        match self
            .ledger
            .buy_with_cash(instrument, self.order_cash, price, day)
        {
            Ok(trade) => {
                debug!(%instrument, cash = trade.cash_value(), price, "player buy");
                self.events.push(GameEvent::TradeExecuted {
                    actor: ActorId::Player,
                    trade,
                });
                true
            }
            Err(reason) => {
                self.reject(Some(instrument), reason);
                false
            }
        }
    }

    /// Sell order-ticket dollars' worth of the selected instrument at the
    /// latest price. Same contract as [`GameSession::buy`].
    pub fn sell(&mut self) -> bool {
        let Some(instrument) = self.selected else {
            self.reject(None, TradeRejection::NoInstrumentSelected);
            return false;
        };
        let price = self.market.latest_price(instrument);
        let day = self.market.current_day();
        let quantity = if price > 0.0 {
            self.order_cash / price
        } else {
            0.0
        };
        match self.ledger.sell_units(instrument, quantity, price, day) {
            Ok(trade) => {
                debug!(%instrument, cash = trade.cash_value(), price, "player sell");
                self.events.push(GameEvent::TradeExecuted {
                    actor: ActorId::Player,
                    trade,
                });
                true
            }
            Err(reason) => {
                self.reject(Some(instrument), reason);
                false
            }
        }
    }

    /// Dismiss the narrative message currently on screen.
    pub fn acknowledge_message(&mut self) {
        let actions = self.narrative.acknowledge(&mut self.events);
        self.apply_actions(actions);
    }

    /// Credit extra cash to the player outside the salary schedule.
    pub fn add_to_balance(&mut self, amount: f64) {
        self.ledger.deposit(amount);
    }

    /// Throw the run away and start over: same configuration, same opening
    /// prices, fresh event queue.
    pub fn restart(&mut self) {
        info!("session restarted");
        *self = Self::assemble(self.config.clone(), self.initial_market.clone());
    }

    fn pay_salaries(&mut self, day: u64) {
        let amount = self.config.salary_amount;
        if amount <= 0.0 {
            return;
        }
        debug!(day, amount, "pay day");
        self.ledger.deposit(amount);
        self.events.push(GameEvent::SalaryPaid {
            actor: ActorId::Player,
            amount,
        });
        self.monkey.deposit(amount);
        self.events.push(GameEvent::SalaryPaid {
            actor: ActorId::Monkey,
            amount,
        });
        self.rock.deposit(amount);
        self.events.push(GameEvent::SalaryPaid {
            actor: ActorId::Rock,
            amount,
        });
    }

    fn finish(&mut self, day: u64) {
        let scores = self.scoreboard();
        info!(
            day,
            player = scores.player,
            monkey = scores.monkey,
            rock = scores.rock,
            "game finished"
        );
        self.events.push(GameEvent::GameFinished { day, scores });
        self.narrative
            .switch_script(ScriptId::Ending, scripts::ending(&scores), &mut self.events);
    }

    fn apply_actions(&mut self, actions: Vec<NarrativeAction>) {
        for action in actions {
            match action {
                NarrativeAction::RevealTradingUi => {
                    if !self.trading_ui_revealed {
                        self.trading_ui_revealed = true;
                        self.events.push(GameEvent::TradingUiRevealed);
                    }
                }
                NarrativeAction::StartClock => {
                    if !self.clock.is_running() && !self.clock.is_finished() {
                        self.clock.start();
                        self.events.push(GameEvent::ClockStarted);
                    }
                }
                NarrativeAction::RevealScoreboard => {
                    if !self.scoreboard_revealed {
                        self.scoreboard_revealed = true;
                        self.events.push(GameEvent::ScoreboardRevealed);
                    }
                }
                NarrativeAction::SwitchScript(script) => {
                    let scores = self.scoreboard();
                    self.narrative.switch_script(
                        script,
                        scripts::for_id(script, &scores),
                        &mut self.events,
                    );
                }
            }
        }
    }

    fn reject(&mut self, instrument: Option<Instrument>, reason: TradeRejection) {
        debug!(?instrument, %reason, "order rejected");
        self.events.push(GameEvent::TradeRejected {
            actor: ActorId::Player,
            instrument,
            reason,
        });
    }

    /// Remove and return every pending event, oldest first.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    /// The active configuration.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Player cash.
    pub fn balance(&self) -> f64 {
        self.ledger.balance()
    }

    /// Player cash plus holdings at the latest prices.
    pub fn net_worth(&self) -> f64 {
        self.ledger.net_worth(&self.market)
    }

    /// Unrealized gain on the player's open position, in whole dollars.
    pub fn profit(&self) -> f64 {
        self.ledger.profit(&self.market)
    }

    /// Cash currently sunk into the player's open position.
    pub fn total_invested(&self) -> f64 {
        self.ledger.total_invested()
    }

    /// Units of `instrument` the player holds.
    pub fn holding(&self, instrument: Instrument) -> f64 {
        self.ledger.portfolio().holding(instrument)
    }

    /// The player's full ledger.
    pub fn ledger(&self) -> &Account {
        &self.ledger
    }

    /// The randomized trader's ledger.
    pub fn monkey_account(&self) -> &Account {
        self.monkey.account()
    }

    /// The index accumulator's ledger.
    pub fn rock_account(&self) -> &Account {
        self.rock.account()
    }

    /// Latest price of one instrument.
    pub fn latest_price(&self, instrument: Instrument) -> f64 {
        self.market.latest_price(instrument)
    }

    /// The full market history.
    pub fn market(&self) -> &MarketHistory {
        &self.market
    }

    /// Chart values for the current selection: the selected instrument's
    /// window, or the market aggregate when nothing is selected.
    pub fn chart_series(&self) -> Vec<f64> {
        self.market.chart_series(self.selected)
    }

    /// The selected instrument, if any.
    pub fn selected_instrument(&self) -> Option<Instrument> {
        self.selected
    }

    /// Dollars on the order ticket.
    pub fn order_cash(&self) -> f64 {
        self.order_cash
    }

    /// Snapshot of the clock.
    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    /// Whether the clock is counting days.
    pub fn is_clock_running(&self) -> bool {
        self.clock.is_running()
    }

    /// Whether the run has reached its end condition.
    pub fn is_finished(&self) -> bool {
        self.clock.is_finished()
    }

    /// Whether the narrative has released the trading controls.
    pub fn is_trading_ui_revealed(&self) -> bool {
        self.trading_ui_revealed
    }

    /// Whether the narrative has asked for the final scoreboard.
    pub fn is_scoreboard_revealed(&self) -> bool {
        self.scoreboard_revealed
    }

    /// The narrative message waiting on screen, with its index.
    pub fn current_message(&self) -> Option<(usize, &NarrativeMessage)> {
        self.narrative.current()
    }

    /// The loaded narrative script.
    pub fn script(&self) -> ScriptId {
        self.narrative.script()
    }

    /// Net worth of every actor at the latest prices.
    pub fn scoreboard(&self) -> Scoreboard {
        Scoreboard {
            player: self.ledger.net_worth(&self.market),
            monkey: self.monkey.net_worth(&self.market),
            rock: self.rock.net_worth(&self.market),
        }
    }
}
