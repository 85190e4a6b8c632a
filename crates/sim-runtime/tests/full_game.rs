//! Full runs driven frame by frame, the way a frontend would drive them.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use sim_core::{ActorId, GameConfig, GameEvent, Instrument, ScriptId};
use sim_econ::PriceRow;
use sim_runtime::GameSession;

/// Walk the intro: show each message, acknowledge it, stop once the final
/// acknowledgment releases the clock.
fn ack_through_intro(session: &mut GameSession) {
    for _ in 0..16 {
        session.update(2.0);
        session.acknowledge_message();
        if session.is_clock_running() {
            return;
        }
    }
    panic!("intro never released the clock");
}

/// Run one-second frames until the game finishes, draining events as a
/// frontend would and checking the frame invariants along the way.
fn drive_to_the_end(session: &mut GameSession, max_frames: usize) -> Vec<GameEvent> {
    let mut log = session.drain_events();
    for _ in 0..max_frames {
        session.update(1.0);
        log.extend(session.drain_events());
        assert!(session.balance() >= 0.0);
        assert!(session.net_worth().is_finite());
        assert_eq!(
            session.clock_state().current_day,
            session.market().current_day()
        );
        if session.is_finished() {
            return log;
        }
    }
    panic!("game never finished");
}

#[test]
fn a_short_game_plays_through_to_the_ending() {
    let mut config = GameConfig::default();
    config.days_per_year = 5;
    config.final_year = config.starting_year + 2;
    config.max_game_days = 10;
    config.salary_period_days = 5;
    let mut session = GameSession::new(config).unwrap();

    ack_through_intro(&mut session);
    session.select_instrument(Instrument::Potato);
    session.buy();
    let log = drive_to_the_end(&mut session, 64);

    assert_eq!(session.clock_state().current_day, 10);
    assert_eq!(session.clock_state().current_year, 22);
    assert_eq!(session.script(), ScriptId::Ending);
    assert!(log.contains(&GameEvent::YearAdvanced { year: 21 }));
    assert!(log.contains(&GameEvent::YearAdvanced { year: 22 }));
    assert!(log
        .iter()
        .any(|e| matches!(e, GameEvent::GameFinished { day: 10, .. })));

    // Two pay days, three actors each.
    let salaries = log
        .iter()
        .filter(|e| matches!(e, GameEvent::SalaryPaid { .. }))
        .count();
    assert_eq!(salaries, 6);

    // The ending script plays out and reveals the scoreboard.
    for _ in 0..16 {
        session.update(2.0);
        session.acknowledge_message();
    }
    assert!(session.is_scoreboard_revealed());
}

#[test]
fn the_default_run_lasts_sixty_years() {
    let mut session = GameSession::new(GameConfig::default()).unwrap();
    ack_through_intro(&mut session);
    session.drain_events();

    // 3600 one-day frames at the default one second per day.
    let mut log = Vec::new();
    for _ in 0..4_000 {
        session.update(1.0);
        log.extend(session.drain_events());
        if session.is_finished() {
            break;
        }
    }

    assert!(session.is_finished());
    assert_eq!(session.clock_state().current_day, 3_600);
    assert_eq!(session.clock_state().current_year, 80);

    let days = log
        .iter()
        .filter(|e| matches!(e, GameEvent::DayAdvanced { .. }))
        .count();
    assert_eq!(days, 3_600);
    let years = log
        .iter()
        .filter(|e| matches!(e, GameEvent::YearAdvanced { .. }))
        .count();
    assert_eq!(years, 60);
    for actor in [ActorId::Player, ActorId::Monkey, ActorId::Rock] {
        let pay_days = log
            .iter()
            .filter(|e| matches!(e, GameEvent::SalaryPaid { actor: a, .. } if *a == actor))
            .count();
        assert_eq!(pay_days, 180, "{} missed a pay day", actor.label());
    }

    let scores = session.scoreboard();
    assert!(scores.player >= 0.0);
    assert!(scores.monkey >= 0.0);
    assert!(scores.rock >= 0.0);
}

#[test]
fn identical_runs_replay_identically() {
    let config = || {
        let mut config = GameConfig::default();
        config.days_per_year = 20;
        config.final_year = config.starting_year + 5;
        config.max_game_days = 100;
        config
    };
    let drive = |session: &mut GameSession| -> Vec<GameEvent> {
        ack_through_intro(session);
        session.select_instrument(Instrument::World);
        session.buy();
        let mut log = session.drain_events();
        for frame in 0..120 {
            if frame == 30 {
                session.sell();
            }
            session.update(1.0);
            log.extend(session.drain_events());
        }
        log
    };

    let mut a = GameSession::new(config()).unwrap();
    let mut b = GameSession::new(config()).unwrap();
    let log_a = drive(&mut a);
    let log_b = drive(&mut b);
    assert_eq!(log_a, log_b);
    assert_eq!(a.scoreboard(), b.scoreboard());
}

#[test]
fn restart_replays_like_a_fresh_session() {
    let drive = |session: &mut GameSession| -> Vec<GameEvent> {
        ack_through_intro(session);
        session.select_instrument(Instrument::Fish);
        session.buy();
        let mut log = session.drain_events();
        for _ in 0..40 {
            session.update(1.0);
            log.extend(session.drain_events());
        }
        log
    };

    let mut fresh = GameSession::new(GameConfig::default()).unwrap();
    let fresh_log = drive(&mut fresh);

    let mut reused = GameSession::new(GameConfig::default()).unwrap();
    ack_through_intro(&mut reused);
    reused.select_instrument(Instrument::Apple);
    reused.buy();
    reused.update(13.0);
    reused.restart();
    let replay_log = drive(&mut reused);

    assert_eq!(replay_log, fresh_log);
    assert_eq!(reused.scoreboard(), fresh.scoreboard());
}

#[test]
fn preloaded_tables_drive_a_run_and_clamp_at_the_end() {
    let mut tables: BTreeMap<Instrument, Vec<PriceRow>> = BTreeMap::new();
    for (offset, instrument) in Instrument::ALL.into_iter().enumerate() {
        let base = 10.0 * (offset + 1) as f64;
        let rows = (0..30)
            .map(|t| PriceRow {
                date: NaiveDate::from_ymd_opt(2024, 1, 1)
                    .unwrap()
                    .checked_add_days(chrono::Days::new(t))
                    .unwrap(),
                close: base + t as f64,
            })
            .collect();
        tables.insert(instrument, rows);
    }

    let mut config = GameConfig::default();
    config.days_per_year = 25;
    config.final_year = config.starting_year + 2;
    config.max_game_days = 50;
    let mut session = GameSession::with_price_tables(config, &tables).unwrap();

    ack_through_intro(&mut session);
    let log = drive_to_the_end(&mut session, 64);

    // Day 50 is past the 30-row tables; prices clamp at the final closes.
    assert_eq!(session.clock_state().current_day, 50);
    assert_eq!(session.latest_price(Instrument::Apple), 39.0);
    assert_eq!(session.latest_price(Instrument::World), 79.0);
    assert!(log
        .iter()
        .any(|e| matches!(e, GameEvent::GameFinished { day: 50, .. })));
}
