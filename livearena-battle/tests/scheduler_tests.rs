//! Automatic countdown tests
//!
//! Most run on a paused clock so whole battles finish instantly; the
//! pause/resume storm needs real worker threads.

mod support;

use livearena_common::events::{ArenaEvent, BattleStatus, EndReason};
use livearena_battle::config::TimerConfig;
use std::time::Duration;
use support::{battle_config, harness_with_timer};

fn auto_timer() -> TimerConfig {
    TimerConfig {
        tick_interval_ms: 1000,
        auto_tick: true,
    }
}

#[tokio::test(start_paused = true)]
async fn test_battle_ends_when_countdown_expires() {
    let h = harness_with_timer(auto_timer());
    let battles = &h.state.battles;
    let config = battle_config(10, 5);
    let id = config.battle_id;
    battles.start_battle(config).await.expect("live");
    battles.send_gift(id, "fan", "bob", "heart", 1).await.expect("gift");

    tokio::time::sleep(Duration::from_millis(2500)).await;
    let state = battles.state(id).await.expect("state");
    assert_eq!(state.status, BattleStatus::Live);
    assert_eq!(state.time_remaining, 3);

    tokio::time::sleep(Duration::from_secs(3)).await;
    let state = battles.state(id).await.expect("state");
    assert_eq!(state.status, BattleStatus::Ended);
    assert_eq!(state.end_reason, Some(EndReason::TimerExpired));
    assert_eq!(state.winner_id.as_deref(), Some("bob"));
    assert_eq!(state.time_remaining, 0);

    let settlement = battles.settlement(id).await.expect("known").expect("settled");
    assert!(settlement.is_complete());
    assert_eq!(h.ledger.balance("bob").await, 120);
}

#[tokio::test(start_paused = true)]
async fn test_pause_freezes_countdown() {
    let h = harness_with_timer(auto_timer());
    let battles = &h.state.battles;
    let config = battle_config(10, 5);
    let id = config.battle_id;
    battles.start_battle(config).await.expect("live");

    tokio::time::sleep(Duration::from_millis(2500)).await;
    battles.pause(id).await.expect("pause");

    tokio::time::sleep(Duration::from_secs(10)).await;
    let state = battles.state(id).await.expect("state");
    assert!(state.is_paused);
    assert_eq!(state.time_remaining, 3);

    // Viewers can still gift while paused
    battles.send_gift(id, "fan", "alice", "rose", 1).await.expect("gift");

    battles.resume(id).await.expect("resume");
    tokio::time::sleep(Duration::from_millis(3500)).await;
    let state = battles.state(id).await.expect("state");
    assert_eq!(state.status, BattleStatus::Ended);
    assert_eq!(state.winner_id.as_deref(), Some("alice"));
}

#[tokio::test(start_paused = true)]
async fn test_manual_end_stops_scheduler() {
    let h = harness_with_timer(auto_timer());
    let battles = &h.state.battles;
    let mut rx = h.state.event_bus.subscribe();
    let config = battle_config(10, 60);
    let id = config.battle_id;
    battles.start_battle(config).await.expect("live");

    tokio::time::sleep(Duration::from_millis(1500)).await;
    battles.end_battle(id, EndReason::Stopped).await.expect("ended");
    tokio::time::sleep(Duration::from_secs(120)).await;

    let mut ticks = 0;
    let mut ended = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            ArenaEvent::TimerTick { .. } => ticks += 1,
            ArenaEvent::BattleEnded { reason, .. } => {
                assert_eq!(reason, EndReason::Stopped);
                ended += 1;
            }
            _ => {}
        }
    }
    assert_eq!(ticks, 1);
    assert_eq!(ended, 1);
    assert_eq!(battles.state(id).await.expect("state").time_remaining, 59);
}

#[tokio::test(start_paused = true)]
async fn test_manual_ticks_share_the_countdown() {
    let h = harness_with_timer(auto_timer());
    let battles = &h.state.battles;
    let config = battle_config(0, 4);
    let id = config.battle_id;
    battles.start_battle(config).await.expect("live");

    // Two forced ticks plus two scheduled ticks finish the battle
    battles.tick(id).await.expect("tick");
    battles.tick(id).await.expect("tick");
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let state = battles.state(id).await.expect("state");
    assert_eq!(state.status, BattleStatus::Ended);
    assert!(matches!(
        battles.tick(id).await,
        Err(livearena_battle::error::Error::State(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_countdown_survives_pause_resume_storm() {
    let h = harness_with_timer(TimerConfig {
        tick_interval_ms: 1,
        auto_tick: true,
    });
    let battles = std::sync::Arc::clone(&h.state.battles);

    let mut ids = Vec::new();
    for _ in 0..8 {
        let config = battle_config(0, 300);
        ids.push(config.battle_id);
        battles.start_battle(config).await.expect("live");
    }

    let mut togglers = Vec::new();
    for &id in &ids {
        for _ in 0..6 {
            let battles = std::sync::Arc::clone(&battles);
            togglers.push(tokio::spawn(async move {
                let deadline = tokio::time::Instant::now() + Duration::from_millis(60);
                while tokio::time::Instant::now() < deadline {
                    // Either call may lose the race to another toggler
                    let _ = battles.pause(id).await;
                    tokio::task::yield_now().await;
                    let _ = battles.resume(id).await;
                }
            }));
        }
    }
    for toggler in togglers {
        toggler.await.expect("toggler");
    }

    for &id in &ids {
        let _ = battles.resume(id).await;
    }

    // 300 one-millisecond ticks; generous bound for slow machines
    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    for &id in &ids {
        loop {
            let state = battles.state(id).await.expect("state");
            if state.status == BattleStatus::Ended {
                assert_eq!(state.end_reason, Some(EndReason::TimerExpired));
                break;
            }
            assert!(!state.is_paused);
            assert!(
                tokio::time::Instant::now() < deadline,
                "countdown stalled at {} while live",
                state.time_remaining
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}
