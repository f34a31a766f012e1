use std::collections::HashSet;
use std::time::Duration;

use game_core::ai::{ControllerConfig, ControllerKind, Difficulty};
use game_core::Config;
use match_server::{SchedulerConfig, SessionConfig, SessionScheduler, TickReport};

fn short_match(top: ControllerKind, bottom: ControllerKind, seed: u64) -> SessionConfig {
    SessionConfig {
        game: Config {
            win_score: 3,
            ..Config::default()
        },
        ..SessionConfig::npc_vs_npc(
            ControllerConfig::new(top, Difficulty::Normal),
            ControllerConfig::new(bottom, Difficulty::Easy),
        )
    }
    .with_seed(seed)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tick_all_runs_every_match_to_completion() {
    let scheduler = SessionScheduler::new(SchedulerConfig::default());
    let kinds = [
        ControllerKind::Heuristic,
        ControllerKind::Pid,
        ControllerKind::Technician,
    ];

    let mut expected = HashSet::new();
    for (i, top) in kinds.iter().enumerate() {
        for (j, bottom) in kinds.iter().enumerate() {
            let seed = (i * kinds.len() + j) as u64;
            expected.insert(scheduler.create(short_match(*top, *bottom, seed)).await.unwrap());
        }
    }

    let mut finished: Vec<TickReport> = Vec::new();
    for _ in 0..200_000 {
        if scheduler.session_count().await == 0 {
            break;
        }
        let reports = scheduler.tick_all().await;
        finished.extend(reports.into_iter().filter(|r| r.winner.is_some()));
    }

    assert_eq!(scheduler.session_count().await, 0, "all matches finished");
    let ids: HashSet<_> = finished.iter().map(|r| r.id).collect();
    assert_eq!(ids, expected);
    for report in &finished {
        let winner = report.winner.unwrap();
        assert_eq!(report.score.get(winner), 3);
        assert!(report.score.get(winner.opponent()) < 3);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_spawned_loops_announce_winners() {
    let scheduler = SessionScheduler::new(SchedulerConfig::default());
    let mut finished = scheduler.subscribe_finished();

    let mut ids = HashSet::new();
    for seed in 0..3 {
        let config = SessionConfig {
            game: Config {
                win_score: 1,
                ..Config::default()
            },
            tick_hz: 1_000,
            ..short_match(ControllerKind::Pid, ControllerKind::Heuristic, seed)
        };
        let id = scheduler.create(config).await.unwrap();
        scheduler.spawn_loop(id).await.unwrap();
        ids.insert(id);
    }

    let mut announced = HashSet::new();
    while announced.len() < ids.len() {
        let report = tokio::time::timeout(Duration::from_secs(60), finished.recv())
            .await
            .expect("a match finishes in time")
            .expect("channel open");
        assert!(report.winner.is_some());
        announced.insert(report.id);
    }

    assert_eq!(announced, ids);
    assert_eq!(scheduler.session_count().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_aborts_running_loop() {
    let scheduler = SessionScheduler::new(SchedulerConfig::default());
    let id = scheduler
        .create(SessionConfig {
            tick_hz: 500,
            ..SessionConfig::default()
        })
        .await
        .unwrap();
    scheduler.spawn_loop(id).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let snapshot = scheduler.stop(id).await.unwrap();
    assert!(snapshot.tick > 0, "loop was ticking");
    assert!(scheduler.query(id).await.is_err());
}
