//! Integration tests for the coordinator actor, driven through its handle
//! and per-connection channels.

use std::time::Duration;

use greenvest_protocol::{AckResponse, ClientEvent, Investments, PlayerId, Role, RoomCode, ServerEvent};
use greenvest_room::{
    CoordinatorHandle, Outbound, RoomConfig, RoomError, RoomPhase, spawn_coordinator,
    spawn_coordinator_with_rng,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

type Inbox = mpsc::UnboundedReceiver<Outbound>;

fn pid(id: u64) -> PlayerId {
    PlayerId(id)
}

fn coordinator() -> CoordinatorHandle {
    spawn_coordinator_with_rng(RoomConfig::default(), 64, StdRng::seed_from_u64(5))
}

async fn connect(handle: &CoordinatorHandle, id: u64) -> Inbox {
    let (tx, rx) = mpsc::unbounded_channel();
    handle.connect(pid(id), tx).await.unwrap();
    rx
}

async fn next(inbox: &mut Inbox) -> Outbound {
    tokio::time::timeout(Duration::from_secs(1), inbox.recv())
        .await
        .expect("timed out waiting for outbound message")
        .expect("outbound channel closed")
}

/// Waits until the coordinator has processed everything sent so far.
async fn settle(handle: &CoordinatorHandle) {
    handle.room_count().await.unwrap();
}

async fn create_room(handle: &CoordinatorHandle, host: u64, inbox: &mut Inbox) -> RoomCode {
    handle
        .send_event(
            pid(host),
            Some(1),
            ClientEvent::CreateRoom {
                host_name: "Host".into(),
            },
        )
        .await
        .unwrap();
    match next(inbox).await {
        Outbound::Ack {
            id: 1,
            response: AckResponse::RoomCode(code),
        } => code,
        other => panic!("expected room code ack, got {other:?}"),
    }
}

async fn join(handle: &CoordinatorHandle, id: u64, code: &RoomCode, name: &str) {
    handle
        .send_event(
            pid(id),
            Some(7),
            ClientEvent::JoinRoom {
                room_code: code.clone(),
                player_name: name.into(),
                avatar: String::new(),
            },
        )
        .await
        .unwrap();
}

fn event(out: Outbound) -> ServerEvent {
    match out {
        Outbound::Event(e) => e,
        other => panic!("expected an event, got {other:?}"),
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_create_room_acks_code_and_registers_room() {
    let handle = coordinator();
    let mut host = connect(&handle, 1).await;

    let code = create_room(&handle, 1, &mut host).await;

    assert_eq!(code.as_str().len(), 4);
    assert_eq!(handle.room_count().await.unwrap(), 1);
    let info = handle.room_info(code.clone()).await.unwrap().unwrap();
    assert_eq!(info.code, code);
    assert_eq!(info.phase, RoomPhase::Lobby);
    assert_eq!(info.player_count, 0);
    assert_eq!(info.member_count, 1);
}

#[tokio::test]
async fn test_join_broadcasts_before_ack() {
    let handle = coordinator();
    let mut host = connect(&handle, 1).await;
    let mut player = connect(&handle, 2).await;
    let code = create_room(&handle, 1, &mut host).await;

    join(&handle, 2, &code, "Team Rail").await;

    // The joiner is already in the group, so it sees the list first.
    let ServerEvent::UpdatePlayers { players } = event(next(&mut player).await) else {
        panic!("expected updatePlayers");
    };
    assert_eq!(players.len(), 1);
    assert_eq!(players[0].name, "Team Rail");
    assert_eq!(
        next(&mut player).await,
        Outbound::Ack {
            id: 7,
            response: AckResponse::success()
        }
    );

    // The host got the same list and no ack.
    assert!(matches!(
        event(next(&mut host).await),
        ServerEvent::UpdatePlayers { .. }
    ));
    settle(&handle).await;
    assert!(host.try_recv().is_err());
}

#[tokio::test]
async fn test_join_unknown_room_acks_error() {
    let handle = coordinator();
    let mut player = connect(&handle, 2).await;

    join(&handle, 2, &RoomCode::from("0001"), "lost").await;

    match next(&mut player).await {
        Outbound::Ack {
            response: AckResponse::Error { error },
            ..
        } => assert_eq!(error, "Room doesn't exist"),
        other => panic!("expected error ack, got {other:?}"),
    }
    assert_eq!(handle.room_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_full_room_rejects_ninth_team() {
    let handle = coordinator();
    let mut host = connect(&handle, 1).await;
    let code = create_room(&handle, 1, &mut host).await;

    for i in 0..8 {
        join(&handle, 10 + i, &code, &format!("team-{i}")).await;
    }
    let mut late = connect(&handle, 99).await;
    join(&handle, 99, &code, "late").await;

    match next(&mut late).await {
        Outbound::Ack {
            response: AckResponse::Error { error },
            ..
        } => assert_eq!(error, "Max 8 teams"),
        other => panic!("expected error ack, got {other:?}"),
    }
    let info = handle.room_info(code).await.unwrap().unwrap();
    assert_eq!(info.player_count, 8);
}

#[tokio::test]
async fn test_start_game_reaches_every_member() {
    let handle = coordinator();
    let mut host = connect(&handle, 1).await;
    let code = create_room(&handle, 1, &mut host).await;

    let mut inboxes = Vec::new();
    for i in 0..4 {
        inboxes.push(connect(&handle, 10 + i).await);
        join(&handle, 10 + i, &code, &format!("team-{i}")).await;
    }
    settle(&handle).await;
    while host.try_recv().is_ok() {}
    for inbox in &mut inboxes {
        while inbox.try_recv().is_ok() {}
    }

    handle
        .send_event(
            pid(1),
            None,
            ClientEvent::StartGame {
                room_code: code.clone(),
            },
        )
        .await
        .unwrap();

    let ServerEvent::GameStarted { impostors, sectors } = event(next(&mut host).await) else {
        panic!("expected gameStarted");
    };
    assert_eq!(impostors.len(), 2);
    assert_eq!(sectors.len(), 3);
    for inbox in &mut inboxes {
        let ServerEvent::GameStarted { impostors: seen, .. } = event(next(inbox).await) else {
            panic!("expected gameStarted");
        };
        assert_eq!(seen, impostors);
    }

    let info = handle.room_info(code).await.unwrap().unwrap();
    assert!(info.started);
    assert_eq!(info.phase, RoomPhase::Active);
}

#[tokio::test]
async fn test_non_host_start_is_silently_ignored() {
    let handle = coordinator();
    let mut host = connect(&handle, 1).await;
    let mut player = connect(&handle, 2).await;
    let code = create_room(&handle, 1, &mut host).await;
    join(&handle, 2, &code, "sneaky").await;
    settle(&handle).await;
    while host.try_recv().is_ok() {}
    while player.try_recv().is_ok() {}

    handle
        .send_event(
            pid(2),
            Some(3),
            ClientEvent::StartGame {
                room_code: code.clone(),
            },
        )
        .await
        .unwrap();
    settle(&handle).await;

    assert!(host.try_recv().is_err());
    assert!(player.try_recv().is_err());
    let info = handle.room_info(code).await.unwrap().unwrap();
    assert!(!info.started);
}

#[tokio::test]
async fn test_full_game_flow() {
    let handle = coordinator();
    let mut host = connect(&handle, 1).await;
    let mut player = connect(&handle, 2).await;
    let code = create_room(&handle, 1, &mut host).await;
    join(&handle, 2, &code, "Team Solar").await;
    settle(&handle).await;
    while player.try_recv().is_ok() {}

    let steps = [
        ClientEvent::StartGame {
            room_code: code.clone(),
        },
        ClientEvent::FlashNews {
            room_code: code.clone(),
            message: "Solar subsidy announced".into(),
        },
        ClientEvent::UnlockSectors {
            room_code: code.clone(),
        },
    ];
    for step in steps {
        handle.send_event(pid(1), None, step).await.unwrap();
    }
    handle
        .send_event(
            pid(2),
            None,
            ClientEvent::Invest {
                room_code: code.clone(),
                investments: Investments::from([("Solar Parks (Rewa)".into(), 100.0)]),
            },
        )
        .await
        .unwrap();
    handle
        .send_event(
            pid(1),
            None,
            ClientEvent::EndGame {
                room_code: code.clone(),
            },
        )
        .await
        .unwrap();

    let names: Vec<&str> = vec!["gameStarted", "news", "sectorsUnlocked", "updatePlayers", "gameEnded"];
    let mut last = None;
    for expected in names {
        let e = event(next(&mut player).await);
        assert_eq!(e.name(), expected);
        last = Some(e);
    }

    let Some(ServerEvent::GameEnded {
        scores,
        winner,
        impostors,
    }) = last
    else {
        panic!("expected gameEnded last");
    };
    // A lone player is always dealt the impostor role.
    assert_eq!(scores[0].role, Role::Impostor);
    assert_eq!(scores[0].financial, 700.0);
    assert_eq!(scores[0].green, 500.0);
    assert_eq!(scores[0].total, 600.0);
    assert_eq!(winner.unwrap().name, "Team Solar");
    assert_eq!(impostors, vec!["Team Solar".to_string()]);

    let info = handle.room_info(code).await.unwrap().unwrap();
    assert_eq!(info.phase, RoomPhase::Ended);
}

#[tokio::test]
async fn test_disconnect_stops_broadcasts_and_keeps_room() {
    let handle = coordinator();
    let mut host = connect(&handle, 1).await;
    let mut player = connect(&handle, 2).await;
    let code = create_room(&handle, 1, &mut host).await;
    join(&handle, 2, &code, "leaver").await;
    settle(&handle).await;
    while host.try_recv().is_ok() {}

    handle.disconnect(pid(2)).await.unwrap();
    handle
        .send_event(
            pid(1),
            None,
            ClientEvent::FlashNews {
                room_code: code.clone(),
                message: "still here".into(),
            },
        )
        .await
        .unwrap();

    assert_eq!(
        event(next(&mut host).await),
        ServerEvent::News {
            message: "still here".into()
        }
    );
    // The player's channel was dropped by the coordinator.
    while let Ok(out) = player.try_recv() {
        assert!(!matches!(out, Outbound::Event(ServerEvent::News { .. })));
    }

    let info = handle.room_info(code).await.unwrap().unwrap();
    assert_eq!(info.player_count, 1);
    assert_eq!(info.member_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_idle_rooms_are_evicted() {
    let config = RoomConfig {
        idle_ttl: Some(Duration::from_secs(60)),
        sweep_interval: Duration::from_secs(1),
        ..RoomConfig::default()
    };
    let handle = spawn_coordinator(config, 16);
    let mut host = connect(&handle, 1).await;
    create_room(&handle, 1, &mut host).await;

    // Paused time jumps straight to each sleep deadline.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(handle.room_count().await.unwrap(), 1);

    tokio::time::sleep(Duration::from_secs(32)).await;
    assert_eq!(handle.room_count().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_activity_keeps_room_alive() {
    let config = RoomConfig {
        idle_ttl: Some(Duration::from_secs(60)),
        sweep_interval: Duration::from_secs(1),
        ..RoomConfig::default()
    };
    let handle = spawn_coordinator(config, 16);
    let mut host = connect(&handle, 1).await;
    let code = create_room(&handle, 1, &mut host).await;

    tokio::time::sleep(Duration::from_secs(45)).await;
    handle
        .send_event(
            pid(1),
            None,
            ClientEvent::FlashNews {
                room_code: code.clone(),
                message: "still playing".into(),
            },
        )
        .await
        .unwrap();
    settle(&handle).await;

    // 90s after creation but only 45s after the last event.
    tokio::time::sleep(Duration::from_secs(45)).await;
    assert_eq!(handle.room_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_shutdown_makes_handle_unavailable() {
    let handle = coordinator();
    handle.shutdown().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(handle.room_count().await, Err(RoomError::Unavailable));
}
