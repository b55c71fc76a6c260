#[allow(dead_code)]
mod common;

use std::time::Duration;

use futures::SinkExt;
use tokio_tungstenite::tungstenite::Message;

use shoal_core::net::messages::{ClientEvent, RespawnPayload, ServerEvent};
use shoal_core::test_helpers::make_update;

use common::{
    TestServer, health, ws_connect, ws_join, ws_join_msgpack, ws_read_event, ws_read_framed_event,
    ws_send_event, ws_try_read_event,
};
use shoal_core::net::protocol::WireFormat;
use shoal_server::config::ServerConfig;

#[tokio::test]
async fn join_returns_full_game_state() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url()).await;

    let state = ws_join(&mut stream, "Nemo").await;

    assert!(!state.self_id.is_empty());
    assert_eq!(state.players.len(), 1);
    assert_eq!(state.players[&state.self_id].name, "Nemo");
    assert_eq!(state.foods.len(), 5);
    assert_eq!(state.connected_players, 1);
    assert_eq!((state.world_width, state.world_height), (3000.0, 3000.0));
}

#[tokio::test]
async fn large_game_state_is_delivered() {
    let mut config = ServerConfig::default();
    config.food.max_food = 2000;
    config.food.initial_food = 2000;
    config.food.solo_spawn_period_ms = 60_000;
    config.food.crowd_spawn_period_ms = 60_000;
    let server = TestServer::from_config(config).await;

    let mut json = ws_connect(&server.ws_url()).await;
    let state = ws_join(&mut json, "Big").await;
    assert_eq!(state.foods.len(), 2000);

    let mut packed = ws_connect(&server.ws_url()).await;
    let state = ws_join_msgpack(&mut packed, "Bigger").await;
    assert_eq!(state.foods.len(), 2000);
    assert_eq!(state.players.len(), 2);
}

#[tokio::test]
async fn connection_ids_are_unique() {
    let server = TestServer::new().await;
    let mut a = ws_connect(&server.ws_url()).await;
    let mut b = ws_connect(&server.ws_url()).await;
    let sa = ws_join(&mut a, "A").await;
    let sb = ws_join(&mut b, "B").await;
    assert_ne!(sa.self_id, sb.self_id);
    assert_eq!(sb.players.len(), 2);
}

#[tokio::test]
async fn first_frame_must_be_join() {
    let server = TestServer::new().await;
    let mut stream = ws_connect(&server.ws_url()).await;
    ws_send_event(&mut stream, &ClientEvent::FoodEaten("food-1".into())).await;

    // The server hangs up without registering anyone.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let body = health(&server).await;
    assert_eq!(body["connectedPlayers"], 0);
    assert_eq!(body["food"], 5);
}

#[tokio::test]
async fn solo_player_gets_no_spawn_broadcasts() {
    let server = TestServer::with_fast_spawns(50, 50).await;
    let mut alone = ws_connect(&server.ws_url()).await;
    ws_join(&mut alone, "Solo").await;

    assert!(
        ws_try_read_event(&mut alone, 400).await.is_none(),
        "A lone player must not receive broadcasts"
    );

    // Food still accumulated server-side.
    let mut second = ws_connect(&server.ws_url()).await;
    let state = ws_join(&mut second, "Late").await;
    assert!(!state.foods.is_empty());

    // With an audience, spawns are broadcast to both.
    match ws_read_event(&mut alone).await {
        ServerEvent::PlayerJoined(p) => assert_eq!(p.id, state.self_id),
        other => panic!("Expected playerJoined, got: {other:?}"),
    }
    assert!(matches!(ws_read_event(&mut alone).await, ServerEvent::FoodSpawned(_)));
    assert!(matches!(ws_read_event(&mut second).await, ServerEvent::FoodSpawned(_)));
}

#[tokio::test]
async fn update_is_relayed_to_peers_only() {
    let server = TestServer::new().await;
    let mut a = ws_connect(&server.ws_url()).await;
    let mut b = ws_connect(&server.ws_url()).await;
    ws_join(&mut a, "A").await;
    let sb = ws_join(&mut b, "B").await;
    let _joined = ws_read_event(&mut a).await;

    ws_send_event(&mut b, &ClientEvent::PlayerUpdate(make_update(42.0, 43.0, 3))).await;

    match ws_read_event(&mut a).await {
        ServerEvent::PlayerMoved(p) => {
            assert_eq!(p.id, sb.self_id);
            assert_eq!((p.x, p.y), (42.0, 43.0));
            assert_eq!(p.size_level, 3);
        },
        other => panic!("Expected playerMoved, got: {other:?}"),
    }
    assert!(ws_try_read_event(&mut b, 200).await.is_none());
}

#[tokio::test]
async fn food_is_consumed_at_most_once() {
    let server = TestServer::new().await;
    let mut a = ws_connect(&server.ws_url()).await;
    let mut b = ws_connect(&server.ws_url()).await;
    let sa = ws_join(&mut a, "A").await;
    ws_join(&mut b, "B").await;
    let _joined = ws_read_event(&mut a).await;
    let food_id = sa.foods[0].id.clone();

    ws_send_event(&mut a, &ClientEvent::FoodEaten(food_id.clone())).await;
    assert_eq!(
        ws_read_event(&mut b).await,
        ServerEvent::FoodRemoved(food_id.clone())
    );

    // The losing side of the race reports too; nothing happens.
    ws_send_event(&mut b, &ClientEvent::FoodEaten(food_id)).await;
    assert!(ws_try_read_event(&mut a, 200).await.is_none());
    assert_eq!(health(&server).await["food"], 4);
}

#[tokio::test]
async fn predation_and_respawn_are_relayed() {
    let server = TestServer::new().await;
    let mut a = ws_connect(&server.ws_url()).await;
    let mut b = ws_connect(&server.ws_url()).await;
    let sa = ws_join(&mut a, "A").await;
    let sb = ws_join(&mut b, "B").await;
    let _joined = ws_read_event(&mut a).await;

    ws_send_event(&mut a, &ClientEvent::PlayerEaten(sb.self_id.clone())).await;
    assert_eq!(ws_read_event(&mut b).await, ServerEvent::PlayerDied(sb.self_id.clone()));

    ws_send_event(
        &mut b,
        &ClientEvent::PlayerRespawn(RespawnPayload {
            x: 10.0,
            y: 20.0,
            radius: 15.0,
            score: 5,
            size_level: 1,
        }),
    )
    .await;
    match ws_read_event(&mut a).await {
        ServerEvent::PlayerRespawned(p) => {
            assert_eq!(p.id, sb.self_id);
            assert!(p.is_alive);
            assert_eq!(p.score, 5);
        },
        other => panic!("Expected playerRespawned, got: {other:?}"),
    }

    // Unknown victims are ignored.
    ws_send_event(&mut b, &ClientEvent::PlayerEaten("ghost".into())).await;
    assert!(ws_try_read_event(&mut a, 200).await.is_none());
    assert_ne!(sa.self_id, sb.self_id);
}

#[tokio::test]
async fn disconnect_broadcasts_leave_and_updates_health() {
    let server = TestServer::new().await;
    let mut a = ws_connect(&server.ws_url()).await;
    let mut b = ws_connect(&server.ws_url()).await;
    ws_join(&mut a, "A").await;
    let sb = ws_join(&mut b, "B").await;
    let _joined = ws_read_event(&mut a).await;
    assert_eq!(health(&server).await["connectedPlayers"], 2);
    assert_eq!(health(&server).await["spawnPeriodMs"], 60_000);

    b.close(None).await.unwrap();

    assert_eq!(ws_read_event(&mut a).await, ServerEvent::PlayerLeft(sb.self_id));
    let body = health(&server).await;
    assert_eq!(body["connectedPlayers"], 1);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn msgpack_clients_interoperate_with_json_clients() {
    let server = TestServer::new().await;
    let mut json = ws_connect(&server.ws_url()).await;
    let mut packed = ws_connect(&server.ws_url()).await;
    ws_join(&mut json, "Text").await;
    let state = ws_join_msgpack(&mut packed, "Binary").await;
    assert_eq!(state.players.len(), 2);

    let _joined = ws_read_event(&mut json).await;
    ws_send_event(&mut json, &ClientEvent::PlayerUpdate(make_update(7.0, 8.0, 1))).await;

    let (format, event) = ws_read_framed_event(&mut packed).await;
    assert_eq!(format, WireFormat::MsgPack);
    assert!(matches!(event, ServerEvent::PlayerMoved(p) if p.x == 7.0));
}

#[tokio::test]
async fn garbage_frames_do_not_disconnect() {
    let server = TestServer::new().await;
    let mut a = ws_connect(&server.ws_url()).await;
    let mut b = ws_connect(&server.ws_url()).await;
    ws_join(&mut a, "A").await;
    ws_join(&mut b, "B").await;
    let _joined = ws_read_event(&mut a).await;

    b.send(Message::Text("not json".into())).await.unwrap();
    b.send(Message::Binary(vec![0xc1].into())).await.unwrap();
    ws_send_event(&mut b, &ClientEvent::PlayerUpdate(make_update(1.0, 1.0, 1))).await;

    assert!(matches!(ws_read_event(&mut a).await, ServerEvent::PlayerMoved(_)));
}
