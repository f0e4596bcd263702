//! Client session lifecycle with a caller-driven transport.

use std::time::Instant;

use dungeon_client::{
    client::ClientState,
    connection::{SessionEvent, SessionEventKind},
    input::KeyEvent,
    GameClient,
};
use dungeon_shared::{
    config::ClientConfig,
    protocol::{ClientMessage, EntityId},
    render::SceneRenderer,
};
use serde_json::json;

fn hero_frame(id: u64, x: f32) -> String {
    json!({
        "type": "render",
        "sprites": [{"id": id, "texture": "hero", "x": x, "y": 0, "z": 5}],
        "health": 100, "score": 0, "potions": 0
    })
    .to_string()
}

fn push(client: &GameClient<SceneRenderer>, event: SessionEvent) {
    client.event_sender().send(event).expect("client alive");
}

#[test]
fn open_sends_hello_and_frames_populate_registry() {
    let mut client = GameClient::new(ClientConfig::default(), SceneRenderer::new());
    let (id, mut outbound) = client.attach_session();
    assert_eq!(client.state, ClientState::Connecting);

    push(&client, SessionEvent { session: id, kind: SessionEventKind::Opened });
    push(&client, SessionEvent { session: id, kind: SessionEventKind::Frame(hero_frame(1, 0.0)) });
    assert_eq!(client.pump(Instant::now()), 2);

    assert_eq!(client.state, ClientState::Connected);
    assert_eq!(outbound.try_recv().ok(), Some(ClientMessage::Hello));
    assert!(client.sync().registry().contains(EntityId(1)));
    assert_eq!(client.stats().health, Some(100.0));
}

#[test]
fn key_events_go_out_only_when_open() {
    let mut client = GameClient::new(ClientConfig::default(), SceneRenderer::new());
    let (id, mut outbound) = client.attach_session();

    client.key_down(&KeyEvent::new("a"));
    assert!(outbound.try_recv().is_err());

    push(&client, SessionEvent { session: id, kind: SessionEventKind::Opened });
    client.pump(Instant::now());
    assert_eq!(outbound.try_recv().ok(), Some(ClientMessage::Hello));

    client.key_down(&KeyEvent::new("k"));
    client.key_up(&KeyEvent::new("j"));
    client.key_up(&KeyEvent::new("k"));
    assert_eq!(outbound.try_recv().ok(), Some(ClientMessage::Move { key: Some("k".into()) }));
    assert_eq!(outbound.try_recv().ok(), Some(ClientMessage::Move { key: None }));
    assert!(outbound.try_recv().is_err());
}

#[test]
fn bad_and_unknown_frames_leave_state_alone() {
    let mut client = GameClient::new(ClientConfig::default(), SceneRenderer::new());
    let (id, _outbound) = client.attach_session();
    push(&client, SessionEvent { session: id, kind: SessionEventKind::Opened });
    push(&client, SessionEvent { session: id, kind: SessionEventKind::Frame(hero_frame(1, 0.0)) });
    client.pump(Instant::now());

    // Second sprite is missing `z`: nothing from this frame may land.
    let partial = json!({
        "type": "render",
        "sprites": [
            {"id": 1, "texture": "hero", "x": 4, "y": 0, "z": 5},
            {"id": 2, "texture": "wall", "x": 0, "y": 0}
        ],
        "health": 1, "score": 0, "potions": 0
    })
    .to_string();
    let before = client.sync().registry().get(EntityId(1)).cloned();
    assert!(client.handle_frame(&partial, Instant::now()).is_none());
    assert!(client.handle_frame("{not json", Instant::now()).is_none());
    assert!(client.handle_frame(r#"{"type":"chat","text":"hi"}"#, Instant::now()).is_none());

    assert_eq!(client.sync().registry().get(EntityId(1)).cloned(), before);
    assert!(!client.sync().registry().contains(EntityId(2)));
    assert_eq!(client.stats().health, Some(100.0));
    assert_eq!(client.state, ClientState::Connected);
}

#[test]
fn close_tears_down_registry_and_visuals() {
    let mut client = GameClient::new(ClientConfig::default(), SceneRenderer::new());
    let (id, _outbound) = client.attach_session();
    push(&client, SessionEvent { session: id, kind: SessionEventKind::Opened });
    push(&client, SessionEvent { session: id, kind: SessionEventKind::Frame(hero_frame(1, 0.0)) });
    client.pump(Instant::now());
    assert_eq!(client.renderer().len(), 1);

    assert!(client.disconnect());
    push(&client, SessionEvent { session: id, kind: SessionEventKind::Closed });
    client.pump(Instant::now());

    assert_eq!(client.state, ClientState::Disconnected);
    assert!(client.sync().registry().is_empty());
    assert!(client.renderer().is_empty());
    assert_eq!(client.session(), None);
}

#[test]
fn superseded_session_cannot_touch_new_one() {
    let mut client = GameClient::new(ClientConfig::default(), SceneRenderer::new());
    let (old, _old_out) = client.attach_session();
    push(&client, SessionEvent { session: old, kind: SessionEventKind::Opened });
    client.pump(Instant::now());

    let (new, _new_out) = client.attach_session();
    push(&client, SessionEvent { session: new, kind: SessionEventKind::Opened });
    push(&client, SessionEvent { session: new, kind: SessionEventKind::Frame(hero_frame(7, 2.0)) });
    // The old socket finishes tearing down after the new one is live.
    push(&client, SessionEvent { session: old, kind: SessionEventKind::Frame(hero_frame(9, 0.0)) });
    push(&client, SessionEvent { session: old, kind: SessionEventKind::Closed });

    assert_eq!(client.pump(Instant::now()), 2);
    assert_eq!(client.state, ClientState::Connected);
    assert_eq!(client.session(), Some(new));
    assert_eq!(client.sync().registry().ids(), vec![EntityId(7)]);
}

#[test]
fn frames_extrapolate_between_snapshots() {
    let mut client = GameClient::new(ClientConfig::default(), SceneRenderer::new());
    let (id, _outbound) = client.attach_session();
    push(&client, SessionEvent { session: id, kind: SessionEventKind::Opened });
    let moving = json!({
        "type": "render",
        "sprites": [{"id": 5, "texture": "monster", "x": 3, "y": 3, "z": 5, "motion": {"dx": -1, "dy": 0}}],
        "health": 100, "score": 0, "potions": 0
    })
    .to_string();
    push(&client, SessionEvent { session: id, kind: SessionEventKind::Frame(moving) });
    client.pump(Instant::now());

    let start = client.sync().registry().get(EntityId(5)).unwrap().position;
    assert_eq!(client.frame(0.05), 1);
    let handle = client.sync().registry().get(EntityId(5)).unwrap().handle;
    let drawn = client.renderer().visual(handle).unwrap().position;
    assert!(drawn.x < start.x);
    assert_eq!(client.frames(), 1);
}
