//! Full socket-based integration test: a scripted WebSocket server pushes
//! snapshots to a real client session.

use std::time::{Duration, Instant};

use anyhow::Context;
use dungeon_client::{client::ClientState, input::KeyEvent, GameClient};
use dungeon_shared::{
    config::ClientConfig,
    protocol::{ClientMessage, EntityId},
    render::SceneRenderer,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

async fn next_client_message(
    ws: &mut WebSocketStream<tokio::net::TcpStream>,
) -> anyhow::Result<ClientMessage> {
    loop {
        let msg = ws.next().await.context("client hung up")??;
        if msg.is_text() {
            return Ok(serde_json::from_str(msg.to_text()?)?);
        }
    }
}

async fn run_until<F>(client: &mut GameClient<SceneRenderer>, mut done: F) -> anyhow::Result<()>
where
    F: FnMut(&GameClient<SceneRenderer>) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(client) {
            let event = client.next_event().await.context("event channel closed")?;
            client.handle_event(event, Instant::now());
        }
        Ok::<_, anyhow::Error>(())
    })
    .await
    .context("timed out waiting for client")?
}

#[tokio::test]
async fn client_applies_pushed_snapshots() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("ws://{}/", listener.local_addr()?);

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let mut ws = accept_async(stream).await?;

        assert_eq!(next_client_message(&mut ws).await?, ClientMessage::Hello);

        ws.send(Message::Text(String::from(r#"{"type":"welcome"}"#).into())).await?;
        let frame = json!({
            "type": "render",
            "sprites": [
                {"id": 1, "texture": "hero", "x": 2, "y": 2, "z": 5},
                {"id": 2, "texture": "wall", "x": 0, "y": 0, "z": 1}
            ],
            "health": 100, "score": 0, "potions": 3
        });
        ws.send(Message::Text(frame.to_string().into())).await?;

        assert_eq!(
            next_client_message(&mut ws).await?,
            ClientMessage::Fire { key: Some("a".into()) }
        );

        let frame = json!({
            "type": "render",
            "sprites": [{"id": 2, "destroyed": true}],
            "health": 90, "score": 1, "potions": 3
        });
        ws.send(Message::Text(frame.to_string().into())).await?;
        ws.close(None).await?;
        Ok::<_, anyhow::Error>(())
    });

    let mut client = GameClient::new(ClientConfig::default(), SceneRenderer::new());
    client.connect(Some(&url));

    run_until(&mut client, |c| c.sync().registry().len() == 2).await?;
    assert_eq!(client.state, ClientState::Connected);
    assert_eq!(client.stats().potions, Some(3.0));

    client.key_down(&KeyEvent::new("a"));

    // The destroy frame may land before or with the close.
    run_until(&mut client, |c| {
        !c.sync().registry().contains(EntityId(2)) || c.state == ClientState::Disconnected
    })
    .await?;
    run_until(&mut client, |c| c.state == ClientState::Disconnected).await?;

    assert!(client.sync().registry().is_empty());
    assert!(client.renderer().is_empty());
    assert_eq!(client.session(), None);

    server.await??;
    Ok(())
}

#[tokio::test]
async fn refused_connection_ends_disconnected() -> anyhow::Result<()> {
    // Grab a free port and release it so nothing is listening there.
    let addr = TcpListener::bind("127.0.0.1:0").await?.local_addr()?;

    let mut client = GameClient::new(ClientConfig::default(), SceneRenderer::new());
    client.connect(Some(&format!("ws://{addr}/")));
    assert_eq!(client.state, ClientState::Connecting);

    run_until(&mut client, |c| c.state == ClientState::Disconnected).await?;
    assert_eq!(client.session(), None);
    Ok(())
}
