//! Standalone headless client binary.
//!
//! Usage:
//!   cargo run -p dungeon_client -- [--config client.json] [--url ws://host:port/] [--no-connect]
//!
//! The client connects to the server, applies snapshots to a headless scene
//! and extrapolates motion every frame.
//!
//! Console commands:
//!   connect [url]  - Start a new session
//!   disconnect     - Close the current session
//!   status         - Show client status
//!   down <key>     - Press a key (`space` for the space bar)
//!   up <key>       - Release a key
//!   quit           - Exit client

use std::env;
use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use anyhow::Context;
use dungeon_client::GameClient;
use dungeon_shared::{config::ClientConfig, render::SceneRenderer};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::info;

struct Args {
    config: Option<String>,
    url: Option<String>,
    connect: bool,
}

fn parse_args() -> Args {
    let mut out = Args {
        config: None,
        url: None,
        connect: true,
    };
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                out.config = Some(args[i + 1].clone());
                i += 2;
            }
            "--url" if i + 1 < args.len() => {
                out.url = Some(args[i + 1].clone());
                i += 2;
            }
            "--no-connect" => {
                out.connect = false;
                i += 1;
            }
            _ => i += 1,
        }
    }
    out
}

fn load_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("read {path}"))?;
            ClientConfig::from_json_str(&text).with_context(|| format!("parse {path}"))?
        }
        None => ClientConfig::default(),
    };
    if let Some(url) = &args.url {
        cfg.server_url = url.clone();
    }
    Ok(cfg)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = parse_args();
    let cfg = load_config(&args)?;
    info!(server = %cfg.server_url, removal = ?cfg.removal, input = ?cfg.input_mode, "Starting client");

    let renderer = SceneRenderer::with_textures(cfg.textures.iter().cloned());
    let frame_interval = Duration::from_secs_f32(1.0 / cfg.frame_hz.max(1) as f32);
    let mut client = GameClient::new(cfg, renderer);

    // Set up console input channel.
    let (console_tx, mut console_rx) = mpsc::channel::<String>(32);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    if args.connect {
        client.connect(None);
    }
    println!("Type 'help' for commands, 'quit' to exit.");

    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_frame = Instant::now();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                client.frame((now - last_frame).as_secs_f32());
                last_frame = now;
            }
            Some(event) = client.next_event() => {
                client.handle_event(event, Instant::now());
            }
            line = console_rx.recv() => {
                let Some(line) = line else { break };
                if matches!(line.as_str(), "quit" | "exit") {
                    break;
                }
                match client.exec_console(&line) {
                    Ok(output) => {
                        for line in output {
                            println!("{}", line);
                        }
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
        }
    }

    client.disconnect();
    info!(frames = client.frames(), "Client exiting");
    Ok(())
}
