mod app;
mod cli;
mod config;
mod logging;
mod ui;
mod views;

use crate::app::{AppState, UiEvent};
use crate::cli::Args;
use crate::config::load_desk_config;
use crate::logging::init_tracing;
use crate::ui::{draw_ui, handle_key_event, DeskScreen};
use anyhow::Context;
use api_client::{AdminClient, ClientConfig};
use clap::Parser;
use crossterm::event::{self, Event};
use std::sync::Arc;
use std::time::Duration;
use sync_engine::SystemClock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _file_guard = init_tracing(&args.log_dir, args.log_to_stderr)?;

    let mut config = load_desk_config(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    if let Some(base_url) = args.base_url {
        config.api.base_url = base_url;
    }
    info!(
        event = "desk.start",
        config = %args.config.display(),
        base_url = %config.api.base_url,
        "dealdesk starting"
    );

    let client = AdminClient::new(ClientConfig {
        base_url: config.api.base_url.clone(),
        token: config.api.token.clone(),
        connect_timeout: config.api.connect_timeout,
        request_timeout: config.api.request_timeout,
    })
    .context("failed to build http client")?;

    let shutdown = CancellationToken::new();
    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel::<UiEvent>();
    let mut app = AppState::new(
        &config,
        client,
        Arc::new(SystemClock),
        shutdown.clone(),
        ui_tx,
    )?;

    let mut screen = DeskScreen::enter()?;

    let tick_rate = Duration::from_millis(100);
    let result: anyhow::Result<()> = loop {
        while let Ok(event) = ui_rx.try_recv() {
            app.handle_event(event);
        }

        if let Err(err) = screen.draw(|frame| draw_ui(frame, &mut app)) {
            break Err(err);
        }

        match event::poll(tick_rate) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) => {
                    let rows = app.snapshot().rows.len();
                    if handle_key_event(key, &mut app, rows) {
                        break Ok(());
                    }
                }
                Ok(_) => {}
                Err(err) => break Err(err.into()),
            },
            Ok(false) => {}
            Err(err) => break Err(err.into()),
        }
    };

    app.close();
    screen.leave()?;
    info!(event = "desk.stop", "dealdesk stopped");
    result
}
