//! Backend-driven commands: `trike status` and `trike watch`.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use trike::countdown::{Countdown, SystemClock};
use trike::dispatch::{DispatchApi, HttpDispatchApi};
use trike::monitor::DispatchMonitor;
use trike::realtime::{SocketChannel, Subscription};
use trike::ui::{CountdownView, icons};

use super::effective_config;
use crate::Cli;

pub async fn cmd_status(project_dir: &Path, cli: &Cli) -> Result<()> {
    let config = effective_config(project_dir, cli)?;
    let api = HttpDispatchApi::from_config(&config.api)?;

    let dispatch = api
        .active_dispatch()
        .await
        .with_context(|| format!("Failed to fetch dispatch status from {}", api.url()))?;

    let countdown = Countdown::new(SystemClock);
    if let Err(e) = countdown.set_target_str(dispatch.as_ref().and_then(|d| d.countdown_target())) {
        eprintln!("{}{}", icons::CROSS, e);
    }

    let view = CountdownView::new();
    view.show_dispatch(dispatch.as_ref());
    view.update(countdown.remaining());
    view.finish();

    countdown.dispose();
    Ok(())
}

pub async fn cmd_watch(project_dir: &Path, cli: &Cli, no_realtime: bool) -> Result<()> {
    let config = effective_config(project_dir, cli)?;
    let api = HttpDispatchApi::from_config(&config.api)?;
    tracing::info!(url = api.url(), "Watching dispatch status");

    let countdown = Countdown::new(SystemClock);
    let mut reader = countdown.subscribe();
    let monitor = Arc::new(DispatchMonitor::new(Arc::new(api), countdown.setter()));
    let mut latest = monitor.latest();

    let socket = match (&config.realtime.socket_url, no_realtime) {
        (Some(url), false) => Some(SocketChannel::connect(url.clone())),
        _ => None,
    };
    let subscription: Option<Subscription> = match &socket {
        Some(socket) => {
            println!("{}Realtime: {}", icons::SIGNAL, config.realtime.channel);
            Some(socket.subscribe(&config.realtime.channel)?)
        }
        None => None,
    };

    let handle = Arc::clone(&monitor).spawn(subscription, config.monitor.poll_interval());
    let view = CountdownView::new();
    view.update(reader.remaining());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            changed = latest.changed() => {
                if changed.is_err() {
                    break;
                }
                let dispatch = latest.borrow_and_update().clone();
                view.finish();
                view.show_dispatch(dispatch.as_ref());
                view.update(reader.remaining());
            }

            remaining = reader.changed() => match remaining {
                Some(remaining) => view.update(remaining),
                None => break,
            },
        }
    }

    view.finish();
    handle.shutdown().await;
    if let Some(socket) = socket {
        socket.shutdown();
    }
    countdown.dispose();
    Ok(())
}
