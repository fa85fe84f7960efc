//! Offline countdown: `trike countdown <timestamp>`.

use anyhow::{Context, Result};

use trike::countdown::{Countdown, SystemClock};
use trike::ui::CountdownView;

pub async fn cmd_countdown(timestamp: &str) -> Result<()> {
    let countdown = Countdown::new(SystemClock);
    let mut reader = countdown.subscribe();
    countdown
        .set_target_str(Some(timestamp))
        .context("Cannot start countdown")?;
    reader.mark_seen();

    let view = CountdownView::new();
    view.update(reader.remaining());

    while !reader.remaining().is_elapsed() {
        tokio::select! {
            changed = reader.changed() => match changed {
                Some(remaining) => view.update(remaining),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    view.finish();
    countdown.dispose();
    Ok(())
}
