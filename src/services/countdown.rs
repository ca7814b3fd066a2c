//! Countdown ticker: a scoped interval task that feeds discrete `Tick`
//! commands into the reducer once per second. The reducer is the only
//! writer; this task never touches the collection itself.

use log::debug;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::services::intake_store::{IntakeCommand, IntakeStore};

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Spawn the ticker. The caller owns the handle and aborts it on shutdown,
/// releasing the timer with the view.
pub fn spawn_countdown(store: IntakeStore) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        // The first tick of a tokio interval completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            if store.command(IntakeCommand::Tick).is_err() {
                debug!("Intake reducer gone, stopping countdown ticker");
                break;
            }
        }
    })
}
