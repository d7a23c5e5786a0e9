use crate::config::config;
use crate::dashboard::App;
use crate::Result;
use chrono::Local;
use cron::Schedule;
use log::{debug, error, info, warn};
use std::str::FromStr;
use std::sync::Arc;
use tokio::time::sleep;

/// Purges expired sessions on `PURGE_SCHEDULE`. A bad expression fails
/// startup instead of the background task.
pub fn do_work(app: Arc<App>) -> Result<()> {
    let schedule = Schedule::from_str(&config().PURGE_SCHEDULE)?;
    debug!("Upcoming purge times:");
    for datetime in schedule.upcoming(Local).take(5) {
        debug!("-> {}", datetime);
    }

    tokio::spawn(async move {
        loop {
            let now = Local::now();
            let Some(next) = schedule.upcoming(Local).next() else {
                warn!("Purge schedule has no upcoming runs, stopping worker");
                break;
            };
            sleep((next - now).to_std().unwrap_or_default()).await;

            debug!("Purging sessions at: {}", Local::now());
            match app
                .db
                .purge_expired_sessions(Local::now().naive_local())
                .await
            {
                Ok(0) => {}
                Ok(n) => info!("Purged {n} expired sessions"),
                Err(e) => error!("Session purge failed: {e}"),
            }
        }
    });
    Ok(())
}
