//! Retention reaper: periodic age/count pruning per `type`.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::archive::Archive;
use crate::config::RetentionRule;

/// Runs the retention reaper loop until `done` is cancelled. Any in-progress
/// batch is allowed to finish before returning.
pub async fn run(
    archive: Archive,
    rules: HashMap<String, RetentionRule>,
    frequency: Duration,
    done: CancellationToken,
) {
    let mut ticker = tokio::time::interval(frequency);
    loop {
        tokio::select! {
            _ = done.cancelled() => {
                info!("retention reaper shutting down");
                return;
            }
            _ = ticker.tick() => {
                reap_once(&archive, &rules);
            }
        }
    }
}

fn reap_once(archive: &Archive, rules: &HashMap<String, RetentionRule>) {
    let now_nanos = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    for (type_, rule) in rules {
        let deleted = match *rule {
            RetentionRule::Age(age) => {
                let cutoff = now_nanos.saturating_sub(age.as_nanos() as i64);
                archive.reap_older_than(type_, cutoff)
            }
            RetentionRule::Count(limit) => archive.reap_over_count(type_, limit),
        };
        if deleted > 0 {
            debug!(type_ = %type_, deleted, "retention reaper pruned records");
        }
    }
}
