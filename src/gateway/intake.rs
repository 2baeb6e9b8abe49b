//! JSON-lines order intake.
//!
//! Reads one JSON order per line and forwards it to the gateway's inbound
//! channel. Malformed lines are logged and skipped.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use crate::gateway::order::Order;

/// Counters for one intake run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeStats {
    pub forwarded: u64,
    pub malformed: u64,
}

/// Forward orders from `reader` until EOF or until the gateway stops receiving.
pub async fn forward_json_lines<R>(reader: R, inbound: mpsc::Sender<Order>) -> std::io::Result<IntakeStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = IntakeStats::default();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let order: Order = match serde_json::from_str(line) {
            Ok(order) => order,
            Err(e) => {
                stats.malformed += 1;
                tracing::warn!(line = line_no, error = %e, "Skipping malformed order");
                continue;
            }
        };

        if inbound.send(order).await.is_err() {
            tracing::info!("Gateway no longer accepting orders, intake stopped");
            break;
        }
        stats.forwarded += 1;
    }

    Ok(stats)
}
