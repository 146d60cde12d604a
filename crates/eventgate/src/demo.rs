//! Demo publisher: a heartbeat in the `sse` category so a fresh deployment has
//! something to show on `/events?type=sse`.

use std::time::Duration;

use chrono::Utc;
use eventgate_broker::{BrokerHandle, Message};
use tracing::debug;

pub const DEMO_CATEGORY: &str = "sse";

pub async fn run(broker: BrokerHandle, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    for i in 0u64.. {
        ticker.tick().await;
        let content = format!("{i} - time is {}", Utc::now().to_rfc3339());
        if broker.publish(Message::to_category(content, DEMO_CATEGORY)).is_err() {
            debug!("Broker stopped, ending demo publisher");
            return;
        }
    }
}
