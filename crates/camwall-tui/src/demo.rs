//! Demo announcers — simulate camera modules broadcasting their IPs.
//!
//! Publishes each address twice, once as a plain string and once as the
//! JSON form, pacing the announcements so discovery is watchable.

use std::sync::Arc;
use std::time::Duration;

use camwall_net::MemoryBroker;

const DEMO_IPS: [&str; 3] = ["192.168.0.150", "192.168.0.151", "192.168.0.152"];

/// Spawn the background announcer against an in-process broker.
pub fn spawn_announcers(broker: &Arc<MemoryBroker>, topic: &str) {
    let broker = Arc::clone(broker);
    let topic = topic.to_owned();

    tokio::spawn(async move {
        for ip in DEMO_IPS {
            broker.publish(&topic, ip);
            tokio::time::sleep(Duration::from_secs(1)).await;

            // The JSON form should be reported as a duplicate.
            let json = format!(r#"{{"ip":"{ip}","model":"ESP32-CAM"}}"#);
            broker.publish(&topic, json);
            tokio::time::sleep(Duration::from_secs(4)).await;
        }

        // One message with nothing to extract, for the notice stream.
        broker.publish(&topic, "camera module rebooting");
        tracing::info!("demo announcers finished");
    });
}
