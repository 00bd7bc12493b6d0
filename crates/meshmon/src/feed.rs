//! Message sources: a live MQTT subscription or an NDJSON replay.

use meshmon_core::FeedConfig;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, Transport};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

const REQUEST_CAPACITY: usize = 64;
const MIN_KEEP_ALIVE_SECS: u64 = 5;
const DISCONNECT_DRAIN: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Connected,
    Disconnected { reason: String },
    Message(Vec<u8>),
}

#[derive(Debug, Clone)]
pub enum FeedSource {
    Mqtt(FeedConfig),
    /// `-` reads standard input.
    Replay {
        path: PathBuf,
        interval: Option<Duration>,
    },
}

pub async fn run(source: FeedSource, tx: mpsc::Sender<FeedEvent>, shutdown: watch::Receiver<bool>) {
    match source {
        FeedSource::Mqtt(config) => mqtt_loop(config, tx, shutdown).await,
        FeedSource::Replay { path, interval } => {
            if let Err(err) = replay_loop(&path, interval, &tx, shutdown).await {
                warn!(event = "replay_error", path = %path.display(), error = %err);
                let _ = tx
                    .send(FeedEvent::Disconnected {
                        reason: err.to_string(),
                    })
                    .await;
            }
        }
    }
}

async fn mqtt_loop(
    config: FeedConfig,
    tx: mpsc::Sender<FeedEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let options = match mqtt_options(&config) {
        Ok(options) => options,
        Err(err) => {
            warn!(event = "mqtt_tls_error", error = %err);
            let _ = tx
                .send(FeedEvent::Disconnected {
                    reason: format!("cannot read CA file: {err}"),
                })
                .await;
            return;
        }
    };
    let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
    let mut backoff = Duration::from_secs(1);
    info!(event = "mqtt_start", broker = %config.endpoint(), topic = %config.topic);

    loop {
        let polled = tokio::select! {
            _ = shutdown.changed() => break,
            polled = eventloop.poll() => polled,
        };

        match polled {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                backoff = Duration::from_secs(1);
                if let Err(err) = client.try_subscribe(config.topic.as_str(), QoS::AtMostOnce) {
                    warn!(event = "mqtt_subscribe_error", error = %err);
                }
                info!(event = "mqtt_connected", broker = %config.endpoint());
                if tx.send(FeedEvent::Connected).await.is_err() {
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!(
                    event = "mqtt_publish",
                    topic = %publish.topic,
                    bytes = publish.payload.len()
                );
                if tx
                    .send(FeedEvent::Message(publish.payload.to_vec()))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Ok(_) => {}
            Err(err) => {
                warn!(event = "mqtt_connection_error", error = %err, retry_in = ?backoff);
                let reason = err.to_string();
                if tx.send(FeedEvent::Disconnected { reason }).await.is_err() {
                    break;
                }
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = next_backoff(backoff);
            }
        }
    }

    disconnect(&client, &mut eventloop).await;
}

/// Queues DISCONNECT and polls until it has been written or the drain window
/// runs out.
async fn disconnect(client: &AsyncClient, eventloop: &mut EventLoop) {
    if client.try_disconnect().is_err() {
        return;
    }
    let drained = tokio::time::timeout(DISCONNECT_DRAIN, async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => return true,
                Ok(_) => {}
                Err(_) => return false,
            }
        }
    })
    .await;
    match drained {
        Ok(true) => info!(event = "mqtt_disconnected"),
        _ => debug!(event = "mqtt_disconnect_skipped"),
    }
}

fn mqtt_options(config: &FeedConfig) -> std::io::Result<MqttOptions> {
    let client_id = config
        .client_id
        .clone()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| format!("meshmon-{}", std::process::id()));
    let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
    options.set_keep_alive(Duration::from_secs(
        config.keep_alive_secs.max(MIN_KEEP_ALIVE_SECS),
    ));
    if let Some(username) = config.username.as_deref() {
        let password = config.password.clone().unwrap_or_default();
        options.set_credentials(username, password);
    }
    if config.tls {
        let transport = match config.ca_file.as_deref() {
            Some(path) => {
                let ca = std::fs::read(path)?;
                Transport::tls(ca, None, None)
            }
            None => Transport::tls_with_default_config(),
        };
        options.set_transport(transport);
    }
    Ok(options)
}

async fn replay_loop(
    path: &Path,
    interval: Option<Duration>,
    tx: &mpsc::Sender<FeedEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let input: Box<dyn AsyncRead + Unpin + Send> = if path.as_os_str() == "-" {
        Box::new(tokio::io::stdin())
    } else {
        Box::new(tokio::fs::File::open(path).await?)
    };
    info!(event = "replay_start", path = %path.display());
    let _ = tx.send(FeedEvent::Connected).await;

    // Lines stay raw bytes; bad encoding is the decoder's call, per message.
    let mut lines = BufReader::new(input).split(b'\n');
    let mut sent = 0usize;
    loop {
        let line = tokio::select! {
            _ = shutdown.changed() => return Ok(()),
            line = lines.next_segment() => line?,
        };
        let Some(mut line) = line else {
            break;
        };
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        if tx.send(FeedEvent::Message(line)).await.is_err() {
            return Ok(());
        }
        sent += 1;
        if let Some(interval) = interval {
            tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    info!(event = "replay_finished", messages = sent);
    let _ = tx
        .send(FeedEvent::Disconnected {
            reason: "replay finished".to_string(),
        })
        .await;
    Ok(())
}

fn next_backoff(current: Duration) -> Duration {
    let next = current + current;
    if next > Duration::from_secs(10) {
        Duration::from_secs(10)
    } else {
        next
    }
}
