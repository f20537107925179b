use std::{
    io::ErrorKind,
    net::SocketAddr,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
    time::{Duration, Instant},
};

use anyhow::Context;
use axum::{extract::State, routing::get, Json, Router};
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use serde_json::Value;
use tokio::{
    net::TcpListener,
    sync::mpsc::{self, error::TryRecvError},
};
use tracing::{debug, info, warn};

use heatpump_common::{
    adopt::adoption_json, packet::log_line, Bridge, ClimateDiscovery, HeatPumpDriver,
    NetworkConfig, OutboundMessage, PublishError, Publisher, RuntimeConfig, Topics,
};

use crate::simulator::SimulatedHeatPump;

const MAX_MQTT_PAYLOAD_BYTES: usize = 512;
const INBOUND_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Inbound {
    topic: String,
    payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InboundKind {
    Config,
    Command,
}

#[derive(Clone)]
struct AppStore {
    runtime_path: Arc<PathBuf>,
}

/// Publishes bridge records without waiting on the event loop. While the
/// broker is down every publish is refused so callers can retry later.
struct MqttPublisher {
    client: AsyncClient,
    topics: Topics,
    connected: Arc<AtomicBool>,
}

impl Publisher for MqttPublisher {
    fn publish(&mut self, message: OutboundMessage) -> Result<(), PublishError> {
        if !self.connected.load(Ordering::Relaxed) {
            return Err(PublishError::NotConnected);
        }

        let payload = message.payload()?;
        let topic = message.topic(&self.topics).to_string();
        self.client
            .try_publish(topic, QoS::AtMostOnce, message.retain(), payload)
            .map_err(|err| PublishError::Transport(err.to_string()))
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = AppStore::new();
    let mut runtime = store.load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err:#}");
        RuntimeConfig::default()
    });
    apply_env_overrides(&mut runtime.network, |key| std::env::var(key).ok());
    runtime.sanitize();

    let topics = Topics::new(&runtime.network);
    let adoption = Arc::new(adoption_json(&runtime.network));

    let mut mqtt_options = MqttOptions::new(
        runtime.network.client_id.clone(),
        runtime.network.mqtt_host.clone(),
        runtime.network.mqtt_port,
    );
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    if !runtime.network.mqtt_user.is_empty() {
        mqtt_options.set_credentials(
            runtime.network.mqtt_user.clone(),
            runtime.network.mqtt_pass.clone(),
        );
    }

    let (mqtt, eventloop) = AsyncClient::new(mqtt_options, INBOUND_QUEUE_DEPTH);
    let connected = Arc::new(AtomicBool::new(false));
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);

    spawn_mqtt_loop(
        eventloop,
        mqtt.clone(),
        topics.clone(),
        adoption.clone(),
        connected.clone(),
        inbound_tx,
    );
    spawn_http_server(runtime.network.http_port, adoption).await?;

    let discovery = ClimateDiscovery::new(&topics, &runtime.network.client_id, &runtime.device);
    let publisher = MqttPublisher {
        client: mqtt,
        topics: topics.clone(),
        connected,
    };
    let bridge = Bridge::new(
        &runtime.bridge,
        runtime.options,
        discovery,
        SimulatedHeatPump::new(),
        publisher,
        monotonic_ms(),
    );

    info!(
        "heat pump bridge running as '{}' against {}:{}",
        runtime.network.client_id, runtime.network.mqtt_host, runtime.network.mqtt_port
    );
    run_control_loop(
        bridge,
        topics,
        inbound_rx,
        Duration::from_millis(runtime.bridge.tick_interval_ms),
    )
    .await
}

async fn run_control_loop(
    mut bridge: Bridge<SimulatedHeatPump, MqttPublisher>,
    topics: Topics,
    mut inbound: mpsc::Receiver<Inbound>,
    tick_interval: Duration,
) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            result = &mut shutdown => {
                result.context("failed to listen for shutdown signal")?;
                info!("shutdown requested");
                return Ok(());
            }
        }

        loop {
            match inbound.try_recv() {
                Ok(message) => {
                    if handle_inbound(&mut bridge, &topics, message, monotonic_ms()) {
                        info!("restart requested over mqtt, exiting");
                        return Ok(());
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    anyhow::bail!("mqtt task stopped");
                }
            }
        }

        bridge.tick(monotonic_ms());
    }
}

/// Routes one inbound message into the bridge. Returns `true` when the
/// process should restart.
fn handle_inbound<D, P>(
    bridge: &mut Bridge<D, P>,
    topics: &Topics,
    message: Inbound,
    now_ms: u64,
) -> bool
where
    D: HeatPumpDriver,
    P: Publisher,
{
    if message.payload.len() > MAX_MQTT_PAYLOAD_BYTES {
        warn!(
            "dropping oversized MQTT payload on topic {} ({} bytes)",
            message.topic,
            message.payload.len()
        );
        return false;
    }

    match classify_topic(topics, &message.topic) {
        Some(InboundKind::Config) => {
            if let Err(err) = bridge.handle_config(&message.payload) {
                warn!("invalid config payload: {err}");
            }
            false
        }
        Some(InboundKind::Command) => match bridge.handle_command(&message.payload, now_ms) {
            Ok(outcome) => {
                debug!("command handled: {outcome:?}");
                outcome.restart_requested
            }
            Err(err) => {
                warn!("invalid command payload: {err}");
                false
            }
        },
        None => {
            debug!("ignoring message on unexpected topic {}", message.topic);
            false
        }
    }
}

fn classify_topic(topics: &Topics, topic: &str) -> Option<InboundKind> {
    if topic == topics.config {
        Some(InboundKind::Config)
    } else if topic == topics.command {
        Some(InboundKind::Command)
    } else {
        None
    }
}

fn spawn_mqtt_loop(
    mut eventloop: EventLoop,
    mqtt: AsyncClient,
    topics: Topics,
    adoption: Arc<Value>,
    connected: Arc<AtomicBool>,
    inbound: mpsc::Sender<Inbound>,
) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    let message = Inbound {
                        topic: message.topic,
                        payload: message.payload.to_vec(),
                    };
                    if inbound.send(message).await.is_err() {
                        warn!("control loop gone, stopping mqtt task");
                        break;
                    }
                }
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("mqtt connected");
                    connected.store(true, Ordering::Relaxed);
                    if let Err(err) = on_connect(&mqtt, &topics, &adoption) {
                        warn!("mqtt connect setup failed: {err:#}");
                    }
                }
                Ok(Event::Incoming(Incoming::Disconnect)) => {
                    warn!("mqtt disconnected by broker");
                    connected.store(false, Ordering::Relaxed);
                }
                Ok(_) => {}
                Err(err) => {
                    connected.store(false, Ordering::Relaxed);
                    warn!("mqtt poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}

fn on_connect(mqtt: &AsyncClient, topics: &Topics, adoption: &Value) -> anyhow::Result<()> {
    for topic in [&topics.config, &topics.command] {
        mqtt.try_subscribe(topic.as_str(), QoS::AtMostOnce)
            .with_context(|| format!("failed to subscribe to {topic}"))?;
    }

    let payload = serde_json::to_vec(adoption).context("failed to serialize adoption document")?;
    mqtt.try_publish(topics.adopt.as_str(), QoS::AtLeastOnce, true, payload)
        .context("failed to publish adoption document")?;
    mqtt.try_publish(
        topics.log.as_str(),
        QoS::AtMostOnce,
        false,
        log_line("mqtt connected"),
    )
    .context("failed to publish connect log line")?;
    Ok(())
}

async fn spawn_http_server(port: u16, adoption: Arc<Value>) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/adopt", get(handle_get_adopt))
        .with_state(adoption);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind adoption server at {addr}"))?;

    info!("adoption endpoint on http://{addr}/adopt");
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            warn!("http server stopped: {err}");
        }
    });
    Ok(())
}

async fn handle_get_adopt(State(adoption): State<Arc<Value>>) -> Json<Value> {
    Json(adoption.as_ref().clone())
}

impl AppStore {
    fn new() -> Self {
        let data_dir = std::env::var("HEATPUMP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.heatpump"));

        Self {
            runtime_path: Arc::new(data_dir.join("runtime.json")),
        }
    }

    async fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        match tokio::fs::read(self.runtime_path.as_ref()).await {
            Ok(raw) => serde_json::from_slice::<RuntimeConfig>(&raw).with_context(|| {
                format!("invalid runtime config at {}", self.runtime_path.display())
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }
}

fn apply_env_overrides<F>(network: &mut NetworkConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("MQTT_HOST") {
        network.mqtt_host = host;
    }
    if let Some(port) = lookup("MQTT_PORT").and_then(|value| value.parse::<u16>().ok()) {
        network.mqtt_port = port;
    }
    if let Some(user) = lookup("MQTT_USER") {
        network.mqtt_user = user;
    }
    if let Some(pass) = lookup("MQTT_PASS") {
        network.mqtt_pass = pass;
    }
    if let Some(client_id) = lookup("MQTT_CLIENT_ID") {
        network.client_id = client_id;
    }
    if let Some(port) = lookup("HEATPUMP_HTTP_PORT").and_then(|value| value.parse::<u16>().ok()) {
        network.http_port = port;
    }
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatpump_common::{BridgeConfig, DesiredSettings, DeviceInfo, NetworkConfig, RuntimeOptions};
    use std::{cell::RefCell, collections::HashMap, rc::Rc};

    /// Keeps the log lines the bridge publishes where the test can see them.
    #[derive(Clone, Default)]
    struct SharedLog(Rc<RefCell<Vec<String>>>);

    impl Publisher for SharedLog {
        fn publish(&mut self, message: OutboundMessage) -> Result<(), PublishError> {
            if let OutboundMessage::Diagnostic(diagnostic) = &message {
                self.0.borrow_mut().push(diagnostic.log_line());
            }
            Ok(())
        }
    }

    fn simulated_bridge(log: &SharedLog) -> (Bridge<SimulatedHeatPump, SharedLog>, Topics) {
        let network = NetworkConfig::default();
        let topics = Topics::new(&network);
        let bridge = Bridge::new(
            &BridgeConfig::default(),
            RuntimeOptions {
                discovery_enabled: false,
                ..RuntimeOptions::default()
            },
            ClimateDiscovery::new(&topics, &network.client_id, &DeviceInfo::default()),
            SimulatedHeatPump::new(),
            log.clone(),
            0,
        );
        (bridge, topics)
    }

    fn inbound(topic: &str, payload: &str) -> Inbound {
        Inbound {
            topic: topic.to_string(),
            payload: payload.as_bytes().to_vec(),
        }
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    // The event loop owns the request queue, so it has to outlive the test.
    fn publisher(connected: bool) -> (MqttPublisher, EventLoop) {
        let (client, eventloop) =
            AsyncClient::new(MqttOptions::new("test", "127.0.0.1", 1883), 8);
        let publisher = MqttPublisher {
            client,
            topics: Topics::new(&NetworkConfig::default()),
            connected: Arc::new(AtomicBool::new(connected)),
        };
        (publisher, eventloop)
    }

    #[test]
    fn env_overrides_replace_network_fields() {
        let mut network = NetworkConfig::default();

        apply_env_overrides(
            &mut network,
            lookup_from(&[
                ("MQTT_HOST", "broker.lan"),
                ("MQTT_PORT", "8883"),
                ("MQTT_CLIENT_ID", "lounge-hp"),
                ("HEATPUMP_HTTP_PORT", "9090"),
            ]),
        );

        assert_eq!(network.mqtt_host, "broker.lan");
        assert_eq!(network.mqtt_port, 8883);
        assert_eq!(network.client_id, "lounge-hp");
        assert_eq!(network.http_port, 9090);
        assert!(network.mqtt_user.is_empty());
    }

    #[test]
    fn unparsable_ports_keep_stored_values() {
        let mut network = NetworkConfig::default();

        apply_env_overrides(&mut network, lookup_from(&[("MQTT_PORT", "eighty")]));

        assert_eq!(network.mqtt_port, 1883);
    }

    #[test]
    fn classifies_only_subscribed_topics() {
        let topics = Topics::new(&NetworkConfig::default());

        assert_eq!(
            classify_topic(&topics, "conf/heatpump"),
            Some(InboundKind::Config)
        );
        assert_eq!(
            classify_topic(&topics, "cmnd/heatpump"),
            Some(InboundKind::Command)
        );
        assert_eq!(classify_topic(&topics, "stat/heatpump"), None);
    }

    #[test]
    fn publisher_refuses_while_disconnected() {
        let (mut publisher, _eventloop) = publisher(false);

        let result = publisher.publish(OutboundMessage::Status(DesiredSettings::default()));

        assert_eq!(result, Err(PublishError::NotConnected));
    }

    #[test]
    fn publisher_queues_when_connected() {
        let (mut publisher, _eventloop) = publisher(true);

        let result = publisher.publish(OutboundMessage::Status(DesiredSettings::default()));

        assert_eq!(result, Ok(()));
    }

    #[test]
    fn restart_command_asks_to_exit() {
        let log = SharedLog::default();
        let (mut bridge, topics) = simulated_bridge(&log);

        assert!(handle_inbound(
            &mut bridge,
            &topics,
            inbound(&topics.command, r#"{"restart": true}"#),
            0,
        ));
    }

    #[test]
    fn oversized_payloads_are_dropped() {
        let log = SharedLog::default();
        let (mut bridge, topics) = simulated_bridge(&log);
        let padding = " ".repeat(MAX_MQTT_PAYLOAD_BYTES);

        let restart = handle_inbound(
            &mut bridge,
            &topics,
            inbound(&topics.command, &format!(r#"{{"restart": true}}{padding}"#)),
            0,
        );

        assert!(!restart);
    }

    #[test]
    fn config_only_applies_from_config_topic() {
        let log = SharedLog::default();
        let (mut bridge, topics) = simulated_bridge(&log);
        let custom = r#"{"custom": "fc 42"}"#;

        handle_inbound(&mut bridge, &topics, inbound(&topics.command, r#"{"debug": true}"#), 0);
        handle_inbound(&mut bridge, &topics, inbound(&topics.command, custom), 1);
        assert!(log.0.borrow().is_empty());

        handle_inbound(&mut bridge, &topics, inbound(&topics.config, r#"{"debug": true}"#), 2);
        handle_inbound(&mut bridge, &topics, inbound(&topics.command, custom), 3);
        assert_eq!(*log.0.borrow(), vec!["[hpmp] [customPacket] FC 42".to_string()]);
    }

    #[test]
    fn other_topics_are_ignored() {
        let log = SharedLog::default();
        let (mut bridge, topics) = simulated_bridge(&log);

        handle_inbound(&mut bridge, &topics, inbound(&topics.config, r#"{"debug": true}"#), 0);
        let restart = handle_inbound(
            &mut bridge,
            &topics,
            inbound(&topics.status, r#"{"custom": "fc 42", "restart": true}"#),
            1,
        );

        assert!(!restart);
        assert!(log.0.borrow().is_empty());
    }
}
