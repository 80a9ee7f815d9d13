//! End-to-end relay tests over a real WebSocket, using the loopback engine

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use storefront_relay::agent::LoopbackEngine;
use storefront_relay::config::Config;
use storefront_relay::gateway::serve_on;
use storefront_relay::relay::RelayContext;
use storefront_relay::tools::{StaticProfileProvider, Tool, ToolPipeline, ToolRegistry};
use storefront_relay::Result;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Tool returning a fixed result and counting its invocations
struct FixedTool {
    name: &'static str,
    result: Value,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for FixedTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Returns a canned result"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _args: Value) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

struct Harness {
    addr: SocketAddr,
    lookups: Arc<AtomicUsize>,
    _shutdown: oneshot::Sender<()>,
}

async fn start() -> Harness {
    let config = Config::default();
    let lookups = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::new();
    registry.register(FixedTool {
        name: "set_theme",
        result: json!({"action": "set_theme", "theme": "dark"}),
        calls: Arc::new(AtomicUsize::new(0)),
    });
    registry.register(FixedTool {
        name: "show_shipping",
        result: json!({
            "action": "display_ui",
            "ui_element": "shipping_options",
            "payload": {"options": ["standard", "express"]}
        }),
        calls: Arc::new(AtomicUsize::new(0)),
    });
    registry.register(FixedTool {
        name: "lookup_orders",
        result: json!({"orders": []}),
        calls: lookups.clone(),
    });

    let pipeline = ToolPipeline::from_config(
        &config.guard,
        registry,
        Arc::new(StaticProfileProvider::with_demo_customer(
            &config.guard.default_customer_id,
        )),
    );
    let relay = Arc::new(RelayContext::new(
        &config,
        Arc::new(LoopbackEngine::new()),
        Arc::new(pipeline),
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = config.server.clone();
    tokio::spawn(async move {
        serve_on(listener, relay, &server, async {
            let _ = shutdown_rx.await;
        })
        .await
    });

    Harness {
        addr,
        lookups,
        _shutdown: shutdown_tx,
    }
}

async fn connect(addr: SocketAddr, session_id: &str) -> Client {
    let url = format!("ws://{}/ws/agent_stream/{}?is_audio=false", addr, session_id);
    let (client, _) = connect_async(url).await.unwrap();
    client
}

async fn send_text(client: &mut Client, text: &str) {
    let frame = json!({"mime_type": "text/plain", "data": text}).to_string();
    client.send(Message::text(frame)).await.unwrap();
}

/// Read JSON frames up to and including the next `turn_complete` status
async fn read_turn(client: &mut Client) -> Vec<Value> {
    let mut frames = Vec::new();
    loop {
        let next = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("relay went quiet")
            .expect("socket closed")
            .unwrap();
        let Message::Text(text) = next else {
            continue;
        };
        let value: Value = serde_json::from_str(text.as_str()).unwrap();
        let done = value["turn_complete"] == json!(true);
        frames.push(value);
        if done {
            return frames;
        }
    }
}

fn turn_done() -> Value {
    json!({"turn_complete": true, "interrupted": false, "interaction_completed": false})
}

#[tokio::test]
async fn text_is_echoed_and_turn_completes() {
    let harness = start().await;
    let mut client = connect(harness.addr, "echo").await;

    client.send(Message::text("client_ready")).await.unwrap();
    send_text(&mut client, "hello there").await;

    assert_eq!(
        read_turn(&mut client).await,
        vec![json!({"mime_type": "text/plain", "data": "hello there"}), turn_done()]
    );
}

#[tokio::test]
async fn theme_tool_result_becomes_command_frame() {
    let harness = start().await;
    let mut client = connect(harness.addr, "theme").await;

    send_text(&mut client, "/tool set_theme {}").await;

    assert_eq!(
        read_turn(&mut client).await,
        vec![
            json!({"type": "command", "command_name": "set_theme", "payload": {"theme": "dark"}}),
            turn_done(),
        ]
    );
}

#[tokio::test]
async fn display_ui_result_is_delivered_before_next_turn() {
    let harness = start().await;
    let mut client = connect(harness.addr, "deferred").await;

    send_text(&mut client, "/tool show_shipping {}").await;
    // The staged result is hidden from the model and nothing is shown yet.
    assert_eq!(read_turn(&mut client).await, vec![turn_done()]);

    send_text(&mut client, "which one?").await;
    assert_eq!(
        read_turn(&mut client).await,
        vec![
            json!({
                "type": "ui_command",
                "command_name": "shipping_options",
                "payload": {"options": ["standard", "express"]}
            }),
            json!({"mime_type": "text/plain", "data": "which one?"}),
            turn_done(),
        ]
    );
}

#[tokio::test]
async fn foreign_customer_id_never_reaches_the_tool() {
    let harness = start().await;
    let mut client = connect(harness.addr, "identity").await;

    send_text(&mut client, r#"/tool lookup_orders {"customer_id": "999"}"#).await;
    assert_eq!(read_turn(&mut client).await, vec![turn_done()]);
    assert_eq!(harness.lookups.load(Ordering::SeqCst), 0);

    send_text(&mut client, "/tool lookup_orders {}").await;
    read_turn(&mut client).await;
    assert_eq!(harness.lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn client_close_ends_the_session() {
    let harness = start().await;
    let mut client = connect(harness.addr, "closing").await;

    send_text(&mut client, "ping").await;
    read_turn(&mut client).await;
    client.close(None).await.unwrap();

    // The relay answers with its own close and then the stream ends.
    let rest = tokio::time::timeout(Duration::from_secs(5), async {
        let mut frames = Vec::new();
        while let Some(Ok(frame)) = client.next().await {
            frames.push(frame);
        }
        frames
    })
    .await
    .expect("relay did not finish the close handshake");
    assert!(rest.iter().all(|frame| matches!(frame, Message::Close(_))));
}
