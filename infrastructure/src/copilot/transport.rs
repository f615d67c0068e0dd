//! Transport demultiplexer for concurrent copilot sessions.
//!
//! The CLI speaks JSON-RPC 2.0 over a **single TCP connection**, but one
//! deliberation run needs several sessions at once (one per copilot agent
//! plus one per judge, plus the chairman). [`CopilotTransport`] runs a
//! single background reader task that owns the TCP read-half exclusively
//! and routes incoming messages to the correct [`SessionChannel`] by
//! `session_id`; request/response pairs are correlated through `oneshot`
//! channels.
//!
//! The transport is process-wide state: [`shared_transport`] lazily spawns
//! it once, and concurrent first callers await the same in-flight
//! initialization instead of racing to start N server processes.

use crate::copilot::error::{CopilotError, Result};
use crate::copilot::protocol::{
    CreateSessionParams, JsonRpcErrorReply, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
};
use std::collections::HashMap;
use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, OnceCell, RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Timeout for session creation (waiting for `session.start`).
const SESSION_CREATE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Process-wide shared transport, initialized on first use.
static SHARED: OnceCell<Arc<CopilotTransport>> = OnceCell::const_new();

/// Get the shared transport, spawning the CLI server on first call.
///
/// Concurrent first callers collapse into one initialization: later
/// callers await the in-flight spawn rather than starting redundant
/// server processes.
pub async fn shared_transport() -> Result<Arc<CopilotTransport>> {
    SHARED
        .get_or_try_init(|| async { CopilotTransport::spawn().await })
        .await
        .cloned()
}

/// Tear down the shared transport's server process, if one was started.
///
/// Called on whole-app shutdown; sessions created afterwards will fail
/// with [`CopilotError::RouterStopped`].
pub async fn shutdown_shared() {
    if let Some(transport) = SHARED.get() {
        transport.shutdown().await;
    }
}

/// Classification of an incoming JSON-RPC message.
#[derive(Debug, PartialEq, Eq)]
enum MessageKind {
    /// A response to a request we sent (has `id`, no `method`).
    Response,
    /// An incoming request from the CLI (has `id` + `method`).
    IncomingRequest { id: u64 },
    /// A notification (has `method`, no `id`).
    Notification,
}

/// Classify a JSON-RPC message by inspecting `id` and `method` fields.
fn classify_message(json: &serde_json::Value) -> MessageKind {
    let has_id = json.get("id").and_then(|v| v.as_u64());
    let has_method = json.get("method").and_then(|v| v.as_str());

    match (has_id, has_method) {
        (Some(id), Some(_)) => MessageKind::IncomingRequest { id },
        (Some(_), None) => MessageKind::Response,
        _ => MessageKind::Notification,
    }
}

/// A `session.event` routed to one session's channel.
#[derive(Debug)]
pub struct RoutedEvent {
    pub event_type: String,
    pub event: serde_json::Value,
}

/// Extract the text payload of an `assistant.message.delta` event.
pub fn extract_delta_text(event: &serde_json::Value) -> Option<&str> {
    event
        .get("data")
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
        .filter(|s| !s.is_empty())
}

/// Information extracted from a `session.start` event.
#[derive(Debug)]
struct SessionStartEvent {
    session_id: String,
}

/// A per-session channel for receiving routed events.
///
/// When dropped, the session is automatically deregistered from the
/// transport's routing table.
pub struct SessionChannel {
    rx: mpsc::UnboundedReceiver<RoutedEvent>,
    session_id: String,
    transport: Arc<CopilotTransport>,
}

impl SessionChannel {
    /// Receive the next routed event, blocking until one arrives.
    ///
    /// Returns [`CopilotError::RouterStopped`] if the background reader
    /// task has ended (TCP disconnection or CLI crash).
    pub async fn recv(&mut self) -> Result<RoutedEvent> {
        self.rx.recv().await.ok_or(CopilotError::RouterStopped)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Drop for SessionChannel {
    fn drop(&mut self) {
        self.transport.deregister_session(&self.session_id);
    }
}

/// Source of routed events for a consuming loop.
///
/// [`SessionChannel`] is the production source; the provider and gateway
/// event loops are written against this seam so their terminal behavior
/// (idle, inactivity, cancellation) is testable with scripted sequences.
pub(crate) trait SessionEvents: Send {
    fn next_event(&mut self) -> impl Future<Output = Result<RoutedEvent>> + Send;
}

impl SessionEvents for SessionChannel {
    async fn next_event(&mut self) -> Result<RoutedEvent> {
        self.recv().await
    }
}

type Routes = Arc<std::sync::RwLock<HashMap<String, mpsc::UnboundedSender<RoutedEvent>>>>;

/// Central transport that demultiplexes one TCP connection across
/// concurrent copilot sessions.
pub struct CopilotTransport {
    /// Background reader task handle.
    _reader_handle: JoinHandle<()>,

    /// Session-specific event channels (session_id -> sender).
    ///
    /// `std::sync::RwLock` (not tokio's) so [`deregister_session`](Self::deregister_session)
    /// can be called synchronously from [`SessionChannel::drop`]. Held only
    /// for HashMap insert/remove.
    routes: Routes,

    /// Request-response correlation (request_id -> oneshot sender).
    pending_responses: Arc<RwLock<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>,

    /// Channel for session.start events (consumed during session creation).
    _session_start_tx: mpsc::UnboundedSender<SessionStartEvent>,
    session_start_rx: Mutex<mpsc::UnboundedReceiver<SessionStartEvent>>,

    /// Serializes session creation so concurrent `session.create` requests
    /// cannot confuse which `session.start` belongs to which caller.
    create_lock: Mutex<()>,

    /// Writer (serialized writes). Shared with the reader loop, which
    /// answers CLI-initiated requests.
    writer: Arc<Mutex<BufWriter<OwnedWriteHalf>>>,

    /// CLI child process, killed on shutdown/drop to prevent orphans.
    child: Mutex<Option<Child>>,
}

impl CopilotTransport {
    /// Spawn the copilot CLI (`copilot --server`) and build the transport.
    pub async fn spawn() -> Result<Arc<Self>> {
        Self::spawn_with_command("copilot").await
    }

    /// Spawn with a custom command (useful for testing).
    pub async fn spawn_with_command(cmd: &str) -> Result<Arc<Self>> {
        debug!("Spawning copilot CLI: {} --server", cmd);

        let mut cmd = Command::new(cmd);
        cmd.arg("--server")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        // Linux: kernel sends SIGTERM to the child when this process dies,
        // covering paths where Drop never runs (SIGKILL, OOM kill).
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd.spawn()?;

        let stdout = child.stdout.take().ok_or_else(|| {
            CopilotError::Spawn(std::io::Error::other("Failed to capture stdout"))
        })?;

        let mut stdout_reader = BufReader::new(stdout);
        let mut line = String::new();

        let port: u16 = loop {
            line.clear();
            let bytes_read = stdout_reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                return Err(CopilotError::UnexpectedResponse(
                    "copilot CLI exited without announcing port".into(),
                ));
            }

            let trimmed = line.trim();
            debug!("copilot CLI output: {}", trimmed);

            if let Some(port_str) = trimmed.strip_prefix("CLI server listening on port ") {
                match port_str.trim().parse::<u16>() {
                    Ok(p) => break p,
                    Err(_) => {
                        return Err(CopilotError::UnexpectedResponse(format!(
                            "Failed to parse port number: {port_str}"
                        )));
                    }
                }
            }
        };

        info!("copilot CLI listening on port {}, connecting...", port);

        let stream = TcpStream::connect(format!("127.0.0.1:{port}")).await?;
        let (read_half, write_half) = stream.into_split();

        let routes: Routes = Arc::new(std::sync::RwLock::new(HashMap::new()));
        let pending_responses: Arc<RwLock<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>> =
            Arc::new(RwLock::new(HashMap::new()));
        let (session_start_tx, session_start_rx) = mpsc::unbounded_channel();

        let writer = Arc::new(Mutex::new(BufWriter::new(write_half)));

        let routes_bg = Arc::clone(&routes);
        let pending_bg = Arc::clone(&pending_responses);
        let start_tx_bg = session_start_tx.clone();
        let writer_bg = Arc::clone(&writer);

        let reader_handle = tokio::spawn(async move {
            Self::reader_loop(read_half, routes_bg, pending_bg, start_tx_bg, writer_bg).await;
        });

        Ok(Arc::new(Self {
            _reader_handle: reader_handle,
            routes,
            pending_responses,
            _session_start_tx: session_start_tx,
            session_start_rx: Mutex::new(session_start_rx),
            create_lock: Mutex::new(()),
            writer,
            child: Mutex::new(Some(child)),
        }))
    }

    /// Background reader loop, single owner of the TCP read half.
    ///
    /// When the loop exits all senders are dropped, so receivers observe
    /// closure and surface [`CopilotError::RouterStopped`].
    async fn reader_loop(
        read_half: OwnedReadHalf,
        routes: Routes,
        pending_responses: Arc<RwLock<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>,
        session_start_tx: mpsc::UnboundedSender<SessionStartEvent>,
        writer: Arc<Mutex<BufWriter<OwnedWriteHalf>>>,
    ) {
        let mut reader = BufReader::new(read_half);
        let mut line = String::new();

        loop {
            let content_length: usize =
                match Self::read_content_length(&mut reader, &mut line).await {
                    Ok(len) => len,
                    Err(e) => {
                        warn!("Reader loop: failed to read content length: {}", e);
                        break;
                    }
                };

            // Skip the empty line after headers
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        warn!("Reader loop: connection closed during header skip");
                        return;
                    }
                    Ok(_) => {
                        if line.trim().is_empty() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Reader loop: read error during header skip: {}", e);
                        return;
                    }
                }
            }

            let mut body = vec![0u8; content_length];
            if let Err(e) = reader.read_exact(&mut body).await {
                warn!("Reader loop: failed to read body: {}", e);
                break;
            }

            let json_value: serde_json::Value = match serde_json::from_slice(&body) {
                Ok(v) => v,
                Err(e) => {
                    warn!(
                        "Transport: failed to parse JSON: {}: {}",
                        e,
                        String::from_utf8_lossy(&body)
                    );
                    continue;
                }
            };

            match classify_message(&json_value) {
                MessageKind::Response => {
                    if let Some(id) = json_value.get("id").and_then(|v| v.as_u64()) {
                        let response: JsonRpcResponse = match serde_json::from_value(json_value) {
                            Ok(r) => r,
                            Err(e) => {
                                warn!("Transport: failed to parse response: {}", e);
                                continue;
                            }
                        };
                        let sender = {
                            let mut pending = pending_responses.write().await;
                            pending.remove(&id)
                        };
                        if let Some(tx) = sender {
                            let _ = tx.send(response);
                        } else {
                            debug!("Transport: no pending receiver for response id={}", id);
                        }
                    }
                }

                // Sessions declare an empty tool surface, so incoming
                // requests (tool.call) have nothing to route to. Answer
                // with method-not-found so the server's call settles now
                // instead of stalling the turn into the inactivity timeout.
                MessageKind::IncomingRequest { id } => {
                    let method = json_value
                        .get("method")
                        .and_then(|v| v.as_str())
                        .unwrap_or("");
                    debug!(
                        "Transport: rejecting incoming request method={} id={}",
                        method, id
                    );
                    let reply = JsonRpcErrorReply::method_not_found(id, method);
                    match serde_json::to_string(&reply) {
                        Ok(payload) => {
                            if let Err(e) = Self::write_frame(&writer, &payload).await {
                                warn!("Transport: failed to send error reply: {}", e);
                            }
                        }
                        Err(e) => warn!("Transport: failed to serialize error reply: {}", e),
                    }
                }

                MessageKind::Notification => {
                    let notification: JsonRpcNotification = match serde_json::from_value(json_value)
                    {
                        Ok(n) => n,
                        Err(e) => {
                            warn!("Transport: failed to parse notification: {}", e);
                            continue;
                        }
                    };

                    if notification.method != "session.event" {
                        trace!(
                            "Transport: ignoring notification method={}",
                            notification.method
                        );
                        continue;
                    }

                    let Some(params) = notification.params else {
                        continue;
                    };
                    let session_id = params
                        .get("sessionId")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string());
                    let event = params.get("event").cloned();

                    if let (Some(sid), Some(ev)) = (session_id, event) {
                        let event_type = ev
                            .get("type")
                            .and_then(|t| t.as_str())
                            .unwrap_or("")
                            .to_string();

                        if event_type == "session.start" {
                            debug!("Transport: session.start for {}", sid);
                            let _ = session_start_tx.send(SessionStartEvent { session_id: sid });
                            continue;
                        }

                        let routes_read = routes.read().unwrap_or_else(|e| e.into_inner());
                        if let Some(tx) = routes_read.get(&sid) {
                            let _ = tx.send(RoutedEvent {
                                event_type,
                                event: ev,
                            });
                        } else {
                            debug!(
                                "Transport: no route for session_id={}, dropping event type={}",
                                sid, event_type
                            );
                        }
                    } else {
                        debug!("Transport: session.event without sessionId/event");
                    }
                }
            }
        }

        info!("Transport: reader loop ended, closing all session channels");
        {
            let mut routes_w = routes.write().unwrap_or_else(|e| e.into_inner());
            routes_w.clear();
        }
        {
            let mut pending_w = pending_responses.write().await;
            pending_w.clear();
        }
    }

    /// Read the Content-Length header value.
    async fn read_content_length(
        reader: &mut BufReader<OwnedReadHalf>,
        line: &mut String,
    ) -> Result<usize> {
        loop {
            line.clear();
            let bytes_read = reader.read_line(line).await?;
            if bytes_read == 0 {
                return Err(CopilotError::TransportClosed);
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(len_str) = trimmed.strip_prefix("Content-Length:")
                && let Ok(len) = len_str.trim().parse::<usize>()
            {
                return Ok(len);
            }
        }
    }

    /// Create a new session and return its ID + channel.
    ///
    /// Serialized via `create_lock`: the `session.start` event carries no
    /// request correlation, so only one creation may be in flight.
    pub async fn create_session(
        self: &Arc<Self>,
        params: CreateSessionParams,
    ) -> Result<SessionChannel> {
        let _guard = self.create_lock.lock().await;

        let request = JsonRpcRequest::new("session.create", Some(serde_json::to_value(&params)?));
        self.send_request(&request).await?;

        let start_event = {
            let mut rx = self.session_start_rx.lock().await;
            match tokio::time::timeout(SESSION_CREATE_TIMEOUT, rx.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) => return Err(CopilotError::RouterStopped),
                Err(_) => {
                    return Err(CopilotError::Timeout(
                        "session.create timed out waiting for session.start".into(),
                    ));
                }
            }
        };

        let session_id = start_event.session_id;
        debug!("Transport: session created: {}", session_id);

        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
            routes.insert(session_id.clone(), tx);
        }

        Ok(SessionChannel {
            rx,
            session_id,
            transport: Arc::clone(self),
        })
    }

    /// Send a JSON-RPC request and wait for the correlated response.
    pub async fn request(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        let (tx, rx) = oneshot::channel();
        let request_id = request.id;

        {
            let mut pending = self.pending_responses.write().await;
            pending.insert(request_id, tx);
        }

        if let Err(e) = self.send_request(request).await {
            let mut pending = self.pending_responses.write().await;
            pending.remove(&request_id);
            return Err(e);
        }

        rx.await.map_err(|_| CopilotError::RouterStopped)
    }

    /// Send a JSON-RPC request without waiting (fire-and-forget).
    ///
    /// `session.create` answers with an asynchronous `session.start` event
    /// rather than a direct response.
    pub async fn send_request(&self, request: &JsonRpcRequest) -> Result<()> {
        let request_json = serde_json::to_string(request)?;
        trace!("Transport sending: {}", request_json);
        Self::write_frame(&self.writer, &request_json).await?;
        Ok(())
    }

    /// Write one Content-Length framed payload.
    async fn write_frame(
        writer: &Mutex<BufWriter<OwnedWriteHalf>>,
        payload: &str,
    ) -> std::io::Result<()> {
        let mut writer = writer.lock().await;
        let header = format!("Content-Length: {}\r\n\r\n", payload.len());
        writer.write_all(header.as_bytes()).await?;
        writer.write_all(payload.as_bytes()).await?;
        writer.flush().await
    }

    /// Deregister a session from the routing table.
    ///
    /// Called automatically by [`SessionChannel::drop`].
    pub fn deregister_session(&self, session_id: &str) {
        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        if routes.remove(session_id).is_some() {
            debug!("Transport: deregistered session {}", session_id);
        }
    }

    /// Kill the CLI server process. Idempotent.
    pub async fn shutdown(&self) {
        let mut child = self.child.lock().await;
        if let Some(mut child) = child.take() {
            debug!("Transport shutdown, killing copilot CLI child process");
            let _ = child.start_kill();
        }
    }
}

impl Drop for CopilotTransport {
    fn drop(&mut self) {
        if let Ok(mut child) = self.child.try_lock()
            && let Some(child) = child.as_mut()
        {
            let _ = child.start_kill();
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted event source: yields its queue in order, then stalls
    /// forever, which is exactly how a silent session looks to a
    /// consuming loop.
    pub(crate) struct ScriptedSession {
        queue: VecDeque<RoutedEvent>,
    }

    impl ScriptedSession {
        pub(crate) fn new(events: Vec<RoutedEvent>) -> Self {
            Self {
                queue: events.into(),
            }
        }

        pub(crate) fn delta(text: &str) -> RoutedEvent {
            RoutedEvent {
                event_type: "assistant.message.delta".to_string(),
                event: serde_json::json!({"type": "assistant.message.delta", "data": {"content": text}}),
            }
        }

        pub(crate) fn completed(text: &str) -> RoutedEvent {
            RoutedEvent {
                event_type: "assistant.message".to_string(),
                event: serde_json::json!({"type": "assistant.message", "data": {"content": text}}),
            }
        }

        pub(crate) fn idle() -> RoutedEvent {
            RoutedEvent {
                event_type: "session.idle".to_string(),
                event: serde_json::json!({"type": "session.idle"}),
            }
        }
    }

    impl SessionEvents for ScriptedSession {
        async fn next_event(&mut self) -> Result<RoutedEvent> {
            match self.queue.pop_front() {
                Some(event) => Ok(event),
                None => std::future::pending().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_response() {
        let json = serde_json::json!({"id": 1, "result": {}});
        assert_eq!(classify_message(&json), MessageKind::Response);
    }

    #[test]
    fn classify_incoming_request() {
        let json = serde_json::json!({"id": 1, "method": "tool.call", "params": {}});
        assert_eq!(
            classify_message(&json),
            MessageKind::IncomingRequest { id: 1 }
        );
    }

    #[test]
    fn classify_notification() {
        let json = serde_json::json!({"method": "session.event", "params": {}});
        assert_eq!(classify_message(&json), MessageKind::Notification);
    }

    #[test]
    fn classify_no_id_no_method() {
        let json = serde_json::json!({"data": "something"});
        assert_eq!(classify_message(&json), MessageKind::Notification);
    }

    #[test]
    fn delta_text_extracted_from_data_content() {
        let event = serde_json::json!({"type": "assistant.message.delta", "data": {"content": "chunk"}});
        assert_eq!(extract_delta_text(&event), Some("chunk"));
    }

    #[test]
    fn empty_delta_text_is_none() {
        let event = serde_json::json!({"data": {"content": ""}});
        assert_eq!(extract_delta_text(&event), None);
        let event = serde_json::json!({"data": {}});
        assert_eq!(extract_delta_text(&event), None);
    }
}
