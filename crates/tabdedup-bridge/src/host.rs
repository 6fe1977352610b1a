//! Native messaging transport: length-prefixed JSON frames over stdio.
//!
//! The browser launches this process and speaks the native-messaging wire
//! format: a u32 little-endian byte length followed by one JSON document.
//! Outbound requests carry sequential ids; the extension answers with
//! `{"id": n, "result": ...}` or `{"id": n, "error": {...}}` and pushes
//! unsolicited `{"event": ...}` frames for the four event streams.
//!
//! A dedicated reader task owns the inbound half and routes frames:
//! responses to their waiting callers via oneshot channels, events into an
//! mpsc the run loop drains with [`NativeMessagingHost::next_event`]. The
//! writer side is shared behind a mutex. Callers therefore never block each
//! other on the read path.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Value, json};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc, oneshot};

use tabdedup_core::types::{TabId, WindowId};

use crate::error::BridgeError;
use crate::events::BrowserEvent;
use crate::registry::TabRegistry;
use crate::script::{InPageScript, ScriptRunner};
use crate::settings::SettingsStore;
use crate::tabs::{TabInfo, TabUpdate};

// ─── Constants ────────────────────────────────────────────────────

/// Sanity cap on inbound frames.
const MAX_INBOUND_FRAME: u32 = 4 * 1024 * 1024;

/// Browsers cap host→extension messages at 1 MB.
const MAX_OUTBOUND_FRAME: usize = 1024 * 1024;

/// Buffered inbound events before the reader backpressures.
const EVENT_CHANNEL_CAPACITY: usize = 64;

// ─── Host ─────────────────────────────────────────────────────────

type PendingMap = HashMap<u64, oneshot::Sender<Result<Value, BridgeError>>>;

/// Native messaging host endpoint. Construction spawns the reader task, so
/// a tokio runtime must be active.
pub struct NativeMessagingHost<W> {
    writer: Mutex<W>,
    pending: Arc<Mutex<PendingMap>>,
    events: Mutex<mpsc::Receiver<BrowserEvent>>,
    next_id: AtomicU64,
}

/// Host wired to this process's stdin/stdout.
pub fn stdio_host() -> NativeMessagingHost<tokio::io::Stdout> {
    NativeMessagingHost::new(tokio::io::stdin(), tokio::io::stdout())
}

impl<W> NativeMessagingHost<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new<R>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let pending: Arc<Mutex<PendingMap>> = Arc::new(Mutex::new(HashMap::new()));
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(read_loop(reader, Arc::clone(&pending), events_tx));
        Self {
            writer: Mutex::new(writer),
            pending,
            events: Mutex::new(events_rx),
            next_id: AtomicU64::new(1),
        }
    }

    /// Next inbound browser event. [`BridgeError::Closed`] once the browser
    /// has closed the pipe — the run loop shuts down on it.
    pub async fn next_event(&self) -> Result<BrowserEvent, BridgeError> {
        let mut rx = self.events.lock().await;
        rx.recv().await.ok_or(BridgeError::Closed)
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, BridgeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let msg = json!({"id": id, "method": method, "params": params});
        let write_result = {
            let mut writer = self.writer.lock().await;
            write_frame(&mut *writer, &msg).await
        };
        if let Err(e) = write_result {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        rx.await.map_err(|_| BridgeError::Closed)?
    }
}

// ─── Reader Task ──────────────────────────────────────────────────

async fn read_loop<R>(
    mut reader: R,
    pending: Arc<Mutex<PendingMap>>,
    events_tx: mpsc::Sender<BrowserEvent>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        match read_frame(&mut reader).await {
            Ok(frame) => {
                if !route_frame(frame, &pending, &events_tx).await {
                    break;
                }
            }
            Err(BridgeError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                tracing::info!("host channel closed");
                break;
            }
            Err(e) => {
                tracing::warn!("host read error: {e}");
                break;
            }
        }
    }

    // Wake every in-flight caller so nothing hangs past the channel's life.
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(BridgeError::Closed));
    }
}

/// Route one inbound frame. Returns `false` when the event receiver is
/// gone and the loop should stop.
async fn route_frame(
    frame: Value,
    pending: &Mutex<PendingMap>,
    events_tx: &mpsc::Sender<BrowserEvent>,
) -> bool {
    if let Some(id) = frame.get("id").and_then(Value::as_u64) {
        let Some(tx) = pending.lock().await.remove(&id) else {
            tracing::warn!(id, "response for unknown request");
            return true;
        };
        let result = match frame.get("error") {
            Some(err) => Err(parse_call_error(err)),
            None => Ok(frame.get("result").cloned().unwrap_or(Value::Null)),
        };
        let _ = tx.send(result);
        return true;
    }

    if frame.get("event").is_some() {
        match serde_json::from_value::<BrowserEvent>(frame) {
            Ok(event) => return events_tx.send(event).await.is_ok(),
            Err(e) => tracing::warn!("unparseable event frame: {e}"),
        }
        return true;
    }

    tracing::warn!("unrecognized frame shape");
    true
}

/// Map an extension error object onto the bridge taxonomy. Anything
/// unrecognized is a protocol error.
fn parse_call_error(err: &Value) -> BridgeError {
    let detail = || {
        err.get("message")
            .and_then(Value::as_str)
            .unwrap_or("no detail")
            .to_string()
    };
    match err.get("code").and_then(Value::as_str) {
        Some("tab_gone") => {
            BridgeError::TabGone(TabId(err.get("tab").and_then(Value::as_i64).unwrap_or(-1)))
        }
        Some("window_gone") => BridgeError::WindowGone(WindowId(
            err.get("window").and_then(Value::as_i64).unwrap_or(-1),
        )),
        Some("unsupported") => BridgeError::Unsupported(detail()),
        _ => BridgeError::Protocol(err.to_string()),
    }
}

// ─── Framing ──────────────────────────────────────────────────────

async fn read_frame<R>(reader: &mut R) -> Result<Value, BridgeError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_le_bytes(len_buf);
    if len == 0 || len > MAX_INBOUND_FRAME {
        return Err(BridgeError::Protocol(format!(
            "frame length {len} out of range"
        )));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    serde_json::from_slice(&body).map_err(|e| BridgeError::Protocol(format!("bad frame json: {e}")))
}

async fn write_frame<W>(writer: &mut W, msg: &Value) -> Result<(), BridgeError>
where
    W: AsyncWrite + Unpin,
{
    let body =
        serde_json::to_vec(msg).map_err(|e| BridgeError::Protocol(format!("encode frame: {e}")))?;
    if body.len() > MAX_OUTBOUND_FRAME {
        return Err(BridgeError::Protocol(format!(
            "outbound frame of {} bytes exceeds host limit",
            body.len()
        )));
    }
    writer.write_all(&(body.len() as u32).to_le_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

// ─── Capability Impls ─────────────────────────────────────────────

impl<W> TabRegistry for NativeMessagingHost<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn query_tabs(&self, url_pattern: &str) -> Result<Vec<TabInfo>, BridgeError> {
        let result = self.call("tabs.query", json!({"url": url_pattern})).await?;
        serde_json::from_value(result)
            .map_err(|e| BridgeError::Protocol(format!("bad tabs.query result: {e}")))
    }

    async fn get_tab(&self, id: TabId) -> Result<Option<TabInfo>, BridgeError> {
        match self.call("tabs.get", json!({"tab": id})).await {
            Ok(Value::Null) => Ok(None),
            Ok(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| BridgeError::Protocol(format!("bad tabs.get result: {e}"))),
            Err(e) if e.is_tab_gone() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update_tab(&self, id: TabId, update: TabUpdate) -> Result<(), BridgeError> {
        let update = serde_json::to_value(update)
            .map_err(|e| BridgeError::Protocol(format!("encode tab update: {e}")))?;
        self.call("tabs.update", json!({"tab": id, "update": update}))
            .await?;
        Ok(())
    }

    async fn remove_tab(&self, id: TabId) -> Result<(), BridgeError> {
        self.call("tabs.remove", json!({"tab": id})).await?;
        Ok(())
    }

    async fn focus_window(&self, id: WindowId) -> Result<(), BridgeError> {
        self.call("windows.focus", json!({"window": id})).await?;
        Ok(())
    }
}

impl<W> ScriptRunner for NativeMessagingHost<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn run_in_tab(
        &self,
        tab: TabId,
        script: InPageScript,
    ) -> Result<Value, BridgeError> {
        let script = serde_json::to_value(script)
            .map_err(|e| BridgeError::Protocol(format!("encode script: {e}")))?;
        self.call("scripting.run", json!({"tab": tab, "script": script}))
            .await
    }
}

impl<W> SettingsStore for NativeMessagingHost<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn get(&self, key: &str) -> Result<Option<Value>, BridgeError> {
        match self.call("settings.get", json!({"key": key})).await? {
            Value::Null => Ok(None),
            value => Ok(Some(value)),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{ReadHalf, WriteHalf, duplex, split};

    type Ext = (
        ReadHalf<tokio::io::DuplexStream>,
        WriteHalf<tokio::io::DuplexStream>,
    );

    /// Host endpoint plus the "extension side" of the pipe.
    fn pipe_pair() -> (NativeMessagingHost<WriteHalf<tokio::io::DuplexStream>>, Ext) {
        let (host_io, ext_io) = duplex(64 * 1024);
        let (host_read, host_write) = split(host_io);
        let (ext_read, ext_write) = split(ext_io);
        (
            NativeMessagingHost::new(host_read, host_write),
            (ext_read, ext_write),
        )
    }

    // ── 1. Frame round trip ─────────────────────────────────────

    #[tokio::test]
    async fn frame_roundtrip() {
        let msg = json!({"id": 1, "method": "tabs.query", "params": {"url": "*"}});
        let mut buf = Vec::new();
        write_frame(&mut buf, &msg).await.expect("write");
        assert_eq!(&buf[..4], &(buf.len() as u32 - 4).to_le_bytes()[..]);

        let mut cursor: &[u8] = &buf;
        let back = read_frame(&mut cursor).await.expect("read");
        assert_eq!(back, msg);
    }

    // ── 2. Length guard ─────────────────────────────────────────

    #[tokio::test]
    async fn oversized_frame_rejected() {
        let mut bogus = Vec::new();
        bogus.extend_from_slice(&(MAX_INBOUND_FRAME + 1).to_le_bytes());
        let mut cursor: &[u8] = &bogus;
        let err = read_frame(&mut cursor).await.expect_err("must reject");
        assert!(matches!(err, BridgeError::Protocol(_)), "{err}");
    }

    #[tokio::test]
    async fn zero_length_frame_rejected() {
        let bogus = 0u32.to_le_bytes();
        let mut cursor: &[u8] = &bogus;
        let err = read_frame(&mut cursor).await.expect_err("must reject");
        assert!(matches!(err, BridgeError::Protocol(_)), "{err}");
    }

    // ── 3. Events flow through ──────────────────────────────────

    #[tokio::test]
    async fn event_frames_reach_next_event() {
        let (host, (_ext_read, mut ext_write)) = pipe_pair();

        write_frame(&mut ext_write, &json!({"event": "tab_created", "tab": 5}))
            .await
            .expect("write event");

        let event = host.next_event().await.expect("event");
        assert_eq!(event, BrowserEvent::TabCreated { tab: TabId(5) });
    }

    // ── 4. Request/response correlation ─────────────────────────

    #[tokio::test]
    async fn get_tab_roundtrip() {
        let (host, (mut ext_read, mut ext_write)) = pipe_pair();

        let responder = tokio::spawn(async move {
            let request = read_frame(&mut ext_read).await.expect("request");
            assert_eq!(request["method"], "tabs.get");
            assert_eq!(request["params"]["tab"], 9);
            let id = request["id"].clone();
            write_frame(
                &mut ext_write,
                &json!({"id": id, "result": {
                    "id": 9,
                    "url": "https://acme.zendesk.com/agent/tickets/80",
                    "window_id": 2
                }}),
            )
            .await
            .expect("respond");
        });

        let tab = host.get_tab(TabId(9)).await.expect("call").expect("some");
        assert_eq!(tab.id, TabId(9));
        assert_eq!(tab.window_id, WindowId(2));
        responder.await.expect("responder");
    }

    #[tokio::test]
    async fn get_tab_maps_tab_gone_to_none() {
        let (host, (mut ext_read, mut ext_write)) = pipe_pair();

        let responder = tokio::spawn(async move {
            let request = read_frame(&mut ext_read).await.expect("request");
            let id = request["id"].clone();
            write_frame(
                &mut ext_write,
                &json!({"id": id, "error": {"code": "tab_gone", "tab": 9}}),
            )
            .await
            .expect("respond");
        });

        assert!(host.get_tab(TabId(9)).await.expect("call").is_none());
        responder.await.expect("responder");
    }

    #[tokio::test]
    async fn update_tab_surfaces_tab_gone() {
        let (host, (mut ext_read, mut ext_write)) = pipe_pair();

        let responder = tokio::spawn(async move {
            let request = read_frame(&mut ext_read).await.expect("request");
            assert_eq!(request["method"], "tabs.update");
            assert_eq!(request["params"]["update"]["url"], "https://x.test/");
            let id = request["id"].clone();
            write_frame(
                &mut ext_write,
                &json!({"id": id, "error": {"code": "tab_gone", "tab": 3}}),
            )
            .await
            .expect("respond");
        });

        let err = host
            .update_tab(TabId(3), TabUpdate::navigate("https://x.test/"))
            .await
            .expect_err("must fail");
        assert!(matches!(err, BridgeError::TabGone(TabId(3))), "{err}");
        responder.await.expect("responder");
    }

    // ── 5. Events interleaved with a response ───────────────────

    #[tokio::test]
    async fn events_buffered_while_call_in_flight() {
        let (host, (mut ext_read, mut ext_write)) = pipe_pair();

        let responder = tokio::spawn(async move {
            let request = read_frame(&mut ext_read).await.expect("request");
            let id = request["id"].clone();
            // Event arrives before the response; both must be delivered.
            write_frame(&mut ext_write, &json!({"event": "tab_removed", "tab": 1}))
                .await
                .expect("event");
            write_frame(&mut ext_write, &json!({"id": id, "result": null}))
                .await
                .expect("respond");
        });

        assert!(host.get_tab(TabId(1)).await.expect("call").is_none());
        let event = host.next_event().await.expect("event");
        assert_eq!(event, BrowserEvent::TabRemoved { tab: TabId(1) });
        responder.await.expect("responder");
    }

    // ── 6. Pipe close fails callers and ends the event stream ───

    #[tokio::test]
    async fn closed_pipe_fails_pending_and_events() {
        let (host, (ext_read, ext_write)) = pipe_pair();
        drop(ext_read);
        drop(ext_write);

        let err = host.next_event().await.expect_err("stream must end");
        assert!(matches!(err, BridgeError::Closed), "{err}");

        let err = host
            .focus_window(WindowId(1))
            .await
            .expect_err("call must fail");
        // Either the write fails (pipe gone) or the waiter is woken with
        // Closed, depending on shutdown order.
        assert!(
            matches!(err, BridgeError::Closed | BridgeError::Io(_)),
            "{err}"
        );
    }

    // ── 7. Error mapping ────────────────────────────────────────

    #[test]
    fn call_error_mapping() {
        assert!(matches!(
            parse_call_error(&json!({"code": "tab_gone", "tab": 4})),
            BridgeError::TabGone(TabId(4))
        ));
        assert!(matches!(
            parse_call_error(&json!({"code": "window_gone", "window": 2})),
            BridgeError::WindowGone(WindowId(2))
        ));
        assert!(matches!(
            parse_call_error(&json!({"code": "unsupported", "message": "no scripting"})),
            BridgeError::Unsupported(m) if m == "no scripting"
        ));
        assert!(matches!(
            parse_call_error(&json!({"code": "weird"})),
            BridgeError::Protocol(_)
        ));
        assert!(matches!(
            parse_call_error(&json!("boom")),
            BridgeError::Protocol(_)
        ));
    }
}
