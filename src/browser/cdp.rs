//! Chrome DevTools Protocol client — thin layer over `tokio-tungstenite`.
//!
//! Only the handful of commands the driver needs are implemented: navigate,
//! evaluate, dispatch a key, close. Commands are sent through an mpsc channel
//! to a handler task that owns the WebSocket and routes each response back by
//! its `id`.

use crate::error::BatchError;
use crate::pipeline::wait::{self, TokioClock};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Pending CDP command waiting for response.
type PendingTx = oneshot::Sender<Result<Value, String>>;

/// Upper bound on a single CDP round-trip.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// How often to re-check page state while navigating.
const NAVIGATION_POLL: Duration = Duration::from_millis(100);

/// Internal CDP command message.
struct CdpCommand {
    method: String,
    params: Value,
    response_tx: PendingTx,
}

/// A browser process plus a CDP connection to its first page.
pub struct CdpClient {
    cmd_tx: mpsc::Sender<CdpCommand>,
    chrome_process: Mutex<Option<Child>>,
    handler: JoinHandle<()>,
    _profile_dir: TempDir,
}

impl CdpClient {
    /// Launch Chrome with remote debugging enabled and connect to its page.
    pub async fn launch(chrome_path: &Path, headless: bool) -> Result<Self, BatchError> {
        let launch_failed = |context: String| BatchError::LaunchFailed { context };

        // Find a free port
        let listener = std::net::TcpListener::bind("127.0.0.1:0")
            .map_err(|e| launch_failed(format!("bind port: {e}")))?;
        let port = listener
            .local_addr()
            .map_err(|e| launch_failed(format!("local_addr: {e}")))?
            .port();
        drop(listener);

        // A throwaway profile keeps us clear of any Chrome the user already has open.
        let profile_dir =
            TempDir::new().map_err(|e| launch_failed(format!("profile dir: {e}")))?;

        let mut cmd = Command::new(chrome_path);
        if headless {
            cmd.arg("--headless=new");
        }
        cmd.arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg(format!("--remote-debugging-port={port}"))
            .arg(format!("--user-data-dir={}", profile_dir.path().display()))
            .arg("--window-size=1280,800")
            .arg("about:blank")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| launch_failed(e.to_string()))?;

        let ws_url = wait_for_ws_url(port, &mut child).await?;
        debug!("CDP page endpoint: {}", ws_url);

        let (ws, _) = connect_async(ws_url.as_str())
            .await
            .map_err(|e| launch_failed(format!("WebSocket connect: {e}")))?;

        let (cmd_tx, cmd_rx) = mpsc::channel::<CdpCommand>(64);
        let handler = tokio::spawn(cdp_handler_loop(ws, cmd_rx));

        Ok(Self {
            cmd_tx,
            chrome_process: Mutex::new(Some(child)),
            handler,
            _profile_dir: profile_dir,
        })
    }

    // ─── CDP command helper ──────────────────────────────────────────────

    async fn send_cdp(&self, method: &str, params: Value) -> Result<Value, BatchError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(CdpCommand {
                method: method.into(),
                params,
                response_tx: tx,
            })
            .await
            .map_err(|_| BatchError::Cdp("handler closed".into()))?;

        let result = tokio::time::timeout(COMMAND_TIMEOUT, rx)
            .await
            .map_err(|_| BatchError::Timeout {
                timeout_ms: COMMAND_TIMEOUT.as_millis() as u64,
                context: format!("CDP {method}"),
            })?
            .map_err(|_| BatchError::Cdp("response dropped".into()))?;

        result.map_err(BatchError::Cdp)
    }

    // ─── Navigation ──────────────────────────────────────────────────────

    /// Navigate to `url` and wait until the document has finished loading.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BatchError> {
        let navigation_failed = |reason: String| BatchError::NavigationFailed {
            url: url.into(),
            reason,
        };

        let result = self
            .send_cdp("Page.navigate", json!({ "url": url }))
            .await
            .map_err(|e| navigation_failed(e.to_string()))?;

        if let Some(error_text) = result["errorText"].as_str() {
            if !error_text.is_empty() {
                return Err(navigation_failed(error_text.to_string()));
            }
        }

        let loaded = self
            .wait_until(timeout, "document.readyState === 'complete'")
            .await?;
        if !loaded {
            return Err(navigation_failed(format!(
                "page did not finish loading within {}ms",
                timeout.as_millis()
            )));
        }
        debug!("Loaded {}", url);
        Ok(())
    }

    /// Poll `predicate` (a JS boolean expression) until true or `timeout`.
    pub async fn wait_until(&self, timeout: Duration, predicate: &str) -> Result<bool, BatchError> {
        let clock = TokioClock::new();
        let ready = wait::await_condition(&clock, timeout, NAVIGATION_POLL, || async {
            let v = self.evaluate("wait", predicate).await?;
            Ok::<_, BatchError>((v.as_bool() == Some(true)).then_some(()))
        })
        .await?;
        Ok(ready.is_some())
    }

    // ─── Script & input ──────────────────────────────────────────────────

    /// Evaluate `expression` in the page, awaiting promises, and return its value.
    ///
    /// `action` names the call in error messages.
    pub async fn evaluate(&self, action: &str, expression: &str) -> Result<Value, BatchError> {
        let result = self
            .send_cdp(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;
        if let Some(exception) = result.get("exceptionDetails") {
            return Err(BatchError::Evaluation {
                action: action.into(),
                reason: exception_message(exception),
            });
        }
        Ok(result["result"]["value"].clone())
    }

    /// Press and release a key, e.g. `("Escape", 27)`.
    pub async fn press_key(&self, key: &str, key_code: u32) -> Result<(), BatchError> {
        for kind in ["keyDown", "keyUp"] {
            let _ = self
                .send_cdp(
                    "Input.dispatchKeyEvent",
                    json!({
                        "type": kind,
                        "key": key,
                        "code": key,
                        "windowsVirtualKeyCode": key_code,
                    }),
                )
                .await?;
        }
        Ok(())
    }

    /// Close the browser process.
    pub async fn close(&self) -> Result<(), BatchError> {
        let _ = tokio::time::timeout(
            Duration::from_secs(2),
            self.send_cdp("Browser.close", json!({})),
        )
        .await;
        if let Some(mut child) = self.chrome_process.lock().await.take() {
            child
                .kill()
                .await
                .map_err(|e| BatchError::Internal(format!("kill browser: {e}")))?;
        }
        self.handler.abort();
        Ok(())
    }
}

fn exception_message(exception: &Value) -> String {
    exception["exception"]["description"]
        .as_str()
        .or_else(|| exception["text"].as_str())
        .unwrap_or("evaluation error")
        .to_string()
}

/// Query the `/json` endpoint until Chrome lists a page WebSocket URL.
async fn wait_for_ws_url(port: u16, child: &mut Child) -> Result<String, BatchError> {
    let url = format!("http://127.0.0.1:{port}/json");

    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Check Chrome hasn't crashed
        if let Some(status) = child.try_wait().map_err(|e| BatchError::LaunchFailed {
            context: format!("wait: {e}"),
        })? {
            return Err(BatchError::LaunchFailed {
                context: format!("Chrome exited early with {status}"),
            });
        }

        let Ok(resp) = reqwest::get(&url).await else {
            continue;
        };
        let Ok(targets): Result<Vec<Value>, _> = resp.json().await else {
            continue;
        };
        if let Some(ws_url) = page_ws_url(&targets) {
            return Ok(ws_url);
        }
    }

    Err(BatchError::LaunchFailed {
        context: format!("Chrome did not start within 5 seconds on port {port}"),
    })
}

/// Pick the first `page` target's debugger URL from a `/json` listing.
fn page_ws_url(targets: &[Value]) -> Option<String> {
    targets
        .iter()
        .filter(|t| t["type"].as_str().map_or(true, |ty| ty == "page"))
        .find_map(|t| t["webSocketDebuggerUrl"].as_str())
        .map(String::from)
}

/// CDP WebSocket handler loop.
///
/// Receives commands from `CdpClient`, sends them over WS, and routes
/// responses back. Events (messages without an `id`) are dropped.
async fn cdp_handler_loop(ws: WsStream, mut cmd_rx: mpsc::Receiver<CdpCommand>) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut pending: HashMap<u64, PendingTx> = HashMap::new();
    let mut next_id: u64 = 1;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                let id = next_id;
                next_id += 1;
                let msg = json!({
                    "id": id,
                    "method": cmd.method,
                    "params": cmd.params,
                });
                let _ = pending.insert(id, cmd.response_tx);
                if ws_tx.send(Message::Text(msg.to_string().into())).await.is_err() {
                    break;
                }
            }
            msg = ws_rx.next() => {
                let Some(Ok(msg)) = msg else { break };
                let Message::Text(text) = msg else { continue };
                let Ok(val): Result<Value, _> = serde_json::from_str(&text) else {
                    continue;
                };
                if let Some((id, response)) = parse_response(&val) {
                    if let Some(tx) = pending.remove(&id) {
                        let _ = tx.send(response);
                    }
                }
            }
        }
    }
    debug!("CDP handler stopped with {} pending commands", pending.len());
}

/// Split a CDP message into `(id, result-or-error)`; `None` for events.
fn parse_response(val: &Value) -> Option<(u64, Result<Value, String>)> {
    let id = val.get("id").and_then(Value::as_u64)?;
    let response = match val.get("error") {
        Some(err) => Err(err["message"].as_str().unwrap_or("CDP error").to_string()),
        None => Ok(val["result"].clone()),
    };
    Some((id, response))
}
