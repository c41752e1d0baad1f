//! MCP client over a line-oriented byte stream.
//!
//! Requests are correlated to responses by numeric id through a pending map
//! shared with a reader task. Lines that are not JSON (a server's startup
//! banner, stray prints) are logged and skipped.

use std::collections::{HashMap, HashSet};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::error::McpError;
use crate::launch::ServerLaunch;
use crate::types::*;

/// Upper bound on `tools/list` pages fetched for one listing.
const MAX_TOOL_PAGES: usize = 64;

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcMessage>>>>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Connection settings for [`McpClient`].
#[derive(Debug, Clone)]
pub struct McpClientOptions {
    pub protocol_version: String,
    pub request_timeout: Duration,
}

impl Default for McpClientOptions {
    fn default() -> Self {
        Self {
            protocol_version: crate::DEFAULT_PROTOCOL_VERSION.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// An initialized connection to one tool server.
pub struct McpClient {
    writer: Mutex<Option<Writer>>,
    child: Mutex<Option<Child>>,
    next_id: AtomicU64,
    pending: Pending,
    closed: Arc<AtomicBool>,
    request_timeout: Duration,
    server_info: ServerInfo,
}

impl McpClient {
    /// Spawn the tool server and run the MCP handshake over its stdio.
    pub async fn spawn(launch: &ServerLaunch, options: McpClientOptions) -> Result<Self, McpError> {
        info!(program = %launch.program, args = ?launch.args, "starting tool server");

        let mut child = Command::new(&launch.program)
            .args(&launch.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| McpError::Spawn(format!("{}: {e}", launch.program)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Transport("failed to capture stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Transport("failed to capture stdout".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "gridops_mcp::server_stderr", "{line}");
                }
            });
        }

        let client = Self::connect_io(stdout, stdin, options).await?;
        *client.child.lock().await = Some(child);
        Ok(client)
    }

    /// Run the MCP handshake over an already-open stream pair.
    pub async fn connect_io<R, W>(
        reader: R,
        writer: W,
        options: McpClientOptions,
    ) -> Result<Self, McpError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        spawn_reader(reader, Arc::clone(&pending), Arc::clone(&closed));

        let mut client = Self {
            writer: Mutex::new(Some(Box::new(writer))),
            child: Mutex::new(None),
            next_id: AtomicU64::new(1),
            pending,
            closed,
            request_timeout: options.request_timeout,
            server_info: ServerInfo {
                name: String::new(),
                version: String::new(),
            },
        };

        let init = client.initialize(&options.protocol_version).await?;
        client.server_info = init.server_info;
        client
            .send_notification("notifications/initialized", None)
            .await?;

        info!(
            server = %client.server_info.name,
            version = %client.server_info.version,
            protocol = %init.protocol_version,
            "tool server initialized"
        );
        Ok(client)
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    async fn initialize(&self, protocol_version: &str) -> Result<InitializeResult, McpError> {
        let params = InitializeParams {
            protocol_version: protocol_version.to_string(),
            capabilities: json!({}),
            client_info: ClientInfo {
                name: "gridops".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
        };
        let result = self
            .send_request("initialize", Some(serde_json::to_value(params)?))
            .await?;
        serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("invalid initialize result: {e}")))
    }

    /// List every tool the server offers, following pagination cursors.
    /// Stops early if the server repeats a cursor or exceeds
    /// `MAX_TOOL_PAGES`.
    pub async fn list_tools(&self) -> Result<Vec<McpTool>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();

        for _ in 0..MAX_TOOL_PAGES {
            let params = serde_json::to_value(ListToolsParams { cursor })?;
            let result = self.send_request("tools/list", Some(params)).await?;
            let page: ListToolsResult = serde_json::from_value(result)
                .map_err(|e| McpError::Protocol(format!("invalid tools/list result: {e}")))?;

            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if seen.insert(next.clone()) => cursor = Some(next),
                Some(next) => {
                    warn!(cursor = %next, "tools/list repeated a cursor, stopping");
                    break;
                }
                None => break,
            }
        }

        debug!(count = tools.len(), "listed tools");
        Ok(tools)
    }

    /// Invoke a tool. A result flagged `isError` is returned as-is; callers
    /// decide how to treat it.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<McpToolResult, McpError> {
        debug!(tool = %name, "calling tool");
        let params = serde_json::to_value(CallToolParams {
            name: name.to_string(),
            arguments,
        })?;
        let result = self.send_request("tools/call", Some(params)).await?;
        let call: CallToolResult = serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("invalid tools/call result: {e}")))?;
        Ok(call.flatten())
    }

    /// Close stdin and stop the server process, if one was spawned.
    pub async fn disconnect(&self) {
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.kill().await;
            let _ = child.wait().await;
        }
        info!("tool server disconnected");
    }

    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if self.closed.load(Ordering::SeqCst) {
            self.pending.lock().await.remove(&id);
            return Err(McpError::Closed);
        }

        let request = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.to_string(),
            params,
        };
        if let Err(e) = self.write_line(&serde_json::to_string(&request)?).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let response = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(McpError::Closed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                warn!(method = %method, id, "request timed out");
                return Err(McpError::Timeout {
                    method: method.to_string(),
                    timeout: self.request_timeout,
                });
            }
        };

        if let Some(error) = response.error {
            return Err(McpError::Server {
                code: error.code,
                message: error.message,
            });
        }
        response
            .result
            .ok_or_else(|| McpError::Protocol(format!("{method} response has no result")))
    }

    async fn send_notification(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        let note = JsonRpcNotification {
            jsonrpc: JSONRPC_VERSION,
            method: method.to_string(),
            params,
        };
        self.write_line(&serde_json::to_string(&note)?).await
    }

    async fn write_line(&self, line: &str) -> Result<(), McpError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(McpError::Closed)?;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| McpError::Transport(format!("write failed: {e}")))?;
        writer
            .write_all(b"\n")
            .await
            .map_err(|e| McpError::Transport(format!("write failed: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| McpError::Transport(format!("flush failed: {e}")))?;
        Ok(())
    }
}

fn spawn_reader<R>(reader: R, pending: Pending, closed: Arc<AtomicBool>)
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let message: JsonRpcMessage = match serde_json::from_str(trimmed) {
                Ok(message) => message,
                Err(_) => {
                    debug!(line = %trimmed, "skipping non-JSON line from tool server");
                    continue;
                }
            };

            if let Some(method) = &message.method {
                debug!(method = %method, "ignoring server-initiated message");
                continue;
            }

            match message.id.as_ref().and_then(Value::as_u64) {
                Some(id) => match pending.lock().await.remove(&id) {
                    Some(tx) => {
                        let _ = tx.send(message);
                    }
                    None => warn!(id, "response for unknown request"),
                },
                None => warn!("response without a numeric id"),
            }
        }

        closed.store(true, Ordering::SeqCst);
        pending.lock().await.clear();
        debug!("tool server stdout closed");
    });
}
