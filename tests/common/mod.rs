#![allow(dead_code)]

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const MASTER_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

pub const CONTRACT: &str = "0x2222222222222222222222222222222222222222";

/// 10 ether
pub const FUNDS: u128 = 10_000_000_000_000_000_000;

pub fn settings_toml(mints: usize, layers: usize, send_back: bool) -> String {
    format!(
        r#"
CHAIN_NAME = "Sepolia"
CONTRACT_ADDRESS = "{}"
MINT_FUNCTION_NAME = "mint"
MINT_PRICE = "0.02"
NUMBER_OF_MINTS = {}
EXTRA_MIXING_LAYERS = {}
SEND_BACK = {}
LOGGING = false
FEES_MULT_FACTOR = 1.1
"#,
        CONTRACT, mints, layers, send_back
    )
}

pub fn secrets_json(provider: &str) -> String {
    json!({ "PRIVATE_KEY": MASTER_KEY, "PROVIDER": provider }).to_string()
}

/// Write settings and secrets files into `dir`
pub fn write_config_files(dir: &Path, settings: &str, secrets: &str) -> (std::path::PathBuf, std::path::PathBuf) {
    let settings_path = dir.join("settings.toml");
    let secrets_path = dir.join("secrets.json");
    std::fs::write(&settings_path, settings).expect("Failed to write settings");
    std::fs::write(&secrets_path, secrets).expect("Failed to write secrets");
    (settings_path, secrets_path)
}

/// What the test node answers for one call: `Ok(result)` or `Err((code, message))`
pub type RpcAnswer = Result<Value, (i64, String)>;

/// A minimal JSON-RPC node over HTTP/1.1. Every connection carries one request.
/// Returns the URL to reach it.
pub async fn start_rpc_node<F>(handler: F) -> String
where
    F: Fn(&str, &Value) -> RpcAnswer + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind test node");
    let url = format!("http://{}", listener.local_addr().expect("No local address"));
    let handler = Arc::new(handler);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let handler = handler.clone();
            tokio::spawn(serve(stream, move |request| answer(&*handler, request)));
        }
    });
    url
}

fn answer<F: Fn(&str, &Value) -> RpcAnswer>(handler: &F, request: Value) -> Value {
    let method = request["method"].as_str().unwrap_or_default();
    match handler(method, &request["params"]) {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "error": { "code": code, "message": message },
        }),
    }
}

fn serve<H>(mut stream: TcpStream, handle: H) -> impl Future<Output = ()>
where
    H: FnOnce(Value) -> Value + Send + 'static,
{
    async move {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let (head_len, content_length) = loop {
            let Ok(n) = stream.read(&mut chunk).await else {
                return;
            };
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                break (pos + 4, length);
            }
        };
        while buf.len() < head_len + content_length {
            let Ok(n) = stream.read(&mut chunk).await else {
                return;
            };
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let request: Value = serde_json::from_slice(&buf[head_len..head_len + content_length]).unwrap_or(Value::Null);
        let body = handle(request).to_string();
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }
}
