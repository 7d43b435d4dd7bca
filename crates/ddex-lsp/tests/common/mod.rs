//! Common test utilities for integration tests.
//!
//! Provides `LspClient`, which drives the server binary over stdio and
//! captures every notification it sends.

use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, Command, Stdio};

/// A captured server notification.
#[derive(Debug, Clone)]
pub(crate) struct CapturedNotification {
    /// The LSP method name (e.g., "textDocument/publishDiagnostics").
    pub method: String,
    pub params: Value,
}

/// LSP test client for communicating with the server binary.
pub(crate) struct LspClient {
    process: Child,
    /// Captured notifications in order received.
    notifications: Vec<CapturedNotification>,
    reader: BufReader<std::process::ChildStdout>,
}

impl LspClient {
    /// Spawn the ddex-lsp binary in server mode.
    pub(crate) fn spawn() -> Self {
        let mut process = Command::new(env!("CARGO_BIN_EXE_ddex-lsp"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to spawn ddex-lsp binary");

        let stdout = process.stdout.take().expect("Failed to capture stdout");

        Self {
            process,
            notifications: Vec::new(),
            reader: BufReader::new(stdout),
        }
    }

    /// Captured notifications with the given method, oldest first.
    pub(crate) fn notifications(&self, method: &str) -> Vec<Value> {
        self.notifications
            .iter()
            .filter(|n| n.method == method)
            .map(|n| n.params.clone())
            .collect()
    }

    /// Send a JSON-RPC message to the server.
    pub(crate) fn send(&mut self, message: &Value) {
        let body = serde_json::to_string(message).unwrap();
        let header = format!("Content-Length: {}\r\n\r\n", body.len());

        let stdin = self.process.stdin.as_mut().expect("stdin not captured");
        stdin.write_all(header.as_bytes()).unwrap();
        stdin.write_all(body.as_bytes()).unwrap();
        stdin.flush().unwrap();
    }

    /// Read messages until the response with `expected_id` arrives,
    /// capturing notifications on the way.
    pub(crate) fn read_response(&mut self, expected_id: i64) -> Value {
        loop {
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                let bytes_read = self
                    .reader
                    .read_line(&mut line)
                    .expect("Failed to read header");

                assert!(bytes_read != 0, "Server closed connection unexpectedly");

                if line == "\r\n" || line == "\n" {
                    break;
                }

                if line.to_lowercase().starts_with("content-length:") {
                    content_length = line
                        .split(':')
                        .nth(1)
                        .unwrap()
                        .trim()
                        .parse()
                        .expect("Invalid content length");
                }
            }

            if content_length == 0 {
                continue;
            }

            let mut body = vec![0u8; content_length];
            self.reader
                .read_exact(&mut body)
                .expect("Failed to read body");

            let message: Value = serde_json::from_slice(&body).unwrap_or_else(|e| {
                panic!("Invalid JSON: {e} in: {:?}", String::from_utf8_lossy(&body))
            });

            match message.get("id") {
                None => {
                    if let Some(method) = message.get("method").and_then(|m| m.as_str()) {
                        self.notifications.push(CapturedNotification {
                            method: method.to_string(),
                            params: message.get("params").cloned().unwrap_or(Value::Null),
                        });
                    }
                }
                // Server-to-client request; not answered
                Some(_) if message.get("method").is_some() => {}
                Some(id) if *id == json!(expected_id) => return message,
                Some(_) => {}
            }
        }
    }

    fn request(&mut self, id: i64, method: &str, params: Value) -> Value {
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        }));
        self.read_response(id)
    }

    /// Initialize the LSP session with the given initialization options.
    pub(crate) fn initialize(&mut self, options: Value) -> Value {
        let response = self.request(
            1,
            "initialize",
            json!({
                "processId": null,
                "capabilities": {
                    "textDocument": {
                        "hover": { "contentFormat": ["markdown", "plaintext"] },
                        "publishDiagnostics": {}
                    }
                },
                "rootUri": "file:///tmp",
                "initializationOptions": options
            }),
        );

        self.send(&json!({
            "jsonrpc": "2.0",
            "method": "initialized",
            "params": {}
        }));

        response
    }

    /// Open an XML document.
    pub(crate) fn did_open(&mut self, uri: &str, text: &str) {
        self.send(&json!({
            "jsonrpc": "2.0",
            "method": "textDocument/didOpen",
            "params": {
                "textDocument": {
                    "uri": uri,
                    "languageId": "xml",
                    "version": 1,
                    "text": text
                }
            }
        }));
    }

    /// Replace the full text of a document.
    pub(crate) fn did_change(&mut self, uri: &str, version: i32, text: &str) {
        self.send(&json!({
            "jsonrpc": "2.0",
            "method": "textDocument/didChange",
            "params": {
                "textDocument": { "uri": uri, "version": version },
                "contentChanges": [{ "text": text }]
            }
        }));
    }

    pub(crate) fn hover(&mut self, id: i64, uri: &str, line: u32, character: u32) -> Value {
        self.request(
            id,
            "textDocument/hover",
            json!({
                "textDocument": { "uri": uri },
                "position": { "line": line, "character": character }
            }),
        )
    }

    pub(crate) fn document_link(&mut self, id: i64, uri: &str) -> Value {
        self.request(
            id,
            "textDocument/documentLink",
            json!({ "textDocument": { "uri": uri } }),
        )
    }

    pub(crate) fn execute_command(&mut self, id: i64, command: &str, argument: Value) -> Value {
        self.request(
            id,
            "workspace/executeCommand",
            json!({ "command": command, "arguments": [argument] }),
        )
    }

    /// Shutdown the server.
    pub(crate) fn shutdown(&mut self) -> Value {
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": 999,
            "method": "shutdown"
        }));
        self.read_response(999)
    }
}

impl Drop for LspClient {
    fn drop(&mut self) {
        let _ = self.process.kill();
    }
}
