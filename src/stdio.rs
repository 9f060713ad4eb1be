//! Newline-delimited JSON transport over stdin/stdout.
//!
//! One request per line, one response line per request, in order. Blank
//! lines are skipped. The loop ends at EOF or on Ctrl-C between messages.

use anyhow::Result;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::dispatcher::Dispatcher;
use crate::protocol::{DispatchError, RpcResponse};

/// Serve requests from `reader`, writing responses to `writer`, until EOF.
///
/// A line that is not valid UTF-8 is answered with `PARSE_ERROR` and the
/// loop keeps reading. Returns the number of requests answered.
pub async fn serve_lines<R, W>(dispatcher: &Dispatcher, mut reader: R, writer: &mut W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    let mut answered = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                dispatcher.dispatch_line(line).await
            }
            Err(e) => {
                warn!(error = %e, "request line is not valid UTF-8");
                RpcResponse::failure(Value::Null, &DispatchError::Parse(e.to_string()))
            }
        };

        let mut bytes = serde_json::to_vec(&response)?;
        bytes.push(b'\n');
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        answered += 1;
    }

    Ok(answered)
}

/// Run the stdio transport on the process's stdin and stdout.
pub async fn run_stdio(dispatcher: &Dispatcher) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    info!(
        tools = dispatcher.catalog().len(),
        "stdio server ready"
    );

    tokio::select! {
        result = serve_lines(dispatcher, reader, &mut stdout) => {
            let answered = result?;
            info!(answered, "stdin closed, stdio server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, stdio server stopped");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ToolCatalog;
    use es_assistant_core::gateway::memory::InMemoryGateway;
    use std::sync::Arc;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            Arc::new(ToolCatalog::with_builtins("sample_data")),
            Arc::new(InMemoryGateway::new("sample_data")),
        )
    }

    #[tokio::test]
    async fn test_one_response_per_line_in_order() {
        let input = concat!(
            r#"{"method":"initialize","id":1}"#,
            "\n\n",
            "garbage\n",
            r#"{"method":"tools/list","id":2}"#,
            "\n"
        );
        let mut out: Vec<u8> = Vec::new();
        let answered = serve_lines(&dispatcher(), input.as_bytes(), &mut out)
            .await
            .unwrap();
        assert_eq!(answered, 3);

        let responses: Vec<RpcResponse> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].id, serde_json::json!(1));
        assert_eq!(responses[1].error_code(), Some("PARSE_ERROR"));
        assert_eq!(responses[2].id, serde_json::json!(2));
        assert_eq!(responses[2].result["tools"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_last_line_without_newline() {
        let mut out: Vec<u8> = Vec::new();
        let answered = serve_lines(
            &dispatcher(),
            r#"{"method":"resources/list","id":"r"}"#.as_bytes(),
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(answered, 1);
        assert!(out.ends_with(b"\n"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_stop_the_loop() {
        let mut input: Vec<u8> = Vec::new();
        input.extend_from_slice(br#"{"method":"initialize","id":1}"#);
        input.push(b'\n');
        input.extend_from_slice(b"\xff\xfe garbage\n");
        input.extend_from_slice(br#"{"method":"tools/list","id":2}"#);
        input.push(b'\n');

        let mut out: Vec<u8> = Vec::new();
        let answered = serve_lines(&dispatcher(), input.as_slice(), &mut out)
            .await
            .unwrap();
        assert_eq!(answered, 3);

        let responses: Vec<RpcResponse> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].id, serde_json::json!(1));
        assert!(responses[1].id.is_null());
        assert_eq!(responses[1].error_code(), Some("PARSE_ERROR"));
        assert_eq!(responses[2].id, serde_json::json!(2));
        assert_eq!(responses[2].result["tools"].as_array().unwrap().len(), 4);
    }
}
