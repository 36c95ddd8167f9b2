//! MCP server implementation.
//!
//! `McpServer` owns the protocol routing (JSON-RPC method to handler) and is
//! shared by both transports:
//! - STDIO: newline-delimited JSON-RPC, one request at a time
//! - HTTP: Actix Web, JSON-RPC over `POST /mcp` plus health, metrics and
//!   SSE discovery endpoints
//!
//! Tool outcomes, including unknown tools, always travel as `tools/call`
//! results. JSON-RPC errors are reserved for protocol problems such as
//! unparseable input or unknown methods.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use actix_web::{
    App, HttpResponse, HttpServer,
    http::header,
    middleware::{Compress, DefaultHeaders, Logger},
    web,
};
use bytes::Bytes;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, info, warn};

use crate::core::config::{HttpConfig, ServerInfo};
use crate::core::protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, MCPRequest, MCPResponse,
    METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION,
};
use crate::core::registry::{InvocationRequest, ToolRegistry};

/// Transport-independent MCP request router.
pub struct McpServer {
    info: ServerInfo,
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(info: ServerInfo, registry: Arc<ToolRegistry>) -> Self {
        Self { info, registry }
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one raw JSON-RPC message.
    ///
    /// Returns `None` when no response must be sent (notifications).
    pub fn handle_message(&self, raw: &str) -> Option<MCPResponse> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "parse error on incoming message");
                return Some(MCPResponse::error(None, PARSE_ERROR, format!("Parse error: {}", e)));
            }
        };

        // Valid JSON that is not a request: answer with the id if we can find one
        let id = value.get("id").cloned();
        match serde_json::from_value::<MCPRequest>(value) {
            Ok(request) if request.jsonrpc != JSONRPC_VERSION && !request.is_notification() => {
                warn!(version = %request.jsonrpc, "unsupported JSON-RPC version");
                Some(MCPResponse::error(
                    id,
                    INVALID_REQUEST,
                    format!("Invalid request: unsupported jsonrpc version '{}'", request.jsonrpc),
                ))
            }
            Ok(request) => self.handle_request(request),
            Err(e) => {
                warn!(error = %e, "invalid JSON-RPC request");
                Some(MCPResponse::error(id, INVALID_REQUEST, format!("Invalid request: {}", e)))
            }
        }
    }

    /// Route a decoded request to its method handler.
    pub fn handle_request(&self, request: MCPRequest) -> Option<MCPResponse> {
        if request.is_notification() {
            debug!(method = %request.method, "notification received");
            return None;
        }

        debug!(method = %request.method, "request received");
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "ping" => MCPResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params),
            method => MCPResponse::error(
                request.id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", method),
            ),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: Option<Value>) -> MCPResponse {
        MCPResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": self.info.name,
                    "version": self.info.version
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Option<Value>) -> MCPResponse {
        MCPResponse::success(id, json!({ "tools": self.registry.list_tools() }))
    }

    fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> MCPResponse {
        let Some(params) = params else {
            return MCPResponse::error(id, INVALID_PARAMS, "Invalid params: missing params");
        };

        let request: InvocationRequest = match serde_json::from_value(params) {
            Ok(request) => request,
            Err(e) => {
                return MCPResponse::error(id, INVALID_PARAMS, format!("Invalid params: {}", e));
            }
        };

        let result = self.registry.dispatch(request);
        match serde_json::to_value(&result) {
            Ok(value) => MCPResponse::success(id, value),
            Err(e) => MCPResponse::error(id, INTERNAL_ERROR, format!("Internal error: {}", e)),
        }
    }
}

/// Serve JSON-RPC messages line by line until `reader` reaches EOF.
///
/// Each response is written as a single line and flushed before the next
/// request is read. Write failures end the loop with an error.
pub async fn serve_lines<R, W>(server: &McpServer, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let Some(response) = server.handle_message(&line) else {
            continue;
        };

        let mut frame = match serde_json::to_vec(&response) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "failed to serialize response");
                continue;
            }
        };
        frame.push(b'\n');

        writer.write_all(&frame).await?;
        writer.flush().await?;
    }

    debug!("input closed, stopping line server");
    Ok(())
}

/// Run the MCP server on stdin/stdout.
///
/// All diagnostics go to stderr; stdout carries JSON-RPC frames only.
pub async fn run_server_stdio(server: Arc<McpServer>) -> std::io::Result<()> {
    let stdin = BufReader::with_capacity(8192, tokio::io::stdin());
    let stdout = BufWriter::with_capacity(8192, tokio::io::stdout());

    info!(
        name = %server.info().name,
        version = %server.info().version,
        tools = server.registry().list_tools().len(),
        "Custom MCP server running on stdio"
    );

    serve_lines(&server, stdin, stdout).await
}

/// Health check endpoint handler.
async fn health(server: web::Data<McpServer>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": server.info().name
    }))
}

/// JSON-RPC endpoint.
///
/// The body is parsed by `McpServer` rather than an extractor so that
/// malformed input gets a JSON-RPC error instead of a bare 400.
async fn mcp_handler(
    server: web::Data<McpServer>,
    counter: web::Data<AtomicU64>,
    body: web::Bytes,
) -> HttpResponse {
    // Relaxed is enough: the counter is only ever read for reporting
    counter.fetch_add(1, Ordering::Relaxed);

    let response = match std::str::from_utf8(&body) {
        Ok(raw) => server.handle_message(raw),
        Err(e) => Some(MCPResponse::error(None, PARSE_ERROR, format!("Parse error: {}", e))),
    };

    match response {
        Some(response) => HttpResponse::Ok().json(response),
        // Notifications get no JSON-RPC response
        None => HttpResponse::Accepted().finish(),
    }
}

/// Total number of JSON-RPC requests served over HTTP.
async fn metrics_handler(counter: web::Data<AtomicU64>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "requests_total": counter.load(Ordering::Relaxed),
        "status": "ok"
    }))
}

/// Server-Sent Events endpoint for tools discovery.
///
/// Emits a single event with the same tool list `tools/list` returns.
async fn sse_tools_discovery(server: web::Data<McpServer>) -> HttpResponse {
    let tools = server.registry().list_tools();
    let payload = json!({
        "tools": tools,
        "count": tools.len()
    });
    let event = Bytes::from(format!("data: {}\n\n", payload));
    let body = futures_util::stream::once(async move { Ok::<_, Infallible>(event) });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(header::CacheControl(vec![
            header::CacheDirective::NoCache,
            header::CacheDirective::NoStore,
            header::CacheDirective::MustRevalidate,
        ]))
        // Disable nginx buffering
        .insert_header(("x-accel-buffering", "no"))
        .streaming(body)
}

/// Register the HTTP routes. Expects `web::Data<McpServer>` and
/// `web::Data<AtomicU64>` to be present as app data.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics_handler))
        .route("/sse", web::get().to(sse_tools_discovery))
        .route("/mcp", web::post().to(mcp_handler))
        .route("/", web::post().to(mcp_handler))
        .route("/", web::get().to(health));
}

/// Run the MCP server over HTTP.
///
/// Connection limits and timeouts guard against resource exhaustion; the
/// worker count comes from `HttpConfig`.
pub async fn run_server_http(server: Arc<McpServer>, config: &HttpConfig) -> std::io::Result<()> {
    let bind_addr = config.bind_addr();
    let server_data = web::Data::from(server.clone());
    let request_count = web::Data::new(AtomicU64::new(0));

    info!(
        name = %server.info().name,
        version = %server.info().version,
        bind = %bind_addr,
        workers = config.workers,
        "Custom MCP server starting on HTTP"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(server_data.clone())
            .app_data(request_count.clone())
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("X-XSS-Protection", "1; mode=block")),
            )
            // %r = request line, %s = status, %D = duration in ms
            .wrap(Logger::new("%r %s %Dms"))
            .configure(configure_routes)
    })
    .workers(config.workers)
    .max_connections(10000)
    .max_connection_rate(1000)
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_secs(30))
    .client_disconnect_timeout(Duration::from_secs(2))
    .shutdown_timeout(10)
    .bind(&bind_addr)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::initialize_tools;
    use actix_web::{http::StatusCode, test};

    fn server() -> McpServer {
        McpServer::new(ServerInfo::default(), initialize_tools())
    }

    fn call(server: &McpServer, message: Value) -> MCPResponse {
        server
            .handle_message(&message.to_string())
            .expect("expected a response")
    }

    fn call_tool(server: &McpServer, name: &str, arguments: Value) -> Value {
        let response = call(
            server,
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "tools/call",
                "params": { "name": name, "arguments": arguments }
            }),
        );
        assert!(response.error.is_none(), "tool outcomes are results: {response:?}");
        response.result.unwrap()
    }

    #[test]
    fn test_initialize_advertises_identity() {
        let response = call(
            &server(),
            json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }),
        );
        let result = response.result.unwrap();
        assert_eq!(response.id, Some(json!(1)));
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "custom-server");
        assert_eq!(result["serverInfo"]["version"], "1.0.0");
        assert_eq!(result["capabilities"]["tools"], json!({}));
    }

    #[test]
    fn test_ping() {
        let response = call(&server(), json!({ "jsonrpc": "2.0", "id": "a", "method": "ping" }));
        assert_eq!(response.id, Some(json!("a")));
        assert_eq!(response.result, Some(json!({})));
    }

    #[test]
    fn test_tools_list() {
        let response = call(&server(), json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }));
        let tools = &response.result.unwrap()["tools"];
        assert_eq!(tools[0]["name"], "hello_world");
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["name"]));
        assert_eq!(tools[1]["name"], "calculate");
        assert_eq!(
            tools[1]["inputSchema"]["properties"]["operation"]["enum"],
            json!(["add", "subtract", "multiply", "divide"])
        );
    }

    #[test]
    fn test_tools_list_is_byte_identical() {
        let server = server();
        let request = json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" });
        let first = serde_json::to_string(&call(&server, request.clone())).unwrap();
        let second = serde_json::to_string(&call(&server, request)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_call_hello_world() {
        let result = call_tool(&server(), "hello_world", json!({ "name": "Ada" }));
        assert_eq!(
            result,
            json!({
                "content": [{ "type": "text", "text": "Hello, Ada! Welcome to the custom MCP server." }],
                "isError": false
            })
        );
    }

    #[test]
    fn test_call_calculate() {
        let server = server();

        let result = call_tool(&server, "calculate", json!({ "operation": "add", "a": 2, "b": 3 }));
        assert_eq!(result["content"][0]["text"], "Result: 2 add 3 = 5");
        assert_eq!(result["isError"], false);

        let result = call_tool(&server, "calculate", json!({ "operation": "divide", "a": 10, "b": 0 }));
        assert_eq!(result["content"][0]["text"], "Error: Division by zero");
        assert_eq!(result["isError"], true);
    }

    #[test]
    fn test_call_unknown_tool_is_error_result() {
        let result = call_tool(&server(), "does_not_exist", json!({}));
        assert_eq!(result["content"][0]["text"], "Unknown tool: does_not_exist");
        assert_eq!(result["isError"], true);
    }

    #[test]
    fn test_called_names_were_listed() {
        let server = server();
        let listed: Vec<String> = server
            .registry()
            .list_tools()
            .iter()
            .map(|t| t.name.clone())
            .collect();

        for (name, arguments) in [
            ("hello_world", json!({ "name": "Ada" })),
            ("calculate", json!({ "operation": "mod", "a": 1, "b": 2 })),
        ] {
            let result = call_tool(&server, name, arguments);
            assert!(result["content"][0]["text"].is_string());
            assert!(listed.iter().any(|n| n == name));
        }
    }

    #[test]
    fn test_call_without_arguments_fails_validation() {
        let response = call(
            &server(),
            json!({ "jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": { "name": "calculate" } }),
        );
        let result = response.result.unwrap();
        assert_eq!(result["content"][0]["text"], "Missing required parameter: operation");
        assert_eq!(result["isError"], true);
    }

    #[test]
    fn test_call_without_params_is_invalid_params() {
        let response = call(&server(), json!({ "jsonrpc": "2.0", "id": 4, "method": "tools/call" }));
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);

        let response = call(
            &server(),
            json!({ "jsonrpc": "2.0", "id": 5, "method": "tools/call", "params": { "arguments": {} } }),
        );
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[test]
    fn test_unknown_method() {
        let response = call(&server(), json!({ "jsonrpc": "2.0", "id": 6, "method": "resources/list" }));
        let error = response.error.unwrap();
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert_eq!(error.message, "Method not found: resources/list");
    }

    #[test]
    fn test_notifications_get_no_response() {
        let server = server();
        let message = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" });
        assert!(server.handle_message(&message.to_string()).is_none());
    }

    #[test]
    fn test_null_id_request_is_answered() {
        let response = call(&server(), json!({ "jsonrpc": "2.0", "id": null, "method": "ping" }));
        assert_eq!(response.id, Some(Value::Null));
        assert_eq!(response.result, Some(json!({})));
        let serialized = serde_json::to_string(&response).unwrap();
        assert!(serialized.contains("\"id\":null"), "{serialized}");
    }

    #[test]
    fn test_parse_error() {
        let response = server().handle_message("{not json").unwrap();
        assert_eq!(response.id, None);
        assert_eq!(response.error.unwrap().code, PARSE_ERROR);
    }

    #[test]
    fn test_invalid_request_keeps_id() {
        let response = server().handle_message(r#"{"id": 9, "params": {}}"#).unwrap();
        assert_eq!(response.id, Some(json!(9)));
        assert_eq!(response.error.unwrap().code, INVALID_REQUEST);
    }

    #[test]
    fn test_wrong_jsonrpc_version() {
        let response = server()
            .handle_message(r#"{"jsonrpc": "1.0", "id": 3, "method": "ping"}"#)
            .unwrap();
        assert_eq!(response.id, Some(json!(3)));
        assert_eq!(response.error.unwrap().code, INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_serve_lines_round_trip() {
        let server = server();
        let input = [
            json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }).to_string(),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string(),
            String::new(),
            "garbage".to_string(),
            json!({
                "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                "params": { "name": "calculate", "arguments": { "operation": "multiply", "a": 6, "b": 7 } }
            })
            .to_string(),
        ]
        .join("\n");

        let mut output = Vec::new();
        serve_lines(&server, input.as_bytes(), &mut output).await.unwrap();

        let lines: Vec<MCPResponse> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        // initialize, parse error, tools/call; notification and blank line are silent
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].id, Some(json!(1)));
        assert_eq!(lines[1].error.as_ref().unwrap().code, PARSE_ERROR);
        assert_eq!(
            lines[2].result.as_ref().unwrap()["content"][0]["text"],
            "Result: 6 multiply 7 = 42"
        );
    }

    macro_rules! test_app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(server()))
                    .app_data(web::Data::new(AtomicU64::new(0)))
                    .configure(configure_routes),
            )
            .await
        };
    }

    #[actix_rt::test]
    async fn test_http_tools_call() {
        let app = test_app!();
        let req = test::TestRequest::post()
            .uri("/mcp")
            .set_payload(
                json!({
                    "jsonrpc": "2.0", "id": 1, "method": "tools/call",
                    "params": { "name": "calculate", "arguments": { "operation": "divide", "a": 0, "b": 0 } }
                })
                .to_string(),
            )
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["result"]["isError"], true);
        assert_eq!(body["result"]["content"][0]["text"], "Error: Division by zero");
    }

    #[actix_rt::test]
    async fn test_http_notification_is_accepted() {
        let app = test_app!();
        let req = test::TestRequest::post()
            .uri("/")
            .set_payload(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }

    #[actix_rt::test]
    async fn test_http_null_id_request_is_answered() {
        let app = test_app!();
        let req = test::TestRequest::post()
            .uri("/mcp")
            .set_payload(json!({ "jsonrpc": "2.0", "id": null, "method": "tools/list" }).to_string())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["id"], Value::Null);
        assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 2);
    }

    #[actix_rt::test]
    async fn test_http_health_and_metrics() {
        let app = test_app!();

        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(body, json!({ "status": "ok", "service": "custom-server" }));

        let req = test::TestRequest::post()
            .uri("/mcp")
            .set_payload(json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" }).to_string())
            .to_request();
        test::call_service(&app, req).await;

        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
        assert_eq!(body["requests_total"], 1);
    }

    #[actix_rt::test]
    async fn test_http_sse_discovery() {
        let app = test_app!();
        let resp = test::call_service(&app, test::TestRequest::get().uri("/sse").to_request()).await;
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );

        let body = test::read_body(resp).await;
        let text = std::str::from_utf8(&body).unwrap();
        let payload: Value = serde_json::from_str(
            text.strip_prefix("data: ").unwrap().trim_end(),
        )
        .unwrap();
        assert_eq!(payload["count"], 2);
        assert_eq!(payload["tools"][1]["name"], "calculate");
    }
}
