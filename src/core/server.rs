/// MCP Server Transports
///
/// HTTP (actix-web) and stdio line-oriented transports, both funneling
/// requests through the same `core::rpc::dispatch` function. actix-web App
/// wiring, worker-count heuristic, `/health`, and a request counter exposed
/// at `/metrics`. Programming errors inside dispatch are caught at this
/// boundary and reported as JSON-RPC `-32603` rather than crashing the
/// worker.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use actix_web::{
    middleware::{Compress, DefaultHeaders, Logger},
    web, App, HttpResponse, HttpServer, Result as ActixResult,
};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::core::context::AppContext;
use crate::core::rpc::{self, RpcRequest};

async fn guarded_dispatch(ctx: &Arc<AppContext>, request: RpcRequest) -> rpc::RpcResponse {
    let id = request.id.clone();
    let cancelled = CancellationToken::new();
    match AssertUnwindSafe(rpc::dispatch(ctx, request, &cancelled))
        .catch_unwind()
        .await
    {
        Ok(response) => response,
        Err(_) => {
            tracing::error!("panic while dispatching request");
            rpc::RpcResponse::internal_error(id, "internal error")
        }
    }
}

async fn health() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}

async fn metrics_handler(counter: web::Data<AtomicU64>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "requests_total": counter.load(Ordering::Relaxed),
        "status": "ok"
    })))
}

async fn mcp_handler(
    ctx: web::Data<Arc<AppContext>>,
    counter: web::Data<AtomicU64>,
    req: web::Json<RpcRequest>,
) -> ActixResult<HttpResponse> {
    counter.fetch_add(1, Ordering::Relaxed);
    let response = guarded_dispatch(ctx.get_ref(), req.into_inner()).await;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn run_http(ctx: Arc<AppContext>, host: &str, port: u16) -> std::io::Result<()> {
    let bind_addr = format!("{host}:{port}");
    let app_data = web::Data::new(ctx);
    let counter = web::Data::new(AtomicU64::new(0));

    let workers = std::env::var("WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or_else(|| num_cpus::get().clamp(1, 16));

    tracing::info!(%bind_addr, workers, "starting http transport");

    HttpServer::new(move || {
        App::new()
            .app_data(app_data.clone())
            .app_data(counter.clone())
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY")),
            )
            .wrap(Logger::new("%r %s %Dms"))
            .route("/health", web::get().to(health))
            .route("/metrics", web::get().to(metrics_handler))
            .route("/mcp", web::post().to(mcp_handler))
    })
    .workers(workers)
    .max_connections(10_000)
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_secs(30))
    .client_disconnect_timeout(Duration::from_secs(2))
    .shutdown_timeout(10)
    .bind(&bind_addr)?
    .run()
    .await
}

pub async fn run_stdio(ctx: Arc<AppContext>) -> std::io::Result<()> {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

    tracing::info!("starting stdio transport");

    let stdin = tokio::io::stdin();
    let mut stdin = BufReader::with_capacity(8192, stdin).lines();
    let stdout = tokio::io::stdout();
    let mut stdout = BufWriter::with_capacity(8192, stdout);

    while let Some(line) = stdin.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request: Result<RpcRequest, _> = serde_json::from_str(&line);
        let response = match request {
            Ok(req) => {
                if req.id.is_none() {
                    continue;
                }
                guarded_dispatch(&ctx, req).await
            }
            Err(e) => {
                let id = serde_json::from_str::<serde_json::Value>(&line)
                    .ok()
                    .and_then(|v| v.get("id").cloned());
                match id {
                    Some(id) => rpc::RpcResponse::parse_error(Some(id), e.to_string()),
                    None => continue,
                }
            }
        };

        if let Ok(json) = serde_json::to_string(&response) {
            if stdout.write_all(json.as_bytes()).await.is_err() {
                break;
            }
            if stdout.write_all(b"\n").await.is_err() {
                break;
            }
            if stdout.flush().await.is_err() {
                break;
            }
        }
    }

    Ok(())
}
