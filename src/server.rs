use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

use crate::config;
use crate::core::store::MemoryStore;
use crate::router;

mod adapter {
    use actix_web::HttpRequest;
    use spin_sdk::http::{Method, Request, Response};

    pub fn actix_to_spin_request(
        req: &HttpRequest,
        body: actix_web::web::Bytes,
    ) -> anyhow::Result<Request> {
        let method = match req.method().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            other => anyhow::bail!("unsupported method {}", other),
        };

        let uri = req.uri().to_string();

        let mut builder = Request::builder();
        builder.method(method).uri(&uri);

        // Copy headers
        for (name, value) in req.headers() {
            if let Ok(val_str) = value.to_str() {
                builder.header(name.as_str(), val_str);
            }
        }

        Ok(builder.body(body.to_vec()).build())
    }

    pub fn spin_to_actix_response(spin_resp: Response) -> actix_web::HttpResponse {
        let status = *spin_resp.status();
        let body = spin_resp.body().to_vec();

        let mut response = actix_web::HttpResponse::build(
            actix_web::http::StatusCode::from_u16(status)
                .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
        );

        // Every routed response is JSON.
        if !body.is_empty() {
            response.content_type("application/json");
        }
        response.body(body)
    }
}

/// Bind the HTTP server without starting it. Returns the server future and
/// the addresses actually bound, so `:0` can be used for ephemeral ports.
pub fn bind(
    addr: &str,
    store: Arc<MemoryStore>,
    workers: Option<usize>,
) -> std::io::Result<(Server, Vec<SocketAddr>)> {
    let data = web::Data::from(store);
    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .default_service(web::route().to(handle_all))
    });
    if let Some(workers) = workers {
        server = server.workers(workers);
    }

    let server = server.bind(addr)?;
    let addrs = server.addrs();
    Ok((server.run(), addrs))
}

pub async fn run() -> std::io::Result<()> {
    let addr = config::bind_address();
    let (server, addrs) = bind(&addr, Arc::new(MemoryStore::new()), config::worker_count())?;
    for addr in &addrs {
        tracing::info!("Server listening on http://{}", addr);
    }
    server.await
}

async fn handle_all(req: HttpRequest, body: web::Bytes, store: web::Data<MemoryStore>) -> HttpResponse {
    let spin_req = match adapter::actix_to_spin_request(&req, body) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "could not adapt request");
            return HttpResponse::BadRequest()
                .json(serde_json::json!({"error": "Invalid request"}));
        }
    };

    adapter::spin_to_actix_response(router::handle(store.get_ref(), &spin_req))
}
