#[cfg(not(target_arch = "wasm32"))]
mod native {
    extern crate microblog;

    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
    use microblog::core::store::MemoryStore;
    use tracing::{error, info};

    mod adapter {
        use actix_web::HttpRequest;
        use spin_sdk::http::{Method, Request, Response};

        pub fn actix_to_spin_request(req: &HttpRequest, body: actix_web::web::Bytes) -> anyhow::Result<Request> {
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
            builder.method(method).uri(uri);
            for (name, value) in req.headers() {
                if let Ok(val_str) = value.to_str() {
                    builder.header(name.as_str(), val_str);
                }
            }

            Ok(builder.body(body.to_vec()).build())
        }

        pub fn spin_to_actix_response(spin_resp: Response) -> actix_web::HttpResponse {
            let status = actix_web::http::StatusCode::from_u16(*spin_resp.status())
                .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);

            let mut response = actix_web::HttpResponse::build(status);
            for (name, value) in spin_resp.headers() {
                if let Some(val_str) = value.as_str() {
                    response.append_header((name.to_string(), val_str.to_string()));
                }
            }

            response.body(spin_resp.body().to_vec())
        }
    }

    pub async fn run() -> std::io::Result<()> {
        dotenvy::dotenv().ok();

        tracing_subscriber::fmt()
            .with_env_filter(
                std::env::var("RUST_LOG").unwrap_or_else(|_| "microblog=debug,actix_web=info".into()),
            )
            .init();

        let store = web::Data::new(MemoryStore::new());
        if microblog::config::seed_demo_data() {
            if let Err(e) = microblog::core::db::init_test_data(store.get_ref()) {
                error!(error = ?e, "failed to seed demo data");
            }
        }

        let bind = std::env::var("MICROBLOG_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        info!(%bind, "server listening");

        HttpServer::new(move || {
            App::new()
                .app_data(store.clone())
                .default_service(web::route().to(handle_all))
        })
        .bind(bind)?
        .run()
        .await
    }

    async fn handle_all(req: HttpRequest, body: web::Bytes, store: web::Data<MemoryStore>) -> HttpResponse {
        let spin_req = match adapter::actix_to_spin_request(&req, body) {
            Ok(r) => r,
            Err(e) => {
                error!(error = ?e, "could not adapt request");
                return HttpResponse::BadRequest().body("Invalid request");
            }
        };

        let resp = microblog::router::dispatch(store.get_ref(), &spin_req);
        adapter::spin_to_actix_response(resp)
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    native::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
