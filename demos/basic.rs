//! Minimal tsu example — JSON endpoints, health checks and request logging.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl 'http://localhost:3000/orders?page=2'
//!   curl http://localhost:3000/healthz          # not logged
//!
//! Server diagnostics go through `tracing_subscriber::fmt` on stderr; request
//! lines go to stdout as JSON.

use tsu_reqlog::middleware::logger::{self, LoggerConfig, Output};
use tsu_reqlog::{ErrorKind, Request, Response, Router, Server, Status};

#[tokio::main]
async fn main() -> Result<(), tsu_reqlog::Error> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let app = Router::new()
        .get("/users/{id}",    get_user)
        .post("/users",        create_user)
        .delete("/users/{id}", delete_user)
        .get("/orders",        list_orders)
        .get("/healthz",       |_req: Request| async { "ok" })
        .get("/readyz",        |_req: Request| async { "ready" })
        .layer(logger::logger_with_config(
            LoggerConfig::new()
                .output(Output::stdout())
                .skip_paths(["/healthz", "/readyz"]),
        ));

    Server::bind("0.0.0.0:3000")
        .trust_proxy([127, 0, 0, 1].into())
        .serve(app)
        .await
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

// POST /users
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        req.error(ErrorKind::Public, "empty body");
        return Response::status(Status::BAD_REQUEST);
    }

    Response::builder()
        .status(Status::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#)
}

// DELETE /users/{id} → 204 No Content, pointing at the collection
async fn delete_user(_req: Request) -> Response {
    Response::builder()
        .status(Status::NO_CONTENT)
        .header("content-location", "/users")
        .no_body()
}

// GET /orders — always fails, to show ErrorMessage in the log line.
async fn list_orders(req: Request) -> Response {
    req.error(ErrorKind::Private, "db timeout");
    Response::status(Status::SERVICE_UNAVAILABLE)
}
