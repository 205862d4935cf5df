use axum::Router;
use axum::response::Html;
use axum::routing::get;
use cmu_entraid_gate::middleware::{BrokerConfig, SessionUser, auth_routes, with_route_gate};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const CALLBACK_PAGE: &str = r#"<!doctype html>
<p id="status">Signing in...</p>
<script>
  const params = new URLSearchParams(location.search);
  fetch("/api/auth/signin", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ authorizationCode: params.get("code"), state: params.get("state") }),
  })
    .then((r) => r.json())
    .then((body) => {
      if (body.ok) location.href = "/main";
      else document.getElementById("status").textContent = body.message;
    });
</script>"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BrokerConfig::from_env();

    let pages = Router::new()
        .route(
            "/signin",
            get(|| async { Html(r#"<a href="/api/auth/login">Sign in with CMU Account</a>"#) }),
        )
        .route("/cmuEntraIDCallback", get(|| async { Html(CALLBACK_PAGE) }))
        .route("/main", get(main_page))
        .route("/admin-area", get(|| async { Html("<h1>Admin area</h1>") }))
        .with_state(config.session_reader());

    let app = pages.merge(auth_routes(&config, config.auth_client(), config.backend_client()));
    let app = with_route_gate(app, &config, config.backend_client());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn main_page(user: SessionUser) -> Html<String> {
    let name = user
        .claims
        .firstname_en
        .as_deref()
        .unwrap_or(&user.claims.cmuitaccount_name);
    Html(format!(
        r#"<h1>Hello, {name}</h1><form method="post" action="/api/auth/signout"><button>Sign out</button></form>"#
    ))
}
