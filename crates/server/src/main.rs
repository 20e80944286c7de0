#[macro_use]
extern crate tracing;

use std::sync::Arc;

use tokio::net::TcpListener;
use toolbridge_openai_model::OpenAIProvider;
use toolbridge_server::{ServerConfig, build_agent, router};

#[tokio::main]
async fn main() {
    // Load `.env` first so it can set `RUST_LOG` too.
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    info!("using model {} at {}", config.model.model(), config.model.base_url());

    let agent = match build_agent(OpenAIProvider::new(config.model)) {
        Ok(agent) => agent,
        Err(err) => {
            error!("failed to set up tools: {err}");
            return;
        }
    };
    for descriptor in agent.registry().descriptors() {
        debug!("backend tool: {}", descriptor.name);
    }

    let addr = ("0.0.0.0", config.port);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind port {}: {err}", config.port);
            return;
        }
    };
    info!("listening on http://0.0.0.0:{}", config.port);

    if let Err(err) = axum::serve(listener, router(Arc::new(agent))).await {
        error!("server stopped: {err}");
    }
}
