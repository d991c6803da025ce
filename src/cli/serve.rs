// src/cli/serve.rs
// Server start-up: validate config, build the client, serve

use anyhow::{Result, bail};
use std::sync::Arc;
use tracing::{info, warn};
use wafaq::assistant::WatsonClient;
use wafaq::config::EnvConfig;
use wafaq::http::create_shared_client;
use wafaq::web::{self, AppState};

pub async fn run_server(config: EnvConfig) -> Result<()> {
    let validation = config.validate();
    for warning in &validation.warnings {
        warn!("{}", warning);
    }
    if !validation.is_valid() {
        bail!("refusing to start:\n{}", validation.report());
    }

    let settings = config.assistant_settings()?;
    info!("Assistant: {}", config.summary());

    let client = WatsonClient::new(create_shared_client(settings.timeout), settings);
    let assistant_id = client.settings().assistant_id.clone();
    let state = AppState::from_config(&config, &assistant_id, Arc::new(client));
    info!(
        "Fallback policy: {:?}, max intents: {}",
        state.resolver.policy(),
        state.max_intents
    );

    if state.kill_switch.is_some() {
        warn!("GET /kill is enabled");
    }

    web::serve(state, &config.host, config.port).await
}
