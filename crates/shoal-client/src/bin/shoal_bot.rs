use tracing_subscriber::EnvFilter;

use shoal_client::app::make_rng;
use shoal_client::{ClientApp, ClientConfig};
use shoal_core::config::GameTuning;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ClientConfig::from_env();
    let seed = std::env::var("SHOAL_SEED").ok().and_then(|s| s.parse().ok());

    let mut app = ClientApp::new(&config, GameTuning::load(), make_rng(seed));
    app.connect(&config).await;
    tracing::info!(
        name = %config.name,
        status = ?app.status(),
        frame_rate = config.frame_rate,
        "Shoal bot started"
    );
    app.run(&config).await;
}
