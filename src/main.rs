use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use usageline::config::{Config, Settings};
use usageline_core::usage::{HttpUsageApi, UsageClient};
use usageline_core::StatusRenderer;

fn main() {
    // Parse CLI arguments
    let cli = Config::parse_args();

    // Setup logging
    setup_logging(cli.debug);

    // Load settings; a broken settings file must not blank the status line
    let mut settings = Settings::load(cli.config.as_ref()).unwrap_or_else(|e| {
        warn!("{:#}, using defaults", e);
        Settings::default()
    });
    settings.merge_cli(&cli);
    settings.validate();

    let config_dir = cli.resolve_config_dir();
    let api = HttpUsageApi::new(settings.endpoint.as_str(), settings.timeout());
    let client = UsageClient::for_config_dir(&config_dir, api, settings.cache_ttl());
    let renderer = StatusRenderer::from_offset_minutes(settings.utc_offset_minutes)
        .unwrap_or_default();

    println!("{}", renderer.render_status(&client));
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("usageline=debug,usageline_core=debug")
    } else {
        EnvFilter::new("usageline=error,usageline_core=error")
    };

    // stdout carries the status line; logs go to stderr
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
