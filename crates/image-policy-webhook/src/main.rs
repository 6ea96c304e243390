use anyhow::Result;
use tracing::{debug, info};

use image_policy_webhook::{
    cli,
    config::{Config, SERVICE_NAME},
    tracing::setup_tracing,
    WebhookServer,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli::build_cli().get_matches();
    if let Some(("docs", sub_matches)) = matches.subcommand() {
        return cli::generate_docs(sub_matches);
    }

    let config = Config::from_args(&matches)?;

    let log_level_handle = setup_tracing(&config.log_level, &config.log_fmt, config.log_no_color)?;
    debug!("tracing system ready");

    info!(
        service = SERVICE_NAME,
        version = env!("CARGO_PKG_VERSION"),
        "starting"
    );

    let webhook = &config.webhook;
    info!(
        registry = webhook.registry.as_deref().unwrap_or_default(),
        ignored_registries = ?webhook.ignored_registries,
        image_pull_secret = webhook.image_pull_secret.as_deref().unwrap_or_default(),
        image_pull_secret_mode = ?webhook.image_pull_secret_mode,
        force_image_pull_policy = webhook.force_image_pull_policy,
        image_pull_policy = %webhook.image_pull_policy,
        default_storage_class = webhook.default_storage_class.as_deref().unwrap_or_default(),
        excluded_namespaces = ?webhook.excluded_namespaces,
        "webhook configuration"
    );

    let server = WebhookServer::new_from_config(config, Some(log_level_handle)).await?;
    server.run().await
}
