use axum::Router;
use image_policy_webhook::{
    config::{Config, ImagePullPolicy, PullSecretMode, WebhookConfig},
    tracing::LogLevelHandle,
    WebhookServer,
};
use std::{collections::BTreeSet, net::SocketAddr};

pub(crate) fn default_test_config() -> Config {
    Config {
        addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
        tls_config: None,
        webhook: WebhookConfig {
            registry: Some("registry.example.com".to_owned()),
            ignored_registries: vec!["quay.io/acme".to_owned()],
            image_pull_secret: Some("regcred".to_owned()),
            image_pull_secret_mode: PullSecretMode::Replace,
            force_image_pull_policy: true,
            image_pull_policy: ImagePullPolicy::Always,
            default_storage_class: Some("fast-ssd".to_owned()),
            excluded_namespaces: BTreeSet::from(["kube-system".to_owned()]),
        },
        log_level: "info".to_owned(),
        log_fmt: "json".to_owned(),
        log_no_color: false,
    }
}

pub(crate) async fn app(config: Config) -> Router {
    app_with_log_level_handle(config, None).await
}

pub(crate) async fn app_with_log_level_handle(
    config: Config,
    log_level_handle: Option<LogLevelHandle>,
) -> Router {
    let server = WebhookServer::new_from_config(config, log_level_handle)
        .await
        .unwrap();

    server.router()
}
