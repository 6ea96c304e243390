use anyhow::{anyhow, Result};
use clap::ArgMatches;
use lazy_static::lazy_static;
use std::collections::BTreeSet;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub static SERVICE_NAME: &str = "image-policy-webhook";

lazy_static! {
    pub(crate) static ref HOSTNAME: String =
        std::env::var("HOSTNAME").unwrap_or_else(|_| String::from("unknown"));
}

pub struct Config {
    pub addr: SocketAddr,
    pub tls_config: Option<TlsConfig>,
    pub webhook: WebhookConfig,
    pub log_level: String,
    pub log_fmt: String,
    pub log_no_color: bool,
}

#[derive(Clone, Debug)]
pub struct TlsConfig {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

/// How the configured pull secret is injected into pods that already
/// reference some pull secrets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PullSecretMode {
    /// Add the secret next to the existing ones, unless already there.
    Append,
    /// Make the secret the only one referenced by the pod.
    #[default]
    Replace,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImagePullPolicy {
    #[default]
    Always,
    IfNotPresent,
    Never,
}

impl ImagePullPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImagePullPolicy::Always => "Always",
            ImagePullPolicy::IfNotPresent => "IfNotPresent",
            ImagePullPolicy::Never => "Never",
        }
    }
}

impl fmt::Display for ImagePullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ImagePullPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Always" => Ok(ImagePullPolicy::Always),
            "IfNotPresent" => Ok(ImagePullPolicy::IfNotPresent),
            "Never" => Ok(ImagePullPolicy::Never),
            other => Err(anyhow!(
                "invalid image pull policy '{other}', allowed values are: Always, IfNotPresent, Never"
            )),
        }
    }
}

/// The mutation policies enforced by the webhook.
///
/// Built once at startup, never changed afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WebhookConfig {
    pub registry: Option<String>,
    pub ignored_registries: Vec<String>,
    pub image_pull_secret: Option<String>,
    pub image_pull_secret_mode: PullSecretMode,
    pub force_image_pull_policy: bool,
    pub image_pull_policy: ImagePullPolicy,
    pub default_storage_class: Option<String>,
    pub excluded_namespaces: BTreeSet<String>,
}

impl WebhookConfig {
    pub fn is_excluded_namespace(&self, namespace: &str) -> bool {
        self.excluded_namespaces.contains(namespace)
    }
}

impl Config {
    pub fn from_args(matches: &ArgMatches) -> Result<Self> {
        let addr = api_bind_address(matches)?;
        let tls_config = tls_files(matches)?;

        let image_pull_policy = matches
            .get_one::<String>("image-pull-policy")
            .expect("This should not happen, there's a default value for image-pull-policy")
            .parse::<ImagePullPolicy>()?;
        let image_pull_secret_mode = if *matches
            .get_one::<bool>("append-image-pull-secret")
            .expect("clap should have set a default value")
        {
            PullSecretMode::Append
        } else {
            PullSecretMode::Replace
        };
        let force_image_pull_policy = matches
            .get_one::<bool>("force-image-pull-policy")
            .expect("clap should have set a default value")
            .to_owned();

        let webhook = WebhookConfig {
            registry: non_empty_value(matches, "registry"),
            ignored_registries: list_values(matches, "ignored-registries"),
            image_pull_secret: non_empty_value(matches, "image-pull-secret"),
            image_pull_secret_mode,
            force_image_pull_policy,
            image_pull_policy,
            default_storage_class: non_empty_value(matches, "default-storage-class"),
            excluded_namespaces: list_values(matches, "exclude-namespaces")
                .into_iter()
                .collect(),
        };

        let log_level = matches
            .get_one::<String>("log-level")
            .expect("This should not happen, there's a default value for log-level")
            .to_owned();
        let log_fmt = matches
            .get_one::<String>("log-fmt")
            .expect("This should not happen, there's a default value for log-fmt")
            .to_owned();
        let log_no_color = matches
            .get_one::<bool>("log-no-color")
            .expect("clap should have assigned a default value")
            .to_owned();

        Ok(Self {
            addr,
            tls_config,
            webhook,
            log_level,
            log_fmt,
            log_no_color,
        })
    }
}

fn api_bind_address(matches: &ArgMatches) -> Result<SocketAddr> {
    let address = matches
        .get_one::<String>("address")
        .ok_or_else(|| anyhow!("error parsing arguments: missing bind address"))?;
    let port = matches
        .get_one::<String>("port")
        .ok_or_else(|| anyhow!("error parsing arguments: missing port"))?;

    format!("{address}:{port}")
        .parse()
        .map_err(|e| anyhow!("error parsing arguments: {}", e))
}

fn tls_files(matches: &ArgMatches) -> Result<Option<TlsConfig>> {
    let cert_file = matches
        .get_one::<String>("cert-file")
        .cloned()
        .unwrap_or_default();
    let key_file = matches
        .get_one::<String>("key-file")
        .cloned()
        .unwrap_or_default();

    match (cert_file.is_empty(), key_file.is_empty()) {
        (true, true) => Ok(None),
        (false, false) => Ok(Some(TlsConfig {
            cert_file: PathBuf::from(cert_file),
            key_file: PathBuf::from(key_file),
        })),
        _ => Err(anyhow!("error parsing arguments: either both --cert-file and --key-file must be provided, or neither")),
    }
}

fn non_empty_value(matches: &ArgMatches, id: &str) -> Option<String> {
    matches
        .get_one::<String>(id)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn list_values(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| {
            values
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}
