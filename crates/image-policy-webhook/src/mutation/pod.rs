use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use serde_json::json;
use tracing::{debug, trace};

use crate::config::{PullSecretMode, WebhookConfig};
use crate::mutation::patch::{PatchBuilder, PatchOperation};
use crate::mutation::registry::rewrite_image;

const IMAGE_PULL_SECRETS_PATH: &str = "/spec/imagePullSecrets";

/// The container lists of a pod, scanned in this order.
#[derive(Clone, Copy, Debug)]
enum ContainerList {
    InitContainers,
    Containers,
}

impl ContainerList {
    const ALL: [ContainerList; 2] = [ContainerList::InitContainers, ContainerList::Containers];

    fn json_field(&self) -> &'static str {
        match self {
            ContainerList::InitContainers => "initContainers",
            ContainerList::Containers => "containers",
        }
    }

    fn containers<'a>(&self, spec: &'a PodSpec) -> &'a [Container] {
        match self {
            ContainerList::InitContainers => spec.init_containers.as_deref().unwrap_or_default(),
            ContainerList::Containers => &spec.containers,
        }
    }

    fn path(&self, index: usize, field: &str) -> String {
        format!("/spec/{}/{}/{}", self.json_field(), index, field)
    }
}

/// Compute the patch operations enforcing the configured policies on the pod.
///
/// Registry rewrite, pull policy enforcement and pull secret injection are
/// applied in this order. Every index used inside of the patch paths refers
/// to the pod as received.
pub fn mutate_pod(config: &WebhookConfig, pod: &Pod) -> Vec<PatchOperation> {
    let Some(spec) = pod.spec.as_ref() else {
        debug!("pod has no spec, nothing to mutate");
        return Vec::new();
    };

    let mut patch = PatchBuilder::new();

    if let Some(registry) = config.registry.as_deref() {
        rewrite_registries(&mut patch, spec, registry, &config.ignored_registries);
    }

    if config.force_image_pull_policy {
        enforce_image_pull_policy(&mut patch, spec, config.image_pull_policy.as_str());
    }

    if let Some(secret) = config.image_pull_secret.as_deref() {
        inject_image_pull_secret(&mut patch, spec, secret, config.image_pull_secret_mode);
    }

    let operations = patch.build();
    debug!(patch = ?operations, "pod patch computed");

    operations
}

fn rewrite_registries(
    patch: &mut PatchBuilder,
    spec: &PodSpec,
    registry: &str,
    ignored_registries: &[String],
) {
    for list in ContainerList::ALL {
        for (index, container) in list.containers(spec).iter().enumerate() {
            let path = list.path(index, "image");
            let image = container.image.as_deref().unwrap_or_default();
            trace!(path = path.as_str(), image, "registry rewrite");

            // a replace operation requires the field to exist
            if image.is_empty() {
                continue;
            }

            if let Some(rewritten) = rewrite_image(image, registry, ignored_registries) {
                patch.replace(path, rewritten);
            }
        }
    }
}

fn enforce_image_pull_policy(patch: &mut PatchBuilder, spec: &PodSpec, policy: &str) {
    for list in ContainerList::ALL {
        for (index, container) in list.containers(spec).iter().enumerate() {
            let path = list.path(index, "imagePullPolicy");
            let current = container.image_pull_policy.as_deref().unwrap_or_default();
            trace!(path = path.as_str(), current, "image pull policy");

            if current != policy {
                patch.set(path, policy, !current.is_empty());
            }
        }
    }
}

fn inject_image_pull_secret(
    patch: &mut PatchBuilder,
    spec: &PodSpec,
    secret: &str,
    mode: PullSecretMode,
) {
    let value = json!([{ "name": secret }]);

    let Some(existing) = spec.image_pull_secrets.as_deref() else {
        patch.add(IMAGE_PULL_SECRETS_PATH, value);
        return;
    };

    match mode {
        PullSecretMode::Append => {
            if !existing.iter().any(|reference| reference.name == secret) {
                patch.add(
                    format!("{IMAGE_PULL_SECRETS_PATH}/{}", existing.len()),
                    value,
                );
            }
        }
        PullSecretMode::Replace => {
            let only_desired_secret = existing.len() == 1 && existing[0].name == secret;
            if !only_desired_secret {
                patch.replace(IMAGE_PULL_SECRETS_PATH, value);
            }
        }
    }
}
