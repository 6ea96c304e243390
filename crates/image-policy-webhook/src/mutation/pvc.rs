use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use tracing::debug;

use crate::config::WebhookConfig;
use crate::mutation::patch::{PatchBuilder, PatchOperation};

const STORAGE_CLASS_NAME_PATH: &str = "/spec/storageClassName";

/// Compute the patch operations that pin the claim to the default storage
/// class, when one is configured.
pub fn mutate_pvc(config: &WebhookConfig, pvc: &PersistentVolumeClaim) -> Vec<PatchOperation> {
    let Some(storage_class) = config.default_storage_class.as_deref() else {
        return Vec::new();
    };
    let Some(spec) = pvc.spec.as_ref() else {
        debug!("persistent volume claim has no spec, nothing to mutate");
        return Vec::new();
    };

    let mut patch = PatchBuilder::new();
    match spec.storage_class_name.as_deref() {
        Some(current) if current == storage_class => {}
        current => {
            debug!(
                current = current.unwrap_or_default(),
                storage_class, "setting storage class"
            );
            patch.set(STORAGE_CLASS_NAME_PATH, storage_class, current.is_some());
        }
    }

    patch.build()
}
