use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::warn;

use crate::admission_review::{AdmissionRequest, GroupVersionResource};
use crate::config::WebhookConfig;

pub mod errors;
pub mod patch;
pub mod pod;
pub mod pvc;
pub mod registry;

pub use errors::MutationError;
use errors::Result;
use patch::PatchOperation;

/// The resources the webhook knows how to mutate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceType {
    Pod,
    PersistentVolumeClaim,
    Unrecognized,
}

impl From<&GroupVersionResource> for ResourceType {
    fn from(gvr: &GroupVersionResource) -> Self {
        match (gvr.group.as_str(), gvr.version.as_str(), gvr.resource.as_str()) {
            ("", "v1", "pods") => ResourceType::Pod,
            ("", "v1", "persistentvolumeclaims") => ResourceType::PersistentVolumeClaim,
            _ => ResourceType::Unrecognized,
        }
    }
}

/// Computes the patch operations to be applied to the objects carried by
/// admission requests.
#[derive(Clone, Debug)]
pub struct MutationEngine {
    config: Arc<WebhookConfig>,
}

impl MutationEngine {
    pub fn new(config: WebhookConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// Decode the object of the request and compute its patch operations.
    ///
    /// Resources other than pods and persistent volume claims are let
    /// through without any patch.
    pub fn apply_mutations(&self, request: &AdmissionRequest) -> Result<Vec<PatchOperation>> {
        match ResourceType::from(&request.resource) {
            ResourceType::Pod => {
                let pod: Pod = decode_object(request, MutationError::PodDecode)?;
                Ok(pod::mutate_pod(&self.config, &pod))
            }
            ResourceType::PersistentVolumeClaim => {
                let pvc: PersistentVolumeClaim =
                    decode_object(request, MutationError::PvcDecode)?;
                Ok(pvc::mutate_pvc(&self.config, &pvc))
            }
            ResourceType::Unrecognized => {
                warn!(
                    group = request.resource.group.as_str(),
                    version = request.resource.version.as_str(),
                    resource = request.resource.resource.as_str(),
                    "got an unexpected resource, letting it through"
                );
                Ok(Vec::new())
            }
        }
    }
}

fn decode_object<T>(
    request: &AdmissionRequest,
    decode_error: fn(serde_json::Error) -> MutationError,
) -> Result<T>
where
    T: DeserializeOwned,
{
    let raw = request
        .object
        .as_ref()
        .ok_or_else(|| MutationError::MissingObject(request.uid.clone()))?;

    T::deserialize(&raw.0).map_err(decode_error)
}
