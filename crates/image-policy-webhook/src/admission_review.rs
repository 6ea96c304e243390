use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ADMISSION_API_VERSION: &str = "admission.k8s.io/v1";
pub const ADMISSION_REVIEW_KIND: &str = "AdmissionReview";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("cannot deserialize AdmissionReview: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("unsupported AdmissionReview group/version/kind: apiVersion '{api_version}', kind '{kind}'")]
    UnsupportedGroupVersionKind { api_version: String, kind: String },

    #[error("cannot serialize AdmissionReview: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVersionResource {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub resource: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    pub uid: String,
    pub kind: GroupVersionKind,
    pub resource: GroupVersionResource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_kind: Option<GroupVersionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_resource: Option<GroupVersionResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_sub_resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub user_info: k8s_openapi::api::authentication::v1::UserInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<k8s_openapi::apimachinery::pkg::runtime::RawExtension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_object: Option<k8s_openapi::apimachinery::pkg::runtime::RawExtension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<k8s_openapi::apimachinery::pkg::runtime::RawExtension>,
}

/// This models the admission/v1/AdmissionResponse object of Kubernetes.
/// See https://pkg.go.dev/k8s.io/api/admission/v1#AdmissionResponse
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    /// Copied over from the corresponding AdmissionRequest.
    pub uid: String,

    pub allowed: bool,

    /// Only "JSONPatch" is supported by Kubernetes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<PatchType>,

    /// Base64 encoded RFC 6902 patch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,

    /// Extra details into why an admission request was denied.
    /// This field IS NOT consulted in any way if "allowed" is "true".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AdmissionResponseStatus>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone)]
pub enum PatchType {
    #[serde(rename = "JSONPatch")]
    #[default]
    JSONPatch,
}

/// Subset of the metav1.StatusReason values this webhook can answer with.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum StatusReason {
    BadRequest,
    Invalid,
    InternalError,
}

impl StatusReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusReason::BadRequest => "BadRequest",
            StatusReason::Invalid => "Invalid",
            StatusReason::InternalError => "InternalError",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone)]
pub struct AdmissionResponseStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// A machine-readable description of why the request was denied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<StatusReason>,
}

impl AdmissionResponse {
    pub fn allow(uid: String) -> AdmissionResponse {
        AdmissionResponse {
            uid,
            allowed: true,
            ..Default::default()
        }
    }

    pub fn deny(uid: String, reason: StatusReason, message: impl Into<String>) -> AdmissionResponse {
        AdmissionResponse {
            uid,
            allowed: false,
            status: Some(AdmissionResponseStatus {
                message: Some(message.into()),
                reason: Some(reason),
            }),
            ..Default::default()
        }
    }

    /// Attach a serialized JSON Patch document to the response.
    pub fn with_patch(self, patch: &[u8]) -> AdmissionResponse {
        AdmissionResponse {
            patch_type: Some(PatchType::JSONPatch),
            patch: Some(general_purpose::STANDARD.encode(patch)),
            ..self
        }
    }
}

/// Decodes and encodes AdmissionReview envelopes of a single group/version.
///
/// The codec is built once at startup and shared by all the request handlers.
#[derive(Clone, Debug)]
pub struct AdmissionCodec {
    api_version: String,
    kind: String,
}

impl Default for AdmissionCodec {
    fn default() -> Self {
        AdmissionCodec {
            api_version: ADMISSION_API_VERSION.to_owned(),
            kind: ADMISSION_REVIEW_KIND.to_owned(),
        }
    }
}

impl AdmissionCodec {
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn decode(&self, raw: &[u8]) -> Result<AdmissionReview, CodecError> {
        let admission_review: AdmissionReview =
            serde_json::from_slice(raw).map_err(CodecError::Deserialize)?;

        let api_version = admission_review.api_version.clone().unwrap_or_default();
        let kind = admission_review.kind.clone().unwrap_or_default();
        if api_version != self.api_version || kind != self.kind {
            return Err(CodecError::UnsupportedGroupVersionKind { api_version, kind });
        }

        Ok(admission_review)
    }

    pub fn encode(&self, response: AdmissionResponse) -> Result<Vec<u8>, CodecError> {
        let admission_review = AdmissionReview {
            api_version: Some(self.api_version.clone()),
            kind: Some(self.kind.clone()),
            request: None,
            response: Some(response),
        };

        serde_json::to_vec(&admission_review).map_err(CodecError::Serialize)
    }
}
