use axum::http::StatusCode;
use tracing::{debug, error, warn};

use crate::admission_review::{AdmissionRequest, AdmissionResponse, StatusReason};
use crate::api::state::ApiServerState;
use crate::api::{populate_span_with_admission_request_data, populate_span_with_mutation_results};
use crate::mutation::MutationEngine;

pub(crate) const EMPTY_REVIEW_MESSAGE: &str = "Deserializing the request produced a empty review";

/// The admission response to send back, along with the HTTP status code of
/// the reply.
#[derive(Debug)]
pub(crate) struct ReviewOutcome {
    pub(crate) status: StatusCode,
    pub(crate) response: AdmissionResponse,
}

impl ReviewOutcome {
    fn ok(response: AdmissionResponse) -> Self {
        Self {
            status: StatusCode::OK,
            response,
        }
    }
}

/// Process the body of a `/mutate` request.
///
/// Every failure past the transport layer is reported inside of the
/// admission response, so that the API server gets a structured denial.
pub(crate) fn review(state: &ApiServerState, body: &[u8]) -> ReviewOutcome {
    let admission_review = match state.codec.decode(body) {
        Ok(admission_review) => admission_review,
        Err(e) => {
            warn!(error = %e, "cannot decode admission review");
            return ReviewOutcome::ok(AdmissionResponse::deny(
                String::new(),
                StatusReason::BadRequest,
                e.to_string(),
            ));
        }
    };

    let Some(request) = admission_review.request else {
        warn!("admission review does not carry a request");
        return ReviewOutcome {
            status: StatusCode::BAD_REQUEST,
            response: AdmissionResponse::deny(
                String::new(),
                StatusReason::Invalid,
                EMPTY_REVIEW_MESSAGE,
            ),
        };
    };

    populate_span_with_admission_request_data(&request);

    let response = mutate(&state.engine, &request);

    populate_span_with_mutation_results(&response);

    ReviewOutcome::ok(response)
}

fn mutate(engine: &MutationEngine, request: &AdmissionRequest) -> AdmissionResponse {
    let uid = request.uid.clone();
    let namespace = request.namespace.as_deref().unwrap_or_default();

    let patch = if engine.config().is_excluded_namespace(namespace) {
        debug!(namespace, "namespace is excluded, skipping mutation");
        Vec::new()
    } else {
        match engine.apply_mutations(request) {
            Ok(patch) => patch,
            Err(e) => {
                warn!(error = %e, "cannot mutate object");
                return AdmissionResponse::deny(uid, StatusReason::BadRequest, e.to_string());
            }
        }
    };

    if patch.is_empty() {
        return AdmissionResponse::allow(uid);
    }

    match serde_json::to_vec(&patch) {
        Ok(patch) => AdmissionResponse::allow(uid).with_patch(&patch),
        Err(e) => {
            error!(error = %e, "cannot serialize patch");
            AdmissionResponse::deny(uid, StatusReason::InternalError, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission_review::{AdmissionCodec, PatchType};
    use crate::config::WebhookConfig;
    use base64::{engine::general_purpose, Engine as _};
    use serde_json::json;
    use std::collections::BTreeSet;

    fn state(config: WebhookConfig) -> ApiServerState {
        ApiServerState {
            engine: MutationEngine::new(config),
            codec: AdmissionCodec::default(),
        }
    }

    fn pod_review(namespace: &str, image: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "a7f3c1de-0001-4d2b-9f4e-5b1c2d3e4f50",
                "kind": {"group": "", "version": "v1", "kind": "Pod"},
                "resource": {"group": "", "version": "v1", "resource": "pods"},
                "namespace": namespace,
                "operation": "CREATE",
                "object": {
                    "apiVersion": "v1",
                    "kind": "Pod",
                    "metadata": {"name": "web", "namespace": namespace},
                    "spec": {"containers": [{"name": "web", "image": image}]}
                }
            }
        }))
        .unwrap()
    }

    fn decoded_patch(response: &AdmissionResponse) -> serde_json::Value {
        let patch = response.patch.as_ref().expect("patch should be set");
        let raw = general_purpose::STANDARD.decode(patch).unwrap();
        serde_json::from_slice(&raw).unwrap()
    }

    #[test]
    fn mutated_pod() {
        let state = state(WebhookConfig {
            registry: Some("registry.example.com".to_owned()),
            ..Default::default()
        });

        let outcome = review(&state, &pod_review("default", "nginx"));

        assert_eq!(outcome.status, StatusCode::OK);
        assert!(outcome.response.allowed);
        assert_eq!(outcome.response.uid, "a7f3c1de-0001-4d2b-9f4e-5b1c2d3e4f50");
        assert_eq!(outcome.response.patch_type, Some(PatchType::JSONPatch));
        assert_eq!(
            decoded_patch(&outcome.response),
            json!([{
                "op": "replace",
                "path": "/spec/containers/0/image",
                "value": "registry.example.com/nginx"
            }])
        );
    }

    #[test]
    fn nothing_to_mutate() {
        let state = state(WebhookConfig {
            registry: Some("registry.example.com".to_owned()),
            ..Default::default()
        });

        let outcome = review(&state, &pod_review("default", "registry.example.com/nginx"));

        assert_eq!(outcome.status, StatusCode::OK);
        assert!(outcome.response.allowed);
        assert!(outcome.response.patch.is_none());
        assert!(outcome.response.patch_type.is_none());
        assert!(outcome.response.status.is_none());
    }

    #[test]
    fn excluded_namespace() {
        let state = state(WebhookConfig {
            registry: Some("registry.example.com".to_owned()),
            excluded_namespaces: BTreeSet::from(["kube-system".to_owned()]),
            ..Default::default()
        });

        let outcome = review(&state, &pod_review("kube-system", "nginx"));

        assert_eq!(outcome.status, StatusCode::OK);
        assert!(outcome.response.allowed);
        assert!(outcome.response.patch.is_none());
    }

    #[test]
    fn malformed_body() {
        let outcome = review(&state(WebhookConfig::default()), b"not json");

        assert_eq!(outcome.status, StatusCode::OK);
        assert!(!outcome.response.allowed);
        let status = outcome.response.status.expect("status should be set");
        assert_eq!(status.reason, Some(StatusReason::BadRequest));
        assert!(status.message.is_some());
    }

    #[test]
    fn empty_review() {
        let body = br#"{"apiVersion": "admission.k8s.io/v1", "kind": "AdmissionReview"}"#;

        let outcome = review(&state(WebhookConfig::default()), body);

        assert_eq!(outcome.status, StatusCode::BAD_REQUEST);
        assert!(!outcome.response.allowed);
        let status = outcome.response.status.expect("status should be set");
        assert_eq!(status.reason, Some(StatusReason::Invalid));
        assert_eq!(status.message.as_deref(), Some(EMPTY_REVIEW_MESSAGE));
    }

    #[test]
    fn malformed_object() {
        let body = serde_json::to_vec(&json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "broken",
                "kind": {"group": "", "version": "v1", "kind": "Pod"},
                "resource": {"group": "", "version": "v1", "resource": "pods"},
                "namespace": "default",
                "operation": "CREATE",
                "object": {"spec": {"containers": 42}}
            }
        }))
        .unwrap();

        let outcome = review(&state(WebhookConfig::default()), &body);

        assert_eq!(outcome.status, StatusCode::OK);
        assert!(!outcome.response.allowed);
        assert_eq!(outcome.response.uid, "broken");
        let status = outcome.response.status.expect("status should be set");
        assert_eq!(status.reason, Some(StatusReason::BadRequest));
        assert!(status
            .message
            .unwrap()
            .starts_with("could not deserialize pod object"));
    }
}
