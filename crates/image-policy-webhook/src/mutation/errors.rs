use thiserror::Error;

pub type Result<T> = std::result::Result<T, MutationError>;

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("could not deserialize pod object: {0}")]
    PodDecode(#[source] serde_json::Error),

    #[error("could not deserialize pvc object: {0}")]
    PvcDecode(#[source] serde_json::Error),

    #[error("admission request {0} does not carry an object")]
    MissingObject(String),
}
