use crate::admission_review::AdmissionCodec;
use crate::mutation::MutationEngine;

pub(crate) struct ApiServerState {
    pub(crate) engine: MutationEngine,
    pub(crate) codec: AdmissionCodec,
}
