use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
}

/// A single RFC 6902 operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    pub value: Value,
}

/// Accumulates patch operations in the order they are emitted.
///
/// Array indices inside of the paths are computed by the callers against the
/// object as it was received, the builder never rewrites them.
#[derive(Debug, Default)]
pub struct PatchBuilder {
    operations: Vec<PatchOperation>,
}

impl PatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.push(PatchOp::Add, path.into(), value.into())
    }

    pub fn replace(&mut self, path: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.push(PatchOp::Replace, path.into(), value.into())
    }

    /// Emit an `add` when the target field is currently unset, a `replace`
    /// otherwise.
    pub fn set(
        &mut self,
        path: impl Into<String>,
        value: impl Into<Value>,
        currently_set: bool,
    ) -> &mut Self {
        let op = if currently_set {
            PatchOp::Replace
        } else {
            PatchOp::Add
        };
        self.push(op, path.into(), value.into())
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn build(self) -> Vec<PatchOperation> {
        self.operations
    }

    fn push(&mut self, op: PatchOp, path: String, value: Value) -> &mut Self {
        self.operations.push(PatchOperation { op, path, value });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_insertion_order() {
        let mut builder = PatchBuilder::new();
        builder
            .replace("/spec/containers/0/image", "x.y/a")
            .add("/spec/imagePullSecrets", json!([{"name": "s"}]))
            .set("/spec/containers/0/imagePullPolicy", "Always", false);

        assert_eq!(builder.len(), 3);
        let operations = builder.build();

        let paths: Vec<&str> = operations.iter().map(|o| o.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/spec/containers/0/image",
                "/spec/imagePullSecrets",
                "/spec/containers/0/imagePullPolicy",
            ]
        );
        assert_eq!(operations[2].op, PatchOp::Add);
    }

    #[test]
    fn serializes_as_rfc6902() {
        let mut builder = PatchBuilder::new();
        builder.replace("/spec/storageClassName", "fast");
        builder.set("/spec/containers/1/imagePullPolicy", "Never", true);

        let serialized = serde_json::to_value(builder.build()).unwrap();

        assert_eq!(
            serialized,
            json!([
                {"op": "replace", "path": "/spec/storageClassName", "value": "fast"},
                {"op": "replace", "path": "/spec/containers/1/imagePullPolicy", "value": "Never"}
            ])
        );
    }

    #[test]
    fn empty_builder() {
        let builder = PatchBuilder::new();

        assert!(builder.is_empty());
        assert!(builder.build().is_empty());
    }
}
