use crate::k8s::{Resource, ResourceExt};
use std::fmt;

/// Identifies a namespaced object by `namespace/name`.
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct ResourceId {
    pub namespace: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identifies a namespaced Kubernetes object. Objects read without a
    /// namespace are placed in `default`.
    pub fn of<T: Resource>(obj: &T) -> Self {
        Self::new(
            obj.namespace().unwrap_or_else(|| "default".to_string()),
            obj.name_any(),
        )
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
