//! Labels and annotations stamped onto every generated resource.

use std::collections::BTreeMap;

pub type Map = BTreeMap<String, String>;

pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "ingress2gateway";
pub const MIGRATION: &str = "gateway-api-migration";

pub const SOURCE_ANNOTATION: &str = "ingress2gateway.kubernetes.io/source";
pub const DESCRIPTION_ANNOTATION: &str = "ingress2gateway.kubernetes.io/description";

/// Labels identifying a resource as generated by a migration run.
pub fn migration_labels() -> Map {
    let mut labels = Map::new();
    labels.insert(MANAGED_BY.to_string(), MANAGED_BY_VALUE.to_string());
    labels.insert(MIGRATION.to_string(), "true".to_string());
    labels
}

/// Annotations recording which source produced a resource and why.
pub fn migration_annotations(source: impl ToString, description: impl ToString) -> Map {
    let mut annotations = Map::new();
    annotations.insert(SOURCE_ANNOTATION.to_string(), source.to_string());
    annotations.insert(DESCRIPTION_ANNOTATION.to_string(), description.to_string());
    annotations
}

pub fn is_migration_generated(labels: Option<&Map>) -> bool {
    labels
        .and_then(|l| l.get(MANAGED_BY))
        .is_some_and(|v| v == MANAGED_BY_VALUE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_labels_are_recognized() {
        let labels = migration_labels();
        assert_eq!(labels.get(MIGRATION).map(String::as_str), Some("true"));
        assert!(is_migration_generated(Some(&labels)));
        assert!(!is_migration_generated(None));
        assert!(!is_migration_generated(Some(&Map::new())));
    }
}
