//! Reads Ingresses and Services from multi-document Kubernetes manifests.

use crate::{
    core::source::ingress_class,
    k8s::{Ingress, ResourceExt, Service},
};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

/// Selects which Ingresses are converted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    /// Ingresses selecting another class are skipped. Ingresses that select
    /// no class are always included.
    pub ingress_class: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifests: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to decode document {index}: {source}")]
    Document {
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Reads a manifest file, or stdin when `path` is `-`.
pub fn read_input(path: &str) -> Result<String, ReadError> {
    use std::io::Read;

    let res = if path == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).map(|_| text)
    } else {
        std::fs::read_to_string(path)
    };
    res.map_err(|source| ReadError::Io {
        path: PathBuf::from(path),
        source,
    })
}

/// Decodes every Ingress and Service in `text`, including the items of `List`
/// documents. Other kinds are ignored.
pub fn read_manifests(text: &str, filter: &Filter) -> Result<(Vec<Ingress>, Vec<Service>), ReadError> {
    let mut ingresses = Vec::new();
    let mut services = Vec::new();

    for (index, doc) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = serde_yaml::Value::deserialize(doc)?;
        if value.is_null() {
            continue;
        }
        let mut objects = vec![value];
        while let Some(value) = objects.pop() {
            match kind(&value) {
                Some("List") => {
                    if let Some(serde_yaml::Value::Sequence(items)) = value.get("items") {
                        objects.extend(items.iter().rev().cloned());
                    }
                }
                Some("Ingress") => {
                    let ing = Ingress::deserialize(value)
                        .map_err(|source| ReadError::Document { index, source })?;
                    if filter.matches(&ing) {
                        ingresses.push(ing);
                    } else {
                        debug!(ns = ?ing.namespace(), name = %ing.name_any(), "Skipping Ingress");
                    }
                }
                Some("Service") => {
                    let svc = Service::deserialize(value)
                        .map_err(|source| ReadError::Document { index, source })?;
                    services.push(svc);
                }
                kind => debug!(index, ?kind, "Ignoring document"),
            }
        }
    }

    debug!(
        ingresses = ingresses.len(),
        services = services.len(),
        "Read manifests"
    );
    Ok((ingresses, services))
}

fn kind(value: &serde_yaml::Value) -> Option<&str> {
    value.get("kind")?.as_str()
}

// === impl Filter ===

impl Filter {
    pub fn matches(&self, ing: &Ingress) -> bool {
        if let Some(ns) = self.namespace.as_deref() {
            if ing.namespace().as_deref().unwrap_or("default") != ns {
                return false;
            }
        }
        match (self.ingress_class.as_deref(), ingress_class(ing)) {
            (Some(want), Some(class)) => want == class,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MANIFESTS: &str = r#"
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: web
  namespace: shop
spec:
  ingressClassName: nginx
  rules:
  - host: shop.test
    http:
      paths:
      - path: /
        pathType: Prefix
        backend:
          service:
            name: web
            port:
              number: 80
---
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: legacy
  namespace: shop
  annotations:
    kubernetes.io/ingress.class: traefik
spec:
  defaultBackend:
    service:
      name: web
      port:
        number: 80
---
---
apiVersion: v1
kind: List
items:
- apiVersion: v1
  kind: Service
  metadata:
    name: web
    namespace: shop
  spec:
    ports:
    - name: http
      port: 80
- apiVersion: v1
  kind: ConfigMap
  metadata:
    name: settings
    namespace: shop
"#;

    fn names(ingresses: &[Ingress]) -> Vec<String> {
        ingresses.iter().map(|i| i.name_any()).collect()
    }

    #[test]
    fn reads_ingresses_and_services() {
        let (ingresses, services) = read_manifests(MANIFESTS, &Filter::default()).unwrap();
        assert_eq!(names(&ingresses), vec!["web", "legacy"]);
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].name_any(), "web");
    }

    #[test]
    fn filters_by_class() {
        let filter = Filter {
            ingress_class: Some("nginx".to_string()),
            namespace: None,
        };
        let (ingresses, _) = read_manifests(MANIFESTS, &filter).unwrap();
        assert_eq!(names(&ingresses), vec!["web"]);
    }

    #[test]
    fn filters_by_namespace() {
        let filter = Filter {
            ingress_class: None,
            namespace: Some("default".to_string()),
        };
        let (ingresses, services) = read_manifests(MANIFESTS, &filter).unwrap();
        assert!(ingresses.is_empty());
        // Services are indexed regardless of the namespace filter.
        assert_eq!(services.len(), 1);
    }

    #[test]
    fn malformed_documents_are_errors() {
        let text = "kind: Ingress\nmetadata: []\n";
        match read_manifests(text, &Filter::default()) {
            Err(ReadError::Document { index: 0, .. }) => {}
            res => panic!("unexpected result: {res:?}"),
        }
    }
}
