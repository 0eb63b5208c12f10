use crate::{
    k8s::{Ingress, ResourceExt, Service},
    ResourceId,
};
use std::collections::BTreeMap;

/// The annotation used to select an ingress class before
/// `spec.ingressClassName` existed.
pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

/// Named ports of each Service, keyed by `namespace/name`.
pub type ServicePorts = BTreeMap<ResourceId, BTreeMap<String, i32>>;

/// The immutable inputs of a conversion run.
#[derive(Clone, Debug, Default)]
pub struct Sources {
    pub ingresses: Vec<Ingress>,
    pub service_ports: ServicePorts,
}

// === impl Sources ===

impl Sources {
    pub fn new(ingresses: Vec<Ingress>, services: &[Service]) -> Self {
        Self {
            ingresses,
            service_ports: service_ports(services),
        }
    }

    /// Resolves a named Service port.
    pub fn service_port(&self, service: &ResourceId, port_name: &str) -> Option<i32> {
        self.service_ports.get(service)?.get(port_name).copied()
    }
}

/// Indexes the named ports of each Service.
pub fn service_ports(services: &[Service]) -> ServicePorts {
    let mut index = ServicePorts::new();
    for svc in services {
        let ports = svc
            .spec
            .iter()
            .flat_map(|spec| spec.ports.iter().flatten())
            .filter_map(|p| Some((p.name.clone()?, p.port)))
            .collect::<BTreeMap<_, _>>();
        index.insert(ResourceId::of(svc), ports);
    }
    index
}

/// The ingress class an Ingress selects, if any.
pub fn ingress_class(ingress: &Ingress) -> Option<&str> {
    ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.ingress_class_name.as_deref())
        .or_else(|| {
            ingress
                .annotations()
                .get(INGRESS_CLASS_ANNOTATION)
                .map(String::as_str)
        })
}
