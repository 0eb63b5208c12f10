use crate::{
    ir::Ir,
    k8s::{gateway, EnvoyFilter},
    ResourceId,
};
use std::collections::{btree_map::Entry, BTreeMap};

/// The target resources produced by a conversion, each kind keyed by
/// `namespace/name`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GatewayResources {
    pub gateways: BTreeMap<ResourceId, gateway::Gateway>,
    pub http_routes: BTreeMap<ResourceId, gateway::HttpRoute>,
    pub backend_tls_policies: BTreeMap<ResourceId, gateway::BackendTlsPolicy>,
    pub reference_grants: BTreeMap<ResourceId, gateway::ReferenceGrant>,
    /// Implementation-specific extensions.
    pub gateway_extensions: BTreeMap<ResourceId, EnvoyFilter>,
}

impl GatewayResources {
    /// Lowers the provider-neutral parts of the IR.
    pub fn from_ir(ir: &Ir) -> Self {
        Self {
            gateways: ir.gateways.clone(),
            http_routes: ir
                .http_routes
                .iter()
                .map(|(id, ctx)| (id.clone(), ctx.route.clone()))
                .collect(),
            backend_tls_policies: ir.backend_tls_policies.clone(),
            reference_grants: ir.reference_grants.clone(),
            gateway_extensions: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
            && self.http_routes.is_empty()
            && self.backend_tls_policies.is_empty()
            && self.reference_grants.is_empty()
            && self.gateway_extensions.is_empty()
    }

    /// Adds all resources of `other` whose keys are not yet present.
    pub fn merge(&mut self, other: GatewayResources) {
        fn extend<T>(dst: &mut BTreeMap<ResourceId, T>, src: BTreeMap<ResourceId, T>) {
            for (id, value) in src {
                insert_new(dst, id, value);
            }
        }
        extend(&mut self.gateways, other.gateways);
        extend(&mut self.http_routes, other.http_routes);
        extend(&mut self.backend_tls_policies, other.backend_tls_policies);
        extend(&mut self.reference_grants, other.reference_grants);
        extend(&mut self.gateway_extensions, other.gateway_extensions);
    }
}

/// Inserts `value` unless `id` is already present. Existing entries are
/// never overwritten. Returns true if the value was inserted.
pub fn insert_new<T>(map: &mut BTreeMap<ResourceId, T>, id: ResourceId, value: T) -> bool {
    match map.entry(id) {
        Entry::Vacant(entry) => {
            entry.insert(value);
            true
        }
        Entry::Occupied(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_new_keeps_the_first_value() {
        let mut map = BTreeMap::new();
        let id = ResourceId::new("ns", "a");
        assert!(insert_new(&mut map, id.clone(), 1));
        assert!(!insert_new(&mut map, id.clone(), 2));
        assert_eq!(map[&id], 1);
    }
}
