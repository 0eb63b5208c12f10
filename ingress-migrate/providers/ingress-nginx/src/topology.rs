//! Rearranges the materialized gateways for the configured gateway mode.

use crate::config::{GatewayConfig, GatewayMode};
use ahash::AHashSet as HashSet;
use ingress_migrate_core::{
    k8s::{
        gateway::{self, parent_ref_targets_gateway, Gateway, GatewaySpec},
        labels, ObjectMeta,
    },
    GatewayResources, ResourceId,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub(crate) fn apply(config: &GatewayConfig, resources: &mut GatewayResources) {
    match config.mode {
        GatewayMode::Centralized => centralize(config, resources),
        GatewayMode::PerNamespace => per_namespace(config, resources),
    }
}

/// Points every route at the pre-provisioned shared gateway. Generated
/// gateways are dropped.
fn centralize(config: &GatewayConfig, resources: &mut GatewayResources) {
    let shared = ResourceId::new(config.namespace.clone(), config.name.clone());
    let old = std::mem::take(&mut resources.gateways);
    debug!(gateways = old.len(), %shared, "Replacing generated gateways");

    for (route_id, route) in &mut resources.http_routes {
        let rewritten = rewrite_parent_refs(route_id, route, old.keys(), &shared);
        if rewritten > 0 {
            debug!(route = %route_id, rewritten, "Attached to shared gateway");
        }
    }
}

/// Synthesizes one gateway per route namespace, in that namespace, holding
/// the listeners of the generated gateways its routes referenced.
fn per_namespace(config: &GatewayConfig, resources: &mut GatewayResources) {
    let old = std::mem::take(&mut resources.gateways);

    let mut by_namespace = BTreeMap::<String, Vec<ResourceId>>::new();
    for id in resources.http_routes.keys() {
        by_namespace.entry(id.namespace.clone()).or_default().push(id.clone());
    }

    for (namespace, route_ids) in by_namespace {
        let gw_id = config.gateway_ref(&namespace);

        // Generated gateways this namespace's routes reference or that live
        // in the namespace.
        let referenced = old
            .keys()
            .filter(|gw| {
                gw.namespace == namespace
                    || route_ids.iter().any(|id| {
                        resources.http_routes[id].spec.parent_refs().any(|parent| {
                            parent_ref_targets_gateway(parent, &id.namespace, &gw.namespace, &gw.name)
                        })
                    })
            })
            .cloned()
            .collect::<Vec<_>>();

        let mut seen = HashSet::new();
        let listeners = referenced
            .iter()
            .flat_map(|gw| old[gw].spec.listeners.iter())
            .filter(|l| seen.insert(l.name.clone()))
            .cloned()
            .collect::<Vec<_>>();

        for id in &route_ids {
            if let Some(route) = resources.http_routes.get_mut(id) {
                rewrite_parent_refs(id, route, referenced.iter(), &gw_id);
            }
        }

        info!(gateway = %gw_id, listeners = listeners.len(), "Generated per-namespace gateway");
        resources.gateways.insert(
            gw_id.clone(),
            Gateway {
                metadata: ObjectMeta {
                    namespace: Some(gw_id.namespace.clone()),
                    name: Some(gw_id.name.clone()),
                    labels: Some(labels::migration_labels()),
                    ..Default::default()
                },
                spec: GatewaySpec {
                    gateway_class_name: config.gateway_class.clone(),
                    listeners,
                },
            },
        );
    }
}

/// Rewrites each parent reference that names one of `old` to `new`,
/// keeping its section. Returns the number of references rewritten.
fn rewrite_parent_refs<'a>(
    route_id: &ResourceId,
    route: &mut gateway::HttpRoute,
    old: impl Iterator<Item = &'a ResourceId> + Clone,
    new: &ResourceId,
) -> usize {
    let mut rewritten = 0;
    for parent in route.spec.parent_refs_mut() {
        let matches = old.clone().any(|gw| {
            parent_ref_targets_gateway(parent, &route_id.namespace, &gw.namespace, &gw.name)
        });
        if matches {
            parent.namespace = Some(new.namespace.clone());
            parent.name = new.name.clone();
            rewritten += 1;
        }
    }
    rewritten
}
