use crate::config::GatewayConfig;
use ingress_migrate_core::{
    k8s::{
        gateway::{self, ReferenceGrant, ReferenceGrantFrom, ReferenceGrantSpec, ReferenceGrantTo},
        labels,
    },
    resources::insert_new,
    Diagnostic, DiagnosticSink, GatewayResources, ObjectRef, ResourceId,
};
use std::collections::BTreeSet;
use tracing::info;

/// Route kinds that may attach to a gateway in another namespace.
const ROUTE_KINDS: [&str; 2] = ["HTTPRoute", "GRPCRoute"];

/// Adds one ReferenceGrant per route namespace whose gateway lives in a
/// different namespace.
pub(super) fn build(
    config: &GatewayConfig,
    resources: &mut GatewayResources,
    sink: &dyn DiagnosticSink,
) {
    let namespaces = resources
        .http_routes
        .keys()
        .map(|id| id.namespace.clone())
        .collect::<BTreeSet<_>>();

    for namespace in namespaces {
        let gw = config.gateway_ref(&namespace);
        if gw.namespace == namespace {
            continue;
        }

        let id = ResourceId::new(gw.namespace.clone(), format!("allow-routes-from-{namespace}"));
        let mut grant = ReferenceGrant::new(
            &id.name,
            ReferenceGrantSpec {
                from: ROUTE_KINDS
                    .iter()
                    .map(|kind| ReferenceGrantFrom {
                        group: gateway::GROUP.to_string(),
                        kind: kind.to_string(),
                        namespace: namespace.clone(),
                    })
                    .collect(),
                to: vec![ReferenceGrantTo {
                    group: gateway::GROUP.to_string(),
                    kind: "Gateway".to_string(),
                    name: Some(gw.name.clone()),
                }],
            },
        );
        grant.metadata.namespace = Some(id.namespace.clone());
        grant.metadata.labels = Some(labels::migration_labels());
        grant.metadata.annotations = Some(labels::migration_annotations(
            format!("namespace {namespace}"),
            format!("Allows routes in {namespace} to attach to Gateway {gw}"),
        ));

        if insert_new(&mut resources.reference_grants, id.clone(), grant) {
            info!(grant = %id, "Generated ReferenceGrant");
            sink.emit(
                Diagnostic::info(format!(
                    "generated ReferenceGrant {id} so routes in {namespace} can attach to Gateway {gw}"
                ))
                .about(ObjectRef {
                    kind: "ReferenceGrant",
                    id,
                }),
            );
        }
    }
}
