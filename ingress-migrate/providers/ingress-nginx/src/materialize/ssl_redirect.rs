use crate::annotations::SSL_REDIRECT;
use ingress_migrate_core::{
    ir::Ir,
    k8s::{
        gateway::{
            HttpRequestRedirectFilter, HttpRoute, HttpRouteFilter, HttpRouteRule, HttpRouteSpec,
        },
        labels,
    },
    resources::insert_new,
    routes::{listener_name, name_from_host},
    Diagnostic, DiagnosticSink, GatewayResources, ObjectRef, ResourceId,
};
use tracing::{debug, info};

const REDIRECT_STATUS: u16 = 301;

/// Adds an HTTP-to-HTTPS redirect route for each hostname of every route
/// flagged for SSL redirect. The redirect attaches to the host's HTTP
/// listener only; when the host also has an HTTPS listener, the original
/// route is moved onto it.
pub(super) fn build(ir: &Ir, resources: &mut GatewayResources, sink: &dyn DiagnosticSink) {
    for (id, ctx) in &ir.http_routes {
        if !ctx.ingress_nginx().is_some_and(|ext| ext.ssl_redirect == Some(true)) {
            continue;
        }

        let mut hosts = ctx.route.spec.hostnames().map(str::to_string).collect::<Vec<_>>();
        if hosts.is_empty() {
            hosts.push(String::new());
        }
        let multiple = hosts.len() > 1;

        for host in &hosts {
            let name = if multiple {
                format!("{}-{}-redirect", id.name, name_from_host(host))
            } else {
                format!("{}-redirect", id.name)
            };
            let redirect_id = ResourceId::new(id.namespace.clone(), name);
            let route = redirect_route(&redirect_id, &ctx.route, host);
            if !insert_new(&mut resources.http_routes, redirect_id.clone(), route) {
                debug!(route = %redirect_id, "Redirect route already exists");
                continue;
            }

            info!(route = %redirect_id, %host, "Generated SSL redirect route");
            sink.emit(
                Diagnostic::info(format!(
                    "generated HTTPRoute {redirect_id} redirecting HTTP to HTTPS for {}",
                    display_host(host)
                ))
                .about(ObjectRef::http_route(id.clone())),
            );
        }

        if let [host] = hosts.as_slice() {
            attach_to_https_listener(id, host, resources);
        }
    }
}

fn redirect_route(id: &ResourceId, source: &HttpRoute, host: &str) -> HttpRoute {
    let http_listener = listener_name(host, "http");
    let parent_refs = source
        .spec
        .parent_refs()
        .map(|parent| {
            let mut parent = parent.clone();
            parent.section_name = Some(http_listener.clone());
            parent.port = None;
            parent
        })
        .collect();

    let mut route = HttpRoute::new(
        &id.name,
        HttpRouteSpec {
            parent_refs: Some(parent_refs),
            hostnames: (!host.is_empty()).then(|| vec![host.to_string()]),
            rules: Some(vec![HttpRouteRule {
                filters: Some(vec![HttpRouteFilter::RequestRedirect {
                    request_redirect: HttpRequestRedirectFilter {
                        scheme: Some("https".to_string()),
                        hostname: None,
                        port: None,
                        status_code: Some(REDIRECT_STATUS),
                    },
                }]),
                ..HttpRouteRule::default()
            }]),
        },
    );
    route.metadata.namespace = Some(id.namespace.clone());
    route.metadata.labels = Some(labels::migration_labels());
    route.metadata.annotations = Some(labels::migration_annotations(
        SSL_REDIRECT,
        "HTTP to HTTPS redirect route",
    ));
    route
}

/// Points the route's gateway references at the host's HTTPS listener, when
/// the referenced gateway has one, so that plain-HTTP requests only match
/// the redirect.
fn attach_to_https_listener(id: &ResourceId, host: &str, resources: &mut GatewayResources) {
    let https_listener = listener_name(host, "https");
    let GatewayResources {
        gateways,
        http_routes,
        ..
    } = resources;
    let Some(route) = http_routes.get_mut(id) else {
        return;
    };
    for parent in route.spec.parent_refs_mut() {
        let gateway = ResourceId::new(
            parent.namespace.clone().unwrap_or_else(|| id.namespace.clone()),
            parent.name.clone(),
        );
        let has_https = gateways
            .get(&gateway)
            .is_some_and(|gw| gw.spec.listeners.iter().any(|l| l.name == https_listener));
        if has_https {
            parent.section_name = Some(https_listener.clone());
        }
    }
}

fn display_host(host: &str) -> &str {
    if host.is_empty() {
        "all hosts"
    } else {
        host
    }
}
