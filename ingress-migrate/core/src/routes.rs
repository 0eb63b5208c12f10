//! Groups Ingress rules into canonical HTTPRoutes and builds the provisional
//! IR that provider passes refine.
//!
//! Rules are grouped by `(namespace, ingress class, host)`. Each group becomes
//! one HTTPRoute named after the first Ingress that contributed to it, and
//! each `(namespace, ingress class)` pair becomes one Gateway named after the
//! class with an HTTP listener per host (and an HTTPS listener for hosts with
//! TLS configured).

use crate::{
    ir::{HttpRouteContext, Ir},
    k8s::{
        gateway::{self, HttpRoute, HttpRouteRule, HttpRouteSpec, Listener},
        HTTPIngressPath, Ingress, IngressBackend, ObjectMeta,
    },
    source::{ingress_class, Sources},
    validation::{ErrorList, FieldError, FieldPath},
    ResourceId,
};
use ahash::AHashMap as HashMap;
use std::collections::BTreeMap;
use tracing::debug;

/// The Ingress rules that share a route key.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleGroup {
    /// The key of the route produced for this group.
    pub route: ResourceId,
    pub ingress_class: String,
    pub host: String,
    /// Contributing Ingresses in iteration order, without duplicates.
    pub sources: Vec<ResourceId>,
    pub paths: Vec<GroupPath>,
    pub tls_secrets: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupPath {
    pub source: ResourceId,
    pub field: FieldPath,
    /// `None` for an Ingress default backend, which matches every request.
    pub path: Option<HTTPIngressPath>,
    pub backend: IngressBackend,
}

/// The output of route resolution.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    pub rule_groups: Vec<RuleGroup>,
    pub ir: Ir,
    pub errors: ErrorList,
}

/// Maps each Ingress to the routes it contributes to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteIndex(BTreeMap<ResourceId, Vec<ResourceId>>);

/// Resolves Ingresses into rule groups and a provisional IR. Ingresses that
/// select no class are treated as selecting `default_class`.
pub fn resolve(sources: &Sources, default_class: &str) -> Resolution {
    let mut errors = ErrorList::new();
    let rule_groups = rule_groups(&sources.ingresses, default_class);

    let mut ir = Ir::default();
    for group in &rule_groups {
        let rules = group
            .paths
            .iter()
            .filter_map(|path| match route_rule(sources, &group.route.namespace, path) {
                Ok(rule) => Some(rule),
                Err(error) => {
                    errors.push(error);
                    None
                }
            })
            .collect::<Vec<_>>();
        if rules.is_empty() {
            debug!(route = %group.route, "No routable paths; skipping");
            continue;
        }

        if ir.http_routes.contains_key(&group.route) {
            let source = group.sources.first().cloned().unwrap_or_else(|| group.route.clone());
            errors.push(FieldError::invalid(
                source,
                FieldPath::new("spec").child("rules").child("host"),
                group.host.clone(),
                format!("host collides with another host of route {}", group.route),
            ));
            continue;
        }

        for rule in &rules {
            for backend in rule.backend_refs.iter().flatten() {
                let svc = ResourceId::new(group.route.namespace.clone(), backend.name.clone());
                ir.services.entry(svc).or_default();
            }
        }

        add_listeners(&mut ir, group);

        let hostnames = (!group.host.is_empty()).then(|| vec![group.host.clone()]);
        let mut route = HttpRoute::new(
            &group.route.name,
            HttpRouteSpec {
                parent_refs: Some(vec![gateway::gateway_parent_ref(
                    None,
                    &group.ingress_class,
                    None,
                )]),
                hostnames,
                rules: Some(rules),
            },
        );
        route.metadata.namespace = Some(group.route.namespace.clone());
        ir.http_routes
            .insert(group.route.clone(), HttpRouteContext::new(route));
    }

    Resolution {
        rule_groups,
        ir,
        errors,
    }
}

/// Groups the rules (and default backends) of all Ingresses by
/// `(namespace, class, host)`, preserving first-seen order.
pub fn rule_groups(ingresses: &[Ingress], default_class: &str) -> Vec<RuleGroup> {
    let mut groups = Vec::<RuleGroup>::new();
    let mut by_key = HashMap::<(String, String, String), usize>::new();

    let mut group_for = |groups: &mut Vec<RuleGroup>, id: &ResourceId, class: &str, host: &str| {
        let key = (id.namespace.clone(), class.to_string(), host.to_string());
        let idx = *by_key.entry(key).or_insert_with(|| {
            groups.push(RuleGroup {
                route: ResourceId::new(id.namespace.clone(), route_name(&id.name, host)),
                ingress_class: class.to_string(),
                host: host.to_string(),
                sources: vec![],
                paths: vec![],
                tls_secrets: vec![],
            });
            groups.len() - 1
        });
        let group = &mut groups[idx];
        if !group.sources.contains(id) {
            group.sources.push(id.clone());
        }
        idx
    };

    for ing in ingresses {
        let Some(spec) = ing.spec.as_ref() else {
            continue;
        };
        let id = ResourceId::of(ing);
        let class = ingress_class(ing).unwrap_or(default_class);

        for (i, rule) in spec.rules.iter().flatten().enumerate() {
            let host = rule.host.as_deref().unwrap_or_default();
            let idx = group_for(&mut groups, &id, class, host);
            for (j, path) in rule.http.iter().flat_map(|h| h.paths.iter()).enumerate() {
                groups[idx].paths.push(GroupPath {
                    source: id.clone(),
                    field: FieldPath::new("spec")
                        .child("rules")
                        .index(i)
                        .child("http")
                        .child("paths")
                        .index(j),
                    path: Some(path.clone()),
                    backend: path.backend.clone(),
                });
            }
        }

        if let Some(backend) = spec.default_backend.as_ref() {
            let idx = group_for(&mut groups, &id, class, "");
            groups[idx].paths.push(GroupPath {
                source: id.clone(),
                field: FieldPath::new("spec").child("defaultBackend"),
                path: None,
                backend: backend.clone(),
            });
        }
    }

    // Default backends match every request, so they're ordered after the
    // explicit paths of their group.
    for group in &mut groups {
        group.paths.sort_by_key(|p| p.path.is_none());
    }

    for ing in ingresses {
        let Some(spec) = ing.spec.as_ref() else {
            continue;
        };
        let id = ResourceId::of(ing);
        let class = ingress_class(ing).unwrap_or(default_class);
        for tls in spec.tls.iter().flatten() {
            let Some(secret) = tls.secret_name.as_ref() else {
                continue;
            };
            for host in tls.hosts.iter().flatten() {
                let key = (id.namespace.clone(), class.to_string(), host.clone());
                if let Some(&idx) = by_key.get(&key) {
                    let secrets = &mut groups[idx].tls_secrets;
                    if !secrets.contains(secret) {
                        secrets.push(secret.clone());
                    }
                }
            }
        }
    }

    groups
}

/// Derives a DNS-label-safe name fragment from a hostname.
///
/// Runs of characters other than ASCII letters and digits become a single
/// `-`, leading separators are dropped, and the empty and wildcard hosts map
/// to `all-hosts`.
pub fn name_from_host(host: &str) -> String {
    if host.is_empty() || host == "*" {
        return "all-hosts".to_string();
    }

    let mut name = String::with_capacity(host.len());
    let mut in_separator = false;
    for c in host.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c.to_ascii_lowercase());
            in_separator = false;
        } else if !in_separator {
            name.push('-');
            in_separator = true;
        }
    }
    name.trim_start_matches('-').to_string()
}

pub fn route_name(ingress_name: &str, host: &str) -> String {
    format!("{ingress_name}-{}", name_from_host(host))
}

/// The name of a host's listener for `protocol` (`http` or `https`).
pub fn listener_name(host: &str, protocol: &str) -> String {
    format!("{}-{protocol}", name_from_host(host))
}

fn route_rule(
    sources: &Sources,
    namespace: &str,
    group_path: &GroupPath,
) -> Result<HttpRouteRule, FieldError> {
    let GroupPath {
        source,
        field,
        path,
        backend,
    } = group_path;

    let Some(service) = backend.service.as_ref() else {
        return Err(FieldError::invalid(
            source.clone(),
            field.clone().child("backend"),
            "resource",
            "only Service backends are supported",
        ));
    };

    let port_field = field.clone().child("backend").child("service").child("port");
    let port = match service.port.as_ref() {
        Some(port) => match (port.number, port.name.as_deref()) {
            (Some(number), _) => Some(number),
            (None, Some(name)) => {
                let svc = ResourceId::new(namespace, service.name.clone());
                let number = sources.service_port(&svc, name).ok_or_else(|| {
                    FieldError::invalid(
                        source.clone(),
                        port_field.clone().child("name"),
                        name,
                        format!("no port named {name:?} on Service {svc}"),
                    )
                })?;
                Some(number)
            }
            (None, None) => None,
        },
        None => None,
    };

    let matches = path.as_ref().map(|path| {
        let r#type = match path.path_type.as_str() {
            "Exact" => gateway::HTTPRouteRulesMatchesPathType::Exact,
            // ImplementationSpecific paths are nginx prefixes unless regex
            // matching is enabled, which is reported separately.
            _ => gateway::HTTPRouteRulesMatchesPathType::PathPrefix,
        };
        vec![gateway::HTTPRouteRulesMatches {
            path: Some(gateway::HTTPRouteRulesMatchesPath {
                r#type: Some(r#type),
                value: Some(path.path.clone().unwrap_or_else(|| "/".to_string())),
            }),
            ..Default::default()
        }]
    });

    Ok(HttpRouteRule {
        matches,
        filters: None,
        backend_refs: Some(vec![gateway::HTTPRouteRulesBackendRefs {
            weight: None,
            group: None,
            kind: None,
            namespace: None,
            name: service.name.clone(),
            port,
            filters: None,
        }]),
        timeouts: None,
    })
}

fn add_listeners(ir: &mut Ir, group: &RuleGroup) {
    let id = ResourceId::new(group.route.namespace.clone(), group.ingress_class.clone());
    let gw = ir.gateways.entry(id).or_insert_with(|| gateway::Gateway {
        metadata: ObjectMeta {
            namespace: Some(group.route.namespace.clone()),
            name: Some(group.ingress_class.clone()),
            ..Default::default()
        },
        spec: gateway::GatewaySpec {
            gateway_class_name: group.ingress_class.clone(),
            listeners: vec![],
        },
    });

    let hostname = (!group.host.is_empty()).then(|| group.host.clone());
    let mut listeners = vec![Listener::http(
        listener_name(&group.host, "http"),
        hostname.clone(),
    )];
    if !group.tls_secrets.is_empty() {
        let refs = group
            .tls_secrets
            .iter()
            .map(|secret| gateway::SecretObjectReference {
                name: secret.clone(),
                ..Default::default()
            })
            .collect();
        listeners.push(Listener::https(
            listener_name(&group.host, "https"),
            hostname,
            refs,
        ));
    }
    for listener in listeners {
        if !gw.spec.listeners.iter().any(|l| l.name == listener.name) {
            gw.spec.listeners.push(listener);
        }
    }
}

// === impl RouteIndex ===

impl RouteIndex {
    /// Indexes the groups whose routes exist in `ir`.
    pub fn new(groups: &[RuleGroup], ir: &Ir) -> Self {
        let mut index = BTreeMap::<ResourceId, Vec<ResourceId>>::new();
        for group in groups {
            if !ir.http_routes.contains_key(&group.route) {
                continue;
            }
            for source in &group.sources {
                let routes = index.entry(source.clone()).or_default();
                if !routes.contains(&group.route) {
                    routes.push(group.route.clone());
                }
            }
        }
        Self(index)
    }

    /// The routes an Ingress contributes to, in group order.
    pub fn routes_for(&self, ingress: &ResourceId) -> &[ResourceId] {
        self.0.get(ingress).map(Vec::as_slice).unwrap_or_default()
    }
}
