//! Istio EnvoyFilters for settings Gateway API cannot express.
//!
//! Each concern of a route gets its own filter, targeting the gateway the
//! route attaches to once the gateway topology is applied.

use crate::{annotations::*, config::GatewayConfig};
use http::Uri;
use ingress_migrate_core::{
    ir::{
        ingress_nginx::{BodySize, ExternalAuth, IngressNginxHttpRouteIr},
        Ir,
    },
    k8s::{
        envoy_filter::{ApplyTo, ConfigPatch, Patch, PatchOperation, PolicyTargetReference},
        labels, EnvoyFilter, EnvoyFilterSpec,
    },
    resources::insert_new,
    Diagnostic, DiagnosticSink, GatewayResources, ObjectRef, ResourceId,
};
use serde_json::{json, Value};
use tracing::info;

const HTTP_CONNECTION_MANAGER: &str = "envoy.filters.network.http_connection_manager";
const ROUTER: &str = "envoy.filters.http.router";

/// Unlimited body sizes are capped, since Envoy buffers have a fixed limit.
const MAX_BODY_BYTES: u64 = BodySize::GIB;

const DEFAULT_BURST_MULTIPLIER: u32 = 5;

/// Connection limits that effectively disable queueing in the gateway.
const UNBUFFERED_MAX_REQUESTS: u32 = 100_000;

const EXT_AUTHZ_TIMEOUT: &str = "5s";

const DEFAULT_AUTH_RESPONSE_HEADERS: [&str; 3] =
    ["authorization", "x-forwarded-user", "x-forwarded-email"];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Concern {
    RateLimit,
    BodySize,
    NoBuffer,
    ExtAuthz,
}

pub(super) fn build(
    ir: &Ir,
    config: &GatewayConfig,
    resources: &mut GatewayResources,
    sink: &dyn DiagnosticSink,
) {
    for (id, ctx) in &ir.http_routes {
        let Some(ext) = ctx.ingress_nginx() else {
            continue;
        };
        let gateway = config.gateway_ref(&id.namespace);
        let namespace = if config.is_centralized() {
            config.namespace.clone()
        } else {
            id.namespace.clone()
        };

        for (concern, patches) in concerns(ext) {
            let filter_id = ResourceId::new(
                namespace.clone(),
                format!("{}-{}-{}", id.namespace, id.name, concern.suffix()),
            );
            let mut filter = EnvoyFilter::new(
                &filter_id.name,
                EnvoyFilterSpec {
                    target_refs: vec![PolicyTargetReference::gateway(
                        &gateway.namespace,
                        &gateway.name,
                    )],
                    config_patches: patches,
                },
            );
            filter.metadata.namespace = Some(filter_id.namespace.clone());
            filter.metadata.labels = Some(labels::migration_labels());
            filter.metadata.annotations = Some(labels::migration_annotations(
                concern.source(),
                format!("{} for HTTPRoute {id}", concern.description()),
            ));

            if insert_new(&mut resources.gateway_extensions, filter_id.clone(), filter) {
                info!(filter = %filter_id, %gateway, "Generated EnvoyFilter");
                sink.emit(
                    Diagnostic::info(format!(
                        "generated EnvoyFilter {filter_id} ({}) targeting Gateway {gateway}",
                        concern.description()
                    ))
                    .about(ObjectRef::http_route(id.clone())),
                );
            }
        }
    }
}

/// The patches for each concern the route's settings call for.
fn concerns(ext: &IngressNginxHttpRouteIr) -> Vec<(Concern, Vec<ConfigPatch>)> {
    let mut concerns = vec![];

    if let Some(rps) = ext.rate_limit_rps.filter(|rps| *rps > 0) {
        let burst = ext
            .rate_limit_burst
            .filter(|b| *b > 0)
            .unwrap_or_else(|| rps.saturating_mul(DEFAULT_BURST_MULTIPLIER));
        concerns.push((Concern::RateLimit, vec![rate_limit_patch(rps, burst)]));
    }

    if let Some(size) = ext.proxy_body_size {
        let bytes = size.bytes().filter(|b| *b > 0).unwrap_or(MAX_BODY_BYTES);
        concerns.push((Concern::BodySize, body_size_patches(bytes)));
    }

    if ext.proxy_buffering == Some(false) {
        concerns.push((Concern::NoBuffer, vec![no_buffer_patch()]));
    }

    if let Some(auth) = ext.external_auth.as_ref() {
        concerns.push((Concern::ExtAuthz, vec![ext_authz_patch(auth)]));
    }

    concerns
}

// === impl Concern ===

impl Concern {
    fn suffix(&self) -> &'static str {
        match self {
            Self::RateLimit => "ratelimit",
            Self::BodySize => "bodysize",
            Self::NoBuffer => "nobuffer",
            Self::ExtAuthz => "extauthz",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            Self::RateLimit => LIMIT_RPS,
            Self::BodySize => PROXY_BODY_SIZE,
            Self::NoBuffer => PROXY_BUFFERING,
            Self::ExtAuthz => AUTH_URL,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::RateLimit => "local rate limit",
            Self::BodySize => "request body size limit",
            Self::NoBuffer => "proxy buffering disabled",
            Self::ExtAuthz => "external authorization",
        }
    }
}

/// Matches the gateway's HTTP connection manager, inserting before the router.
fn http_filter_patch(value: Value) -> ConfigPatch {
    ConfigPatch {
        apply_to: ApplyTo::HttpFilter,
        match_: json!({
            "context": "GATEWAY",
            "listener": {
                "filterChain": {
                    "filter": {
                        "name": HTTP_CONNECTION_MANAGER,
                        "subFilter": { "name": ROUTER },
                    },
                },
            },
        }),
        patch: Patch {
            operation: PatchOperation::InsertBefore,
            value,
        },
    }
}

fn rate_limit_patch(rps: u32, burst: u32) -> ConfigPatch {
    let always = |runtime_key: &str| {
        json!({
            "runtime_key": runtime_key,
            "default_value": { "numerator": 100, "denominator": "HUNDRED" },
        })
    };
    http_filter_patch(json!({
        "name": "envoy.filters.http.local_ratelimit",
        "typed_config": {
            "@type": "type.googleapis.com/envoy.extensions.filters.http.local_ratelimit.v3.LocalRateLimit",
            "stat_prefix": "http_local_rate_limiter",
            "token_bucket": {
                "max_tokens": burst,
                "tokens_per_fill": rps,
                "fill_interval": "1s",
            },
            "filter_enabled": always("local_rate_limit_enabled"),
            "filter_enforced": always("local_rate_limit_enforced"),
        },
    }))
}

fn body_size_patches(bytes: u64) -> Vec<ConfigPatch> {
    let connection_manager = ConfigPatch {
        apply_to: ApplyTo::NetworkFilter,
        match_: json!({
            "context": "GATEWAY",
            "listener": {
                "filterChain": {
                    "filter": { "name": HTTP_CONNECTION_MANAGER },
                },
            },
        }),
        patch: Patch {
            operation: PatchOperation::Merge,
            value: json!({
                "typed_config": {
                    "@type": "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager",
                    "route_config": { "max_direct_response_body_size_bytes": bytes },
                },
            }),
        },
    };
    let buffer = http_filter_patch(json!({
        "name": "envoy.filters.http.buffer",
        "typed_config": {
            "@type": "type.googleapis.com/envoy.extensions.filters.http.buffer.v3.Buffer",
            "max_request_bytes": bytes,
        },
    }));
    vec![connection_manager, buffer]
}

fn no_buffer_patch() -> ConfigPatch {
    ConfigPatch {
        apply_to: ApplyTo::Cluster,
        match_: json!({ "context": "GATEWAY" }),
        patch: Patch {
            operation: PatchOperation::Merge,
            value: json!({
                "circuit_breakers": {
                    "thresholds": [{
                        "max_pending_requests": UNBUFFERED_MAX_REQUESTS,
                        "max_requests": UNBUFFERED_MAX_REQUESTS,
                    }],
                },
            }),
        },
    }
}

fn ext_authz_patch(auth: &ExternalAuth) -> ConfigPatch {
    let upstream_headers = if auth.response_headers.is_empty() {
        DEFAULT_AUTH_RESPONSE_HEADERS
            .iter()
            .map(|h| json!({ "exact": h }))
            .collect::<Vec<_>>()
    } else {
        auth.response_headers
            .iter()
            .map(|h| json!({ "exact": h.to_ascii_lowercase() }))
            .collect()
    };

    http_filter_patch(json!({
        "name": "envoy.filters.http.ext_authz",
        "typed_config": {
            "@type": "type.googleapis.com/envoy.extensions.filters.http.ext_authz.v3.ExtAuthz",
            "http_service": {
                "server_uri": {
                    "uri": auth.url,
                    "cluster": auth_cluster(&auth.url),
                    "timeout": EXT_AUTHZ_TIMEOUT,
                },
                "authorization_request": {
                    "allowed_headers": {
                        "patterns": [
                            { "exact": "authorization" },
                            { "exact": "cookie" },
                            { "prefix": "x-" },
                        ],
                    },
                },
                "authorization_response": {
                    "allowed_upstream_headers": { "patterns": upstream_headers },
                },
            },
            "failure_mode_allow": false,
        },
    }))
}

/// The Istio outbound cluster that serves the auth URL, e.g.
/// `outbound|8080||auth.auth.svc.cluster.local`.
fn auth_cluster(url: &str) -> String {
    let Ok(uri) = url.parse::<Uri>() else {
        return String::new();
    };
    let host = uri.host().unwrap_or_default();
    let port = uri.port_u16().unwrap_or(match uri.scheme_str() {
        Some("https") => 443,
        _ => 80,
    });
    format!("outbound|{port}||{host}")
}
