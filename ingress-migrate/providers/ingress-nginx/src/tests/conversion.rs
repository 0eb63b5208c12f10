use super::*;
use crate::annotations::*;
use ingress_migrate_core::{
    k8s::{
        envoy_filter::ApplyTo,
        gateway::{HttpRouteFilter, HttpRouteRule},
        labels,
    },
    ResourceId,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn centralized() -> GatewayConfig {
    GatewayConfig::default()
}

#[test]
fn plain_ingress_produces_no_extensions() {
    let mut ing = mk_ingress("shop", "web", btreemap_str(&[]));
    add_rule(&mut ing, "shop.test", "/", "web", 80);
    let run = Run::materialize(vec![ing], &centralized());

    assert!(run.errors.is_empty(), "{:?}", run.errors);
    assert_eq!(run.resources.http_routes.len(), 1);
    assert!(run.resources.gateway_extensions.is_empty());
    assert!(run.resources.backend_tls_policies.is_empty());
    assert_eq!(
        run.ir.http_routes[&ResourceId::new("shop", "web-shop-test")].ingress_nginx(),
        None
    );
}

#[test]
fn rate_limit_filter_defaults_burst() {
    let mut ing = mk_ingress("shop", "web", btreemap_str(&[(LIMIT_RPS, "1000")]));
    add_rule(&mut ing, "shop.test", "/", "web", 80);
    let run = Run::materialize(vec![ing], &centralized());

    let id = ResourceId::new("istio-system", "shop-web-shop-test-ratelimit");
    let filter = &run.resources.gateway_extensions[&id];
    assert_eq!(filter.spec.target_refs.len(), 1);
    assert_eq!(filter.spec.target_refs[0].name, "platform-gateway");
    assert_eq!(
        filter.spec.target_refs[0].namespace.as_deref(),
        Some("istio-system")
    );

    let patch = &filter.spec.config_patches[0];
    assert_eq!(patch.apply_to, ApplyTo::HttpFilter);
    assert_eq!(
        patch.patch.value["typed_config"]["token_bucket"],
        json!({ "max_tokens": 5000, "tokens_per_fill": 1000, "fill_interval": "1s" })
    );
    assert!(labels::is_migration_generated(filter.metadata.labels.as_ref()));
}

#[test]
fn each_concern_gets_its_own_filter() {
    let mut ing = mk_ingress(
        "shop",
        "web",
        btreemap_str(&[
            (LIMIT_RPM, "600"),
            (PROXY_BODY_SIZE, "10m"),
            (PROXY_BUFFERING, "off"),
            (AUTH_URL, "http://auth.auth.svc.cluster.local/verify"),
        ]),
    );
    add_rule(&mut ing, "shop.test", "/", "web", 80);
    let config = GatewayConfig {
        mode: crate::GatewayMode::PerNamespace,
        ..GatewayConfig::default()
    };
    let run = Run::materialize(vec![ing], &config);

    let names = run
        .resources
        .gateway_extensions
        .keys()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![
            "shop/shop-web-shop-test-bodysize",
            "shop/shop-web-shop-test-extauthz",
            "shop/shop-web-shop-test-nobuffer",
            "shop/shop-web-shop-test-ratelimit",
        ]
    );
    for filter in run.resources.gateway_extensions.values() {
        assert_eq!(filter.spec.target_refs[0].name, "shop-gateway");
    }
}

#[test]
fn shared_backend_gets_one_backend_tls_policy() {
    let mut a = mk_ingress("shop", "a", btreemap_str(&[(BACKEND_PROTOCOL, "HTTPS")]));
    add_rule(&mut a, "a.test", "/", "api", 443);
    let mut b = mk_ingress("shop", "b", btreemap_str(&[(BACKEND_PROTOCOL, "HTTPS")]));
    add_rule(&mut b, "b.test", "/", "api", 443);
    let run = Run::convert(vec![a, b], centralized());

    let keys = run
        .resources
        .backend_tls_policies
        .keys()
        .cloned()
        .collect::<Vec<_>>();
    assert_eq!(keys, vec![ResourceId::new("shop", "api-backend-tls")]);
}

#[test]
fn force_ssl_redirect_attaches_to_the_http_listener() {
    let mut ing = mk_ingress("shop", "web", btreemap_str(&[(FORCE_SSL_REDIRECT, "true")]));
    add_rule(&mut ing, "shop.test", "/", "web", 80);
    set_tls(&mut ing, &["shop.test"], "shop-cert");
    let run = Run::materialize(vec![ing], &centralized());

    let redirect = &run.resources.http_routes[&ResourceId::new("shop", "web-shop-test-redirect")];
    let parents = redirect.spec.parent_refs().collect::<Vec<_>>();
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].section_name.as_deref(), Some("shop-test-http"));
    assert_eq!(redirect.spec.hostnames, Some(vec!["shop.test".to_string()]));

    let rules = redirect.spec.rules.as_ref().expect("rules");
    let HttpRouteRule {
        filters,
        backend_refs,
        ..
    } = &rules[0];
    assert_eq!(backend_refs, &None);
    match filters.as_deref() {
        Some([HttpRouteFilter::RequestRedirect { request_redirect }]) => {
            assert_eq!(request_redirect.scheme.as_deref(), Some("https"));
            assert_eq!(request_redirect.status_code, Some(301));
        }
        filters => panic!("unexpected filters: {filters:?}"),
    }

    // The original route serves HTTPS only.
    let route = &run.resources.http_routes[&ResourceId::new("shop", "web-shop-test")];
    let section = route
        .spec
        .parent_refs()
        .next()
        .and_then(|p| p.section_name.clone());
    assert_eq!(section.as_deref(), Some("shop-test-https"));
}

#[test]
fn existing_redirect_route_is_kept() {
    let mut ing = mk_ingress("shop", "web", btreemap_str(&[(SSL_REDIRECT, "true")]));
    add_rule(&mut ing, "shop.test", "/", "web", 80);

    // A route that already uses the redirect route's name.
    let mut clash = mk_ingress("shop", "web-shop-test", btreemap_str(&[]));
    add_rule(&mut clash, "redirect", "/", "other", 80);
    let run = Run::materialize(vec![ing, clash], &centralized());

    let existing = &run.resources.http_routes[&ResourceId::new("shop", "web-shop-test-redirect")];
    assert_eq!(existing.spec.hostnames, Some(vec!["redirect".to_string()]));
}

#[test]
fn scriptlets_block_in_every_mode() {
    for mode in [crate::GatewayMode::Centralized, crate::GatewayMode::PerNamespace] {
        let mut ing = mk_ingress(
            "shop",
            "web",
            btreemap_str(&[(CONFIGURATION_SNIPPET, "more_set_headers \"X-Frame: deny\";")]),
        );
        add_rule(&mut ing, "shop.test", "/", "web", 80);
        let config = GatewayConfig {
            mode,
            ..GatewayConfig::default()
        };
        let run = Run::convert(vec![ing], config);
        assert!(run.notifications.count(Severity::Blocking) >= 1, "{mode}");
        assert_eq!(run.resources.http_routes.len(), 1, "{mode}");
    }
}

#[test]
fn one_reference_grant_per_namespace() {
    let mut ingresses = vec![];
    for (ns, name) in [("shop", "a"), ("shop", "b"), ("blog", "c")] {
        let mut ing = mk_ingress(ns, name, btreemap_str(&[]));
        add_rule(&mut ing, &format!("{name}.test"), "/", "web", 80);
        ingresses.push(ing);
    }
    let run = Run::convert(ingresses, centralized());

    let grants = run
        .resources
        .reference_grants
        .keys()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    assert_eq!(
        grants,
        vec![
            "istio-system/allow-routes-from-blog",
            "istio-system/allow-routes-from-shop",
        ]
    );
    let grant = &run.resources.reference_grants[&ResourceId::new("istio-system", "allow-routes-from-shop")];
    let kinds = grant.spec.from.iter().map(|f| f.kind.as_str()).collect::<Vec<_>>();
    assert_eq!(kinds, vec!["HTTPRoute", "GRPCRoute"]);
    assert!(grant.spec.from.iter().all(|f| f.namespace == "shop"));
    assert_eq!(grant.spec.to[0].name.as_deref(), Some("platform-gateway"));
}

#[test]
fn auth_on_a_shared_gateway_is_advisory() {
    let mut ing = mk_ingress(
        "shop",
        "web",
        btreemap_str(&[
            (AUTH_URL, "https://auth.test/verify"),
            (AUTH_TLS_SECRET, "shop/client-ca"),
        ]),
    );
    add_rule(&mut ing, "shop.test", "/", "web", 80);

    let shared = Run::convert(vec![ing.clone()], centralized());
    let shared_warnings = shared
        .advisories()
        .into_iter()
        .filter(|m| m.contains("shared Gateway"))
        .count();
    assert_eq!(shared_warnings, 2);

    let per_namespace = Run::convert(
        vec![ing],
        GatewayConfig {
            mode: crate::GatewayMode::PerNamespace,
            ..GatewayConfig::default()
        },
    );
    assert!(!per_namespace
        .advisories()
        .iter()
        .any(|m| m.contains("shared Gateway")));
}

#[test]
fn conflicting_values_on_a_shared_route_are_advisory() {
    let mut a = mk_ingress("shop", "a", btreemap_str(&[(LIMIT_RPS, "10")]));
    add_rule(&mut a, "shop.test", "/a", "web", 80);
    let mut b = mk_ingress("shop", "b", btreemap_str(&[(LIMIT_RPS, "20")]));
    add_rule(&mut b, "shop.test", "/b", "web", 80);
    let run = Run::passes(vec![a, b]);

    let ext = run.ir.http_routes[&ResourceId::new("shop", "a-shop-test")]
        .ingress_nginx()
        .expect("route extension");
    assert_eq!(ext.rate_limit_rps, Some(20));
    assert!(run
        .advisories()
        .iter()
        .any(|m| m.contains("conflicting rate limit") && m.contains("shop/b")));
}
