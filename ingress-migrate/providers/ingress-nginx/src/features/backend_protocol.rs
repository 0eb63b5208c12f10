use super::PassContext;
use crate::annotations::{self, *};
use ingress_migrate_core::{
    ir::{ingress_nginx::BackendProtocol, Ir},
    k8s::{
        gateway::{
            BackendTlsPolicy, BackendTlsPolicySpec, BackendTlsPolicyValidation,
            LocalPolicyTargetReference,
        },
        labels,
    },
    ErrorList, ObjectRef, ResourceId,
};
use tracing::{debug, info};

struct BackendTls {
    protocol: Option<BackendProtocol>,
    ssl_secret: Option<String>,
    ssl_verify: Option<bool>,
    ssl_name: Option<String>,
    ssl_protocols: Option<String>,
    ssl_ciphers: Option<String>,
}

/// Records backend protocols on Services and synthesizes a BackendTLSPolicy
/// for each Service that must be reached over TLS.
pub(super) fn apply(ctx: &PassContext<'_>, ir: &mut Ir) -> ErrorList {
    let mut errors = ErrorList::new();

    for ing in &ctx.sources.ingresses {
        let id = ResourceId::of(ing);

        let protocol = annotations::get(ing, BACKEND_PROTOCOL).and_then(|v| {
            v.parse::<BackendProtocol>()
                .map_err(|e| errors.push(annotations::invalid(&id, BACKEND_PROTOCOL, v, e.to_string())))
                .ok()
        });
        let ssl_verify = annotations::get(ing, PROXY_SSL_VERIFY).and_then(|v| {
            annotations::parse_toggle(v)
                .map_err(|e| errors.push(annotations::invalid(&id, PROXY_SSL_VERIFY, v, e)))
                .ok()
        });
        let tls = BackendTls {
            protocol,
            ssl_secret: annotations::get_nonempty(ing, PROXY_SSL_SECRET).map(str::to_string),
            ssl_verify,
            ssl_name: annotations::get_nonempty(ing, PROXY_SSL_NAME).map(str::to_string),
            ssl_protocols: annotations::get_nonempty(ing, PROXY_SSL_PROTOCOLS).map(str::to_string),
            ssl_ciphers: annotations::get_nonempty(ing, PROXY_SSL_CIPHERS).map(str::to_string),
        };
        if tls.is_unset() {
            continue;
        }

        report_unsupported(ctx, &id, &tls);

        for svc_id in ctx.routed_services(ir, ing) {
            record_service(ctx, ir, &id, &svc_id, &tls);
            let svc = &svc_id.name;

            if !tls.enabled() {
                continue;
            }

            let policy_id = ResourceId::new(id.namespace.clone(), format!("{svc}-backend-tls"));
            if ir.backend_tls_policies.contains_key(&policy_id) {
                debug!(policy = %policy_id, "BackendTLSPolicy already exists");
                continue;
            }

            let hostname = tls.ssl_name.clone().unwrap_or_else(|| svc.clone());
            let validation = match tls.ssl_secret.as_deref() {
                Some(secret) => {
                    let config_map = ca_config_map_name(secret);
                    ctx.advisory(
                        &id,
                        format!(
                            "BackendTLSPolicy {policy_id} trusts the CA bundle in ConfigMap {config_map}; \
                             copy ca.crt from Secret {secret} into it before applying"
                        ),
                    );
                    BackendTlsPolicyValidation::config_map(hostname, config_map)
                }
                None => BackendTlsPolicyValidation::system(hostname),
            };

            let mut policy = BackendTlsPolicy::new(
                &policy_id.name,
                BackendTlsPolicySpec {
                    target_refs: vec![LocalPolicyTargetReference {
                        group: String::new(),
                        kind: "Service".to_string(),
                        name: svc.clone(),
                        section_name: None,
                    }],
                    validation,
                },
            );
            policy.metadata.namespace = Some(policy_id.namespace.clone());
            policy.metadata.labels = Some(labels::migration_labels());
            policy.metadata.annotations = Some(labels::migration_annotations(
                format!("Ingress {id}"),
                format!("TLS to Service {svc} from {}", BACKEND_PROTOCOL),
            ));

            info!(policy = %policy_id, "Generated BackendTLSPolicy");
            ctx.info(&id, format!("generated BackendTLSPolicy {policy_id}"));
            ir.backend_tls_policies.insert(policy_id, policy);
        }
    }

    errors
}

// === impl BackendTls ===

impl BackendTls {
    fn is_unset(&self) -> bool {
        self.protocol.is_none()
            && self.ssl_secret.is_none()
            && self.ssl_verify.is_none()
            && self.ssl_name.is_none()
            && self.ssl_protocols.is_none()
            && self.ssl_ciphers.is_none()
    }

    /// TLS is used for an explicit TLS protocol or when a client
    /// certificate secret is configured.
    fn enabled(&self) -> bool {
        self.protocol.is_some_and(|p| p.is_tls()) || self.ssl_secret.is_some()
    }
}

fn record_service(
    ctx: &PassContext<'_>,
    ir: &mut Ir,
    source: &ResourceId,
    svc: &ResourceId,
    tls: &BackendTls,
) {
    let obj = || ObjectRef {
        kind: "Service",
        id: svc.clone(),
    };
    let Some(svc_ctx) = ir.services.get_mut(svc) else {
        return;
    };
    let ext = svc_ctx.ingress_nginx_mut();
    if let Some(p) = tls.protocol {
        ctx.merge(obj(), "backend protocol", source, &mut ext.backend_protocol, p);
    }
    if let Some(v) = tls.ssl_secret.clone() {
        ctx.merge(obj(), "proxy-ssl-secret", source, &mut ext.proxy_ssl_secret, v);
    }
    if let Some(v) = tls.ssl_verify {
        ctx.merge(obj(), "proxy-ssl-verify", source, &mut ext.proxy_ssl_verify, v);
    }
    if let Some(v) = tls.ssl_name.clone() {
        ctx.merge(obj(), "proxy-ssl-name", source, &mut ext.proxy_ssl_name, v);
    }
    if let Some(v) = tls.ssl_protocols.clone() {
        ctx.merge(obj(), "proxy-ssl-protocols", source, &mut ext.proxy_ssl_protocols, v);
    }
    if let Some(v) = tls.ssl_ciphers.clone() {
        ctx.merge(obj(), "proxy-ssl-ciphers", source, &mut ext.proxy_ssl_ciphers, v);
    }
}

fn report_unsupported(ctx: &PassContext<'_>, id: &ResourceId, tls: &BackendTls) {
    if matches!(
        tls.protocol,
        Some(BackendProtocol::AutoHttp | BackendProtocol::Fcgi)
    ) {
        ctx.advisory(
            id,
            format!(
                "{BACKEND_PROTOCOL} {} has no Gateway API equivalent; backends are reached over HTTP",
                tls.protocol.map(|p| p.to_string()).unwrap_or_default()
            ),
        );
    }
    if tls.ssl_verify == Some(false) && tls.enabled() {
        ctx.advisory(
            id,
            format!("{PROXY_SSL_VERIFY} is off, but BackendTLSPolicy always verifies the backend certificate"),
        );
    }
    if tls.ssl_protocols.is_some() || tls.ssl_ciphers.is_some() {
        ctx.advisory(
            id,
            format!("{PROXY_SSL_PROTOCOLS} and {PROXY_SSL_CIPHERS} cannot be expressed in BackendTLSPolicy"),
        );
    }
}

/// The ConfigMap expected to hold the CA bundle of a `namespace/name` (or
/// bare `name`) secret reference.
fn ca_config_map_name(secret: &str) -> &str {
    secret.rsplit('/').next().unwrap_or(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;
    use ingress_migrate_core::k8s::gateway::WellKnownCaCertificates;
    use pretty_assertions::assert_eq;

    #[test]
    fn https_backend_gets_system_trust() {
        let mut ing = mk_ingress("ns", "web", btreemap_str(&[(BACKEND_PROTOCOL, "HTTPS")]));
        add_rule(&mut ing, "a.test", "/", "api", 443);
        let run = Run::passes(vec![ing]);
        assert!(run.errors.is_empty(), "{:?}", run.errors);

        let policy = &run.ir.backend_tls_policies[&ResourceId::new("ns", "api-backend-tls")];
        assert_eq!(policy.spec.target_refs[0].name, "api");
        assert_eq!(policy.spec.validation.hostname, "api");
        assert_eq!(
            policy.spec.validation.well_known_ca_certificates,
            Some(WellKnownCaCertificates::System)
        );
        assert_eq!(policy.spec.validation.ca_certificate_refs, None);

        let svc = run.ir.services[&ResourceId::new("ns", "api")]
            .ingress_nginx()
            .expect("service extension");
        assert_eq!(svc.backend_protocol, Some(BackendProtocol::Https));
    }

    #[test]
    fn ssl_secret_selects_ca_config_map_and_name() {
        let mut ing = mk_ingress(
            "ns",
            "web",
            btreemap_str(&[
                (PROXY_SSL_SECRET, "ns/backend-ca"),
                (PROXY_SSL_NAME, "api.internal"),
            ]),
        );
        add_rule(&mut ing, "a.test", "/", "api", 443);
        let run = Run::passes(vec![ing]);

        let policy = &run.ir.backend_tls_policies[&ResourceId::new("ns", "api-backend-tls")];
        let validation = &policy.spec.validation;
        assert_eq!(validation.hostname, "api.internal");
        assert_eq!(validation.well_known_ca_certificates, None);
        let refs = validation.ca_certificate_refs.as_ref().expect("CA refs");
        assert_eq!(refs[0].kind, "ConfigMap");
        assert_eq!(refs[0].name, "backend-ca");
    }

    #[test]
    fn shared_backend_gets_one_policy() {
        let mut a = mk_ingress("ns", "a", btreemap_str(&[(BACKEND_PROTOCOL, "GRPCS")]));
        add_rule(&mut a, "a.test", "/", "api", 443);
        let mut b = mk_ingress("ns", "b", btreemap_str(&[(BACKEND_PROTOCOL, "HTTPS")]));
        add_rule(&mut b, "b.test", "/", "api", 443);
        set_default_backend(&mut b, "api", 443);

        let run = Run::passes(vec![a, b]);
        assert_eq!(run.ir.backend_tls_policies.len(), 1);
        // The differing protocols are reported as a conflict.
        assert!(run
            .advisories()
            .iter()
            .any(|m| m.contains("conflicting backend protocol")));
    }

    #[test]
    fn ca_advisory_is_reported_once_per_policy() {
        let annotations = btreemap_str(&[(PROXY_SSL_SECRET, "ns/backend-ca")]);
        let mut a = mk_ingress("ns", "a", annotations.clone());
        add_rule(&mut a, "a.test", "/", "api", 443);
        let mut b = mk_ingress("ns", "b", annotations);
        add_rule(&mut b, "b.test", "/", "api", 443);

        let run = Run::passes(vec![a, b]);
        let copies = run
            .advisories()
            .into_iter()
            .filter(|m| m.contains("copy ca.crt"))
            .count();
        assert_eq!(copies, 1);
    }

    #[test]
    fn backends_without_routes_are_ignored() {
        let mut ing = mk_ingress(
            "ns",
            "web",
            btreemap_str(&[(BACKEND_PROTOCOL, "HTTPS"), (LOAD_BALANCE, "ewma")]),
        );
        add_rule(&mut ing, "a.test", "/", "api", 443);
        // No Service defines the port, so no route is resolved.
        set_port_name(&mut ing, "https");

        let run = Run::passes(vec![ing]);
        assert_eq!(run.errors.len(), 1, "{:?}", run.errors);
        assert!(run.ir.http_routes.is_empty());
        assert!(run.ir.services.is_empty());
        assert!(run.ir.backend_tls_policies.is_empty());
    }

    #[test]
    fn only_resolved_backends_get_policies() {
        let mut ing = mk_ingress("ns", "web", btreemap_str(&[(BACKEND_PROTOCOL, "HTTPS")]));
        add_rule(&mut ing, "a.test", "/", "api", 443);
        let mut legacy = mk_ingress("ns", "legacy", btreemap_str(&[]));
        add_rule(&mut legacy, "b.test", "/", "legacy", 443);
        set_port_name(&mut legacy, "https");
        // Move the unresolvable path onto the TLS Ingress.
        let rule = legacy.spec.and_then(|s| s.rules).expect("rules").remove(0);
        ing.spec.as_mut().and_then(|s| s.rules.as_mut()).expect("rules").push(rule);

        let run = Run::passes(vec![ing]);
        assert_eq!(run.errors.len(), 1, "{:?}", run.errors);
        let policies = run
            .ir
            .backend_tls_policies
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(policies, vec![ResourceId::new("ns", "api-backend-tls")]);
        assert!(!run.ir.services.contains_key(&ResourceId::new("ns", "legacy")));
    }

    #[test]
    fn plain_http_backends_get_no_policy() {
        let mut ing = mk_ingress("ns", "web", btreemap_str(&[(BACKEND_PROTOCOL, "GRPC")]));
        add_rule(&mut ing, "a.test", "/", "api", 80);
        let mut bare = mk_ingress("ns", "bare", btreemap_str(&[]));
        add_rule(&mut bare, "b.test", "/", "other", 80);

        let run = Run::passes(vec![ing, bare]);
        assert!(run.ir.backend_tls_policies.is_empty());
        assert!(run.ir.services[&ResourceId::new("ns", "other")]
            .ingress_nginx()
            .is_none());
    }

    #[test]
    fn unknown_protocol_is_an_error() {
        let mut ing = mk_ingress("ns", "web", btreemap_str(&[(BACKEND_PROTOCOL, "H3")]));
        add_rule(&mut ing, "a.test", "/", "api", 80);
        let run = Run::passes(vec![ing]);
        assert_eq!(run.errors.len(), 1);
        assert_eq!(
            run.errors[0].path.to_string(),
            format!("metadata.annotations[{BACKEND_PROTOCOL}]")
        );
        assert!(run.ir.backend_tls_policies.is_empty());
    }
}
