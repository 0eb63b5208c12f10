use super::PassContext;
use crate::annotations::{self, *};
use ingress_migrate_core::{
    ir::{
        ingress_nginx::{BodySize, LoadBalance},
        Ir,
    },
    ErrorList, ObjectRef, ResourceId,
};

/// Records body size limits and buffering on routes, and load balancing on
/// backend Services.
pub(super) fn apply(ctx: &PassContext<'_>, ir: &mut Ir) -> ErrorList {
    let mut errors = ErrorList::new();

    for ing in &ctx.sources.ingresses {
        let id = ResourceId::of(ing);

        let body_size = annotations::get(ing, PROXY_BODY_SIZE).and_then(|v| {
            v.parse::<BodySize>()
                .map_err(|e| errors.push(annotations::invalid(&id, PROXY_BODY_SIZE, v, e.to_string())))
                .ok()
        });
        let mut toggle = |key: &str| {
            annotations::get(ing, key).and_then(|v| {
                annotations::parse_toggle(v)
                    .map_err(|e| errors.push(annotations::invalid(&id, key, v, e)))
                    .ok()
            })
        };
        let buffering = toggle(PROXY_BUFFERING);
        let request_buffering = toggle(PROXY_REQUEST_BUFFERING);
        let load_balance = annotations::get(ing, LOAD_BALANCE).and_then(|v| {
            v.parse::<LoadBalance>()
                .map_err(|e| errors.push(annotations::invalid(&id, LOAD_BALANCE, v, e.to_string())))
                .ok()
        });

        if body_size.is_some() || buffering.is_some() || request_buffering.is_some() {
            ctx.with_routes(ir, &id, |route_id, route| {
                let ext = route.ingress_nginx_mut();
                let obj = || ObjectRef::http_route(route_id.clone());
                if let Some(size) = body_size {
                    ctx.merge(obj(), "proxy-body-size", &id, &mut ext.proxy_body_size, size);
                }
                if let Some(on) = buffering {
                    ctx.merge(obj(), "proxy-buffering", &id, &mut ext.proxy_buffering, on);
                }
                if let Some(on) = request_buffering {
                    ctx.merge(
                        obj(),
                        "proxy-request-buffering",
                        &id,
                        &mut ext.proxy_request_buffering,
                        on,
                    );
                }
            });
        }

        if request_buffering == Some(false) {
            ctx.info(
                &id,
                format!("{PROXY_REQUEST_BUFFERING} is off; Envoy streams request bodies by default"),
            );
        }

        if let Some(lb) = load_balance {
            for svc_id in ctx.routed_services(ir, ing) {
                let Some(svc) = ir.services.get_mut(&svc_id) else {
                    continue;
                };
                let ext = svc.ingress_nginx_mut();
                ctx.merge(
                    ObjectRef {
                        kind: "Service",
                        id: svc_id,
                    },
                    "load-balance",
                    &id,
                    &mut ext.load_balance,
                    lb,
                );
            }
            ctx.advisory(
                &id,
                format!("{LOAD_BALANCE} {lb} has no Gateway API equivalent; configure it with a DestinationRule"),
            );
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn records_body_size_and_buffering() {
        let mut ing = mk_ingress(
            "ns",
            "web",
            btreemap_str(&[
                (PROXY_BODY_SIZE, "8m"),
                (PROXY_BUFFERING, "off"),
                (PROXY_REQUEST_BUFFERING, "on"),
            ]),
        );
        add_rule(&mut ing, "a.test", "/", "svc", 80);
        let run = Run::passes(vec![ing]);
        assert!(run.errors.is_empty(), "{:?}", run.errors);

        let ext = run.ir.http_routes[&ResourceId::new("ns", "web-a-test")]
            .ingress_nginx()
            .expect("route extension")
            .clone();
        assert_eq!(ext.proxy_body_size, Some(BodySize::Bytes(8 * BodySize::MIB)));
        assert_eq!(ext.proxy_buffering, Some(false));
        assert_eq!(ext.proxy_request_buffering, Some(true));
    }

    #[test]
    fn malformed_values_are_errors() {
        let mut ing = mk_ingress(
            "ns",
            "web",
            btreemap_str(&[(PROXY_BODY_SIZE, "big"), (PROXY_BUFFERING, "sometimes")]),
        );
        add_rule(&mut ing, "a.test", "/", "svc", 80);
        let run = Run::passes(vec![ing]);
        let mut paths = run
            .errors
            .iter()
            .map(|e| e.path.to_string())
            .collect::<Vec<_>>();
        paths.sort();
        assert_eq!(
            paths,
            vec![
                format!("metadata.annotations[{PROXY_BODY_SIZE}]"),
                format!("metadata.annotations[{PROXY_BUFFERING}]"),
            ]
        );
        assert_eq!(
            run.ir.http_routes[&ResourceId::new("ns", "web-a-test")].ingress_nginx(),
            None
        );
    }

    #[test]
    fn load_balance_is_recorded_on_services() {
        let mut ing = mk_ingress("ns", "web", btreemap_str(&[(LOAD_BALANCE, "ewma")]));
        add_rule(&mut ing, "a.test", "/", "svc", 80);
        let run = Run::passes(vec![ing]);
        let svc = run.ir.services[&ResourceId::new("ns", "svc")]
            .ingress_nginx()
            .expect("service extension");
        assert_eq!(svc.load_balance, Some(LoadBalance::Ewma));
        assert!(run.advisories().iter().any(|m| m.contains("DestinationRule")));
    }
}
