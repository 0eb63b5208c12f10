use super::PassContext;
use crate::annotations::{self, *};
use ingress_migrate_core::{
    ir::Ir,
    k8s::{gateway::HttpRouteTimeouts, Ingress, K8sDuration},
    ErrorList, ObjectRef, ResourceId,
};

/// Seconds configured by each nginx proxy timeout. Unset values are zero.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
struct ProxyTimeouts {
    connect: u64,
    read: u64,
    send: u64,
}

/// Translates nginx proxy timeouts into HTTPRoute rule timeouts.
pub(super) fn apply(ctx: &PassContext<'_>, ir: &mut Ir) -> ErrorList {
    let mut errors = ErrorList::new();

    for ing in &ctx.sources.ingresses {
        let id = ResourceId::of(ing);
        let proxy = match ProxyTimeouts::from_ingress(&id, ing) {
            Ok(Some(proxy)) => proxy,
            Ok(None) => continue,
            Err(errs) => {
                errors.extend(errs);
                continue;
            }
        };

        let timeouts = proxy.route_timeouts();
        if timeouts == HttpRouteTimeouts::default() {
            continue;
        }
        if let (Some(request), Some(backend)) = (timeouts.request, timeouts.backend_request) {
            if backend > request {
                ctx.advisory(
                    &id,
                    format!(
                        "{PROXY_CONNECT_TIMEOUT} ({backend}) exceeds the request timeout ({request}); \
                         Gateway API requires backendRequest not to exceed request"
                    ),
                );
            }
        }

        ctx.with_routes(ir, &id, |route_id, route| {
            let mut prev = route
                .route
                .spec
                .rules_mut()
                .find_map(|rule| rule.timeouts.clone());
            ctx.merge(
                ObjectRef::http_route(route_id.clone()),
                "timeouts",
                &id,
                &mut prev,
                timeouts.clone(),
            );
            for rule in route.route.spec.rules_mut() {
                rule.timeouts = Some(timeouts.clone());
            }
        });
    }

    errors
}

// === impl ProxyTimeouts ===

impl ProxyTimeouts {
    /// Returns `None` when no timeout annotation is set. Any malformed value
    /// invalidates all of the Ingress's timeouts.
    fn from_ingress(id: &ResourceId, ing: &Ingress) -> Result<Option<Self>, ErrorList> {
        let mut errors = ErrorList::new();
        let mut found = false;
        let mut seconds = |key: &str| -> u64 {
            let Some(value) = annotations::get(ing, key) else {
                return 0;
            };
            found = true;
            match value.trim().parse::<u64>() {
                Ok(secs) => secs,
                Err(_) => {
                    errors.push(annotations::invalid(
                        id,
                        key,
                        value,
                        "expected a non-negative integer number of seconds",
                    ));
                    0
                }
            }
        };

        let timeouts = Self {
            connect: seconds(PROXY_CONNECT_TIMEOUT),
            read: seconds(PROXY_READ_TIMEOUT),
            send: seconds(PROXY_SEND_TIMEOUT),
        };
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(found.then_some(timeouts))
    }

    fn route_timeouts(&self) -> HttpRouteTimeouts {
        let request = self.read.max(self.send);
        HttpRouteTimeouts {
            request: (request > 0).then(|| K8sDuration::from_secs(request)),
            backend_request: (self.connect > 0).then(|| K8sDuration::from_secs(self.connect)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(&[(PROXY_READ_TIMEOUT, "60"), (PROXY_SEND_TIMEOUT, "120")], Some(120), None)]
    #[case(&[(PROXY_CONNECT_TIMEOUT, "5")], None, Some(5))]
    #[case(&[(PROXY_CONNECT_TIMEOUT, "5"), (PROXY_READ_TIMEOUT, "30")], Some(30), Some(5))]
    fn translates_proxy_timeouts(
        #[case] annotations: &[(&str, &str)],
        #[case] request: Option<u64>,
        #[case] backend_request: Option<u64>,
    ) {
        let mut ing = mk_ingress("ns", "web", btreemap_str(annotations));
        add_rule(&mut ing, "a.test", "/", "svc", 80);
        add_rule(&mut ing, "a.test", "/api", "api", 80);
        let run = Run::passes(vec![ing]);
        assert!(run.errors.is_empty(), "{:?}", run.errors);

        let expected = HttpRouteTimeouts {
            request: request.map(K8sDuration::from_secs),
            backend_request: backend_request.map(K8sDuration::from_secs),
        };
        let route = &run.ir.http_routes[&ResourceId::new("ns", "web-a-test")].route;
        let rules = route.spec.rules.as_ref().expect("rules");
        assert_eq!(rules.len(), 2);
        for rule in rules {
            assert_eq!(rule.timeouts.as_ref(), Some(&expected));
        }
    }

    #[test]
    fn zero_timeouts_leave_rules_unset() {
        let mut ing = mk_ingress("ns", "web", btreemap_str(&[(PROXY_READ_TIMEOUT, "0")]));
        add_rule(&mut ing, "a.test", "/", "svc", 80);
        let run = Run::passes(vec![ing]);
        let route = &run.ir.http_routes[&ResourceId::new("ns", "web-a-test")].route;
        assert_eq!(route.spec.rules.as_ref().expect("rules")[0].timeouts, None);
    }

    #[test]
    fn malformed_timeout_skips_the_ingress() {
        let mut ing = mk_ingress(
            "ns",
            "web",
            btreemap_str(&[(PROXY_READ_TIMEOUT, "30"), (PROXY_SEND_TIMEOUT, "-1")]),
        );
        add_rule(&mut ing, "a.test", "/", "svc", 80);
        let run = Run::passes(vec![ing]);
        assert_eq!(run.errors.len(), 1);
        assert_eq!(run.errors[0].value, "-1");
        let route = &run.ir.http_routes[&ResourceId::new("ns", "web-a-test")].route;
        assert_eq!(route.spec.rules.as_ref().expect("rules")[0].timeouts, None);
    }

    #[test]
    fn connect_timeout_above_request_is_advisory() {
        let mut ing = mk_ingress(
            "ns",
            "web",
            btreemap_str(&[(PROXY_CONNECT_TIMEOUT, "90"), (PROXY_READ_TIMEOUT, "30")]),
        );
        add_rule(&mut ing, "a.test", "/", "svc", 80);
        let run = Run::passes(vec![ing]);
        assert!(run
            .advisories()
            .iter()
            .any(|m| m.contains("backendRequest not to exceed request")));
    }
}
