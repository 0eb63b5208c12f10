//! ingress-nginx annotation keys and value helpers.

use ingress_migrate_core::{
    k8s::{Ingress, ResourceExt},
    FieldError, FieldPath, ResourceId,
};

macro_rules! annotation {
    ($name:ident, $key:literal) => {
        pub const $name: &str = concat!("nginx.ingress.kubernetes.io/", $key);
    };
}

annotation!(BACKEND_PROTOCOL, "backend-protocol");
annotation!(PROXY_SSL_SECRET, "proxy-ssl-secret");
annotation!(PROXY_SSL_VERIFY, "proxy-ssl-verify");
annotation!(PROXY_SSL_NAME, "proxy-ssl-name");
annotation!(PROXY_SSL_PROTOCOLS, "proxy-ssl-protocols");
annotation!(PROXY_SSL_CIPHERS, "proxy-ssl-ciphers");

annotation!(PROXY_CONNECT_TIMEOUT, "proxy-connect-timeout");
annotation!(PROXY_READ_TIMEOUT, "proxy-read-timeout");
annotation!(PROXY_SEND_TIMEOUT, "proxy-send-timeout");

annotation!(SSL_REDIRECT, "ssl-redirect");
annotation!(FORCE_SSL_REDIRECT, "force-ssl-redirect");

annotation!(PROXY_BODY_SIZE, "proxy-body-size");
annotation!(PROXY_BUFFERING, "proxy-buffering");
annotation!(PROXY_REQUEST_BUFFERING, "proxy-request-buffering");
annotation!(LOAD_BALANCE, "load-balance");

annotation!(LIMIT_RPS, "limit-rps");
annotation!(LIMIT_RPM, "limit-rpm");
annotation!(LIMIT_BURST_MULTIPLIER, "limit-burst-multiplier");
annotation!(LIMIT_REQ_ZONE, "limit-req-zone");
annotation!(LIMIT_CONNECTIONS, "limit-connections");

annotation!(AUTH_TLS_SECRET, "auth-tls-secret");
annotation!(AUTH_TLS_VERIFY_CLIENT, "auth-tls-verify-client");
annotation!(AUTH_TLS_VERIFY_DEPTH, "auth-tls-verify-depth");
annotation!(AUTH_TLS_ERROR_PAGE, "auth-tls-error-page");
annotation!(
    AUTH_TLS_PASS_CERTIFICATE_TO_UPSTREAM,
    "auth-tls-pass-certificate-to-upstream"
);

annotation!(AUTH_URL, "auth-url");
annotation!(AUTH_METHOD, "auth-method");
annotation!(AUTH_SIGNIN, "auth-signin");
annotation!(AUTH_RESPONSE_HEADERS, "auth-response-headers");
annotation!(AUTH_REQUEST_REDIRECT, "auth-request-redirect");
annotation!(AUTH_CACHE_KEY, "auth-cache-key");
annotation!(AUTH_CACHE_DURATION, "auth-cache-duration");

annotation!(SERVER_SNIPPET, "server-snippet");
annotation!(CONFIGURATION_SNIPPET, "configuration-snippet");
annotation!(AUTH_SNIPPET, "auth-snippet");
annotation!(STREAM_SNIPPET, "stream-snippet");
annotation!(USE_REGEX, "use-regex");
annotation!(REWRITE_TARGET, "rewrite-target");

/// Values longer than this are truncated in diagnostics.
const MAX_DISPLAY_LEN: usize = 200;

pub(crate) fn get<'i>(ingress: &'i Ingress, key: &str) -> Option<&'i str> {
    ingress.annotations().get(key).map(String::as_str)
}

/// Like [`get`], but treats blank values as unset.
pub(crate) fn get_nonempty<'i>(ingress: &'i Ingress, key: &str) -> Option<&'i str> {
    get(ingress, key).map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn invalid(
    ingress: &ResourceId,
    key: &str,
    value: &str,
    detail: impl Into<String>,
) -> FieldError {
    FieldError::invalid(ingress.clone(), FieldPath::annotation(key), value, detail)
}

/// Parses nginx's boolean spellings.
pub(crate) fn parse_toggle(value: &str) -> Result<bool, &'static str> {
    match value.trim() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err("expected one of on, off, true, false, 1, 0"),
    }
}

/// Shortens a value for display in a diagnostic.
pub(crate) fn truncate(value: &str) -> String {
    match value.char_indices().nth(MAX_DISPLAY_LEN) {
        Some((end, _)) => format!("{}... (truncated)", &value[..end]),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_prefixed() {
        assert_eq!(LIMIT_RPS, "nginx.ingress.kubernetes.io/limit-rps");
        assert_eq!(
            AUTH_TLS_PASS_CERTIFICATE_TO_UPSTREAM,
            "nginx.ingress.kubernetes.io/auth-tls-pass-certificate-to-upstream"
        );
    }

    #[test]
    fn toggles() {
        assert_eq!(parse_toggle("on"), Ok(true));
        assert_eq!(parse_toggle(" 1 "), Ok(true));
        assert_eq!(parse_toggle("off"), Ok(false));
        assert_eq!(parse_toggle("false"), Ok(false));
        assert!(parse_toggle("maybe").is_err());
    }

    #[test]
    fn truncates_long_values() {
        assert_eq!(truncate("short"), "short");
        let long = "x".repeat(250);
        let shown = truncate(&long);
        assert!(shown.ends_with("... (truncated)"));
        assert_eq!(shown.len(), 200 + "... (truncated)".len());
        assert_eq!(truncate(&"y".repeat(200)), "y".repeat(200));
    }
}
