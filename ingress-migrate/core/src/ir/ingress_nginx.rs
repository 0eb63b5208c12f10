use std::{fmt, str::FromStr};

/// ingress-nginx settings attached to an HTTPRoute.
///
/// Every field is optional: `None` means no source object configured it,
/// which is distinct from an explicit "off".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngressNginxHttpRouteIr {
    pub ssl_redirect: Option<bool>,
    pub proxy_body_size: Option<BodySize>,
    pub proxy_buffering: Option<bool>,
    pub proxy_request_buffering: Option<bool>,
    pub rate_limit_rps: Option<u32>,
    pub rate_limit_burst: Option<u32>,
    pub client_cert_auth: Option<ClientCertAuth>,
    pub external_auth: Option<ExternalAuth>,
}

/// ingress-nginx settings attached to a backend Service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngressNginxServiceIr {
    pub backend_protocol: Option<BackendProtocol>,
    pub proxy_ssl_secret: Option<String>,
    pub proxy_ssl_verify: Option<bool>,
    pub proxy_ssl_name: Option<String>,
    pub proxy_ssl_protocols: Option<String>,
    pub proxy_ssl_ciphers: Option<String>,
    pub load_balance: Option<LoadBalance>,
}

/// A request body ceiling.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BodySize {
    Unlimited,
    Bytes(u64),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BodySizeError {
    #[error("size must be a non-negative integer with an optional k, m or g suffix")]
    Malformed,

    #[error("size overflows")]
    Overflow,
}

/// Client certificate authentication (mutual TLS) at the edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientCertAuth {
    /// `namespace/name` of the secret holding the trusted CA bundle.
    pub secret: String,
    pub verify_mode: VerifyMode,
    pub verify_depth: u32,
    /// Where to send clients whose certificate fails verification.
    pub error_page: Option<String>,
    pub pass_cert_to_upstream: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum VerifyMode {
    #[default]
    Required,
    Disabled,
    Optional,
    OptionalNoCa,
}

/// Delegation of request authentication to an external HTTP service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalAuth {
    pub url: String,
    pub method: String,
    pub signin_url: Option<String>,
    /// Headers copied from the auth response onto the upstream request, in
    /// the order they were listed.
    pub response_headers: Vec<String>,
    pub request_redirect: Option<String>,
    pub cache_key: Option<String>,
    pub cache_duration: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BackendProtocol {
    Http,
    Https,
    Grpc,
    Grpcs,
    AutoHttp,
    Fcgi,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LoadBalance {
    RoundRobin,
    Ewma,
    LeastConn,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("expected one of {expected}")]
pub struct InvalidValue {
    expected: &'static str,
}

// === impl BodySize ===

impl BodySize {
    pub const KIB: u64 = 1024;
    pub const MIB: u64 = 1024 * Self::KIB;
    pub const GIB: u64 = 1024 * Self::MIB;

    pub fn bytes(&self) -> Option<u64> {
        match self {
            Self::Unlimited => None,
            Self::Bytes(n) => Some(*n),
        }
    }
}

impl FromStr for BodySize {
    type Err = BodySizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if matches!(s.as_str(), "unlimited" | "-1" | "0") {
            return Ok(Self::Unlimited);
        }

        let (digits, multiplier) = match s.char_indices().last() {
            Some((i, 'k')) => (&s[..i], Self::KIB),
            Some((i, 'm')) => (&s[..i], Self::MIB),
            Some((i, 'g')) => (&s[..i], Self::GIB),
            Some(_) => (s.as_str(), 1),
            None => return Err(BodySizeError::Malformed),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BodySizeError::Malformed);
        }
        let n = digits.parse::<u64>().map_err(|_| BodySizeError::Overflow)?;
        match n.checked_mul(multiplier) {
            Some(0) => Ok(Self::Unlimited),
            Some(bytes) => Ok(Self::Bytes(bytes)),
            None => Err(BodySizeError::Overflow),
        }
    }
}

impl fmt::Display for BodySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => "unlimited".fmt(f),
            Self::Bytes(n) => n.fmt(f),
        }
    }
}

// === impl VerifyMode ===

impl FromStr for VerifyMode {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "on" => Ok(Self::Required),
            "off" => Ok(Self::Disabled),
            "optional" => Ok(Self::Optional),
            "optional_no_ca" => Ok(Self::OptionalNoCa),
            _ => Err(InvalidValue {
                expected: "on, off, optional, optional_no_ca",
            }),
        }
    }
}

impl fmt::Display for VerifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => "on".fmt(f),
            Self::Disabled => "off".fmt(f),
            Self::Optional => "optional".fmt(f),
            Self::OptionalNoCa => "optional_no_ca".fmt(f),
        }
    }
}

// === impl BackendProtocol ===

impl BackendProtocol {
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Https | Self::Grpcs)
    }
}

impl FromStr for BackendProtocol {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HTTP" => Ok(Self::Http),
            "HTTPS" => Ok(Self::Https),
            "GRPC" => Ok(Self::Grpc),
            "GRPCS" => Ok(Self::Grpcs),
            "AUTO_HTTP" => Ok(Self::AutoHttp),
            "FCGI" => Ok(Self::Fcgi),
            _ => Err(InvalidValue {
                expected: "HTTP, HTTPS, GRPC, GRPCS, AUTO_HTTP, FCGI",
            }),
        }
    }
}

impl fmt::Display for BackendProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => "HTTP".fmt(f),
            Self::Https => "HTTPS".fmt(f),
            Self::Grpc => "GRPC".fmt(f),
            Self::Grpcs => "GRPCS".fmt(f),
            Self::AutoHttp => "AUTO_HTTP".fmt(f),
            Self::Fcgi => "FCGI".fmt(f),
        }
    }
}

// === impl LoadBalance ===

impl FromStr for LoadBalance {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "round_robin" => Ok(Self::RoundRobin),
            "ewma" => Ok(Self::Ewma),
            "least_conn" => Ok(Self::LeastConn),
            _ => Err(InvalidValue {
                expected: "round_robin, ewma, least_conn",
            }),
        }
    }
}

impl fmt::Display for LoadBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoundRobin => "round_robin".fmt(f),
            Self::Ewma => "ewma".fmt(f),
            Self::LeastConn => "least_conn".fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_size_suffixes() {
        assert_eq!("512".parse(), Ok(BodySize::Bytes(512)));
        assert_eq!("8k".parse(), Ok(BodySize::Bytes(8 * 1024)));
        assert_eq!("100m".parse(), Ok(BodySize::Bytes(100 * 1024 * 1024)));
        assert_eq!("100M".parse(), Ok(BodySize::Bytes(100 * 1024 * 1024)));
        assert_eq!("1g".parse(), Ok(BodySize::Bytes(1024 * 1024 * 1024)));
    }

    #[test]
    fn body_size_unlimited() {
        for s in ["0", "-1", "unlimited", "0m"] {
            assert_eq!(s.parse(), Ok(BodySize::Unlimited), "{s}");
        }
    }

    #[test]
    fn body_size_malformed() {
        for s in ["", "m", "10x", "1.5m", "-5m", "ten"] {
            assert_eq!(s.parse::<BodySize>(), Err(BodySizeError::Malformed), "{s}");
        }
        assert_eq!(
            "99999999999999999999g".parse::<BodySize>(),
            Err(BodySizeError::Overflow)
        );
    }

    #[test]
    fn verify_modes() {
        assert_eq!("on".parse(), Ok(VerifyMode::Required));
        assert_eq!("off".parse(), Ok(VerifyMode::Disabled));
        assert_eq!("optional".parse(), Ok(VerifyMode::Optional));
        assert_eq!("optional_no_ca".parse(), Ok(VerifyMode::OptionalNoCa));
        assert!("maybe".parse::<VerifyMode>().is_err());
        assert_eq!(VerifyMode::default(), VerifyMode::Required);
    }

    #[test]
    fn backend_protocols_are_case_insensitive() {
        assert_eq!("https".parse(), Ok(BackendProtocol::Https));
        assert_eq!("GRPCS".parse(), Ok(BackendProtocol::Grpcs));
        assert!(BackendProtocol::Grpcs.is_tls());
        assert!(!BackendProtocol::Grpc.is_tls());
        assert!("H2".parse::<BackendProtocol>().is_err());
    }
}
