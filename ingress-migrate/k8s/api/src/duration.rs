use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr, time::Duration};

/// A Gateway API duration (GEP-2257).
///
/// Values are non-negative, carry millisecond precision, and are written as
/// up to four `<int><unit>` components with units `h`, `m`, `s` or `ms`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct K8sDuration(Duration);

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum ParseError {
    #[error("empty duration")]
    Empty,

    #[error("invalid unit {0:?}: {EXPECTED_UNITS}")]
    InvalidUnit(String),

    #[error("missing a unit: {EXPECTED_UNITS}")]
    NoUnit,

    #[error("invalid number: {0}")]
    NotANumber(#[from] std::num::ParseIntError),

    #[error("too many components; at most {MAX_COMPONENTS} are allowed")]
    TooManyComponents,
}

const EXPECTED_UNITS: &str = "expected one of 'h', 'm', 's', or 'ms'";

const MAX_COMPONENTS: usize = 4;

// === impl K8sDuration ===

impl K8sDuration {
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }
}

impl From<Duration> for K8sDuration {
    fn from(duration: Duration) -> Self {
        // Precision below a millisecond cannot be expressed.
        Self(Duration::from_millis(duration.as_millis() as u64))
    }
}

impl From<K8sDuration> for Duration {
    fn from(K8sDuration(duration): K8sDuration) -> Self {
        duration
    }
}

impl fmt::Display for K8sDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.0.as_millis();
        if millis % 1000 == 0 {
            write!(f, "{}s", millis / 1000)
        } else {
            write!(f, "{millis}ms")
        }
    }
}

impl FromStr for K8sDuration {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut rest = s;
        let mut total = Duration::ZERO;
        let mut components = 0;
        while !rest.is_empty() {
            components += 1;
            if components > MAX_COMPONENTS {
                return Err(ParseError::TooManyComponents);
            }

            let digits = rest
                .find(|c: char| !c.is_ascii_digit())
                .ok_or(ParseError::NoUnit)?;
            let (value, tail) = rest.split_at(digits);
            let value = value.parse::<u64>()?;

            let unit_len = tail
                .find(|c: char| c.is_ascii_digit())
                .unwrap_or(tail.len());
            let (unit, tail) = tail.split_at(unit_len);
            total += match unit {
                "h" => Duration::from_secs(value.saturating_mul(60 * 60)),
                "m" => Duration::from_secs(value.saturating_mul(60)),
                "s" => Duration::from_secs(value),
                "ms" => Duration::from_millis(value),
                unit => return Err(ParseError::InvalidUnit(unit.to_string())),
            };
            rest = tail;
        }

        Ok(Self(total))
    }
}

impl Serialize for K8sDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for K8sDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl schemars::JsonSchema for K8sDuration {
    fn schema_name() -> String {
        "K8sDuration".to_owned()
    }

    fn is_referenceable() -> bool {
        false
    }

    fn json_schema(_: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        schemars::schema::SchemaObject {
            instance_type: Some(schemars::schema::InstanceType::String.into()),
            string: Some(Box::new(schemars::schema::StringValidation {
                pattern: Some("^([0-9]{1,5}(h|m|s|ms)){1,4}$".to_string()),
                ..Default::default()
            })),
            ..Default::default()
        }
        .into()
    }
}
