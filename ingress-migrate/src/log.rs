use anyhow::{anyhow, bail, Result};
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// How log lines are written to stderr.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

// === impl LogFormat ===

impl LogFormat {
    pub fn try_init(self, filter: &str) -> Result<()> {
        let filter = EnvFilter::try_new(filter)?;
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);
        match self {
            Self::Plain => builder.try_init(),
            Self::Json => builder.json().try_init(),
        }
        .map_err(|error| anyhow!(error))
    }
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            s => bail!("invalid log format {s:?}: expected plain or json"),
        }
    }
}
