use crate::*;

/// Basic Result alias with [`enum@swcache::Error`]
pub type Result<T = (), E = Error> = std::result::Result<T, E>;

use thiserror::Error;
/// Error type used across the swcache codebase
#[derive(Error, Debug)]
pub enum Error {
    #[error("network failure for {url}: {reason}")]
    Network { url: String, reason: String },
    #[error("cache storage failure: {0}")]
    Storage(String),
    #[error("prefetch failed for {url}: {source}")]
    Prefetch {
        url: String,
        #[source]
        source: Box<Error>,
    },
    #[error("invalid lifecycle phase: expected {expected}, got {actual}")]
    Phase { expected: Phase, actual: Phase },
    #[error(transparent)]
    Http(#[from] http::Error),
    #[error(transparent)]
    InvalidMethod(#[from] http::method::InvalidMethod),
    #[error("{0}")]
    Any(String),
}

impl Error {
    pub fn storage(e: impl std::fmt::Display) -> Self {
        Error::Storage(format!("{e}"))
    }

    pub fn network(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::Network {
            url: url.into(),
            reason: format!("{reason}"),
        }
    }
}

/// Shorthand to create formatted [`enum@swcache::Error`] values like `e!("{x:?}")`
#[macro_export]
macro_rules! e {
    ($($tokens:tt),+) => {
        $crate::Error::Any(format!($($tokens),+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    // the wasm shim parses methods off intercepted browser requests with `?`
    #[test]
    fn method_parse_failures_convert_into_error() {
        fn parse(raw: &[u8]) -> Result<Method> {
            Ok(Method::from_bytes(raw)?)
        }
        assert!(parse(b"GET").is_ok());
        assert!(matches!(parse(b"NOT A METHOD"), Err(Error::InvalidMethod(_))));
    }
}
