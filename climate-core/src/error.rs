//! Typed failures of the dashboard pipeline.
//!
//! None of these are fatal: every fetch operation returns them to the
//! dashboard, which logs and leaves the affected state as it was.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to one of the external HTTP providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} request failed with status {status}: {body}")]
    Status { endpoint: &'static str, status: StatusCode, body: String },

    #[error("Failed to parse {endpoint} response: {source}")]
    Parse {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{endpoint} returned invalid data: {detail}")]
    Invalid { endpoint: &'static str, detail: String },
}

impl ProviderError {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ProviderError::Transport { endpoint, .. }
            | ProviderError::Status { endpoint, .. }
            | ProviderError::Parse { endpoint, .. }
            | ProviderError::Invalid { endpoint, .. } => endpoint,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ProviderError::Transport { source, .. } if source.is_timeout() => {
                "The request timed out. Please try again."
            }
            ProviderError::Transport { .. } => "Unable to connect. Check your internet connection.",
            ProviderError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED => {
                "The API key was rejected. Run `daily-climate configure` to update it."
            }
            ProviderError::Status { status, .. } if status.is_server_error() => {
                "The service is experiencing issues. Please try again later."
            }
            ProviderError::Status { .. } => "The request failed. Please try again.",
            ProviderError::Parse { .. } | ProviderError::Invalid { .. } => {
                "Received an unexpected response. Please try again."
            }
        }
    }
}

/// Why a location query did not produce coordinates.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Location query is empty")]
    EmptyQuery,

    #[error("No location found for '{query}'")]
    NotFound { query: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ResolveError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ResolveError::EmptyQuery => "Enter a city, zip code or address.",
            ResolveError::NotFound { .. } => "No matching location was found.",
            ResolveError::Provider(e) => e.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_mentions_endpoint_and_status() {
        let err = ProviderError::Status {
            endpoint: "OpenWeather hourly",
            status: StatusCode::NOT_FOUND,
            body: "nope".into(),
        };

        let msg = err.to_string();
        assert!(msg.contains("OpenWeather hourly"));
        assert!(msg.contains("404"));
        assert_eq!(err.endpoint(), "OpenWeather hourly");
    }

    #[test]
    fn unauthorized_points_at_configure() {
        let err = ProviderError::Status {
            endpoint: "NYT top stories",
            status: StatusCode::UNAUTHORIZED,
            body: String::new(),
        };
        assert!(err.user_message().contains("configure"));
    }

    #[test]
    fn resolve_error_wraps_provider_message() {
        let parse = serde_json::from_str::<u8>("x").unwrap_err();
        let err = ResolveError::from(ProviderError::Parse {
            endpoint: "OpenWeather geocoding",
            source: parse,
        });

        assert!(err.to_string().contains("OpenWeather geocoding"));
        assert_eq!(err.user_message(), "Received an unexpected response. Please try again.");
    }

    #[test]
    fn invalid_data_reads_like_a_bad_response() {
        let err = ProviderError::Invalid {
            endpoint: "OpenWeather daily",
            detail: "timestamp 9223372036854775807 is out of range".into(),
        };

        assert_eq!(err.endpoint(), "OpenWeather daily");
        assert!(err.to_string().contains("out of range"));
        assert_eq!(err.user_message(), "Received an unexpected response. Please try again.");
    }
}
