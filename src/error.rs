use crate::device::DeviceType;

pub type Result<T = (), E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while talking to the Growatt cloud.
///
/// Validation and configuration errors are raised before any request is sent,
/// so a write either fully encodes and goes out, or fails locally.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level failure, propagated as-is. The crate never retries.
    #[error("transport error")]
    Network(#[from] reqwest::Error),

    /// The server reported a failure inside an otherwise successful exchange.
    ///
    /// The OpenApiV1 endpoints carry a numeric `error_code`, the legacy
    /// endpoints usually only a `msg`, hence the optional code.
    #[error("{}", api_message(.code, .message))]
    Api { code: Option<i64>, message: String },

    /// A parameter request failed a local constraint check.
    #[error("invalid `{field}`: {constraint}")]
    Validation { field: &'static str, constraint: String },

    /// The command is not in the closed command set of the device type.
    #[error("command `{command}` is not supported for {device_type} devices")]
    Configuration { command: String, device_type: DeviceType },

    /// The server returned 2xx with a body that is not the documented shape.
    #[error("failed to decode the server response")]
    Decode(#[from] serde_json::Error),

    #[error("the token is not a valid header value")]
    InvalidToken(#[from] http::header::InvalidHeaderValue),
}

impl Error {
    pub fn validation(field: &'static str, constraint: impl Into<String>) -> Self {
        Self::Validation { field, constraint: constraint.into() }
    }
}

fn api_message(code: &Option<i64>, message: &str) -> String {
    match code {
        Some(code) => format!("Growatt server error {code}: {message}"),
        None => format!("Growatt server error: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_with_code_ok() {
        let error = Error::Api { code: Some(10011), message: "permission denied".to_string() };
        assert_eq!(error.to_string(), "Growatt server error 10011: permission denied");
    }

    #[test]
    fn test_api_error_display_without_code_ok() {
        let error = Error::Api { code: None, message: "error".to_string() };
        assert_eq!(error.to_string(), "Growatt server error: error");
    }

    #[test]
    fn test_configuration_error_display_ok() {
        let error = Error::Configuration {
            command: "mix_ac_charge_time_period".to_string(),
            device_type: DeviceType::MinTlx,
        };
        assert_eq!(
            error.to_string(),
            "command `mix_ac_charge_time_period` is not supported for MIN/TLX devices"
        );
    }
}
