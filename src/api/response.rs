use serde::Deserialize;

use crate::error::{Error, Result};

/// Generic OpenApiV1 envelope.
///
/// A missing `error_code` counts as a failure: some endpoints answer plain
/// HTML or an empty object when the token is not accepted.
#[derive(Deserialize)]
pub(crate) struct V1Response<D> {
    #[serde(default = "error_code_missing")]
    error_code: i64,

    #[serde(default)]
    error_msg: Option<String>,

    #[serde(default)]
    data: Option<D>,
}

const fn error_code_missing() -> i64 {
    1
}

impl<D: Default> From<V1Response<D>> for Result<D> {
    fn from(response: V1Response<D>) -> Self {
        if response.error_code == 0 {
            Ok(response.data.unwrap_or_default())
        } else {
            Err(Error::Api {
                code: Some(response.error_code),
                message: response
                    .error_msg
                    .unwrap_or_else(|| "no error message received".to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, Value, json};

    use super::*;

    fn decode(value: Value) -> Result<Map<String, Value>> {
        serde_json::from_value::<V1Response<Map<String, Value>>>(value).unwrap().into()
    }

    #[test]
    fn test_success_ok() {
        let data = decode(json!({"error_code": 0, "error_msg": null, "data": {"count": 1}}));
        assert_eq!(data.unwrap().get("count"), Some(&json!(1)));
    }

    #[test]
    fn test_success_without_data_yields_empty_ok() {
        let data = decode(json!({"error_code": 0})).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_vendor_error_err() {
        let error = decode(json!({"error_code": 10011, "error_msg": "permission denied"}));
        match error.unwrap_err() {
            Error::Api { code, message } => {
                assert_eq!(code, Some(10011));
                assert_eq!(message, "permission denied");
            }
            other => panic!("expected an API error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_error_code_err() {
        let error = decode(json!({"data": {}}));
        assert!(matches!(error.unwrap_err(), Error::Api { code: Some(1), .. }));
    }
}
