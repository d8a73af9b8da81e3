use quick_xml::de;
use serde::Deserialize;
use streamsign_core::{Error, Result};

/// Get the sts endpoint.
///
/// The returning format may look like `sts.{region}.amazonaws.com`
///
/// # Notes
///
/// AWS could have different sts endpoint based on it's region.
/// We can check them by region name.
pub fn sts_endpoint(region: Option<&str>, use_regional: bool) -> Result<String> {
    // use regional sts if use_regional has been set.
    if use_regional {
        let region =
            region.ok_or_else(|| Error::config_invalid("regional STS endpoint requires region"))?;
        if region.starts_with("cn-") {
            Ok(format!("sts.{region}.amazonaws.com.cn"))
        } else {
            Ok(format!("sts.{region}.amazonaws.com"))
        }
    } else {
        let region = region.unwrap_or_default();
        if region.starts_with("cn") {
            Ok("sts.amazonaws.com.cn".to_string())
        } else {
            Ok("sts.amazonaws.com".to_string())
        }
    }
}

/// STS wraps failures in an `ErrorResponse` XML document.
#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StsErrorResponse {
    error: StsErrorDetail,
    request_id: String,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StsErrorDetail {
    code: String,
    message: String,
}

/// Turn a non-200 STS response into a typed error.
pub fn parse_sts_error(operation: &str, status: http::StatusCode, body: &str) -> Error {
    let (code, message, request_id) = match de::from_str::<StsErrorResponse>(body) {
        Ok(resp) => (resp.error.code, resp.error.message, resp.request_id),
        Err(_) => (String::new(), body.to_string(), String::new()),
    };

    let err = match code.as_str() {
        "AccessDenied" | "AccessDeniedException" | "UnauthorizedOperation" => {
            Error::permission_denied(format!("STS {operation} denied: {message}"))
        }
        "ExpiredToken" | "ExpiredTokenException" => {
            Error::credential_expired(format!("STS {operation} rejected credential: {message}"))
        }
        _ if status.is_server_error() => {
            Error::unexpected(format!("STS {operation} failed: {message}")).set_retryable(true)
        }
        _ => Error::unexpected(format!("STS {operation} failed: [{code}] {message}")),
    };

    let err = err.with_context(format!("status: {status}"));
    if request_id.is_empty() {
        err
    } else {
        err.with_context(format!("request_id: {request_id}"))
    }
}
