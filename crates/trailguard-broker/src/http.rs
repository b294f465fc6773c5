//! Shared HTTP-to-error mapping for REST gateways.

use trailguard_core::error::GatewayError;

/// Map a transport-level failure.
pub(crate) fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout(err.to_string())
    } else {
        GatewayError::Network(err.to_string())
    }
}

/// Map a non-success HTTP status.
///
/// 4xx is a business decline (never retried), except 401/403 and 429 which
/// get their own variants; 5xx is transient.
pub(crate) fn status_error(status: reqwest::StatusCode, body: String) -> GatewayError {
    let code = status.as_u16();
    match code {
        401 | 403 => GatewayError::Authentication(body),
        404 => GatewayError::NotFound(body),
        429 => GatewayError::RateLimited {
            retry_after_secs: 1,
        },
        400..=499 => GatewayError::Rejected(format!("{code}: {body}")),
        _ => GatewayError::Api { status: code, body },
    }
}

/// Default per-request timeout for venue calls.
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 10;

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, String::new()),
            GatewayError::Rejected(_)
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, String::new()),
            GatewayError::NotFound(_)
        ));
        assert!(status_error(StatusCode::BAD_GATEWAY, String::new()).is_transient());
        assert!(!status_error(StatusCode::FORBIDDEN, String::new()).is_transient());
    }
}
