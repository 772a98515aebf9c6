//! Security audit logging for authentication events
//!
//! Registrations, logins, token refreshes and rejected bearer tokens are
//! logged at INFO level with the "audit" target so they can be filtered and
//! routed separately from application logs, e.g. with
//! `RUST_LOG=audit=info,quire_api=warn`.

use axum::http::HeaderMap;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Request metadata attached to audit events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOrigin {
    /// Client IP address (extracted from proxy headers)
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestOrigin {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    RegistrationSuccess {
        nickname: String,
        #[serde(flatten)]
        origin: RequestOrigin,
    },

    RegistrationFailure {
        nickname: String,
        reason: String,
        #[serde(flatten)]
        origin: RequestOrigin,
    },

    LoginSuccess {
        nickname: String,
        #[serde(flatten)]
        origin: RequestOrigin,
    },

    /// Failed login; `reason` is the internal cause and never sent to the client
    LoginFailure {
        nickname: String,
        reason: String,
        #[serde(flatten)]
        origin: RequestOrigin,
    },

    /// Token pair rotated through the refresh endpoint
    TokenRefresh {
        nickname: String,
        #[serde(flatten)]
        origin: RequestOrigin,
    },

    /// Rejected refresh attempt, including replays of already-rotated tokens
    TokenRefreshFailure {
        reason: String,
        #[serde(flatten)]
        origin: RequestOrigin,
    },

    /// Invalid or expired bearer token on a protected route
    InvalidToken {
        reason: String,
        #[serde(flatten)]
        origin: RequestOrigin,
    },
}

impl AuditEvent {
    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::RegistrationSuccess { .. } => "User registered",
            AuditEvent::RegistrationFailure { .. } => "Registration failed",
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::TokenRefresh { .. } => "Token pair refreshed",
            AuditEvent::TokenRefreshFailure { .. } => "Token refresh rejected",
            AuditEvent::InvalidToken { .. } => "Invalid token",
        }
    }

    fn origin(&self) -> &RequestOrigin {
        match self {
            AuditEvent::RegistrationSuccess { origin, .. }
            | AuditEvent::RegistrationFailure { origin, .. }
            | AuditEvent::LoginSuccess { origin, .. }
            | AuditEvent::LoginFailure { origin, .. }
            | AuditEvent::TokenRefresh { origin, .. }
            | AuditEvent::TokenRefreshFailure { origin, .. }
            | AuditEvent::InvalidToken { origin, .. } => origin,
        }
    }
}

/// Log a security audit event with structured fields
///
/// The full event is also attached as JSON for log aggregators:
///
/// ```json
/// {
///   "event_type": "login_failure",
///   "nickname": "anna9",
///   "reason": "wrong password",
///   "ip_address": "192.168.1.1",
///   "user_agent": "curl/8.5.0"
/// }
/// ```
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();

    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    let origin = event.origin();

    match event {
        AuditEvent::RegistrationSuccess { nickname, .. }
        | AuditEvent::LoginSuccess { nickname, .. }
        | AuditEvent::TokenRefresh { nickname, .. } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                nickname = %nickname,
                ip_address = ?origin.ip_address,
                "{}",
                event.summary()
            );
        }
        AuditEvent::RegistrationFailure {
            nickname, reason, ..
        }
        | AuditEvent::LoginFailure {
            nickname, reason, ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                nickname = %nickname,
                reason = %reason,
                ip_address = ?origin.ip_address,
                "{}",
                event.summary()
            );
        }
        AuditEvent::TokenRefreshFailure { reason, .. }
        | AuditEvent::InvalidToken { reason, .. } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                reason = %reason,
                ip_address = ?origin.ip_address,
                user_agent = ?origin.user_agent,
                "{}",
                event.summary()
            );
        }
    }
}

/// Extract client IP address from proxy headers
///
/// Checks X-Forwarded-For first (taking the client end of the chain), then
/// X-Real-IP. Peer addresses are not available at this layer.
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    let forwarded = header_str(headers, "x-forwarded-for")
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    forwarded
        .or_else(|| header_str(headers, "x-real-ip"))
        .map(str::to_string)
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    header_str(headers, axum::http::header::USER_AGENT.as_str()).map(str::to_string)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> RequestOrigin {
        RequestOrigin {
            ip_address: Some("192.168.1.1".to_string()),
            user_agent: Some("Test Agent".to_string()),
        }
    }

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginFailure {
            nickname: "anna9".to_string(),
            reason: "wrong password".to_string(),
            origin: origin(),
        };

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "login_failure");
        assert_eq!(json["nickname"], "anna9");
        assert_eq!(json["ip_address"], "192.168.1.1");
    }

    #[test]
    fn test_audit_log_all_events() {
        // Only checks that logging never panics
        audit_log(&AuditEvent::RegistrationSuccess {
            nickname: "anna9".to_string(),
            origin: origin(),
        });
        audit_log(&AuditEvent::RegistrationFailure {
            nickname: "anna9".to_string(),
            reason: "nickname taken".to_string(),
            origin: RequestOrigin::default(),
        });
        audit_log(&AuditEvent::LoginSuccess {
            nickname: "anna9".to_string(),
            origin: origin(),
        });
        audit_log(&AuditEvent::TokenRefresh {
            nickname: "anna9".to_string(),
            origin: origin(),
        });
        audit_log(&AuditEvent::TokenRefreshFailure {
            reason: "refresh token already used".to_string(),
            origin: origin(),
        });
        audit_log(&AuditEvent::InvalidToken {
            reason: "Token has expired".to_string(),
            origin: origin(),
        });
    }

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.1".parse().unwrap());

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_request_origin_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::USER_AGENT,
            "Mozilla/5.0 (Test)".parse().unwrap(),
        );

        let origin = RequestOrigin::from_headers(&headers);
        assert_eq!(origin.ip_address, None);
        assert_eq!(origin.user_agent, Some("Mozilla/5.0 (Test)".to_string()));
    }
}
