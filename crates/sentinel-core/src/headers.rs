//! Security response headers.
//!
//! The gateway itself never binds a socket; an out-of-process HTTP
//! adapter is expected to attach these to every response. This module
//! only builds the values — it does not serialize them onto any
//! particular HTTP type.

use crate::config::GatewayConfig;

/// Fixed security header set, with `connect-src` in the CSP widened to
/// cover the configured front-end origins (and their WebSocket
/// variants) so browser clients can still reach the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityHeaders {
    pub content_security_policy: String,
    pub x_content_type_options: String,
    pub x_frame_options: String,
    pub strict_transport_security: String,
    pub referrer_policy: String,
    pub permissions_policy: String,
}

impl SecurityHeaders {
    /// Builds the header set for a config, scoping the CSP's
    /// `connect-src` to the configured CORS origins plus their `wss://`
    /// equivalents. Empty `cors_origins` yields `connect-src 'self'`.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        let connect_src = if config.cors_origins.is_empty() {
            "'self'".to_string()
        } else {
            let mut sources = vec!["'self'".to_string()];
            for origin in &config.cors_origins {
                sources.push(origin.clone());
                sources.push(origin.replacen("https://", "wss://", 1).replacen("http://", "ws://", 1));
            }
            sources.join(" ")
        };

        Self {
            content_security_policy: format!(
                "default-src 'self'; connect-src {connect_src}; frame-ancestors 'none'"
            ),
            x_content_type_options: "nosniff".to_string(),
            x_frame_options: "DENY".to_string(),
            strict_transport_security: "max-age=31536000; includeSubDomains".to_string(),
            referrer_policy: "strict-origin-when-cross-origin".to_string(),
            permissions_policy: "geolocation=(), microphone=(), camera=()".to_string(),
        }
    }

    /// Header name/value pairs, in the order an adapter should set them.
    #[must_use]
    pub fn as_pairs(&self) -> [(&'static str, &str); 6] {
        [
            ("Content-Security-Policy", &self.content_security_policy),
            ("X-Content-Type-Options", &self.x_content_type_options),
            ("X-Frame-Options", &self.x_frame_options),
            ("Strict-Transport-Security", &self.strict_transport_security),
            ("Referrer-Policy", &self.referrer_policy),
            ("Permissions-Policy", &self.permissions_policy),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_scopes_connect_src_to_self() {
        let headers = SecurityHeaders::from_config(&GatewayConfig::default());
        assert!(headers.content_security_policy.contains("connect-src 'self'"));
    }

    #[test]
    fn cors_origin_widens_connect_src_with_websocket_variant() {
        let mut config = GatewayConfig::default();
        config.cors_origins = vec!["https://app.example.com".to_string()];

        let headers = SecurityHeaders::from_config(&config);
        assert!(headers.content_security_policy.contains("https://app.example.com"));
        assert!(headers.content_security_policy.contains("wss://app.example.com"));
    }

    #[test]
    fn fixed_headers_match_documented_policy() {
        let headers = SecurityHeaders::from_config(&GatewayConfig::default());
        assert_eq!(headers.x_frame_options, "DENY");
        assert_eq!(headers.x_content_type_options, "nosniff");
        assert_eq!(headers.referrer_policy, "strict-origin-when-cross-origin");
    }
}
