//! Caller address used to key rate limits.

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use std::convert::Infallible;
use std::future::{ready, Ready};

use crate::state::AppState;

/// Best known address of the caller.
///
/// `X-Forwarded-For` (first entry) and `X-Real-IP` are honoured only when
/// the direct peer is a configured trusted proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn resolve(req: &HttpRequest, trusted_proxies: &[String]) -> Self {
        let peer = req.peer_addr().map(|addr| addr.ip().to_string());
        let behind_proxy = peer
            .as_deref()
            .map(|ip| trusted_proxies.iter().any(|proxy| proxy == ip))
            .unwrap_or(false);

        if behind_proxy {
            let forwarded = req
                .headers()
                .get("x-forwarded-for")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .or_else(|| {
                    req.headers()
                        .get("x-real-ip")
                        .and_then(|value| value.to_str().ok())
                })
                .map(str::trim)
                .filter(|ip| !ip.is_empty());
            if let Some(ip) = forwarded {
                return ClientIp(ip.to_string());
            }
        }

        ClientIp(peer.unwrap_or_else(|| "unknown".to_string()))
    }
}

impl FromRequest for ClientIp {
    type Error = Infallible;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let trusted = req
            .app_data::<web::Data<AppState>>()
            .map(|state| state.trusted_proxies.as_slice())
            .unwrap_or_default();
        ready(Ok(ClientIp::resolve(req, trusted)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_forwarded_header_ignored_from_untrusted_peer() {
        let req = TestRequest::default()
            .peer_addr("198.51.100.7:1234".parse().unwrap())
            .insert_header(("x-forwarded-for", "1.2.3.4"))
            .to_http_request();
        assert_eq!(ClientIp::resolve(&req, &[]).as_str(), "198.51.100.7");
    }

    #[test]
    fn test_trusted_proxy_forwards_first_hop() {
        let trusted = vec!["10.0.0.1".to_string()];
        let req = TestRequest::default()
            .peer_addr("10.0.0.1:80".parse().unwrap())
            .insert_header(("x-forwarded-for", "1.2.3.4, 10.0.0.1"))
            .to_http_request();
        assert_eq!(ClientIp::resolve(&req, &trusted).as_str(), "1.2.3.4");

        let req = TestRequest::default()
            .peer_addr("10.0.0.1:80".parse().unwrap())
            .insert_header(("x-real-ip", "5.6.7.8"))
            .to_http_request();
        assert_eq!(ClientIp::resolve(&req, &trusted).as_str(), "5.6.7.8");
    }

    #[test]
    fn test_missing_peer_is_unknown() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(ClientIp::resolve(&req, &[]).as_str(), "unknown");
    }
}
