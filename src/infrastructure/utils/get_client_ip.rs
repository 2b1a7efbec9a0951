use std::net::SocketAddr;

use actix_web::{dev::ServiceRequest, http::header::HeaderMap, HttpRequest};

use crate::entities::security_event::RequestContext;

/// First hop of `X-Forwarded-For` when proxies are trusted, else the peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_x_forwarded_for: bool) -> String {
    if trust_x_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn get_client_ip(req: &HttpRequest, trust_x_forwarded_for: bool) -> String {
    client_ip(req.headers(), req.peer_addr(), trust_x_forwarded_for)
}

pub fn service_client_ip(req: &ServiceRequest, trust_x_forwarded_for: bool) -> String {
    client_ip(req.headers(), req.peer_addr(), trust_x_forwarded_for)
}

/// Audit details of a request seen by a handler.
pub fn request_context(req: &HttpRequest, trust_x_forwarded_for: bool) -> RequestContext {
    RequestContext {
        ip: get_client_ip(req, trust_x_forwarded_for),
        method: req.method().to_string(),
        path: decoded_path(req.path()),
        user_agent: user_agent(req.headers()),
    }
}

/// Percent-decoded path, as the router matches it.
pub fn decoded_path(path: &str) -> String {
    urlencoding::decode(path)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

pub fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn forwarded_header_is_used_only_when_trusted() {
        let req = TestRequest::default()
            .insert_header(("x-forwarded-for", "203.0.113.7, 10.0.0.1"))
            .peer_addr("127.0.0.1:8080".parse().unwrap())
            .to_http_request();

        assert_eq!(get_client_ip(&req, true), "203.0.113.7");
        assert_eq!(get_client_ip(&req, false), "127.0.0.1");
    }

    #[test]
    fn request_context_copies_method_path_and_agent() {
        let req = TestRequest::post()
            .uri("/contact?x=1")
            .insert_header(("user-agent", "curl/8.0"))
            .peer_addr("10.1.2.3:5000".parse().unwrap())
            .to_http_request();

        let ctx = request_context(&req, false);
        assert_eq!(ctx.ip, "10.1.2.3");
        assert_eq!(ctx.method, "POST");
        assert_eq!(ctx.path, "/contact");
        assert_eq!(ctx.user_agent, "curl/8.0");
    }

    #[test]
    fn paths_are_percent_decoded() {
        assert_eq!(decoded_path("/%61dmin/contacts"), "/admin/contacts");
        assert_eq!(decoded_path("/blog/rust%20tips"), "/blog/rust tips");
        assert_eq!(decoded_path("/bad%ff"), "/bad%ff");

        let req = TestRequest::get().uri("/%61dmin/contacts").to_http_request();
        assert_eq!(request_context(&req, false).path, "/admin/contacts");
    }

    #[test]
    fn missing_peer_is_unknown() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(get_client_ip(&req, true), "unknown");
    }
}
