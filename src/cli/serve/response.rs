//! HTTP response writers.

use super::dispatch::Reply;
use crate::utils::mime::types::PLAIN;
use anyhow::Result;
use tiny_http::{Header, Method, Request, Response, StatusCode};

/// Write a reply; `HEAD` gets the headers only.
pub fn respond_reply(request: Request, reply: Reply) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, reply.status, reply.content_type);
    }
    send_body(request, reply.status, reply.content_type, reply.body)
}

/// Respond with 405 for anything but `GET`/`HEAD`.
pub fn respond_method_not_allowed(request: Request) -> Result<()> {
    let response = Response::from_data(b"405 Method Not Allowed".to_vec())
        .with_status_code(StatusCode(405))
        .with_header(make_header("Content-Type", PLAIN))
        .with_header(make_header("Allow", "GET, HEAD"));
    request.respond(response)?;
    Ok(())
}

/// Respond with 500 when a reply could not be produced.
pub fn respond_internal_error(request: Request) -> Result<()> {
    send_body(request, 500, PLAIN, b"500 Internal Server Error".to_vec())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(request, 503, PLAIN, b"503 Service Unavailable".to_vec())
}

pub fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

/// Only `GET` and `HEAD` are routed.
pub fn is_supported_method(method: &Method) -> bool {
    matches!(method, Method::Get | Method::Head)
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> Result<()> {
    let response =
        Response::empty(StatusCode(status)).with_header(make_header("Content-Type", content_type));
    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type))
        .with_header(make_header("Cache-Control", "no-store"));
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    Header::from_bytes(key, value).expect("static header")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_methods() {
        assert!(is_supported_method(&Method::Get));
        assert!(is_supported_method(&Method::Head));
        assert!(!is_supported_method(&Method::Post));
        assert!(!is_supported_method(&Method::Put));
    }

    #[test]
    fn test_static_headers_are_valid() {
        for value in [PLAIN, "GET, HEAD", "no-store"] {
            make_header("Content-Type", value);
        }
    }
}
