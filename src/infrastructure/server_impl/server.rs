use std::fmt;
use std::str::FromStr;

use eyre::bail;
use fnv::FnvHashMap;
use serde_json::Value;
use strum::{EnumString, IntoStaticStr};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, trace};

use crate::api::{movie_by_title, request_headers, sort_numbers};
use crate::application::ServerData;
use crate::infrastructure::server_impl::request::Request;
use crate::infrastructure::server_impl::response::{Response, StatusCode};
use crate::AnyResult;

/// A request has to fit in a single read of this size.
pub const RECV_BUFFER_SIZE: usize = 2048;

const CRLF: &str = "\r\n";

pub type Handler = fn(&ServerData, &Request<'_>) -> AnyResult<Outcome>;

pub type RouteTable = FnvHashMap<&'static str, FnvHashMap<Method, Handler>>;

#[derive(Debug)]
pub enum Outcome {
    Found(Value),
    NoResult,
}

#[derive(Debug)]
pub struct Server {
    data: ServerData,
    collections: RouteTable,
}

impl Server {
    pub fn new(data: ServerData) -> Self {
        let routes: [(&'static str, Method, Handler); 3] = [
            ("headers", Method::GET, request_headers),
            ("movies", Method::GET, movie_by_title),
            ("sort", Method::POST, sort_numbers),
        ];

        let mut collections = RouteTable::default();
        for (resource, method, handler) in routes {
            collections
                .entry(resource)
                .or_default()
                .insert(method, handler);
        }

        Self { data, collections }
    }

    /// Accepts a single client and serves it until something breaks.
    pub async fn run(&self, listener: TcpListener) -> AnyResult<()> {
        let (mut socket, peer) = listener.accept().await?;
        info!(%peer, "client connected");

        self.serve(&mut socket).await
    }

    /// The request-response cycle over one socket. Any decode, handler
    /// or io failure tears the whole server down.
    pub async fn serve(&self, socket: &mut TcpStream) -> AnyResult<()> {
        let mut buf = [0; RECV_BUFFER_SIZE];

        loop {
            let read = socket.read(&mut buf).await?;
            if read == 0 {
                bail!("connection closed by peer");
            }

            let request = decode(&buf[..read])?;
            trace!("{request}");

            let response = self.dispatch(&request)?;
            trace!("{response}");

            let status: &str = response.status_code.into();
            debug!(
                method = %request.method,
                resource = request.resource,
                status,
                "request served"
            );

            socket.write_all(&response.into_http()).await?;
        }
    }

    /// Routes on the first path segment, then on the method. Unknown
    /// collections answer 404, known ones without the method 405.
    pub fn dispatch(&self, request: &Request<'_>) -> AnyResult<Response> {
        let collection = request
            .resource
            .split('/')
            .nth(1)
            .and_then(|name| self.collections.get(name));

        let route = match collection {
            Some(methods) => methods.get(&request.method).ok_or(StatusCode::NotAllowed),
            None => Err(StatusCode::NotFound),
        };

        let (status_code, content) = match route {
            Ok(handler) => match handler(&self.data, request)? {
                Outcome::Found(value) => (StatusCode::Ok, serde_json::to_string(&value)?),
                Outcome::NoResult => (
                    StatusCode::NotFound,
                    StatusCode::NotFound.message().to_owned(),
                ),
            },
            Err(code) => (code, code.message().to_owned()),
        };

        Ok(Response::new(
            request.version,
            status_code,
            content,
            &self.data.address(),
        ))
    }
}

#[allow(clippy::upper_case_acronyms, non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IntoStaticStr)]
#[non_exhaustive]
pub enum Header {
    #[strum(serialize = "Content-Type")]
    CONTENT_TYPE,
    #[strum(serialize = "Host")]
    HOST,
    #[strum(serialize = "Date")]
    DATE,
    #[strum(serialize = "Content-Length")]
    CONTENT_LENGTH,
}

#[allow(clippy::upper_case_acronyms, non_camel_case_types)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
pub enum Method {
    CONNECT,
    DELETE,
    GET,
    HEAD,
    POST,
    PUT,
    /// Any other token on the request line. Never present in the
    /// routing table, so these end up as 405.
    #[strum(disabled)]
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::CONNECT => "CONNECT",
            Method::DELETE => "DELETE",
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::Other(token) => token,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ways a raw request can fail to decode. All of them take the
/// connection loop down.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("request is not valid utf-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),
    #[error("request body is not valid json")]
    InvalidJsonBody(#[source] serde_json::Error),
}

/// Decodes a raw request. The first crlf-separated segment is the
/// request line, the last one is the body, everything in between save
/// for the blank separator is a header line.
pub fn decode(raw: &[u8]) -> Result<Request<'_>, DecodeError> {
    let text = std::str::from_utf8(raw)?;
    let segments: Vec<&str> = text.split(CRLF).collect();

    let request_line = segments[0];
    let tokens: Vec<&str> = request_line.split(' ').collect();
    let &[method, resource, version] = tokens.as_slice() else {
        return Err(DecodeError::MalformedRequestLine(request_line.to_owned()));
    };

    let header_lines = segments
        .get(1..segments.len().saturating_sub(2))
        .unwrap_or_default();
    let mut headers = FnvHashMap::default();
    for line in header_lines {
        let (key, value) = split_header(line)?;
        headers.insert(key, value);
    }

    let raw_body = segments.last().copied().unwrap_or_default();
    let body: Option<Value> = if raw_body.is_empty() {
        None
    } else {
        Some(serde_json::from_str(raw_body).map_err(DecodeError::InvalidJsonBody)?)
    };

    // EnumString also derives TryFrom<&str>, a manual From impl would
    // conflict with it. The catch-all lives here instead.
    let method = Method::from_str(method).unwrap_or_else(|_| Method::Other(method.to_owned()));

    Ok(Request {
        method,
        resource,
        version,
        headers,
        body,
    })
}

/// A header line is a name and a value joined by a single `": "`.
fn split_header(line: &str) -> Result<(&str, &str), DecodeError> {
    let (key, value) = line
        .split_once(": ")
        .ok_or_else(|| DecodeError::MalformedHeader(line.to_owned()))?;

    if value.contains(": ") {
        return Err(DecodeError::MalformedHeader(line.to_owned()));
    }

    Ok((key, value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn test_server() -> Server {
        Server::new(ServerData::new("127.0.0.1", 7777, "film.csv"))
    }

    fn get(resource: &'static str) -> Request<'static> {
        Request {
            method: Method::GET,
            resource,
            version: "HTTP/1.1",
            headers: FnvHashMap::default(),
            body: None,
        }
    }

    #[test]
    fn success_decode_with_body() {
        let sample = b"POST /sort HTTP/1.1\r\nHost: 127.0.0.1:7777\r\nAccept: */*\r\n\r\n{\"input\": [3, 1, 2]}";

        let request = decode(sample).unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.resource, "/sort");
        assert_eq!(request.version, "HTTP/1.1");
        assert_eq!(request.headers["Host"], "127.0.0.1:7777");
        assert_eq!(request.headers["Accept"], "*/*");
        assert_eq!(request.body, Some(json!({"input": [3, 1, 2]})));
    }

    #[test]
    fn success_decode_without_body() {
        let sample = b"GET /headers HTTP/1.1\r\nHost: 127.0.0.1:7777\r\n\r\n";

        let request = decode(sample).unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.resource, "/headers");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.body, None);
    }

    #[test]
    fn success_decode_unknown_method() {
        let sample = b"PATCH /sort HTTP/1.1\r\nHost: x\r\n\r\n";

        let request = decode(sample).unwrap();
        assert_eq!(request.method, Method::Other("PATCH".to_owned()));
    }

    #[test]
    fn failure_decode_short_request_line() {
        let sample = b"GET /headers\r\nHost: x\r\n\r\n";

        let err = decode(sample).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedRequestLine(_)));
    }

    #[test]
    fn failure_decode_header_without_separator() {
        let sample = b"GET /headers HTTP/1.1\r\nHost 127.0.0.1\r\n\r\n";

        let err = decode(sample).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedHeader(_)));
    }

    #[test]
    fn failure_decode_header_with_two_separators() {
        let sample = b"GET /headers HTTP/1.1\r\nWeird: a: b\r\n\r\n";

        let err = decode(sample).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedHeader(_)));
    }

    #[test]
    fn failure_decode_body_not_json() {
        let sample = b"POST /sort HTTP/1.1\r\nHost: x\r\n\r\nnot-json";

        let err = decode(sample).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidJsonBody(_)));
    }

    #[test]
    fn success_dispatch_unknown_collection() {
        let server = test_server();

        let response = server.dispatch(&get("/nope")).unwrap();
        assert_eq!(response.status_code, StatusCode::NotFound);
        assert_eq!(response.body, "Not Found");
    }

    #[test]
    fn success_dispatch_bare_resource() {
        let server = test_server();

        let response = server.dispatch(&get("nope")).unwrap();
        assert_eq!(response.status_code, StatusCode::NotFound);
    }

    #[test]
    fn success_dispatch_method_not_allowed() {
        let server = test_server();

        let request = Request {
            method: Method::DELETE,
            resource: "/sort",
            version: "HTTP/1.1",
            headers: FnvHashMap::default(),
            body: None,
        };
        let response = server.dispatch(&request).unwrap();
        assert_eq!(response.status_code, StatusCode::NotAllowed);
        assert_eq!(response.body, "Not Allowed");
    }

    #[test]
    fn success_dispatch_headers_echo() {
        let server = test_server();

        let mut headers = FnvHashMap::default();
        headers.insert("Host", "127.0.0.1:7777");
        let request = Request {
            method: Method::GET,
            resource: "/headers",
            version: "HTTP/1.1",
            headers,
            body: None,
        };

        let response = server.dispatch(&request).unwrap();
        assert_eq!(response.status_code, StatusCode::Ok);
        assert_eq!(response.body, r#"{"Host":"127.0.0.1:7777"}"#);
    }

    #[test]
    fn success_dispatch_sort() {
        let server = test_server();

        let request = Request {
            method: Method::POST,
            resource: "/sort",
            version: "HTTP/1.1",
            headers: FnvHashMap::default(),
            body: Some(json!({"input": [5, 3, 1, 4, 2]})),
        };

        let response = server.dispatch(&request).unwrap();
        assert_eq!(response.status_code, StatusCode::Ok);
        assert_eq!(response.body, "[1,2,3,4,5]");
    }

    #[test]
    fn success_dispatch_version_echoed() {
        let server = test_server();

        let mut request = get("/nope");
        request.version = "HTTP/1.0";

        let response = server.dispatch(&request).unwrap();
        assert_eq!(response.version, "HTTP/1.0");
    }

    #[test]
    fn success_dispatch_generated_host_header() {
        let server = test_server();

        let response = server.dispatch(&get("/nope")).unwrap();
        assert_eq!(response.headers[1].1, "127.0.0.1:7777");
    }
}
