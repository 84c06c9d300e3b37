// Copyright (c) 2025 Quay contributors

// SPDX-License-Identifier: MIT
// Third-party contributions licensed under DCO

// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to
// deal in the Software without restriction, including without limitation the
// rights to use, copy, modify, merge, publish, distribute, sublicense, and/or
// sell copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:

// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NON-INFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS
// IN THE SOFTWARE.

// ----------------------------------------------------------------------------

//! HTTP request.

use std::io::{ErrorKind, Read};
use std::{fmt, str};

use super::component::{Header, Method, Status};
use super::headers::Headers;
use super::route;

mod encoding;
mod error;
mod query;

use encoding::decode_path;
pub use error::{Error, Result};
pub use query::Query;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Maximum number of headers.
const MAX_HEADERS: usize = 64;

/// Maximum size of the request line and headers.
const MAX_HEAD: usize = 64 * 1024;

/// Maximum length of the request target.
const MAX_TARGET: usize = 2 * 1024;

/// Maximum length of a header value.
const MAX_HEADER_VALUE: usize = 4 * 1024;

/// Maximum size of the body.
const MAX_BODY: usize = 8 * 1024 * 1024;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP request.
///
/// Requests are read from a connection with [`Request::read_from`], or parsed
/// from a complete buffer with [`Request::from_bytes`], and are immutable from
/// then on, as handlers only ever receive a shared reference. The path is
/// percent-decoded, but not normalized, so it might still contain `..`
/// segments, which static file serving takes care of.
///
/// # Examples
///
/// ```
/// use quay_serve::http::{Method, Request};
///
/// // Create request
/// let req = Request::new()
///     .method(Method::Get)
///     .uri("/api/icon?id=12");
/// assert_eq!(req.query("id"), Some("12"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Request path, percent-decoded.
    pub path: String,
    /// Query string.
    pub query: Query,
    /// Request headers.
    pub headers: Headers,
    /// Request body.
    pub body: Vec<u8>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Request {
    /// Creates a request.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a request from the given bytes.
    ///
    /// HTTP requests are parsed using the [`httparse`] crate. The body is sized
    /// by the `Content-Length` header, and any bytes following it are ignored.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Incomplete`], if the given buffer contained
    /// insufficient data, [`Error::Parser`], if the buffer contained invalid
    /// data, [`Error::Component`], if the method is unknown, and
    /// [`Error::Validation`], if the request exceeds one of the limits.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use quay_serve::http::{Method, Request};
    ///
    /// // Create request from bytes
    /// let req = Request::from_bytes(b"GET /api/icon?id=12 HTTP/1.1\r\n\r\n")?;
    /// assert_eq!(req.method, Method::Get);
    /// assert_eq!(req.path, "/api/icon");
    /// assert_eq!(req.query("id"), Some("12"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (mut req, n) = parse(bytes)?.ok_or(Error::Incomplete)?;
        let len = req.content_length()?;
        match bytes[n..].get(..len) {
            Some(body) => req.body = body.to_vec(),
            None => return Err(Error::Incomplete),
        }
        Ok(req)
    }

    /// Reads a request from the given reader.
    ///
    /// The reader is consumed until the request line and headers are complete,
    /// and then exactly as many bytes as the `Content-Length` header requires.
    /// Reads are subject to the timeouts of the underlying connection.
    ///
    /// # Errors
    ///
    /// In addition to the errors of [`Request::from_bytes`], this method
    /// returns [`Error::Closed`], if the peer closed the connection before
    /// sending anything, and [`Error::Io`], if reading fails.
    pub fn read_from<R>(reader: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let mut buffer = Vec::with_capacity(1024);
        let mut chunk = [0; 4096];

        // Read until the head of the request can be parsed, or the peer closes
        // the connection, or the head exceeds the limit
        let (mut req, n) = loop {
            let bytes = match reader.read(&mut chunk) {
                Ok(0) if buffer.is_empty() => return Err(Error::Closed),
                Ok(0) => return Err(Error::Incomplete),
                Ok(bytes) => bytes,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            buffer.extend_from_slice(&chunk[..bytes]);
            if let Some(parsed) = parse(&buffer)? {
                break parsed;
            }
            if buffer.len() > MAX_HEAD {
                let status = Status::RequestHeaderFieldsTooLarge;
                return Err(Error::Validation(status));
            }
        };

        // Read the remainder of the body, if the initial reads didn't already
        // return it, and discard anything following it
        let len = req.content_length()?;
        let mut body = buffer.split_off(n);
        body.truncate(len);
        if body.len() < len {
            let start = body.len();
            body.resize(len, 0);
            reader.read_exact(&mut body[start..]).map_err(|err| {
                if err.kind() == ErrorKind::UnexpectedEof {
                    Error::Incomplete
                } else {
                    Error::Io(err)
                }
            })?;
        }

        // Return request
        req.body = body;
        Ok(req)
    }

    /// Returns the first query parameter value for the given key.
    #[inline]
    pub fn query<K>(&self, key: K) -> Option<&str>
    where
        K: AsRef<str>,
    {
        self.query.get(key)
    }

    /// Matches the request against the given method and path pattern.
    ///
    /// The method is compared exactly, and the path is compared against the
    /// pattern, where a trailing `*` matches any remaining suffix of the path.
    /// If the request matches, the captured suffix is returned, which is empty
    /// for patterns without a wildcard.
    ///
    /// # Examples
    ///
    /// ```
    /// use quay_serve::http::{Method, Request};
    ///
    /// // Create request
    /// let req = Request::new()
    ///     .method(Method::Get)
    ///     .uri("/api/clients/132337");
    ///
    /// // Match request against patterns
    /// assert_eq!(req.is(Method::Get, "/api/clients/*"), Some("132337"));
    /// assert_eq!(req.is(Method::Get, "/api/other/*"), None);
    /// assert_eq!(req.is(Method::Post, "/api/clients/*"), None);
    /// ```
    #[must_use]
    pub fn is(&self, method: Method, pattern: &str) -> Option<&str> {
        if self.method == method {
            route::capture(pattern, &self.path)
        } else {
            None
        }
    }

    /// Returns whether the request asks for a protocol upgrade.
    #[inline]
    #[must_use]
    pub fn is_upgrade(&self) -> bool {
        self.headers.contains(Header::Upgrade)
    }

    /// Returns the length of the body as announced by the headers.
    fn content_length(&self) -> Result<usize> {
        if self.headers.contains(Header::TransferEncoding) {
            return Err(Error::Validation(Status::NotImplemented));
        }

        // Requests without length header have no body
        let Some(value) = self.headers.get(Header::ContentLength) else {
            return Ok(0);
        };
        match value.trim().parse::<usize>() {
            Ok(len) if len > MAX_BODY => {
                Err(Error::Validation(Status::PayloadTooLarge))
            }
            Ok(len) => Ok(len),
            Err(_) => Err(Error::Validation(Status::BadRequest)),
        }
    }
}

impl Request {
    /// Sets the method of the request.
    #[inline]
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the path and query string of the request from a request target.
    ///
    /// # Examples
    ///
    /// ```
    /// use quay_serve::http::Request;
    ///
    /// // Create request and set request target
    /// let req = Request::new()
    ///     .uri("/search?q=caf%C3%A9");
    /// assert_eq!(req.query("q"), Some("café"));
    /// ```
    #[must_use]
    pub fn uri(mut self, target: &str) -> Self {
        let (path, query) = split_target(target);
        self.path = path;
        self.query = query;
        self
    }

    /// Adds a header to the request.
    #[inline]
    #[must_use]
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: AsRef<str>,
        V: ToString,
    {
        self.headers.insert(name, value);
        self
    }

    /// Sets the body of the request.
    #[inline]
    #[must_use]
    pub fn body<B>(mut self, body: B) -> Self
    where
        B: Into<Vec<u8>>,
    {
        self.body = body.into();
        self
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Default for Request {
    /// Creates a default request.
    #[inline]
    fn default() -> Self {
        Self {
            method: Method::Get,
            path: String::from("/"),
            query: Query::default(),
            headers: Headers::default(),
            body: Vec::new(),
        }
    }
}

// ----------------------------------------------------------------------------

impl fmt::Display for Request {
    /// Formats the request for display.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        write!(f, " HTTP/1.1\r\n{}\r\n", self.headers)?;
        write!(f, "[Body: {} bytes]\r\n", self.body.len())
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Parses the request line and headers, returning the request together with
/// the length of the head, or nothing if the head is not yet complete.
fn parse(bytes: &[u8]) -> Result<Option<(Request, usize)>> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);
    let httparse::Status::Complete(n) = req.parse(bytes)? else {
        return Ok(None);
    };
    if n > MAX_HEAD {
        return Err(Error::Validation(Status::RequestHeaderFieldsTooLarge));
    }

    // A complete parse always yields method and target, so in case it didn't,
    // we just treat the request as incomplete
    let (Some(method), Some(target)) = (req.method, req.path) else {
        return Err(Error::Incomplete);
    };
    let method = method.parse::<Method>()?;
    if target.len() > MAX_TARGET {
        return Err(Error::Validation(Status::UriTooLong));
    }

    // Ensure that the request target is in origin form, as we do not support
    // proxy requests, and probably never will
    if !target.starts_with('/') {
        return Err(Error::Validation(Status::BadRequest));
    }

    // Unpack request headers, ensuring that values don't exceed a sane limit,
    // but skip values that are not valid UTF-8, as we can't represent them
    let mut map = Headers::new();
    for header in req.headers.iter() {
        if header.value.len() > MAX_HEADER_VALUE {
            let status = Status::RequestHeaderFieldsTooLarge;
            return Err(Error::Validation(status));
        }
        if let Ok(value) = str::from_utf8(header.value) {
            map.insert(header.name, value.trim());
        }
    }

    // Create request without body
    let (path, query) = split_target(target);
    let req = Request {
        method,
        path,
        query,
        headers: map,
        body: Vec::new(),
    };
    Ok(Some((req, n)))
}

/// Splits a request target into the decoded path and query string.
fn split_target(target: &str) -> (String, Query) {
    match target.split_once('?') {
        Some((path, query)) => (decode_path(path), Query::from(query)),
        None => (decode_path(target), Query::default()),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn reads_body_by_content_length() {
        let mut reader = Cursor::new(
            b"POST /form HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello, extra",
        );
        let req = Request::read_from(&mut reader).unwrap();
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.body, b"hello");
    }

    #[test]
    fn reads_headers_case_insensitively() {
        let req = Request::from_bytes(
            b"GET / HTTP/1.1\r\nx-token: abc\r\nHOST: localhost\r\n\r\n",
        )
        .unwrap();
        assert_eq!(req.headers.get("X-Token"), Some("abc"));
        assert_eq!(req.headers.get(Header::Host), Some("localhost"));
    }

    #[test]
    fn reports_closed_connection() {
        let mut reader = Cursor::new(b"");
        let err = Request::read_from(&mut reader).unwrap_err();
        assert!(matches!(err, Error::Closed));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn reports_truncated_body() {
        let mut reader =
            Cursor::new(b"PUT / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc");
        let err = Request::read_from(&mut reader).unwrap_err();
        assert!(matches!(err, Error::Incomplete));
        assert_eq!(err.status(), Some(Status::BadRequest));
    }

    #[test]
    fn rejects_malformed_request() {
        let bytes = b"GET\x01/ HTTP/1.1\r\n\r\n";
        let err = Request::from_bytes(bytes).unwrap_err();
        assert_eq!(err.status(), Some(Status::BadRequest));
    }

    #[test]
    fn rejects_unknown_method() {
        let bytes = b"BREW /pot HTTP/1.1\r\n\r\n";
        let err = Request::from_bytes(bytes).unwrap_err();
        assert!(matches!(err, Error::Component(_)));
        assert_eq!(err.status(), Some(Status::BadRequest));
    }

    #[test]
    fn rejects_chunked_body() {
        let err = Request::from_bytes(
            b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n",
        )
        .unwrap_err();
        assert_eq!(err.status(), Some(Status::NotImplemented));
    }

    #[test]
    fn rejects_oversized_body() {
        let err = Request::from_bytes(
            b"POST / HTTP/1.1\r\nContent-Length: 99999999999\r\n\r\n",
        )
        .unwrap_err();
        assert_eq!(err.status(), Some(Status::PayloadTooLarge));
    }

    #[test]
    fn rejects_long_target() {
        let target = format!("/{}", "a".repeat(MAX_TARGET));
        let bytes = format!("GET {target} HTTP/1.1\r\n\r\n");
        let err = Request::from_bytes(bytes.as_bytes()).unwrap_err();
        assert_eq!(err.status(), Some(Status::UriTooLong));
    }

    #[test]
    fn rejects_too_many_headers() {
        let mut bytes = String::from("GET / HTTP/1.1\r\n");
        for n in 0..=MAX_HEADERS {
            bytes.push_str(&format!("X-Header-{n}: {n}\r\n"));
        }
        bytes.push_str("\r\n");
        let err = Request::from_bytes(bytes.as_bytes()).unwrap_err();
        assert_eq!(err.status(), Some(Status::RequestHeaderFieldsTooLarge));
    }

    #[test]
    fn rejects_absolute_form() {
        let err = Request::from_bytes(
            b"GET http://example.com/ HTTP/1.1\r\n\r\n",
        )
        .unwrap_err();
        assert_eq!(err.status(), Some(Status::BadRequest));
    }
}
