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

//! WebSocket upgrade.

use base64::prelude::*;
use sha1_smol::Sha1;
use std::fmt;
use std::io::Write;
use tracing::{debug, warn};
use tungstenite::protocol::{Role, WebSocketConfig};

use crate::http::{Header, Method, Request, Response, ResponseExt, Status};
use crate::socket::Stream;

use super::Upgrade;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// GUID appended to the client key, as defined in RFC 6455.
const GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// WebSocket upgrade.
///
/// This upgrade validates the WebSocket handshake, answers it with "101
/// Switching Protocols", and hands the connection to the given function as a
/// [`tungstenite::WebSocket`], which implements the frame protocol. The
/// function runs on the connection's handler thread, and the connection is
/// closed once it returns.
///
/// Handshakes that don't meet the requirements of RFC 6455 are answered with
/// "400 Bad Request", or with "426 Upgrade Required" for an unsupported
/// protocol version, in which case the function is never called.
///
/// # Examples
///
/// ```
/// use quay_serve::http::Http;
/// use quay_serve::upgrade::WebSocket;
///
/// // Create service echoing all messages
/// let http = Http::new().upgrade(WebSocket::new(|mut socket| {
///     while let Ok(message) = socket.read() {
///         if socket.send(message).is_err() {
///             break;
///         }
///     }
/// }));
/// ```
pub struct WebSocket<F> {
    /// Function taking over the socket.
    handler: F,
    /// Protocol configuration.
    config: WebSocketConfig,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<F> WebSocket<F>
where
    F: Fn(tungstenite::WebSocket<Stream>) + Send + Sync + 'static,
{
    /// Creates a WebSocket upgrade.
    pub fn new(handler: F) -> Self {
        Self { handler, config: WebSocketConfig::default() }
    }

    /// Sets the protocol configuration, e.g., to limit message sizes.
    #[must_use]
    pub fn config(mut self, config: WebSocketConfig) -> Self {
        self.config = config;
        self
    }
}

impl<F> WebSocket<F> {
    /// Validates the handshake of the given request.
    ///
    /// Validation follows RFC 6455, Section 4.2.1, checking the method, the
    /// `Upgrade`, `Connection` and version headers, and the presence of the
    /// client key.
    ///
    /// # Errors
    ///
    /// If the handshake is invalid, the response to reject it is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use quay_serve::http::{Header, Method, Request, Status};
    /// use quay_serve::upgrade::WebSocket;
    ///
    /// // Create upgrade
    /// let upgrade = WebSocket::new(|_| {});
    ///
    /// // Create request
    /// let req = Request::new()
    ///     .method(Method::Get)
    ///     .header(Header::Connection, "Upgrade")
    ///     .header(Header::Upgrade, "websocket")
    ///     .header(Header::SecWebSocketKey, "dGhlIHNhbXBsZSBub25jZQ==")
    ///     .header(Header::SecWebSocketVersion, "13");
    ///
    /// // Validate handshake
    /// let res = upgrade.handshake(&req).unwrap();
    /// assert_eq!(res.status, Some(Status::SwitchingProtocols));
    /// assert_eq!(
    ///     res.headers.get(Header::SecWebSocketAccept),
    ///     Some("s3pPLMBiTxaQ9kYGJzzhZRbK+xOo="),
    /// );
    /// ```
    pub fn handshake(&self, req: &Request) -> Result<Response, Response> {
        let upgrade = req.headers.get(Header::Upgrade).unwrap_or_default();
        if !upgrade.eq_ignore_ascii_case("websocket") {
            return Err(Response::from_status(Status::BadRequest));
        }

        // 1. Ensure method is GET
        if req.method != Method::Get {
            return Err(Response::from_status(Status::BadRequest));
        }

        // 2. Ensure connection header contains upgrade
        let connection = req.headers.get(Header::Connection);
        let mut iter = connection.unwrap_or_default().split(',').map(str::trim);
        if !iter.any(|value| value.eq_ignore_ascii_case("upgrade")) {
            return Err(Response::from_status(Status::BadRequest));
        }

        // 3. Ensure WebSocket version is 13
        if Some("13") != req.headers.get(Header::SecWebSocketVersion) {
            return Err(Response::from_status(Status::UpgradeRequired)
                .header(Header::Upgrade, "websocket")
                .header(Header::SecWebSocketVersion, "13"));
        }

        // 4. Ensure WebSocket key is present
        let Some(key) = req.headers.get(Header::SecWebSocketKey) else {
            return Err(Response::from_status(Status::BadRequest));
        };

        // Return response for WebSocket handshake
        Ok(Response::new()
            .status(Status::SwitchingProtocols)
            .header(Header::Upgrade, "websocket")
            .header(Header::Connection, "Upgrade")
            .header(Header::SecWebSocketAccept, accept_key(key)))
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<F> Upgrade for WebSocket<F>
where
    F: Fn(tungstenite::WebSocket<Stream>) + Send + Sync + 'static,
{
    /// Takes over the connection of the given request.
    fn take_over(&self, req: Request, mut stream: Stream) {
        let (res, accepted) = match self.handshake(&req) {
            Ok(res) => (res, true),
            Err(res) => (res, false),
        };

        // Answer handshake, and only continue if it was accepted
        let status = res.status.as_ref().map(Status::code);
        if let Err(err) = stream.write_all(&res.into_bytes(false)) {
            warn!(peer = %stream.peer(), "could not answer handshake: {err}");
            return;
        }
        if !accepted {
            debug!(peer = %stream.peer(), ?status, "rejected websocket");
            let _ = stream.close();
            return;
        }

        // From here on, the connection speaks the WebSocket protocol
        debug!(peer = %stream.peer(), path = %req.path, "upgraded websocket");
        let socket = tungstenite::WebSocket::from_raw_socket(
            stream,
            Role::Server,
            Some(self.config.clone()),
        );
        (self.handler)(socket);
    }
}

// ----------------------------------------------------------------------------

impl<F> fmt::Debug for WebSocket<F> {
    /// Formats the upgrade for debugging.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocket")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Computes the accept key for the given client key.
///
/// This follows RFC 6455, Section 4.2.2: the client key is concatenated with
/// the protocol's GUID, hashed with SHA-1, and encoded as Base64.
///
/// # Examples
///
/// ```
/// use quay_serve::upgrade::accept_key;
///
/// // Compute accept key for the sample key of RFC 6455
/// let key = accept_key("dGhlIHNhbXBsZSBub25jZQ==");
/// assert_eq!(key, "s3pPLMBiTxaQ9kYGJzzhZRbK+xOo=");
/// ```
pub fn accept_key<K>(key: K) -> String
where
    K: AsRef<[u8]>,
{
    let mut hasher = Sha1::new();
    hasher.update(key.as_ref());
    hasher.update(GUID);
    BASE64_STANDARD.encode(hasher.digest().bytes())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn upgrade() -> WebSocket<()> {
        WebSocket { handler: (), config: WebSocketConfig::default() }
    }

    fn request() -> Request {
        Request::new()
            .method(Method::Get)
            .header(Header::Connection, "keep-alive, Upgrade")
            .header(Header::Upgrade, "WebSocket")
            .header(Header::SecWebSocketKey, "dGhlIHNhbXBsZSBub25jZQ==")
            .header(Header::SecWebSocketVersion, "13")
    }

    #[test]
    fn accepts_valid_handshake() {
        let res = upgrade().handshake(&request()).unwrap();
        assert_eq!(res.status, Some(Status::SwitchingProtocols));
        assert_eq!(res.headers.get(Header::Connection), Some("Upgrade"));
    }

    #[test]
    fn rejects_other_protocols() {
        let req = request().header(Header::Upgrade, "h2c");
        let res = upgrade().handshake(&req).unwrap_err();
        assert_eq!(res.status, Some(Status::BadRequest));
    }

    #[test]
    fn rejects_other_methods() {
        let req = request().method(Method::Post);
        let res = upgrade().handshake(&req).unwrap_err();
        assert_eq!(res.status, Some(Status::BadRequest));
    }

    #[test]
    fn rejects_missing_key() {
        let mut req = request();
        req.headers.remove(Header::SecWebSocketKey);
        let res = upgrade().handshake(&req).unwrap_err();
        assert_eq!(res.status, Some(Status::BadRequest));
    }

    #[test]
    fn requires_version_13() {
        let req = request().header(Header::SecWebSocketVersion, "8");
        let res = upgrade().handshake(&req).unwrap_err();
        assert_eq!(res.status, Some(Status::UpgradeRequired));
        assert_eq!(res.headers.get(Header::SecWebSocketVersion), Some("13"));
    }
}
