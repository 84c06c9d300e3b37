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

//! HTTP service.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use crate::server::Service;
use crate::socket::Stream;
use crate::upgrade::Upgrade;

use super::component::{Method, Status};
use super::cors::Cors;
use super::files::StaticFiles;
use super::handler::{Handler, Static};
use super::request::Request;
use super::response::{Response, ResponseExt};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Default read and write timeout of connections.
pub const TIMEOUT: Duration = Duration::from_secs(30);

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP service.
///
/// This service implements a single request/response exchange per connection:
/// it reads and parses one request, lets the [`Handler`] fill in a response,
/// writes it, and closes the connection. Requests that can't be parsed are
/// answered with the status matching the problem, e.g., "400 Bad Request".
///
/// With cross-origin support enabled, preflights, as well as requests using a
/// method that is not advertised, are answered right away without involving
/// the handler, and all other responses carry the cross-origin headers.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use quay_serve::http::Http;
/// use quay_serve::server::Server;
///
/// // Create service serving static files with cross-origin support
/// let http = Http::new()
///     .root("public")
///     .cors(true)
///     .mime("dae", "model/vnd.collada+xml");
///
/// // Create server and bind to an ephemeral port
/// let server = Server::new(http);
/// server.bind("127.0.0.1:0")?;
/// # Ok(())
/// # }
/// ```
pub struct Http<H = Static> {
    /// Request handler.
    handler: H,
    /// Static files.
    files: StaticFiles,
    /// Cross-origin support.
    cors: Cors,
    /// Linked protocol upgrade.
    upgrade: Option<Box<dyn Upgrade>>,
    /// Read and write timeout.
    timeout: Option<Duration>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Http {
    /// Creates an HTTP service serving static files.
    ///
    /// Files are served from the current working directory, until another
    /// root is set with [`Http::root`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_handler(Static)
    }
}

impl<H> Http<H>
where
    H: Handler,
{
    /// Creates an HTTP service with the given handler.
    pub fn with_handler(handler: H) -> Self {
        Self {
            handler,
            files: StaticFiles::new("."),
            cors: Cors::default(),
            upgrade: None,
            timeout: Some(TIMEOUT),
        }
    }

    /// Sets the root directory for static files.
    #[must_use]
    pub fn root<P>(mut self, root: P) -> Self
    where
        P: Into<PathBuf>,
    {
        self.files.set_root(root);
        self
    }

    /// Sets the index file name for directories.
    #[must_use]
    pub fn index<S>(mut self, index: S) -> Self
    where
        S: Into<String>,
    {
        self.files.set_index(index);
        self
    }

    /// Registers a content type for the given file extension.
    #[must_use]
    pub fn mime<E, T>(mut self, ext: E, mime: T) -> Self
    where
        E: AsRef<str>,
        T: Into<String>,
    {
        self.files.mime_mut().register(ext, mime);
        self
    }

    /// Enables or disables cross-origin support.
    #[must_use]
    pub fn cors(mut self, enabled: bool) -> Self {
        self.cors = self.cors.enable(enabled);
        self
    }

    /// Adds a method to the methods advertised for cross-origin requests.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.cors = self.cors.method(method);
        self
    }

    /// Adds a header to the headers allowed in cross-origin requests.
    #[must_use]
    pub fn allow_header<S>(mut self, name: S) -> Self
    where
        S: AsRef<str>,
    {
        self.cors = self.cors.header(name);
        self
    }

    /// Links the given protocol upgrade.
    #[must_use]
    pub fn upgrade<U>(mut self, upgrade: U) -> Self
    where
        U: Upgrade,
    {
        self.upgrade = Some(Box::new(upgrade));
        self
    }

    /// Sets the read and write timeout of connections.
    ///
    /// Passing `None` disables the timeout, which allows a stalled peer to
    /// occupy a handler indefinitely.
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the request handler.
    #[inline]
    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Returns the static files.
    #[inline]
    #[must_use]
    pub fn files(&self) -> &StaticFiles {
        &self.files
    }

    /// Returns the cross-origin support.
    #[inline]
    #[must_use]
    pub fn cors_config(&self) -> &Cors {
        &self.cors
    }

    /// Creates the response for the given request.
    ///
    /// This is the part of the exchange that doesn't involve the connection,
    /// which makes it possible to test handlers without sockets.
    ///
    /// # Examples
    ///
    /// ```
    /// use quay_serve::http::{Header, Http, Method, Request, Status};
    ///
    /// // Create service with cross-origin support
    /// let http = Http::new().cors(true);
    ///
    /// // Preflights are answered without involving the handler
    /// let req = Request::new().method(Method::Options).uri("/api");
    /// let res = http.respond(&req);
    /// assert_eq!(res.status, Some(Status::NoContent));
    /// assert_eq!(
    ///     res.headers.get(Header::AccessControlAllowOrigin),
    ///     Some("*"),
    /// );
    /// ```
    #[must_use]
    pub fn respond(&self, req: &Request) -> Response {
        if self.cors.is_enabled()
            && (req.method == Method::Options || !self.cors.allows(req.method))
        {
            return self.cors.preflight();
        }

        // Let the handler fill in the response, defaulting to "404 Not Found"
        // if it didn't assign a status
        let mut res = Response::new();
        self.handler.serve(req, &mut res, &self.files);
        if !res.is_set() {
            res.status = Some(Status::NotFound);
        }
        self.decorate(&mut res);
        res
    }

    /// Adds cross-origin headers to the given response, if enabled.
    fn decorate(&self, res: &mut Response) {
        if self.cors.is_enabled() {
            self.cors.apply(res);
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<H> Service for Http<H>
where
    H: Handler,
{
    /// Serves the given connection.
    fn serve(&self, mut stream: Stream) {
        let peer = stream.peer().clone();
        let res = stream.set_timeout(self.timeout);
        if let Err(err) = res.and_then(|()| stream.handshake()) {
            warn!(%peer, "could not establish connection: {err}");
            return;
        }

        // Read and parse request, answering with the matching status if the
        // request is invalid, and giving up if the connection failed
        let req = match Request::read_from(&mut stream) {
            Ok(req) => req,
            Err(err) => {
                let Some(status) = err.status() else {
                    debug!(%peer, "could not read request: {err}");
                    return;
                };
                debug!(%peer, status = status.code(), "invalid request: {err}");
                let mut res = Response::from_status(status);
                self.decorate(&mut res);
                write(stream, res, false);
                return;
            }
        };

        // Hand off connection, if the request asks for an upgrade - the
        // timeout only applies to the exchange, not to the upgraded protocol
        if req.is_upgrade() {
            if let Some(upgrade) = &self.upgrade {
                if let Err(err) = stream.set_timeout(None) {
                    warn!(%peer, "could not hand off connection: {err}");
                    return;
                }
                debug!(%peer, path = %req.path, "handing off upgrade");
                upgrade.take_over(req, stream);
                return;
            }
        }

        // Create and write response
        let res = self.respond(&req);
        debug!(
            method = %req.method,
            path = %req.path,
            status = res.status.as_ref().map_or(0, Status::code),
            %peer,
            "served request"
        );
        write(stream, res, req.method == Method::Head);
    }
}

// ----------------------------------------------------------------------------

impl Default for Http {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<H> fmt::Debug for Http<H> {
    /// Formats the service for debugging.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Http")
            .field("files", &self.files)
            .field("cors", &self.cors)
            .field("upgrade", &self.upgrade.is_some())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Writes the response to the stream and closes it.
fn write(mut stream: Stream, res: Response, head_only: bool) {
    let peer = stream.peer().clone();
    let res = res
        .write_to(&mut stream, head_only)
        .and_then(|()| stream.close());
    if let Err(err) = res {
        warn!(%peer, "could not write response: {err}");
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::http::Header;

    fn counting() -> (Arc<AtomicUsize>, impl Handler) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler =
            move |_: &Request, res: &mut Response, _: &StaticFiles| {
                counter.fetch_add(1, Ordering::SeqCst);
                *res = Response::from_text("handled");
            };
        (calls, handler)
    }

    #[test]
    fn substitutes_not_found_for_unset_status() {
        let http = Http::with_handler(
            |_: &Request, res: &mut Response, _: &StaticFiles| {
                res.headers.insert("X-Seen", "yes");
            },
        );
        let res = http.respond(&Request::new());
        assert_eq!(res.status, Some(Status::NotFound));
        assert_eq!(res.headers.get("x-seen"), Some("yes"));
    }

    #[test]
    fn preflight_bypasses_handler() {
        let (calls, handler) = counting();
        let http = Http::with_handler(handler).cors(true);
        let req = Request::new().method(Method::Options).uri("/api");
        let res = http.respond(&req);
        assert_eq!(res.status, Some(Status::NoContent));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn options_reaches_handler_without_cors() {
        let (calls, handler) = counting();
        let http = Http::with_handler(handler);
        let req = Request::new().method(Method::Options).uri("/api");
        let res = http.respond(&req);
        assert_eq!(res.status, Some(Status::Ok));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!res.headers.contains(Header::AccessControlAllowOrigin));
    }

    #[test]
    fn answers_unadvertised_methods_with_preflight() {
        let (calls, handler) = counting();
        let http = Http::with_handler(handler).cors(true);
        let req = Request::new().method(Method::Put).uri("/api");
        assert_eq!(http.respond(&req).status, Some(Status::NoContent));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // Once advertised, the method reaches the handler
        let (calls, handler) = counting();
        let http = Http::with_handler(handler).cors(true).method(Method::Put);
        let res = http.respond(&req);
        assert_eq!(res.status, Some(Status::Ok));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            res.headers.get(Header::AccessControlAllowMethods),
            Some("GET, HEAD, POST, OPTIONS, PUT")
        );
    }

    #[test]
    fn decorates_handled_responses() {
        let (_, handler) = counting();
        let http = Http::with_handler(handler)
            .cors(true)
            .allow_header("X-Token");
        let res = http.respond(&Request::new());
        let origin = res.headers.get(Header::AccessControlAllowOrigin);
        assert_eq!(origin, Some("*"));
        assert!(
            res.headers
                .get(Header::AccessControlAllowHeaders)
                .is_some_and(|value| value.ends_with("X-Token"))
        );
    }

    #[test]
    fn serves_registered_mime_types() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scene.dae"), "<COLLADA/>").unwrap();
        std::fs::write(dir.path().join("blob.unknown"), "?").unwrap();
        let http = Http::new()
            .root(dir.path())
            .mime(".DAE", "model/vnd.collada+xml");

        // Registered extension
        let res = http.respond(&Request::new().uri("/scene.dae"));
        assert_eq!(
            res.headers.get(Header::ContentType),
            Some("model/vnd.collada+xml")
        );

        // Unknown extension
        let res = http.respond(&Request::new().uri("/blob.unknown"));
        assert_eq!(
            res.headers.get(Header::ContentType),
            Some("application/octet-stream")
        );
    }
}
