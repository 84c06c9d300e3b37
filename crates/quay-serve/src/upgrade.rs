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

//! Protocol upgrades.
//!
//! When a request asks for a protocol switch through the `Upgrade` header, and
//! an [`Upgrade`] is linked to the [`Http`][] service, the connection is handed
//! over to it together with the parsed request. From then on, the upgrade owns
//! the connection, and the HTTP layer doesn't touch it anymore.
//!
//! [`Http`]: crate::http::Http

use crate::http::Request;
use crate::socket::Stream;

mod websocket;

pub use websocket::{accept_key, WebSocket};

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Protocol upgrade.
///
/// Implementors take over a connection after the HTTP layer detected a request
/// for a protocol switch. They're responsible for answering the request, which
/// includes rejecting it, as the HTTP layer won't write anything on their
/// behalf. Closures with a matching signature are upgrades, too.
///
/// # Examples
///
/// ```
/// use std::io::Write;
/// use quay_serve::http::{Http, Request};
/// use quay_serve::socket::Stream;
///
/// // Create service that refuses all upgrades
/// let http = Http::new().upgrade(|_req: Request, mut stream: Stream| {
///     let _ = stream.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n");
/// });
/// ```
pub trait Upgrade: Send + Sync + 'static {
    /// Takes over the connection of the given request.
    fn take_over(&self, req: Request, stream: Stream);
}

// ----------------------------------------------------------------------------
// Blanket implementations
// ----------------------------------------------------------------------------

impl<F> Upgrade for F
where
    F: Fn(Request, Stream) + Send + Sync + 'static,
{
    #[inline]
    fn take_over(&self, req: Request, stream: Stream) {
        self(req, stream);
    }
}
