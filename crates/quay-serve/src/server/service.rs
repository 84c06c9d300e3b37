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

//! Connection service.

use crate::socket::Stream;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Connection service.
///
/// Services are the single extension point of a [`Server`][]: every accepted
/// connection is handed to [`Service::serve`], which owns the stream for the
/// rest of its lifetime. Once the method returns, the stream is dropped, and
/// thus closed, and the connection no longer counts as live.
///
/// Services are shared between all handler threads, which is why they must be
/// [`Send`] and [`Sync`]. Any state mutated by several connections must be
/// synchronized by the service itself.
///
/// [`Server`]: crate::server::Server
///
/// # Examples
///
/// ```
/// use std::io::Write;
/// use quay_serve::server::Service;
/// use quay_serve::socket::Stream;
///
/// // Define service greeting every peer
/// struct Greeter;
///
/// // Create service implementation
/// impl Service for Greeter {
///     fn serve(&self, mut stream: Stream) {
///         let _ = stream.write_all(b"hello\n");
///     }
/// }
/// ```
pub trait Service: Send + Sync + 'static {
    /// Serves the given connection.
    ///
    /// This method must be infallible: failures are confined to the given
    /// connection and must be handled, e.g., by logging them.
    fn serve(&self, stream: Stream);
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Service that closes every connection right away.
#[derive(Clone, Copy, Debug, Default)]
pub struct Idle;

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Service for Idle {
    #[inline]
    fn serve(&self, _stream: Stream) {}
}

// ----------------------------------------------------------------------------
// Blanket implementations
// ----------------------------------------------------------------------------

impl<F> Service for F
where
    F: Fn(Stream) + Send + Sync + 'static,
{
    #[inline]
    fn serve(&self, stream: Stream) {
        self(stream);
    }
}
