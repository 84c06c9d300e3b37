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

//! Request handler.

use super::files::StaticFiles;
use super::request::Request;
use super::response::Response;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Request handler.
///
/// Handlers implement the application logic of an [`Http`][] service. They
/// receive the parsed request and a response to fill in, as well as the static
/// files of the service, so they can fall back to serving files for requests
/// they don't recognize. A response whose status is left unset is answered
/// with "404 Not Found".
///
/// The default implementation serves static files, which is what [`Static`]
/// relies on. Closures with a matching signature are handlers, too.
///
/// [`Http`]: crate::http::Http
///
/// # Examples
///
/// ```
/// use quay_serve::http::{Http, Method, Request, Response, ResponseExt};
/// use quay_serve::http::StaticFiles;
///
/// // Create service answering requests for the API, serving files otherwise
/// let http = Http::with_handler(
///     |req: &Request, res: &mut Response, files: &StaticFiles| {
///         if let Some(id) = req.is(Method::Get, "/api/items/*") {
///             *res = Response::from_text(format!("item {id}"));
///         } else {
///             files.serve(req, res);
///         }
///     },
/// );
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Handles the given request.
    #[inline]
    fn serve(&self, req: &Request, res: &mut Response, files: &StaticFiles) {
        files.serve(req, res);
    }
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Handler that only serves static files.
#[derive(Clone, Copy, Debug, Default)]
pub struct Static;

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Handler for Static {}

// ----------------------------------------------------------------------------
// Blanket implementations
// ----------------------------------------------------------------------------

impl<F> Handler for F
where
    F: Fn(&Request, &mut Response, &StaticFiles) + Send + Sync + 'static,
{
    #[inline]
    fn serve(&self, req: &Request, res: &mut Response, files: &StaticFiles) {
        self(req, res, files);
    }
}
