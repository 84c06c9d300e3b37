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

//! HTTP layer.
//!
//! The HTTP layer turns a raw connection into a single request/response
//! exchange. [`Http`] implements [`Service`][], so it can be handed to a
//! [`Server`][] right away, and delegates application logic to a [`Handler`],
//! which serves static files unless told otherwise.
//!
//! [`Server`]: crate::server::Server
//! [`Service`]: crate::server::Service

pub mod component;
mod cors;
mod files;
mod handler;
mod headers;
mod layer;
mod mime;
pub mod request;
pub mod response;
pub mod route;

pub use component::{Header, Method, Status};
pub use cors::Cors;
pub use files::StaticFiles;
pub use handler::{Handler, Static};
pub use headers::Headers;
pub use layer::Http;
pub use mime::MimeTable;
pub use request::{Query, Request};
pub use response::{FileBody, Response, ResponseExt};
pub use route::RoutePattern;
