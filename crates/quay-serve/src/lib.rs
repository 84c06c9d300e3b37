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

//! Socket server with an HTTP layer.
//!
//! The server accepts connections on any number of plain TCP, TLS and Unix
//! domain socket listeners at once, and hands every connection to a service,
//! either on its own thread or sequentially on the accepting thread. The HTTP
//! layer is such a service, answering a single request per connection with
//! static files, cross-origin support and optional protocol upgrades.
//!
//! Like the rest of the crate, the server is implemented with sync Rust, so
//! it doesn't depend on an async runtime. Listeners are multiplexed through
//! their file descriptors, which is why only unix platforms are supported.

#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]

#[cfg(not(unix))]
compile_error!("quay-serve only supports unix platforms");

pub mod http;
pub mod router;
pub mod server;
pub mod socket;
pub mod upgrade;
