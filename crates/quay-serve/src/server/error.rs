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

//! Server error.

use std::{io, result};
use thiserror::Error;

use crate::socket;

use super::State;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Server error.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Address unavailable or forbidden.
    #[error("could not bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: socket::Error,
    },

    /// Invalid certificate or private key.
    #[error("invalid credentials: {0}")]
    Credentials(String),

    /// Transport not compiled in or not available.
    #[error("unsupported bind kind: {0}")]
    Unsupported(&'static str),

    /// Server has no listener.
    #[error("no listener bound")]
    NoListener,

    /// Operation not allowed in the current state.
    #[error("operation not allowed while {0}")]
    State(State),

    /// Waiting across listeners failed, which stops the server.
    #[error("multiplexing failed: {0}")]
    Multiplex(#[source] io::Error),

    /// Shutdown did not finish in time.
    #[error("shutdown timed out")]
    Timeout,
}

// ----------------------------------------------------------------------------
// Type aliases
// ----------------------------------------------------------------------------

/// Server result.
pub type Result<T = ()> = result::Result<T, Error>;
