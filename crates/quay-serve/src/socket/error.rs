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

//! Socket error.

use std::{io, result};
use thiserror::Error;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Socket error.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Invalid certificate or private key.
    #[error("invalid credentials: {0}")]
    Credentials(String),

    /// Secure listener without credentials.
    #[error("no certificate and private key configured")]
    NotConfigured,

    /// Transport not compiled in or not available on this platform.
    #[error("unsupported bind kind: {0}")]
    Unsupported(&'static str),
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Error {
    /// Returns whether the error signals that the operation would block.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io;
    /// use quay_serve::socket::Error;
    ///
    /// // Create error and check for would block
    /// let err = Error::from(io::Error::from(io::ErrorKind::WouldBlock));
    /// assert!(err.would_block());
    /// ```
    #[must_use]
    pub fn would_block(&self) -> bool {
        matches!(
            self,
            Error::Io(err) if err.kind() == io::ErrorKind::WouldBlock
        )
    }

    /// Returns whether the error only affects a single connection.
    ///
    /// Such errors occur after a connection was taken from the listener's
    /// queue, e.g., when the peer went away, or a session couldn't be set up,
    /// so the listener can go on accepting. All other errors concern the
    /// listener itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io;
    /// use quay_serve::socket::Error;
    ///
    /// // Create error and check if it affects a single connection
    /// let err = Error::from(io::Error::from(io::ErrorKind::ConnectionReset));
    /// assert!(err.is_per_connection());
    /// ```
    #[must_use]
    pub fn is_per_connection(&self) -> bool {
        match self {
            Error::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::Interrupted
            ),
            Error::Credentials(_) | Error::NotConfigured => true,
            Error::Unsupported(_) => false,
        }
    }
}

// ----------------------------------------------------------------------------
// Type aliases
// ----------------------------------------------------------------------------

/// Socket result.
pub type Result<T = ()> = result::Result<T, Error>;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
