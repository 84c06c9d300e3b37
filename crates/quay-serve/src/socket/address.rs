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

//! Socket address.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Socket address.
///
/// Listeners and streams can either live in the internet domain, or in the
/// Unix domain, which is why addresses need to be able to represent both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Address {
    /// Internet socket address.
    Inet(SocketAddr),
    /// Unix domain socket path, empty for unnamed peers.
    Local(PathBuf),
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Address {
    /// Returns the internet socket address, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use quay_serve::socket::Address;
    ///
    /// // Create address and obtain internet socket address
    /// let addr = Address::Inet("127.0.0.1:8000".parse().unwrap());
    /// assert_eq!(addr.as_inet().map(|addr| addr.port()), Some(8000));
    /// ```
    #[must_use]
    pub fn as_inet(&self) -> Option<SocketAddr> {
        match self {
            Address::Inet(addr) => Some(*addr),
            Address::Local(_) => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl From<SocketAddr> for Address {
    #[inline]
    fn from(addr: SocketAddr) -> Self {
        Address::Inet(addr)
    }
}

// ----------------------------------------------------------------------------

impl fmt::Display for Address {
    /// Formats the address for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Inet(addr) => addr.fmt(f),
            Address::Local(path) if path.as_os_str().is_empty() => {
                f.write_str("unix:(unnamed)")
            }
            Address::Local(path) => write!(f, "unix:{}", path.display()),
        }
    }
}
