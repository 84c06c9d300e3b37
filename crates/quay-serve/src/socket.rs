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

//! Transport sockets.
//!
//! A [`Listener`] is a bound, listening, non-blocking socket of one [`Kind`],
//! and a [`Stream`] is a connection accepted from it. Plain TCP, TLS over TCP
//! and Unix domain sockets are unified behind those two types, so the server
//! can multiplex and dispatch them without caring about the transport. The
//! only place where the transport matters is applying credentials, which is
//! done through the [`Listener::as_secure`] capability query.

use std::net::{TcpListener, ToSocketAddrs};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::{fmt, fs};

mod address;
mod error;
mod stream;
#[cfg(feature = "tls")]
mod tls;

pub use address::Address;
pub use error::{Error, Result};
pub use stream::Stream;
#[cfg(feature = "tls")]
pub use tls::{Credentials, SecureListener};

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Transport kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    /// Plain TCP.
    Plain,
    /// TLS over TCP.
    Secure,
    /// Unix domain socket.
    Local,
}

/// Listener implementation.
enum Inner {
    /// Plain TCP listener.
    Plain(TcpListener),
    /// TLS listener.
    #[cfg(feature = "tls")]
    Secure(SecureListener),
    /// Unix domain socket listener and the path it is bound to.
    Local(UnixListener, PathBuf),
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Listener.
///
/// Listeners are always put into non-blocking mode, as they are meant to be
/// registered with a poller and drained until [`Error::would_block`] holds.
/// Accepted streams, on the other hand, are always blocking.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use quay_serve::socket::{Kind, Listener};
///
/// // Create listener on an ephemeral port
/// let listener = Listener::plain("127.0.0.1:0")?;
/// assert_eq!(listener.kind(), Kind::Plain);
/// # Ok(())
/// # }
/// ```
pub struct Listener {
    /// Listener implementation.
    inner: Inner,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Listener {
    /// Creates a plain TCP listener bound to the given address.
    ///
    /// If the address resolves to several socket addresses, the first one
    /// that can be bound is used.
    pub fn plain<A>(addr: A) -> Result<Self>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        Ok(Self { inner: Inner::Plain(listener) })
    }

    /// Creates a TLS listener bound to the given address.
    ///
    /// The listener is created without credentials, which must be applied
    /// via [`SecureListener::configure`] before handshakes can succeed.
    #[cfg(feature = "tls")]
    pub fn secure<A>(addr: A) -> Result<Self>
    where
        A: ToSocketAddrs,
    {
        SecureListener::bind(addr)
            .map(|listener| Self { inner: Inner::Secure(listener) })
    }

    /// Creates a TLS listener bound to the given address.
    ///
    /// # Errors
    ///
    /// Secure transport was not compiled in, so this always returns
    /// [`Error::Unsupported`].
    #[cfg(not(feature = "tls"))]
    pub fn secure<A>(_addr: A) -> Result<Self>
    where
        A: ToSocketAddrs,
    {
        Err(Error::Unsupported("secure transport"))
    }

    /// Creates a Unix domain socket listener bound to the given path.
    ///
    /// A socket file left behind by a previous process is removed before
    /// binding, but any other kind of file at the path is left untouched and
    /// makes binding fail.
    pub fn local<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        if is_socket(path) {
            fs::remove_file(path)?;
        }

        // Bind and switch to non-blocking mode
        let listener = UnixListener::bind(path)?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            inner: Inner::Local(listener, path.to_path_buf()),
        })
    }

    /// Accepts a pending connection.
    ///
    /// # Errors
    ///
    /// When no connection is pending, an I/O error for which
    /// [`Error::would_block`] holds is returned. TLS listeners without
    /// credentials drop the connection and return [`Error::NotConfigured`].
    pub fn accept(&self) -> Result<Stream> {
        match &self.inner {
            Inner::Plain(listener) => {
                let (socket, addr) = listener.accept()?;
                socket.set_nonblocking(false)?;
                Ok(Stream::plain(socket, Address::Inet(addr)))
            }
            #[cfg(feature = "tls")]
            Inner::Secure(listener) => listener.accept(),
            Inner::Local(listener, _) => {
                let (socket, addr) = listener.accept()?;
                socket.set_nonblocking(false)?;
                let path = addr.as_pathname().map(Path::to_path_buf);
                let peer = Address::Local(path.unwrap_or_default());
                Ok(Stream::local(socket, peer))
            }
        }
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> Result<Address> {
        match &self.inner {
            Inner::Plain(listener) => {
                listener.local_addr().map(Address::Inet).map_err(Into::into)
            }
            #[cfg(feature = "tls")]
            Inner::Secure(listener) => {
                listener.local_addr().map(Address::Inet).map_err(Into::into)
            }
            Inner::Local(_, path) => Ok(Address::Local(path.clone())),
        }
    }

    /// Returns the transport kind.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match &self.inner {
            Inner::Plain(_) => Kind::Plain,
            #[cfg(feature = "tls")]
            Inner::Secure(_) => Kind::Secure,
            Inner::Local(..) => Kind::Local,
        }
    }

    /// Returns the TLS capability of the listener, if any.
    ///
    /// This is the only way to reach transport specific functionality, which
    /// right now is limited to applying credentials.
    #[cfg(feature = "tls")]
    #[must_use]
    pub fn as_secure(&self) -> Option<&SecureListener> {
        match &self.inner {
            Inner::Secure(listener) => Some(listener),
            _ => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl AsRawFd for Listener {
    /// Returns the raw file descriptor, used for registering with a poller.
    fn as_raw_fd(&self) -> RawFd {
        match &self.inner {
            Inner::Plain(listener) => listener.as_raw_fd(),
            #[cfg(feature = "tls")]
            Inner::Secure(listener) => listener.as_raw_fd(),
            Inner::Local(listener, _) => listener.as_raw_fd(),
        }
    }
}

impl Drop for Listener {
    /// Removes the socket file of Unix domain socket listeners.
    fn drop(&mut self) {
        if let Inner::Local(_, path) = &self.inner {
            let _ = fs::remove_file(path);
        }
    }
}

// ----------------------------------------------------------------------------

impl fmt::Debug for Listener {
    /// Formats the listener for debugging.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("kind", &self.kind())
            .field("addr", &self.local_addr().ok())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Returns whether the given path points to an existing socket file.
fn is_socket(path: &Path) -> bool {
    use std::os::unix::fs::FileTypeExt;
    fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_socket())
        .unwrap_or(false)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::os::unix::net::UnixStream;

    use super::*;

    #[test]
    fn accept_would_block_without_pending_connection() {
        let listener = Listener::plain("127.0.0.1:0").unwrap();
        let err = listener.accept().unwrap_err();
        assert!(err.would_block());
    }

    #[test]
    fn accept_yields_blocking_stream() {
        let listener = Listener::plain("127.0.0.1:0").unwrap();
        let Address::Inet(addr) = listener.local_addr().unwrap() else {
            panic!("expected inet address");
        };

        // Connect and wait until the connection is pending
        let mut client = TcpStream::connect(addr).unwrap();
        let mut stream = loop {
            match listener.accept() {
                Ok(stream) => break stream,
                Err(err) if err.would_block() => std::thread::yield_now(),
                Err(err) => panic!("{err}"),
            }
        };
        assert_eq!(stream.kind(), Kind::Plain);

        // Exchange some bytes in both directions
        client.write_all(b"ping").unwrap();
        let mut buf = [0; 4];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
        stream.write_all(b"pong").unwrap();
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[test]
    fn binding_same_port_twice_fails() {
        let listener = Listener::plain("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        assert!(Listener::plain(addr).is_err());
    }

    #[test]
    fn local_listener_replaces_stale_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quay.sock");
        drop(UnixListener::bind(&path).unwrap());
        assert!(path.exists());

        // Binding again must succeed, and the file is removed on drop
        let listener = Listener::local(&path).unwrap();
        assert_eq!(listener.kind(), Kind::Local);
        let _client = UnixStream::connect(&path).unwrap();
        drop(listener);
        assert!(!path.exists());
    }

    #[test]
    fn local_listener_keeps_regular_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quay.sock");
        fs::write(&path, "data").unwrap();
        assert!(Listener::local(&path).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "data");
    }
}
