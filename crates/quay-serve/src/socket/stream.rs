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

//! Accepted connection.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::os::unix::net::UnixStream;
use std::time::{Duration, Instant};

#[cfg(feature = "tls")]
use rustls::{ServerConnection, StreamOwned};

use super::{Address, Kind};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Maximum time spent discarding unread input when closing.
const LINGER: Duration = Duration::from_secs(2);

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Stream transport.
enum Transport {
    /// Plain TCP stream.
    Plain(TcpStream),
    /// TLS session over a TCP stream.
    #[cfg(feature = "tls")]
    Secure(Box<StreamOwned<ServerConnection, TcpStream>>),
    /// Unix domain socket stream.
    Local(UnixStream),
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Accepted connection.
///
/// Streams are blocking, opaque byte streams, regardless of the underlying
/// transport. For TLS streams, the handshake is driven implicitly by the first
/// read or write, or explicitly through [`Stream::handshake`], which is useful
/// to tell handshake failures apart from protocol errors.
///
/// A stream is exclusively owned by the handler processing it, and dropping
/// it closes the connection. Use [`Stream::close`] to close it gracefully.
pub struct Stream {
    /// Stream transport.
    inner: Transport,
    /// Peer address.
    peer: Address,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Stream {
    /// Creates a plain TCP stream.
    pub(crate) fn plain(socket: TcpStream, peer: Address) -> Self {
        Self { inner: Transport::Plain(socket), peer }
    }

    /// Creates a TLS stream.
    #[cfg(feature = "tls")]
    pub(crate) fn secure(
        session: StreamOwned<ServerConnection, TcpStream>, peer: Address,
    ) -> Self {
        Self {
            inner: Transport::Secure(Box::new(session)),
            peer,
        }
    }

    /// Creates a Unix domain socket stream.
    pub(crate) fn local(socket: UnixStream, peer: Address) -> Self {
        Self { inner: Transport::Local(socket), peer }
    }

    /// Returns the peer address.
    #[must_use]
    pub fn peer(&self) -> &Address {
        &self.peer
    }

    /// Returns the transport kind.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match &self.inner {
            Transport::Plain(_) => Kind::Plain,
            #[cfg(feature = "tls")]
            Transport::Secure(_) => Kind::Secure,
            Transport::Local(_) => Kind::Local,
        }
    }

    /// Sets the read and write timeout of the stream.
    ///
    /// Blocking reads and writes that exceed the timeout fail with an error,
    /// which is what keeps a stalled peer from occupying a handler forever.
    pub fn set_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match &self.inner {
            Transport::Plain(socket) => {
                socket.set_read_timeout(timeout)?;
                socket.set_write_timeout(timeout)
            }
            #[cfg(feature = "tls")]
            Transport::Secure(session) => {
                session.sock.set_read_timeout(timeout)?;
                session.sock.set_write_timeout(timeout)
            }
            Transport::Local(socket) => {
                socket.set_read_timeout(timeout)?;
                socket.set_write_timeout(timeout)
            }
        }
    }

    /// Completes the TLS handshake, if the stream is secure.
    ///
    /// This is a no-op for plain and local streams, as well as for secure
    /// streams that already finished the handshake.
    pub fn handshake(&mut self) -> io::Result<()> {
        #[cfg(feature = "tls")]
        if let Transport::Secure(session) = &mut self.inner {
            let StreamOwned { conn, sock, .. } = session.as_mut();
            while conn.is_handshaking() {
                conn.complete_io(sock)?;
            }
        }
        Ok(())
    }

    /// Closes the stream gracefully.
    ///
    /// Secure streams send a close notification first. Afterwards, the write
    /// half is shut down, so the peer observes the end of the stream even if
    /// it still holds a reference to the underlying socket. Input the peer
    /// sent, but which was never read, is discarded until the peer closes its
    /// side, or for at most two seconds, as closing a socket with unread input
    /// resets the connection.
    pub fn close(mut self) -> io::Result<()> {
        self.flush()?;
        let res = match &mut self.inner {
            Transport::Plain(socket) => socket.shutdown(Shutdown::Write),
            #[cfg(feature = "tls")]
            Transport::Secure(session) => {
                let StreamOwned { conn, sock, .. } = session.as_mut();
                conn.send_close_notify();
                while conn.wants_write() {
                    conn.write_tls(sock)?;
                }
                sock.shutdown(Shutdown::Write)
            }
            Transport::Local(socket) => socket.shutdown(Shutdown::Write),
        };

        // The peer might have closed the connection already, which is fine
        match res {
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
            Ok(()) => {
                self.linger(LINGER);
                Ok(())
            }
            res => res,
        }
    }

    /// Discards unread input until the peer closes its side, or the timeout
    /// elapses. Input is read from the underlying socket, bypassing TLS.
    fn linger(&mut self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        let mut buffer = [0; 8192];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }
            let res = match &mut self.inner {
                Transport::Plain(socket) => socket
                    .set_read_timeout(Some(remaining))
                    .and_then(|()| socket.read(&mut buffer)),
                #[cfg(feature = "tls")]
                Transport::Secure(session) => session
                    .sock
                    .set_read_timeout(Some(remaining))
                    .and_then(|()| session.sock.read(&mut buffer)),
                Transport::Local(socket) => socket
                    .set_read_timeout(Some(remaining))
                    .and_then(|()| socket.read(&mut buffer)),
            };
            match res {
                Ok(0) => return,
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(_) => return,
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Transport::Plain(socket) => socket.read(buf),
            #[cfg(feature = "tls")]
            Transport::Secure(session) => session.read(buf),
            Transport::Local(socket) => socket.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            Transport::Plain(socket) => socket.write(buf),
            #[cfg(feature = "tls")]
            Transport::Secure(session) => session.write(buf),
            Transport::Local(socket) => socket.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            Transport::Plain(socket) => socket.flush(),
            #[cfg(feature = "tls")]
            Transport::Secure(session) => session.flush(),
            Transport::Local(socket) => socket.flush(),
        }
    }
}

// ----------------------------------------------------------------------------

impl fmt::Debug for Stream {
    /// Formats the stream for debugging.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("kind", &self.kind())
            .field("peer", &self.peer)
            .finish()
    }
}
