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

//! TLS listener and credentials.

use rustls::crypto::ring;
use rustls::{ServerConfig, ServerConnection, StreamOwned};
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::{fmt, fs, io};

use super::{Address, Error, Result, Stream};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Certificate chain and private key.
///
/// Credentials are parsed and validated once, and can then be shared among
/// any number of [`SecureListener`] instances, as they only hold a reference
/// to the resulting server configuration.
///
/// # Examples
///
/// ```
/// use quay_serve::socket::Credentials;
///
/// // Parsing garbage fails with a descriptive error
/// let res = Credentials::from_pem(b"not a certificate", b"not a key");
/// assert!(res.is_err());
/// ```
#[derive(Clone)]
pub struct Credentials {
    /// Server configuration.
    config: Arc<ServerConfig>,
}

/// TLS listener.
///
/// A TLS listener accepts TCP connections and wraps them into TLS sessions,
/// which requires credentials to be configured. Until then, every accepted
/// connection is dropped right away, so no handshake can succeed.
pub struct SecureListener {
    /// TCP listener.
    listener: TcpListener,
    /// Server configuration, if credentials were applied.
    config: RwLock<Option<Arc<ServerConfig>>>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Credentials {
    /// Creates credentials from a PEM encoded certificate chain and key.
    ///
    /// The key may be encoded as PKCS#8, PKCS#1 or SEC1. Only the first key
    /// found is used.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Credentials`], if the certificate chain is
    /// empty or malformed, no private key is found, or the key is rejected.
    pub fn from_pem(cert: &[u8], key: &[u8]) -> Result<Self> {
        let mut reader = cert;
        let chain = rustls_pemfile::certs(&mut reader)
            .collect::<io::Result<Vec<_>>>()
            .map_err(|err| invalid(format!("certificate: {err}")))?;
        if chain.is_empty() {
            return Err(invalid("no certificate found"));
        }

        // Extract the first private key, regardless of its encoding
        let mut reader = key;
        let key = rustls_pemfile::private_key(&mut reader)
            .map_err(|err| invalid(format!("private key: {err}")))?
            .ok_or_else(|| invalid("no private key found"))?;

        // Build server configuration with the ring crypto provider, which is
        // also where a key that doesn't fit the certificate is rejected
        let provider = Arc::new(ring::default_provider());
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|err| invalid(err.to_string()))?
            .with_no_client_auth()
            .with_single_cert(chain, key)
            .map_err(|err| invalid(err.to_string()))?;

        // Return credentials
        Ok(Self { config: Arc::new(config) })
    }

    /// Creates credentials from PEM files.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Credentials`], if either file can't be
    /// read, or if [`Credentials::from_pem`] fails.
    pub fn from_pem_files<C, K>(cert: C, key: K) -> Result<Self>
    where
        C: AsRef<Path>,
        K: AsRef<Path>,
    {
        let read = |path: &Path| {
            fs::read(path)
                .map_err(|err| invalid(format!("{}: {err}", path.display())))
        };
        Self::from_pem(&read(cert.as_ref())?, &read(key.as_ref())?)
    }
}

// ----------------------------------------------------------------------------

impl SecureListener {
    /// Creates a TLS listener bound to the given address.
    pub(crate) fn bind<A>(addr: A) -> Result<Self>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        Ok(Self { listener, config: RwLock::new(None) })
    }

    /// Applies the given credentials.
    ///
    /// Connections accepted afterwards use the new credentials, while already
    /// established sessions are not affected.
    pub fn configure(&self, credentials: &Credentials) {
        let mut config =
            self.config.write().unwrap_or_else(PoisonError::into_inner);
        *config = Some(Arc::clone(&credentials.config));
    }

    /// Returns whether credentials were applied.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Returns the address the listener is bound to.
    pub(crate) fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts a pending connection and starts a TLS session.
    ///
    /// The handshake itself is deferred to the first read or write, so that
    /// a slow peer can't hold up the thread accepting connections.
    pub(crate) fn accept(&self) -> Result<Stream> {
        let (socket, addr) = self.listener.accept()?;
        let config = self
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        // Without credentials, we can't start a session, so we just drop the
        // socket, which lets the handshake fail on the peer's side
        let Some(config) = config else {
            return Err(Error::NotConfigured);
        };

        // Create session over blocking socket
        socket.set_nonblocking(false)?;
        let session = ServerConnection::new(config)
            .map_err(|err| invalid(err.to_string()))?;
        Ok(Stream::secure(
            StreamOwned::new(session, socket),
            Address::Inet(addr),
        ))
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl AsRawFd for SecureListener {
    #[inline]
    fn as_raw_fd(&self) -> RawFd {
        self.listener.as_raw_fd()
    }
}

// ----------------------------------------------------------------------------

impl fmt::Debug for Credentials {
    /// Formats the credentials for debugging, omitting key material.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials")
    }
}

impl fmt::Debug for SecureListener {
    /// Formats the listener for debugging.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureListener")
            .field("addr", &self.listener.local_addr().ok())
            .field("configured", &self.is_configured())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Creates a credentials error.
fn invalid<S>(reason: S) -> Error
where
    S: Into<String>,
{
    Error::Credentials(reason.into())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
