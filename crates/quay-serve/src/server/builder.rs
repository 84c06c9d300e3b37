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

//! Server builder.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{Dispatch, Error, POLL_TIMEOUT, Result, Server, Service};

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Listener to bind.
#[derive(Debug, PartialEq, Eq)]
enum Endpoint {
    /// Plain TCP listener.
    Plain(SocketAddr),
    /// TLS listener.
    Secure(SocketAddr),
    /// Unix domain socket listener.
    Local(PathBuf),
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Server builder.
pub struct Builder<S> {
    /// Connection service.
    service: S,
    /// Listeners to bind.
    endpoints: Vec<Endpoint>,
    /// Paths to certificate and private key.
    credentials: Option<(PathBuf, PathBuf)>,
    /// Dispatch mode.
    dispatch: Dispatch,
    /// Timeout for waiting across listeners.
    timeout: Duration,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<S> Builder<S>
where
    S: Service,
{
    /// Creates a server builder.
    ///
    /// Note that the canonical way to create a [`Builder`] is to invoke the
    /// [`Server::builder`] method. If listeners need to be added after the
    /// server was created, use [`Server::new`] and the bind methods.
    ///
    /// # Examples
    ///
    /// ```
    /// use quay_serve::server::{Builder, Idle};
    ///
    /// // Create server builder
    /// let builder = Builder::new(Idle);
    /// ```
    #[must_use]
    pub fn new(service: S) -> Self {
        Self {
            service,
            endpoints: Vec::new(),
            credentials: None,
            dispatch: Dispatch::default(),
            timeout: POLL_TIMEOUT,
        }
    }

    /// Adds a plain TCP listener for every address the given one resolves to.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use quay_serve::server::{Builder, Idle};
    ///
    /// // Create server builder and add address
    /// let builder = Builder::new(Idle).bind("127.0.0.1:8080")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn bind<A>(self, addr: A) -> Result<Self>
    where
        A: ToSocketAddrs,
    {
        self.resolve(addr, Endpoint::Plain)
    }

    /// Adds a TLS listener for every address the given one resolves to.
    pub fn bind_secure<A>(self, addr: A) -> Result<Self>
    where
        A: ToSocketAddrs,
    {
        self.resolve(addr, Endpoint::Secure)
    }

    /// Adds a Unix domain socket listener.
    #[must_use]
    pub fn bind_local<P>(mut self, path: P) -> Self
    where
        P: AsRef<Path>,
    {
        let endpoint = Endpoint::Local(path.as_ref().to_path_buf());
        if !self.endpoints.contains(&endpoint) {
            self.endpoints.push(endpoint);
        }
        self
    }

    /// Sets the paths to the PEM encoded certificate and private key.
    #[must_use]
    pub fn credentials<C, K>(mut self, cert: C, key: K) -> Self
    where
        C: AsRef<Path>,
        K: AsRef<Path>,
    {
        let cert = cert.as_ref().to_path_buf();
        self.credentials = Some((cert, key.as_ref().to_path_buf()));
        self
    }

    /// Sets the dispatch mode.
    #[must_use]
    pub fn dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Sets the timeout for waiting across listeners.
    ///
    /// The timeout bounds how long readiness notifications can go unnoticed,
    /// as all listeners are swept whenever it elapses.
    #[must_use]
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Creates the server and binds all configured listeners.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::NoListener`], if no listener was added,
    /// and otherwise the first error that occurs when binding listeners or
    /// applying credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use quay_serve::server::{Builder, Idle, State};
    ///
    /// // Create server builder and bind to address
    /// let server = Builder::new(Idle)
    ///     .bind("127.0.0.1:0")?
    ///     .listen()?;
    /// assert_eq!(server.state(), State::Bound);
    /// # Ok(())
    /// # }
    /// ```
    pub fn listen(self) -> Result<Server<S>> {
        if self.endpoints.is_empty() {
            return Err(Error::NoListener);
        }

        // Create server, then bind all listeners in the order they were added
        let server =
            Server::with_options(self.service, self.dispatch, self.timeout);
        for endpoint in self.endpoints {
            match endpoint {
                Endpoint::Plain(addr) => server.bind(addr)?,
                Endpoint::Secure(addr) => server.bind_secure(addr)?,
                Endpoint::Local(path) => server.bind_local(path)?,
            }
        }

        // Apply credentials after binding, so they reach all listeners
        if let Some((cert, key)) = self.credentials {
            server.use_credentials(cert, key)?;
        }
        Ok(server)
    }

    /// Adds endpoints for every address the given one resolves to.
    fn resolve<A, F>(mut self, addr: A, f: F) -> Result<Self>
    where
        A: ToSocketAddrs,
        F: Fn(SocketAddr) -> Endpoint,
    {
        // The underlying system call might return the same socket address
        // multiple times, which is why we need to deduplicate them
        for addr in addr.to_socket_addrs()? {
            let endpoint = f(addr);
            if !self.endpoints.contains(&endpoint) {
                self.endpoints.push(endpoint);
            }
        }
        Ok(self)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::super::Idle;
    use super::*;

    #[test]
    fn rejects_empty_builder() {
        let res = Builder::new(Idle).listen();
        assert!(matches!(res, Err(Error::NoListener)));
    }

    #[test]
    fn deduplicates_addresses() {
        let builder = Builder::new(Idle)
            .bind("127.0.0.1:8080")
            .and_then(|builder| builder.bind("127.0.0.1:8080"))
            .unwrap();
        assert_eq!(builder.endpoints.len(), 1);
    }

    #[test]
    fn binds_deduplicated_listeners() {
        let server = Builder::new(Idle)
            .bind("127.0.0.1:0")
            .and_then(|builder| builder.bind("127.0.0.1:0"))
            .and_then(Builder::listen)
            .unwrap();
        assert_eq!(server.local_addrs().len(), 1);
    }
}
