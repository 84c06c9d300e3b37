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

//! Socket server.
//!
//! The server owns a set of listeners of possibly different transport kinds,
//! multiplexes them in an accept loop, and dispatches every accepted stream
//! to its [`Service`]. In concurrent mode, which is the default, each stream
//! is served on its own thread, while in sequential mode, the loop thread
//! serves it inline before accepting the next one.
//!
//! Stopping the server only prevents new connections from being accepted.
//! Connections that were already accepted always run to completion, which
//! is why a graceful shutdown waits for the live-connection count to drop
//! to zero.

use mio::{Token, Waker};
use std::net::{SocketAddr, ToSocketAddrs};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::socket::{self, Address, Listener, Stream};

mod builder;
mod error;
mod poller;
mod service;
mod state;
mod tracker;

pub use builder::Builder;
pub use error::{Error, Result};
pub use service::{Idle, Service};
pub use state::State;
use poller::{Poller, Readiness};
use tracker::Tracker;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Default timeout for waiting across listeners.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(3);

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Dispatch mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Dispatch {
    /// Serve every connection on its own thread.
    #[default]
    Concurrent,
    /// Serve connections inline on the loop thread, one at a time.
    ///
    /// No further connections are accepted while one is being served, so
    /// this is only suitable for a single client, or for testing.
    Sequential,
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Socket server.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use quay_serve::server::{Idle, Server, State};
///
/// // Create server and bind to an ephemeral port
/// let server = Server::new(Idle);
/// server.bind("127.0.0.1:0")?;
/// assert_eq!(server.state(), State::Bound);
///
/// // Start server on its own thread, then shut it down gracefully
/// server.start()?;
/// assert_eq!(server.state(), State::Running);
/// server.shutdown();
/// assert_eq!(server.state(), State::Stopped);
/// # Ok(())
/// # }
/// ```
pub struct Server<S>
where
    S: Service,
{
    /// State shared with the loop thread and handler threads.
    shared: Arc<Shared<S>>,
    /// Loop thread, if started without blocking.
    thread: Mutex<Option<JoinHandle<()>>>,
}

/// State shared with the loop thread and handler threads.
struct Shared<S> {
    /// Connection service.
    service: S,
    /// Dispatch mode.
    dispatch: Dispatch,
    /// Timeout for waiting across listeners.
    timeout: Duration,
    /// Listener set.
    listeners: RwLock<Vec<Arc<Listener>>>,
    /// Server state.
    state: Mutex<State>,
    /// Condition variable signalled on state changes.
    changed: Condvar,
    /// Live-connection tracker.
    tracker: Arc<Tracker>,
    /// Last error message.
    error: Mutex<Option<String>>,
    /// Waker of the running accept loop.
    waker: Mutex<Option<Arc<Waker>>>,
    /// Credentials applied to secure listeners.
    #[cfg(feature = "tls")]
    credentials: Mutex<Option<socket::Credentials>>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<S> Server<S>
where
    S: Service,
{
    /// Creates a server.
    ///
    /// The server starts without listeners, dispatches concurrently, and uses
    /// the default [`POLL_TIMEOUT`]. Use [`Server::builder`] to configure it.
    ///
    /// # Examples
    ///
    /// ```
    /// use quay_serve::server::{Idle, Server, State};
    ///
    /// // Create server
    /// let server = Server::new(Idle);
    /// assert_eq!(server.state(), State::Created);
    /// ```
    #[must_use]
    pub fn new(service: S) -> Self {
        Self::with_options(service, Dispatch::default(), POLL_TIMEOUT)
    }

    /// Creates a server builder.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use quay_serve::server::{Dispatch, Idle, Server};
    ///
    /// // Create server from builder
    /// let server = Server::builder(Idle)
    ///     .dispatch(Dispatch::Sequential)
    ///     .bind("127.0.0.1:0")?
    ///     .listen()?;
    /// # Ok(())
    /// # }
    /// ```
    #[inline]
    pub fn builder(service: S) -> Builder<S> {
        Builder::new(service)
    }

    /// Creates a server with the given options.
    pub(crate) fn with_options(
        service: S, dispatch: Dispatch, timeout: Duration,
    ) -> Self {
        let shared = Shared {
            service,
            dispatch,
            timeout,
            listeners: RwLock::default(),
            state: Mutex::new(State::Created),
            changed: Condvar::new(),
            tracker: Arc::default(),
            error: Mutex::default(),
            waker: Mutex::default(),
            #[cfg(feature = "tls")]
            credentials: Mutex::default(),
        };
        Self {
            shared: Arc::new(shared),
            thread: Mutex::default(),
        }
    }

    /// Binds a plain TCP listener to the given address.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Bind`], if the address is unavailable or
    /// forbidden, in which case no listener is added and [`Server::error`]
    /// contains the reason. While running, [`Error::State`] is returned.
    pub fn bind<A>(&self, addr: A) -> Result
    where
        A: ToSocketAddrs,
    {
        let addrs = self.shared.resolve(addr)?;
        self.shared.add(&describe(&addrs), || Listener::plain(&addrs[..]))
    }

    /// Binds a TLS listener to the given address.
    ///
    /// Credentials that were applied before are applied to the new listener
    /// as well. Until credentials are applied, no handshake can succeed.
    ///
    /// # Errors
    ///
    /// In addition to the errors of [`Server::bind`], this method returns
    /// [`Error::Unsupported`], if secure transport was not compiled in.
    pub fn bind_secure<A>(&self, addr: A) -> Result
    where
        A: ToSocketAddrs,
    {
        let addrs = self.shared.resolve(addr)?;
        self.shared.add(&describe(&addrs), || Listener::secure(&addrs[..]))
    }

    /// Binds a Unix domain socket listener to the given path.
    ///
    /// # Errors
    ///
    /// This method returns the same errors as [`Server::bind`].
    pub fn bind_local<P>(&self, path: P) -> Result
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let addr = Address::Local(path.to_path_buf()).to_string();
        self.shared.add(&addr, || Listener::local(path))
    }

    /// Applies the certificate and private key from the given PEM files to
    /// every secure listener.
    ///
    /// Non-secure listeners are skipped. The credentials are remembered, and
    /// applied to secure listeners bound afterwards as well.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Credentials`], if the files can't be read
    /// or are rejected, in which case listeners keep their credentials, and
    /// [`Server::error`] contains the reason.
    #[cfg(feature = "tls")]
    pub fn use_credentials<C, K>(&self, cert: C, key: K) -> Result
    where
        C: AsRef<Path>,
        K: AsRef<Path>,
    {
        let res = socket::Credentials::from_pem_files(cert, key);
        self.shared.configure(res)
    }

    /// Applies the given PEM encoded certificate and private key to every
    /// secure listener.
    ///
    /// # Errors
    ///
    /// This method returns the same errors as [`Server::use_credentials`].
    #[cfg(feature = "tls")]
    pub fn use_credentials_pem(&self, cert: &[u8], key: &[u8]) -> Result {
        let res = socket::Credentials::from_pem(cert, key);
        self.shared.configure(res)
    }

    /// Applies credentials to every secure listener.
    ///
    /// # Errors
    ///
    /// Secure transport was not compiled in, so this always returns
    /// [`Error::Unsupported`].
    #[cfg(not(feature = "tls"))]
    pub fn use_credentials<C, K>(&self, _cert: C, _key: K) -> Result
    where
        C: AsRef<Path>,
        K: AsRef<Path>,
    {
        Err(self.shared.fail(Error::Unsupported("secure transport")))
    }

    /// Applies credentials to every secure listener.
    ///
    /// # Errors
    ///
    /// Secure transport was not compiled in, so this always returns
    /// [`Error::Unsupported`].
    #[cfg(not(feature = "tls"))]
    pub fn use_credentials_pem(&self, _cert: &[u8], _key: &[u8]) -> Result {
        Err(self.shared.fail(Error::Unsupported("secure transport")))
    }

    /// Starts the accept loop on a dedicated thread and returns immediately.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::NoListener`], if nothing was bound, and
    /// [`Error::State`], if the server is already running. If the poller or
    /// the thread can't be created, the server ends up `Stopped`.
    pub fn start(&self) -> Result {
        let poller = self.shared.prepare()?;
        let shared = Arc::clone(&self.shared);
        let res = thread::Builder::new()
            .name(String::from("quay-accept"))
            .spawn(move || {
                let _ = shared.run(poller);
            });

        // If we can't spawn the loop thread, the server is stopped again
        match res {
            Ok(handle) => {
                *lock(&self.thread) = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.shared.finish();
                Err(self.shared.fail(Error::Io(err)))
            }
        }
    }

    /// Runs the accept loop on the calling thread until the server is stopped.
    ///
    /// # Errors
    ///
    /// In addition to the errors of [`Server::start`], this method returns
    /// [`Error::Multiplex`], if waiting across listeners failed.
    pub fn run(&self) -> Result {
        let poller = self.shared.prepare()?;
        self.shared.run(poller)
    }

    /// Requests the accept loop to stop, and returns immediately.
    ///
    /// Connections that were already accepted are not affected. This is a
    /// no-op when the server is not running.
    pub fn stop(&self) {
        self.shared.request_stop();
    }

    /// Stops the server gracefully, waiting for all connections to finish.
    ///
    /// This method returns exactly when the accept loop exited, and no live
    /// connections remain. It doesn't impose any upper bound on the time it
    /// takes, so a stalled peer can delay it until its connection times out.
    /// Use [`Server::shutdown_timeout`] for bounded shutdown latency.
    pub fn shutdown(&self) {
        self.shared.request_stop();
        self.shared.wait_stopped(None);
        self.join();
        self.shared.tracker.wait();
        info!("server stopped");
    }

    /// Stops the server gracefully, waiting at most the given duration.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Timeout`], if the accept loop didn't exit,
    /// or live connections remain, when the timeout elapses.
    pub fn shutdown_timeout(&self, timeout: Duration) -> Result {
        let deadline = Instant::now() + timeout;
        self.shared.request_stop();
        if !self.shared.wait_stopped(Some(deadline)) {
            return Err(Error::Timeout);
        }

        // Loop exited, so joining the thread doesn't block
        self.join();
        let remaining = deadline.saturating_duration_since(Instant::now());
        if self.shared.tracker.wait_timeout(remaining) {
            info!("server stopped");
            Ok(())
        } else {
            Err(Error::Timeout)
        }
    }

    /// Stops the server without waiting for anything.
    ///
    /// The accept loop is woken up and exits without accepting further
    /// connections, but its thread is detached, not joined. Handlers still
    /// serving connections keep running detached as well, and are neither
    /// interrupted nor waited for.
    pub fn force_stop(&self) {
        self.shared.request_stop();
        drop(lock(&self.thread).take());
    }

    /// Returns the server state.
    #[must_use]
    pub fn state(&self) -> State {
        *lock(&self.shared.state)
    }

    /// Returns the number of live connections.
    #[must_use]
    pub fn live_connections(&self) -> usize {
        self.shared.tracker.live()
    }

    /// Returns the last error message, if any.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        lock(&self.shared.error).clone()
    }

    /// Returns the addresses of all listeners.
    #[must_use]
    pub fn local_addrs(&self) -> Vec<Address> {
        let listeners = read(&self.shared.listeners);
        let iter = listeners.iter();
        iter.filter_map(|listener| listener.local_addr().ok()).collect()
    }

    /// Returns the service.
    #[must_use]
    pub fn service(&self) -> &S {
        &self.shared.service
    }

    /// Joins the loop thread, if any.
    fn join(&self) {
        if let Some(handle) = lock(&self.thread).take() {
            let _ = handle.join();
        }
    }
}

// ----------------------------------------------------------------------------

impl<S> Shared<S>
where
    S: Service,
{
    /// Records the given error as the last error and returns it.
    fn fail(&self, err: Error) -> Error {
        *lock(&self.error) = Some(err.to_string());
        err
    }

    /// Resolves the given address, recording failures.
    fn resolve<A>(&self, addr: A) -> Result<Vec<SocketAddr>>
    where
        A: ToSocketAddrs,
    {
        match addr.to_socket_addrs() {
            Ok(iter) => Ok(iter.collect()),
            Err(err) => Err(self.fail(Error::Bind {
                addr: String::from("(unresolved)"),
                source: err.into(),
            })),
        }
    }

    /// Creates a listener and adds it to the listener set.
    fn add<F>(&self, addr: &str, f: F) -> Result
    where
        F: FnOnce() -> socket::Result<Listener>,
    {
        let mut state = lock(&self.state);
        if state.is_active() {
            return Err(self.fail(Error::State(*state)));
        }

        // Create listener, and apply credentials if it's secure
        let listener = f().map_err(|err| match err {
            socket::Error::Unsupported(kind) => Error::Unsupported(kind),
            source => Error::Bind { addr: addr.to_string(), source },
        });
        let listener = listener.map_err(|err| self.fail(err))?;
        #[cfg(feature = "tls")]
        if let (Some(listener), Some(credentials)) =
            (listener.as_secure(), lock(&self.credentials).as_ref())
        {
            listener.configure(credentials);
        }

        // Add listener and update state
        let addr = listener.local_addr().map_or(addr.to_string(), |addr| {
            addr.to_string()
        });
        info!(%addr, kind = ?listener.kind(), "bound listener");
        write(&self.listeners).push(Arc::new(listener));
        *state = State::Bound;
        Ok(())
    }

    /// Applies credentials to every secure listener.
    #[cfg(feature = "tls")]
    fn configure(&self, res: socket::Result<socket::Credentials>) -> Result {
        let credentials = res.map_err(|err| {
            self.fail(match err {
                socket::Error::Credentials(reason) => {
                    Error::Credentials(reason)
                }
                err => Error::Credentials(err.to_string()),
            })
        })?;

        // Apply credentials through the capability query, skipping listeners
        // that don't support them
        let listeners = read(&self.listeners);
        let iter = listeners.iter().filter_map(|listener| listener.as_secure());
        let count = iter
            .inspect(|listener| listener.configure(&credentials))
            .count();

        // Remember credentials for listeners bound later on
        *lock(&self.credentials) = Some(credentials);
        info!(count, "applied credentials");
        Ok(())
    }

    /// Prepares the accept loop, moving the server to `Running`.
    fn prepare(&self) -> Result<Poller> {
        let mut state = lock(&self.state);
        let listeners = read(&self.listeners);
        if listeners.is_empty() {
            return Err(self.fail(Error::NoListener));
        }
        if !matches!(*state, State::Bound | State::Stopped) {
            return Err(self.fail(Error::State(*state)));
        }

        // Create poller and register all listeners with their index as token
        let poller = Poller::new().and_then(|poller| {
            let mut iter = listeners.iter().enumerate();
            iter.try_for_each(|(n, listener)| {
                poller.register(listener, Token(n))
            })
            .map(|()| poller)
        });

        // Registration failures are fatal multiplexing errors
        let poller = poller.map_err(|err| {
            *state = State::Stopped;
            self.changed.notify_all();
            self.fail(Error::Multiplex(err))
        })?;
        *lock(&self.waker) = Some(poller.waker());
        *state = State::Running;
        self.changed.notify_all();
        info!(listeners = listeners.len(), "server running");
        Ok(poller)
    }

    /// Runs the accept loop until a stop is requested or multiplexing fails.
    fn run<P>(self: &Arc<Self>, mut poller: P) -> Result
    where
        P: Readiness,
    {
        let listeners = read(&self.listeners).clone();
        let res = loop {
            if *lock(&self.state) == State::StopRequested {
                break Ok(());
            }

            // Wait for listeners to become ready - if the wait times out, we
            // sweep all listeners, since readiness is edge-triggered, and a
            // listener we stopped draining early would not be reported again
            match poller.wait(Some(self.timeout)) {
                Ok(0) => {
                    for listener in &listeners {
                        self.accept(listener);
                    }
                }
                Ok(_) => {
                    for Token(n) in poller.ready() {
                        if let Some(listener) = listeners.get(n) {
                            self.accept(listener);
                        }
                    }
                }
                Err(err) => break Err(Error::Multiplex(err)),
            }
        };

        // Record multiplexing errors, and mark the server as stopped
        let res = res.map_err(|err| {
            warn!("accept loop failed: {err}");
            self.fail(err)
        });
        self.finish();
        res
    }

    /// Accepts all pending connections of the given listener.
    fn accept(self: &Arc<Self>, listener: &Listener) {
        loop {
            if *lock(&self.state) == State::StopRequested {
                return;
            }
            match listener.accept() {
                Ok(stream) => self.dispatch(stream),
                Err(err) if err.would_block() => return,

                // Failures of single connections are expected, e.g., when a
                // secure listener has no credentials, or the peer went away
                Err(err @ socket::Error::Io(_)) if err.is_per_connection() => {
                    debug!("accept failed: {err}");
                }
                Err(err) if err.is_per_connection() => {
                    warn!(kind = ?listener.kind(), "dropped connection: {err}");
                }

                // Everything else, e.g., running out of file descriptors, is
                // retried with the next sweep
                Err(err) => {
                    warn!(kind = ?listener.kind(), "accept failed: {err}");
                    return;
                }
            }
        }
    }

    /// Dispatches an accepted stream to the service.
    fn dispatch(self: &Arc<Self>, stream: Stream) {
        let ticket = self.tracker.enter();
        debug!(peer = %stream.peer(), kind = ?stream.kind(), "accepted");
        match self.dispatch {
            Dispatch::Sequential => {
                let res = panic::catch_unwind(AssertUnwindSafe(|| {
                    self.service.serve(stream);
                }));
                if res.is_err() {
                    warn!("connection handler panicked");
                }
                drop(ticket);
            }
            Dispatch::Concurrent => {
                let shared = Arc::clone(self);
                let res = thread::Builder::new()
                    .name(String::from("quay-conn"))
                    .spawn(move || {
                        let _ticket = ticket;
                        shared.service.serve(stream);
                    });

                // If spawning fails, the closure is dropped together with the
                // stream and the ticket, closing and releasing the connection
                if let Err(err) = res {
                    warn!("could not spawn handler: {err}");
                }
            }
        }
    }

    /// Requests the accept loop to stop, waking it up.
    fn request_stop(&self) {
        let mut state = lock(&self.state);
        if *state != State::Running {
            return;
        }
        *state = State::StopRequested;
        self.changed.notify_all();
        drop(state);

        // Wake up the poller, so the loop doesn't wait for the timeout
        if let Some(waker) = lock(&self.waker).as_ref() {
            if let Err(err) = waker.wake() {
                debug!("could not wake accept loop: {err}");
            }
        }
        info!("stop requested");
    }

    /// Marks the accept loop as exited.
    fn finish(&self) {
        lock(&self.waker).take();
        *lock(&self.state) = State::Stopped;
        self.changed.notify_all();
    }

    /// Blocks until the accept loop is inactive or the deadline is reached,
    /// returning whether the loop is inactive.
    fn wait_stopped(&self, deadline: Option<Instant>) -> bool {
        let mut state = lock(&self.state);
        while state.is_active() {
            state = match deadline {
                None => self
                    .changed
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    self.changed
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
        true
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<S> Drop for Server<S>
where
    S: Service,
{
    /// Force-stops the server, detaching the loop thread.
    fn drop(&mut self) {
        self.force_stop();
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Returns a printable description of the given addresses.
fn describe(addrs: &[SocketAddr]) -> String {
    let iter = addrs.iter().map(ToString::to_string);
    iter.collect::<Vec<_>>().join(", ")
}

/// Locks the given mutex, ignoring poisoning.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Acquires a read lock, ignoring poisoning.
fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Acquires a write lock, ignoring poisoning.
fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    /// Readiness source whose wait always fails.
    struct Broken;

    impl Readiness for Broken {
        fn wait(&mut self, _: Option<Duration>) -> io::Result<usize> {
            Err(io::Error::other("poll failed"))
        }

        fn ready(&self) -> Vec<Token> {
            Vec::new()
        }
    }

    #[test]
    fn multiplex_failure_stops_server() {
        let server = Server::new(Idle);
        server.bind("127.0.0.1:0").unwrap();
        drop(server.shared.prepare().unwrap());
        assert_eq!(server.state(), State::Running);

        // A failing wait ends the loop, and is recorded
        let res = server.shared.run(Broken);
        assert!(matches!(res, Err(Error::Multiplex(_))));
        assert_eq!(server.state(), State::Stopped);
        assert!(server.error().unwrap().contains("poll failed"));

        // The server can be started again afterwards
        server.start().unwrap();
        assert_eq!(server.state(), State::Running);
        server.shutdown();
        assert_eq!(server.state(), State::Stopped);
    }

    #[test]
    fn stop_wakes_waiting_loop() {
        let server = Server::builder(Idle)
            .poll_timeout(Duration::from_secs(60))
            .bind("127.0.0.1:0")
            .unwrap()
            .listen()
            .unwrap();
        server.start().unwrap();

        // Without the waker, the loop would only notice after the timeout
        let start = Instant::now();
        server.shutdown();
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
