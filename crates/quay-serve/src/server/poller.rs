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

//! Poller for listener readiness.

use mio::event::{Event, Iter};
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token, Waker};
use std::io;
use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::time::Duration;

use crate::socket::Listener;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Token reserved for the waker.
pub const WAKER: Token = Token(usize::MAX);

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Source of listener readiness.
///
/// The accept loop is written against this trait, so it doesn't depend on
/// how readiness is obtained.
pub trait Readiness {
    /// Waits for readiness events, returning the number of ready listeners.
    fn wait(&mut self, timeout: Option<Duration>) -> io::Result<usize>;

    /// Returns the tokens of the listeners reported ready by the last wait.
    fn ready(&self) -> Vec<Token>;
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Poller for listener readiness.
///
/// Listeners are registered with their index in the listener set as token,
/// so ready events map back to listeners without further lookups. The last
/// token is reserved for the waker, which is used to interrupt waiting when
/// the server is asked to stop.
pub struct Poller {
    /// Poll instance.
    poll: Poll,
    /// Event queue.
    events: Events,
    /// Waker.
    waker: Arc<Waker>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Poller {
    /// Creates a poller.
    pub fn new() -> io::Result<Self> {
        Self::with_capacity(256)
    }

    /// Creates a poller with the given event capacity.
    pub fn with_capacity(capacity: usize) -> io::Result<Self> {
        Poll::new().and_then(|poll| {
            Waker::new(poll.registry(), WAKER).map(|waker| Self {
                waker: Arc::new(waker),
                events: Events::with_capacity(capacity),
                poll,
            })
        })
    }

    /// Registers a listener for readiness to accept.
    pub fn register(
        &self, listener: &Listener, token: Token,
    ) -> io::Result<()> {
        let fd = listener.as_raw_fd();
        self.poll
            .registry()
            .register(&mut SourceFd(&fd), token, Interest::READABLE)
    }

    /// Waits for readiness events, returning the number of ready listeners.
    ///
    /// Interruptions by signals are not errors, and are reported as if the
    /// timeout elapsed without any listener becoming ready.
    pub fn wait(&mut self, timeout: Option<Duration>) -> io::Result<usize> {
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {
                let iter = self.events.iter();
                Ok(iter.filter(|event| event.token() != WAKER).count())
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                self.events.clear();
                Ok(0)
            }
            Err(err) => Err(err),
        }
    }

    /// Returns the waker.
    #[inline]
    #[must_use]
    pub fn waker(&self) -> Arc<Waker> {
        Arc::clone(&self.waker)
    }

    /// Returns an iterator over the events.
    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        self.events.iter()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Readiness for Poller {
    #[inline]
    fn wait(&mut self, timeout: Option<Duration>) -> io::Result<usize> {
        Poller::wait(self, timeout)
    }

    fn ready(&self) -> Vec<Token> {
        let iter = self.iter().map(Event::token);
        iter.filter(|token| *token != WAKER).collect()
    }
}

impl<'a> IntoIterator for &'a Poller {
    type Item = &'a Event;
    type IntoIter = Iter<'a>;

    /// Returns an iterator over the events.
    #[inline]
    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::net::TcpStream;

    use super::*;

    #[test]
    fn reports_ready_listener() {
        let listener = Listener::plain("127.0.0.1:0").unwrap();
        let mut poller = Poller::new().unwrap();
        poller.register(&listener, Token(0)).unwrap();

        // Connect and wait for readiness
        let addr = listener.local_addr().unwrap().as_inet().unwrap();
        let _client = TcpStream::connect(addr).unwrap();
        let ready = poller.wait(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(ready, 1);
        assert!(poller.iter().any(|event| event.token() == Token(0)));
    }

    #[test]
    fn waker_is_not_counted() {
        let mut poller = Poller::new().unwrap();
        poller.waker().wake().unwrap();
        let ready = poller.wait(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(ready, 0);
        assert!(poller.iter().any(|event| event.token() == WAKER));
    }

    #[test]
    fn reports_ready_tokens_without_waker() {
        let listener = Listener::plain("127.0.0.1:0").unwrap();
        let mut poller = Poller::new().unwrap();
        poller.register(&listener, Token(3)).unwrap();

        // Make both the listener and the waker ready
        let addr = listener.local_addr().unwrap().as_inet().unwrap();
        let _client = TcpStream::connect(addr).unwrap();
        poller.waker().wake().unwrap();
        let mut tokens = Vec::new();
        while tokens.is_empty() {
            Readiness::wait(&mut poller, Some(Duration::from_secs(5)))
                .unwrap();
            tokens = poller.ready();
        }
        assert_eq!(tokens, [Token(3)]);
    }

    #[test]
    fn times_out_without_events() {
        let mut poller = Poller::new().unwrap();
        let ready = poller.wait(Some(Duration::from_millis(10))).unwrap();
        assert_eq!(ready, 0);
    }
}
