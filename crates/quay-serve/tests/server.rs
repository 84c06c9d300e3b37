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

//! Integration tests for the socket server.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use quay_serve::server::{Dispatch, Error, Idle, Server, Service, State};
use quay_serve::socket::Stream;

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Echoes the first chunk received from the peer.
fn echo(mut stream: Stream) {
    let mut buf = [0; 64];
    let n = stream.read(&mut buf).unwrap_or(0);
    let _ = stream.write_all(&buf[..n]);
}

/// Returns the address of the first listener.
fn addr<S: Service>(server: &Server<S>) -> SocketAddr {
    server.local_addrs()[0].as_inet().unwrap()
}

/// Polls the given condition until it holds, or panics after five seconds.
fn wait_until<F>(mut f: F)
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    while !f() {
        assert!(Instant::now() < deadline, "condition not met in time");
        thread::sleep(Duration::from_millis(5));
    }
}

/// Sends a message and returns the answer.
fn roundtrip(addr: SocketAddr, message: &[u8]) -> Vec<u8> {
    let mut client = TcpStream::connect(addr).unwrap();
    client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    client.write_all(message).unwrap();
    let mut buf = Vec::new();
    client.read_to_end(&mut buf).unwrap();
    buf
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[test]
fn serves_connections_until_shutdown() {
    let server = Server::new(echo);
    server.bind("127.0.0.1:0").unwrap();
    server.start().unwrap();
    assert_eq!(server.state(), State::Running);

    // Every connection is served independently
    for n in 0..8 {
        let message = format!("hello {n}");
        let answer = roundtrip(addr(&server), message.as_bytes());
        assert_eq!(answer, message.as_bytes());
    }

    // Shutdown returns once everything is done
    server.shutdown();
    assert_eq!(server.state(), State::Stopped);
    assert_eq!(server.live_connections(), 0);
}

#[test]
fn shutdown_waits_for_live_connections() {
    let server = Server::new(|mut stream: Stream| {
        thread::sleep(Duration::from_millis(200));
        let _ = stream.write_all(b"done");
    });
    server.bind("127.0.0.1:0").unwrap();
    server.start().unwrap();

    // Connect a few clients and wait until all of them were accepted
    let clients = (0..4)
        .map(|_| TcpStream::connect(addr(&server)).unwrap())
        .collect::<Vec<_>>();
    wait_until(|| server.live_connections() == 4);

    // Shutdown must only return after all handlers finished
    server.shutdown();
    assert_eq!(server.live_connections(), 0);
    for mut client in clients {
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"done");
    }
}

#[test]
fn shutdown_timeout_expires_with_live_connections() {
    let server = Server::new(|_stream: Stream| {
        thread::sleep(Duration::from_millis(500));
    });
    server.bind("127.0.0.1:0").unwrap();
    server.start().unwrap();
    let _client = TcpStream::connect(addr(&server)).unwrap();
    wait_until(|| server.live_connections() == 1);

    // The loop exits right away, but the connection is still live
    let res = server.shutdown_timeout(Duration::from_millis(50));
    assert!(matches!(res, Err(Error::Timeout)));
    assert_eq!(server.state(), State::Stopped);

    // Waiting long enough succeeds
    server.shutdown_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(server.live_connections(), 0);
}

#[test]
fn stop_before_start_is_noop() {
    let server = Server::new(Idle);
    server.stop();
    assert_eq!(server.state(), State::Created);

    // Shutdown only waits for connections, of which there are none
    server.shutdown();
    assert_eq!(server.state(), State::Created);
    assert_eq!(server.live_connections(), 0);
}

#[test]
fn start_requires_listener() {
    let server = Server::new(Idle);
    assert!(matches!(server.start(), Err(Error::NoListener)));
    assert!(server.error().is_some());
}

#[test]
fn binding_taken_address_fails() {
    let server = Server::new(Idle);
    server.bind("127.0.0.1:0").unwrap();
    let taken = addr(&server);

    // Binding the same address again fails, and doesn't add a listener
    let res = server.bind(taken);
    assert!(matches!(res, Err(Error::Bind { .. })));
    assert!(server.error().is_some_and(|err| err.contains("could not bind")));
    assert_eq!(server.local_addrs().len(), 1);
    assert_eq!(server.state(), State::Bound);
}

#[cfg(not(feature = "tls"))]
#[test]
fn binding_secure_without_tls_is_unsupported() {
    let server = Server::new(Idle);
    let res = server.bind_secure("127.0.0.1:0");
    assert!(matches!(res, Err(Error::Unsupported("secure transport"))));
    assert!(server.error().is_some_and(|err| err.contains("unsupported")));
    assert_eq!(server.state(), State::Created);
}

#[test]
fn binding_while_running_fails() {
    let server = Server::new(Idle);
    server.bind("127.0.0.1:0").unwrap();
    server.start().unwrap();
    let res = server.bind("127.0.0.1:0");
    assert!(matches!(res, Err(Error::State(State::Running))));
    assert!(matches!(server.start(), Err(Error::State(State::Running))));
    server.shutdown();
}

#[test]
fn panicking_handler_releases_connection() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let server = Server::new(move |_stream: Stream| {
        counter.fetch_add(1, Ordering::SeqCst);
        panic!("handler failed");
    });
    server.bind("127.0.0.1:0").unwrap();
    server.start().unwrap();

    // Connect and wait for the handler to panic
    let _client = TcpStream::connect(addr(&server)).unwrap();
    wait_until(|| calls.load(Ordering::SeqCst) == 1);
    wait_until(|| server.live_connections() == 0);

    // The server keeps accepting connections
    let _client = TcpStream::connect(addr(&server)).unwrap();
    wait_until(|| calls.load(Ordering::SeqCst) == 2);
    assert_eq!(server.state(), State::Running);
    server.shutdown();
}

#[test]
fn sequential_dispatch_serves_inline() {
    let server = Server::builder(echo)
        .dispatch(Dispatch::Sequential)
        .poll_timeout(Duration::from_millis(50))
        .bind("127.0.0.1:0")
        .unwrap()
        .listen()
        .unwrap();
    server.start().unwrap();
    for n in 0..4 {
        let message = format!("inline {n}");
        let answer = roundtrip(addr(&server), message.as_bytes());
        assert_eq!(answer, message.as_bytes());
    }
    server.shutdown();
    assert_eq!(server.live_connections(), 0);
}

#[test]
fn run_blocks_until_stopped() {
    let server = Arc::new(Server::new(echo));
    server.bind("127.0.0.1:0").unwrap();

    // Run on another thread, and stop once it's running
    let handle = {
        let server = Arc::clone(&server);
        thread::spawn(move || server.run())
    };
    wait_until(|| server.state() == State::Running);
    assert_eq!(roundtrip(addr(&server), b"ping"), b"ping");
    server.stop();
    handle.join().unwrap().unwrap();
    assert_eq!(server.state(), State::Stopped);
}

#[test]
fn force_stop_does_not_wait() {
    let server = Server::new(|_stream: Stream| {
        thread::sleep(Duration::from_millis(500));
    });
    server.bind("127.0.0.1:0").unwrap();
    server.start().unwrap();
    let _client = TcpStream::connect(addr(&server)).unwrap();
    wait_until(|| server.live_connections() == 1);

    // The handler keeps running detached
    let start = Instant::now();
    server.force_stop();
    assert!(start.elapsed() < Duration::from_millis(400));
    assert_eq!(server.live_connections(), 1);
    wait_until(|| server.state() == State::Stopped);
}

#[test]
fn serves_plain_and_local_listeners_together() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quay.sock");
    let server = Server::new(echo);
    server.bind("127.0.0.1:0").unwrap();
    server.bind_local(&path).unwrap();
    server.start().unwrap();

    // Both listeners are multiplexed by the same loop
    assert_eq!(roundtrip(addr(&server), b"tcp"), b"tcp");
    let mut client = UnixStream::connect(&path).unwrap();
    client.write_all(b"unix").unwrap();
    let mut buf = Vec::new();
    client.read_to_end(&mut buf).unwrap();
    assert_eq!(buf, b"unix");
    server.shutdown();
}

#[test]
fn can_be_restarted_after_shutdown() {
    let server = Server::new(echo);
    server.bind("127.0.0.1:0").unwrap();
    server.start().unwrap();
    server.shutdown();

    // Listeners are kept, so the server can start again
    server.start().unwrap();
    assert_eq!(roundtrip(addr(&server), b"again"), b"again");
    server.shutdown();
}
