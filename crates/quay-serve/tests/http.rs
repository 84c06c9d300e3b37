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

//! Integration tests for the HTTP layer.

use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use quay_serve::http::{
    Handler, Http, Method, Request, Response, ResponseExt, StaticFiles, Status,
};
use quay_serve::server::Server;
use quay_serve::upgrade::{accept_key, WebSocket};
use tungstenite::protocol::Role;
use tungstenite::Message;

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Starts a server for the given service, returning it with its address.
fn start<H: Handler>(http: Http<H>) -> (Server<Http<H>>, SocketAddr) {
    let server = Server::new(http);
    server.bind("127.0.0.1:0").unwrap();
    server.start().unwrap();
    let addr = server.local_addrs()[0].as_inet().unwrap();
    (server, addr)
}

/// Sends a raw request and returns the raw response.
fn send(addr: SocketAddr, request: &str) -> String {
    let mut client = TcpStream::connect(addr).unwrap();
    client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    client.write_all(request.as_bytes()).unwrap();
    let mut buf = Vec::new();
    client.read_to_end(&mut buf).unwrap();
    String::from_utf8_lossy(&buf).into_owned()
}

/// Sends a request without body for the given method and target.
fn request(addr: SocketAddr, method: &str, target: &str) -> String {
    send(addr, &format!("{method} {target} HTTP/1.1\r\nHost: test\r\n\r\n"))
}

/// Performs a WebSocket handshake, returning the client and response head.
fn handshake(addr: SocketAddr, key: &str) -> (TcpStream, String) {
    let mut client = TcpStream::connect(addr).unwrap();
    client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    write!(
        client,
        "GET /live HTTP/1.1\r\nHost: test\r\nConnection: Upgrade\r\n\
         Upgrade: websocket\r\nSec-WebSocket-Version: 13\r\n\
         Sec-WebSocket-Key: {key}\r\n\r\n"
    )
    .unwrap();

    // Read response head byte by byte, so no frame data is consumed
    let mut head = Vec::new();
    let mut byte = [0; 1];
    while !head.ends_with(b"\r\n\r\n") {
        client.read_exact(&mut byte).unwrap();
        head.push(byte[0]);
    }
    (client, String::from_utf8(head).unwrap())
}

/// Echoes messages until the peer closes the connection.
fn echo(mut socket: tungstenite::WebSocket<quay_serve::socket::Stream>) {
    while let Ok(message) = socket.read() {
        if message.is_close() || socket.send(message).is_err() {
            break;
        }
    }
}

/// Creates a site with a few files.
fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<h1>quay</h1>").unwrap();
    fs::write(dir.path().join("scene.dae"), "<COLLADA/>").unwrap();
    fs::write(dir.path().join("data.bin"), [0, 1, 2]).unwrap();
    dir
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[test]
fn serves_static_files() {
    let dir = site();
    let (server, addr) = start(Http::new().root(dir.path()));
    let res = request(addr, "GET", "/");
    assert!(res.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(res.contains("Content-Type: text/html; charset=utf-8\r\n"));
    assert!(res.contains("Content-Length: 13\r\n"));
    assert!(res.contains("Connection: close\r\n"));
    assert!(res.ends_with("\r\n\r\n<h1>quay</h1>"));

    // Head requests carry the same headers, but no body
    let res = request(addr, "HEAD", "/index.html");
    assert!(res.contains("Content-Length: 13\r\n"));
    assert!(res.ends_with("\r\n\r\n"));
    server.shutdown();
    assert_eq!(server.live_connections(), 0);
}

#[test]
fn rejects_traversal_outside_root() {
    let dir = site();
    let (server, addr) = start(Http::new().root(dir.path()));
    for target in ["/../etc/passwd", "/a/../../etc", "/%2e%2e/etc/passwd"] {
        let res = request(addr, "GET", target);
        assert!(res.starts_with("HTTP/1.1 403 Forbidden"), "{target}");
    }
    server.shutdown();
}

#[test]
fn resolves_registered_and_default_mime_types() {
    let dir = site();
    let http = Http::new()
        .root(dir.path())
        .mime("dae", "model/vnd.collada+xml");
    let (server, addr) = start(http);
    let res = request(addr, "GET", "/scene.dae");
    assert!(res.contains("Content-Type: model/vnd.collada+xml\r\n"));
    let res = request(addr, "GET", "/data.bin");
    assert!(res.contains("Content-Type: application/octet-stream\r\n"));
    server.shutdown();
}

#[test]
fn answers_missing_files_with_not_found() {
    let dir = site();
    let (server, addr) = start(Http::new().root(dir.path()));
    let res = request(addr, "GET", "/missing.html");
    assert!(res.starts_with("HTTP/1.1 404 Not Found"));
    server.shutdown();
}

#[test]
fn passes_query_and_wildcard_to_handler() {
    let http = Http::with_handler(
        |req: &Request, res: &mut Response, files: &StaticFiles| {
            if let Some(rest) = req.is(Method::Get, "/api/clients/*") {
                *res = Response::from_text(format!("client {rest}"));
            } else if req.is(Method::Get, "/api").is_some() {
                let id = req.query("id").unwrap_or("none");
                *res = Response::from_text(format!("id {id}"));
            } else {
                files.serve(req, res);
            }
        },
    );
    let (server, addr) = start(http);
    let res = request(addr, "GET", "/api?id=12");
    assert!(res.ends_with("\r\n\r\nid 12"));
    let res = request(addr, "GET", "/api/clients/132337");
    assert!(res.ends_with("\r\n\r\nclient 132337"));
    let res = request(addr, "POST", "/api/clients/132337");
    assert!(res.starts_with("HTTP/1.1 405 Method Not Allowed"));
    server.shutdown();
}

#[test]
fn answers_preflight_without_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let http = Http::with_handler(
        move |_: &Request, res: &mut Response, _: &StaticFiles| {
            counter.fetch_add(1, Ordering::SeqCst);
            *res = Response::from_text("handled");
        },
    )
    .cors(true);
    let (server, addr) = start(http);

    // Preflight is answered by the HTTP layer
    let res = request(addr, "OPTIONS", "/api");
    assert!(res.starts_with("HTTP/1.1 204 No Content"));
    assert!(res.contains("Access-Control-Allow-Origin: *\r\n"));
    assert!(res.contains(
        "Access-Control-Allow-Methods: GET, HEAD, POST, OPTIONS\r\n"
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // Methods that are not advertised are answered like preflights
    let res = request(addr, "PUT", "/api");
    assert!(res.starts_with("HTTP/1.1 204 No Content"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // Other requests reach the handler, and carry the headers
    let res = request(addr, "GET", "/api");
    assert!(res.starts_with("HTTP/1.1 200 OK"));
    assert!(res.contains("Access-Control-Allow-Origin: *\r\n"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    server.shutdown();
}

#[test]
fn answers_invalid_requests_with_status() {
    let (server, addr) = start(Http::new().cors(true));
    let res = send(addr, "BREW /pot HTTP/1.1\r\n\r\n");
    assert!(res.starts_with("HTTP/1.1 400 Bad Request"));
    assert!(res.contains("Access-Control-Allow-Origin: *\r\n"));
    let res = send(addr, "garbage\r\n\r\n");
    assert!(res.starts_with("HTTP/1.1 400 Bad Request"));
    let res = send(
        addr,
        "POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n0\r\n\r\n",
    );
    assert!(res.starts_with("HTTP/1.1 501 Not Implemented"));
    let target = format!("/{}", "a".repeat(4096));
    let res = request(addr, "GET", &target);
    assert!(res.starts_with("HTTP/1.1 414 URI Too Long"));
    server.shutdown();
}

#[test]
fn reads_request_body() {
    let http = Http::with_handler(
        |req: &Request, res: &mut Response, _: &StaticFiles| {
            *res = Response::from_text(String::from_utf8_lossy(&req.body));
        },
    );
    let (server, addr) = start(http);
    let res = send(
        addr,
        "POST /echo HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello",
    );
    assert!(res.starts_with("HTTP/1.1 200 OK"));
    assert!(res.ends_with("\r\n\r\nhello"));
    server.shutdown();
}

#[test]
fn hands_off_websocket_upgrades() {
    let (server, addr) = start(Http::new().upgrade(WebSocket::new(echo)));

    // Perform handshake
    let key = "dGhlIHNhbXBsZSBub25jZQ==";
    let (client, head) = handshake(addr, key);
    assert!(head.starts_with("HTTP/1.1 101 Switching Protocols"));
    assert!(head.contains(&format!(
        "Sec-WebSocket-Accept: {}\r\n",
        accept_key(key)
    )));

    // Exchange messages
    let mut socket =
        tungstenite::WebSocket::from_raw_socket(client, Role::Client, None);
    socket.send(Message::text("ping")).unwrap();
    let message = socket.read().unwrap();
    assert_eq!(message.to_text().unwrap(), "ping");
    socket.close(None).unwrap();
    drop(socket);
    server.shutdown();
}

#[test]
fn serves_upgrades_normally_without_link() {
    let dir = site();
    let (server, addr) = start(Http::new().root(dir.path()));
    let res = send(
        addr,
        "GET / HTTP/1.1\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\r\n",
    );
    assert!(res.starts_with("HTTP/1.1 200 OK"));
    server.shutdown();
}

#[test]
fn upgraded_connections_outlive_request_timeout() {
    let http = Http::new()
        .timeout(Some(Duration::from_millis(300)))
        .upgrade(WebSocket::new(echo));
    let (server, addr) = start(http);
    let (client, head) = handshake(addr, "dGhlIHNhbXBsZSBub25jZQ==");
    assert!(head.starts_with("HTTP/1.1 101 Switching Protocols"));

    // Stay idle for longer than the request timeout, then talk
    let mut socket =
        tungstenite::WebSocket::from_raw_socket(client, Role::Client, None);
    thread::sleep(Duration::from_millis(800));
    socket.send(Message::text("late")).unwrap();
    let message = socket.read().unwrap();
    assert_eq!(message.to_text().unwrap(), "late");
    socket.close(None).unwrap();
    drop(socket);
    server.shutdown();
}

#[test]
fn delivers_full_response_despite_unread_input() {
    let handler = |_: &Request, res: &mut Response, _: &StaticFiles| {
        *res = Response::new()
            .status(Status::Ok)
            .body(vec![b'x'; 200_000]);
    };
    let (server, addr) = start(Http::with_handler(handler));
    for _ in 0..5 {
        let mut client = TcpStream::connect(addr).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

        // Send a request followed by input the server never reads
        let mut writer = client.try_clone().unwrap();
        let sender = thread::spawn(move || {
            let mut data = b"POST / HTTP/1.1\r\nHost: test\r\n\
                Content-Length: 2\r\n\r\nab"
                .to_vec();
            data.extend(vec![b'y'; 100_000]);
            let _ = writer.write_all(&data);
        });

        // The response must arrive in full, without the connection being reset
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        sender.join().unwrap();
        let head = buf.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
        assert!(buf.starts_with(b"HTTP/1.1 200 OK\r\n"));
        assert_eq!(buf.len() - head - 4, 200_000);
    }
    server.shutdown();
}
