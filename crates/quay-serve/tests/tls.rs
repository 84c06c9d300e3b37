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

//! Integration tests for secure listeners.

#![cfg(feature = "tls")]

use rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use rustls::crypto::ring;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    ClientConfig, ClientConnection, DigitallySignedStruct, SignatureScheme,
    StreamOwned,
};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use quay_serve::http::Http;
use quay_serve::server::{Error, Server};
use quay_serve::socket::Kind;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Verifier accepting any certificate, as the fixture is self-signed.
#[derive(Debug)]
struct AcceptAny;

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl ServerCertVerifier for AcceptAny {
    fn verify_server_cert(
        &self, _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>], _server_name: &ServerName<'_>,
        _ocsp_response: &[u8], _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self, _message: &[u8], _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self, _message: &[u8], _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Returns the path of the given fixture.
fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Returns the address of the first listener of the given kind.
fn addr_of(server: &Server<Http>, kind: Kind) -> SocketAddr {
    let addrs = server.local_addrs();
    let index = match kind {
        Kind::Plain => 0,
        _ => 1,
    };
    addrs[index].as_inet().unwrap()
}

/// Sends a request over TLS and returns the response.
fn send_secure(addr: SocketAddr, request: &str) -> std::io::Result<String> {
    let config = ClientConfig::builder_with_provider(Arc::new(
        ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(std::io::Error::other)?
    .dangerous()
    .with_custom_certificate_verifier(Arc::new(AcceptAny))
    .with_no_client_auth();

    // Connect and send request
    let name = ServerName::try_from("localhost")
        .map_err(std::io::Error::other)?;
    let session = ClientConnection::new(Arc::new(config), name)
        .map_err(std::io::Error::other)?;
    let socket = TcpStream::connect(addr)?;
    socket.set_read_timeout(Some(Duration::from_secs(5)))?;
    let mut stream = StreamOwned::new(session, socket);
    stream.write_all(request.as_bytes())?;

    // Read until the server closes the session
    let mut buf = Vec::new();
    match stream.read_to_end(&mut buf) {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {}
        Err(err) => return Err(err),
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Sends a plain request and returns the response.
fn send_plain(addr: SocketAddr, request: &str) -> String {
    let mut client = TcpStream::connect(addr).unwrap();
    client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    client.write_all(request.as_bytes()).unwrap();
    let mut buf = Vec::new();
    client.read_to_end(&mut buf).unwrap();
    String::from_utf8_lossy(&buf).into_owned()
}

/// Creates a server with a plain and a secure listener.
fn server(dir: &tempfile::TempDir) -> Server<Http> {
    let server = Server::new(Http::new().root(dir.path()));
    server.bind("127.0.0.1:0").unwrap();
    server.bind_secure("127.0.0.1:0").unwrap();
    server
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

const REQUEST: &str = "GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";

#[test]
fn serves_plain_and_secure_listeners_together() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "secure").unwrap();
    let server = server(&dir);
    server
        .use_credentials(fixture("cert.pem"), fixture("key.pem"))
        .unwrap();
    server.start().unwrap();

    // Both listeners serve the same site
    let res = send_plain(addr_of(&server, Kind::Plain), REQUEST);
    assert!(res.starts_with("HTTP/1.1 200 OK"));
    let res = send_secure(addr_of(&server, Kind::Secure), REQUEST).unwrap();
    assert!(res.starts_with("HTTP/1.1 200 OK"));
    assert!(res.ends_with("secure"));
    server.shutdown();
    assert_eq!(server.live_connections(), 0);
}

#[test]
fn remembers_credentials_for_later_listeners() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "later").unwrap();
    let server = Server::new(Http::new().root(dir.path()));
    server.bind("127.0.0.1:0").unwrap();
    server
        .use_credentials(fixture("cert.pem"), fixture("key.pem"))
        .unwrap();

    // Secure listener is bound after credentials were applied
    server.bind_secure("127.0.0.1:0").unwrap();
    server.start().unwrap();
    let res = send_secure(addr_of(&server, Kind::Secure), REQUEST).unwrap();
    assert!(res.ends_with("later"));
    server.shutdown();
}

#[test]
fn invalid_credentials_prevent_handshakes() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "plain").unwrap();
    let server = server(&dir);

    // Key file is not a key, so the credentials are rejected
    let res = server.use_credentials(fixture("cert.pem"), fixture("cert.pem"));
    assert!(matches!(res, Err(Error::Credentials(_))));
    assert!(server.error().is_some());
    server.start().unwrap();

    // The secure listener drops connections, the plain one is unaffected
    assert!(send_secure(addr_of(&server, Kind::Secure), REQUEST).is_err());
    let res = send_plain(addr_of(&server, Kind::Plain), REQUEST);
    assert!(res.ends_with("plain"));
    server.shutdown();
    assert_eq!(server.live_connections(), 0);
}
