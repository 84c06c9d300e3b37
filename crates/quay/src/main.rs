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

//! Quay, a small HTTP and WebSocket capable socket server.

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam::channel;
use std::path::PathBuf;
use std::process::{self, ExitCode};
use std::thread;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use quay_serve::server::Server;

mod config;

use config::{Config, TlsConfig};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Serve a directory over HTTP, HTTPS and Unix domain sockets.
#[derive(Debug, Parser)]
#[command(name = "quay", version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to `quay.toml`, if present).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Root directory to serve.
    #[arg(short, long, value_name = "DIR")]
    root: Option<PathBuf>,
    /// Address of a plain TCP listener.
    #[arg(short, long, value_name = "ADDR")]
    bind: Vec<String>,
    /// Address of a TLS listener.
    #[arg(short, long, value_name = "ADDR")]
    secure: Vec<String>,
    /// Path of a Unix domain socket listener.
    #[arg(short, long, value_name = "PATH")]
    local: Vec<PathBuf>,
    /// Certificate chain for TLS listeners.
    #[arg(long, value_name = "FILE", requires = "key")]
    cert: Option<PathBuf>,
    /// Private key for TLS listeners.
    #[arg(long, value_name = "FILE", requires = "cert")]
    key: Option<PathBuf>,
    /// Enable cross-origin requests.
    #[arg(long)]
    cors: bool,
    /// Serve connections one at a time.
    #[arg(long)]
    sequential: bool,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Args {
    /// Merges the arguments into the given configuration.
    ///
    /// Listeners given on the command line replace those of the file, while
    /// switches can only be turned on.
    fn merge(self, mut config: Config) -> Config {
        if let Some(root) = self.root {
            config.http.root = root;
        }
        if !self.bind.is_empty()
            || !self.secure.is_empty()
            || !self.local.is_empty()
        {
            config.server.bind = self.bind;
            config.server.secure = self.secure;
            config.server.local = self.local;
        }
        if let (Some(cert), Some(key)) = (self.cert, self.key) {
            config.tls = Some(TlsConfig { cert, key });
        }
        config.http.cors |= self.cors;
        config.server.sequential |= self.sequential;
        config
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Sets up logging, defaulting to the info level.
fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quay=info,quay_serve=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Runs the server until interrupted.
fn run(args: Args) -> Result<()> {
    let path = args.config.clone();
    let config = args.merge(Config::load(path.as_deref())?);

    // Create and start server
    let http = config.service()?;
    let builder = config.apply(Server::builder(http))?;
    let server = builder.listen().context("could not start listening")?;
    server.start().context("could not start server")?;
    for addr in server.local_addrs() {
        info!("listening on {addr}");
    }
    info!(root = %config.http.root.display(), "serving files");

    // Forward interrupts to a channel, so the first one triggers a graceful
    // shutdown, and the second one terminates the process right away
    let (sender, receiver) = channel::unbounded();
    ctrlc::set_handler(move || {
        let _ = sender.send(());
    })
    .context("could not install interrupt handler")?;

    // Wait for the first interrupt
    if receiver.recv().is_err() {
        return Ok(());
    }
    info!("shutting down, press Ctrl-C again to exit immediately");
    thread::spawn(move || {
        if receiver.recv().is_ok() {
            warn!("exiting without waiting for connections");
            process::exit(130);
        }
    });

    // Stop accepting and wait for live connections to finish
    server.shutdown();
    if let Some(err) = server.error() {
        warn!("server stopped with error: {err}");
    }
    info!("stopped");
    Ok(())
}

// ----------------------------------------------------------------------------

/// Entry point.
fn main() -> ExitCode {
    setup_logging();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listeners_replace_configured_ones() {
        let mut config = Config::default();
        config.server.bind.push(String::from("0.0.0.0:80"));
        config.server.secure.push(String::from("0.0.0.0:443"));

        // Listeners on the command line take precedence
        let args = Args::parse_from(["quay", "--bind", "127.0.0.1:8080"]);
        let config = args.merge(config);
        assert_eq!(config.server.bind, ["127.0.0.1:8080"]);
        assert!(config.server.secure.is_empty());
    }

    #[test]
    fn switches_extend_configuration() {
        let mut config = Config::default();
        config.server.sequential = true;
        let args = Args::parse_from(["quay", "--cors", "--root", "site"]);
        let config = args.merge(config);
        assert!(config.http.cors);
        assert!(config.server.sequential);
        assert_eq!(config.http.root, PathBuf::from("site"));
    }

    #[test]
    fn credentials_require_both_files() {
        let res = Args::try_parse_from(["quay", "--cert", "cert.pem"]);
        assert!(res.is_err());
        let args = Args::parse_from([
            "quay", "--cert", "cert.pem", "--key", "key.pem",
        ]);
        let config = args.merge(Config::default());
        assert!(config.tls.is_some());
    }
}
