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

//! Configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use quay_serve::http::{Http, Method};
use quay_serve::server::{Builder, Dispatch, POLL_TIMEOUT};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Configuration file loaded from the working directory, if present.
pub const DEFAULT_FILE: &str = "quay.toml";

/// Address bound when no listener is configured.
pub const DEFAULT_ADDR: &str = "127.0.0.1:8000";

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Configuration.
///
/// All tables and settings are optional, so an empty file is a valid
/// configuration, serving the working directory on [`DEFAULT_ADDR`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// TLS settings.
    pub tls: Option<TlsConfig>,
    /// HTTP settings.
    pub http: HttpConfig,
}

/// Server settings.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Addresses of plain TCP listeners.
    pub bind: Vec<String>,
    /// Addresses of TLS listeners.
    pub secure: Vec<String>,
    /// Paths of Unix domain socket listeners.
    pub local: Vec<PathBuf>,
    /// Whether to serve connections one at a time.
    pub sequential: bool,
    /// Poll timeout in milliseconds.
    pub poll_timeout: Option<u64>,
}

/// TLS settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TlsConfig {
    /// Path to the PEM encoded certificate chain.
    pub cert: PathBuf,
    /// Path to the PEM encoded private key.
    pub key: PathBuf,
}

/// HTTP settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Root directory of the site.
    pub root: PathBuf,
    /// Index file name for directories.
    pub index: Option<String>,
    /// Whether cross-origin support is enabled.
    pub cors: bool,
    /// Additional methods advertised for cross-origin requests.
    pub methods: Vec<String>,
    /// Additional headers allowed in cross-origin requests.
    pub headers: Vec<String>,
    /// Additional content types by file extension.
    pub mime: BTreeMap<String, String>,
    /// Connection timeout in seconds, where `0` disables it.
    pub timeout: Option<u64>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Config {
    /// Loads the configuration from the given file.
    pub fn from_file<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| {
            format!("invalid configuration in {}", path.display())
        })
    }

    /// Loads the configuration from the given file, or from [`DEFAULT_FILE`]
    /// if it exists, falling back to the defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_FILE).is_file() => {
                Self::from_file(DEFAULT_FILE)
            }
            None => Ok(Self::default()),
        }
    }

    /// Creates the HTTP service.
    pub fn service(&self) -> Result<Http> {
        let http = &self.http;
        let mut service = Http::new().root(&http.root).cors(http.cors);
        if let Some(index) = &http.index {
            service = service.index(index);
        }
        for name in &http.methods {
            let method = name
                .parse::<Method>()
                .with_context(|| format!("invalid method {name}"))?;
            service = service.method(method);
        }
        for name in &http.headers {
            service = service.allow_header(name);
        }
        for (ext, mime) in &http.mime {
            service = service.mime(ext, mime);
        }

        // A timeout of zero disables it
        if let Some(seconds) = http.timeout {
            let timeout = Some(Duration::from_secs(seconds));
            service = service.timeout(timeout.filter(|d| !d.is_zero()));
        }
        Ok(service)
    }

    /// Adds all configured listeners and settings to the given builder.
    pub fn apply(&self, mut builder: Builder<Http>) -> Result<Builder<Http>> {
        let server = &self.server;
        if server.sequential {
            builder = builder.dispatch(Dispatch::Sequential);
        }
        let timeout = server.poll_timeout.map(Duration::from_millis);
        builder = builder.poll_timeout(timeout.unwrap_or(POLL_TIMEOUT));

        // Add listeners, using the default address if none are configured
        let mut plain =
            server.bind.iter().map(String::as_str).collect::<Vec<_>>();
        if plain.is_empty()
            && server.secure.is_empty()
            && server.local.is_empty()
        {
            plain.push(DEFAULT_ADDR);
        }
        for addr in plain {
            builder = builder
                .bind(addr)
                .with_context(|| format!("invalid address {addr}"))?;
        }
        for addr in &server.secure {
            builder = builder
                .bind_secure(addr.as_str())
                .with_context(|| format!("invalid address {addr}"))?;
        }
        for path in &server.local {
            builder = builder.bind_local(path);
        }

        // Add credentials for secure listeners
        if let Some(tls) = &self.tls {
            builder = builder.credentials(&tls.cert, &tls.key);
        }
        Ok(builder)
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            index: None,
            cors: false,
            methods: Vec::new(),
            headers: Vec::new(),
            mime: BTreeMap::new(),
            timeout: None,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use quay_serve::http::{Header, Request, Status};

    use super::*;

    #[test]
    fn empty_file_is_valid() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.server.bind.is_empty());
        assert!(config.tls.is_none());
        assert_eq!(config.http.root, PathBuf::from("."));
    }

    #[test]
    fn rejects_unknown_settings() {
        let res = toml::from_str::<Config>("[server]\nport = 8000\n");
        assert!(res.is_err());
    }

    #[test]
    fn builds_service_from_settings() {
        let config: Config = toml::from_str(
            r#"
            [http]
            cors = true
            methods = ["put"]
            mime = { dae = "model/vnd.collada+xml" }
            "#,
        )
        .unwrap();
        let http = config.service().unwrap();
        assert!(http.cors_config().allows(Method::Put));
        assert_eq!(
            http.files().mime().get("dae"),
            Some("model/vnd.collada+xml")
        );

        // Preflights are answered by the service
        let req = Request::new().method(Method::Options);
        let res = http.respond(&req);
        assert_eq!(res.status, Some(Status::NoContent));
        assert!(res.headers.contains(Header::AccessControlAllowOrigin));
    }

    #[test]
    fn rejects_unknown_methods() {
        let config: Config =
            toml::from_str("[http]\nmethods = [\"BREW\"]\n").unwrap();
        assert!(config.service().is_err());
    }

    #[test]
    fn binds_configured_listeners() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.server.bind.push(String::from("127.0.0.1:0"));
        config.server.local.push(dir.path().join("quay.sock"));
        let builder = config.apply(Builder::new(Http::new())).unwrap();
        let server = builder.listen().unwrap();
        assert_eq!(server.local_addrs().len(), 2);
    }

    #[test]
    fn reads_configuration_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quay.toml");
        fs::write(
            &path,
            "[server]\nbind = [\"127.0.0.1:0\"]\nsequential = true\n",
        )
        .unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.server.bind, ["127.0.0.1:0"]);
        assert!(config.server.sequential);
    }

    #[test]
    fn reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(dir.path().join("quay.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("could not read"));
    }
}
