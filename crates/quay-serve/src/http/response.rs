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

//! HTTP response.

use std::fmt;
use std::io::{self, Write};

use super::component::{Header, Status};
use super::headers::Headers;

mod error;
mod ext;
mod file;

pub use error::{Error, Result};
pub use ext::ResponseExt;
pub use file::FileBody;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP response.
///
/// A response starts out unset, i.e., without a status, and is filled in by
/// the handler. If the handler leaves it unset, the HTTP layer answers with
/// "404 Not Found". While all members of this struct are public, there are
/// also some dedicated methods with identical names, providing a builder-like
/// interface, and the [`ResponseExt`] trait provides convenient constructors.
///
/// # Examples
///
/// ```
/// use quay_serve::http::{Header, Response, Status};
///
/// // Create response
/// let res = Response::new()
///     .status(Status::Ok)
///     .header(Header::ContentType, "text/plain")
///     .body("Hello, world!");
/// assert!(res.is_set());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Response {
    /// Response status, if assigned.
    pub status: Option<Status>,
    /// Response headers.
    pub headers: Headers,
    /// Response body.
    pub body: Vec<u8>,
    /// File streamed as response body, taking precedence over `body`.
    pub file: Option<FileBody>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Response {
    /// Creates an unset response.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a status was assigned.
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.status.is_some()
    }

    /// Converts the response into bytes.
    ///
    /// The `Content-Length` header is always derived from the body, or from
    /// the file body, if set, which is not included in the returned bytes, as
    /// it's streamed by [`Response::write_to`]. For statuses that must not
    /// carry a body, the body is dropped. The
    /// connection is always closed after the response, so unless the response
    /// already defines it, e.g., for protocol upgrades, `Connection: close` is
    /// added as well. Responses to `HEAD` requests retain the headers of the
    /// full response, but omit the body.
    ///
    /// # Examples
    ///
    /// ```
    /// use quay_serve::http::{Response, Status};
    ///
    /// // Create response
    /// let res = Response::new()
    ///     .status(Status::Ok)
    ///     .body("Hello, world!");
    ///
    /// // Convert response into bytes
    /// let bytes = res.into_bytes(false);
    /// assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\n"));
    /// assert!(bytes.ends_with(b"\r\n\r\nHello, world!"));
    /// ```
    #[must_use]
    pub fn into_bytes(mut self, head_only: bool) -> Vec<u8> {
        let status = self.status.unwrap_or(Status::NotFound);
        if status.is_bodiless() {
            self.headers.remove(Header::ContentLength);
            self.body.clear();
        } else if let Some(file) = self.file.take() {
            self.headers.insert(Header::ContentLength, file.len());
            self.body.clear();
        } else {
            self.headers.insert(Header::ContentLength, self.body.len());
        }
        if !self.headers.contains(Header::Connection) {
            self.headers.insert(Header::Connection, "close");
        }

        // Compute an estimate for the response size - the status line is at
        // most 48 bytes, and we estimate an average of 64 bytes per header
        let capacity = 48 + self.headers.len() * 64 + 2 + self.body.len();

        // Create pre-sized buffer and append status line and headers
        let mut buffer = Vec::with_capacity(capacity);
        buffer.extend_from_slice(b"HTTP/1.1 ");
        buffer.extend_from_slice(status.to_string().as_bytes());
        buffer.extend_from_slice(b"\r\n");
        for (name, value) in self.headers.iter() {
            buffer.extend_from_slice(name.as_bytes());
            buffer.extend_from_slice(b": ");
            buffer.extend_from_slice(value.as_bytes());
            buffer.extend_from_slice(b"\r\n");
        }

        // Append empty line and body to buffer, if given
        buffer.extend_from_slice(b"\r\n");
        if !head_only {
            buffer.extend_from_slice(&self.body);
        }

        // Return buffer
        buffer
    }

    /// Writes the response to the given writer.
    ///
    /// This is equivalent to writing the result of [`Response::into_bytes`],
    /// except that a file body is streamed after the head, instead of being
    /// read into memory.
    ///
    /// # Errors
    ///
    /// This method returns an error, if writing fails, or a file body can't
    /// be read to the announced length.
    pub fn write_to<W>(
        self, writer: &mut W, head_only: bool,
    ) -> io::Result<()>
    where
        W: Write + ?Sized,
    {
        let file = self.file.clone();
        let bodiless = self.status.is_some_and(|status| status.is_bodiless());
        writer.write_all(&self.into_bytes(head_only))?;
        match file {
            Some(file) if !head_only && !bodiless => file.copy_to(writer),
            _ => Ok(()),
        }
    }

    /// Returns the body, reading a file body into memory.
    ///
    /// # Errors
    ///
    /// This method returns an error, if a file body can't be read.
    pub fn into_body(self) -> io::Result<Vec<u8>> {
        match self.file {
            Some(file) => {
                let mut buffer = Vec::with_capacity(
                    usize::try_from(file.len()).unwrap_or_default(),
                );
                file.copy_to(&mut buffer)?;
                Ok(buffer)
            }
            None => Ok(self.body),
        }
    }
}

impl Response {
    /// Sets the status of the response.
    #[inline]
    #[must_use]
    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Adds a header to the response.
    #[inline]
    #[must_use]
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: AsRef<str>,
        V: ToString,
    {
        self.headers.insert(name, value);
        self
    }

    /// Sets the body of the response.
    ///
    /// The `Content-Length` header is derived from the body when the response
    /// is written, so it doesn't need to be set here.
    #[inline]
    #[must_use]
    pub fn body<B>(mut self, body: B) -> Self
    where
        B: Into<Vec<u8>>,
    {
        self.body = body.into();
        self.file = None;
        self
    }

    /// Sets a file as the body of the response, which is streamed when the
    /// response is written.
    #[inline]
    #[must_use]
    pub fn file(mut self, file: FileBody) -> Self {
        self.body.clear();
        self.file = Some(file);
        self
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl fmt::Display for Response {
    /// Formats the response for display.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP/1.1 {status}\r\n")?,
            None => f.write_str("HTTP/1.1 (unset)\r\n")?,
        }
        write!(f, "{}\r\n", self.headers)?;
        match &self.file {
            Some(file) => write!(f, "[File: {} bytes]\r\n", file.len()),
            None => write!(f, "[Body: {} bytes]\r\n", self.body.len()),
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
    fn unset_response_is_not_found() {
        let bytes = Response::new().into_bytes(false);
        assert!(bytes.starts_with(b"HTTP/1.1 404 Not Found\r\n"));
    }

    #[test]
    fn head_keeps_content_length() {
        let res = Response::new().status(Status::Ok).body("abc");
        let bytes = String::from_utf8(res.into_bytes(true)).unwrap();
        assert!(bytes.contains("Content-Length: 3\r\n"));
        assert!(bytes.ends_with("\r\n\r\n"));
    }

    #[test]
    fn bodiless_status_drops_body() {
        let res = Response::new().status(Status::NotModified).body("abc");
        let bytes = String::from_utf8(res.into_bytes(false)).unwrap();
        assert!(!bytes.contains("Content-Length"));
        assert!(bytes.ends_with("Connection: close\r\n\r\n"));
    }

    #[test]
    fn streams_file_after_head() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, "file content").unwrap();
        let res = Response::new()
            .status(Status::Ok)
            .file(FileBody::open(&path).unwrap());

        // Content length is taken from the file, and the body follows
        let mut buffer = Vec::new();
        res.clone().write_to(&mut buffer, false).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("Content-Length: 12\r\n"));
        assert!(text.ends_with("\r\n\r\nfile content"));

        // Head requests only receive the head
        let mut buffer = Vec::new();
        res.write_to(&mut buffer, true).unwrap();
        assert!(buffer.ends_with(b"\r\n\r\n"));
    }

    #[test]
    fn keeps_connection_header() {
        let res = Response::new()
            .status(Status::SwitchingProtocols)
            .header(Header::Connection, "Upgrade");
        let bytes = String::from_utf8(res.into_bytes(false)).unwrap();
        assert!(bytes.contains("Connection: Upgrade\r\n"));
        assert!(!bytes.contains("close"));
    }
}
