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

//! HTTP response extensions.

use httpdate::fmt_http_date;
use serde::Serialize;
use std::path::Path;
use std::{fs, io};

use crate::http::{Header, Status};

use super::{FileBody, Response, Result};

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Extension trait for the `Response` type providing additional functionality.
///
/// # Examples
///
/// ```
/// use quay_serve::http::{Header, Response, ResponseExt, Status};
///
/// // Create response from text
/// let res = Response::from_text("Hello, world!");
/// assert_eq!(res.status, Some(Status::Ok));
/// assert_eq!(
///     res.headers.get(Header::ContentType),
///     Some("text/plain; charset=utf-8"),
/// );
/// ```
pub trait ResponseExt: Sized {
    /// Creates a response from a file with the given content type.
    ///
    /// The file is opened right away, but its content is only streamed when
    /// the response is written. The `Last-Modified` header is set from the
    /// file's modification time, if the file system provides it.
    fn from_file<P>(path: P, mime: &str) -> Result<Response>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let meta = fs::metadata(path)?;
        if meta.is_dir() {
            return Err(io::Error::from(io::ErrorKind::IsADirectory).into());
        }
        let res = Response::new()
            .status(Status::Ok)
            .header(Header::ContentType, mime)
            .file(FileBody::open(path)?);

        // Add date of last modification, if applicable
        match meta.modified().map(fmt_http_date) {
            Ok(date) => Ok(res.header(Header::LastModified, date)),
            Err(_) => Ok(res),
        }
    }

    /// Creates a response from plain text.
    fn from_text<S>(content: S) -> Response
    where
        S: Into<String>,
    {
        Response::new() // fmt
            .status(Status::Ok)
            .text(content)
    }

    /// Creates a response from a status code.
    ///
    /// This is a convenience method to create a response with a status code
    /// and a text body, particularly useful for error handling.
    #[must_use]
    fn from_status(status: Status) -> Response {
        Response::new() // fmt
            .status(status)
            .text(status.name())
    }

    /// Creates a redirect response.
    #[must_use]
    fn redirect<L>(location: L) -> Response
    where
        L: ToString,
    {
        Response::new()
            .status(Status::Found)
            .header(Header::Location, location)
    }

    /// Sets the given text as the body of the response.
    fn text<S>(self, content: S) -> Response
    where
        S: Into<String>;

    /// Sets the given HTML as the body of the response.
    fn html<S>(self, content: S) -> Response
    where
        S: Into<String>;

    /// Serializes the given value as the JSON body of the response.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Json`][], if serialization fails.
    ///
    /// [`Error::Json`]: super::Error::Json
    fn json<T>(self, value: &T) -> Result<Response>
    where
        T: Serialize + ?Sized;
}

// ----------------------------------------------------------------------------
// Blanket implementations
// ----------------------------------------------------------------------------

impl ResponseExt for Response {
    /// Sets the given text as the body of the response.
    fn text<S>(self, content: S) -> Response
    where
        S: Into<String>,
    {
        self.header(Header::ContentType, "text/plain; charset=utf-8")
            .body(content.into())
    }

    /// Sets the given HTML as the body of the response.
    fn html<S>(self, content: S) -> Response
    where
        S: Into<String>,
    {
        self.header(Header::ContentType, "text/html; charset=utf-8")
            .body(content.into())
    }

    /// Serializes the given value as the JSON body of the response.
    fn json<T>(self, value: &T) -> Result<Response>
    where
        T: Serialize + ?Sized,
    {
        let content = serde_json::to_vec(value)?;
        Ok(self
            .header(Header::ContentType, "application/json")
            .body(content))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
