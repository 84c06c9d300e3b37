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

//! Cross-origin resource sharing.

use super::component::{Header, Method, Status};
use super::response::Response;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Cross-origin resource sharing.
///
/// When enabled, OPTIONS preflights are answered directly from this policy,
/// bypassing the handler, and every response carries the configured headers.
/// The advertised methods default to GET, HEAD, POST and OPTIONS, and can be
/// extended, as can the allowed request headers.
///
/// # Examples
///
/// ```
/// use quay_serve::http::{Cors, Header, Method};
///
/// // Create policy and advertise additional method
/// let cors = Cors::default().enable(true).method(Method::Put);
///
/// // Create preflight response
/// let res = cors.preflight();
/// assert_eq!(
///     res.headers.get(Header::AccessControlAllowMethods),
///     Some("GET, HEAD, POST, OPTIONS, PUT"),
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cors {
    /// Whether cross-origin support is enabled.
    enabled: bool,
    /// Allowed origin.
    origin: String,
    /// Advertised methods.
    methods: Vec<Method>,
    /// Allowed request headers.
    headers: Vec<String>,
    /// Lifetime of preflight results in seconds.
    max_age: Option<u32>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Cors {
    /// Enables or disables cross-origin support.
    #[must_use]
    pub fn enable(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the allowed origin.
    #[must_use]
    pub fn origin<O>(mut self, origin: O) -> Self
    where
        O: Into<String>,
    {
        self.origin = origin.into();
        self
    }

    /// Adds a method to the advertised methods.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
        self
    }

    /// Adds a header to the allowed request headers.
    #[must_use]
    pub fn header<H>(mut self, name: H) -> Self
    where
        H: AsRef<str>,
    {
        let name = name.as_ref();
        let mut iter = self.headers.iter();
        if !iter.any(|header| header.eq_ignore_ascii_case(name)) {
            self.headers.push(name.to_string());
        }
        self
    }

    /// Sets the lifetime of preflight results, or omits it.
    #[must_use]
    pub fn max_age(mut self, seconds: Option<u32>) -> Self {
        self.max_age = seconds;
        self
    }

    /// Returns whether cross-origin support is enabled.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns whether the given method is advertised.
    #[inline]
    #[must_use]
    pub fn allows(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }

    /// Creates the answer to a preflight.
    ///
    /// The answer is "204 No Content" with all configured headers, including
    /// the lifetime of the preflight result, if any.
    #[must_use]
    pub fn preflight(&self) -> Response {
        let mut res = Response::new().status(Status::NoContent);
        self.apply(&mut res);
        if let Some(seconds) = self.max_age {
            res.headers.insert(Header::AccessControlMaxAge, seconds);
        }
        res
    }

    /// Decorates the given response with the configured headers.
    pub fn apply(&self, res: &mut Response) {
        let methods = self.methods.iter().map(Method::name);
        let methods = methods.collect::<Vec<_>>().join(", ");
        res.headers
            .insert(Header::AccessControlAllowOrigin, &self.origin);
        res.headers
            .insert(Header::AccessControlAllowMethods, methods);
        res.headers
            .insert(Header::AccessControlAllowHeaders, self.headers.join(", "));
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Default for Cors {
    /// Creates a disabled policy with default methods and headers.
    fn default() -> Self {
        let headers = ["Content-Type", "Authorization", "X-Requested-With"];
        Self {
            enabled: false,
            origin: String::from("*"),
            methods: vec![
                Method::Get,
                Method::Head,
                Method::Post,
                Method::Options,
            ],
            headers: headers.map(String::from).to_vec(),
            max_age: Some(86_400),
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
    fn preflight_advertises_registered_methods() {
        let res = Cors::default().enable(true).preflight();
        assert_eq!(res.status, Some(Status::NoContent));
        assert_eq!(
            res.headers.get(Header::AccessControlAllowMethods),
            Some("GET, HEAD, POST, OPTIONS")
        );
        assert_eq!(res.headers.get(Header::AccessControlMaxAge), Some("86400"));
    }

    #[test]
    fn deduplicates_headers() {
        let cors = Cors::default().header("content-type").header("X-Api-Key");
        let mut res = Response::new();
        cors.apply(&mut res);
        assert_eq!(
            res.headers.get(Header::AccessControlAllowHeaders),
            Some("Content-Type, Authorization, X-Requested-With, X-Api-Key")
        );
    }
}
