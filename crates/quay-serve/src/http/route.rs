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

//! Route pattern.

use std::fmt;
use std::str::FromStr;

use super::component::Method;

mod error;

pub use error::{Error, Result};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Wildcard marker.
const WILDCARD: char = '*';

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Route pattern.
///
/// A route pattern is a method plus a path template, which may end in a single
/// wildcard marker `*`. Without a wildcard, the template must match the path
/// exactly. With a wildcard, everything before it must be a prefix of the
/// path, and the remaining suffix is captured, e.g., for parameterized routes.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use quay_serve::http::{Method, RoutePattern};
///
/// // Create route pattern
/// let pattern = RoutePattern::new(Method::Get, "/api/clients/*")?;
///
/// // Match paths against pattern
/// let capture = pattern.matches(Method::Get, "/api/clients/132337");
/// assert_eq!(capture, Some("132337"));
/// assert_eq!(pattern.matches(Method::Get, "/api/other/1"), None);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutePattern {
    /// Route method.
    method: Method,
    /// Path template.
    template: String,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl RoutePattern {
    /// Creates a route pattern.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Wildcard`], if the template contains a
    /// wildcard marker anywhere but at the very end, and [`Error::Path`], if
    /// the template doesn't start with a slash.
    pub fn new<T>(method: Method, template: T) -> Result<Self>
    where
        T: Into<String>,
    {
        let template = template.into();
        if !template.starts_with('/') {
            return Err(Error::Path(template));
        }

        // Only a single, trailing wildcard is allowed
        let body = template.strip_suffix(WILDCARD).unwrap_or(&template);
        if body.contains(WILDCARD) {
            return Err(Error::Wildcard(template));
        }
        Ok(Self { method, template })
    }

    /// Matches the given method and path, returning the captured suffix.
    #[must_use]
    pub fn matches<'a>(
        &self, method: Method, path: &'a str,
    ) -> Option<&'a str> {
        if self.method == method {
            capture(&self.template, path)
        } else {
            None
        }
    }

    /// Returns the route method.
    #[inline]
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the path template.
    #[inline]
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl FromStr for RoutePattern {
    type Err = Error;

    /// Attempts to create a route pattern from a string.
    ///
    /// The string consists of method and template separated by whitespace.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use quay_serve::http::{Method, RoutePattern};
    ///
    /// // Create route pattern from string
    /// let pattern: RoutePattern = "GET /assets/*".parse()?;
    /// assert_eq!(pattern.method(), Method::Get);
    /// # Ok(())
    /// # }
    /// ```
    fn from_str(value: &str) -> Result<Self> {
        let Some((method, template)) = value.trim().split_once(' ') else {
            return Err(Error::Path(value.to_string()));
        };
        RoutePattern::new(method.parse()?, template.trim_start())
    }
}

// ----------------------------------------------------------------------------

impl fmt::Display for RoutePattern {
    /// Formats the route pattern for display.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.method, self.template)
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Matches the given path against a template, returning the captured suffix.
///
/// A wildcard marker that is not trailing is compared verbatim, so ad-hoc
/// patterns that were never validated can't match more than they say.
pub(crate) fn capture<'a>(template: &str, path: &'a str) -> Option<&'a str> {
    match template.strip_suffix(WILDCARD) {
        Some(prefix) => path.strip_prefix(prefix),
        None => (template == path).then_some(""),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_exact_template() {
        let pattern = RoutePattern::new(Method::Get, "/health").unwrap();
        assert_eq!(pattern.matches(Method::Get, "/health"), Some(""));
        assert_eq!(pattern.matches(Method::Get, "/health/"), None);
        assert_eq!(pattern.matches(Method::Head, "/health"), None);
    }

    #[test]
    fn captures_empty_suffix() {
        assert_eq!(capture("/api/clients/*", "/api/clients/"), Some(""));
        assert_eq!(capture("/api/clients/*", "/api/clients"), None);
    }

    #[test]
    fn rejects_inner_wildcard() {
        let res = RoutePattern::new(Method::Get, "/api/*/items");
        assert!(matches!(res, Err(Error::Wildcard(_))));
        let res = RoutePattern::new(Method::Get, "/api/**");
        assert!(matches!(res, Err(Error::Wildcard(_))));
    }

    #[test]
    fn rejects_relative_template() {
        let res = RoutePattern::new(Method::Get, "api/*");
        assert!(matches!(res, Err(Error::Path(_))));
    }
}
