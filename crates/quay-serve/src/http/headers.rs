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

//! HTTP headers.

use std::fmt;
use std::slice::Iter;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP headers.
///
/// The header map is shared by requests and responses. Names are compared
/// case-insensitively, but the spelling under which a header was inserted
/// first is preserved, so it's also used when writing the header. Lookups
/// accept anything that converts into a string, which includes the [`Header`]
/// component as well as arbitrary names.
///
/// Headers are kept in insertion order, since there are only ever a handful
/// of them, which makes a linear scan cheaper than hashing.
///
/// [`Header`]: crate::http::Header
///
/// # Examples
///
/// ```
/// use quay_serve::http::{Header, Headers};
///
/// // Create header map and add header
/// let mut headers = Headers::new();
/// headers.insert(Header::ContentType, "text/plain");
///
/// // Obtain header value, regardless of spelling
/// assert_eq!(headers.get("content-type"), Some("text/plain"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    /// List of name-value pairs.
    inner: Vec<(String, String)>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Headers {
    /// Creates a header map.
    ///
    /// # Examples
    ///
    /// ```
    /// use quay_serve::http::Headers;
    ///
    /// // Create header map
    /// let headers = Headers::new();
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for the given header.
    ///
    /// # Examples
    ///
    /// ```
    /// use quay_serve::http::{Header, Headers};
    ///
    /// // Create header map and add header
    /// let mut headers = Headers::new();
    /// headers.insert("X-Request-Id", "42");
    ///
    /// // Obtain reference to header value
    /// assert_eq!(headers.get("x-request-id"), Some("42"));
    /// ```
    #[must_use]
    pub fn get<K>(&self, name: K) -> Option<&str>
    where
        K: AsRef<str>,
    {
        self.position(name.as_ref())
            .map(|n| self.inner[n].1.as_str())
    }

    /// Returns whether the header is contained.
    #[inline]
    #[must_use]
    pub fn contains<K>(&self, name: K) -> bool
    where
        K: AsRef<str>,
    {
        self.position(name.as_ref()).is_some()
    }

    /// Updates the given header.
    ///
    /// If the header is already present, its value is replaced, but the name
    /// retains its original spelling.
    ///
    /// # Examples
    ///
    /// ```
    /// use quay_serve::http::{Header, Headers};
    ///
    /// // Create header map and add header twice
    /// let mut headers = Headers::new();
    /// headers.insert("content-type", "text/plain");
    /// headers.insert(Header::ContentType, "text/html");
    ///
    /// // Only the last value is kept
    /// assert_eq!(headers.len(), 1);
    /// assert_eq!(headers.get(Header::ContentType), Some("text/html"));
    /// ```
    pub fn insert<K, V>(&mut self, name: K, value: V)
    where
        K: AsRef<str>,
        V: ToString,
    {
        let name = name.as_ref();
        let value = value.to_string();
        match self.position(name) {
            Some(n) => self.inner[n].1 = value,
            None => self.inner.push((name.to_string(), value)),
        }
    }

    /// Removes the given header, returning its value.
    pub fn remove<K>(&mut self, name: K) -> Option<String>
    where
        K: AsRef<str>,
    {
        self.position(name.as_ref())
            .map(|n| self.inner.remove(n).1)
    }

    /// Returns an iterator over all headers.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.into_iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the index of the given header.
    fn position(&self, name: &str) -> Option<usize> {
        self.inner
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }
}

#[allow(clippy::must_use_candidate)]
impl Headers {
    /// Returns the number of headers.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns whether there are any headers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: AsRef<str>,
    V: ToString,
{
    /// Creates a header map from an iterator.
    ///
    /// # Examples
    ///
    /// ```
    /// use quay_serve::http::{Header, Headers};
    ///
    /// // Create header map from iterator
    /// let headers = Headers::from_iter([
    ///     (Header::Accept, "text/plain"),
    ///     (Header::Host, "localhost"),
    /// ]);
    /// ```
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
    {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a (String, String);
    type IntoIter = Iter<'a, (String, String)>;

    /// Returns an iterator over all headers.
    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

// ----------------------------------------------------------------------------

impl fmt::Display for Headers {
    /// Formats the header map for display.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (name, value) in &self.inner {
            f.write_str(name)?;
            f.write_str(": ")?;
            f.write_str(value)?;
            f.write_str("\r\n")?;
        }

        // No errors occurred
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
