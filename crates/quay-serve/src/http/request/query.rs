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

//! HTTP query string.

use std::fmt;

use super::encoding::{decode, encode};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP query string.
///
/// When parsing a query string with [`Query::from`], keys and values are
/// percent-decoded and stored in a parameter list, as query strings might
/// have multiple values for the same key, and ordering always needs to be
/// preserved when formatting with [`fmt::Display`].
///
/// # Examples
///
/// ```
/// use quay_serve::http::Query;
///
/// // Create query string from string
/// let query = Query::from("id=12&name=caf%C3%A9+au+lait");
/// assert_eq!(query.get("id"), Some("12"));
/// assert_eq!(query.get("name"), Some("café au lait"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    /// List of parameters.
    inner: Vec<(String, String)>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Query {
    /// Creates a query string.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the first parameter value for the given key.
    ///
    /// If the parameter appears multiple times in the query string, only the
    /// first value is returned. Use [`Query::get_all`] to retrieve all values.
    pub fn get<K>(&self, key: K) -> Option<&str>
    where
        K: AsRef<str>,
    {
        self.get_all(key).next()
    }

    /// Returns an iterator over all parameter values for the given key.
    ///
    /// # Examples
    ///
    /// ```
    /// use quay_serve::http::Query;
    ///
    /// // Create query string with repeated parameter
    /// let query = Query::from("tag=a&tag=b");
    ///
    /// // Collect parameter values
    /// let tags = query.get_all("tag").collect::<Vec<_>>();
    /// assert_eq!(tags, ["a", "b"]);
    /// ```
    pub fn get_all<K>(&self, key: K) -> impl Iterator<Item = &str>
    where
        K: AsRef<str>,
    {
        self.inner.iter().filter_map(move |(name, value)| {
            (name == key.as_ref()).then_some(value.as_str())
        })
    }

    /// Returns whether the parameter is contained.
    pub fn contains<K>(&self, key: K) -> bool
    where
        K: AsRef<str>,
    {
        self.inner.iter().any(|(name, _)| name == key.as_ref())
    }

    /// Adds the given key-value pair as a parameter.
    pub fn add<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.inner.push((key.into(), value.into()));
    }

    /// Removes the given parameter.
    pub fn remove<K>(&mut self, key: K)
    where
        K: AsRef<str>,
    {
        self.inner.retain(|(name, _)| name != key.as_ref());
    }
}

#[allow(clippy::must_use_candidate)]
impl Query {
    /// Returns the number of parameters.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns whether there are any parameters.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl From<&str> for Query {
    /// Creates a query string from a string.
    ///
    /// The string is expected to be a sequence of key-value pairs connected
    /// with `&`, with the initial `?` separator removed. Empty pairs are
    /// skipped, and a key without `=` is stored with an empty value.
    fn from(value: &str) -> Self {
        let iter = value.split('&').filter(|pair| !pair.is_empty());
        iter.map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode(key), decode(value)),
            None => (decode(pair), String::new()),
        })
        .collect()
    }
}

// ----------------------------------------------------------------------------

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<String>,
{
    /// Creates a query string from an iterator.
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
    {
        let mut query = Query::new();
        for (key, value) in iter {
            query.add(key, value);
        }
        query
    }
}

// ----------------------------------------------------------------------------

impl fmt::Display for Query {
    /// Formats the query string for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.inner.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }

            // Write parameter key and value, if any
            f.write_str(encode(key).as_ref())?;
            if !value.is_empty() {
                f.write_str("=")?;
                f.write_str(encode(value).as_ref())?;
            }
        }

        // No errors occurred
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keys_without_values() {
        let query = Query::from("debug&&page=2&");
        assert_eq!(query.len(), 2);
        assert!(query.contains("debug"));
        assert_eq!(query.get("debug"), Some(""));
        assert_eq!(query.get("page"), Some("2"));
    }

    #[test]
    fn keeps_equal_signs_in_values() {
        let query = Query::from("expr=a=b");
        assert_eq!(query.get("expr"), Some("a=b"));
    }

    #[test]
    fn formats_in_order() {
        let query = Query::from("b=2&a=1&flag");
        assert_eq!(query.to_string(), "b=2&a=1&flag");
    }
}
