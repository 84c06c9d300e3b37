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

//! MIME table.

use std::collections::HashMap;
use std::path::Path;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Content type for unmapped extensions.
pub const DEFAULT: &str = "application/octet-stream";

/// Pre-registered content types.
const TYPES: &[(&str, &str)] = &[
    ("css", "text/css; charset=utf-8"),
    ("csv", "text/csv; charset=utf-8"),
    ("gif", "image/gif"),
    ("htm", "text/html; charset=utf-8"),
    ("html", "text/html; charset=utf-8"),
    ("ico", "image/x-icon"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "text/javascript; charset=utf-8"),
    ("json", "application/json"),
    ("map", "application/json"),
    ("md", "text/markdown; charset=utf-8"),
    ("mjs", "text/javascript; charset=utf-8"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("txt", "text/plain; charset=utf-8"),
    ("wasm", "application/wasm"),
    ("webm", "video/webm"),
    ("webp", "image/webp"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
];

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// MIME table.
///
/// The table maps lowercase file extensions to content types. It comes with
/// a handful of common types pre-registered, and is meant to be extended at
/// configuration time, after which it's only consulted read-only.
///
/// # Examples
///
/// ```
/// use quay_serve::http::MimeTable;
///
/// // Create table and register extension
/// let mut mime = MimeTable::default();
/// mime.register("dae", "model/vnd.collada+xml");
///
/// // Resolve content types from paths
/// assert_eq!(mime.resolve("scene.DAE"), "model/vnd.collada+xml");
/// assert_eq!(mime.resolve("scene.blend"), "application/octet-stream");
/// ```
#[derive(Clone, Debug)]
pub struct MimeTable {
    /// Map of extensions to content types.
    inner: HashMap<String, String>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl MimeTable {
    /// Creates an empty MIME table.
    ///
    /// Use [`MimeTable::default`] for a table with common types registered.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: HashMap::new() }
    }

    /// Registers a content type for the given extension.
    ///
    /// The extension is case-insensitive, and a leading dot is ignored. If the
    /// extension was already registered, its content type is replaced.
    pub fn register<E, T>(&mut self, ext: E, mime: T)
    where
        E: AsRef<str>,
        T: Into<String>,
    {
        let ext = ext.as_ref().trim_start_matches('.');
        self.inner.insert(ext.to_ascii_lowercase(), mime.into());
    }

    /// Returns the content type registered for the given extension.
    #[must_use]
    pub fn get<E>(&self, ext: E) -> Option<&str>
    where
        E: AsRef<str>,
    {
        let ext = ext.as_ref().trim_start_matches('.');
        self.inner
            .get(&ext.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Resolves the content type for the given path.
    ///
    /// Paths without extension, or with an unregistered extension, resolve to
    /// the generic binary content type.
    #[must_use]
    pub fn resolve<P>(&self, path: P) -> &str
    where
        P: AsRef<Path>,
    {
        let ext = path.as_ref().extension().and_then(|ext| ext.to_str());
        ext.and_then(|ext| self.get(ext)).unwrap_or(DEFAULT)
    }
}

#[allow(clippy::must_use_candidate)]
impl MimeTable {
    /// Returns the number of registered extensions.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns whether there are any registered extensions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Default for MimeTable {
    /// Creates a MIME table with common types registered.
    fn default() -> Self {
        let mut table = Self::new();
        for (ext, mime) in TYPES {
            table.register(ext, *mime);
        }
        table
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_leading_dot() {
        let mut mime = MimeTable::new();
        mime.register(".GLB", "model/gltf-binary");
        assert_eq!(mime.get("glb"), Some("model/gltf-binary"));
    }

    #[test]
    fn replaces_registered_type() {
        let mut mime = MimeTable::default();
        mime.register("js", "application/javascript");
        assert_eq!(mime.resolve("/app.js"), "application/javascript");
    }

    #[test]
    fn resolves_paths_without_extension() {
        let mime = MimeTable::default();
        assert_eq!(mime.resolve("/LICENSE"), DEFAULT);
    }
}
