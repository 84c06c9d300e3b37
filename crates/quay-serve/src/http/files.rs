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

//! Static file serving.

use httpdate::{fmt_http_date, parse_http_date};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use std::{fs, io};
use tracing::warn;

use super::component::{Header, Method, Status};
use super::mime::MimeTable;
use super::request::Request;
use super::response::{Response, ResponseExt};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Static file serving.
///
/// Request paths are resolved against the root directory lexically, so a path
/// can never escape the root through `..` segments, which are rejected with
/// "403 Forbidden". Since files within the root might still be symbolic links
/// pointing elsewhere, the resolved file is canonicalized and checked again
/// before it is served. Directories are served through their index file.
///
/// If a file can't be found, and the root contains a `404.html` file, it is
/// served with "404 Not Found" instead of the plain status text.
///
/// # Examples
///
/// ```
/// use quay_serve::http::{Method, Request, Response, StaticFiles, Status};
///
/// // Create static files for a directory that doesn't exist
/// let files = StaticFiles::new("/nonexistent");
///
/// // Parent directory traversal is rejected
/// let req = Request::new().uri("/../etc/passwd");
/// let mut res = Response::new();
/// files.serve(&req, &mut res);
/// assert_eq!(res.status, Some(Status::Forbidden));
/// ```
#[derive(Clone, Debug)]
pub struct StaticFiles {
    /// Root directory.
    root: PathBuf,
    /// MIME table.
    mime: MimeTable,
    /// Index file name.
    index: String,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl StaticFiles {
    /// Creates static file serving for the given root directory.
    ///
    /// The root is not required to exist yet, as it's only resolved when
    /// serving requests.
    pub fn new<P>(root: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            root: root.into(),
            mime: MimeTable::default(),
            index: String::from("index.html"),
        }
    }

    /// Sets the root directory.
    pub fn set_root<P>(&mut self, root: P)
    where
        P: Into<PathBuf>,
    {
        self.root = root.into();
    }

    /// Sets the index file name used for directories.
    pub fn set_index<S>(&mut self, index: S)
    where
        S: Into<String>,
    {
        self.index = index.into();
    }

    /// Returns the root directory.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the MIME table.
    #[inline]
    #[must_use]
    pub fn mime(&self) -> &MimeTable {
        &self.mime
    }

    /// Returns the MIME table for registering extensions.
    #[inline]
    pub fn mime_mut(&mut self) -> &mut MimeTable {
        &mut self.mime
    }

    /// Resolves the given request path against the root directory.
    ///
    /// Resolution is purely lexical: empty and `.` segments are skipped, and
    /// `..` segments remove the previous segment. A `..` segment that would
    /// leave the root yields "403 Forbidden", as does a segment containing a
    /// backslash or NUL character, since those can't be part of a portable
    /// file name.
    ///
    /// # Errors
    ///
    /// This method returns the status to answer with, if the path is rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::PathBuf;
    /// use quay_serve::http::{StaticFiles, Status};
    ///
    /// // Create static files
    /// let files = StaticFiles::new("/srv/www");
    ///
    /// // Resolve paths
    /// let path = files.resolve("/docs/../index.html");
    /// assert_eq!(path, Ok(PathBuf::from("/srv/www/index.html")));
    /// assert_eq!(files.resolve("/docs/../../etc"), Err(Status::Forbidden));
    /// ```
    pub fn resolve(&self, path: &str) -> Result<PathBuf, Status> {
        let mut segments = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(Status::Forbidden);
                    }
                }
                _ if segment.contains(['\\', '\0']) => {
                    return Err(Status::Forbidden);
                }
                _ => segments.push(segment),
            }
        }

        // Join segments onto root - as segments can't contain separators or
        // parent references, the result is always located inside the root
        let mut full = self.root.clone();
        full.extend(segments);
        Ok(full)
    }

    /// Serves the file the request path resolves to.
    ///
    /// Only `GET` and `HEAD` are supported, all other methods are answered with
    /// "405 Method Not Allowed". Requests carrying an `If-Modified-Since` date
    /// not older than the file's modification time get "304 Not Modified".
    pub fn serve(&self, req: &Request, res: &mut Response) {
        *res = self.respond(req);
    }

    /// Serves the given file, which must already be resolved.
    ///
    /// The content type is taken from the MIME table, and the `Date` header
    /// is always set, as required by HTTP/1.1.
    pub fn serve_file(&self, req: &Request, res: &mut Response, path: &Path) {
        *res = self.respond_with(req, path);
    }

    /// Creates the response for the given request.
    fn respond(&self, req: &Request) -> Response {
        if !matches!(req.method, Method::Get | Method::Head) {
            return Response::from_status(Status::MethodNotAllowed)
                .header(Header::Allow, "GET, HEAD");
        }

        // Resolve path, and use the index file for directories
        let mut full = match self.resolve(&req.path) {
            Ok(full) => full,
            Err(status) => return Response::from_status(status),
        };
        if req.path.ends_with('/') || full.is_dir() {
            full.push(&self.index);
        }

        // Ensure the file is located inside the root, following symbolic links
        match self.contains(&full) {
            Ok(true) => self.respond_with(req, &full),
            Ok(false) => Response::from_status(Status::Forbidden),
            Err(err) if err.kind() == ErrorKind::NotFound => self.not_found(),
            Err(err) => {
                warn!(path = %full.display(), "could not resolve file: {err}");
                Response::from_status(Status::InternalServerError)
            }
        }
    }

    /// Creates the response for the given file.
    fn respond_with(&self, req: &Request, path: &Path) -> Response {
        let mime = self.mime.resolve(path);
        let res = match Response::from_file(path, mime) {
            Ok(res) => res,
            Err(_) if !path.is_file() => return self.not_found(),
            Err(err) => {
                warn!(path = %path.display(), "could not read file: {err}");
                return Response::from_status(Status::InternalServerError);
            }
        };

        // Ensure a date is always set, as required by HTTP/1.1
        let date = fmt_http_date(SystemTime::now());
        let option = req.headers.get(Header::IfModifiedSince);
        let Ok(header) = option.map(parse_http_date).transpose() else {
            return res.header(Header::Date, date);
        };

        // In case we can both extract the date from the header and the file
        // system lookup is successful, check if we can just return a 304
        if let (Some(since), Ok(meta)) = (header, fs::metadata(path)) {
            if let Ok(mut last) = meta.modified() {
                // Subtract one second to account for rounding issues
                last -= Duration::from_secs(1);
                if since >= last {
                    return Response::new()
                        .status(Status::NotModified)
                        .header(Header::Date, date);
                }
            }
        }

        // Otherwise, return the file
        res.header(Header::Date, date)
    }

    /// Returns whether the given path is located inside the root, after all
    /// symbolic links are resolved.
    fn contains(&self, path: &Path) -> io::Result<bool> {
        let root = self.root.canonicalize()?;
        path.canonicalize().map(|path| path.starts_with(root))
    }

    /// Creates a "404 Not Found" response, using the `404.html` file in the
    /// root, if it exists.
    fn not_found(&self) -> Response {
        let path = self.root.join("404.html");
        let mime = self.mime.resolve(&path);
        match Response::from_file(&path, mime) {
            Ok(res) => res.status(Status::NotFound),
            Err(_) => Response::from_status(Status::NotFound),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn site() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(dir.path().join("docs/index.html"), "<h1>docs</h1>").unwrap();
        fs::write(dir.path().join("style.css"), "body {}").unwrap();
        dir
    }

    fn get(files: &StaticFiles, target: &str) -> Response {
        let req = Request::new().uri(target);
        let mut res = Response::new();
        files.serve(&req, &mut res);
        res
    }

    #[test]
    fn never_resolves_outside_root() {
        let files = StaticFiles::new("/srv/www");
        for path in ["/..", "/a/../..", "/a/b/../../../c", "/../srv/www"] {
            assert_eq!(files.resolve(path), Err(Status::Forbidden));
        }
        for path in ["/a/../b", "/./a/./b/..", "//a//b", "/a/..b"] {
            let full = files.resolve(path).unwrap();
            assert!(full.starts_with("/srv/www"));
        }
    }

    #[test]
    fn serves_index_files() {
        let dir = site();
        let files = StaticFiles::new(dir.path());
        for (target, content) in [
            ("/", "<h1>home</h1>"),
            ("/docs", "<h1>docs</h1>"),
            ("/docs/", "<h1>docs</h1>"),
        ] {
            let body = get(&files, target).into_body().unwrap();
            assert_eq!(body, content.as_bytes());
        }
    }

    #[test]
    fn sets_content_type_and_date() {
        let dir = site();
        let files = StaticFiles::new(dir.path());
        let res = get(&files, "/style.css");
        assert_eq!(res.status, Some(Status::Ok));
        assert_eq!(
            res.headers.get(Header::ContentType),
            Some("text/css; charset=utf-8")
        );
        assert!(res.headers.contains(Header::Date));
    }

    #[test]
    fn serves_custom_not_found_page() {
        let dir = site();
        let files = StaticFiles::new(dir.path());
        assert_eq!(get(&files, "/missing").status, Some(Status::NotFound));

        // Once the page exists, it's used as body
        fs::write(dir.path().join("404.html"), "gone").unwrap();
        let res = get(&files, "/missing");
        assert_eq!(res.status, Some(Status::NotFound));
        assert_eq!(res.into_body().unwrap(), b"gone");
    }

    #[test]
    fn answers_fresh_copies_with_not_modified() {
        let dir = site();
        let files = StaticFiles::new(dir.path());
        let date = fmt_http_date(SystemTime::now() + Duration::from_secs(60));
        let req = Request::new()
            .uri("/style.css")
            .header(Header::IfModifiedSince, date);
        let mut res = Response::new();
        files.serve(&req, &mut res);
        assert_eq!(res.status, Some(Status::NotModified));
    }

    #[test]
    fn rejects_other_methods() {
        let dir = site();
        let files = StaticFiles::new(dir.path());
        let req = Request::new().method(Method::Delete).uri("/style.css");
        let mut res = Response::new();
        files.serve(&req, &mut res);
        assert_eq!(res.status, Some(Status::MethodNotAllowed));
        assert_eq!(res.headers.get(Header::Allow), Some("GET, HEAD"));
    }

    #[test]
    fn rejects_symlinks_leaving_root() {
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), "secret").unwrap();
        let dir = site();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            dir.path().join("link.txt"),
        )
        .unwrap();

        // Link resolves to a file outside of the root
        let files = StaticFiles::new(dir.path());
        let res = get(&files, "/link.txt");
        assert_eq!(res.status, Some(Status::Forbidden));
    }
}
