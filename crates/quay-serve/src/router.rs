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

//! Router.

use std::collections::BTreeMap;

use crate::http::{Handler, Method, Request, Response, StaticFiles};

mod action;
mod error;
mod params;

pub use action::Action;
pub use error::{Error, Result};
pub use params::Params;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Router.
///
/// Routers scope actions to a combination of HTTP method and path pattern.
/// Patterns are matched with the [`matchit`] crate, so they can contain named
/// segments like `/users/{id}` and a trailing catch-all like `/assets/{*path}`,
/// whose values are passed to the action as [`Params`].
///
/// Routers are [`Handler`] implementations, so they can be used with an
/// [`Http`][] service right away. Requests that don't match any route are
/// served from the static files of the service.
///
/// [`Http`]: crate::http::Http
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use quay_serve::http::{Http, Request, Response, ResponseExt};
/// use quay_serve::router::{Params, Router};
///
/// // Create router and add route
/// let router = Router::new()
///     .get(
///         "/users/{id}",
///         |_: &Request, res: &mut Response, params: &Params| {
///             let id = params.get("id").unwrap_or_default();
///             *res = Response::from_text(format!("user {id}"));
///         },
///     )?;
///
/// // Create service with router
/// let http = Http::with_handler(router);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Router {
    /// Map methods to routes.
    routes: BTreeMap<Method, matchit::Router<Box<dyn Action>>>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Router {
    /// Creates a router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `GET` route to the router.
    ///
    /// # Errors
    ///
    /// This method returns the errors of [`Router::route`].
    #[inline]
    pub fn get<P, A>(self, path: P, action: A) -> Result<Self>
    where
        P: AsRef<str>,
        A: Action,
    {
        self.route(Method::Get, path, action)
    }

    /// Adds a `POST` route to the router.
    ///
    /// # Errors
    ///
    /// This method returns the errors of [`Router::route`].
    #[inline]
    pub fn post<P, A>(self, path: P, action: A) -> Result<Self>
    where
        P: AsRef<str>,
        A: Action,
    {
        self.route(Method::Post, path, action)
    }

    /// Adds a `PUT` route to the router.
    ///
    /// # Errors
    ///
    /// This method returns the errors of [`Router::route`].
    #[inline]
    pub fn put<P, A>(self, path: P, action: A) -> Result<Self>
    where
        P: AsRef<str>,
        A: Action,
    {
        self.route(Method::Put, path, action)
    }

    /// Adds a `DELETE` route to the router.
    ///
    /// # Errors
    ///
    /// This method returns the errors of [`Router::route`].
    #[inline]
    pub fn delete<P, A>(self, path: P, action: A) -> Result<Self>
    where
        P: AsRef<str>,
        A: Action,
    {
        self.route(Method::Delete, path, action)
    }

    /// Adds a route to the router.
    ///
    /// Routes must start with a slash, and must not end with one, unless they
    /// denote the root path, as trailing slashes are removed from request
    /// paths before matching.
    ///
    /// # Errors
    ///
    /// This method returns [`Error::Path`], if the route is not a valid path,
    /// and [`Error::Insert`], if it conflicts with an existing route.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use quay_serve::http::{Method, Request, Response, ResponseExt};
    /// use quay_serve::router::{Params, Router};
    ///
    /// // Create router and add route
    /// let router = Router::new().route(
    ///     Method::Patch,
    ///     "/items/{id}",
    ///     |_: &Request, res: &mut Response, _: &Params| {
    ///         *res = Response::from_text("patched");
    ///     },
    /// )?;
    ///
    /// // Adding the same route again fails
    /// let res = router.route(
    ///     Method::Patch,
    ///     "/items/{id}",
    ///     |_: &Request, _: &mut Response, _: &Params| {},
    /// );
    /// assert!(res.is_err());
    /// # Ok(())
    /// # }
    /// ```
    pub fn route<P, A>(
        mut self, method: Method, path: P, action: A,
    ) -> Result<Self>
    where
        P: AsRef<str>,
        A: Action,
    {
        let path = path.as_ref();
        if !path.starts_with('/') || (path.len() > 1 && path.ends_with('/')) {
            return Err(Error::Path(path.to_string()));
        }

        // Add route to the routes of the method, which fails if the route is
        // malformed, or overlaps with another route
        let routes = self.routes.entry(method).or_default();
        routes.insert(path, Box::new(action) as Box<dyn Action>)?;
        Ok(self)
    }

    /// Attempts to handle the given request with a matching route, returning
    /// whether a route matched.
    ///
    /// `HEAD` requests fall back to `GET` routes, if no `HEAD` route exists,
    /// as the HTTP layer omits the body when writing the response.
    pub fn dispatch(&self, req: &Request, res: &mut Response) -> bool {
        let routes = match self.routes.get(&req.method) {
            Some(routes) => Some(routes),
            None if req.method == Method::Head => {
                self.routes.get(&Method::Get)
            }
            None => None,
        };
        let Some(routes) = routes else {
            return false;
        };

        // Canonicalize the path by removing the trailing slash if it's not
        // the root path, as the matcher doesn't support optional slashes
        let path = if req.path == "/" {
            req.path.as_str()
        } else {
            req.path.trim_end_matches('/')
        };

        // Resolve the path, and invoke the action if it matches
        match routes.at(path) {
            Ok(route) => {
                let params = Params::new(route.params);
                route.value.handle(req, res, &params);
                true
            }
            Err(_) => false,
        }
    }
}

#[allow(clippy::must_use_candidate)]
impl Router {
    /// Returns the number of methods with routes.
    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns whether there are any routes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Handler for Router {
    /// Handles the given request with a matching route, or serves it from the
    /// static files, if no route matches.
    fn serve(&self, req: &Request, res: &mut Response, files: &StaticFiles) {
        if !self.dispatch(req, res) {
            files.serve(req, res);
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
