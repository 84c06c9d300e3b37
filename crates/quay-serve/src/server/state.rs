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

//! Server state.

use std::fmt;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Server state.
///
/// A server is `Created` without listeners, and becomes `Bound` with the first
/// successful bind. Starting it moves it to `Running`, and stopping it first
/// to `StopRequested`, and then to `Stopped`, once the accept loop observed
/// the request and exited. A stopped server can be started again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// No listener bound yet.
    Created,
    /// At least one listener bound.
    Bound,
    /// Accept loop running.
    Running,
    /// Accept loop asked to exit.
    StopRequested,
    /// Accept loop exited.
    Stopped,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl State {
    /// Returns whether the accept loop is active.
    ///
    /// # Examples
    ///
    /// ```
    /// use quay_serve::server::State;
    ///
    /// // Check whether states are active
    /// assert!(State::StopRequested.is_active());
    /// assert!(!State::Stopped.is_active());
    /// ```
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, State::Running | State::StopRequested)
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl fmt::Display for State {
    /// Formats the state for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            State::Created => "created",
            State::Bound => "bound",
            State::Running => "running",
            State::StopRequested => "stop requested",
            State::Stopped => "stopped",
        })
    }
}
