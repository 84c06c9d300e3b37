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

//! File streamed as response body.

use std::fs::File;
use std::io::{self, Write};
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::Arc;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Size of chunks read from the file.
const CHUNK_SIZE: usize = 64 * 1024;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// File streamed as response body.
///
/// The file is opened when the response is created, and its length is fixed
/// at that point, since it determines the `Content-Length` header. Its bytes
/// are only read when the response is written, in chunks, so serving a file
/// doesn't require holding it in memory.
#[derive(Clone, Debug)]
pub struct FileBody {
    /// Open file handle.
    file: Arc<File>,
    /// Number of bytes to send.
    len: u64,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl FileBody {
    /// Opens the file at the given path.
    pub fn open<P>(path: P) -> io::Result<Self>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file: Arc::new(file), len })
    }

    /// Returns the number of bytes to send.
    #[inline]
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns whether the file is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copies the file to the given writer.
    ///
    /// Reads are positional, so copying doesn't move the file cursor, and
    /// clones of the same body can be copied independently.
    ///
    /// # Errors
    ///
    /// If the file was truncated after it was opened, an error of kind
    /// [`io::ErrorKind::UnexpectedEof`] is returned, since the announced
    /// length can't be met anymore.
    pub fn copy_to<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: Write + ?Sized,
    {
        let mut buffer = vec![0; CHUNK_SIZE];
        let mut offset = 0;
        while offset < self.len {
            let remaining = self.len - offset;
            let size = usize::try_from(remaining)
                .map_or(CHUNK_SIZE, |remaining| remaining.min(CHUNK_SIZE));
            let read = match self.file.read_at(&mut buffer[..size], offset) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "file was truncated",
                    ));
                }
                Ok(read) => read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                    continue;
                }
                Err(err) => return Err(err),
            };
            writer.write_all(&buffer[..read])?;
            offset += read as u64;
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl PartialEq for FileBody {
    /// Compares file bodies by identity of the open file.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.file, &other.file) && self.len == other.len
    }
}

impl Eq for FileBody {}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn copies_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, vec![7; 100_000]).unwrap();

        // The file is read in chunks while copying
        let body = FileBody::open(&path).unwrap();
        assert_eq!(body.len(), 100_000);
        let mut buffer = Vec::new();
        body.copy_to(&mut buffer).unwrap();
        assert_eq!(buffer, vec![7; 100_000]);

        // Copying again yields the same bytes
        let mut again = Vec::new();
        body.clone().copy_to(&mut again).unwrap();
        assert_eq!(again, buffer);
    }

    #[test]
    fn reports_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, "abcdef").unwrap();
        let body = FileBody::open(&path).unwrap();
        fs::write(&path, "abc").unwrap();

        // The announced length can't be met anymore
        let err = body.copy_to(&mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
