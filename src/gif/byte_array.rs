// src/gif/byte_array.rs

//! An append-only byte sink that grows in fixed-size pages.
//!
//! Growing a single `Vec` for a multi-megabyte recording would copy the whole
//! buffer on every reallocation. Pages are never moved once allocated; the
//! final output is the list of pages, which can be handed to another thread
//! without copying their contents.

use std::io::{self, Write};

/// Size of each page in bytes.
pub const PAGE_SIZE: usize = 4096;

/// One fixed-size block of output.
pub type Page = Box<[u8; PAGE_SIZE]>;

/// Paged, append-only byte buffer.
pub struct ByteArray {
    pages: Vec<Page>,
    cursor: usize,
}

impl ByteArray {
    pub fn new() -> Self {
        let mut array = ByteArray {
            pages: Vec::new(),
            cursor: 0,
        };
        array.new_page();
        array
    }

    fn new_page(&mut self) {
        self.pages.push(Box::new([0u8; PAGE_SIZE]));
        self.cursor = 0;
    }

    #[inline]
    pub fn write_byte(&mut self, value: u8) {
        if self.cursor >= PAGE_SIZE {
            self.new_page();
        }
        // A page is always present after construction.
        let last = self.pages.len() - 1;
        self.pages[last][self.cursor] = value;
        self.cursor += 1;
    }

    /// Appends every byte of `data`.
    pub fn write_bytes(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            if self.cursor >= PAGE_SIZE {
                self.new_page();
            }
            let room = PAGE_SIZE - self.cursor;
            let n = room.min(data.len());
            let last = self.pages.len() - 1;
            self.pages[last][self.cursor..self.cursor + n].copy_from_slice(&data[..n]);
            self.cursor += n;
            data = &data[n..];
        }
    }

    /// Appends `length` bytes of `data` starting at `offset`, clamped to the slice.
    pub fn write_bytes_range(&mut self, data: &[u8], offset: usize, length: usize) {
        let start = offset.min(data.len());
        let end = start.saturating_add(length).min(data.len());
        self.write_bytes(&data[start..end]);
    }

    /// Writes each character's code point truncated to one byte.
    ///
    /// Only meant for 7-bit tags such as `GIF89a` or `NETSCAPE2.0`.
    pub fn write_ascii(&mut self, s: &str) {
        for c in s.chars() {
            self.write_byte(c as u32 as u8);
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        (self.pages.len() - 1) * PAGE_SIZE + self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All pages; only the last one may be partially filled (its tail is zero).
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Consumes the buffer, returning its pages and the true byte length.
    pub fn into_pages(self) -> (Vec<Page>, usize) {
        let len = self.len();
        (self.pages, len)
    }

    /// Concatenates the pages, truncated to the bytes actually written.
    pub fn to_vec(&self) -> Vec<u8> {
        concat_pages(&self.pages, self.len())
    }
}

impl Default for ByteArray {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for ByteArray {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Joins `pages` into one buffer of `len` bytes.
pub fn concat_pages(pages: &[Page], len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    for page in pages {
        let take = (len - out.len()).min(PAGE_SIZE);
        out.extend_from_slice(&page[..take]);
        if out.len() == len {
            break;
        }
    }
    out
}
