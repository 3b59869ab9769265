//! Fixed-size record decoding.
//!
//! Every structure in an ELF64 file that this crate understands is a
//! fixed-size record. [`decode_records`] bounds-checks a whole run of such
//! records once, up front, and then yields owned copies of each one through
//! a [`RecordIter`]. Nothing returned from here borrows the source buffer.

use core::marker::PhantomData;

use crate::header::ElfError;

/// Byte order of multi-byte fields, as declared by `EI_DATA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    /// `ELFDATA2LSB`.
    #[default]
    Little,
    /// `ELFDATA2MSB`.
    Big,
}

/// Sequential field reader over the bytes of exactly one record.
///
/// Reads advance an internal cursor. The caller guarantees the slice is at
/// least as long as the fields it reads; [`decode_records`] upholds this by
/// handing out slices of exactly [`Record::SIZE`] bytes.
#[derive(Debug)]
pub struct FieldReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> FieldReader<'a> {
    /// Creates a reader positioned at the start of `bytes`.
    #[must_use]
    pub fn new(bytes: &'a [u8], endian: Endian) -> Self {
        Self {
            bytes,
            pos: 0,
            endian,
        }
    }

    /// The byte order fields are read in.
    #[must_use]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    /// Reads `N` raw bytes.
    pub fn bytes<const N: usize>(&mut self) -> [u8; N] {
        self.take()
    }

    /// Reads one byte.
    pub fn u8(&mut self) -> u8 {
        let [b] = self.take::<1>();
        b
    }

    /// Reads a `u16` in the record's byte order.
    pub fn u16(&mut self) -> u16 {
        let b = self.take();
        match self.endian {
            Endian::Little => u16::from_le_bytes(b),
            Endian::Big => u16::from_be_bytes(b),
        }
    }

    /// Reads a `u32` in the record's byte order.
    pub fn u32(&mut self) -> u32 {
        let b = self.take();
        match self.endian {
            Endian::Little => u32::from_le_bytes(b),
            Endian::Big => u32::from_be_bytes(b),
        }
    }

    /// Reads a `u64` in the record's byte order.
    pub fn u64(&mut self) -> u64 {
        let b = self.take();
        match self.endian {
            Endian::Little => u64::from_le_bytes(b),
            Endian::Big => u64::from_be_bytes(b),
        }
    }
}

/// A fixed-size on-disk structure that can be copied out of a buffer.
pub trait Record: Sized {
    /// Size of one record in bytes.
    const SIZE: usize;

    /// Decodes one record. `r` covers exactly [`Self::SIZE`] bytes.
    fn decode(r: &mut FieldReader<'_>) -> Self;
}

/// Converts a file-declared `u64` into a `usize` offset or length.
pub(crate) fn to_usize(value: u64, buffer_len: usize) -> Result<usize, ElfError> {
    usize::try_from(value).map_err(|_| ElfError::OutOfBounds {
        offset: value,
        len: 0,
        buffer_len,
    })
}

/// Checks that `offset..offset + len` lies within a buffer of `buffer_len`
/// bytes and returns the range end.
pub(crate) fn check_range(offset: u64, len: u64, buffer_len: usize) -> Result<usize, ElfError> {
    let Some(end) = offset
        .checked_add(len)
        .filter(|&end| end <= buffer_len as u64)
    else {
        return Err(ElfError::OutOfBounds {
            offset,
            len,
            buffer_len,
        });
    };
    to_usize(end, buffer_len)
}

/// Decodes `count` consecutive `R` records starting at `offset`.
///
/// The whole run is bounds-checked before the iterator is returned, so
/// iteration itself cannot fail.
///
/// # Errors
///
/// Returns [`ElfError::OutOfBounds`] if `offset + count * R::SIZE` overflows
/// or exceeds `data.len()`.
pub fn decode_records<R: Record>(
    data: &[u8],
    offset: u64,
    count: usize,
    endian: Endian,
) -> Result<RecordIter<'_, R>, ElfError> {
    let len = (count as u64)
        .checked_mul(R::SIZE as u64)
        .ok_or(ElfError::OutOfBounds {
            offset,
            len: u64::MAX,
            buffer_len: data.len(),
        })?;
    let end = check_range(offset, len, data.len())?;
    let start = end - count * R::SIZE;
    Ok(RecordIter {
        data: &data[start..end],
        endian,
        remaining: count,
        _record: PhantomData,
    })
}

/// Lazy iterator over a bounds-checked run of records.
pub struct RecordIter<'a, R> {
    data: &'a [u8],
    endian: Endian,
    remaining: usize,
    _record: PhantomData<R>,
}

impl<R: Record> Iterator for RecordIter<'_, R> {
    type Item = R;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let (head, tail) = self.data.split_at(R::SIZE);
        self.data = tail;
        self.remaining -= 1;
        Some(R::decode(&mut FieldReader::new(head, self.endian)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<R: Record> ExactSizeIterator for RecordIter<'_, R> {}
