#![deny(missing_docs)]

//! Write binary data
//!
//! The writer is the mirror image of [`read`](crate::binary::read). It is used to assemble
//! layout tables in memory, with placeholders standing in for offsets that are only known once
//! the referenced table has been written.

use std::marker::PhantomData;

use crate::binary::{I16Be, U16Be, U32Be, U8};
use crate::error::WriteError;

/// An in-memory buffer that implements `WriteContext`.
#[derive(Default)]
pub struct WriteBuffer {
    data: Vec<u8>,
}

struct WriteSlice<'a> {
    offset: usize,
    data: &'a mut [u8],
}

/// A placeholder for a value that will be filled in later using WriteContext::write_placeholder
pub struct Placeholder<T, HostType>
where
    T: WriteBinary<HostType>,
{
    offset: usize,
    length: usize,
    marker: PhantomData<T>,
    host: PhantomData<HostType>,
}

/// Trait that describes a type that can be written to a `WriteContext` in binary form.
pub trait WriteBinary<HostType = Self> {
    /// The type of the value returned by `write`.
    type Output;

    /// Write the binary representation of Self to `ctxt`.
    fn write<C: WriteContext>(ctxt: &mut C, val: HostType) -> Result<Self::Output, WriteError>;
}

/// A fixed-size value that a placeholder can be reserved for.
pub trait FixedSize {
    /// Number of bytes the value occupies when written.
    const SIZE: usize;
}

/// Trait for types that can have binary data written to them.
pub trait WriteContext {
    /// Write the values produced by an iterator into a `WriteContext`.
    fn write_iter<T, HostType>(
        &mut self,
        iter: impl Iterator<Item = HostType>,
    ) -> Result<(), WriteError>
    where
        Self: Sized,
        T: WriteBinary<HostType>,
    {
        for val in iter {
            T::write(self, val)?;
        }

        Ok(())
    }

    /// Write a slice of bytes to a `WriteContext`.
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), WriteError>;

    /// Write the specified number of zero bytes to the `WriteContext`.
    fn write_zeros(&mut self, count: usize) -> Result<(), WriteError>;

    /// The total number of bytes written so far.
    fn bytes_written(&self) -> usize;

    /// Return a placeholder to `T` in the context for filling in later.
    fn placeholder<T, HostType>(&mut self) -> Result<Placeholder<T, HostType>, WriteError>
    where
        T: WriteBinary<HostType> + FixedSize,
    {
        let offset = self.bytes_written();
        self.write_zeros(T::SIZE)?;

        Ok(Placeholder {
            offset,
            length: T::SIZE,
            marker: PhantomData,
            host: PhantomData,
        })
    }

    /// Return a `Vec` of `count` placeholders of type `T`.
    fn placeholder_array<T, HostType>(
        &mut self,
        count: usize,
    ) -> Result<Vec<Placeholder<T, HostType>>, WriteError>
    where
        T: WriteBinary<HostType> + FixedSize,
    {
        (0..count)
            .map(|_| self.placeholder::<T, HostType>())
            .collect()
    }

    /// Consumes the placeholder and writes the supplied value into it
    fn write_placeholder<T, HostType>(
        &mut self,
        placeholder: Placeholder<T, HostType>,
        val: HostType,
    ) -> Result<T::Output, WriteError>
    where
        T: WriteBinary<HostType>;

    /// Fill a 16-bit offset placeholder with the distance from `table_start` to the current
    /// position.
    fn write_offset16(
        &mut self,
        placeholder: Placeholder<U16Be, u16>,
        table_start: usize,
    ) -> Result<(), WriteError> {
        let offset = self
            .bytes_written()
            .checked_sub(table_start)
            .ok_or(WriteError::BadValue)?;
        let offset = u16::try_from(offset)?;
        self.write_placeholder(placeholder, offset)
    }
}

impl<T> WriteBinary<T> for U8
where
    T: Into<u8>,
{
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, t: T) -> Result<(), WriteError> {
        let val: u8 = t.into();
        ctxt.write_bytes(&[val])
    }
}

impl<T> WriteBinary<T> for I16Be
where
    T: Into<i16>,
{
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, t: T) -> Result<(), WriteError> {
        let val: i16 = t.into();
        ctxt.write_bytes(&val.to_be_bytes())
    }
}

impl<T> WriteBinary<T> for U16Be
where
    T: Into<u16>,
{
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, t: T) -> Result<(), WriteError> {
        let val: u16 = t.into();
        ctxt.write_bytes(&val.to_be_bytes())
    }
}

impl<T> WriteBinary<T> for U32Be
where
    T: Into<u32>,
{
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, t: T) -> Result<(), WriteError> {
        let val: u32 = t.into();
        ctxt.write_bytes(&val.to_be_bytes())
    }
}

impl FixedSize for U8 {
    const SIZE: usize = 1;
}

impl FixedSize for I16Be {
    const SIZE: usize = 2;
}

impl FixedSize for U16Be {
    const SIZE: usize = 2;
}

impl FixedSize for U32Be {
    const SIZE: usize = 4;
}

impl WriteContext for WriteBuffer {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), WriteError> {
        self.data.extend_from_slice(data);
        Ok(())
    }

    fn write_zeros(&mut self, count: usize) -> Result<(), WriteError> {
        self.data.resize(self.data.len() + count, 0);
        Ok(())
    }

    fn bytes_written(&self) -> usize {
        self.data.len()
    }

    fn write_placeholder<T, HostType>(
        &mut self,
        placeholder: Placeholder<T, HostType>,
        val: HostType,
    ) -> Result<T::Output, WriteError>
    where
        T: WriteBinary<HostType>,
    {
        let end = placeholder.offset + placeholder.length;
        let data = self
            .data
            .get_mut(placeholder.offset..end)
            .ok_or(WriteError::PlaceholderMismatch)?;
        let mut slice = WriteSlice { offset: 0, data };
        let output = T::write(&mut slice, val)?;
        if slice.offset == placeholder.length {
            Ok(output)
        } else {
            Err(WriteError::PlaceholderMismatch)
        }
    }
}

impl<'a> WriteContext for WriteSlice<'a> {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), WriteError> {
        let end = self.offset + data.len();
        match self.data.get_mut(self.offset..end) {
            Some(subslice) => {
                subslice.copy_from_slice(data);
                self.offset = end;
                Ok(())
            }
            None => Err(WriteError::PlaceholderMismatch),
        }
    }

    fn write_zeros(&mut self, count: usize) -> Result<(), WriteError> {
        let end = self.offset + count;
        match self.data.get_mut(self.offset..end) {
            Some(subslice) => {
                subslice.fill(0);
                self.offset = end;
                Ok(())
            }
            None => Err(WriteError::PlaceholderMismatch),
        }
    }

    fn bytes_written(&self) -> usize {
        self.offset
    }

    fn write_placeholder<T, HostType>(
        &mut self,
        _placeholder: Placeholder<T, HostType>,
        _val: HostType,
    ) -> Result<T::Output, WriteError>
    where
        T: WriteBinary<HostType>,
    {
        // Placeholders can't be nested inside a placeholder being filled.
        Err(WriteError::PlaceholderMismatch)
    }
}

impl WriteBuffer {
    /// Create a new, empty `WriteBuffer`
    pub fn new() -> Self {
        WriteBuffer { data: Vec::new() }
    }

    /// Retrieve a slice of the data held by this buffer
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the current size of the data held by this buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing has been written to this buffer
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume `self` and return the inner buffer
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}
