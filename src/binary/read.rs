#![allow(missing_docs)]

//! Parse binary data
//!
//! All table decoding in this crate is built on two types. A [`ReadScope`] is a view of the
//! data beginning at the start of some table, against which that table's offsets are resolved.
//! A [`ReadCtxt`] is a cursor over a scope that advances as values are read. Every read is
//! bounds checked: running off the end of the data yields [`DecodeError::BufferBounds`].
//!
//! A scope may carry a [`ReadBudget`] that is shared with every scope derived from it. Each
//! read is charged against the budget, and once it runs out reads fail with
//! [`DecodeError::LimitExceeded`].

use crate::binary::{I16Be, U16Be, U32Be, U8};
use crate::error::DecodeError;
use crate::size;
use byteorder::{BigEndian, ByteOrder};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Copy, Clone)]
pub struct ReadEof {}

#[derive(Copy, Clone, Debug)]
pub struct ReadScope<'a> {
    base: usize,
    data: &'a [u8],
    budget: Option<&'a ReadBudget>,
}

/// Limits the total number of bytes read through a scope and all scopes derived from it.
///
/// Offsets may point at the same data any number of times, so without a limit a small table
/// can take an unbounded amount of work to decode.
#[derive(Debug)]
pub struct ReadBudget {
    remaining: AtomicUsize,
}

#[derive(Clone)]
pub struct ReadCtxt<'a> {
    scope: ReadScope<'a>,
    offset: usize,
}

pub trait ReadBinary {
    type HostType<'a>: Sized; // default = Self

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, DecodeError>;
}

pub trait ReadBinaryDep {
    type Args<'a>: Copy;
    type HostType<'a>: Sized; // default = Self

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        args: Self::Args<'a>,
    ) -> Result<Self::HostType<'a>, DecodeError>;
}

pub trait ReadFixedSizeDep: ReadBinaryDep {
    /// The number of bytes consumed by `ReadBinaryDep::read`.
    fn size(args: Self::Args<'_>) -> usize;
}

/// A value with a fixed encoded size that can be decoded from exactly `SIZE` bytes.
pub trait ReadFixed {
    type HostType: Sized; // default = Self

    /// The number of bytes consumed by `read_fixed`.
    const SIZE: usize;

    /// `bytes` is always exactly `SIZE` bytes long.
    fn read_fixed(bytes: &[u8]) -> Self::HostType;
}

pub trait ReadFrom {
    type ReadType: ReadFixed;
    fn read_from(value: <Self::ReadType as ReadFixed>::HostType) -> Self;
}

impl<T> ReadFixed for T
where
    T: ReadFrom,
{
    type HostType = T;

    const SIZE: usize = T::ReadType::SIZE;

    fn read_fixed(bytes: &[u8]) -> Self::HostType {
        T::read_from(T::ReadType::read_fixed(bytes))
    }
}

impl<T> ReadBinary for T
where
    T: ReadFixed,
{
    type HostType<'a> = T::HostType;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, DecodeError> {
        let bytes = ctxt.read_slice(T::SIZE)?;
        Ok(T::read_fixed(bytes))
    }
}

impl<T> ReadBinaryDep for T
where
    T: ReadBinary,
{
    type Args<'a> = ();
    type HostType<'a> = T::HostType<'a>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (): Self::Args<'_>,
    ) -> Result<Self::HostType<'a>, DecodeError> {
        T::read(ctxt)
    }
}

impl<T> ReadFixedSizeDep for T
where
    T: ReadFixed,
{
    fn size((): ()) -> usize {
        T::SIZE
    }
}

pub trait CheckIndex {
    fn check_index(&self, index: usize) -> Result<(), DecodeError>;
}

#[derive(Clone)]
pub struct ReadArray<'a, T: ReadFixedSizeDep> {
    scope: ReadScope<'a>,
    length: usize,
    stride: usize,
    args: T::Args<'a>,
}

pub struct ReadArrayIter<'a, T: ReadFixed> {
    scope: ReadScope<'a>,
    index: usize,
    length: usize,
    phantom: PhantomData<T>,
}

pub struct ReadArrayDepIter<'a, 'b, T: ReadFixedSizeDep> {
    array: &'b ReadArray<'a, T>,
    index: usize,
}

/// Read a big-endian `u16` from `data` at `offset`.
pub fn read_u16(data: &[u8], offset: usize) -> Result<u16, DecodeError> {
    let end = offset.checked_add(size::U16).ok_or(DecodeError::BufferBounds)?;
    let bytes = data.get(offset..end).ok_or(DecodeError::BufferBounds)?;
    Ok(BigEndian::read_u16(bytes))
}

/// Read a big-endian `u32` from `data` at `offset`.
pub fn read_u32(data: &[u8], offset: usize) -> Result<u32, DecodeError> {
    let end = offset.checked_add(size::U32).ok_or(DecodeError::BufferBounds)?;
    let bytes = data.get(offset..end).ok_or(DecodeError::BufferBounds)?;
    Ok(BigEndian::read_u32(bytes))
}

impl ReadBudget {
    pub fn new(limit: usize) -> ReadBudget {
        ReadBudget {
            remaining: AtomicUsize::new(limit),
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Relaxed)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Charge `length` bytes. A charge that does not fit uses up the rest of the budget.
    fn spend(&self, length: usize) -> Result<(), DecodeError> {
        let remaining = self.remaining();
        match remaining.checked_sub(length) {
            Some(remaining) => {
                self.remaining.store(remaining, Ordering::Relaxed);
                Ok(())
            }
            None => {
                self.remaining.store(0, Ordering::Relaxed);
                Err(DecodeError::LimitExceeded)
            }
        }
    }
}

impl<'a> PartialEq for ReadScope<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.data == other.data
    }
}

impl<'a> ReadScope<'a> {
    pub fn new(data: &'a [u8]) -> ReadScope<'a> {
        let base = 0;
        ReadScope {
            base,
            data,
            budget: None,
        }
    }

    /// This scope with reads from it, and from every scope derived from it, charged to
    /// `budget`.
    pub fn with_budget(self, budget: &'a ReadBudget) -> ReadScope<'a> {
        ReadScope {
            budget: Some(budget),
            ..self
        }
    }

    /// Whether this scope has a budget and it has been used up.
    pub fn budget_exhausted(&self) -> bool {
        self.budget.is_some_and(ReadBudget::is_exhausted)
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Position of this scope relative to the data the outermost scope was created from.
    pub fn base(&self) -> usize {
        self.base
    }

    /// A scope starting `offset` bytes into this one.
    ///
    /// An offset past the end produces an empty scope, so the first read from it fails with
    /// `BufferBounds`.
    pub fn offset(&self, offset: usize) -> ReadScope<'a> {
        let base = self.base.saturating_add(offset);
        let data = self.data.get(offset..).unwrap_or(&[]);
        ReadScope {
            base,
            data,
            budget: self.budget,
        }
    }

    pub fn offset_length(
        &self,
        offset: usize,
        length: usize,
    ) -> Result<ReadScope<'a>, DecodeError> {
        if offset < self.data.len() || length == 0 {
            let data = self.data.get(offset..).unwrap_or(&[]);
            if length <= data.len() {
                let base = self.base + offset;
                let data = &data[0..length];
                Ok(ReadScope {
                    base,
                    data,
                    budget: self.budget,
                })
            } else {
                Err(DecodeError::BufferBounds)
            }
        } else {
            Err(DecodeError::BadOffset)
        }
    }

    pub fn ctxt(&self) -> ReadCtxt<'a> {
        ReadCtxt::new(*self)
    }

    pub fn read<T: ReadBinaryDep<Args<'a> = ()>>(&self) -> Result<T::HostType<'a>, DecodeError> {
        self.ctxt().read::<T>()
    }

    pub fn read_dep<T: ReadBinaryDep>(
        &self,
        args: T::Args<'a>,
    ) -> Result<T::HostType<'a>, DecodeError> {
        self.ctxt().read_dep::<T>(args)
    }
}

impl<'a> ReadCtxt<'a> {
    /// ReadCtxt is constructed by calling `ReadScope::ctxt`.
    fn new(scope: ReadScope<'a>) -> ReadCtxt<'a> {
        ReadCtxt { scope, offset: 0 }
    }

    /// Check a condition, returning `DecodeError::BadValue` if `false`.
    pub fn check(&self, cond: bool) -> Result<(), DecodeError> {
        match cond {
            true => Ok(()),
            false => Err(DecodeError::BadValue),
        }
    }

    /// Check a condition, returning `DecodeError::BadIndex` if `false`.
    pub fn check_index(&self, cond: bool) -> Result<(), DecodeError> {
        match cond {
            true => Ok(()),
            false => Err(DecodeError::BadIndex),
        }
    }

    /// Check a condition, returning `DecodeError::BadVersion` if `false`.
    ///
    /// ```
    /// use gpos_tables::binary::read::ReadScope;
    /// use gpos_tables::error::DecodeError;
    ///
    /// let scope = ReadScope::new(&[0, 2]);
    /// let mut ctxt = scope.ctxt();
    /// let major_version = ctxt.read_u16be().expect("unable to read version");
    ///
    /// assert!(ctxt.check_version(major_version == 2).is_ok());
    /// assert_eq!(ctxt.check_version(major_version == 1), Err(DecodeError::BadVersion));
    /// ```
    pub fn check_version(&self, cond: bool) -> Result<(), DecodeError> {
        match cond {
            true => Ok(()),
            false => Err(DecodeError::BadVersion),
        }
    }

    /// Check a count related condition, returning `DecodeError::InconsistentCount` if `false`.
    pub fn check_count(&self, cond: bool) -> Result<(), DecodeError> {
        match cond {
            true => Ok(()),
            false => Err(DecodeError::InconsistentCount),
        }
    }

    /// The scope starting at the current position.
    pub fn scope(&self) -> ReadScope<'a> {
        self.scope.offset(self.offset)
    }

    /// Number of bytes read so far from the start of this context's scope.
    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn read<T: ReadBinaryDep<Args<'a> = ()>>(
        &mut self,
    ) -> Result<T::HostType<'a>, DecodeError> {
        T::read_dep(self, ())
    }

    pub fn read_dep<T: ReadBinaryDep>(
        &mut self,
        args: T::Args<'a>,
    ) -> Result<T::HostType<'a>, DecodeError> {
        T::read_dep(self, args)
    }

    pub fn bytes_available(&self) -> bool {
        self.offset < self.scope.data.len()
    }

    fn check_avail(&self, length: usize) -> Result<(), ReadEof> {
        match self.offset.checked_add(length) {
            Some(endpos) if endpos <= self.scope.data.len() => Ok(()),
            _ => Err(ReadEof {}),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let bytes = self.read_slice(1)?;
        Ok(bytes[0])
    }

    pub fn read_u16be(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_slice(size::U16)?;
        Ok(BigEndian::read_u16(bytes))
    }

    pub fn read_i16be(&mut self) -> Result<i16, DecodeError> {
        let bytes = self.read_slice(size::I16)?;
        Ok(BigEndian::read_i16(bytes))
    }

    pub fn read_u32be(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_slice(size::U32)?;
        Ok(BigEndian::read_u32(bytes))
    }

    pub fn read_array<T: ReadFixed>(
        &mut self,
        length: usize,
    ) -> Result<ReadArray<'a, T>, DecodeError> {
        let byte_len = length.checked_mul(T::SIZE).ok_or(DecodeError::BufferBounds)?;
        let scope = self.read_scope(byte_len)?;
        Ok(ReadArray {
            scope,
            length,
            stride: T::SIZE,
            args: (),
        })
    }

    pub fn read_array_dep<T: ReadFixedSizeDep>(
        &mut self,
        length: usize,
        args: T::Args<'a>,
    ) -> Result<ReadArray<'a, T>, DecodeError> {
        let stride = T::size(args);
        let byte_len = length.checked_mul(stride).ok_or(DecodeError::BufferBounds)?;
        let scope = self.read_scope(byte_len)?;
        Ok(ReadArray {
            scope,
            length,
            stride,
            args,
        })
    }

    pub fn read_scope(&mut self, length: usize) -> Result<ReadScope<'a>, DecodeError> {
        self.check_avail(length)?;
        if let Some(budget) = self.scope.budget {
            budget.spend(length)?;
        }
        let scope = ReadScope {
            base: self.scope.base + self.offset,
            data: &self.scope.data[self.offset..self.offset + length],
            budget: self.scope.budget,
        };
        self.offset += length;
        Ok(scope)
    }

    pub fn read_slice(&mut self, length: usize) -> Result<&'a [u8], DecodeError> {
        let scope = self.read_scope(length)?;
        Ok(scope.data)
    }
}

impl<'a, T: ReadFixedSizeDep> ReadArray<'a, T> {
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn read_item(&self, index: usize) -> Result<T::HostType<'a>, DecodeError> {
        if index < self.length {
            let offset = index * self.stride;
            let scope = self.scope.offset_length(offset, self.stride)?;
            let mut ctxt = scope.ctxt();
            T::read_dep(&mut ctxt, self.args)
        } else {
            Err(DecodeError::BadIndex)
        }
    }

    pub fn get_item(&self, index: usize) -> Option<<T as ReadFixed>::HostType>
    where
        T: ReadFixed,
    {
        if index < self.length {
            let offset = index * self.stride;
            let bytes = self.scope.data.get(offset..offset + T::SIZE)?;
            Some(T::read_fixed(bytes))
        } else {
            None
        }
    }

    pub fn to_vec(&self) -> Vec<<T as ReadFixed>::HostType>
    where
        T: ReadFixed,
    {
        self.iter().collect()
    }

    pub fn read_to_vec(&self) -> Result<Vec<T::HostType<'a>>, DecodeError> {
        let mut vec = Vec::with_capacity(self.length);
        for res in self.iter_res() {
            let t = res?;
            vec.push(t);
        }
        Ok(vec)
    }

    pub fn iter(&self) -> ReadArrayIter<'a, T>
    where
        T: ReadFixed,
    {
        ReadArrayIter {
            scope: self.scope,
            index: 0,
            length: self.length,
            phantom: PhantomData,
        }
    }

    pub fn iter_res<'b>(&'b self) -> ReadArrayDepIter<'a, 'b, T> {
        ReadArrayDepIter {
            array: self,
            index: 0,
        }
    }
}

impl<'a, T: ReadFixed> ReadArray<'a, T> {
    pub fn empty() -> ReadArray<'a, T> {
        ReadArray {
            scope: ReadScope::new(&[]),
            length: 0,
            stride: T::SIZE,
            args: (),
        }
    }
}

impl<'a, T: ReadFixedSizeDep> CheckIndex for ReadArray<'a, T> {
    fn check_index(&self, index: usize) -> Result<(), DecodeError> {
        if index < self.len() {
            Ok(())
        } else {
            Err(DecodeError::BadIndex)
        }
    }
}

impl<T> CheckIndex for Vec<T> {
    fn check_index(&self, index: usize) -> Result<(), DecodeError> {
        if index < self.len() {
            Ok(())
        } else {
            Err(DecodeError::BadIndex)
        }
    }
}

impl<'a, 'b, T: ReadFixed> IntoIterator for &'b ReadArray<'a, T> {
    type Item = T::HostType;
    type IntoIter = ReadArrayIter<'a, T>;
    fn into_iter(self) -> ReadArrayIter<'a, T> {
        self.iter()
    }
}

impl<'a, T: ReadFixed> Iterator for ReadArrayIter<'a, T> {
    type Item = T::HostType;

    fn next(&mut self) -> Option<T::HostType> {
        if self.index >= self.length {
            return None;
        }
        let offset = self.index * T::SIZE;
        let bytes = self.scope.data.get(offset..offset + T::SIZE)?;
        self.index += 1;
        Some(T::read_fixed(bytes))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.length - self.index;
        (remaining, Some(remaining))
    }
}

impl<'a, T: ReadFixed> ExactSizeIterator for ReadArrayIter<'a, T> {}

impl<'a, 'b, T: ReadFixedSizeDep> Iterator for ReadArrayDepIter<'a, 'b, T> {
    type Item = Result<T::HostType<'a>, DecodeError>;

    fn next(&mut self) -> Option<Result<T::HostType<'a>, DecodeError>> {
        if self.index < self.array.len() {
            let result = self.array.read_item(self.index);
            self.index += 1;
            Some(result)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let length = self.array.len().saturating_sub(self.index);
        (length, Some(length))
    }
}

impl ReadFixed for U8 {
    type HostType = u8;

    const SIZE: usize = 1;

    fn read_fixed(bytes: &[u8]) -> u8 {
        bytes[0]
    }
}

impl ReadFixed for U16Be {
    type HostType = u16;

    const SIZE: usize = size::U16;

    fn read_fixed(bytes: &[u8]) -> u16 {
        BigEndian::read_u16(bytes)
    }
}

impl ReadFixed for I16Be {
    type HostType = i16;

    const SIZE: usize = size::I16;

    fn read_fixed(bytes: &[u8]) -> i16 {
        BigEndian::read_i16(bytes)
    }
}

impl ReadFixed for U32Be {
    type HostType = u32;

    const SIZE: usize = size::U32;

    fn read_fixed(bytes: &[u8]) -> u32 {
        BigEndian::read_u32(bytes)
    }
}

impl<T1, T2> ReadFixed for (T1, T2)
where
    T1: ReadFixed,
    T2: ReadFixed,
{
    type HostType = (T1::HostType, T2::HostType);

    const SIZE: usize = T1::SIZE + T2::SIZE;

    fn read_fixed(bytes: &[u8]) -> Self::HostType {
        let t1 = T1::read_fixed(&bytes[..T1::SIZE]);
        let t2 = T2::read_fixed(&bytes[T1::SIZE..]);
        (t1, t2)
    }
}

impl<T1, T2, T3> ReadFixed for (T1, T2, T3)
where
    T1: ReadFixed,
    T2: ReadFixed,
    T3: ReadFixed,
{
    type HostType = (T1::HostType, T2::HostType, T3::HostType);

    const SIZE: usize = T1::SIZE + T2::SIZE + T3::SIZE;

    fn read_fixed(bytes: &[u8]) -> Self::HostType {
        let t1 = T1::read_fixed(&bytes[..T1::SIZE]);
        let t2 = T2::read_fixed(&bytes[T1::SIZE..T1::SIZE + T2::SIZE]);
        let t3 = T3::read_fixed(&bytes[T1::SIZE + T2::SIZE..]);
        (t1, t2, t3)
    }
}

impl<'a, T> fmt::Debug for ReadArray<'a, T>
where
    T: ReadFixed,
    T::HostType: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u16_u32() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A];
        assert_eq!(read_u16(&data, 0).unwrap(), 0x1234);
        assert_eq!(read_u16(&data, 3).unwrap(), 0x789A);
        assert_eq!(read_u32(&data, 1).unwrap(), 0x3456789A);
    }

    #[test]
    fn test_read_u16_u32_out_of_bounds() {
        let data = [0x12, 0x34, 0x56];
        assert_eq!(read_u16(&data, 2), Err(DecodeError::BufferBounds));
        assert_eq!(read_u32(&data, 0), Err(DecodeError::BufferBounds));
        assert_eq!(read_u16(&data, usize::MAX), Err(DecodeError::BufferBounds));
    }

    // Tests that offset_length does not panic when length is 0 but offset is out-of-bounds
    #[test]
    fn test_offset_length_oob() {
        let scope = ReadScope::new(&[1, 2, 3]);
        assert!(scope.offset_length(99, 0).is_ok());
    }

    #[test]
    fn test_offset_past_end_fails_on_read() {
        let scope = ReadScope::new(&[0, 1]);
        let past_end = scope.offset(10);
        assert!(past_end.data().is_empty());
        assert_eq!(past_end.read::<U16Be>(), Err(DecodeError::BufferBounds));
    }

    #[test]
    fn test_read_array_too_long() {
        let scope = ReadScope::new(&[0, 1, 0, 2, 0]);
        let mut ctxt = scope.ctxt();
        assert_eq!(
            ctxt.read_array::<U16Be>(3).map(|a| a.to_vec()),
            Err(DecodeError::BufferBounds)
        );
    }

    #[test]
    fn test_position_tracks_reads() {
        let scope = ReadScope::new(&[0, 1, 0, 2, 0, 0, 0, 3]);
        let mut ctxt = scope.ctxt();
        ctxt.read_u16be().unwrap();
        assert_eq!(ctxt.position(), 2);
        let pairs = ctxt.read_array::<(U16Be, U16Be)>(1).unwrap().to_vec();
        assert_eq!(pairs, vec![(2, 0)]);
        assert_eq!(ctxt.position(), 6);
        assert_eq!(ctxt.scope().base(), 6);
    }

    #[test]
    fn test_offset_saturates() {
        let scope = ReadScope::new(&[0, 1]).offset(1);
        let far = scope.offset(usize::MAX);
        assert_eq!(far.base(), usize::MAX);
        assert_eq!(far.read::<U16Be>(), Err(DecodeError::BufferBounds));
    }

    #[test]
    fn test_budget_shared_by_derived_scopes() {
        let data = [0, 1, 0, 2, 0, 3];
        let budget = ReadBudget::new(5);
        let scope = ReadScope::new(&data).with_budget(&budget);
        assert_eq!(scope.read::<U16Be>(), Ok(1));
        assert_eq!(scope.offset(2).read::<U16Be>(), Ok(2));
        assert_eq!(budget.remaining(), 1);
        assert!(!scope.budget_exhausted());

        // A read that doesn't fit uses up the remainder, so later small reads fail too.
        assert_eq!(scope.offset(4).read::<U16Be>(), Err(DecodeError::LimitExceeded));
        assert!(scope.budget_exhausted());
        assert_eq!(scope.ctxt().read_u8(), Err(DecodeError::LimitExceeded));
    }

    #[test]
    fn test_array_charged_once_when_read() {
        let data = [0, 1, 0, 2, 0, 3];
        let budget = ReadBudget::new(6);
        let scope = ReadScope::new(&data).with_budget(&budget);
        let array = scope.ctxt().read_array::<U16Be>(3).unwrap();
        assert_eq!(array.to_vec(), vec![1, 2, 3]);
        assert!(budget.is_exhausted());
        assert!(!ReadScope::new(&data).budget_exhausted());
    }
}
