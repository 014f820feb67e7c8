// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! The [`RdataSet`] and [`RdataSetOwned`] structures.

use std::borrow::Borrow;
use std::fmt;
use std::iter::FusedIterator;
use std::ops::Deref;

use super::{Rdata, Type};

////////////////////////////////////////////////////////////////////////
// RDATASET STRUCTURE                                                 //
////////////////////////////////////////////////////////////////////////

/// Stores the RDATA for an RRset in a contiguous memory region.
///
/// This is designed to make it efficient to serve an RRset. In
/// particular, it allows many small RDATA (e.g. for an A RRset) to
/// reside in the same cache line.
///
/// The `RdataSet` structure is the borrowed view of stored RDATA and
/// can only be produced from the owned variant, [`RdataSetOwned`].
#[repr(transparent)]
pub struct RdataSet {
    inner: [u8],
}

impl RdataSet {
    /// Returns an iterator over the [`Rdata`] of this `RdataSet`.
    pub fn iter(&self) -> Iter {
        Iter {
            cursor: &self.inner,
        }
    }

    /// Returns the number of [`Rdata`] in this `RdataSet`.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns whether this `RdataSet` contains no [`Rdata`].
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns whether this `RdataSet` contains `rdata`, comparing as
    /// records of type `rr_type`.
    pub fn contains(&self, rr_type: Type, rdata: &Rdata) -> bool {
        self.iter().any(|existing| existing.equals(rdata, rr_type))
    }

    /// Returns whether this `RdataSet` and `other` contain the same
    /// [`Rdata`], disregarding order, comparing as records of type
    /// `rr_type`.
    pub fn equals(&self, other: &RdataSet, rr_type: Type) -> bool {
        self.len() == other.len() && self.iter().all(|rdata| other.contains(rr_type, rdata))
    }
}

impl ToOwned for RdataSet {
    type Owned = RdataSetOwned;

    fn to_owned(&self) -> Self::Owned {
        RdataSetOwned {
            inner: self.inner.into(),
        }
    }
}

impl fmt::Debug for RdataSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut list = f.debug_list();
        for rdata in self.iter() {
            list.entry(&format_args!("{:?}", rdata));
        }
        list.finish()
    }
}

////////////////////////////////////////////////////////////////////////
// RDATASET ITERATION                                                 //
////////////////////////////////////////////////////////////////////////

/// An iterator over the [`Rdata`] of an [`RdataSet`].
pub struct Iter<'a> {
    cursor: &'a [u8],
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Rdata;

    fn next(&mut self) -> Option<Self::Item> {
        let len_octets: &[u8; 2] = self.cursor.get(0..2)?.try_into().ok()?;
        let len = u16::from_ne_bytes(*len_octets) as usize;
        if let Some(rdata) = self.cursor.get(2..len + 2) {
            self.cursor = &self.cursor[len + 2..];
            Some(Rdata::from_unchecked(rdata))
        } else {
            None
        }
    }
}

impl FusedIterator for Iter<'_> {}

////////////////////////////////////////////////////////////////////////
// OWNED RDATASET                                                     //
////////////////////////////////////////////////////////////////////////

/// The owned variant of [`RdataSet`].
#[derive(Clone, Default)]
pub struct RdataSetOwned {
    inner: Vec<u8>,
}

impl RdataSetOwned {
    /// Creates a new set initially containing no [`Rdata`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies an [`Rdata`] into this [`RdataSetOwned`]. The new
    /// [`Rdata`] is compared to the existing [`Rdata`] as if it were of
    /// the provided type and is not inserted if identical [`Rdata`] is
    /// already present. Returns whether the [`Rdata`] was inserted.
    pub fn insert(&mut self, rr_type: Type, rdata: &Rdata) -> bool {
        for existing_rdata in self.iter() {
            if rdata.equals(existing_rdata, rr_type) {
                return false;
            }
        }
        self.inner.reserve(2 + rdata.len());
        self.inner
            .extend_from_slice(&(rdata.len() as u16).to_ne_bytes());
        self.inner.extend_from_slice(rdata.octets());
        true
    }

    /// Calls `f` with a mutable view of each stored [`Rdata`] in turn.
    /// `f` must not change any [`Rdata`]'s length.
    pub(crate) fn for_each_mut(&mut self, mut f: impl FnMut(&mut [u8])) {
        let mut offset = 0;
        while offset + 2 <= self.inner.len() {
            let len_octets: [u8; 2] = self.inner[offset..offset + 2].try_into().unwrap();
            let len = u16::from_ne_bytes(len_octets) as usize;
            f(&mut self.inner[offset + 2..offset + 2 + len]);
            offset += 2 + len;
        }
    }

    /// Removes the [`Rdata`] equal to `rdata` (compared as records of
    /// type `rr_type`) from this [`RdataSetOwned`]. Returns whether an
    /// [`Rdata`] was removed.
    pub fn remove(&mut self, rr_type: Type, rdata: &Rdata) -> bool {
        let mut offset = 0;
        while offset + 2 <= self.inner.len() {
            let len_octets: [u8; 2] = self.inner[offset..offset + 2].try_into().unwrap();
            let len = u16::from_ne_bytes(len_octets) as usize;
            let existing = Rdata::from_unchecked(&self.inner[offset + 2..offset + 2 + len]);
            if existing.equals(rdata, rr_type) {
                self.inner.drain(offset..offset + 2 + len);
                return true;
            }
            offset += 2 + len;
        }
        false
    }
}

impl<'a> FromIterator<&'a Rdata> for RdataSetOwned {
    /// Collects [`Rdata`] without duplicate suppression; the caller is
    /// expected to have deduplicated already (or not to care).
    fn from_iter<I: IntoIterator<Item = &'a Rdata>>(iter: I) -> Self {
        let mut set = Self::new();
        for rdata in iter {
            set.inner
                .extend_from_slice(&(rdata.len() as u16).to_ne_bytes());
            set.inner.extend_from_slice(rdata.octets());
        }
        set
    }
}

impl Deref for RdataSetOwned {
    type Target = RdataSet;

    fn deref(&self) -> &Self::Target {
        unsafe { &*(self.inner.as_slice() as *const [u8] as *const RdataSet) }
    }
}

impl Borrow<RdataSet> for RdataSetOwned {
    fn borrow(&self) -> &RdataSet {
        self.deref()
    }
}

impl AsRef<RdataSet> for RdataSetOwned {
    fn as_ref(&self) -> &RdataSet {
        self.deref()
    }
}

impl fmt::Debug for RdataSetOwned {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.deref().fmt(f)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
