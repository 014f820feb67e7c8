// Copyright 2021 Matthew Ingwersen.
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

//! Implementation of the [`Rrset`] structure.

use std::fmt;

use super::{Rdata, RdataSet, RdataSetOwned, Trust, Ttl, Type};
use crate::class::Class;
use crate::name::Name;

////////////////////////////////////////////////////////////////////////
// RRSETS                                                             //
////////////////////////////////////////////////////////////////////////

/// A set of records sharing an owner name, class, and type.
///
/// Per [RFC 2181 § 5.2], all records of an RRset share one TTL. The
/// `covers` field distinguishes RRSIG RRsets covering different types;
/// it is `Type::from(0)` for everything else.
///
/// An `Rrset` also carries the cache-oriented attributes of its data:
/// a [`Trust`] level and the negative-answer flags. For ordinary
/// positive data the flags are all clear.
///
/// [RFC 2181 § 5.2]: https://datatracker.ietf.org/doc/html/rfc2181#section-5.2
#[derive(Clone)]
pub struct Rrset {
    pub owner: Box<Name>,
    pub class: Class,
    pub rr_type: Type,
    pub covers: Type,
    pub ttl: Ttl,
    pub trust: Trust,
    pub negative: bool,
    pub nxdomain: bool,
    pub optout: bool,
    pub rdatas: RdataSetOwned,
}

impl Rrset {
    /// Creates an empty, positive, fully trusted `Rrset`.
    pub fn new(owner: Box<Name>, class: Class, rr_type: Type, ttl: Ttl) -> Self {
        Self {
            owner,
            class,
            rr_type,
            covers: Type::from(0),
            ttl,
            trust: Trust::Ultimate,
            negative: false,
            nxdomain: false,
            optout: false,
            rdatas: RdataSetOwned::new(),
        }
    }

    /// Sets the type an RRSIG RRset covers.
    pub fn with_covers(mut self, covers: Type) -> Self {
        self.covers = covers;
        self
    }

    /// Copies `rdata` into the set, suppressing duplicates.
    pub fn push_rdata(&mut self, rdata: &Rdata) -> bool {
        self.rdatas.insert(self.rr_type, rdata)
    }

    /// Returns a borrowed view of the stored RDATA.
    pub fn rdatas(&self) -> &RdataSet {
        &self.rdatas
    }

    /// Returns whether this `Rrset` holds no records.
    pub fn is_empty(&self) -> bool {
        self.rdatas.is_empty()
    }

    /// Returns the number of records in this `Rrset`.
    pub fn len(&self) -> usize {
        self.rdatas.len()
    }
}

/// Two `Rrset`s are equal when they have the same owner (compared
/// case-insensitively), class, type, covered type, TTL, and records
/// (disregarding order). The cache attributes do not participate.
impl PartialEq for Rrset {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner
            && self.class == other.class
            && self.rr_type == other.rr_type
            && self.covers == other.covers
            && self.ttl == other.ttl
            && self.rdatas.equals(&other.rdatas, self.rr_type)
    }
}

impl Eq for Rrset {}

impl fmt::Debug for Rrset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Rrset")
            .field("owner", &self.owner)
            .field("class", &self.class)
            .field("rr_type", &self.rr_type)
            .field("covers", &self.covers)
            .field("ttl", &self.ttl)
            .field("trust", &self.trust)
            .field("rdatas", &self.rdatas)
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn a_rrset(owner: &str) -> Rrset {
        let mut rrset = Rrset::new(
            owner.parse().unwrap(),
            Class::IN,
            Type::A,
            Ttl::from(3600),
        );
        rrset.push_rdata((&[192, 0, 2, 1]).try_into().unwrap());
        rrset.push_rdata((&[192, 0, 2, 2]).try_into().unwrap());
        rrset
    }

    #[test]
    fn push_rdata_suppresses_duplicates() {
        let mut rrset = a_rrset("example.test.");
        assert!(!rrset.push_rdata((&[192, 0, 2, 1]).try_into().unwrap()));
        assert_eq!(rrset.len(), 2);
    }

    #[test]
    fn equality_ignores_owner_case_and_rdata_order() {
        let forward = a_rrset("example.test.");
        let mut backward = Rrset::new(
            "EXAMPLE.test.".parse().unwrap(),
            Class::IN,
            Type::A,
            Ttl::from(3600),
        );
        backward.push_rdata((&[192, 0, 2, 2]).try_into().unwrap());
        backward.push_rdata((&[192, 0, 2, 1]).try_into().unwrap());
        assert_eq!(forward, backward);
    }

    #[test]
    fn equality_respects_ttl() {
        let mut other = a_rrset("example.test.");
        other.ttl = Ttl::from(7200);
        assert_ne!(a_rrset("example.test."), other);
    }
}
