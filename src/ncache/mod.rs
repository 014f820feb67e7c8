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

//! Negative-cache RRsets.
//!
//! A negative answer is cached as a single RRset of type 0 whose RDATA
//! pack the records that prove the nonexistence: the SOA, NSEC, and
//! NSEC3 RRsets of the response's authority section, along with their
//! RRSIGs. Each packed record is one [`Rdata`] of the form
//!
//! ```text
//! owner (wire form) | type u16 | trust u8 | count u16 |
//! (rdata len u16 | rdata)*count
//! ```
//!
//! with all integers big-endian. [`add`] builds such an RRset;
//! [`current`], [`records`], [`get_rdataset`], and [`get_sig_rdataset`]
//! decode it into zero-copy [`EmbeddedRrset`] views; [`to_wire`] emits
//! the packed records in ordinary wire form.

use std::fmt;

use crate::class::Class;
use crate::name::Name;
use crate::rr::rdata::Rrsig;
use crate::rr::{Rdata, Rrset, Trust, Ttl, Type};

/// The largest number of records one negative-cache RRset may pack.
const MAX_RECORDS: usize = 100;

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// Errors that may occur building or decoding negative-cache RRsets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// The authority section has more provable RRsets than a
    /// negative-cache RRset can pack.
    TooManyRecords,

    /// A packed record does not fit in a single RDATA.
    RecordTooLong,

    /// A packed record is structurally invalid.
    Corrupt,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::TooManyRecords => f.write_str("too many records for a negative-cache RRset"),
            Self::RecordTooLong => f.write_str("packed record exceeds the RDATA size limit"),
            Self::Corrupt => f.write_str("corrupt negative-cache record"),
        }
    }
}

impl std::error::Error for Error {}

/// A result type for negative-cache operations.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// CONSTRUCTION                                                       //
////////////////////////////////////////////////////////////////////////

/// Builds a negative-cache RRset for `owner` from the authority
/// section of a response.
///
/// Every authority RRset of type SOA, NSEC, or NSEC3, and every RRSIG
/// RRset covering one of those types, is packed into the result. The
/// result's TTL is the minimum TTL over the packed RRsets, clamped up
/// to `minttl` and starting from (and so never exceeding) `maxttl`;
/// its trust is the minimum trust over the packed RRsets. If nothing
/// is packed, the TTL is zero and the trust is
/// [`Trust::AuthAuthority`] when `aa_and_no_answer` indicates an
/// authoritative response with an empty answer section, or
/// [`Trust::Additional`] otherwise. Unless `secure` is set, the trust
/// is finally capped at [`Trust::Answer`].
#[allow(clippy::too_many_arguments)]
pub fn add(
    owner: Box<Name>,
    authority: &[Rrset],
    aa_and_no_answer: bool,
    nxdomain: bool,
    optout: bool,
    secure: bool,
    class: Class,
    covers: Type,
    minttl: Ttl,
    maxttl: Ttl,
) -> Result<Rrset> {
    let mut ttl = u32::from(maxttl);
    let mut trust = None;
    let mut blobs = Vec::new();

    for rrset in authority {
        let proof_type = if rrset.rr_type == Type::RRSIG {
            rrset.covers
        } else {
            rrset.rr_type
        };
        if !matches!(proof_type, Type::SOA | Type::NSEC | Type::NSEC3) {
            continue;
        }
        ttl = ttl.min(u32::from(rrset.ttl)).max(u32::from(minttl));
        trust = Some(trust.map_or(rrset.trust, |t: Trust| t.min(rrset.trust)));

        if blobs.len() >= MAX_RECORDS {
            return Err(Error::TooManyRecords);
        }
        let mut blob = Vec::new();
        blob.extend_from_slice(rrset.owner.wire_repr());
        blob.extend_from_slice(&u16::from(rrset.rr_type).to_be_bytes());
        blob.push(u8::from(rrset.trust));
        blob.extend_from_slice(&(rrset.len() as u16).to_be_bytes());
        for rdata in rrset.rdatas().iter() {
            blob.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
            blob.extend_from_slice(rdata.octets());
        }
        if blob.len() > u16::MAX as usize {
            return Err(Error::RecordTooLong);
        }
        blobs.push(blob);
    }

    let mut trust = match trust {
        Some(trust) => trust,
        None => {
            ttl = 0;
            if aa_and_no_answer {
                Trust::AuthAuthority
            } else {
                Trust::Additional
            }
        }
    };
    if !secure && trust > Trust::Answer {
        trust = Trust::Answer;
    }

    let mut rrset = Rrset::new(owner, class, Type::from(0), Ttl::from(ttl));
    rrset.covers = covers;
    rrset.trust = trust;
    rrset.negative = true;
    rrset.nxdomain = nxdomain;
    rrset.optout = optout;
    rrset.rdatas = blobs
        .iter()
        .map(|blob| Rdata::from_unchecked(blob))
        .collect();
    Ok(rrset)
}

////////////////////////////////////////////////////////////////////////
// DECODING                                                           //
////////////////////////////////////////////////////////////////////////

/// A zero-copy view of one record packed in a negative-cache RRset.
/// The RDATA references the backing RRset and must not outlive it.
#[derive(Debug)]
pub struct EmbeddedRrset<'a> {
    pub name: Box<Name>,
    pub rr_type: Type,

    /// For RRSIG records, the type covered by the first signature.
    pub covers: Type,

    pub trust: Trust,
    rdatas: Vec<&'a Rdata>,
}

impl<'a> EmbeddedRrset<'a> {
    /// Returns an iterator over the embedded RDATA.
    pub fn iter(&self) -> impl Iterator<Item = &'a Rdata> + '_ {
        self.rdatas.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.rdatas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rdatas.is_empty()
    }
}

/// Decodes the packed record stored in one RDATA of a negative-cache
/// RRset.
pub fn current(record: &Rdata) -> Result<EmbeddedRrset> {
    let (name, name_len) = Name::try_from_uncompressed(record).map_err(|_| Error::Corrupt)?;
    let rest = &record[name_len..];
    if rest.len() < 5 {
        return Err(Error::Corrupt);
    }
    let rr_type = Type::from(u16::from_be_bytes(rest[0..2].try_into().unwrap()));
    let trust = Trust::from_u8(rest[2]);
    let count = u16::from_be_bytes(rest[3..5].try_into().unwrap()) as usize;

    let mut rdatas = Vec::with_capacity(count);
    let mut cursor = &rest[5..];
    for _ in 0..count {
        let len_octets: [u8; 2] = cursor.get(0..2).ok_or(Error::Corrupt)?.try_into().unwrap();
        let len = u16::from_be_bytes(len_octets) as usize;
        let octets = cursor.get(2..2 + len).ok_or(Error::Corrupt)?;
        rdatas.push(Rdata::from_unchecked(octets));
        cursor = &cursor[2 + len..];
    }
    if !cursor.is_empty() {
        return Err(Error::Corrupt);
    }

    let covers = if rr_type == Type::RRSIG {
        let first = rdatas.first().ok_or(Error::Corrupt)?;
        Rrsig::try_from_rdata(first)
            .map_err(|_| Error::Corrupt)?
            .type_covered
    } else {
        Type::from(0)
    };

    Ok(EmbeddedRrset {
        name,
        rr_type,
        covers,
        trust,
        rdatas,
    })
}

/// Returns an iterator over the records packed in a negative-cache
/// RRset, in insertion order.
pub fn records(ncache: &Rrset) -> impl Iterator<Item = Result<EmbeddedRrset>> {
    ncache.rdatas().iter().map(current)
}

/// Looks up the packed record for `name` and `rr_type`. RRSIG records
/// are found with [`get_sig_rdataset`], not here.
pub fn get_rdataset<'a>(ncache: &'a Rrset, name: &Name, rr_type: Type) -> Option<EmbeddedRrset<'a>> {
    if rr_type == Type::RRSIG {
        return None;
    }
    records(ncache)
        .filter_map(Result::ok)
        .find(|record| record.rr_type == rr_type && *record.name == *name)
}

/// Looks up the packed RRSIG record for `name` covering `covers`.
pub fn get_sig_rdataset<'a>(ncache: &'a Rrset, name: &Name, covers: Type) -> Option<EmbeddedRrset<'a>> {
    records(ncache)
        .filter_map(Result::ok)
        .find(|record| {
            record.rr_type == Type::RRSIG && record.covers == covers && *record.name == *name
        })
}

////////////////////////////////////////////////////////////////////////
// WIRE OUTPUT                                                        //
////////////////////////////////////////////////////////////////////////

/// Name-compression state for [`to_wire`].
///
/// Packed records repeat the same owner over and over, so we do not
/// keep a full offset table: a name equal to the most recently written
/// one compresses to a pointer, and anything else is written in full.
#[derive(Clone, Default)]
pub struct CompressionContext {
    last: Option<(Box<Name>, u16)>,
}

impl CompressionContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_name(&mut self, name: &Name, out: &mut Vec<u8>) {
        if let Some((prior, pointer)) = &self.last {
            // Pointers are not worth it for names no longer than one.
            if **prior == *name && name.wire_repr().len() > 2 {
                out.extend_from_slice(&(0xc000 | pointer).to_be_bytes());
                return;
            }
        }
        let offset = out.len();
        out.extend_from_slice(name.wire_repr());
        if offset < 0x4000 {
            self.last = Some((name.to_owned(), offset as u16));
        }
    }
}

fn is_dnssec_type(rr_type: Type) -> bool {
    matches!(
        rr_type,
        Type::DS | Type::RRSIG | Type::NSEC | Type::DNSKEY | Type::NSEC3,
    )
}

/// Writes the records packed in a negative-cache RRset to `out` in
/// ordinary wire form, returning the number of records written. When
/// `omit_dnssec` is set, records of DNSSEC types are skipped. On any
/// error, `out` and `cctx` are rolled back to their state at entry.
pub fn to_wire(
    ncache: &Rrset,
    cctx: &mut CompressionContext,
    out: &mut Vec<u8>,
    omit_dnssec: bool,
) -> Result<usize> {
    let saved_len = out.len();
    let saved_cctx = cctx.clone();
    let mut count = 0;

    for packed in ncache.rdatas().iter() {
        let record = match current(packed) {
            Ok(record) => record,
            Err(e) => {
                out.truncate(saved_len);
                *cctx = saved_cctx;
                return Err(e);
            }
        };
        if omit_dnssec && is_dnssec_type(record.rr_type) {
            continue;
        }
        for rdata in record.iter() {
            cctx.write_name(&record.name, out);
            out.extend_from_slice(&u16::from(record.rr_type).to_be_bytes());
            out.extend_from_slice(&u16::from(ncache.class).to_be_bytes());
            out.extend_from_slice(&u32::from(ncache.ttl).to_be_bytes());
            out.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
            out.extend_from_slice(rdata.octets());
            count += 1;
        }
    }
    Ok(count)
}

////////////////////////////////////////////////////////////////////////
// TRUST UPDATES                                                      //
////////////////////////////////////////////////////////////////////////

/// Sets the trust of a negative-cache RRset, rewriting the trust byte
/// of every packed record in place.
pub fn set_trust(ncache: &mut Rrset, trust: Trust) {
    ncache.trust = trust;
    ncache.rdatas.for_each_mut(|blob| {
        if let Ok(name_len) = Name::validate_uncompressed(blob) {
            if let Some(trust_byte) = blob.get_mut(name_len + 2) {
                *trust_byte = u8::from(trust);
            }
        }
    });
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
