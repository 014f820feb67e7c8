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

//! DNSSEC validation of child key material against parent DS RRsets.
//!
//! This module implements the checks behind CDS/CDNSKEY processing
//! ([RFC 7344]): matching a DNSKEY RRset against a DS RRset
//! ([`match_keyset_dsset`]), collecting the algorithms whose
//! signatures verify ([`matching_sigs`]), and the two acceptance
//! predicates built on them ([`signed_loose`] and [`signed_strict`]).
//! [`consistent_digests`] checks that a CDS set covers every key with
//! the same digest types.
//!
//! [RFC 7344]: https://datatracker.ietf.org/doc/html/rfc7344

use std::fmt;

use log::{debug, error, warn};

pub mod ds;
pub mod keyfile;
mod verify;

pub use verify::{verify_rrset, VerifyingKey};

use crate::name::Name;
use crate::rr::rdata::{key_tag_of_wire, serial_lt, Dnskey, Ds, ReadRdataError, Rrsig};
use crate::rr::{Rdata, Rrset};

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// Errors that occur during DNSSEC validation.
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// The DNSSEC signing algorithm is not supported.
    UnsupportedAlgorithm(u8),

    /// The DS digest type is not supported.
    UnsupportedDigest(u8),

    /// The public key field could not be decoded.
    InvalidKey,

    /// The signature did not verify.
    BadSignature,

    /// RDATA could not be parsed into its fields.
    Rdata(ReadRdataError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnsupportedAlgorithm(algorithm) => {
                write!(f, "unsupported algorithm {}", algorithm)
            }
            Self::UnsupportedDigest(digest_type) => {
                write!(f, "unsupported digest type {}", digest_type)
            }
            Self::InvalidKey => f.write_str("invalid public key"),
            Self::BadSignature => f.write_str("bad signature"),
            Self::Rdata(_) => f.write_str("malformed RDATA"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ReadRdataError> for Error {
    fn from(error: ReadRdataError) -> Self {
        Self::Rdata(error)
    }
}

/// A convenient alias for `Result` types in DNSSEC validation code.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// KEY TABLES                                                         //
////////////////////////////////////////////////////////////////////////

/// A DNSKEY from the child keyset, with a verifier attached when the
/// key matched the DS RRset it was checked against.
pub struct KeyInfo<'a> {
    pub rdata: &'a Rdata,
    pub key: Option<VerifyingKey>,
    pub algo: u8,
    pub tag: u16,
}

/// How strictly [`match_keyset_dsset`] treats a DS whose key tag and
/// algorithm match a key but whose digest does not.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Strictness {
    /// A non-matching DS is skipped.
    Loose,

    /// A non-matching DS fails the whole check for that key. Used
    /// against a freshly synthesized DS set, where a digest mismatch
    /// means corruption.
    Tight,
}

/// Matches each DNSKEY of `keyset` against `dsset` and returns the
/// resulting key table. A key that matched at least one DS gets a
/// decoded verifier; a key that did not (or whose public key cannot be
/// decoded) is left without one.
pub fn match_keyset_dsset<'a>(
    owner: &Name,
    keyset: &'a Rrset,
    dsset: &Rrset,
    strictness: Strictness,
) -> Result<Vec<KeyInfo<'a>>> {
    let mut keytable = Vec::with_capacity(keyset.len());
    for rdata in keyset.rdatas().iter() {
        let dnskey = Dnskey::try_from_rdata(rdata)?;
        let tag = key_tag_of_wire(rdata.octets(), dnskey.algorithm);
        let mut keyinfo = KeyInfo {
            rdata,
            key: None,
            algo: dnskey.algorithm,
            tag,
        };
        if match_key_dsset(owner, &keyinfo, dsset, strictness)? {
            match VerifyingKey::try_from_dnskey(&dnskey) {
                Ok(key) => keyinfo.key = Some(key),
                Err(e) => debug!(
                    "could not decode DNSKEY {} {} {}: {}",
                    owner, tag, dnskey.algorithm, e
                ),
            }
        }
        keytable.push(keyinfo);
    }
    Ok(keytable)
}

/// Checks one key against the DS RRset. Returns whether any DS record
/// matched.
fn match_key_dsset(
    owner: &Name,
    keyinfo: &KeyInfo,
    dsset: &Rrset,
    strictness: Strictness,
) -> Result<bool> {
    for ds_rdata in dsset.rdatas().iter() {
        let ds = Ds::try_from_rdata(ds_rdata)?;
        if ds.key_tag != keyinfo.tag || ds.algorithm != keyinfo.algo {
            continue;
        }
        let built = match ds::build(owner, keyinfo.rdata, ds.digest_type) {
            Ok(built) => built,
            Err(_) => continue,
        };
        if built == ds_rdata.octets() {
            return Ok(true);
        }
        if strictness == Strictness::Tight {
            warn!(
                "key does not match {} {} {} {} when it looks like it should",
                dsset.rr_type, owner, keyinfo.tag, keyinfo.algo
            );
            return Ok(false);
        }
    }
    debug!(
        "no matching {} for {} {} {}",
        dsset.rr_type, owner, keyinfo.tag, keyinfo.algo
    );
    Ok(false)
}

////////////////////////////////////////////////////////////////////////
// SIGNATURE MATCHING                                                 //
////////////////////////////////////////////////////////////////////////

/// Carried across [`matching_sigs`] calls in one validation pass: the
/// replay floor and the inception time of the oldest signature that
/// has verified so far (zero until one has).
pub struct SigContext {
    pub notbefore: u32,
    pub oldest_sig: u32,
}

impl SigContext {
    /// Creates a context with the given replay floor.
    pub fn new(notbefore: u32) -> Self {
        Self {
            notbefore,
            oldest_sig: 0,
        }
    }
}

/// Checks the RRSIGs of `sigset` over `rrset` against `keytable` and
/// returns, for each key, the algorithm it validly signed with (zero
/// where it did not).
///
/// Signatures whose inception precedes the replay floor are skipped
/// before any cryptography; `oldest_sig` moves only on successful
/// verification, so it never drops below the floor.
pub fn matching_sigs(
    context: &mut SigContext,
    keytable: &[KeyInfo],
    rrset: &Rrset,
    sigset: &Rrset,
) -> Result<Vec<u8>> {
    let mut algo = vec![0u8; keytable.len()];
    for sig_rdata in sigset.rdatas().iter() {
        let rrsig = Rrsig::try_from_rdata(sig_rdata)?;
        if serial_lt(rrsig.inception, context.notbefore) {
            debug!("skip RRSIG by key {}: too old", rrsig.key_tag);
            continue;
        }
        let position = keytable.iter().position(|keyinfo| {
            keyinfo.tag == rrsig.key_tag
                && keyinfo.algo == rrsig.algorithm
                && *rrsig.signer == *rrset.owner
        });
        let Some(position) = position else { continue };
        let Some(key) = &keytable[position].key else {
            continue;
        };
        match verify_rrset(key, rrset, &rrsig) {
            Ok(()) => {
                algo[position] = rrsig.algorithm;
                if context.oldest_sig == 0 || serial_lt(rrsig.inception, context.oldest_sig) {
                    context.oldest_sig = rrsig.inception;
                }
            }
            Err(e) => debug!("RRSIG by key {} failed to verify: {}", rrsig.key_tag, e),
        }
    }
    Ok(algo)
}

/// Returns whether any key signed successfully. This proves child
/// records authentic under the existing DS set.
pub fn signed_loose(algo: &[u8]) -> bool {
    algo.iter().any(|&a| a != 0)
}

/// Returns whether every algorithm appearing in `dsset` has a valid
/// signature by some key of that algorithm. This proves a new DS set
/// does not orphan any algorithm.
pub fn signed_strict(dsset: &Rrset, algo: &[u8]) -> Result<bool> {
    let mut all_covered = true;
    for ds_rdata in dsset.rdatas().iter() {
        let ds = Ds::try_from_rdata(ds_rdata)?;
        if !algo.contains(&ds.algorithm) {
            error!(
                "missing signature for algorithm {} (key {})",
                ds.algorithm, ds.key_tag
            );
            all_covered = false;
        }
    }
    Ok(all_covered)
}

////////////////////////////////////////////////////////////////////////
// DIGEST CONSISTENCY                                                 //
////////////////////////////////////////////////////////////////////////

/// Returns whether every `(key tag, algorithm)` group in `dsset` is
/// covered by the same set of digest types.
pub fn consistent_digests(dsset: &Rrset) -> Result<bool> {
    let mut views = Vec::with_capacity(dsset.len());
    for rdata in dsset.rdatas().iter() {
        views.push(Ds::try_from_rdata(rdata)?);
    }
    views.sort_unstable_by_key(|ds| (ds.key_tag, ds.algorithm, ds.digest_type));

    let mut first_group: Option<Vec<u8>> = None;
    let mut i = 0;
    while i < views.len() {
        let key = (views[i].key_tag, views[i].algorithm);
        let mut digest_types = Vec::new();
        while i < views.len() && (views[i].key_tag, views[i].algorithm) == key {
            digest_types.push(views[i].digest_type);
            i += 1;
        }
        match &first_group {
            None => first_group = Some(digest_types),
            Some(expected) if *expected == digest_types => (),
            Some(_) => return Ok(false),
        }
    }
    Ok(true)
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
