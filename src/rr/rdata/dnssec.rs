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

//! Handling of the DNSSEC RR types defined by [RFC 4034] (DNSKEY, DS,
//! RRSIG, NSEC), [RFC 5155] (NSEC3, NSEC3PARAM), and [RFC 7344] (CDS,
//! CDNSKEY).
//!
//! [RFC 4034]: https://datatracker.ietf.org/doc/html/rfc4034
//! [RFC 5155]: https://datatracker.ietf.org/doc/html/rfc5155
//! [RFC 7344]: https://datatracker.ietf.org/doc/html/rfc7344

use std::fmt;

use super::{Rdata, ReadRdataError};
use crate::name::Name;
use crate::rr::Type;

////////////////////////////////////////////////////////////////////////
// ALGORITHM AND DIGEST NUMBERS                                       //
////////////////////////////////////////////////////////////////////////

/// DNSSEC signing algorithm numbers (the IANA "DNS Security Algorithm
/// Numbers" registry).
pub mod algorithm {
    pub const RSAMD5: u8 = 1;
    pub const DSA: u8 = 3;
    pub const RSASHA1: u8 = 5;
    pub const NSEC3DSA: u8 = 6;
    pub const NSEC3RSASHA1: u8 = 7;
    pub const RSASHA256: u8 = 8;
    pub const RSASHA512: u8 = 10;
    pub const ECDSAP256SHA256: u8 = 13;
    pub const ECDSAP384SHA384: u8 = 14;
    pub const ED25519: u8 = 15;
    pub const ED448: u8 = 16;
}

/// DS digest type numbers (the IANA "Delegation Signer (DS) Resource
/// Record Digest Algorithms" registry).
pub mod digest {
    pub const SHA1: u8 = 1;
    pub const SHA256: u8 = 2;
    pub const GOST: u8 = 3;
    pub const SHA384: u8 = 4;

    /// Returns the digest length for the given digest type, if known.
    pub fn length(digest_type: u8) -> Option<usize> {
        match digest_type {
            SHA1 => Some(20),
            SHA256 => Some(32),
            SHA384 => Some(48),
            _ => None,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// DNSKEY                                                             //
////////////////////////////////////////////////////////////////////////

/// The ZONE flag bit of a DNSKEY record ([RFC 4034 § 2.1.1]).
///
/// [RFC 4034 § 2.1.1]: https://datatracker.ietf.org/doc/html/rfc4034#section-2.1.1
pub const DNSKEY_FLAG_ZONE: u16 = 0x0100;

/// The REVOKE flag bit of a DNSKEY record ([RFC 5011 § 3]).
///
/// [RFC 5011 § 3]: https://datatracker.ietf.org/doc/html/rfc5011#section-3
pub const DNSKEY_FLAG_REVOKE: u16 = 0x0080;

/// The SEP ("key-signing key") flag bit of a DNSKEY record
/// ([RFC 4034 § 2.1.1]).
///
/// [RFC 4034 § 2.1.1]: https://datatracker.ietf.org/doc/html/rfc4034#section-2.1.1
pub const DNSKEY_FLAG_SEP: u16 = 0x0001;

/// A typed view of DNSKEY (or CDNSKEY) RDATA.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Dnskey<'a> {
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub public_key: &'a [u8],
}

impl<'a> Dnskey<'a> {
    /// Parses DNSKEY RDATA into its fields.
    pub fn try_from_rdata(rdata: &'a Rdata) -> Result<Self, ReadRdataError> {
        if rdata.len() < 4 {
            return Err(ReadRdataError::Other);
        }
        Ok(Self {
            flags: u16::from_be_bytes(rdata[0..2].try_into().unwrap()),
            protocol: rdata[2],
            algorithm: rdata[3],
            public_key: &rdata[4..],
        })
    }

    pub fn is_zone_key(&self) -> bool {
        self.flags & DNSKEY_FLAG_ZONE != 0
    }

    pub fn is_revoked(&self) -> bool {
        self.flags & DNSKEY_FLAG_REVOKE != 0
    }

    pub fn is_sep(&self) -> bool {
        self.flags & DNSKEY_FLAG_SEP != 0
    }

    /// Computes the key tag of this key ([RFC 4034 Appendix B]).
    ///
    /// [RFC 4034 Appendix B]: https://datatracker.ietf.org/doc/html/rfc4034#appendix-B
    pub fn key_tag(&self) -> u16 {
        let mut wire = Vec::with_capacity(4 + self.public_key.len());
        serialize_dnskey(
            self.flags,
            self.protocol,
            self.algorithm,
            self.public_key,
            &mut wire,
        );
        key_tag_of_wire(&wire, self.algorithm)
    }
}

/// Serializes a DNSKEY record into the provided buffer.
pub fn serialize_dnskey(flags: u16, protocol: u8, algorithm: u8, key: &[u8], buf: &mut Vec<u8>) {
    buf.reserve(4 + key.len());
    buf.extend_from_slice(&flags.to_be_bytes());
    buf.push(protocol);
    buf.push(algorithm);
    buf.extend_from_slice(key);
}

/// Checks whether `rdata` is a valid serialized DNSKEY record. This is
/// for the implementation of [`Rdata::validate`].
pub(super) fn validate_dnskey(rdata: &Rdata) -> Result<(), ReadRdataError> {
    if rdata.len() >= 4 {
        Ok(())
    } else {
        Err(ReadRdataError::Other)
    }
}

/// Computes the key tag over a DNSKEY record already in wire form.
///
/// The obsolete RSA/MD5 algorithm predates the checksum scheme and
/// takes its tag from the low bits of the modulus instead.
pub fn key_tag_of_wire(wire: &[u8], algorithm: u8) -> u16 {
    if algorithm == algorithm::RSAMD5 {
        if wire.len() < 3 {
            return 0;
        }
        return u16::from_be_bytes(wire[wire.len() - 3..wire.len() - 1].try_into().unwrap());
    }
    let mut ac: u32 = 0;
    for (i, &octet) in wire.iter().enumerate() {
        if i & 1 == 0 {
            ac += (octet as u32) << 8;
        } else {
            ac += octet as u32;
        }
    }
    ac += (ac >> 16) & 0xffff;
    (ac & 0xffff) as u16
}

////////////////////////////////////////////////////////////////////////
// DS                                                                 //
////////////////////////////////////////////////////////////////////////

/// A typed view of DS (or CDS) RDATA.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ds<'a> {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    pub digest: &'a [u8],
}

impl<'a> Ds<'a> {
    /// Parses DS RDATA into its fields.
    pub fn try_from_rdata(rdata: &'a Rdata) -> Result<Self, ReadRdataError> {
        if rdata.len() < 4 {
            return Err(ReadRdataError::Other);
        }
        Ok(Self {
            key_tag: u16::from_be_bytes(rdata[0..2].try_into().unwrap()),
            algorithm: rdata[2],
            digest_type: rdata[3],
            digest: &rdata[4..],
        })
    }
}

/// Serializes a DS record into the provided buffer.
pub fn serialize_ds(key_tag: u16, algorithm: u8, digest_type: u8, digest: &[u8], buf: &mut Vec<u8>) {
    buf.reserve(4 + digest.len());
    buf.extend_from_slice(&key_tag.to_be_bytes());
    buf.push(algorithm);
    buf.push(digest_type);
    buf.extend_from_slice(digest);
}

/// Checks whether `rdata` is a valid serialized DS record. The digest
/// length is checked when the digest type is a known one. This is for
/// the implementation of [`Rdata::validate`].
pub(super) fn validate_ds(rdata: &Rdata) -> Result<(), ReadRdataError> {
    if rdata.len() < 5 {
        return Err(ReadRdataError::Other);
    }
    match digest::length(rdata[3]) {
        Some(len) if rdata.len() != 4 + len => Err(ReadRdataError::Other),
        _ => Ok(()),
    }
}

////////////////////////////////////////////////////////////////////////
// RRSIG                                                              //
////////////////////////////////////////////////////////////////////////

/// A typed view of RRSIG RDATA.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rrsig<'a> {
    pub type_covered: Type,
    pub algorithm: u8,
    pub labels: u8,
    pub original_ttl: u32,
    pub expiration: u32,
    pub inception: u32,
    pub key_tag: u16,
    pub signer: Box<Name>,
    pub signature: &'a [u8],
}

impl<'a> Rrsig<'a> {
    /// Parses RRSIG RDATA into its fields.
    pub fn try_from_rdata(rdata: &'a Rdata) -> Result<Self, ReadRdataError> {
        if rdata.len() < 18 {
            return Err(ReadRdataError::Other);
        }
        let (signer, signer_len) = Name::try_from_uncompressed(&rdata[18..])?;
        let signature = &rdata[18 + signer_len..];
        if signature.is_empty() {
            return Err(ReadRdataError::Other);
        }
        Ok(Self {
            type_covered: Type::from(u16::from_be_bytes(rdata[0..2].try_into().unwrap())),
            algorithm: rdata[2],
            labels: rdata[3],
            original_ttl: u32::from_be_bytes(rdata[4..8].try_into().unwrap()),
            expiration: u32::from_be_bytes(rdata[8..12].try_into().unwrap()),
            inception: u32::from_be_bytes(rdata[12..16].try_into().unwrap()),
            key_tag: u16::from_be_bytes(rdata[16..18].try_into().unwrap()),
            signer,
            signature,
        })
    }

    /// Returns the portion of the RDATA preceding the signature field
    /// (the part that is itself covered by the signature, per
    /// [RFC 4034 § 3.1.8.1]).
    ///
    /// [RFC 4034 § 3.1.8.1]: https://datatracker.ietf.org/doc/html/rfc4034#section-3.1.8.1
    pub fn signed_prefix(rdata: &Rdata) -> Result<&[u8], ReadRdataError> {
        if rdata.len() < 18 {
            return Err(ReadRdataError::Other);
        }
        let signer_len = Name::validate_uncompressed(&rdata[18..])?;
        Ok(&rdata[..18 + signer_len])
    }
}

/// Serializes the fixed-size and signer-name fields of an RRSIG record
/// into the provided buffer, followed by `signature` (which may be
/// empty while the signature is still being computed).
#[allow(clippy::too_many_arguments)]
pub fn serialize_rrsig(
    type_covered: Type,
    algorithm: u8,
    labels: u8,
    original_ttl: u32,
    expiration: u32,
    inception: u32,
    key_tag: u16,
    signer: &Name,
    signature: &[u8],
    buf: &mut Vec<u8>,
) {
    buf.reserve(18 + signer.wire_repr().len() + signature.len());
    buf.extend_from_slice(&u16::from(type_covered).to_be_bytes());
    buf.push(algorithm);
    buf.push(labels);
    buf.extend_from_slice(&original_ttl.to_be_bytes());
    buf.extend_from_slice(&expiration.to_be_bytes());
    buf.extend_from_slice(&inception.to_be_bytes());
    buf.extend_from_slice(&key_tag.to_be_bytes());
    buf.extend_from_slice(signer.wire_repr());
    buf.extend_from_slice(signature);
}

/// Checks whether `rdata` is a valid serialized RRSIG record. This is
/// for the implementation of [`Rdata::validate`].
pub(super) fn validate_rrsig(rdata: &Rdata) -> Result<(), ReadRdataError> {
    if rdata.len() < 18 {
        return Err(ReadRdataError::Other);
    }
    let signer_len = Name::validate_uncompressed(&rdata[18..])?;
    if rdata.len() > 18 + signer_len {
        Ok(())
    } else {
        Err(ReadRdataError::Other)
    }
}

////////////////////////////////////////////////////////////////////////
// NSEC AND NSEC3                                                     //
////////////////////////////////////////////////////////////////////////

/// Checks whether `octets` is a valid NSEC/NSEC3 type bitmap
/// ([RFC 4034 § 4.1.2]).
///
/// [RFC 4034 § 4.1.2]: https://datatracker.ietf.org/doc/html/rfc4034#section-4.1.2
fn validate_type_bitmap(mut octets: &[u8]) -> Result<(), ReadRdataError> {
    while !octets.is_empty() {
        if octets.len() < 2 {
            return Err(ReadRdataError::Other);
        }
        let len = octets[1] as usize;
        if len == 0 || len > 32 || octets.len() < 2 + len {
            return Err(ReadRdataError::Other);
        }
        octets = &octets[2 + len..];
    }
    Ok(())
}

/// An iterator over the [`Type`]s set in an NSEC/NSEC3 type bitmap.
/// The bitmap must already be validated.
pub struct TypeBitmapIter<'a> {
    bitmap: &'a [u8],
    octet: usize,
    bit: u8,
}

impl<'a> TypeBitmapIter<'a> {
    /// Creates an iterator over the given (validated) type bitmap.
    pub fn new(bitmap: &'a [u8]) -> Self {
        Self {
            bitmap,
            octet: 0,
            bit: 0,
        }
    }
}

impl Iterator for TypeBitmapIter<'_> {
    type Item = Type;

    fn next(&mut self) -> Option<Type> {
        loop {
            let (&window, rest) = self.bitmap.split_first()?;
            let len = *rest.first()? as usize;
            let data = &rest[1..1 + len];
            while self.octet < len {
                let octet = data[self.octet];
                while self.bit < 8 {
                    let bit = self.bit;
                    self.bit += 1;
                    if octet & (0x80 >> bit) != 0 {
                        let value = (window as u16) << 8 | (self.octet as u16) << 3 | bit as u16;
                        return Some(Type::from(value));
                    }
                }
                self.bit = 0;
                self.octet += 1;
            }
            self.octet = 0;
            self.bit = 0;
            self.bitmap = &rest[1 + len..];
        }
    }
}

/// Serializes an NSEC/NSEC3 type bitmap ([RFC 4034 § 4.1.2]) from a
/// list of types, which need not be sorted or free of duplicates.
///
/// [RFC 4034 § 4.1.2]: https://datatracker.ietf.org/doc/html/rfc4034#section-4.1.2
pub fn serialize_type_bitmap(types: &[Type], buf: &mut Vec<u8>) {
    let mut values: Vec<u16> = types.iter().copied().map(u16::from).collect();
    values.sort_unstable();
    values.dedup();
    let mut i = 0;
    while i < values.len() {
        let window = (values[i] >> 8) as u8;
        let mut data = [0u8; 32];
        let mut max_octet = 0;
        while i < values.len() && (values[i] >> 8) as u8 == window {
            let low = (values[i] & 0xff) as usize;
            data[low >> 3] |= 0x80 >> (low & 7);
            max_octet = low >> 3;
            i += 1;
        }
        buf.push(window);
        buf.push(max_octet as u8 + 1);
        buf.extend_from_slice(&data[..=max_octet]);
    }
}

/// Serializes an NSEC record into the provided buffer.
pub fn serialize_nsec(next: &Name, types: &[Type], buf: &mut Vec<u8>) {
    buf.extend_from_slice(next.wire_repr());
    serialize_type_bitmap(types, buf);
}

/// Serializes an NSEC3 record into the provided buffer.
pub fn serialize_nsec3(
    hash_algorithm: u8,
    flags: u8,
    iterations: u16,
    salt: &[u8],
    next_hashed: &[u8],
    types: &[Type],
    buf: &mut Vec<u8>,
) {
    serialize_nsec3param(hash_algorithm, flags, iterations, salt, buf);
    buf.push(next_hashed.len() as u8);
    buf.extend_from_slice(next_hashed);
    serialize_type_bitmap(types, buf);
}

/// Serializes an NSEC3PARAM record (also the fixed prefix of an NSEC3
/// record) into the provided buffer.
pub fn serialize_nsec3param(
    hash_algorithm: u8,
    flags: u8,
    iterations: u16,
    salt: &[u8],
    buf: &mut Vec<u8>,
) {
    buf.push(hash_algorithm);
    buf.push(flags);
    buf.extend_from_slice(&iterations.to_be_bytes());
    buf.push(salt.len() as u8);
    buf.extend_from_slice(salt);
}

/// Checks whether `rdata` is a valid serialized NSEC record. This is
/// for the implementation of [`Rdata::validate`].
pub(super) fn validate_nsec(rdata: &Rdata) -> Result<(), ReadRdataError> {
    let next_len = Name::validate_uncompressed(rdata)?;
    validate_type_bitmap(&rdata[next_len..])
}

/// Checks whether `rdata` is a valid serialized NSEC3 record. This is
/// for the implementation of [`Rdata::validate`].
pub(super) fn validate_nsec3(rdata: &Rdata) -> Result<(), ReadRdataError> {
    // Fixed fields, salt, next hashed owner, type bitmap.
    if rdata.len() < 5 {
        return Err(ReadRdataError::Other);
    }
    let salt_len = rdata[4] as usize;
    let hash_len_index = 5 + salt_len;
    if rdata.len() <= hash_len_index {
        return Err(ReadRdataError::Other);
    }
    let hash_len = rdata[hash_len_index] as usize;
    let bitmap_index = hash_len_index + 1 + hash_len;
    if hash_len == 0 || rdata.len() < bitmap_index {
        return Err(ReadRdataError::Other);
    }
    validate_type_bitmap(&rdata[bitmap_index..])
}

/// Checks whether `rdata` is a valid serialized NSEC3PARAM record.
/// This is for the implementation of [`Rdata::validate`].
pub(super) fn validate_nsec3param(rdata: &Rdata) -> Result<(), ReadRdataError> {
    if rdata.len() < 5 {
        return Err(ReadRdataError::Other);
    }
    let salt_len = rdata[4] as usize;
    if rdata.len() == 5 + salt_len {
        Ok(())
    } else {
        Err(ReadRdataError::Other)
    }
}

////////////////////////////////////////////////////////////////////////
// SERIAL ARITHMETIC AND SIGNATURE TIMES                              //
////////////////////////////////////////////////////////////////////////

/// [RFC 1982] serial-number comparison: returns whether `a` precedes
/// `b` in 32-bit serial space. Signature inception and expiration
/// times are compared this way so that the scheme survives the year
/// 2106.
///
/// [RFC 1982]: https://datatracker.ietf.org/doc/html/rfc1982
pub fn serial_lt(a: u32, b: u32) -> bool {
    a != b && b.wrapping_sub(a) < 0x8000_0000
}

/// The companion of [`serial_lt`].
pub fn serial_gt(a: u32, b: u32) -> bool {
    serial_lt(b, a)
}

/// A signature time, held as seconds since the Unix epoch (mod 2³²).
///
/// The textual form is the 14-digit `YYYYMMDDHHMMSS` used in RRSIG
/// presentation format ([RFC 4034 § 3.2]).
///
/// [RFC 4034 § 3.2]: https://datatracker.ietf.org/doc/html/rfc4034#section-3.2
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SigTime(pub u32);

impl SigTime {
    /// Parses `YYYYMMDDHHMMSS`, or a bare decimal number of seconds
    /// since the epoch.
    pub fn parse(text: &str) -> Result<Self, &'static str> {
        if text.len() == 14 && text.bytes().all(|b| b.is_ascii_digit()) {
            let num =
                |range: std::ops::Range<usize>| text[range].parse::<u64>().map_err(|_| "bad digit");
            let year = num(0..4)?;
            let month = num(4..6)?;
            let day = num(6..8)?;
            let hour = num(8..10)?;
            let minute = num(10..12)?;
            let second = num(12..14)?;
            if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
                return Err("invalid date");
            }
            if hour > 23 || minute > 59 || second > 60 {
                return Err("invalid time of day");
            }
            let days = days_from_civil(year as i64, month as u32, day as u32);
            let secs = days * 86400 + (hour * 3600 + minute * 60 + second) as i64;
            Ok(Self(secs as u32))
        } else {
            text.parse::<u32>().map(Self).or(Err("invalid time"))
        }
    }
}

impl std::str::FromStr for SigTime {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl fmt::Display for SigTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let secs = self.0 as i64;
        let (days, tod) = (secs.div_euclid(86400), secs.rem_euclid(86400));
        let (year, month, day) = civil_from_days(days);
        write!(
            f,
            "{:04}{:02}{:02}{:02}{:02}{:02}",
            year,
            month,
            day,
            tod / 3600,
            (tod % 3600) / 60,
            tod % 60
        )
    }
}

/// Days from 1970-01-01 to the given proleptic-Gregorian date.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = (month as i64 + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe - 719468
}

/// The inverse of [`days_from_civil`].
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719468;
    let era = z.div_euclid(146097);
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if month <= 2 { y + 1 } else { y }, month, day)
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    // The root KSK (key tag 20326), abbreviated: only the flags,
    // protocol and algorithm matter to the field parser.
    const DNSKEY_FIELDS: &[u8] = b"\x01\x01\x03\x08key-bits";

    #[test]
    fn dnskey_fields_parse() {
        let rdata: &Rdata = DNSKEY_FIELDS.try_into().unwrap();
        let dnskey = Dnskey::try_from_rdata(rdata).unwrap();
        assert_eq!(dnskey.flags, 0x0101);
        assert_eq!(dnskey.protocol, 3);
        assert_eq!(dnskey.algorithm, algorithm::RSASHA256);
        assert_eq!(dnskey.public_key, b"key-bits");
        assert!(dnskey.is_zone_key());
        assert!(dnskey.is_sep());
        assert!(!dnskey.is_revoked());
    }

    #[test]
    fn key_tag_checksum_matches_rfc_4034_appendix_b() {
        // A tiny DNSKEY wire form with a hand-computed checksum.
        let wire = b"\x01\x00\x03\x0d\xaa\xbb";
        let mut ac: u32 = 0x0100 + 0x030d + 0xaabb;
        ac += (ac >> 16) & 0xffff;
        assert_eq!(
            key_tag_of_wire(wire, algorithm::ECDSAP256SHA256),
            (ac & 0xffff) as u16
        );
    }

    #[test]
    fn ds_round_trips_through_fields() {
        let mut buf = Vec::new();
        serialize_ds(20326, algorithm::RSASHA256, digest::SHA256, &[0xab; 32], &mut buf);
        let rdata: &Rdata = buf.as_slice().try_into().unwrap();
        rdata.validate(crate::class::Class::IN, Type::DS).unwrap();
        let ds = Ds::try_from_rdata(rdata).unwrap();
        assert_eq!(ds.key_tag, 20326);
        assert_eq!(ds.digest_type, digest::SHA256);
        assert_eq!(ds.digest.len(), 32);
    }

    #[test]
    fn ds_digest_length_is_checked() {
        let mut buf = Vec::new();
        serialize_ds(1, algorithm::RSASHA256, digest::SHA256, &[0xab; 20], &mut buf);
        let rdata: &Rdata = buf.as_slice().try_into().unwrap();
        assert!(rdata.validate(crate::class::Class::IN, Type::DS).is_err());
    }

    #[test]
    fn rrsig_fields_parse() {
        let signer: Box<Name> = "example.test.".parse().unwrap();
        let mut buf = Vec::new();
        serialize_rrsig(
            Type::CDS,
            algorithm::ECDSAP256SHA256,
            2,
            3600,
            0x0123_4567,
            0x0012_3456,
            12345,
            &signer,
            b"sig-bits",
            &mut buf,
        );
        let rdata: &Rdata = buf.as_slice().try_into().unwrap();
        rdata.validate(crate::class::Class::IN, Type::RRSIG).unwrap();
        let rrsig = Rrsig::try_from_rdata(rdata).unwrap();
        assert_eq!(rrsig.type_covered, Type::CDS);
        assert_eq!(rrsig.labels, 2);
        assert_eq!(rrsig.key_tag, 12345);
        assert_eq!(rrsig.signer, signer);
        assert_eq!(rrsig.signature, b"sig-bits");
        assert_eq!(
            Rrsig::signed_prefix(rdata).unwrap().len(),
            rdata.len() - b"sig-bits".len()
        );
    }

    #[test]
    fn serial_comparison_wraps() {
        assert!(serial_lt(1, 2));
        assert!(!serial_lt(2, 1));
        assert!(!serial_lt(7, 7));
        // Across the wrap point, 0xffffffff precedes 0.
        assert!(serial_lt(0xffff_ffff, 0));
        assert!(serial_gt(0, 0xffff_ffff));
    }

    #[test]
    fn sig_time_round_trips() {
        // 2004-09-21 21:24:12 UTC, the example from RFC 4034 § 3.3.
        let t = SigTime::parse("20040921212412").unwrap();
        assert_eq!(t.0, 1095801852);
        assert_eq!(t.to_string(), "20040921212412");

        let epoch = SigTime::parse("19700101000000").unwrap();
        assert_eq!(epoch.0, 0);
    }

    #[test]
    fn sig_time_accepts_raw_seconds() {
        assert_eq!(SigTime::parse("1095801852").unwrap().0, 1095801852);
        assert!(SigTime::parse("yesterday").is_err());
    }

    #[test]
    fn type_bitmap_iteration() {
        // Window 0: A (bit 1), NS (bit 2), RRSIG (46), NSEC (47).
        let bitmap = b"\x00\x06\x60\x00\x00\x00\x00\x03";
        validate_type_bitmap(bitmap).unwrap();
        let types: Vec<Type> = TypeBitmapIter::new(bitmap).collect();
        assert_eq!(types, [Type::A, Type::NS, Type::RRSIG, Type::NSEC]);
    }

    #[test]
    fn type_bitmap_serialization_round_trips() {
        let types = [Type::NSEC, Type::A, Type::SOA, Type::A, Type::CDS];
        let mut bitmap = Vec::new();
        serialize_type_bitmap(&types, &mut bitmap);
        validate_type_bitmap(&bitmap).unwrap();
        let round_tripped: Vec<Type> = TypeBitmapIter::new(&bitmap).collect();
        assert_eq!(round_tripped, [Type::A, Type::SOA, Type::NSEC, Type::CDS]);
    }

    #[test]
    fn bad_type_bitmaps_are_rejected() {
        assert!(validate_type_bitmap(b"\x00").is_err());
        assert!(validate_type_bitmap(b"\x00\x00").is_err());
        assert!(validate_type_bitmap(b"\x00\x21").is_err());
        assert!(validate_type_bitmap(b"\x00\x02\x01").is_err());
    }
}
