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

//! Presentation (text) formatting of RDATA.

use std::fmt;
use std::fmt::Display as _;
use std::net::{Ipv4Addr, Ipv6Addr};

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;

use super::dnssec::{Dnskey, Ds, Rrsig, SigTime, TypeBitmapIter};
use super::Rdata;
use crate::name::Name;
use crate::rr::Type;
use crate::util::nibble_to_ascii_hex_digit;

/// Formats RDATA in the presentation (zone file) format for its type.
///
/// Types without a specific presentation format, and RDATA too
/// malformed to present, are written in the RFC 3597 `\# <len> <hex>`
/// form (the [`Rdata` `Display` impl](`Rdata`)).
pub struct Presentation<'a> {
    rr_type: Type,
    rdata: &'a Rdata,
}

impl<'a> Presentation<'a> {
    pub fn new(rr_type: Type, rdata: &'a Rdata) -> Self {
        Self { rr_type, rdata }
    }
}

impl fmt::Display for Presentation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let result = match self.rr_type {
            Type::NS | Type::CNAME | Type::PTR => fmt_name(self.rdata, f),
            Type::A => fmt_a(self.rdata, f),
            Type::SOA => fmt_soa(self.rdata, f),
            Type::HINFO => fmt_hinfo(self.rdata, f),
            Type::MX => fmt_mx(self.rdata, f),
            Type::TXT => fmt_txt(self.rdata, f),
            Type::AAAA => fmt_aaaa(self.rdata, f),
            Type::SRV => fmt_srv(self.rdata, f),
            Type::DS | Type::CDS => fmt_ds(self.rdata, f),
            Type::DNSKEY | Type::CDNSKEY => fmt_dnskey(self.rdata, f),
            Type::RRSIG => fmt_rrsig(self.rdata, f),
            Type::NSEC => fmt_nsec(self.rdata, f),
            Type::NSEC3 => fmt_nsec3(self.rdata, f),
            Type::NSEC3PARAM => fmt_nsec3param(self.rdata, f),
            _ => None,
        };
        match result {
            Some(result) => result,
            None => self.rdata.fmt(f),
        }
    }
}

// Each formatter below parses the entire RDATA before writing anything,
// so that a malformed record falls back to the \# form without leaving
// partial output behind.

fn fmt_name(rdata: &Rdata, f: &mut fmt::Formatter) -> Option<fmt::Result> {
    let (name, len) = Name::try_from_uncompressed(rdata).ok()?;
    if len != rdata.len() {
        return None;
    }
    Some(name.fmt(f))
}

fn fmt_a(rdata: &Rdata, f: &mut fmt::Formatter) -> Option<fmt::Result> {
    let octets: [u8; 4] = rdata.octets().try_into().ok()?;
    Some(Ipv4Addr::from(octets).fmt(f))
}

fn fmt_aaaa(rdata: &Rdata, f: &mut fmt::Formatter) -> Option<fmt::Result> {
    let octets: [u8; 16] = rdata.octets().try_into().ok()?;
    Some(Ipv6Addr::from(octets).fmt(f))
}

fn fmt_soa(rdata: &Rdata, f: &mut fmt::Formatter) -> Option<fmt::Result> {
    let (mname, mname_len) = Name::try_from_uncompressed(rdata).ok()?;
    let (rname, rname_len) = Name::try_from_uncompressed(&rdata[mname_len..]).ok()?;
    let fixed = &rdata[mname_len + rname_len..];
    if fixed.len() != 20 {
        return None;
    }
    let field = |i: usize| u32::from_be_bytes(fixed[4 * i..4 * i + 4].try_into().unwrap());
    Some(write!(
        f,
        "{} {} {} {} {} {} {}",
        mname,
        rname,
        field(0),
        field(1),
        field(2),
        field(3),
        field(4),
    ))
}

fn fmt_mx(rdata: &Rdata, f: &mut fmt::Formatter) -> Option<fmt::Result> {
    if rdata.len() < 2 {
        return None;
    }
    let preference = u16::from_be_bytes(rdata[0..2].try_into().unwrap());
    let (exchange, len) = Name::try_from_uncompressed(&rdata[2..]).ok()?;
    if 2 + len != rdata.len() {
        return None;
    }
    Some(write!(f, "{} {}", preference, exchange))
}

fn fmt_srv(rdata: &Rdata, f: &mut fmt::Formatter) -> Option<fmt::Result> {
    if rdata.len() < 6 {
        return None;
    }
    let field = |i: usize| u16::from_be_bytes(rdata[2 * i..2 * i + 2].try_into().unwrap());
    let (target, len) = Name::try_from_uncompressed(&rdata[6..]).ok()?;
    if 6 + len != rdata.len() {
        return None;
    }
    Some(write!(
        f,
        "{} {} {} {}",
        field(0),
        field(1),
        field(2),
        target,
    ))
}

fn fmt_hinfo(rdata: &Rdata, f: &mut fmt::Formatter) -> Option<fmt::Result> {
    let (cpu, rest) = split_character_string(rdata)?;
    let (os, rest) = split_character_string(rest)?;
    if !rest.is_empty() {
        return None;
    }
    Some((|| {
        write_character_string(cpu, f)?;
        f.write_str(" ")?;
        write_character_string(os, f)
    })())
}

fn fmt_txt(rdata: &Rdata, f: &mut fmt::Formatter) -> Option<fmt::Result> {
    // Validate the whole sequence first.
    let mut rest: &[u8] = rdata;
    let mut count = 0;
    while !rest.is_empty() {
        rest = split_character_string(rest)?.1;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some((|| {
        let mut rest: &[u8] = rdata;
        let mut first = true;
        while !rest.is_empty() {
            if !first {
                f.write_str(" ")?;
            }
            let (string, next) = split_character_string(rest).unwrap();
            write_character_string(string, f)?;
            rest = next;
            first = false;
        }
        Ok(())
    })())
}

fn fmt_ds(rdata: &Rdata, f: &mut fmt::Formatter) -> Option<fmt::Result> {
    let ds = Ds::try_from_rdata(rdata).ok()?;
    Some((|| {
        write!(f, "{} {} {} ", ds.key_tag, ds.algorithm, ds.digest_type)?;
        write_hex(ds.digest, f)
    })())
}

fn fmt_dnskey(rdata: &Rdata, f: &mut fmt::Formatter) -> Option<fmt::Result> {
    let dnskey = Dnskey::try_from_rdata(rdata).ok()?;
    Some(write!(
        f,
        "{} {} {} {}",
        dnskey.flags,
        dnskey.protocol,
        dnskey.algorithm,
        BASE64_STANDARD.encode(dnskey.public_key),
    ))
}

fn fmt_rrsig(rdata: &Rdata, f: &mut fmt::Formatter) -> Option<fmt::Result> {
    let rrsig = Rrsig::try_from_rdata(rdata).ok()?;
    Some(write!(
        f,
        "{} {} {} {} {} {} {} {} {}",
        rrsig.type_covered,
        rrsig.algorithm,
        rrsig.labels,
        rrsig.original_ttl,
        SigTime(rrsig.expiration),
        SigTime(rrsig.inception),
        rrsig.key_tag,
        rrsig.signer,
        BASE64_STANDARD.encode(rrsig.signature),
    ))
}

fn fmt_nsec(rdata: &Rdata, f: &mut fmt::Formatter) -> Option<fmt::Result> {
    let (next, len) = Name::try_from_uncompressed(rdata).ok()?;
    Some((|| {
        next.fmt(f)?;
        for rr_type in TypeBitmapIter::new(&rdata[len..]) {
            write!(f, " {}", rr_type)?;
        }
        Ok(())
    })())
}

fn fmt_nsec3(rdata: &Rdata, f: &mut fmt::Formatter) -> Option<fmt::Result> {
    let (fixed, rest) = split_nsec3_fixed(rdata)?;
    let next_len = *rest.first()? as usize;
    let next_hashed = rest.get(1..1 + next_len)?;
    let bitmap = &rest[1 + next_len..];
    Some((|| {
        write_nsec3_fixed(fixed, f)?;
        f.write_str(" ")?;
        write_base32hex(next_hashed, f)?;
        for rr_type in TypeBitmapIter::new(bitmap) {
            write!(f, " {}", rr_type)?;
        }
        Ok(())
    })())
}

fn fmt_nsec3param(rdata: &Rdata, f: &mut fmt::Formatter) -> Option<fmt::Result> {
    let (fixed, rest) = split_nsec3_fixed(rdata)?;
    if !rest.is_empty() {
        return None;
    }
    Some(write_nsec3_fixed(fixed, f))
}

/// The shared leading fields of NSEC3 and NSEC3PARAM RDATA: hash
/// algorithm, flags, iterations, and salt.
struct Nsec3Fixed<'a> {
    hash_algorithm: u8,
    flags: u8,
    iterations: u16,
    salt: &'a [u8],
}

fn split_nsec3_fixed(rdata: &Rdata) -> Option<(Nsec3Fixed, &[u8])> {
    if rdata.len() < 5 {
        return None;
    }
    let salt_len = rdata[4] as usize;
    let salt = rdata.get(5..5 + salt_len)?;
    Some((
        Nsec3Fixed {
            hash_algorithm: rdata[0],
            flags: rdata[1],
            iterations: u16::from_be_bytes(rdata[2..4].try_into().unwrap()),
            salt,
        },
        &rdata[5 + salt_len..],
    ))
}

fn write_nsec3_fixed(fixed: Nsec3Fixed, f: &mut fmt::Formatter) -> fmt::Result {
    write!(
        f,
        "{} {} {} ",
        fixed.hash_algorithm, fixed.flags, fixed.iterations,
    )?;
    if fixed.salt.is_empty() {
        f.write_str("-")
    } else {
        write_hex(fixed.salt, f)
    }
}

/// Splits one length-prefixed `<character-string>` off the front of
/// `octets`.
fn split_character_string(octets: &[u8]) -> Option<(&[u8], &[u8])> {
    let len = *octets.first()? as usize;
    let string = octets.get(1..1 + len)?;
    Some((string, &octets[1 + len..]))
}

/// Writes a `<character-string>` in quoted form, escaping quotes and
/// backslashes and using `\DDD` for non-printable octets.
fn write_character_string(octets: &[u8], f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str("\"")?;
    for &octet in octets {
        if octet == b'"' || octet == b'\\' {
            write!(f, "\\{}", octet as char)?;
        } else if octet.is_ascii_graphic() || octet == b' ' {
            write!(f, "{}", octet as char)?;
        } else {
            write!(f, "\\{:03}", octet)?;
        }
    }
    f.write_str("\"")
}

fn write_hex(octets: &[u8], f: &mut fmt::Formatter) -> fmt::Result {
    for &octet in octets {
        let high = nibble_to_ascii_hex_digit((octet & 0xf0) >> 4).to_ascii_uppercase();
        let low = nibble_to_ascii_hex_digit(octet & 0xf).to_ascii_uppercase();
        write!(f, "{}{}", char::from(high), char::from(low))?;
    }
    Ok(())
}

/// Writes base32hex ([RFC 4648 § 7]) text, without padding, as BIND
/// presents NSEC3 next-hashed-owner fields.
///
/// [RFC 4648 § 7]: https://datatracker.ietf.org/doc/html/rfc4648#section-7
fn write_base32hex(octets: &[u8], f: &mut fmt::Formatter) -> fmt::Result {
    const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHIJKLMNOPQRSTUV";
    let mut accumulator: u32 = 0;
    let mut bits = 0;
    for &octet in octets {
        accumulator = (accumulator << 8) | octet as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            let value = (accumulator >> bits) & 0x1f;
            write!(f, "{}", char::from(ALPHABET[value as usize]))?;
        }
    }
    if bits > 0 {
        let value = (accumulator << (5 - bits)) & 0x1f;
        write!(f, "{}", char::from(ALPHABET[value as usize]))?;
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::super::{serialize_ds, serialize_mx, serialize_soa};
    use super::*;

    fn present(rr_type: Type, octets: &[u8]) -> String {
        let rdata: &Rdata = octets.try_into().unwrap();
        Presentation::new(rr_type, rdata).to_string()
    }

    #[test]
    fn a_presentation_works() {
        assert_eq!(present(Type::A, &[192, 0, 2, 1]), "192.0.2.1");
    }

    #[test]
    fn soa_presentation_works() {
        let mut rdata = Vec::new();
        serialize_soa(
            &"ns1.example.test.".parse::<Box<Name>>().unwrap(),
            &"admin.example.test.".parse::<Box<Name>>().unwrap(),
            123,
            3600,
            900,
            86400,
            300,
            &mut rdata,
        );
        assert_eq!(
            present(Type::SOA, &rdata),
            "ns1.example.test. admin.example.test. 123 3600 900 86400 300",
        );
    }

    #[test]
    fn mx_presentation_works() {
        let mut rdata = Vec::new();
        serialize_mx(
            10,
            &"mail.example.test.".parse::<Box<Name>>().unwrap(),
            &mut rdata,
        );
        assert_eq!(present(Type::MX, &rdata), "10 mail.example.test.");
    }

    #[test]
    fn ds_presentation_works() {
        let mut rdata = Vec::new();
        serialize_ds(12345, 13, 2, &[0xab; 32], &mut rdata);
        assert_eq!(
            present(Type::DS, &rdata),
            format!("12345 13 2 {}", "AB".repeat(32)),
        );
    }

    #[test]
    fn txt_presentation_quotes_and_escapes() {
        assert_eq!(
            present(Type::TXT, b"\x0bhello world\x04a\"b\\"),
            "\"hello world\" \"a\\\"b\\\\\"",
        );
    }

    #[test]
    fn unknown_and_malformed_rdata_fall_back_to_rfc_3597() {
        assert_eq!(present(Type::from(65280), &[1, 2, 3]), "\\# 3 010203");
        // Truncated A record.
        assert_eq!(present(Type::A, &[192, 0]), "\\# 2 c000");
    }

    #[test]
    fn base32hex_presentation_works() {
        struct W<'a>(&'a [u8]);
        impl fmt::Display for W<'_> {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write_base32hex(self.0, f)
            }
        }
        assert_eq!(W(b"e").to_string(), "CO");
        assert_eq!(W(b"foo").to_string(), "CPNMU");
    }
}
