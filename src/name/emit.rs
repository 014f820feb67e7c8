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

//! Implementation of on-the-wire emission of names, with support for
//! message compression ([RFC 1035 § 4.1.4]).
//!
//! [RFC 1035 § 4.1.4]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.4

use std::collections::HashMap;

use super::Name;

/// The highest buffer offset expressible in a 14-bit compression
/// pointer.
const MAX_POINTER_TARGET: usize = 0x3fff;

////////////////////////////////////////////////////////////////////////
// COMPRESSION CONTEXT                                                //
////////////////////////////////////////////////////////////////////////

/// Records the positions of names already written into a message
/// buffer so that later occurrences can be compressed into 14-bit
/// pointers.
///
/// One context is used per message. A context constructed with
/// [`CompressionContext::disabled`] never produces pointers, which is
/// what callers writing uncompressible fields (e.g. DNSSEC-signed
/// RDATA) use.
#[derive(Debug, Default)]
pub struct CompressionContext {
    enabled: bool,
    offsets: HashMap<Box<Name>, u16>,
}

impl CompressionContext {
    /// Creates a new context with compression enabled.
    pub fn new() -> Self {
        Self {
            enabled: true,
            offsets: HashMap::new(),
        }
    }

    /// Creates a context that never emits pointers. Names written
    /// through it are still recorded, so a subsequent enabled context
    /// cannot be confused by it; it is simply inert.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            offsets: HashMap::new(),
        }
    }

    /// Finds the longest recorded suffix of `name`. On success, returns
    /// the number of leading labels of `name` that must still be
    /// written literally and the pointer target for the remainder.
    fn longest_suffix_match(&self, name: &Name) -> Option<(usize, u16)> {
        if !self.enabled {
            return None;
        }
        for skip in 0..name.len() - 1 {
            // NOTE: the unwrap() is fine, since skip < name.len().
            let suffix = name.superdomain(skip).unwrap();
            if let Some(&offset) = self.offsets.get(&suffix) {
                return Some((skip, offset));
            }
        }
        None
    }

    /// Records every suffix of `name` starting with label
    /// `first_label`, provided its offset fits in a pointer. The root
    /// is never recorded: a pointer to it is larger than the null
    /// label itself.
    fn record(&mut self, name: &Name, first_label: usize, name_start: usize) {
        for skip in first_label..name.len() - 1 {
            let offset = name_start + name.label_offset(skip);
            if offset > MAX_POINTER_TARGET {
                break;
            }
            // NOTE: as in longest_suffix_match, the unwrap() is fine.
            let suffix = name.superdomain(skip).unwrap();
            self.offsets.entry(suffix).or_insert(offset as u16);
        }
    }
}

////////////////////////////////////////////////////////////////////////
// WIRE EMISSION                                                      //
////////////////////////////////////////////////////////////////////////

impl Name {
    /// Appends the on-the-wire form of this `Name` to `buf`,
    /// compressing against (and then updating) `ctx`.
    pub fn to_wire(&self, ctx: &mut CompressionContext, buf: &mut Vec<u8>) {
        let start = buf.len();
        match ctx.longest_suffix_match(self) {
            Some((skip, pointer)) => {
                buf.extend_from_slice(self.wire_repr_to(skip));
                buf.extend_from_slice(&(pointer | 0xc000).to_be_bytes());
                ctx.record(self, 0, start);
            }
            None => {
                buf.extend_from_slice(self.wire_repr());
                ctx.record(self, 0, start);
            }
        }
    }

    /// Appends the uncompressed on-the-wire form of this `Name` to
    /// `buf` without touching any compression state.
    pub fn to_wire_uncompressed(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.wire_repr());
    }
}

////////////////////////////////////////////////////////////////////////
// FILENAME EMISSION                                                  //
////////////////////////////////////////////////////////////////////////

impl Name {
    /// Renders this `Name` in a form safe for use in a file name, the
    /// way delegation-signer set files (`dsset-<name>`) are named.
    ///
    /// ASCII letters are lowercased; letters, digits, `-` and `_` pass
    /// through; every other octet becomes `%XX`. Labels are joined
    /// with `.` and a trailing dot is kept, matching the convention
    /// used by signer tooling.
    pub fn to_filename(&self) -> String {
        use crate::util::nibble_to_ascii_hex_digit;

        if self.is_root() {
            return ".".to_owned();
        }
        let mut out = String::new();
        for label in self.labels() {
            if label.is_null() {
                break;
            }
            for &octet in label.octets() {
                match octet {
                    b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' => out.push(octet as char),
                    b'A'..=b'Z' => out.push(octet.to_ascii_lowercase() as char),
                    _ => {
                        out.push('%');
                        out.push(nibble_to_ascii_hex_digit(octet >> 4).to_ascii_uppercase() as char);
                        out.push(nibble_to_ascii_hex_digit(octet & 0xf).to_ascii_uppercase() as char);
                    }
                }
            }
            out.push('.');
        }
        out
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_wire_without_context_matches_wire_repr() {
        let name: Box<Name> = "example.test.".parse().unwrap();
        let mut buf = Vec::new();
        name.to_wire(&mut CompressionContext::disabled(), &mut buf);
        assert_eq!(buf, name.wire_repr());
    }

    #[test]
    fn to_wire_compresses_repeats() {
        let a: Box<Name> = "a.example.test.".parse().unwrap();
        let b: Box<Name> = "b.example.test.".parse().unwrap();
        let mut ctx = CompressionContext::new();
        let mut buf = Vec::new();
        a.to_wire(&mut ctx, &mut buf);
        assert_eq!(buf, a.wire_repr());
        b.to_wire(&mut ctx, &mut buf);
        // The second name shares the "example.test." suffix at
        // offset 2.
        assert_eq!(&buf[a.wire_repr().len()..], b"\x01b\xc0\x02");
    }

    #[test]
    fn to_wire_exact_repeat_is_a_bare_pointer() {
        let name: Box<Name> = "example.test.".parse().unwrap();
        let mut ctx = CompressionContext::new();
        let mut buf = Vec::new();
        name.to_wire(&mut ctx, &mut buf);
        name.to_wire(&mut ctx, &mut buf);
        assert_eq!(&buf[name.wire_repr().len()..], b"\xc0\x00");
    }

    #[test]
    fn compression_is_case_insensitive() {
        let a: Box<Name> = "EXAMPLE.test.".parse().unwrap();
        let b: Box<Name> = "example.TEST.".parse().unwrap();
        let mut ctx = CompressionContext::new();
        let mut buf = Vec::new();
        a.to_wire(&mut ctx, &mut buf);
        b.to_wire(&mut ctx, &mut buf);
        assert_eq!(&buf[a.wire_repr().len()..], b"\xc0\x00");
    }

    #[test]
    fn disabled_context_never_compresses() {
        let name: Box<Name> = "example.test.".parse().unwrap();
        let mut ctx = CompressionContext::disabled();
        let mut buf = Vec::new();
        name.to_wire(&mut ctx, &mut buf);
        name.to_wire(&mut ctx, &mut buf);
        let repr = name.wire_repr();
        assert_eq!(&buf[repr.len()..], repr);
    }

    #[test]
    fn to_filename_lowercases_and_escapes() {
        let name: Box<Name> = "Sub.Example.test.".parse().unwrap();
        assert_eq!(name.to_filename(), "sub.example.test.");
        let funky: Box<Name> = "a\\032b.test.".parse().unwrap();
        assert_eq!(funky.to_filename(), "a%20b.test.");
    }

    #[test]
    fn to_filename_of_root() {
        assert_eq!(Name::root().to_filename(), ".");
    }
}
