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

//! Key files on disk.
//!
//! Key pairs are stored as `K<name>+<algorithm>+<tag>.key` (the public
//! DNSKEY record in zone-file format) and a matching `.private` file.
//! This module parses and builds those names, reads the DNSKEY record
//! out of a `.key` file, and computes the revoked form of a key
//! ([RFC 5011]).
//!
//! [RFC 5011]: https://datatracker.ietf.org/doc/html/rfc5011

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::name::Name;
use crate::rr::rdata::{
    key_tag_of_wire, serialize_dnskey, Dnskey, ReadRdataError, DNSKEY_FLAG_REVOKE,
};
use crate::rr::{Rdata, Type};
use crate::zone_file::{self, ParsedRr};

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// Errors that occur while handling key files.
#[derive(Debug)]
pub enum Error {
    /// The file name is not of the `K<name>+<algorithm>+<tag>` form.
    BadFilename,

    /// The `.key` file contains no DNSKEY record.
    MissingDnskey,

    /// The DNSKEY RDATA could not be parsed into its fields.
    Rdata(ReadRdataError),

    /// An I/O error occurred.
    Io(io::Error),

    /// The `.key` file could not be parsed.
    ZoneFile(zone_file::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::BadFilename => f.write_str("malformed key file name"),
            Self::MissingDnskey => f.write_str("no DNSKEY record in key file"),
            Self::Rdata(_) => f.write_str("malformed DNSKEY RDATA"),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::ZoneFile(e) => write!(f, "failed to parse key file: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<ReadRdataError> for Error {
    fn from(error: ReadRdataError) -> Self {
        Self::Rdata(error)
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<zone_file::Error> for Error {
    fn from(error: zone_file::Error) -> Self {
        Self::ZoneFile(error)
    }
}

/// A convenient alias for `Result` types in key-file code.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// KEY FILE NAMES                                                     //
////////////////////////////////////////////////////////////////////////

/// The identity a key pair's file names are built from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyFileName {
    pub name: Box<Name>,
    pub algorithm: u8,
    pub key_tag: u16,
}

impl KeyFileName {
    pub fn new(name: Box<Name>, algorithm: u8, key_tag: u16) -> Self {
        Self {
            name,
            algorithm,
            key_tag,
        }
    }

    /// The path of the public key file under `directory`.
    pub fn key_path(&self, directory: &Path) -> PathBuf {
        directory.join(format!("{}.key", self))
    }

    /// The path of the private key file under `directory`.
    pub fn private_path(&self, directory: &Path) -> PathBuf {
        directory.join(format!("{}.private", self))
    }
}

impl fmt::Display for KeyFileName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "K{}+{:03}+{:05}",
            self.name.to_filename(),
            self.algorithm,
            self.key_tag
        )
    }
}

impl FromStr for KeyFileName {
    type Err = Error;

    /// Parses a key file name, with or without its `.key` or
    /// `.private` extension.
    fn from_str(text: &str) -> Result<Self> {
        let stem = text
            .strip_suffix(".key")
            .or_else(|| text.strip_suffix(".private"))
            .unwrap_or(text);
        let rest = stem.strip_prefix('K').ok_or(Error::BadFilename)?;
        let mut fields = rest.rsplitn(3, '+');
        let key_tag = fields
            .next()
            .and_then(|field| field.parse().ok())
            .ok_or(Error::BadFilename)?;
        let algorithm = fields
            .next()
            .and_then(|field| field.parse().ok())
            .ok_or(Error::BadFilename)?;
        let name = fields
            .next()
            .and_then(|field| field.parse().ok())
            .ok_or(Error::BadFilename)?;
        Ok(Self {
            name,
            algorithm,
            key_tag,
        })
    }
}

////////////////////////////////////////////////////////////////////////
// PUBLIC KEY FILES                                                   //
////////////////////////////////////////////////////////////////////////

/// Reads the first DNSKEY record from the `.key` file at `path`.
pub fn read_dnskey_file(path: &Path) -> Result<ParsedRr> {
    read_dnskey(BufReader::new(File::open(path)?))
}

fn read_dnskey(stream: impl Read) -> Result<ParsedRr> {
    for record in zone_file::Parser::new(stream).records_only() {
        let record = record?;
        if record.rr_type == Type::DNSKEY {
            return Ok(record);
        }
    }
    Err(Error::MissingDnskey)
}

////////////////////////////////////////////////////////////////////////
// REVOCATION                                                         //
////////////////////////////////////////////////////////////////////////

/// Returns the revoked form of a DNSKEY and its new key tag. Setting
/// the REVOKE bit changes the wire form and therefore the tag.
pub fn revoke(rdata: &Rdata) -> Result<(Vec<u8>, u16)> {
    let dnskey = Dnskey::try_from_rdata(rdata)?;
    let mut wire = Vec::with_capacity(rdata.len());
    serialize_dnskey(
        dnskey.flags | DNSKEY_FLAG_REVOKE,
        dnskey.protocol,
        dnskey.algorithm,
        dnskey.public_key,
        &mut wire,
    );
    let key_tag = key_tag_of_wire(&wire, dnskey.algorithm);
    Ok((wire, key_tag))
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::rr::rdata::algorithm;

    #[test]
    fn file_names_round_trip() {
        let parsed: KeyFileName = "Kexample.test.+013+12345.key".parse().unwrap();
        assert_eq!(parsed.name, "example.test.".parse::<Box<Name>>().unwrap());
        assert_eq!(parsed.algorithm, 13);
        assert_eq!(parsed.key_tag, 12345);
        assert_eq!(parsed.to_string(), "Kexample.test.+013+12345");

        let bare: KeyFileName = "Kexample.test.+008+00042".parse().unwrap();
        assert_eq!(bare.algorithm, 8);
        assert_eq!(bare.key_tag, 42);
    }

    #[test]
    fn malformed_file_names_are_rejected() {
        assert!("example.test.+013+12345".parse::<KeyFileName>().is_err());
        assert!("Kexample.test.+013".parse::<KeyFileName>().is_err());
        assert!("Kexample.test.+abc+12345".parse::<KeyFileName>().is_err());
        assert!("K".parse::<KeyFileName>().is_err());
    }

    #[test]
    fn paths_carry_the_extension() {
        let name = KeyFileName::new("example.test.".parse().unwrap(), 13, 7);
        assert_eq!(
            name.key_path(Path::new("/keys")),
            Path::new("/keys/Kexample.test.+013+00007.key")
        );
        assert_eq!(
            name.private_path(Path::new("/keys")),
            Path::new("/keys/Kexample.test.+013+00007.private")
        );
    }

    #[test]
    fn dnskey_records_are_read_from_key_files() {
        let text = b"; This is a key-signing key.\n\
                     example.test. 3600 IN DNSKEY 257 3 13 \
                     mdsswUyr3DPW132mOi8V9xESWE8jTo0dxCjjnopKl+GqJxpVXckHAe\
                     F+KkxLbxILfDLUT0rAK9iUzy1L53eKGQ==\n";
        let record = read_dnskey(Cursor::new(&text[..])).unwrap();
        assert_eq!(record.rr_type, Type::DNSKEY);
        assert_eq!(*record.owner, *"example.test.".parse::<Box<Name>>().unwrap());
        let dnskey = Dnskey::try_from_rdata(&record.rdata).unwrap();
        assert_eq!(dnskey.flags, 257);
        assert_eq!(dnskey.algorithm, algorithm::ECDSAP256SHA256);
    }

    #[test]
    fn files_without_a_dnskey_are_rejected() {
        let text = b"example.test. 3600 IN A 192.0.2.1\n";
        assert!(matches!(
            read_dnskey(Cursor::new(&text[..])),
            Err(Error::MissingDnskey)
        ));
    }

    #[test]
    fn revoking_a_key_changes_its_tag() {
        let mut rdata = Vec::new();
        serialize_dnskey(257, 3, algorithm::ECDSAP256SHA256, &[0xab; 32], &mut rdata);
        let rdata: &Rdata = rdata.as_slice().try_into().unwrap();
        let old_tag = key_tag_of_wire(rdata.octets(), algorithm::ECDSAP256SHA256);

        let (revoked, new_tag) = revoke(rdata).unwrap();
        let parsed = Dnskey::try_from_rdata(revoked.as_slice().try_into().unwrap()).unwrap();
        assert!(parsed.is_revoked());
        assert_eq!(new_tag, key_tag_of_wire(&revoked, algorithm::ECDSAP256SHA256));
        assert_ne!(new_tag, old_tag);
    }
}
