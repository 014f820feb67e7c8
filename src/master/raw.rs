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

//! The binary "raw" masterfile format.
//!
//! A raw file starts with a header: the format magic (the constant 2),
//! the version (0 or 1), and the dump time, each a big-endian `u32`.
//! Version 1 appends three more `u32`s: flags, source serial, and last
//! transfer time. RRsets follow, each serialized as
//!
//! ```text
//! totallen u32 | class u16 | type u16 | covers u16 | ttl u32 |
//! rdata count u32 | owner len u16 | owner wire form |
//! (rdata len u16 | rdata)*
//! ```
//!
//! where `totallen` counts the entire record, itself included. All
//! integers are big-endian.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use super::{Error, RawHeader, Result};
use crate::class::Class;
use crate::db::{Db, Version};
use crate::name::Name;
use crate::rr::{Rdata, RdataSetOwned, Rrset, Ttl, Type};

/// The format magic beginning every raw-format file.
const FORMAT_RAW: u32 = 2;

/// The fixed portion of a serialized RRset: `totallen`, class, type,
/// covers, TTL, and rdata count.
const RRSET_FIXED_LEN: usize = 4 + 2 + 2 + 2 + 4 + 4;

/// The largest serialized RRset we will read. `totallen` comes from
/// the file, so it is capped before allocation; a single RRset cannot
/// legitimately come anywhere near this.
const MAX_RRSET_LEN: usize = 1 << 20;

////////////////////////////////////////////////////////////////////////
// WRITING                                                            //
////////////////////////////////////////////////////////////////////////

/// Writes the given state of `db` in the raw format.
pub fn write(
    db: &Db,
    version: Option<&Version>,
    header: &RawHeader,
    out: &mut impl Write,
) -> Result<()> {
    write_header(header, out)?;
    for rrset in db.rrsets(version) {
        write_rrset(&rrset, out)?;
    }
    Ok(())
}

fn write_header(header: &RawHeader, out: &mut impl Write) -> io::Result<()> {
    out.write_all(&FORMAT_RAW.to_be_bytes())?;
    out.write_all(&header.version.to_be_bytes())?;
    out.write_all(&header.now.to_be_bytes())?;
    if header.version >= 1 {
        out.write_all(&header.flags.to_be_bytes())?;
        out.write_all(&header.sourceserial.to_be_bytes())?;
        out.write_all(&header.lastxfrin.to_be_bytes())?;
    }
    Ok(())
}

/// Serializes one RRset, patching the total length in once the record
/// has been assembled.
fn write_rrset(rrset: &Rrset, out: &mut impl Write) -> io::Result<()> {
    let mut buf = Vec::with_capacity(RRSET_FIXED_LEN + 2 + rrset.owner.wire_repr().len());
    buf.extend_from_slice(&0u32.to_be_bytes());
    buf.extend_from_slice(&u16::from(rrset.class).to_be_bytes());
    buf.extend_from_slice(&u16::from(rrset.rr_type).to_be_bytes());
    buf.extend_from_slice(&u16::from(rrset.covers).to_be_bytes());
    buf.extend_from_slice(&u32::from(rrset.ttl).to_be_bytes());
    buf.extend_from_slice(&(rrset.len() as u32).to_be_bytes());

    let owner = rrset.owner.wire_repr();
    buf.extend_from_slice(&(owner.len() as u16).to_be_bytes());
    buf.extend_from_slice(owner);

    for rdata in rrset.rdatas().iter() {
        buf.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        buf.extend_from_slice(rdata.octets());
    }

    let totallen = buf.len() as u32;
    buf[0..4].copy_from_slice(&totallen.to_be_bytes());
    out.write_all(&buf)
}

////////////////////////////////////////////////////////////////////////
// READING                                                            //
////////////////////////////////////////////////////////////////////////

/// A reader for raw-format masterfiles. Iterating yields the stored
/// RRsets in file order.
pub struct Reader {
    stream: BufReader<File>,
    header: RawHeader,
    failed: bool,
}

impl Reader {
    /// Opens and validates the raw-format file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut stream = BufReader::new(File::open(path)?);
        let magic = read_u32(&mut stream)?;
        if magic != FORMAT_RAW {
            return Err(Error::BadMagic);
        }
        let version = read_u32(&mut stream)?;
        if version > 1 {
            return Err(Error::UnsupportedVersion(version));
        }
        let now = read_u32(&mut stream)?;
        let mut header = RawHeader {
            version,
            now,
            ..RawHeader::default()
        };
        if version == 1 {
            header.flags = read_u32(&mut stream)?;
            header.sourceserial = read_u32(&mut stream)?;
            header.lastxfrin = read_u32(&mut stream)?;
        }
        Ok(Self {
            stream,
            header,
            failed: false,
        })
    }

    /// Returns the file's header.
    pub fn header(&self) -> &RawHeader {
        &self.header
    }

    fn read_rrset(&mut self) -> Result<Option<Rrset>> {
        // EOF before a record starts is the normal end of the file.
        let mut totallen = [0; 4];
        match self.stream.read_exact(&mut totallen) {
            Ok(()) => (),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let totallen = u32::from_be_bytes(totallen) as usize;
        if totallen < RRSET_FIXED_LEN + 2 || totallen > MAX_RRSET_LEN {
            return Err(Error::Corrupt);
        }
        let mut record = vec![0; totallen - 4];
        self.stream.read_exact(&mut record)?;

        let class = Class::from(u16::from_be_bytes(record[0..2].try_into().unwrap()));
        let rr_type = Type::from(u16::from_be_bytes(record[2..4].try_into().unwrap()));
        let covers = Type::from(u16::from_be_bytes(record[4..6].try_into().unwrap()));
        let ttl = Ttl::from(u32::from_be_bytes(record[6..10].try_into().unwrap()));
        let rdata_count = u32::from_be_bytes(record[10..14].try_into().unwrap());

        let owner_len = u16::from_be_bytes(
            record
                .get(14..16)
                .ok_or(Error::Corrupt)?
                .try_into()
                .unwrap(),
        ) as usize;
        let owner_octets = record.get(16..16 + owner_len).ok_or(Error::Corrupt)?;
        let (owner, parsed_len) =
            Name::try_from_uncompressed(owner_octets).map_err(|_| Error::Corrupt)?;
        if parsed_len != owner_len {
            return Err(Error::Corrupt);
        }

        let mut rdatas = RdataSetOwned::new();
        let mut cursor = &record[16 + owner_len..];
        for _ in 0..rdata_count {
            let len_octets: [u8; 2] = cursor.get(0..2).ok_or(Error::Corrupt)?.try_into().unwrap();
            let len = u16::from_be_bytes(len_octets) as usize;
            let octets = cursor.get(2..2 + len).ok_or(Error::Corrupt)?;
            let rdata = <&Rdata>::try_from(octets).map_err(|_| Error::Corrupt)?;
            rdatas.insert(rr_type, rdata);
            cursor = &cursor[2 + len..];
        }
        if !cursor.is_empty() {
            return Err(Error::Corrupt);
        }

        let mut rrset = Rrset::new(owner, class, rr_type, ttl);
        rrset.covers = covers;
        rrset.rdatas = rdatas;
        Ok(Some(rrset))
    }
}

impl Iterator for Reader {
    type Item = Result<Rrset>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_rrset() {
            Ok(Some(rrset)) => Some(Ok(rrset)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

fn read_u32(stream: &mut impl Read) -> Result<u32> {
    let mut octets = [0; 4];
    stream.read_exact(&mut octets)?;
    Ok(u32::from_be_bytes(octets))
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
