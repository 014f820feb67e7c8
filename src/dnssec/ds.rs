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

//! DS record construction and DS RRset synthesis from CDS/CDNSKEY
//! RRsets ([RFC 7344]).
//!
//! [RFC 7344]: https://datatracker.ietf.org/doc/html/rfc7344

use ring::digest as ring_digest;

use super::{Error, Result};
use crate::rr::rdata::{digest, key_tag_of_wire, serialize_ds, Dnskey, Ds, ReadRdataError};
use crate::name::Name;
use crate::rr::{Rdata, Rrset, Ttl, Type};

////////////////////////////////////////////////////////////////////////
// DS CONSTRUCTION                                                    //
////////////////////////////////////////////////////////////////////////

/// Builds DS RDATA for `dnskey_rdata` under `digest_type`. The digest
/// is computed over the lowercased owner name followed by the DNSKEY
/// RDATA ([RFC 4034 § 5.1.4]).
///
/// [RFC 4034 § 5.1.4]: https://datatracker.ietf.org/doc/html/rfc4034#section-5.1.4
pub fn build(owner: &Name, dnskey_rdata: &Rdata, digest_type: u8) -> Result<Vec<u8>> {
    let dnskey = Dnskey::try_from_rdata(dnskey_rdata)?;
    let algorithm = match digest_type {
        digest::SHA1 => &ring_digest::SHA1_FOR_LEGACY_USE_ONLY,
        digest::SHA256 => &ring_digest::SHA256,
        digest::SHA384 => &ring_digest::SHA384,
        other => return Err(Error::UnsupportedDigest(other)),
    };

    let mut owner = owner.to_owned();
    owner.make_ascii_lowercase();
    let mut context = ring_digest::Context::new(algorithm);
    context.update(owner.wire_repr());
    context.update(dnskey_rdata.octets());
    let computed = context.finish();

    let key_tag = key_tag_of_wire(dnskey_rdata.octets(), dnskey.algorithm);
    let mut rdata = Vec::with_capacity(4 + computed.as_ref().len());
    serialize_ds(
        key_tag,
        dnskey.algorithm,
        digest_type,
        computed.as_ref(),
        &mut rdata,
    );
    Ok(rdata)
}

////////////////////////////////////////////////////////////////////////
// DS SET SYNTHESIS                                                   //
////////////////////////////////////////////////////////////////////////

/// Which child RRset a new DS set is synthesized from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DsSource {
    Cds,
    Cdnskey,
}

/// Synthesizes a DS RRset from `source` at the given TTL.
///
/// With [`DsSource::Cds`], each CDS whose digest type appears in
/// `digest_types` is carried over unchanged (the RDATA formats are
/// identical; only the RR type differs) and the rest are ignored. With
/// [`DsSource::Cdnskey`], a DS is built from every CDNSKEY for every
/// requested digest type.
///
/// An empty result is not an error; the caller decides whether to fall
/// back to another source.
pub fn make_ds_set(
    source: &Rrset,
    kind: DsSource,
    digest_types: &[u8],
    ttl: Ttl,
) -> Result<Rrset> {
    let mut new_set = Rrset::new(source.owner.clone(), source.class, Type::DS, ttl);
    for rdata in source.rdatas().iter() {
        match kind {
            DsSource::Cds => {
                let cds = Ds::try_from_rdata(rdata)?;
                if digest_types.contains(&cds.digest_type) {
                    new_set.push_rdata(rdata);
                }
            }
            DsSource::Cdnskey => {
                for &digest_type in digest_types {
                    let built = build(&source.owner, rdata, digest_type)?;
                    let built: &Rdata = built
                        .as_slice()
                        .try_into()
                        .map_err(|_| Error::Rdata(ReadRdataError::Other))?;
                    new_set.push_rdata(built);
                }
            }
        }
    }
    Ok(new_set)
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
