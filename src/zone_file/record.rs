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

//! Parsing of resource records.

use std::io::Read;
use std::net::{Ipv4Addr, Ipv6Addr};

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;

use super::{Error, ErrorKind, FieldOrEol, Line, LineContent, ParsedRr, Parser, Position, Result};
use crate::class::Class;
use crate::name::Name;
use crate::rr::rdata::{
    serialize_a, serialize_aaaa, serialize_dnskey, serialize_ds, serialize_hinfo, serialize_mx,
    serialize_nsec, serialize_nsec3, serialize_nsec3param, serialize_rrsig, serialize_soa,
    serialize_srv, Rdata, RdataTooLongError, SigTime, TxtBuilder,
};
use crate::rr::{Ttl, Type};
use crate::util::ascii_hex_digit_to_nibble;

/// The maximum length of collected base64/hexadecimal text accepted
/// for a single RDATA field. (This is to prevent OOM-based DoS
/// attacks; it is comfortably larger than anything that can decode
/// into valid RDATA.)
const MAX_DATA_TEXT_SIZE: usize = 131_072;

impl<S: Read> Parser<S> {
    ////////////////////////////////////////////////////////////////////
    // PARSING OF RESOURCE RECORDS (OR EMPTY LINES)                   //
    ////////////////////////////////////////////////////////////////////

    /// Parses a resource record or an empty line.
    pub(super) fn parse_record_or_empty(&mut self) -> Result<Option<Line>> {
        let start_of_line = self.reader.position();
        let leading_whitespace = self.reader.skip_whitespace()?;
        if self.reader.skip_to_next_field_or_through_eol()? == FieldOrEol::Eol {
            // It was an empty line.
            return Ok(None);
        }

        // In zone files, leading whitespace is significant. If it
        // exists, then the owner for the record on this line is the
        // same as the owner for the previous record.
        let owner = if leading_whitespace {
            if let Some(ref previous_owner) = self.context.previous_owner {
                previous_owner.clone()
            } else {
                return Err(Error::new(
                    start_of_line,
                    ErrorKind::EmptyOwnerWithNoPrevious,
                ));
            }
        } else {
            self.parse_name()?
        };

        // The next fields are the TTL and class. They may appear in
        // either order, and furthermore the TTL may be omitted.
        self.reader
            .skip_to_next_field(ErrorKind::ExpectedTtlClassOrType)?;
        let (ttl, class) = self.parse_ttl_and_class()?;

        // The type field is next.
        self.reader.skip_to_next_field(ErrorKind::ExpectedType)?;
        let rr_type = self.parse_type()?;

        // The RDATA completes the record. What we expect to see next
        // depends on the RR's class and type, so parse_rdata performs
        // the skip to the next field itself while providing the right
        // error message for the type. This call also consumes the end
        // of the line.
        let rdata = self.parse_rdata(class, rr_type)?;

        // Update the context for the next record parsed.
        self.context.previous_owner = Some(owner.clone());
        self.context.previous_ttl = Some(ttl);
        self.context.previous_class = Some(class);

        Ok(Some(Line {
            number: start_of_line.line,
            content: LineContent::Record(ParsedRr {
                owner,
                ttl,
                class,
                rr_type,
                rdata,
            }),
        }))
    }

    ////////////////////////////////////////////////////////////////////
    // RESOURCE RECORD PARSING HELPERS                                //
    ////////////////////////////////////////////////////////////////////

    /// Parses the TTL and CLASS fields of a record. This is tricky
    /// because we may see TTL then CLASS, CLASS then TTL, only one of
    /// the two, or neither. When omitted, the CLASS defaults to the
    /// previous record's CLASS. The TTL defaults to the one specified
    /// by the most recent `$TTL` directive ([RFC 2308 § 4]), or if
    /// there is none, then the previous record's TTL.
    ///
    /// [RFC 2308 § 4]: https://datatracker.ietf.org/doc/html/rfc2308
    fn parse_ttl_and_class(&mut self) -> Result<(Ttl, Class)> {
        // As noted in RFC 1035 § 5.1, the possible TTL, class, and
        // subsequent type fields are disjoint, so the parse is unique.
        // We just need to try the possibilities.
        //
        // Here, we rely on the fact that the Reader::read_field method
        // (of which parse_ttl and parse_class are simple wrappers) does
        // not consume data or leave an invalid state on parse failure.
        // Thus we can simply try again with a different data type.
        if let Ok(ttl) = self.parse_ttl() {
            self.reader
                .skip_to_next_field(ErrorKind::ExpectedClassOrType)?;
            if let Ok(class) = self.parse_class() {
                Ok((ttl, class))
            } else if let Some(class) = self.context.previous_class {
                Ok((ttl, class))
            } else {
                Err(Error::new(
                    self.reader.position(),
                    ErrorKind::OmittedClassWithNoPrevious,
                ))
            }
        } else if let Ok(class) = self.parse_class() {
            self.reader
                .skip_to_next_field(ErrorKind::ExpectedTtlOrType)?;
            if let Ok(ttl) = self.parse_ttl() {
                Ok((ttl, class))
            } else if let Some(ttl) = self.default_or_previous_ttl() {
                Ok((ttl, class))
            } else {
                Err(Error::new(
                    self.reader.position(),
                    ErrorKind::OmittedTtlWithNoDefaultOrPrevious,
                ))
            }
        } else {
            match (self.default_or_previous_ttl(), self.context.previous_class) {
                (Some(ttl), Some(class)) => Ok((ttl, class)),
                (Some(_), _) => Err(Error::new(
                    self.reader.position(),
                    ErrorKind::OmittedClassWithNoPrevious,
                )),
                _ => Err(Error::new(
                    self.reader.position(),
                    ErrorKind::OmittedTtlWithNoDefaultOrPrevious,
                )),
            }
        }
    }

    /// A simple wrapper to parse a [`Ttl`] with
    /// [`super::Reader::read_field`]. Unit-suffixed TTLs (e.g.
    /// `1h30m`) are accepted.
    fn parse_ttl(&mut self) -> Result<Ttl> {
        self.reader.read_field(ErrorKind::InvalidTtl)
    }

    /// A simple wrapper to parse a [`Class`] with
    /// [`super::Reader::read_field`].
    fn parse_class(&mut self) -> Result<Class> {
        self.reader.read_field(ErrorKind::InvalidClass)
    }

    /// A simple wrapper to parse a [`Type`] with
    /// [`super::Reader::read_field`].
    fn parse_type(&mut self) -> Result<Type> {
        self.reader.read_field(ErrorKind::InvalidType)
    }

    /// Returns the TTL to use if the TTL field is omitted. (See
    /// [`Parser::parse_ttl_and_class`].)
    fn default_or_previous_ttl(&self) -> Option<Ttl> {
        self.context.default_ttl.or(self.context.previous_ttl)
    }

    ////////////////////////////////////////////////////////////////////
    // RDATA PARSING                                                  //
    ////////////////////////////////////////////////////////////////////

    // RDATA parsing has some complications, since each RR type has a
    // different format, and furthermore RFC 3597 § 5 allows RDATA for
    // *any* type to be expressed using the raw format (starting with
    // \#) intended for entering RDATA of unknown types. When RDATA is
    // entered this way for a known type, we should check it for
    // validity.
    //
    // The parse_*_rdata methods parse according to the various
    // type-dependent formats into raw RDATA octets or, if \# is
    // detected, use parse_unknown_rdata to parse the raw format and
    // then validate the user-supplied raw octets. The parse_rdata
    // method dispatches the appropriate parse_*_rdata method based on
    // the provided type, or, if the type is unknown, requires the use
    // of the \# format.
    //
    // In this zone file parsing code, the general practice is for
    // calling code to advance the Reader to the next field *before*
    // calling a method to parse a feature. However, for the sake of
    // good error messages, this practice is *reversed* here for the
    // parse_rdata and parse_*_rdata methods. The appropriate error
    // message when the file unexpectedly ends ("expected ...") depends
    // on the type of the record, so just this once it makes sense to
    // include the skipping in the callee.
    //
    // Note also that the RDATA parsing methods also consume the next
    // line ending. This makes sense because some RDATA formats (such as
    // for TXT records) do not have a fixed number of fields.

    /// Parses RDATA for a record of type `rr_type` in class `class`.
    /// Note that unlike most of the zone file parsing methods, this
    /// method does *not* require the caller to skip to the next field
    /// before use. This is because the error message generation is
    /// handled in the callee, since the message depends on `rr_type`
    /// and `class`. Furthermore, this method expects and consumes a
    /// line ending after the RDATA.
    fn parse_rdata(&mut self, class: Class, rr_type: Type) -> Result<Box<Rdata>> {
        match rr_type {
            Type::NS | Type::CNAME | Type::PTR => self.parse_name_rdata(class, rr_type),
            Type::A if class == Class::IN => self.parse_a_rdata(class, rr_type),
            Type::SOA => self.parse_soa_rdata(class, rr_type),
            Type::HINFO => self.parse_hinfo_rdata(class, rr_type),
            Type::MX => self.parse_mx_rdata(class, rr_type),
            Type::TXT => self.parse_txt_rdata(class, rr_type),
            Type::AAAA if class == Class::IN => self.parse_aaaa_rdata(class, rr_type),
            Type::SRV if class == Class::IN => self.parse_srv_rdata(class, rr_type),
            Type::DS | Type::CDS => self.parse_ds_rdata(class, rr_type),
            Type::DNSKEY | Type::CDNSKEY => self.parse_dnskey_rdata(class, rr_type),
            Type::RRSIG => self.parse_rrsig_rdata(class, rr_type),
            Type::NSEC => self.parse_nsec_rdata(class, rr_type),
            Type::NSEC3 => self.parse_nsec3_rdata(class, rr_type),
            Type::NSEC3PARAM => self.parse_nsec3param_rdata(class, rr_type),
            _ => {
                // Since we don't recognize the class/type combination,
                // require the \# format.
                if !self.check_backslash_hash(ErrorKind::ExpectedBackslashHash)? {
                    return Err(Error::new(
                        self.reader.position(),
                        ErrorKind::ExpectedBackslashHash,
                    ));
                }
                self.parse_unknown_rdata()
            }
        }
    }

    /// A helper for beginning to parse a record's RDATA. It advances
    /// the `Reader` to the next field (producing an error based on
    /// `expected`) if there is no such field. It then returns `true` if
    /// the next field is the \# sequence indicating that the RDATA is
    /// given in raw form, and `false` otherwise.
    fn check_backslash_hash(&mut self, expected: ErrorKind) -> Result<bool> {
        self.reader.skip_to_next_field(expected)?;
        self.reader.expect_field(b"\\#").map_err(Into::into)
    }

    /// Parses RDATA for records consisting of a single domain name.
    fn parse_name_rdata(&mut self, class: Class, rr_type: Type) -> Result<Box<Rdata>> {
        if self.check_backslash_hash(ErrorKind::ExpectedNameOrBh)? {
            self.parse_unknown_rdata_with_validation(|rdata| rdata.validate(class, rr_type))
        } else {
            let name = self.parse_name()?;
            self.reader.expect_eol()?;
            Ok(<&Rdata>::try_from(name.wire_repr()).unwrap().to_owned())
        }
    }

    /// Parses RDATA for Internet A records.
    fn parse_a_rdata(&mut self, class: Class, rr_type: Type) -> Result<Box<Rdata>> {
        if self.check_backslash_hash(ErrorKind::ExpectedIpv4OrBh)? {
            self.parse_unknown_rdata_with_validation(|rdata| rdata.validate(class, rr_type))
        } else {
            let ipv4: Ipv4Addr = self.reader.read_field(ErrorKind::InvalidIpv4)?;
            self.reader.expect_eol()?;
            let mut rdata = Vec::with_capacity(4);
            serialize_a(ipv4, &mut rdata);
            Ok(rdata.try_into().unwrap())
        }
    }

    /// Parses RDATA for SOA records.
    fn parse_soa_rdata(&mut self, class: Class, rr_type: Type) -> Result<Box<Rdata>> {
        if self.check_backslash_hash(ErrorKind::ExpectedNameOrBh)? {
            self.parse_unknown_rdata_with_validation(|rdata| rdata.validate(class, rr_type))
        } else {
            let mname = self.parse_name()?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedName)?;
            let rname = self.parse_name()?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedU32)?;
            let serial = self.reader.read_field(ErrorKind::InvalidInt)?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedU32)?;
            let refresh = self.reader.read_field(ErrorKind::InvalidInt)?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedU32)?;
            let retry = self.reader.read_field(ErrorKind::InvalidInt)?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedU32)?;
            let expire = self.reader.read_field(ErrorKind::InvalidInt)?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedU32)?;
            let minimum = self.reader.read_field(ErrorKind::InvalidInt)?;
            self.reader.expect_eol()?;
            let mut rdata = Vec::new();
            serialize_soa(
                &mname, &rname, serial, refresh, retry, expire, minimum, &mut rdata,
            );
            Ok(rdata.try_into().unwrap())
        }
    }

    /// Parses RDATA for HINFO records.
    fn parse_hinfo_rdata(&mut self, class: Class, rr_type: Type) -> Result<Box<Rdata>> {
        if self.check_backslash_hash(ErrorKind::ExpectedCharacterStringOrBh)? {
            self.parse_unknown_rdata_with_validation(|rdata| rdata.validate(class, rr_type))
        } else {
            let cpu = self.parse_character_string()?;
            self.reader
                .skip_to_next_field(ErrorKind::ExpectedCharacterString)?;
            let os = self.parse_character_string()?;
            self.reader.expect_eol()?;
            let mut rdata = Vec::new();
            serialize_hinfo(&cpu, &os, &mut rdata);
            Ok(rdata.try_into().unwrap())
        }
    }

    /// Parses RDATA for MX records.
    fn parse_mx_rdata(&mut self, class: Class, rr_type: Type) -> Result<Box<Rdata>> {
        if self.check_backslash_hash(ErrorKind::ExpectedU16OrBh)? {
            self.parse_unknown_rdata_with_validation(|rdata| rdata.validate(class, rr_type))
        } else {
            let preference = self.reader.read_field(ErrorKind::InvalidInt)?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedName)?;
            let exchange = self.parse_name()?;
            self.reader.expect_eol()?;
            let mut rdata = Vec::new();
            serialize_mx(preference, &exchange, &mut rdata);
            Ok(rdata.try_into().unwrap())
        }
    }

    /// Parses RDATA for TXT records.
    fn parse_txt_rdata(&mut self, class: Class, rr_type: Type) -> Result<Box<Rdata>> {
        if self.check_backslash_hash(ErrorKind::ExpectedCharacterStringOrBh)? {
            self.parse_unknown_rdata_with_validation(|rdata| rdata.validate(class, rr_type))
        } else {
            let mut rdata = Vec::new();
            let mut builder = TxtBuilder::new(&mut rdata);
            let start_position = self.reader.position();
            loop {
                let character_string = self.parse_character_string()?;
                match builder.try_push(&character_string) {
                    Ok(()) => (),
                    Err(RdataTooLongError) => {
                        return Err(Error::new(start_position, ErrorKind::TxtTooLong))
                    }
                }
                if self.reader.skip_to_next_field_or_through_eol()? == FieldOrEol::Eol {
                    break;
                }
            }
            Ok(rdata.try_into().unwrap())
        }
    }

    /// Parses RDATA for AAAA records.
    fn parse_aaaa_rdata(&mut self, class: Class, rr_type: Type) -> Result<Box<Rdata>> {
        if self.check_backslash_hash(ErrorKind::ExpectedIpv6OrBh)? {
            self.parse_unknown_rdata_with_validation(|rdata| rdata.validate(class, rr_type))
        } else {
            let ipv6: Ipv6Addr = self.reader.read_field(ErrorKind::InvalidIpv6)?;
            self.reader.expect_eol()?;
            let mut rdata = Vec::with_capacity(16);
            serialize_aaaa(ipv6, &mut rdata);
            Ok(rdata.try_into().unwrap())
        }
    }

    /// Parses RDATA for SRV records.
    fn parse_srv_rdata(&mut self, class: Class, rr_type: Type) -> Result<Box<Rdata>> {
        if self.check_backslash_hash(ErrorKind::ExpectedU16OrBh)? {
            self.parse_unknown_rdata_with_validation(|rdata| rdata.validate(class, rr_type))
        } else {
            let priority = self.reader.read_field(ErrorKind::InvalidInt)?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedU16)?;
            let weight = self.reader.read_field(ErrorKind::InvalidInt)?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedU16)?;
            let port = self.reader.read_field(ErrorKind::InvalidInt)?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedName)?;
            let target = self.parse_name()?;
            self.reader.expect_eol()?;
            let mut rdata = Vec::new();
            serialize_srv(priority, weight, port, &target, &mut rdata);
            Ok(rdata.try_into().unwrap())
        }
    }

    /// Parses RDATA for DS and CDS records.
    fn parse_ds_rdata(&mut self, class: Class, rr_type: Type) -> Result<Box<Rdata>> {
        if self.check_backslash_hash(ErrorKind::ExpectedU16OrBh)? {
            self.parse_unknown_rdata_with_validation(|rdata| rdata.validate(class, rr_type))
        } else {
            let key_tag = self.reader.read_field(ErrorKind::InvalidInt)?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedU8)?;
            let algorithm = self.reader.read_field(ErrorKind::InvalidInt)?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedU8)?;
            let digest_type = self.reader.read_field(ErrorKind::InvalidInt)?;
            let digest = self.parse_hex_to_eol(ErrorKind::ExpectedHexDigest)?;
            let mut rdata = Vec::new();
            serialize_ds(key_tag, algorithm, digest_type, &digest, &mut rdata);
            rdata.try_into().map_err(|RdataTooLongError| {
                Error::new(self.reader.position(), ErrorKind::InvalidRdataForType)
            })
        }
    }

    /// Parses RDATA for DNSKEY and CDNSKEY records.
    fn parse_dnskey_rdata(&mut self, class: Class, rr_type: Type) -> Result<Box<Rdata>> {
        if self.check_backslash_hash(ErrorKind::ExpectedU16OrBh)? {
            self.parse_unknown_rdata_with_validation(|rdata| rdata.validate(class, rr_type))
        } else {
            let flags = self.reader.read_field(ErrorKind::InvalidInt)?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedU8)?;
            let protocol = self.reader.read_field(ErrorKind::InvalidInt)?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedU8)?;
            let algorithm = self.reader.read_field(ErrorKind::InvalidInt)?;
            let public_key = self.parse_base64_to_eol(ErrorKind::ExpectedBase64)?;
            let mut rdata = Vec::new();
            serialize_dnskey(flags, protocol, algorithm, &public_key, &mut rdata);
            rdata.try_into().map_err(|RdataTooLongError| {
                Error::new(self.reader.position(), ErrorKind::InvalidRdataForType)
            })
        }
    }

    /// Parses RDATA for RRSIG records.
    fn parse_rrsig_rdata(&mut self, class: Class, rr_type: Type) -> Result<Box<Rdata>> {
        if self.check_backslash_hash(ErrorKind::ExpectedType)? {
            self.parse_unknown_rdata_with_validation(|rdata| rdata.validate(class, rr_type))
        } else {
            let type_covered: Type = self.reader.read_field(ErrorKind::InvalidType)?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedU8)?;
            let algorithm = self.reader.read_field(ErrorKind::InvalidInt)?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedU8)?;
            let labels = self.reader.read_field(ErrorKind::InvalidInt)?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedTtl)?;
            let original_ttl: Ttl = self.reader.read_field(ErrorKind::InvalidTtl)?;
            self.reader
                .skip_to_next_field(ErrorKind::ExpectedTimestamp)?;
            let expiration: SigTime = self.reader.read_field(ErrorKind::InvalidTimestamp)?;
            self.reader
                .skip_to_next_field(ErrorKind::ExpectedTimestamp)?;
            let inception: SigTime = self.reader.read_field(ErrorKind::InvalidTimestamp)?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedU16)?;
            let key_tag = self.reader.read_field(ErrorKind::InvalidInt)?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedName)?;
            let signer = self.parse_name()?;
            let signature = self.parse_base64_to_eol(ErrorKind::ExpectedBase64)?;
            let mut rdata = Vec::new();
            serialize_rrsig(
                type_covered,
                algorithm,
                labels,
                original_ttl.into(),
                expiration.0,
                inception.0,
                key_tag,
                &signer,
                &signature,
                &mut rdata,
            );
            rdata.try_into().map_err(|RdataTooLongError| {
                Error::new(self.reader.position(), ErrorKind::InvalidRdataForType)
            })
        }
    }

    /// Parses RDATA for NSEC records.
    fn parse_nsec_rdata(&mut self, class: Class, rr_type: Type) -> Result<Box<Rdata>> {
        if self.check_backslash_hash(ErrorKind::ExpectedNameOrBh)? {
            self.parse_unknown_rdata_with_validation(|rdata| rdata.validate(class, rr_type))
        } else {
            let next = self.parse_name()?;
            let types = self.parse_type_list()?;
            let mut rdata = Vec::new();
            serialize_nsec(&next, &types, &mut rdata);
            Ok(rdata.try_into().unwrap())
        }
    }

    /// Parses RDATA for NSEC3 records.
    fn parse_nsec3_rdata(&mut self, class: Class, rr_type: Type) -> Result<Box<Rdata>> {
        if self.check_backslash_hash(ErrorKind::ExpectedU8)? {
            self.parse_unknown_rdata_with_validation(|rdata| rdata.validate(class, rr_type))
        } else {
            let (hash_algorithm, flags, iterations, salt) = self.parse_nsec3_fixed_fields()?;
            self.reader
                .skip_to_next_field(ErrorKind::ExpectedBase32Hex)?;
            let next_hashed = self.parse_base32hex_field()?;
            let types = self.parse_type_list()?;
            let mut rdata = Vec::new();
            serialize_nsec3(
                hash_algorithm,
                flags,
                iterations,
                &salt,
                &next_hashed,
                &types,
                &mut rdata,
            );
            Ok(rdata.try_into().unwrap())
        }
    }

    /// Parses RDATA for NSEC3PARAM records.
    fn parse_nsec3param_rdata(&mut self, class: Class, rr_type: Type) -> Result<Box<Rdata>> {
        if self.check_backslash_hash(ErrorKind::ExpectedU8)? {
            self.parse_unknown_rdata_with_validation(|rdata| rdata.validate(class, rr_type))
        } else {
            let (hash_algorithm, flags, iterations, salt) = self.parse_nsec3_fixed_fields()?;
            self.reader.expect_eol()?;
            let mut rdata = Vec::new();
            serialize_nsec3param(hash_algorithm, flags, iterations, &salt, &mut rdata);
            Ok(rdata.try_into().unwrap())
        }
    }

    /// Parses the fixed fields shared by the NSEC3 and NSEC3PARAM
    /// formats: hash algorithm, flags, iterations, and salt.
    fn parse_nsec3_fixed_fields(&mut self) -> Result<(u8, u8, u16, Vec<u8>)> {
        let hash_algorithm = self.reader.read_field(ErrorKind::InvalidInt)?;
        self.reader.skip_to_next_field(ErrorKind::ExpectedU8)?;
        let flags = self.reader.read_field(ErrorKind::InvalidInt)?;
        self.reader.skip_to_next_field(ErrorKind::ExpectedU16)?;
        let iterations = self.reader.read_field(ErrorKind::InvalidInt)?;
        self.reader.skip_to_next_field(ErrorKind::ExpectedSalt)?;
        let salt = self.parse_salt_field()?;
        Ok((hash_algorithm, flags, iterations, salt))
    }

    /// Parses an NSEC3/NSEC3PARAM salt field: either `-` (no salt) or
    /// hexadecimal octets.
    fn parse_salt_field(&mut self) -> Result<Vec<u8>> {
        let position = self.reader.position();
        if self.reader.expect_field(b"-")? {
            return Ok(Vec::new());
        }
        let text: String = self.reader.read_field(|_| ErrorKind::ExpectedSalt)?;
        let salt = decode_hex(&text, position)?;
        if salt.len() > 255 {
            Err(Error::new(position, ErrorKind::SaltTooLong))
        } else {
            Ok(salt)
        }
    }

    /// Parses an NSEC3 next-hashed-owner field (base32hex,
    /// [RFC 4648 § 7]).
    ///
    /// [RFC 4648 § 7]: https://datatracker.ietf.org/doc/html/rfc4648#section-7
    fn parse_base32hex_field(&mut self) -> Result<Vec<u8>> {
        let position = self.reader.position();
        let text: String = self.reader.read_field(|_| ErrorKind::ExpectedBase32Hex)?;
        let next_hashed = decode_base32hex(&text)
            .ok_or_else(|| Error::new(position, ErrorKind::InvalidBase32Hex))?;
        if next_hashed.is_empty() {
            Err(Error::new(position, ErrorKind::ExpectedBase32Hex))
        } else if next_hashed.len() > 255 {
            Err(Error::new(position, ErrorKind::NextHashedOwnerTooLong))
        } else {
            Ok(next_hashed)
        }
    }

    /// Parses the RR types listed at the end of an NSEC or NSEC3
    /// record, through the end of the line. The list may be empty.
    fn parse_type_list(&mut self) -> Result<Vec<Type>> {
        let mut types = Vec::new();
        while self.reader.skip_to_next_field_or_through_eol()? == FieldOrEol::Field {
            types.push(self.reader.read_field(ErrorKind::InvalidType)?);
        }
        Ok(types)
    }

    /// Collects the remaining fields on the line into one string
    /// (dropping the whitespace between them) and consumes the line
    /// ending. `expected` is raised if there is not at least one
    /// field. Returns the position of the first field along with the
    /// collected text.
    fn parse_fields_to_eol(&mut self, expected: ErrorKind) -> Result<(Position, String)> {
        self.reader.skip_to_next_field(expected)?;
        let position = self.reader.position();
        let mut text = String::new();
        loop {
            while let Some(octet) = self.reader.read_field_octet()? {
                if text.len() >= MAX_DATA_TEXT_SIZE {
                    return Err(Error::new(position, ErrorKind::FieldTooLong));
                }
                text.push(char::from(octet));
            }
            if self.reader.skip_to_next_field_or_through_eol()? == FieldOrEol::Eol {
                break;
            }
        }
        Ok((position, text))
    }

    /// Parses base64 data (possibly split across several fields)
    /// through the end of the line.
    fn parse_base64_to_eol(&mut self, expected: ErrorKind) -> Result<Vec<u8>> {
        let (position, text) = self.parse_fields_to_eol(expected)?;
        BASE64_STANDARD
            .decode(&text)
            .map_err(|e| Error::new(position, ErrorKind::InvalidBase64(e)))
    }

    /// Parses hexadecimal data (possibly split across several fields)
    /// through the end of the line.
    fn parse_hex_to_eol(&mut self, expected: ErrorKind) -> Result<Vec<u8>> {
        let (position, text) = self.parse_fields_to_eol(expected)?;
        decode_hex(&text, position)
    }

    /// Parses RDATA using the \# format. This expects that the caller
    /// has already consumed the \# marker and starts by skipping to the
    /// next field in the format (the RDATA length).
    fn parse_unknown_rdata(&mut self) -> Result<Box<Rdata>> {
        self.parse_unknown_rdata_impl().map(|(_, v)| v)
    }

    /// Like [`Parser::parse_unknown_rdata`], except that the RDATA is
    /// additionally validated with `validator` once it is parsed. If
    /// validation fails, an error of kind
    /// [`ErrorKind::InvalidRdataForType`] is returned.
    fn parse_unknown_rdata_with_validation<V, R, E>(&mut self, validator: V) -> Result<Box<Rdata>>
    where
        V: FnOnce(&Rdata) -> std::result::Result<R, E>,
    {
        let (hex_digits_position, rdata) = self.parse_unknown_rdata_impl()?;
        if validator(rdata.as_ref()).is_ok() {
            Ok(rdata)
        } else {
            Err(Error::new(
                hex_digits_position,
                ErrorKind::InvalidRdataForType,
            ))
        }
    }

    /// The implementation of unknown RDATA parsing. In addition to the
    /// RDATA parsed, this returns the start position of the hexadecimal
    /// digits (or the position immediately after the RDATA length
    /// field) for error reporting in
    /// [`Parser::parse_unknown_rdata_with_validation`].
    fn parse_unknown_rdata_impl(&mut self) -> Result<(Position, Box<Rdata>)> {
        self.reader
            .skip_to_next_field(ErrorKind::ExpectedRdataLen)?;
        let len = self
            .reader
            .read_field::<u16, _>(ErrorKind::InvalidRdataLen)?;
        let result = if len == 0 {
            (self.reader.position(), Rdata::empty().to_owned())
        } else {
            self.reader
                .skip_to_next_field(ErrorKind::ExpectedHexRdata)?;
            let hex_digits_position = self.reader.position();
            let rdata = self.parse_unknown_rdata_hex_digits(len)?;
            (hex_digits_position, rdata)
        };
        self.reader.expect_eol()?;
        Ok(result)
    }

    /// Parses a string of hexadecimal digits for a total of `len`
    /// octets.
    fn parse_unknown_rdata_hex_digits(&mut self, len: u16) -> Result<Box<Rdata>> {
        let len = len as usize;
        let mut rdata = Vec::with_capacity(len);
        while rdata.len() < len {
            let high_nibble = self.parse_ascii_hex_digit()?;
            let low_nibble = self.parse_ascii_hex_digit()?;
            rdata.push((high_nibble << 4) | low_nibble);
        }
        Ok(rdata.try_into().unwrap())
    }

    /// Parses a single ASCII hexadecimal digit.
    fn parse_ascii_hex_digit(&mut self) -> Result<u8> {
        match self.reader.read_field_octet()? {
            Some(digit) => match ascii_hex_digit_to_nibble(digit) {
                Some(n) => Ok(n),
                None => Err(Error::new(
                    self.reader.position(),
                    ErrorKind::InvalidHexDigit,
                )),
            },
            None => Err(Error::new(
                self.reader.position(),
                ErrorKind::UnexpectedEndOfHexRdata,
            )),
        }
    }
}

/// Decodes a string of hexadecimal digits into octets.
fn decode_hex(text: &str, position: Position) -> Result<Vec<u8>> {
    if text.len() % 2 != 0 {
        return Err(Error::new(position, ErrorKind::OddNumberOfHexDigits));
    }
    let mut octets = Vec::with_capacity(text.len() / 2);
    let mut bytes = text.bytes();
    while let (Some(high), Some(low)) = (bytes.next(), bytes.next()) {
        let high_nibble = ascii_hex_digit_to_nibble(high)
            .ok_or_else(|| Error::new(position, ErrorKind::InvalidHexDigit))?;
        let low_nibble = ascii_hex_digit_to_nibble(low)
            .ok_or_else(|| Error::new(position, ErrorKind::InvalidHexDigit))?;
        octets.push((high_nibble << 4) | low_nibble);
    }
    Ok(octets)
}

/// Decodes base32hex ([RFC 4648 § 7]) text into octets, accepting both
/// uppercase and lowercase. Trailing `=` padding is permitted but not
/// required, following common DNS practice.
///
/// [RFC 4648 § 7]: https://datatracker.ietf.org/doc/html/rfc4648#section-7
fn decode_base32hex(text: &str) -> Option<Vec<u8>> {
    let mut octets = Vec::with_capacity(text.len() * 5 / 8);
    let mut accumulator: u32 = 0;
    let mut bits = 0;
    let mut padding = false;
    for c in text.bytes() {
        if c == b'=' {
            padding = true;
            continue;
        } else if padding {
            // Data after padding is malformed.
            return None;
        }
        let value = match c {
            b'0'..=b'9' => c - b'0',
            b'A'..=b'V' => c - b'A' + 10,
            b'a'..=b'v' => c - b'a' + 10,
            _ => return None,
        };
        accumulator = (accumulator << 5) | value as u32;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            octets.push((accumulator >> bits) as u8);
        }
    }
    Some(octets)
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::super::tests::make_parser;
    use super::super::LineContent;
    use super::*;
    use crate::rr::rdata::{algorithm, digest, Dnskey, Ds, Rrsig, TypeBitmapIter};

    fn parse_record(data: &[u8]) -> ParsedRr {
        let line = make_parser(data)
            .parse_record_or_empty()
            .unwrap()
            .expect("no record parsed");
        match line.content {
            LineContent::Record(rr) => rr,
            _ => panic!(),
        }
    }

    #[test]
    fn parsing_ds_rdata_works() {
        let rr = parse_record(
            b"example.test. 3600 IN DS 12345 13 2 \
              aabbccdd aabbccdd aabbccdd aabbccdd aabbccdd aabbccdd aabbccdd aabbccdd",
        );
        assert_eq!(rr.rr_type, Type::DS);
        let ds = Ds::try_from_rdata(&rr.rdata).unwrap();
        assert_eq!(ds.key_tag, 12345);
        assert_eq!(ds.algorithm, algorithm::ECDSAP256SHA256);
        assert_eq!(ds.digest_type, digest::SHA256);
        assert_eq!(ds.digest.len(), 32);
        rr.rdata.validate(Class::IN, Type::DS).unwrap();
    }

    #[test]
    fn parsing_ds_rdata_rejects_odd_hex() {
        assert!(matches!(
            make_parser(b"example.test. 3600 IN DS 12345 13 2 aabbc").parse_record_or_empty(),
            Err(Error::Syntax(details)) if details.kind == ErrorKind::OddNumberOfHexDigits,
        ));
    }

    #[test]
    fn parsing_dnskey_rdata_works() {
        // The public key may be split across multiple fields.
        let rr = parse_record(b"example.test. 3600 IN DNSKEY 257 3 13 aGVsbG8g d29ybGQ=");
        let dnskey = Dnskey::try_from_rdata(&rr.rdata).unwrap();
        assert_eq!(dnskey.flags, 257);
        assert_eq!(dnskey.protocol, 3);
        assert_eq!(dnskey.algorithm, algorithm::ECDSAP256SHA256);
        assert_eq!(dnskey.public_key, b"hello world");
    }

    #[test]
    fn parsing_dnskey_rdata_rejects_bad_base64() {
        assert!(matches!(
            make_parser(b"example.test. 3600 IN DNSKEY 257 3 13 not!base64").parse_record_or_empty(),
            Err(Error::Syntax(details))
                if matches!(details.kind, ErrorKind::InvalidBase64(_)),
        ));
    }

    #[test]
    fn parsing_rrsig_rdata_works() {
        let rr = parse_record(
            b"example.test. 3600 IN RRSIG CDS 13 2 3600 \
              20030322173103 20030220173103 12345 example.test. c2lnbmF0dXJl",
        );
        let rrsig = Rrsig::try_from_rdata(&rr.rdata).unwrap();
        assert_eq!(rrsig.type_covered, Type::CDS);
        assert_eq!(rrsig.algorithm, algorithm::ECDSAP256SHA256);
        assert_eq!(rrsig.labels, 2);
        assert_eq!(rrsig.original_ttl, 3600);
        assert_eq!(rrsig.expiration, 1048354263);
        assert_eq!(rrsig.key_tag, 12345);
        assert_eq!(
            rrsig.signer,
            "example.test.".parse::<Box<Name>>().unwrap()
        );
        assert_eq!(rrsig.signature, b"signature");
    }

    #[test]
    fn parsing_nsec_rdata_works() {
        let rr = parse_record(b"alfa.example.test. 3600 IN NSEC host.example.test. A MX RRSIG NSEC");
        rr.rdata.validate(Class::IN, Type::NSEC).unwrap();
        let next_len = Name::validate_uncompressed(&rr.rdata).unwrap();
        let types: Vec<Type> = TypeBitmapIter::new(&rr.rdata[next_len..]).collect();
        assert_eq!(types, [Type::A, Type::MX, Type::RRSIG, Type::NSEC]);
    }

    #[test]
    fn parsing_nsec3_rdata_works() {
        // The example from RFC 5155 § B.2, with an empty salt.
        let rr = parse_record(
            b"example.test. 3600 IN NSEC3 1 1 12 - 2t7b4g4vsa5smi47k61mv5bv1a22bojr NS SOA",
        );
        rr.rdata.validate(Class::IN, Type::NSEC3).unwrap();
        assert_eq!(rr.rdata[0], 1); // hash algorithm
        assert_eq!(rr.rdata[1], 1); // flags
        assert_eq!(&rr.rdata[2..4], &12u16.to_be_bytes()); // iterations
        assert_eq!(rr.rdata[4], 0); // empty salt
        assert_eq!(rr.rdata[5], 20); // SHA-1 hash length
    }

    #[test]
    fn parsing_nsec3param_rdata_works() {
        let rr = parse_record(b"example.test. 3600 IN NSEC3PARAM 1 0 12 aabbccdd");
        rr.rdata.validate(Class::IN, Type::NSEC3PARAM).unwrap();
        assert_eq!(rr.rdata.octets(), b"\x01\x00\x00\x0c\x04\xaa\xbb\xcc\xdd");
    }

    #[test]
    fn parsing_unknown_rdata_works() {
        let rr = parse_record(b"example.test. 3600 IN TYPE65280 \\# 4 c0000201");
        assert_eq!(u16::from(rr.rr_type), 65280);
        assert_eq!(rr.rdata.octets(), b"\xc0\x00\x02\x01");
    }

    #[test]
    fn backslash_hash_rdata_is_validated_for_known_types() {
        // Three octets is not a valid A record.
        assert!(matches!(
            make_parser(b"example.test. 3600 IN A \\# 3 c00002").parse_record_or_empty(),
            Err(Error::Syntax(details)) if details.kind == ErrorKind::InvalidRdataForType,
        ));
    }

    #[test]
    fn base32hex_decoding_works() {
        assert_eq!(decode_base32hex("CO").unwrap(), b"e");
        assert_eq!(decode_base32hex("co").unwrap(), b"e");
        assert_eq!(decode_base32hex("CPNMU").unwrap(), b"fo\xf7");
        assert!(decode_base32hex("w").is_none());
        assert!(decode_base32hex("C=O").is_none());
    }
}
