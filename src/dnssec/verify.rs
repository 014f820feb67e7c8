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

//! RRSIG verification ([RFC 4035 § 5.3]).
//!
//! [`VerifyingKey`] decodes a DNSKEY's public key field into a form
//! *ring* can use, and [`verify_rrset`] reconstructs the signed data
//! of an RRset (canonical owner, original TTL, canonically ordered
//! RDATA) and checks an RRSIG against it.
//!
//! [RFC 4035 § 5.3]: https://datatracker.ietf.org/doc/html/rfc4035#section-5.3

use ring::signature;

use super::{Error, Result};
use crate::rr::rdata::{algorithm, serialize_rrsig, Dnskey, Rrsig};
use crate::rr::{Rdata, Rrset};

////////////////////////////////////////////////////////////////////////
// VERIFYING KEYS                                                     //
////////////////////////////////////////////////////////////////////////

/// A DNSKEY public key decoded into a verifier.
pub struct VerifyingKey {
    algorithm: u8,
    inner: Inner,
}

enum Inner {
    Unparsed(&'static dyn signature::VerificationAlgorithm, Vec<u8>),
    Rsa(&'static signature::RsaParameters, Vec<u8>, Vec<u8>),
}

impl VerifyingKey {
    /// Decodes the public key field of `dnskey` according to its
    /// algorithm.
    pub fn try_from_dnskey(dnskey: &Dnskey) -> Result<Self> {
        let key = dnskey.public_key;
        let inner = match dnskey.algorithm {
            algorithm::RSASHA1 | algorithm::NSEC3RSASHA1 => rsa(
                key,
                &signature::RSA_PKCS1_1024_8192_SHA1_FOR_LEGACY_USE_ONLY,
            )?,
            algorithm::RSASHA256 => rsa(
                key,
                &signature::RSA_PKCS1_1024_8192_SHA256_FOR_LEGACY_USE_ONLY,
            )?,
            algorithm::RSASHA512 => rsa(
                key,
                &signature::RSA_PKCS1_1024_8192_SHA512_FOR_LEGACY_USE_ONLY,
            )?,
            algorithm::ECDSAP256SHA256 => ecdsa(key, 64, &signature::ECDSA_P256_SHA256_FIXED)?,
            algorithm::ECDSAP384SHA384 => ecdsa(key, 96, &signature::ECDSA_P384_SHA384_FIXED)?,
            algorithm::ED25519 => {
                if key.len() != 32 {
                    return Err(Error::InvalidKey);
                }
                Inner::Unparsed(&signature::ED25519, key.to_vec())
            }
            other => return Err(Error::UnsupportedAlgorithm(other)),
        };
        Ok(Self {
            algorithm: dnskey.algorithm,
            inner,
        })
    }

    /// Returns the DNSSEC algorithm number this key was decoded for.
    pub fn algorithm(&self) -> u8 {
        self.algorithm
    }

    /// Checks `signature_octets` against `message`.
    pub fn verify(&self, message: &[u8], signature_octets: &[u8]) -> Result<()> {
        match &self.inner {
            Inner::Unparsed(alg, key) => signature::UnparsedPublicKey::new(*alg, key)
                .verify(message, signature_octets)
                .map_err(|_| Error::BadSignature),
            Inner::Rsa(params, n, e) => signature::RsaPublicKeyComponents {
                n: n.as_slice(),
                e: e.as_slice(),
            }
            .verify(params, message, signature_octets)
            .map_err(|_| Error::BadSignature),
        }
    }
}

/// Splits an RSA public key in the [RFC 3110 § 2] wire form into its
/// modulus and exponent. The exponent length takes one octet, or three
/// when the first is zero.
///
/// [RFC 3110 § 2]: https://datatracker.ietf.org/doc/html/rfc3110#section-2
fn rsa(key: &[u8], params: &'static signature::RsaParameters) -> Result<Inner> {
    let (exponent_len, fields_at) = match key.first() {
        Some(0) if key.len() >= 3 => {
            (u16::from_be_bytes([key[1], key[2]]) as usize, 3)
        }
        Some(&len) => (len as usize, 1),
        None => return Err(Error::InvalidKey),
    };
    let exponent = key
        .get(fields_at..fields_at + exponent_len)
        .ok_or(Error::InvalidKey)?;
    let modulus = &key[fields_at + exponent_len..];
    if exponent.is_empty() || modulus.is_empty() {
        return Err(Error::InvalidKey);
    }
    Ok(Inner::Rsa(params, modulus.to_vec(), exponent.to_vec()))
}

/// Prepares an ECDSA public key. The DNSKEY form is the raw point
/// ([RFC 6605 § 4]); *ring* wants it prefixed with the uncompressed
/// point marker.
///
/// [RFC 6605 § 4]: https://datatracker.ietf.org/doc/html/rfc6605#section-4
fn ecdsa(
    key: &[u8],
    raw_len: usize,
    alg: &'static dyn signature::VerificationAlgorithm,
) -> Result<Inner> {
    if key.len() != raw_len {
        return Err(Error::InvalidKey);
    }
    let mut prefixed = Vec::with_capacity(1 + raw_len);
    prefixed.push(0x04);
    prefixed.extend_from_slice(key);
    Ok(Inner::Unparsed(alg, prefixed))
}

////////////////////////////////////////////////////////////////////////
// RRSET VERIFICATION                                                 //
////////////////////////////////////////////////////////////////////////

/// Verifies `rrsig` over `rrset` with `key`.
///
/// The signed data is reconstructed per [RFC 4035 § 5.3.2]: the RRSIG
/// RDATA up to the signer name (lowercased), then each RDATA in
/// canonical order under the lowercased owner (wildcard-expanded when
/// the labels field calls for it) at the original TTL.
///
/// [RFC 4035 § 5.3.2]: https://datatracker.ietf.org/doc/html/rfc4035#section-5.3.2
pub fn verify_rrset(key: &VerifyingKey, rrset: &Rrset, rrsig: &Rrsig) -> Result<()> {
    if rrsig.type_covered != rrset.rr_type {
        return Err(Error::BadSignature);
    }

    let mut data = Vec::new();
    let mut signer = rrsig.signer.clone();
    signer.make_ascii_lowercase();
    serialize_rrsig(
        rrsig.type_covered,
        rrsig.algorithm,
        rrsig.labels,
        rrsig.original_ttl,
        rrsig.expiration,
        rrsig.inception,
        rrsig.key_tag,
        &signer,
        &[],
        &mut data,
    );

    let mut owner = rrset.owner.clone();
    owner.make_ascii_lowercase();
    let owner_labels = owner.len() - 1;
    let owner_wire = if (rrsig.labels as usize) < owner_labels {
        let suffix = owner
            .superdomain(owner_labels - rrsig.labels as usize)
            .ok_or(Error::BadSignature)?;
        let mut wire = Vec::with_capacity(2 + suffix.wire_repr().len());
        wire.extend_from_slice(b"\x01*");
        wire.extend_from_slice(suffix.wire_repr());
        wire
    } else {
        owner.wire_repr().to_vec()
    };

    // None of the types handled here embed domain names in their
    // RDATA post-RFC 3597, so bytewise order is canonical order.
    let mut rdatas: Vec<&Rdata> = rrset.rdatas().iter().collect();
    rdatas.sort_unstable_by(|a, b| a.octets().cmp(b.octets()));

    for rdata in rdatas {
        data.extend_from_slice(&owner_wire);
        data.extend_from_slice(&u16::from(rrset.rr_type).to_be_bytes());
        data.extend_from_slice(&u16::from(rrset.class).to_be_bytes());
        data.extend_from_slice(&rrsig.original_ttl.to_be_bytes());
        data.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        data.extend_from_slice(rdata.octets());
    }

    key.verify(&data, rrsig.signature)
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;
    use crate::name::Name;
    use crate::rr::rdata::{key_tag_of_wire, serialize_dnskey, SigTime};
    use crate::rr::{Ttl, Type};

    fn b64(text: &str) -> Vec<u8> {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine as _;
        STANDARD.decode(text).unwrap()
    }

    fn dnskey_rdata(flags: u16, algorithm: u8, key_b64: &str) -> Vec<u8> {
        let mut rdata = Vec::new();
        serialize_dnskey(flags, 3, algorithm, &b64(key_b64), &mut rdata);
        rdata
    }

    fn dnskey_rrset(owner: &str, ttl: u32, rdatas: &[&[u8]]) -> Rrset {
        let mut rrset = Rrset::new(
            owner.parse().unwrap(),
            Class::IN,
            Type::DNSKEY,
            Ttl::from(ttl),
        );
        for rdata in rdatas {
            rrset.push_rdata((*rdata).try_into().unwrap());
        }
        rrset
    }

    fn key_for(rdata: &[u8]) -> VerifyingKey {
        let rdata: &Rdata = rdata.try_into().unwrap();
        VerifyingKey::try_from_dnskey(&Dnskey::try_from_rdata(rdata).unwrap()).unwrap()
    }

    // The cloudflare.com DNSKEY RRset and its KSK signature, captured
    // spring 2019.
    const P256_KSK: &str = "mdsswUyr3DPW132mOi8V9xESWE8jTo0dxCjjnopKl+GqJxpVXckHAe\
                            F+KkxLbxILfDLUT0rAK9iUzy1L53eKGQ==";
    const P256_ZSK: &str = "oJMRESz5E4gYzS/q6XDrvU1qMPYIjCWzJaOau8XNEZeqCYKD5ar0IR\
                            d8KqXXFJkqmVfRvMGPmM1x8fGAa2XhSA==";
    const P256_SIG: &str = "8jnAGhG7O52wmL065je10XQztRX1vK8P8KBSyo71Z6h5wAT9+GFxKBaE\
                            zcJBLvRmofYFDAhju21p1uTfLaYHrg==";

    fn p256_rrset_and_rrsig(sig: &[u8]) -> (Vec<u8>, Vec<u8>, Rrset, Rrsig<'_>) {
        let ksk = dnskey_rdata(257, algorithm::ECDSAP256SHA256, P256_KSK);
        let zsk = dnskey_rdata(256, algorithm::ECDSAP256SHA256, P256_ZSK);
        // A zero RRset TTL shows that the signed data uses the
        // original TTL from the RRSIG.
        let rrset = dnskey_rrset("cloudflare.com.", 0, &[&ksk, &zsk]);
        let rrsig = Rrsig {
            type_covered: Type::DNSKEY,
            algorithm: algorithm::ECDSAP256SHA256,
            labels: 2,
            original_ttl: 3600,
            expiration: 1560314494,
            inception: 1555130494,
            key_tag: 2371,
            signer: "cloudflare.com.".parse().unwrap(),
            signature: sig,
        };
        (ksk, zsk, rrset, rrsig)
    }

    #[test]
    fn ecdsa_p256_dnskey_rrset_verifies() {
        let sig = b64(P256_SIG);
        let (ksk, _, rrset, rrsig) = p256_rrset_and_rrsig(&sig);
        assert_eq!(key_tag_of_wire(&ksk, algorithm::ECDSAP256SHA256), 2371);
        verify_rrset(&key_for(&ksk), &rrset, &rrsig).unwrap();
    }

    #[test]
    fn the_wrong_key_does_not_verify() {
        let sig = b64(P256_SIG);
        let (_, zsk, rrset, rrsig) = p256_rrset_and_rrsig(&sig);
        assert!(matches!(
            verify_rrset(&key_for(&zsk), &rrset, &rrsig),
            Err(Error::BadSignature)
        ));
    }

    #[test]
    fn a_corrupted_signature_does_not_verify() {
        let mut sig = b64(P256_SIG);
        sig[10] ^= 0x01;
        let (ksk, _, rrset, rrsig) = p256_rrset_and_rrsig(&sig);
        assert!(matches!(
            verify_rrset(&key_for(&ksk), &rrset, &rrsig),
            Err(Error::BadSignature)
        ));
    }

    #[test]
    fn the_covered_type_must_match_the_rrset() {
        let sig = b64(P256_SIG);
        let (ksk, _, rrset, mut rrsig) = p256_rrset_and_rrsig(&sig);
        rrsig.type_covered = Type::CDNSKEY;
        assert!(verify_rrset(&key_for(&ksk), &rrset, &rrsig).is_err());
    }

    #[test]
    fn ed25519_lowercases_the_owner() {
        // The ED25519.nl DNSKEY RRset, captured spring 2019. The
        // uppercase label exercises owner canonicalization.
        let ksk = dnskey_rdata(
            257,
            algorithm::ED25519,
            "m1NELLVVQKl4fHVn/KKdeNO0PrYKGT3IGbYseT8XcKo=",
        );
        let zsk = dnskey_rdata(
            256,
            algorithm::ED25519,
            "2tstZAjgmlDTePn0NVXrAHBJmg84LoaFVxzLl1anjGI=",
        );
        let rrset = dnskey_rrset("ED25519.nl.", 3600, &[&ksk, &zsk]);
        let sig = b64(
            "hvPSS3E9Mx7lMARqtv6IGiw0NE0uz0mZewndJCHTkhwSYqlasUq7KfO5\
             QdtgPXja7YkTaqzrYUbYk01J8ICsAA==",
        );
        let rrsig = Rrsig {
            type_covered: Type::DNSKEY,
            algorithm: algorithm::ED25519,
            labels: 2,
            original_ttl: 3600,
            expiration: 1559174400,
            inception: 1557360000,
            key_tag: 45515,
            signer: "ED25519.nl.".parse().unwrap(),
            signature: &sig,
        };
        assert_eq!(key_tag_of_wire(&ksk, algorithm::ED25519), 45515);
        verify_rrset(&key_for(&ksk), &rrset, &rrsig).unwrap();
    }

    #[test]
    fn rsa_sha256_root_dnskey_rrset_verifies() {
        // The root zone DNSKEY RRset signed by KSK-2017 (tag 20326),
        // May 2019.
        let ksk = dnskey_rdata(
            257,
            algorithm::RSASHA256,
            "AwEAAaz/tAm8yTn4Mfeh5eyI96WSVexTBAvkMgJzkKTOiW1vkIbzxeF3+/\
             4RgWOq7HrxRixHlFlExOLAJr5emLvN7SWXgnLh4+B5xQlNVz8Og8kvArMt\
             NROxVQuCaSnIDdD5LKyWbRd2n9WGe2R8PzgCmr3EgVLrjyBxWezF0jLHwV\
             N8efS3rCj/EWgvIWgb9tarpVUDK/b58Da+sqqls3eNbuv7pr+eoZG+SrDK\
             6nWeL3c6H5Apxz7LjVc1uTIdsIXxuOLYA4/ilBmSVIzuDWfdRUfhHdY6+c\
             n8HFRm+2hM8AnXGXws9555KrUB5qihylGa8subX2Nn6UwNR1AkUTV74bU=",
        );
        let zsk = dnskey_rdata(
            256,
            algorithm::RSASHA256,
            "AwEAAeVDC34GZILwsQJy97K2Fst4P3XYZrXLyrkausYzSqEjSUulgh+iLgH\
             g0y7FIF890+sIjXsk7KLJUmCOWfYWPorNKEOKLk5Zx/4M6D3IHZE3O3m/Ea\
             hrc28qQzmTLxiMZAW65MvR2UO3LxVtYOPBEBiDgAQD47x2JLsJYtavCzNL5\
             WiUk59OgvHmDqmcC7VXYBhK8V8Tic089XJgExGeplKWUt9yyc31ra1swJX5\
             1XsOaQz17+vyLVH8AZP26KvKFiZeoRbaq6vl+hc8HQnI2ug5rA2zoz3MsSQ\
             BvP1f/HvqsWxLqwXXKyDD1QM639U+XzVB8CYigyscRP22QCnwKIU=",
        );
        let rrset = dnskey_rrset(".", 172800, &[&ksk, &zsk]);
        let sig = b64(
            "otBkINZAQu7AvPKjr/xWIEE7+SoZtKgF8bzVynX6bfJMJuPay8jPvNmwXk\
             ZOdSoYlvFp0bk9JWJKCh8y5uoNfMFkN6OSrDkr3t0E+c8c0Mnmwkk5CETH3\
             Gqxthi0yyRX5T4VlHU06/Ks4zI+XAgl3FBpOc554ivdzez8YCjAIGx7Xgzz\
             ooEb7heMSlLc7S7/HNjw51TPRs4RxrAVcezieKCzPPpeWBhjE6R3oiSwrl0\
             SBD4/yplrDlr7UHs/Atcm3MSgemdyr2sOoOUkVQCVpcj3SQQezoD2tCM786\
             1CXEQdg5fjeHDtz285xHt5HJpA5cOcctRo4ihybfow/+V7AQ==",
        );
        let rrsig = Rrsig {
            type_covered: Type::DNSKEY,
            algorithm: algorithm::RSASHA256,
            labels: 0,
            original_ttl: 172800,
            expiration: 1560211200,
            inception: 1558396800,
            key_tag: 20326,
            signer: ".".parse().unwrap(),
            signature: &sig,
        };
        assert_eq!(key_tag_of_wire(&ksk, algorithm::RSASHA256), 20326);
        verify_rrset(&key_for(&ksk), &rrset, &rrsig).unwrap();
    }

    #[test]
    fn rsa_sha1_wildcard_expansion_verifies() {
        // The wildcard MX example from RFC 4035 Appendix B.6.
        let key = dnskey_rdata(
            256,
            algorithm::RSASHA1,
            "AQOy1bZVvpPqhg4j7EJoM9rI3ZmyEx2OzDBVrZy/lvI5CQePxX\
             HZS4i8dANH4DX3tbHol61ek8EFMcsGXxKciJFHyhl94C+NwILQd\
             zsUlSFovBZsyl/NX6yEbtw/xN9ZNcrbYvgjjZ/UVPZIySFNsgEY\
             vh0z2542lzMKR4Dh8uZffQ==",
        );
        let mut mx_rdata = vec![0, 1];
        mx_rdata.extend_from_slice("ai.example.".parse::<Box<Name>>().unwrap().wire_repr());
        let mut rrset = Rrset::new(
            "a.z.w.example.".parse().unwrap(),
            Class::IN,
            Type::MX,
            Ttl::from(3600),
        );
        rrset.push_rdata(mx_rdata.as_slice().try_into().unwrap());
        let sig = b64(
            "OMK8rAZlepfzLWW75Dxd63jy2wswESzxDKG2f9AMN1CytCd10cYI\
             SAxfAdvXSZ7xujKAtPbctvOQ2ofO7AZJ+d01EeeQTVBPq4/6KCWhq\
             e2XTjnkVLNvvhnc0u28aoSsG0+4InvkkOHknKxw4kX18MMR34i8lC\
             36SR5xBni8vHI=",
        );
        let rrsig = Rrsig {
            type_covered: Type::MX,
            algorithm: algorithm::RSASHA1,
            labels: 2,
            original_ttl: 3600,
            expiration: SigTime::parse("20040509183619").unwrap().0,
            inception: SigTime::parse("20040409183619").unwrap().0,
            key_tag: 38519,
            signer: "example.".parse().unwrap(),
            signature: &sig,
        };
        assert_eq!(key_tag_of_wire(&key, algorithm::RSASHA1), 38519);
        verify_rrset(&key_for(&key), &rrset, &rrsig).unwrap();
    }

    #[test]
    fn unsupported_algorithms_are_reported() {
        let rdata = dnskey_rdata(256, algorithm::DSA, "c2hvcnQta2V5");
        let rdata: &Rdata = rdata.as_slice().try_into().unwrap();
        let dnskey = Dnskey::try_from_rdata(rdata).unwrap();
        assert!(matches!(
            VerifyingKey::try_from_dnskey(&dnskey),
            Err(Error::UnsupportedAlgorithm(3))
        ));
    }

    #[test]
    fn truncated_keys_are_rejected() {
        let rdata = dnskey_rdata(257, algorithm::ED25519, "dG9vLXNob3J0");
        let rdata: &Rdata = rdata.as_slice().try_into().unwrap();
        let dnskey = Dnskey::try_from_rdata(rdata).unwrap();
        assert!(matches!(
            VerifyingKey::try_from_dnskey(&dnskey),
            Err(Error::InvalidKey)
        ));
    }
}
