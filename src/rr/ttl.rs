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

//! Provides the [`Ttl`] structure for DNS RR TTLs.

use std::fmt;
use std::str::FromStr;

////////////////////////////////////////////////////////////////////////
// TTLS                                                               //
////////////////////////////////////////////////////////////////////////

/// The time to live (TTL) of a DNS record.
///
/// There are contradictory definitions of the TTL field in [RFC 1035]
/// (see [erratum 2130]), so [RFC 2181 § 8] clarified that TTL values
/// are unsigned integers between 0 and 2³¹ - 1, inclusive. Because the
/// TTL field is 32 bits wide, the most significant bit is zero. A TTL
/// value received with the most significant bit set is interpreted as
/// zero.
///
/// This type wraps `u32` to implement [RFC 2181 § 8]. The public API
/// will only instantiate `Ttl` objects whose underlying `u32` values
/// have the most significant bit set to zero, and `Ttl::from(u32)`
/// treats TTL wire values with the most significant bit set as zero.
///
/// [Erratum 2130]: https://www.rfc-editor.org/errata/eid2130
/// [RFC 1035]: https://datatracker.ietf.org/doc/html/rfc1035
/// [RFC 2181 § 8]: https://datatracker.ietf.org/doc/html/rfc2181#section-8
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Ttl(u32);

impl From<u32> for Ttl {
    fn from(raw: u32) -> Self {
        if raw > i32::MAX as u32 {
            Self(0)
        } else {
            Self(raw)
        }
    }
}

impl From<Ttl> for u32 {
    fn from(ttl: Ttl) -> Self {
        ttl.0
    }
}

/// Parses a TTL, either as a plain number of seconds or with unit
/// suffixes in the style long used by zone tooling: `w` (weeks), `d`
/// (days), `h` (hours), `m` (minutes), and `s` (seconds), so that e.g.
/// `1h30m` is 5,400 seconds. Units are case-insensitive.
impl FromStr for Ttl {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.is_empty() {
            return Err("empty TTL");
        }
        let mut total: u64 = 0;
        let mut value: u64 = 0;
        let mut have_digits = false;
        for c in text.chars() {
            if let Some(digit) = c.to_digit(10) {
                value = value * 10 + digit as u64;
                if value > u32::MAX as u64 {
                    return Err("TTL value is too large");
                }
                have_digits = true;
            } else {
                let multiplier = match c.to_ascii_lowercase() {
                    'w' => 604800,
                    'd' => 86400,
                    'h' => 3600,
                    'm' => 60,
                    's' => 1,
                    _ => return Err("invalid TTL unit"),
                };
                if !have_digits {
                    return Err("TTL unit without a value");
                }
                total += value * multiplier;
                value = 0;
                have_digits = false;
            }
        }
        total += value;
        if total > u32::MAX as u64 {
            Err("TTL value is too large")
        } else {
            Ok(Self::from(total as u32))
        }
    }
}

impl fmt::Debug for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_ttls_are_not_modified() {
        let i32_max = i32::MAX as u32;
        assert_eq!(u32::from(Ttl::from(0)), 0);
        assert_eq!(u32::from(Ttl::from(23)), 23);
        assert_eq!(u32::from(Ttl::from(i32_max)), i32_max);
    }

    #[test]
    fn large_ttls_become_zero() {
        assert_eq!(u32::from(Ttl::from(i32::MAX as u32 + 1)), 0);
    }

    #[test]
    fn fromstr_accepts_plain_seconds() {
        assert_eq!("3600".parse::<Ttl>(), Ok(Ttl::from(3600)));
    }

    #[test]
    fn fromstr_accepts_unit_suffixes() {
        assert_eq!("1h30m".parse::<Ttl>(), Ok(Ttl::from(5400)));
        assert_eq!("2W".parse::<Ttl>(), Ok(Ttl::from(1209600)));
        assert_eq!("1d12h".parse::<Ttl>(), Ok(Ttl::from(129600)));
    }

    #[test]
    fn fromstr_rejects_garbage() {
        assert!("".parse::<Ttl>().is_err());
        assert!("h".parse::<Ttl>().is_err());
        assert!("12x".parse::<Ttl>().is_err());
    }
}
