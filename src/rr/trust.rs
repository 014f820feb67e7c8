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

//! Provides the [`Trust`] type for RRset trust levels.

use std::fmt;

/// How much an RRset is to be trusted, in increasing order.
///
/// The `Ord` implementation makes aggregation natural: when several
/// RRsets are folded into one cached entry, the entry's trust is the
/// minimum of the members' trust.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum Trust {
    /// Not trusted at all (placeholder; never stored).
    None = 0,

    /// From the additional section of a response.
    Additional = 1,

    /// From the answer or authority section of a non-authoritative
    /// response.
    Answer = 2,

    /// From the authority section of an authoritative response.
    AuthAuthority = 3,

    /// Locally configured or cryptographically verified data.
    Ultimate = 4,
}

impl Trust {
    /// Converts a stored trust octet back into a `Trust`. Unknown
    /// values clamp to [`Trust::None`].
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Additional,
            2 => Self::Answer,
            3 => Self::AuthAuthority,
            4 => Self::Ultimate,
            _ => Self::None,
        }
    }
}

impl From<Trust> for u8 {
    fn from(trust: Trust) -> Self {
        trust as u8
    }
}

impl fmt::Display for Trust {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Additional => f.write_str("additional"),
            Self::Answer => f.write_str("answer"),
            Self::AuthAuthority => f.write_str("authauthority"),
            Self::Ultimate => f.write_str("ultimate"),
        }
    }
}
