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

//! Keyward, a toolkit for DNSSEC delegation maintenance.
//!
//! This crate implements the machinery needed to keep a delegation's DS
//! records synchronized with the child zone's published CDS and CDNSKEY
//! RRsets ([RFC 7344]):
//!
//! * a versioned in-memory zone database ([`db`]) with a zone-file
//!   parser ([`zone_file`]) and text/raw dump and load routines
//!   ([`master`]);
//! * a difference engine ([`diff`]) expressing zone changes as ordered
//!   add/delete tuples, with minimization, application, and
//!   `nsupdate`-script emission;
//! * a negative-caching codec ([`ncache`]) storing the records of a
//!   negative response in a single contiguous buffer;
//! * DNSSEC validation and DS-generation primitives ([`dnssec`]):
//!   signature verification, key-table construction, and deterministic
//!   DS RRset synthesis from CDS/CDNSKEY data.
//!
//! The `keyward-cds` and `keyward-revoke` binaries build the
//! command-line tools on top of these modules.
//!
//! [RFC 7344]: https://datatracker.ietf.org/doc/html/rfc7344

pub mod class;
pub mod db;
pub mod diff;
pub mod dnssec;
pub mod master;
pub mod name;
pub mod ncache;
pub mod rr;
pub mod zone_file;

mod util;
