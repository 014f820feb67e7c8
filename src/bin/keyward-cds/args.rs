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

//! Implements command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use keyward::rr::rdata::digest;
use keyward::rr::Ttl;

/// Parses the command line arguments.
pub fn parse() -> Args {
    Args::parse()
}

/// Update parent DS records from a child's CDS/CDNSKEY records
#[derive(Debug, Parser)]
#[command(author, version)]
pub struct Args {
    /// File holding the child's DNSKEY, CDS, and CDNSKEY records and
    /// their signatures
    #[arg(short = 'f', value_name = "FILE")]
    pub child_file: PathBuf,

    /// The DS file to update, or a directory containing dsset- files
    #[arg(short = 'd', value_name = "PATH")]
    pub ds_path: PathBuf,

    /// Accept this DS digest algorithm (repeatable; default SHA-256)
    #[arg(short = 'a', value_name = "DIGEST", value_parser = parse_digest)]
    pub digests: Vec<u8>,

    /// The class of the records
    #[arg(short = 'c', value_name = "CLASS", default_value = "IN")]
    pub class: String,

    /// Prefer CDNSKEY records when both CDS and CDNSKEY are present
    #[arg(short = 'D')]
    pub prefer_cdnskey: bool,

    /// Update the DS file in place, keeping a backup with the given
    /// suffix (no suffix: no backup)
    #[arg(
        short = 'i',
        value_name = "SUFFIX",
        num_args = 0..=1,
        default_missing_value = ""
    )]
    pub inplace: Option<String>,

    /// Ignore signatures from before this time: seconds since the
    /// epoch, YYYYMMDDHHMMSS, or +N/-N seconds relative to the DS
    /// file's modification time
    #[arg(short = 's', value_name = "START")]
    pub start: Option<String>,

    /// Write an nsupdate script to standard output instead of a DS
    /// RRset
    #[arg(short = 'u')]
    pub nsupdate: bool,

    /// TTL of the new DS records, in seconds or with w/d/h/m/s units
    /// (default: the old DS RRset's TTL)
    #[arg(short = 'T', value_name = "TTL")]
    pub ttl: Option<Ttl>,

    /// Verbosity level
    #[arg(short = 'v', value_name = "LEVEL", default_value_t = 0)]
    pub verbosity: u32,

    /// The zone whose DS records are to be updated
    #[arg(value_name = "DOMAIN")]
    pub domain: String,
}

/// Parses a `-a` argument into a DS digest type number.
fn parse_digest(text: &str) -> Result<u8, String> {
    match text {
        "SHA-1" | "SHA1" | "1" => Ok(digest::SHA1),
        "SHA-256" | "SHA256" | "2" => Ok(digest::SHA256),
        "SHA-384" | "SHA384" | "4" => Ok(digest::SHA384),
        _ => Err(format!("unknown digest algorithm {}", text)),
    }
}
