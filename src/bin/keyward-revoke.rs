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

//! The `keyward-revoke` tool: sets the REVOKE bit ([RFC 5011]) on a
//! stored key and writes the key files the revoked key is named by.
//! Revocation changes the key tag, so the revoked key gets a new
//! `K<name>+<algorithm>+<tag>` pair.
//!
//! [RFC 5011]: https://datatracker.ietf.org/doc/html/rfc5011

use std::ffi::OsStr;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::error;

use keyward::dnssec::keyfile::{self, KeyFileName};
use keyward::master::{rdataset_to_text, Style};
use keyward::rr::rdata::Dnskey;
use keyward::rr::{Rrset, Type};

/// Revoke a DNSSEC key and write the renamed key files
#[derive(Debug, Parser)]
#[command(author, version)]
struct Args {
    /// Overwrite existing files
    #[arg(short = 'f')]
    force: bool,

    /// Directory holding the key files (default: the key file's own
    /// directory)
    #[arg(short = 'K', value_name = "DIRECTORY")]
    directory: Option<PathBuf>,

    /// Remove the unrevoked key files once the revoked pair is written
    #[arg(short = 'r')]
    remove: bool,

    /// Print the key tag the revoked key will have, without writing
    /// anything
    #[arg(short = 'R')]
    print_tag_only: bool,

    /// Verbosity level
    #[arg(short = 'v', value_name = "LEVEL", default_value_t = 0)]
    verbosity: u32,

    /// The key to revoke, named as K<name>+<algorithm>+<tag>
    #[arg(value_name = "KEYFILE")]
    keyfile: String,
}

fn main() {
    let args = Args::parse();
    let default_filter = match args.verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::init_from_env(Env::new().default_filter_or(default_filter));

    if let Err(e) = run(args) {
        let mut message = String::from("Failed:");
        for (i, cause) in e.chain().enumerate() {
            write!(message, "\n[{}] {}", i + 1, cause).unwrap();
        }
        error!("{}", message);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let input = Path::new(&args.keyfile);
    let stem = input
        .file_name()
        .and_then(OsStr::to_str)
        .ok_or_else(|| anyhow!("invalid key file name {}", args.keyfile))?;
    let old_name: KeyFileName = stem
        .parse()
        .map_err(|e| anyhow!("invalid key file name {}: {}", stem, e))?;
    let directory = match &args.directory {
        Some(directory) => directory.clone(),
        None => match input.parent() {
            Some(parent) if parent != Path::new("") => parent.to_owned(),
            _ => PathBuf::from("."),
        },
    };

    let old_key_path = old_name.key_path(&directory);
    let record = keyfile::read_dnskey_file(&old_key_path)
        .with_context(|| format!("failed to read {}", old_key_path.display()))?;
    let dnskey = Dnskey::try_from_rdata(&record.rdata)
        .map_err(|_| anyhow!("malformed DNSKEY record in {}", old_key_path.display()))?;
    if dnskey.is_revoked() {
        if args.print_tag_only {
            println!("{}", old_name.key_tag);
            return Ok(());
        }
        bail!("key {} is already revoked", old_name);
    }

    let (revoked_wire, new_tag) =
        keyfile::revoke(&record.rdata).map_err(|e| anyhow!("could not revoke key: {}", e))?;
    if args.print_tag_only {
        println!("{}", new_tag);
        return Ok(());
    }

    let new_name = KeyFileName::new(old_name.name.clone(), old_name.algorithm, new_tag);
    let new_key_path = new_name.key_path(&directory);
    if new_key_path.exists() && !args.force {
        bail!("{} exists; use -f to overwrite it", new_key_path.display());
    }

    let mut rrset = Rrset::new(
        (*record.owner).to_owned(),
        record.class,
        Type::DNSKEY,
        record.ttl,
    );
    rrset.push_rdata(
        revoked_wire
            .as_slice()
            .try_into()
            .map_err(|_| anyhow!("revoked DNSKEY RDATA is too long"))?,
    );
    let style = Style {
        comments: true,
        ..Style::full()
    };
    let mut text = String::new();
    rdataset_to_text(&rrset, &style, None, &mut text);
    fs::write(&new_key_path, text)
        .with_context(|| format!("failed to write {}", new_key_path.display()))?;

    // The private file's contents do not name the key, so the revoked
    // pair can reuse them as they are.
    let old_private_path = old_name.private_path(&directory);
    if old_private_path.exists() {
        let new_private_path = new_name.private_path(&directory);
        if new_private_path.exists() && !args.force {
            bail!(
                "{} exists; use -f to overwrite it",
                new_private_path.display()
            );
        }
        fs::copy(&old_private_path, &new_private_path).with_context(|| {
            format!("failed to write {}", new_private_path.display())
        })?;
    }

    if args.remove && new_tag != old_name.key_tag {
        fs::remove_file(&old_key_path)
            .with_context(|| format!("failed to remove {}", old_key_path.display()))?;
        if old_private_path.exists() {
            fs::remove_file(&old_private_path)
                .with_context(|| format!("failed to remove {}", old_private_path.display()))?;
        }
    }

    println!("{}", new_name);
    Ok(())
}
