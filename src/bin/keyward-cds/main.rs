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

//! The `keyward-cds` tool: computes a parent zone's DS RRset from a
//! child zone's CDS or CDNSKEY RRset ([RFC 7344]), after checking that
//! the child records are properly signed under the DS RRset currently
//! published.
//!
//! [RFC 7344]: https://datatracker.ietf.org/doc/html/rfc7344

mod args;

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, SystemTime};

use anyhow::{anyhow, bail, Context, Result};
use env_logger::Env;
use log::{error, info, warn};

use keyward::class::Class;
use keyward::db::Db;
use keyward::diff::nsupdate;
use keyward::dnssec::ds::{make_ds_set, DsSource};
use keyward::dnssec::{
    consistent_digests, match_keyset_dsset, matching_sigs, signed_loose, signed_strict,
    SigContext, Strictness,
};
use keyward::master::{self, rdataset_to_text, DumpOptions, Format, Style};
use keyward::name::Name;
use keyward::rr::rdata::{digest, SigTime};
use keyward::rr::{Rrset, Ttl, Type};

use crate::args::Args;

fn main() {
    let args = args::parse();
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
    let class: Class = args
        .class
        .parse()
        .map_err(|_| anyhow!("invalid class {}", args.class))?;
    let domain = parse_absolute_name(&args.domain)?;
    let mut digests = if args.digests.is_empty() {
        vec![digest::SHA256]
    } else {
        args.digests.clone()
    };
    digests.dedup();

    // The old DS RRset. Its file's modification time is the default
    // replay floor: signatures from before the last run prove nothing.
    let ds_path = resolve_ds_path(&args.ds_path, &domain);
    let mut parent_db = Db::new(class, domain.clone());
    parent_db
        .load(&ds_path, Format::Text)
        .with_context(|| format!("failed to load DS records from {}", ds_path.display()))?;
    let old_ds = find_rrset(&parent_db, &domain, Type::DS, Type::from(0))
        .ok_or_else(|| anyhow!("no DS records found in {}", ds_path.display()))?;

    let mtime = file_mtime(&ds_path)?;
    let notbefore = match &args.start {
        Some(text) => parse_start_time(text, mtime)?,
        None => mtime,
    };
    let ttl = args.ttl.unwrap_or(old_ds.ttl);

    // The child's records, all from one file.
    let mut child_db = Db::new(class, domain.clone());
    child_db
        .load(&args.child_file, Format::Text)
        .with_context(|| format!("failed to load {}", args.child_file.display()))?;
    let dnskey = find_rrset(&child_db, &domain, Type::DNSKEY, Type::from(0))
        .ok_or_else(|| anyhow!("could not find DNSKEY records for {}", domain))?;
    let dnskey_sigs = find_rrset(&child_db, &domain, Type::RRSIG, Type::DNSKEY)
        .ok_or_else(|| anyhow!("DNSKEY records for {} are not signed", domain))?;
    let cds = find_rrset(&child_db, &domain, Type::CDS, Type::from(0));
    let cds_sigs = find_rrset(&child_db, &domain, Type::RRSIG, Type::CDS);
    let cdnskey = find_rrset(&child_db, &domain, Type::CDNSKEY, Type::from(0));
    let cdnskey_sigs = find_rrset(&child_db, &domain, Type::RRSIG, Type::CDNSKEY);
    if cds.is_some() && cds_sigs.is_none() {
        bail!("CDS records for {} are not signed", domain);
    }
    if cdnskey.is_some() && cdnskey_sigs.is_none() {
        bail!("CDNSKEY records for {} are not signed", domain);
    }

    // Prove the child records authentic under the currently published
    // DS RRset.
    let mut context = SigContext::new(notbefore);
    let keytable = match_keyset_dsset(&domain, &dnskey, &old_ds, Strictness::Loose)?;
    let algo = matching_sigs(&mut context, &keytable, &dnskey, &dnskey_sigs)?;
    if !signed_loose(&algo) {
        bail!("could not validate child DNSKEY RRset for {}", domain);
    }
    if let (Some(cds), Some(sigs)) = (&cds, &cds_sigs) {
        let algo = matching_sigs(&mut context, &keytable, cds, sigs)?;
        if !signed_loose(&algo) {
            bail!("could not validate child CDS RRset for {}", domain);
        }
    }
    if let (Some(cdnskey), Some(sigs)) = (&cdnskey, &cdnskey_sigs) {
        let algo = matching_sigs(&mut context, &keytable, cdnskey, sigs)?;
        if !signed_loose(&algo) {
            bail!("could not validate child CDNSKEY RRset for {}", domain);
        }
    }

    if cds.is_none() && cdnskey.is_none() {
        info!(
            "no CDS or CDNSKEY records found for {}; DS records are unchanged",
            domain
        );
        return write_parent_set(&ds_path, &old_ds, &args, context.oldest_sig);
    }

    let new_ds = synthesize(&cds, &cdnskey, &args, &domain, &digests, ttl)?;

    // The new DS RRset must be internally consistent and must not
    // orphan any of its algorithms.
    let tight = match_keyset_dsset(&domain, &dnskey, &new_ds, Strictness::Tight)?;
    if !consistent_digests(&new_ds)? {
        bail!(
            "CDS records at {} do not cover each key with the same set of digest types",
            domain
        );
    }
    let algo = matching_sigs(&mut context, &tight, &dnskey, &dnskey_sigs)?;
    if !signed_strict(&new_ds, &algo)? {
        bail!(
            "could not validate child DNSKEY RRset with new DS records for {}",
            domain
        );
    }

    if args.nsupdate {
        let stdout = io::stdout();
        nsupdate::emit_script(ttl, &old_ds, &new_ds, args.verbosity, &mut stdout.lock())
            .context("failed to write nsupdate script")?;
    }
    write_parent_set(&ds_path, &new_ds, &args, context.oldest_sig)
}

/// Parses a domain name, supplying the trailing dot if it is missing.
fn parse_absolute_name(text: &str) -> Result<Box<Name>> {
    let absolute = if text.ends_with('.') {
        text.to_owned()
    } else {
        format!("{}.", text)
    };
    absolute
        .parse()
        .map_err(|e| anyhow!("invalid domain name {}: {}", text, e))
}

/// When `-d` names a directory, the DS file inside it is `dsset-`
/// followed by the zone name.
fn resolve_ds_path(ds_path: &Path, domain: &Name) -> PathBuf {
    if ds_path.is_dir() {
        ds_path.join(format!("dsset-{}", domain.to_filename()))
    } else {
        ds_path.to_owned()
    }
}

fn find_rrset(db: &Db, name: &Name, rr_type: Type, covers: Type) -> Option<Rrset> {
    let node = db.find_node(None, name)?;
    db.find_rdataset(None, node, rr_type, covers)
}

fn file_mtime(path: &Path) -> Result<u32> {
    let modified = fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .with_context(|| format!("failed to read modification time of {}", path.display()))?;
    Ok(modified
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|since| since.as_secs() as u32)
        .unwrap_or(0))
}

/// Parses a `-s` argument. A leading `+` or `-` offsets the DS file's
/// modification time by that duration (seconds, or with `w`/`d`/`h`/
/// `m`/`s` units); anything else is an absolute time.
fn parse_start_time(text: &str, mtime: u32) -> Result<u32> {
    if let Some(rest) = text.strip_prefix('+') {
        let offset: Ttl = rest
            .parse()
            .map_err(|_| anyhow!("invalid start time offset {}", text))?;
        Ok(mtime.wrapping_add(offset.into()))
    } else if let Some(rest) = text.strip_prefix('-') {
        let offset: Ttl = rest
            .parse()
            .map_err(|_| anyhow!("invalid start time offset {}", text))?;
        Ok(mtime.wrapping_sub(offset.into()))
    } else {
        SigTime::parse(text)
            .map(|time| time.0)
            .map_err(|e| anyhow!("invalid start time {}: {}", text, e))
    }
}

/// Synthesizes the new DS RRset, falling back from CDS to CDNSKEY when
/// the CDS records offer none of the requested digest types.
fn synthesize(
    cds: &Option<Rrset>,
    cdnskey: &Option<Rrset>,
    args: &Args,
    domain: &Name,
    digests: &[u8],
    ttl: Ttl,
) -> Result<Rrset> {
    let new_ds = match (cds, cdnskey) {
        (Some(cds), cdnskey) if !(args.prefer_cdnskey && cdnskey.is_some()) => {
            let synthesized = make_ds_set(cds, DsSource::Cds, digests, ttl)?;
            match (synthesized.is_empty(), cdnskey) {
                (true, Some(cdnskey)) => {
                    warn!("CDS records have no allowed digest types; using CDNSKEY instead");
                    make_ds_set(cdnskey, DsSource::Cdnskey, digests, ttl)?
                }
                _ => synthesized,
            }
        }
        (_, Some(cdnskey)) => make_ds_set(cdnskey, DsSource::Cdnskey, digests, ttl)?,
        (None, None) => bail!("no CDS or CDNSKEY records found for {}", domain),
        // When cdnskey is None, the first arm's guard is always true,
        // so this case can never be reached; the exhaustiveness
        // checker just cannot see through the guard.
        (Some(_), None) => unreachable!(),
    };
    if new_ds.is_empty() {
        bail!("CDS records at {} do not match any -a digest types", domain);
    }
    Ok(new_ds)
}

/// Writes the DS RRset where the options say it goes: nowhere when an
/// nsupdate script was requested without `-i`, to standard output
/// without `-i`, and otherwise atomically over the DS file with its
/// modification time set to the oldest verified signature's inception
/// (the replay floor for the next run).
fn write_parent_set(path: &Path, rrset: &Rrset, args: &Args, oldest_sig: u32) -> Result<()> {
    if args.nsupdate && args.inplace.is_none() {
        return Ok(());
    }
    let Some(suffix) = &args.inplace else {
        let mut text = String::new();
        rdataset_to_text(rrset, &Style::full(), None, &mut text);
        print!("{}", text);
        return Ok(());
    };

    if !suffix.is_empty() {
        let mut backup = path.as_os_str().to_os_string();
        backup.push(suffix);
        fs::copy(path, PathBuf::from(backup))
            .with_context(|| format!("failed to back up {}", path.display()))?;
    }

    let mut db = Db::new(rrset.class, rrset.owner.clone());
    stage_rrset(&mut db, rrset).context("failed to stage DS records")?;
    let options = DumpOptions {
        style: Style::full(),
        mtime: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(oldest_sig as u64)),
        ..Default::default()
    };
    master::dump_to_file(&db, None, &options, path)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn stage_rrset(db: &mut Db, rrset: &Rrset) -> Result<()> {
    let version = db.new_version()?;
    let node = db
        .find_node_mut(&version, &rrset.owner, true)?
        .ok_or_else(|| anyhow!("could not create node for {}", rrset.owner))?;
    db.add_rdataset(&version, node, rrset, Default::default())?;
    db.close_version(version, true);
    Ok(())
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    use keyward::rr::rdata::{algorithm, serialize_dnskey, serialize_ds, Ds};

    use super::*;

    fn test_args() -> Args {
        Args {
            child_file: PathBuf::new(),
            ds_path: PathBuf::new(),
            digests: Vec::new(),
            class: "IN".to_owned(),
            prefer_cdnskey: false,
            inplace: None,
            start: None,
            nsupdate: false,
            ttl: None,
            verbosity: 0,
            domain: String::new(),
        }
    }

    fn owner() -> Box<Name> {
        "example.test.".parse().unwrap()
    }

    fn cds_rrset(digest_type: u8, digest: &[u8]) -> Rrset {
        let mut rdata = Vec::new();
        serialize_ds(2371, algorithm::ECDSAP256SHA256, digest_type, digest, &mut rdata);
        let mut rrset = Rrset::new(owner(), Class::IN, Type::CDS, Ttl::from(3600));
        rrset.push_rdata(rdata.as_slice().try_into().unwrap());
        rrset
    }

    fn cdnskey_rrset() -> Rrset {
        let key = STANDARD
            .decode(
                "mdsswUyr3DPW132mOi8V9xESWE8jTo0dxCjjnopKl+GqJxpVXckHAe\
                 F+KkxLbxILfDLUT0rAK9iUzy1L53eKGQ==",
            )
            .unwrap();
        let mut rdata = Vec::new();
        serialize_dnskey(257, 3, algorithm::ECDSAP256SHA256, &key, &mut rdata);
        let mut rrset = Rrset::new(owner(), Class::IN, Type::CDNSKEY, Ttl::from(3600));
        rrset.push_rdata(rdata.as_slice().try_into().unwrap());
        rrset
    }

    #[test]
    fn synthesis_prefers_cds_records() {
        let cds = cds_rrset(digest::SHA256, &[0xab; 32]);
        let new_ds = synthesize(
            &Some(cds.clone()),
            &Some(cdnskey_rrset()),
            &test_args(),
            &owner(),
            &[digest::SHA256],
            Ttl::from(3600),
        )
        .unwrap();
        assert_eq!(new_ds.rr_type, Type::DS);
        assert_eq!(new_ds.len(), 1);
        let rdata = new_ds.rdatas().iter().next().unwrap();
        assert!(cds
            .rdatas()
            .iter()
            .any(|cds_rdata| cds_rdata.octets() == rdata.octets()));
    }

    #[test]
    fn the_d_flag_prefers_cdnskey_records() {
        let mut args = test_args();
        args.prefer_cdnskey = true;
        let new_ds = synthesize(
            &Some(cds_rrset(digest::SHA256, &[0xab; 32])),
            &Some(cdnskey_rrset()),
            &args,
            &owner(),
            &[digest::SHA256],
            Ttl::from(3600),
        )
        .unwrap();
        assert_eq!(new_ds.len(), 1);
        let rdata = new_ds.rdatas().iter().next().unwrap();
        let ds = Ds::try_from_rdata(rdata).unwrap();
        assert_eq!(ds.key_tag, 2371);
        assert_ne!(ds.digest, &[0xab; 32][..]);
    }

    #[test]
    fn synthesis_falls_back_to_cdnskey_when_no_cds_digest_is_allowed() {
        let new_ds = synthesize(
            &Some(cds_rrset(digest::SHA1, &[0xab; 20])),
            &Some(cdnskey_rrset()),
            &test_args(),
            &owner(),
            &[digest::SHA256],
            Ttl::from(3600),
        )
        .unwrap();
        assert_eq!(new_ds.len(), 1);
        let rdata = new_ds.rdatas().iter().next().unwrap();
        let ds = Ds::try_from_rdata(rdata).unwrap();
        assert_eq!(ds.key_tag, 2371);
        assert_eq!(ds.digest_type, digest::SHA256);
    }

    #[test]
    fn synthesis_fails_with_nothing_to_fall_back_on() {
        assert!(synthesize(
            &Some(cds_rrset(digest::SHA1, &[0xab; 20])),
            &None,
            &test_args(),
            &owner(),
            &[digest::SHA256],
            Ttl::from(3600),
        )
        .is_err());
    }

    #[test]
    fn start_times_may_be_relative_or_absolute() {
        assert_eq!(parse_start_time("+30", 1000).unwrap(), 1030);
        assert_eq!(parse_start_time("-30", 1000).unwrap(), 970);
        assert_eq!(parse_start_time("+1h30m", 1000).unwrap(), 6400);
        assert_eq!(parse_start_time("-1d", 100_000).unwrap(), 13_600);
        assert_eq!(parse_start_time("1555130494", 0).unwrap(), 1555130494);
        assert_eq!(parse_start_time("20190413050134", 0).unwrap(), 1555131694);
        assert!(parse_start_time("+soon", 1000).is_err());
    }

    #[test]
    fn domain_names_get_a_trailing_dot() {
        assert_eq!(
            parse_absolute_name("example.test").unwrap(),
            parse_absolute_name("example.test.").unwrap()
        );
        assert!(parse_absolute_name("bad..name").is_err());
    }

    #[test]
    fn directories_resolve_to_dsset_files() {
        assert_eq!(
            resolve_ds_path(Path::new("/nonexistent/dsset-file"), &owner()),
            Path::new("/nonexistent/dsset-file")
        );
        let resolved = resolve_ds_path(Path::new("."), &owner());
        assert_eq!(resolved, Path::new("./dsset-example.test."));
    }
}
