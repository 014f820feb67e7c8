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

//! Emission of DS changes as an `nsupdate` script.
//!
//! [`emit_script`] turns an old and a new DS RRset into `update add`
//! and `update del` commands followed by `send`, so that the parent
//! zone can be brought up to date with UPDATE ([RFC 2136]) instead of
//! a file rewrite.
//!
//! [RFC 2136]: https://datatracker.ietf.org/doc/html/rfc2136

use std::io::{self, Write};

use log::warn;

use super::Result;
use crate::db::{AddOptions, Db, SubtractOptions, SubtractOutcome};
use crate::master::{rdataset_to_text, Style};
use crate::rr::{Rrset, Ttl};

/// Writes the `nsupdate` commands that transform `old_set` into
/// `new_set`, ending with `send` (preceded by `show` and followed by
/// `answer` when `verbosity` is positive). `ttl` is the TTL the added
/// records are printed with; deletions are printed without one.
pub fn emit_script(
    ttl: Ttl,
    old_set: &Rrset,
    new_set: &Rrset,
    verbosity: u32,
    out: &mut impl Write,
) -> Result<()> {
    if u32::from(ttl) == 0 && verbosity >= 1 {
        warn!("no TTL in nsupdate script");
    }
    update_diff("add", ttl, new_set, old_set, out)?;
    update_diff("del", Ttl::from(0), old_set, new_set, out)?;
    if verbosity > 0 {
        out.write_all(b"show\nsend\nanswer\n")?;
    } else {
        out.write_all(b"send\n")?;
    }
    Ok(())
}

/// Prints the records of `addset` not present in `delset` as
/// `update <cmd>` lines, using a transient single-node database to
/// compute the difference.
///
/// When subtraction leaves `addset` untouched (the sets are disjoint),
/// the whole of `addset` is printed with its TTL replaced by `ttl` —
/// even a record that was present in `delset` at a different TTL only
/// gets restated here, not deleted.
fn update_diff(
    cmd: &str,
    ttl: Ttl,
    addset: &Rrset,
    delset: &Rrset,
    out: &mut impl Write,
) -> Result<()> {
    let mut db = Db::new(addset.class, addset.owner.clone());
    let version = db.new_version()?;
    let node = match db.find_node_mut(&version, &addset.owner, true)? {
        Some(node) => node,
        None => return Ok(()),
    };
    db.add_rdataset(
        &version,
        node,
        addset,
        AddOptions {
            merge: true,
            ..AddOptions::default()
        },
    )?;
    match db.subtract_rdataset(&version, node, delset, SubtractOptions::default())? {
        SubtractOutcome::Removed(mut difference) => {
            difference.ttl = ttl;
            print_diff(cmd, &difference, out)?;
        }
        SubtractOutcome::NxRrset(_) => (),
        SubtractOutcome::Unchanged(_) => {
            let mut restated = addset.clone();
            restated.ttl = ttl;
            print_diff(cmd, &restated, out)?;
        }
    }
    db.close_version(version, false);
    Ok(())
}

fn print_diff(cmd: &str, rrset: &Rrset, out: &mut impl Write) -> io::Result<()> {
    let style = Style {
        omit_ttl: u32::from(rrset.ttl) == 0,
        ..Style::full()
    };
    let mut text = String::new();
    rdataset_to_text(rrset, &style, None, &mut text);
    for line in text.lines() {
        writeln!(out, "update {} {}", cmd, line)?;
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;
    use crate::rr::rdata::serialize_ds;
    use crate::rr::{Rdata, Type};

    fn ds_rrset(ttl: u32, key_tags: &[u16]) -> Rrset {
        let mut rrset = Rrset::new(
            "example.test.".parse().unwrap(),
            Class::IN,
            Type::DS,
            Ttl::from(ttl),
        );
        for &key_tag in key_tags {
            let mut rdata = Vec::new();
            serialize_ds(key_tag, 13, 2, &[0xcd; 32], &mut rdata);
            rrset.push_rdata(<&Rdata>::try_from(&rdata[..]).unwrap());
        }
        rrset
    }

    fn script(ttl: u32, old: &Rrset, new: &Rrset, verbosity: u32) -> String {
        let mut out = Vec::new();
        emit_script(Ttl::from(ttl), old, new, verbosity, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn added_keys_produce_add_lines_only() {
        let old = ds_rrset(3600, &[10000]);
        let new = ds_rrset(3600, &[10000, 20000]);
        let text = script(3600, &old, &new, 0);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("update add example.test. 3600 IN DS 20000 "));
        assert_eq!(lines[1], "send");
    }

    #[test]
    fn removed_keys_produce_del_lines_without_ttl() {
        let old = ds_rrset(3600, &[10000, 20000]);
        let new = ds_rrset(3600, &[10000]);
        let text = script(3600, &old, &new, 0);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("update del example.test. IN DS 20000 "));
        assert_eq!(lines[1], "send");
    }

    #[test]
    fn identical_sets_produce_only_send() {
        let old = ds_rrset(3600, &[10000]);
        let new = ds_rrset(3600, &[10000]);
        assert_eq!(script(3600, &old, &new, 0), "send\n");
    }

    #[test]
    fn disjoint_sets_restate_everything() {
        // With no overlap, subtraction leaves each side untouched and
        // the whole of each set is printed.
        let old = ds_rrset(3600, &[10000]);
        let new = ds_rrset(3600, &[20000]);
        let text = script(7200, &old, &new, 0);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("update add example.test. 7200 IN DS 20000 "));
        assert!(lines[1].starts_with("update del example.test. IN DS 10000 "));
        assert_eq!(lines[2], "send");
    }

    #[test]
    fn ttl_only_changes_emit_nothing() {
        // Subtraction compares RDATA, not TTLs, so a record whose TTL
        // changed still cancels out and no update lines are printed.
        let old = ds_rrset(300, &[10000]);
        let new = ds_rrset(3600, &[10000]);
        assert_eq!(script(3600, &old, &new, 0), "send\n");
    }

    #[test]
    fn verbose_scripts_show_the_update_and_answer() {
        let old = ds_rrset(3600, &[10000]);
        let new = ds_rrset(3600, &[10000]);
        assert_eq!(script(3600, &old, &new, 1), "show\nsend\nanswer\n");
    }
}
