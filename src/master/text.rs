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

//! Text (presentation-format) masterfile output.

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::db::{Db, Version};
use crate::name::Name;
use crate::rr::rdata::{key_tag_of_wire, Dnskey, Presentation, SigTime};
use crate::rr::{Rrset, Ttl, Type};

////////////////////////////////////////////////////////////////////////
// STYLES                                                             //
////////////////////////////////////////////////////////////////////////

/// Controls the layout and annotations of text masterfile output.
#[derive(Clone, Debug)]
pub struct Style {
    /// Emit `$TTL` directives and omit per-record TTLs that match the
    /// current directive.
    pub ttl_directive: bool,

    /// Never print the class field.
    pub omit_class: bool,

    /// Never print the TTL field. (Ignored when `ttl_directive` is
    /// set, which implies it.)
    pub omit_ttl: bool,

    /// Print owner names relative to the origin where possible.
    pub relative_names: bool,

    /// Print RRsets with more than one record across multiple lines
    /// with parentheses.
    pub multiline: bool,

    /// Append explanatory comments to records that have them (key
    /// tags for DNSKEY records).
    pub comments: bool,

    /// Precede RRSIG RRsets with a comment giving their recorded
    /// re-signing time.
    pub resign_comments: bool,

    /// Precede each RRset with a comment giving its trust level.
    pub trust_annotations: bool,

    /// Expand negative-cache RRsets into comments showing their
    /// embedded records. When clear, negative-cache RRsets are
    /// summarized in a single comment.
    pub expanded_ncache: bool,

    /// Emit each record as an item of a YAML list of strings instead
    /// of masterfile lines. Directives and comments are suppressed.
    pub yaml: bool,

    /// Pad the owner field to this width.
    pub owner_column: usize,

    /// Wrap records longer than this in parentheses, splitting the
    /// RDATA across continuation lines. Zero disables wrapping.
    pub line_length: usize,
}

impl Default for Style {
    /// The default zone-dump style: `$TTL` directives, explicit
    /// classes, one line per record.
    fn default() -> Self {
        Self {
            ttl_directive: true,
            omit_class: false,
            omit_ttl: false,
            relative_names: false,
            multiline: false,
            comments: true,
            resign_comments: false,
            trust_annotations: false,
            expanded_ncache: false,
            yaml: false,
            owner_column: 24,
            line_length: 80,
        }
    }
}

impl Style {
    /// A fully explicit style: every field on every line, no
    /// directives, no comments, no wrapping. Used for diff output and
    /// for `dsset-` files, which are re-read line by line.
    pub fn full() -> Self {
        Self {
            ttl_directive: false,
            comments: false,
            owner_column: 0,
            line_length: 0,
            ..Self::default()
        }
    }
}

////////////////////////////////////////////////////////////////////////
// DUMPING                                                            //
////////////////////////////////////////////////////////////////////////

/// Writes the given state of `db` as a text masterfile.
pub fn dump_text(
    db: &Db,
    version: Option<&Version>,
    style: &Style,
    out: &mut impl Write,
) -> io::Result<()> {
    let origin = style.relative_names.then(|| db.origin().to_owned());
    let mut current_ttl = None;
    let mut buf = String::new();
    for rrset in db.rrsets(version) {
        buf.clear();
        if style.ttl_directive && !style.yaml && current_ttl != Some(rrset.ttl) {
            let _ = writeln!(buf, "$TTL {}", u32::from(rrset.ttl));
            current_ttl = Some(rrset.ttl);
        }
        if style.resign_comments && rrset.rr_type == Type::RRSIG {
            let resign = db
                .find_node(version, &rrset.owner)
                .and_then(|node| db.resign_time(version, node, rrset.covers));
            if let Some(resign) = resign {
                let _ = writeln!(buf, "; resign={}", SigTime(resign));
            }
        }
        rdataset_to_text(&rrset, style, origin.as_deref(), &mut buf);
        out.write_all(buf.as_bytes())?;
    }
    Ok(())
}

/// Formats one RRset in the given style, appending complete lines
/// (with trailing newlines) to `out`. Owner names are printed relative
/// to `origin` when the style asks for relative names.
pub fn rdataset_to_text(rrset: &Rrset, style: &Style, origin: Option<&Name>, out: &mut String) {
    if style.yaml {
        if !rrset.negative {
            yaml_rrset_to_text(rrset, style, origin, out);
        }
        return;
    }
    if style.trust_annotations {
        let _ = writeln!(out, "; trust {}", rrset.trust);
    }
    if rrset.negative {
        negative_rrset_to_text(rrset, style, out);
        return;
    }
    if style.multiline && rrset.len() > 1 {
        multiline_rrset_to_text(rrset, style, origin, out);
        return;
    }
    for rdata in rrset.rdatas().iter() {
        let start = out.len();
        write_owner(rrset, style, origin, out);
        write_middle_fields(rrset, style, out);
        let rdata_text = Presentation::new(rrset.rr_type, rdata).to_string();
        if style.line_length > 0 && out.len() - start + rdata_text.len() > style.line_length {
            write_wrapped_rdata(&rdata_text, style, out);
        } else {
            out.push_str(&rdata_text);
        }
        write_comment(rrset.rr_type, rdata, style, out);
        out.push('\n');
    }
}

/// Writes RDATA text in parentheses, breaking it across continuation
/// lines so none exceeds the style's line length. Fields too long for
/// one line (base64 keys, hex digests) are split; the parser
/// reassembles split data fields.
fn write_wrapped_rdata(rdata_text: &str, style: &Style, out: &mut String) {
    const INDENT: &str = "\t\t";
    const INDENT_COLUMNS: usize = 16;
    let width = style.line_length.saturating_sub(INDENT_COLUMNS).max(16);
    out.push('(');
    let mut column = width;
    for field in rdata_text.split_ascii_whitespace() {
        let mut rest = field;
        loop {
            if column >= width {
                out.push('\n');
                out.push_str(INDENT);
                column = 0;
            } else {
                out.push(' ');
                column += 1;
            }
            let take = rest.len().min(width - column);
            let (chunk, tail) = rest.split_at(take);
            out.push_str(chunk);
            column += take;
            rest = tail;
            if rest.is_empty() {
                break;
            }
        }
    }
    out.push_str(" )");
}

/// Formats an RRset as items of a YAML list of record strings.
fn yaml_rrset_to_text(rrset: &Rrset, style: &Style, origin: Option<&Name>, out: &mut String) {
    let mut line = String::new();
    for rdata in rrset.rdatas().iter() {
        line.clear();
        write_owner(rrset, style, origin, &mut line);
        let _ = write!(
            line,
            "{} {} {} {}",
            u32::from(rrset.ttl),
            rrset.class,
            rrset.rr_type,
            Presentation::new(rrset.rr_type, rdata),
        );
        let _ = writeln!(
            out,
            "- \"{}\"",
            line.replace('\\', "\\\\").replace('"', "\\\""),
        );
    }
}

fn multiline_rrset_to_text(rrset: &Rrset, style: &Style, origin: Option<&Name>, out: &mut String) {
    write_owner(rrset, style, origin, out);
    write_middle_fields(rrset, style, out);
    out.push('(');
    out.push('\n');
    let count = rrset.len();
    for (i, rdata) in rrset.rdatas().iter().enumerate() {
        let _ = write!(out, "\t\t{}", Presentation::new(rrset.rr_type, rdata));
        write_comment(rrset.rr_type, rdata, style, out);
        if i + 1 == count {
            out.push_str(" )");
        }
        out.push('\n');
    }
}

/// Formats a negative-cache RRset. Its single rdata is an
/// [`crate::ncache`] blob; when the style asks for it, the embedded
/// records are expanded into comments.
fn negative_rrset_to_text(rrset: &Rrset, style: &Style, out: &mut String) {
    if !style.expanded_ncache {
        let _ = writeln!(
            out,
            "; {} ; negative ({})",
            rrset.owner,
            if rrset.nxdomain { "NXDOMAIN" } else { "NODATA" },
        );
        return;
    }
    for record in crate::ncache::records(rrset) {
        match record {
            Ok(record) => {
                for rdata in record.iter() {
                    let _ = writeln!(
                        out,
                        "; {} {} {} {}",
                        record.name,
                        u32::from(rrset.ttl),
                        record.rr_type,
                        Presentation::new(record.rr_type, rdata),
                    );
                }
            }
            Err(_) => {
                let _ = writeln!(out, "; <corrupt negative-cache entry>");
                return;
            }
        }
    }
}

fn write_owner(rrset: &Rrset, style: &Style, origin: Option<&Name>, out: &mut String) {
    let start = out.len();
    match origin {
        Some(origin) if style.relative_names && rrset.owner.eq_or_subdomain_of(origin) => {
            if rrset.owner.len() == origin.len() {
                out.push('@');
            } else {
                let relative_labels = rrset.owner.len() - origin.len();
                for (i, label) in rrset.owner.labels().take(relative_labels).enumerate() {
                    if i > 0 {
                        out.push('.');
                    }
                    let _ = write!(out, "{}", label);
                }
            }
        }
        _ => {
            let _ = write!(out, "{}", rrset.owner);
        }
    }
    let written = out.len() - start;
    if written < style.owner_column {
        for _ in written..style.owner_column {
            out.push(' ');
        }
    }
    out.push(' ');
}

fn write_middle_fields(rrset: &Rrset, style: &Style, out: &mut String) {
    if !style.ttl_directive && !style.omit_ttl {
        let _ = write!(out, "{} ", u32::from(rrset.ttl));
    }
    if !style.omit_class {
        let _ = write!(out, "{} ", rrset.class);
    }
    let _ = write!(out, "{} ", rrset.rr_type);
}

/// Appends the explanatory comment for a record, if the style asks for
/// comments and the type has one.
fn write_comment(rr_type: Type, rdata: &crate::rr::Rdata, style: &Style, out: &mut String) {
    if !style.comments || !matches!(rr_type, Type::DNSKEY | Type::CDNSKEY) {
        return;
    }
    if let Ok(dnskey) = Dnskey::try_from_rdata(rdata) {
        let role = if dnskey.is_sep() { "KSK" } else { "ZSK" };
        let tag = key_tag_of_wire(rdata, dnskey.algorithm);
        let _ = write!(out, " ; {} ; key id = {}", role, tag);
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
