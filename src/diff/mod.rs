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

//! Zone differences.
//!
//! A [`Diff`] is an ordered list of [`DiffTuple`]s, each pairing an
//! [`Op`] with a single record. Applying a diff to a [`Db`] performs
//! the described changes exactly: additions must be new data and
//! deletions must name existing data, so applying the same diff twice
//! fails rather than silently converging.

use std::cmp::Ordering;
use std::fmt;
use std::io::{self, Write};

use log::{error, warn};

use crate::class::Class;
use crate::db::{
    self, covers_of, AddOptions, AddOutcome, Db, SubtractOptions, SubtractOutcome, Version,
};
use crate::master::{rdataset_to_text, Style};
use crate::name::Name;
use crate::rr::rdata::Rrsig;
use crate::rr::{Rdata, Rrset, Ttl, Type};

pub mod nsupdate;

////////////////////////////////////////////////////////////////////////
// OPERATIONS AND TUPLES                                              //
////////////////////////////////////////////////////////////////////////

/// The operation a [`DiffTuple`] performs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Op {
    /// Asserts that the record exists; never applied to a [`Db`].
    Exists,

    Add,
    Del,

    /// Like [`Op::Add`], but also records the re-signing time of the
    /// added RRSIG RRset.
    AddResign,

    /// Like [`Op::Del`], but also updates the re-signing time from the
    /// remaining RRSIG RRset.
    DelResign,
}

impl Op {
    fn is_add(self) -> bool {
        matches!(self, Self::Add | Self::AddResign)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Exists => "exists",
            Self::Add => "add",
            Self::Del => "del",
            Self::AddResign => "add re-sign",
            Self::DelResign => "del re-sign",
        })
    }
}

/// One record of a [`Diff`].
#[derive(Clone, Debug)]
pub struct DiffTuple {
    pub op: Op,
    pub name: Box<Name>,
    pub class: Class,
    pub rr_type: Type,
    pub ttl: Ttl,
    pub rdata: Box<Rdata>,
}

impl DiffTuple {
    pub fn new(
        op: Op,
        name: Box<Name>,
        class: Class,
        rr_type: Type,
        ttl: Ttl,
        rdata: Box<Rdata>,
    ) -> Self {
        Self {
            op,
            name,
            class,
            rr_type,
            ttl,
            rdata,
        }
    }

    /// The type this tuple's record covers (for RRSIGs; zero
    /// otherwise).
    pub fn covers(&self) -> Type {
        covers_of(self.rr_type, &self.rdata)
    }

    /// Whether this tuple names the same record as `other` (same owner,
    /// compared case-insensitively, class, type, TTL, and RDATA),
    /// regardless of operation.
    fn same_record(&self, other: &Self) -> bool {
        self.name == other.name
            && self.class == other.class
            && self.rr_type == other.rr_type
            && self.ttl == other.ttl
            && self.rdata.equals(&other.rdata, self.rr_type)
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// Errors that may occur applying a [`Diff`].
#[derive(Debug)]
pub enum Error {
    Db(db::Error),
    Io(io::Error),

    /// The diff contains a tuple whose operation cannot be applied to
    /// a database (an [`Op::Exists`] assertion).
    UnexpectedOp(Op),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Db(e) => e.fmt(f),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::UnexpectedOp(op) => write!(f, "diff contains an inapplicable operation: {}", op),
        }
    }
}

impl std::error::Error for Error {}

impl From<db::Error> for Error {
    fn from(e: db::Error) -> Self {
        Self::Db(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// A result type for [`Diff`] operations.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// DIFFS                                                              //
////////////////////////////////////////////////////////////////////////

/// An ordered list of changes to a zone.
#[derive(Clone, Debug, Default)]
pub struct Diff {
    tuples: Vec<DiffTuple>,
}

impl Diff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn clear(&mut self) {
        self.tuples.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiffTuple> {
        self.tuples.iter()
    }

    /// Appends a tuple unconditionally.
    pub fn append(&mut self, tuple: DiffTuple) {
        self.tuples.push(tuple);
    }

    /// Appends one tuple per record of `rrset`.
    pub fn append_rrset(&mut self, op: Op, rrset: &Rrset) {
        for rdata in rrset.rdatas().iter() {
            self.append(DiffTuple::new(
                op,
                rrset.owner.clone(),
                rrset.class,
                rrset.rr_type,
                rrset.ttl,
                rdata.to_owned(),
            ));
        }
    }

    /// Appends a tuple, keeping the diff minimal: if an existing tuple
    /// names the same record with the opposite operation, the two
    /// cancel and both are dropped. An existing tuple with the *same*
    /// operation indicates a caller bug; it is removed and reported,
    /// and the new tuple is appended anyway.
    pub fn append_minimal(&mut self, tuple: DiffTuple) {
        if let Some(i) = self.tuples.iter().position(|ot| ot.same_record(&tuple)) {
            let existing = self.tuples.remove(i);
            if existing.op == tuple.op {
                error!(
                    "unexpected non-minimal diff: '{}/{}/{}'",
                    tuple.name, tuple.rr_type, tuple.class,
                );
            } else {
                return;
            }
        }
        self.tuples.push(tuple);
    }

    /// Sorts the tuples by the given comparator. Tuples that compare
    /// equal keep their relative order.
    pub fn sort_by(&mut self, cmp: impl FnMut(&DiffTuple, &DiffTuple) -> Ordering) {
        self.tuples.sort_by(cmp);
    }

    /// Writes the diff in presentation form, one record per line,
    /// prefixed with its operation.
    pub fn print(&self, out: &mut impl Write) -> io::Result<()> {
        let style = Style::full();
        let mut line = String::new();
        for tuple in &self.tuples {
            line.clear();
            let mut rrset = Rrset::new(tuple.name.clone(), tuple.class, tuple.rr_type, tuple.ttl);
            rrset.covers = tuple.covers();
            rrset.push_rdata(&tuple.rdata);
            rdataset_to_text(&rrset, &style, None, &mut line);
            write!(out, "{} {}", tuple.op, line)?;
        }
        Ok(())
    }

    /// Applies the diff to the open version of `db`, logging a warning
    /// for updates with no effect.
    ///
    /// Owner case flows in both directions: added tuples set the case
    /// the database stores, and deleted tuples are rewritten with the
    /// case that was actually stored, so printing the diff afterwards
    /// shows what was really removed.
    pub fn apply(&mut self, db: &mut Db, version: &Version) -> Result<()> {
        self.do_apply(db, version, true)
    }

    /// Like [`Diff::apply`], but without effect warnings.
    pub fn apply_silently(&mut self, db: &mut Db, version: &Version) -> Result<()> {
        self.do_apply(db, version, false)
    }

    fn do_apply(&mut self, db: &mut Db, version: &Version, warn: bool) -> Result<()> {
        let mut i = 0;
        while i < self.tuples.len() {
            let first = &self.tuples[i];
            if first.op == Op::Exists {
                return Err(Error::UnexpectedOp(first.op));
            }

            // Collect the run of consecutive tuples for the same RRset
            // and operation. The run's TTL is the first tuple's.
            let run_start = i;
            let op = first.op;
            let covers = first.covers();
            let mut rrset = Rrset::new(first.name.clone(), first.class, first.rr_type, first.ttl);
            rrset.covers = covers;
            while let Some(tuple) = self.tuples.get(i) {
                if tuple.op != op
                    || tuple.rr_type != rrset.rr_type
                    || tuple.covers() != covers
                    || tuple.name != rrset.owner
                {
                    break;
                }
                if tuple.ttl != rrset.ttl && warn {
                    warn!(
                        "'{}/{}/{}': TTL differs in rdataset, adjusting {} -> {}",
                        tuple.name,
                        tuple.rr_type,
                        tuple.class,
                        u32::from(tuple.ttl),
                        u32::from(rrset.ttl),
                    );
                }
                rrset.push_rdata(&tuple.rdata);
                i += 1;
            }

            let node = match db.find_node_mut(version, &rrset.owner, true)? {
                Some(node) => node,
                None => continue,
            };
            let result = if op.is_add() {
                let options = AddOptions {
                    merge: true,
                    exact: true,
                    exact_ttl: true,
                };
                db.add_rdataset(version, node, &rrset, options).map(|outcome| {
                    let resulting = match outcome {
                        AddOutcome::Added(resulting) => resulting,
                        AddOutcome::Unchanged(resulting) => {
                            if warn {
                                warn!(
                                    "update with no effect: '{}/{}/{}'",
                                    rrset.owner, rrset.rr_type, rrset.class,
                                );
                            }
                            resulting
                        }
                    };
                    if op == Op::AddResign && rrset.rr_type == Type::RRSIG {
                        Some(resulting)
                    } else {
                        None
                    }
                })
            } else {
                let options = SubtractOptions {
                    exact: true,
                    want_old: true,
                };
                db.subtract_rdataset(version, node, &rrset, options)
                    .map(|outcome| {
                        let remaining = match outcome {
                            SubtractOutcome::Removed(remaining) => Some(remaining),
                            SubtractOutcome::NxRrset(_) => None,
                            SubtractOutcome::Unchanged(unchanged) => {
                                if warn {
                                    warn!(
                                        "update with no effect: '{}/{}/{}'",
                                        rrset.owner, rrset.rr_type, rrset.class,
                                    );
                                }
                                Some(unchanged)
                            }
                        };
                        if op == Op::DelResign && rrset.rr_type == Type::RRSIG {
                            remaining
                        } else {
                            None
                        }
                    })
            };
            match result {
                Ok(resign_source) => {
                    if let Some(sigs) = resign_source {
                        if let Some(when) = earliest_expiration(&sigs) {
                            db.set_resign_time(version, node, covers, when)?;
                        }
                    }
                    if op.is_add() {
                        db.set_owner_case(version, node, &rrset.owner)?;
                    } else {
                        let stored = db.owner_case(Some(version), node);
                        for tuple in &mut self.tuples[run_start..i] {
                            tuple.name = stored.clone();
                        }
                    }
                }
                Err(e) => {
                    error!(
                        "diff apply: {}/{}/{}: {} {}",
                        rrset.owner, rrset.rr_type, rrset.class, op, e,
                    );
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }
}

/// Compares tuples in the default masterfile order: SOA records come
/// first, then NS, then everything else by type number. An RRSIG sorts
/// with the type it covers and immediately after it, so signatures stay
/// adjacent to the data they sign. Tuples that compare equal keep their
/// relative order under [`Diff::sort_by`], which is stable.
pub fn masterfile_order(a: &DiffTuple, b: &DiffTuple) -> Ordering {
    fn key(tuple: &DiffTuple) -> (u8, u16, u8) {
        let (base, sig) = if tuple.rr_type == Type::RRSIG {
            (tuple.covers(), 1)
        } else {
            (tuple.rr_type, 0)
        };
        let rank = match base {
            Type::SOA => 0,
            Type::NS => 1,
            _ => 2,
        };
        (rank, u16::from(base), sig)
    }
    key(a).cmp(&key(b))
}

/// Returns the earliest expiration time over the signatures of an
/// RRSIG RRset.
fn earliest_expiration(sigs: &Rrset) -> Option<u32> {
    sigs.rdatas()
        .iter()
        .filter_map(|rdata| Rrsig::try_from_rdata(rdata).ok())
        .map(|rrsig| rrsig.expiration)
        .min()
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rr::rdata::serialize_rrsig;

    fn a_tuple(op: Op, owner: &str, ttl: u32, address: [u8; 4]) -> DiffTuple {
        DiffTuple::new(
            op,
            owner.parse().unwrap(),
            Class::IN,
            Type::A,
            Ttl::from(ttl),
            <&Rdata>::try_from(&address).unwrap().to_owned(),
        )
    }

    fn rrsig_tuple(op: Op, owner: &str, covers: Type, expiration: u32) -> DiffTuple {
        let mut rdata = Vec::new();
        serialize_rrsig(
            covers,
            13,
            3,
            300,
            expiration,
            expiration - 604_800,
            12345,
            &"example.test.".parse::<Box<Name>>().unwrap(),
            &[0xab; 64],
            &mut rdata,
        );
        DiffTuple::new(
            op,
            owner.parse().unwrap(),
            Class::IN,
            Type::RRSIG,
            Ttl::from(300),
            Box::<Rdata>::try_from(rdata).unwrap(),
        )
    }

    fn fresh_db() -> (Db, Version) {
        let mut db = Db::new(Class::IN, "example.test.".parse().unwrap());
        let version = db.new_version().unwrap();
        (db, version)
    }

    #[test]
    fn append_minimal_cancels_opposite_operations() {
        let mut diff = Diff::new();
        diff.append_minimal(a_tuple(Op::Add, "www.example.test.", 300, [192, 0, 2, 1]));
        diff.append_minimal(a_tuple(Op::Add, "www.example.test.", 300, [192, 0, 2, 2]));
        assert_eq!(diff.len(), 2);

        // Deleting what an earlier tuple adds removes both.
        diff.append_minimal(a_tuple(Op::Del, "WWW.example.test.", 300, [192, 0, 2, 1]));
        assert_eq!(diff.len(), 1);
        assert_eq!(diff.iter().next().unwrap().rdata.octets(), [192, 0, 2, 2]);

        // A differing TTL is a different record; nothing cancels.
        diff.append_minimal(a_tuple(Op::Del, "www.example.test.", 600, [192, 0, 2, 2]));
        assert_eq!(diff.len(), 2);
    }

    #[test]
    fn append_minimal_replaces_same_operation_duplicates() {
        let mut diff = Diff::new();
        diff.append_minimal(a_tuple(Op::Add, "www.example.test.", 300, [192, 0, 2, 1]));
        diff.append_minimal(a_tuple(Op::Add, "www.example.test.", 300, [192, 0, 2, 1]));
        assert_eq!(diff.len(), 1);
    }

    #[test]
    fn apply_adds_and_deletes_records() {
        let (mut db, version) = fresh_db();
        let mut diff = Diff::new();
        diff.append(a_tuple(Op::Add, "www.example.test.", 300, [192, 0, 2, 1]));
        diff.append(a_tuple(Op::Add, "www.example.test.", 300, [192, 0, 2, 2]));
        diff.apply(&mut db, &version).unwrap();

        let owner: Box<Name> = "www.example.test.".parse().unwrap();
        let node = db.find_node(Some(&version), &owner).unwrap();
        let rrset = db
            .find_rdataset(Some(&version), node, Type::A, Type::from(0))
            .unwrap();
        assert_eq!(rrset.len(), 2);

        let mut removal = Diff::new();
        removal.append(a_tuple(Op::Del, "www.example.test.", 300, [192, 0, 2, 1]));
        removal.apply(&mut db, &version).unwrap();
        let rrset = db
            .find_rdataset(Some(&version), node, Type::A, Type::from(0))
            .unwrap();
        assert_eq!(rrset.len(), 1);
    }

    #[test]
    fn apply_is_exact() {
        let (mut db, version) = fresh_db();
        let mut diff = Diff::new();
        diff.append(a_tuple(Op::Add, "www.example.test.", 300, [192, 0, 2, 1]));
        diff.apply(&mut db, &version).unwrap();

        // Adding the same data again, or deleting data that is not
        // there, must fail rather than silently converge.
        assert!(matches!(
            diff.apply(&mut db, &version),
            Err(Error::Db(db::Error::NotExact)),
        ));
        let mut removal = Diff::new();
        removal.append(a_tuple(Op::Del, "www.example.test.", 300, [192, 0, 2, 9]));
        assert!(matches!(
            removal.apply(&mut db, &version),
            Err(Error::Db(db::Error::NotExact)),
        ));
    }

    #[test]
    fn apply_groups_a_run_under_the_first_ttl() {
        let (mut db, version) = fresh_db();
        let mut diff = Diff::new();
        diff.append(a_tuple(Op::Add, "www.example.test.", 300, [192, 0, 2, 1]));
        diff.append(a_tuple(Op::Add, "www.example.test.", 600, [192, 0, 2, 2]));
        diff.apply_silently(&mut db, &version).unwrap();

        let owner: Box<Name> = "www.example.test.".parse().unwrap();
        let node = db.find_node(Some(&version), &owner).unwrap();
        let rrset = db
            .find_rdataset(Some(&version), node, Type::A, Type::from(0))
            .unwrap();
        assert_eq!(rrset.len(), 2);
        assert_eq!(rrset.ttl, Ttl::from(300));
    }

    #[test]
    fn add_resign_records_the_earliest_expiration() {
        let (mut db, version) = fresh_db();
        let mut diff = Diff::new();
        diff.append(rrsig_tuple(
            Op::AddResign,
            "www.example.test.",
            Type::A,
            1_700_000_000,
        ));
        diff.append(rrsig_tuple(
            Op::AddResign,
            "www.example.test.",
            Type::A,
            1_690_000_000,
        ));
        diff.apply(&mut db, &version).unwrap();

        let owner: Box<Name> = "www.example.test.".parse().unwrap();
        let node = db.find_node(Some(&version), &owner).unwrap();
        assert_eq!(
            db.resign_time(Some(&version), node, Type::A),
            Some(1_690_000_000),
        );
    }

    #[test]
    fn apply_restores_the_stored_owner_case_on_delete() {
        let (mut db, version) = fresh_db();
        let mut diff = Diff::new();
        diff.append(a_tuple(Op::Add, "www.example.test.", 300, [192, 0, 2, 1]));
        diff.apply(&mut db, &version).unwrap();

        // The delete tuple names the record in the wrong case; after
        // applying, it reflects the case that was actually stored.
        let mut removal = Diff::new();
        removal.append(a_tuple(Op::Del, "WWW.EXAMPLE.TEST.", 300, [192, 0, 2, 1]));
        removal.apply(&mut db, &version).unwrap();
        let stored: Box<Name> = "www.example.test.".parse().unwrap();
        assert_eq!(
            removal.iter().next().unwrap().name.wire_repr(),
            stored.wire_repr(),
        );

        let mut out = Vec::new();
        removal.print(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "del www.example.test. 300 IN A 192.0.2.1\n");
    }

    #[test]
    fn masterfile_order_groups_types_with_their_signatures() {
        let mut soa_rdata = Vec::new();
        crate::rr::rdata::serialize_soa(
            &"ns.example.test.".parse::<Box<Name>>().unwrap(),
            &"hostmaster.example.test.".parse::<Box<Name>>().unwrap(),
            1,
            10800,
            3600,
            604800,
            300,
            &mut soa_rdata,
        );
        let soa = DiffTuple::new(
            Op::Add,
            "example.test.".parse().unwrap(),
            Class::IN,
            Type::SOA,
            Ttl::from(300),
            Box::<Rdata>::try_from(soa_rdata).unwrap(),
        );
        let ns = DiffTuple::new(
            Op::Add,
            "example.test.".parse().unwrap(),
            Class::IN,
            Type::NS,
            Ttl::from(300),
            <&Rdata>::try_from(b"\x02ns\x07example\x04test\x00".as_slice())
                .unwrap()
                .to_owned(),
        );

        let mut diff = Diff::new();
        diff.append(rrsig_tuple(Op::Add, "www.example.test.", Type::A, 1_700_000_000));
        diff.append(a_tuple(Op::Add, "www.example.test.", 300, [192, 0, 2, 1]));
        diff.append(ns);
        diff.append(rrsig_tuple(Op::Add, "example.test.", Type::SOA, 1_700_000_000));
        diff.append(soa);
        diff.sort_by(masterfile_order);

        let order: Vec<(Type, Type)> = diff.iter().map(|t| (t.rr_type, t.covers())).collect();
        assert_eq!(
            order,
            vec![
                (Type::SOA, Type::from(0)),
                (Type::RRSIG, Type::SOA),
                (Type::NS, Type::from(0)),
                (Type::A, Type::from(0)),
                (Type::RRSIG, Type::A),
            ],
        );
    }

    #[test]
    fn exists_tuples_cannot_be_applied() {
        let (mut db, version) = fresh_db();
        let mut diff = Diff::new();
        diff.append(a_tuple(Op::Exists, "www.example.test.", 300, [192, 0, 2, 1]));
        assert!(matches!(
            diff.apply(&mut db, &version),
            Err(Error::UnexpectedOp(Op::Exists)),
        ));
    }

    #[test]
    fn print_prefixes_each_record_with_its_operation() {
        let mut diff = Diff::new();
        diff.append(a_tuple(Op::Add, "www.example.test.", 300, [192, 0, 2, 1]));
        diff.append(a_tuple(Op::Del, "old.example.test.", 300, [192, 0, 2, 9]));

        let mut out = Vec::new();
        diff.print(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "add www.example.test. 300 IN A 192.0.2.1");
        assert_eq!(lines[1], "del old.example.test. 300 IN A 192.0.2.9");
    }
}
