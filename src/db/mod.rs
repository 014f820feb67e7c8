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

//! An in-memory, versioned store of DNS records.
//!
//! The [`Db`] structure holds the RRsets of a single zone, indexed by
//! owner name. It is the substrate that the [diff engine](`crate::diff`)
//! applies changes to and that the [masterfile writers](`crate::master`)
//! dump from.
//!
//! # Versioning
//!
//! A [`Db`] always has a *committed* state, which read operations see
//! by default. [`Db::new_version`] opens a single writable snapshot of
//! the committed state; all mutating operations require the returned
//! [`Version`] handle. [`Db::close_version`] then publishes the
//! snapshot as the new committed state or discards it. Only one version
//! may be open at a time.
//!
//! # Add/subtract semantics
//!
//! [`Db::add_rdataset`] and [`Db::subtract_rdataset`] merge records
//! into, and remove records from, the RRset of a node. Their option
//! flags and outcome values form the shared result taxonomy used by the
//! diff engine:
//!
//! * `merge`/`exact`/`exact_ttl` adds distinguish "data added"
//!   ([`AddOutcome::Added`]) from "no effect" ([`AddOutcome::Unchanged`])
//!   and fail with [`Error::NotExact`] when an exact add finds data
//!   already present or a TTL mismatch.
//! * `exact`/`want_old` subtracts distinguish "records removed, RRset
//!   remains" ([`SubtractOutcome::Removed`]), "RRset now absent"
//!   ([`SubtractOutcome::NxRrset`]), and "no effect"
//!   ([`SubtractOutcome::Unchanged`]), and fail with
//!   [`Error::NotExact`] when an exact subtract finds records missing.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::class::Class;
use crate::master;
use crate::name::Name;
use crate::rr::{Rrset, Trust, Ttl, Type};
use crate::zone_file;

////////////////////////////////////////////////////////////////////////
// STRUCTURES                                                         //
////////////////////////////////////////////////////////////////////////

/// An in-memory, versioned store of the records of one zone. See the
/// [module-level documentation](`self`) for an overview.
pub struct Db {
    class: Class,
    origin: Box<Name>,
    committed: Data,
    open: Option<(u64, Data)>,
    next_version_id: u64,
}

/// One state (committed or open) of a [`Db`].
#[derive(Clone, Default)]
struct Data {
    // Nodes are kept in insertion order for iteration; the map indexes
    // them by owner name. Name equality and hashing are
    // case-insensitive, so lookups ignore case while the node itself
    // preserves it.
    nodes: Vec<Node>,
    by_name: HashMap<Box<Name>, usize>,
}

/// A node: the collection of RRsets sharing one owner name.
#[derive(Clone)]
struct Node {
    name: Box<Name>,
    rrsets: Vec<StoredRrset>,
}

/// An RRset as stored in a [`Node`], along with its re-signing time
/// (maintained by the diff engine for RRSIG sets).
#[derive(Clone)]
struct StoredRrset {
    rr_type: Type,
    covers: Type,
    ttl: Ttl,
    rrset: crate::rr::RdataSetOwned,
    resign: Option<u32>,
}

/// A handle to an open writable version of a [`Db`].
#[derive(Debug, Eq, PartialEq)]
pub struct Version {
    id: u64,
}

/// A handle to a node of a [`Db`]. Handles are only meaningful for the
/// [`Db`] state (committed or open version) they were obtained from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NodeId(usize);

pub use crate::master::Format;

/// Options for [`Db::add_rdataset`].
#[derive(Clone, Copy, Debug, Default)]
pub struct AddOptions {
    /// Merge the incoming records with any existing RRset instead of
    /// replacing it.
    pub merge: bool,

    /// Fail with [`Error::NotExact`] if any incoming record is already
    /// present.
    pub exact: bool,

    /// Fail with [`Error::NotExact`] if an existing RRset has a
    /// different TTL.
    pub exact_ttl: bool,
}

/// Options for [`Db::subtract_rdataset`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SubtractOptions {
    /// Fail with [`Error::NotExact`] if any record to be removed is not
    /// present.
    pub exact: bool,

    /// Return the RRset as it existed before a complete deletion.
    pub want_old: bool,
}

/// The successful outcomes of [`Db::add_rdataset`]. Both variants carry
/// the resulting RRset.
#[derive(Debug)]
pub enum AddOutcome {
    Added(Rrset),
    Unchanged(Rrset),
}

/// The successful outcomes of [`Db::subtract_rdataset`].
#[derive(Debug)]
pub enum SubtractOutcome {
    /// Records were removed and the RRset remains; carries the
    /// remaining RRset.
    Removed(Rrset),

    /// The RRset is now absent: either every record was just removed
    /// (in which case the pre-deletion RRset is carried when
    /// [`SubtractOptions::want_old`] is set) or it did not exist.
    NxRrset(Option<Rrset>),

    /// Nothing was removed; carries the unmodified RRset.
    Unchanged(Rrset),
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// Errors returned by [`Db`] operations.
#[derive(Debug)]
pub enum Error {
    /// An exact add found data already present (or a TTL mismatch), or
    /// an exact subtract found data missing.
    NotExact,

    /// A writable version is already open.
    VersionAlreadyOpen,

    /// The provided [`Version`] handle is not the open version.
    StaleVersion,

    /// A record of a different class was given to a [`Db`].
    ClassMismatch,

    /// I/O failure while loading.
    Io(std::io::Error),

    /// Text-format parse failure while loading.
    ZoneFile(zone_file::fs::Error),

    /// Raw-format parse failure while loading.
    Raw(master::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotExact => f.write_str("the add or subtract was not exact"),
            Self::VersionAlreadyOpen => f.write_str("a writable version is already open"),
            Self::StaleVersion => f.write_str("the version handle is stale"),
            Self::ClassMismatch => f.write_str("record class does not match the database class"),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::ZoneFile(e) => write!(f, "failed to parse zone file: {}", e),
            Self::Raw(e) => write!(f, "failed to parse raw-format file: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<zone_file::fs::Error> for Error {
    fn from(e: zone_file::fs::Error) -> Self {
        Self::ZoneFile(e)
    }
}

impl From<master::Error> for Error {
    fn from(e: master::Error) -> Self {
        Self::Raw(e)
    }
}

/// A result type for [`Db`] operations.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// CONSTRUCTION AND LOADING                                           //
////////////////////////////////////////////////////////////////////////

/// The maximum `$INCLUDE` depth accepted when loading text zone files.
const MAX_INCLUDE_DEPTH: usize = 16;

impl Db {
    /// Creates a new, empty `Db` for records of the given class under
    /// the given origin.
    pub fn new(class: Class, origin: Box<Name>) -> Self {
        Self {
            class,
            origin,
            committed: Data::default(),
            open: None,
            next_version_id: 0,
        }
    }

    /// Returns the class of this `Db`.
    pub fn class(&self) -> Class {
        self.class
    }

    /// Returns the origin of this `Db`.
    pub fn origin(&self) -> &Name {
        &self.origin
    }

    /// Loads records from the file at `path` into the committed state.
    /// Text files are parsed with the origin of this `Db` in effect, so
    /// they may use relative names. Records of a different class are
    /// rejected.
    pub fn load(&mut self, path: &Path, format: Format) -> Result<()> {
        match format {
            Format::Text => self.load_text(path),
            Format::Raw => self.load_raw(path),
        }
    }

    fn load_text(&mut self, path: &Path) -> Result<()> {
        let origin: std::rc::Rc<Name> = self.origin.clone().into();
        let parser = zone_file::fs::Parser::open_with_origin(path, origin, MAX_INCLUDE_DEPTH)?;
        for line in parser {
            let line = line?;
            let record = line.record;
            if record.class != self.class {
                return Err(Error::ClassMismatch);
            }
            let covers = covers_of(record.rr_type, &record.rdata);
            self.committed.merge_record(
                &record.owner,
                record.rr_type,
                covers,
                record.ttl,
                &record.rdata,
            );
        }
        Ok(())
    }

    fn load_raw(&mut self, path: &Path) -> Result<()> {
        for rrset in master::raw::Reader::open(path)? {
            let rrset = rrset?;
            if rrset.class != self.class {
                return Err(Error::ClassMismatch);
            }
            for rdata in rrset.rdatas().iter() {
                self.committed.merge_record(
                    &rrset.owner,
                    rrset.rr_type,
                    rrset.covers,
                    rrset.ttl,
                    rdata,
                );
            }
        }
        Ok(())
    }

    ////////////////////////////////////////////////////////////////////
    // VERSIONING                                                      //
    ////////////////////////////////////////////////////////////////////

    /// Opens a writable snapshot of the committed state. Fails with
    /// [`Error::VersionAlreadyOpen`] if one is already open.
    pub fn new_version(&mut self) -> Result<Version> {
        if self.open.is_some() {
            return Err(Error::VersionAlreadyOpen);
        }
        let id = self.next_version_id;
        self.next_version_id += 1;
        self.open = Some((id, self.committed.clone()));
        Ok(Version { id })
    }

    /// Closes the open version, publishing it as the new committed
    /// state if `commit` is true and discarding it otherwise. A stale
    /// handle leaves the `Db` untouched.
    pub fn close_version(&mut self, version: Version, commit: bool) {
        match self.open.take() {
            Some((id, data)) if id == version.id => {
                if commit {
                    self.committed = data;
                }
            }
            other => self.open = other,
        }
    }

    fn data(&self, version: Option<&Version>) -> &Data {
        match (version, &self.open) {
            (Some(version), Some((id, data))) if *id == version.id => data,
            _ => &self.committed,
        }
    }

    fn data_mut(&mut self, version: &Version) -> Result<&mut Data> {
        match &mut self.open {
            Some((id, data)) if *id == version.id => Ok(data),
            _ => Err(Error::StaleVersion),
        }
    }

    ////////////////////////////////////////////////////////////////////
    // NODE ACCESS                                                     //
    ////////////////////////////////////////////////////////////////////

    /// Looks up the node for `name`. With `version`, the open version
    /// is consulted; otherwise the committed state is.
    pub fn find_node(&self, version: Option<&Version>, name: &Name) -> Option<NodeId> {
        self.data(version).by_name.get(name).copied().map(NodeId)
    }

    /// Looks up the node for `name` in the open version, creating it if
    /// `create` is set.
    pub fn find_node_mut(
        &mut self,
        version: &Version,
        name: &Name,
        create: bool,
    ) -> Result<Option<NodeId>> {
        let data = self.data_mut(version)?;
        if let Some(&index) = data.by_name.get(name) {
            return Ok(Some(NodeId(index)));
        }
        if !create {
            return Ok(None);
        }
        let index = data.nodes.len();
        data.nodes.push(Node {
            name: name.to_owned(),
            rrsets: Vec::new(),
        });
        data.by_name.insert(name.to_owned(), index);
        Ok(Some(NodeId(index)))
    }

    /// Returns the owner name of `node` with its stored case.
    pub fn owner_case(&self, version: Option<&Version>, node: NodeId) -> Box<Name> {
        self.data(version).nodes[node.0].name.clone()
    }

    /// Records `name` as the case to store and dump the owner of `node`
    /// with.
    pub fn set_owner_case(&mut self, version: &Version, node: NodeId, name: &Name) -> Result<()> {
        let data = self.data_mut(version)?;
        let stored = &mut data.nodes[node.0].name;
        if name == &**stored {
            *stored = name.to_owned();
        }
        Ok(())
    }

    /// Returns a copy of the RRset of the given type (and covered type,
    /// for RRSIGs) at `node`, if present.
    pub fn find_rdataset(
        &self,
        version: Option<&Version>,
        node: NodeId,
        rr_type: Type,
        covers: Type,
    ) -> Option<Rrset> {
        let node = &self.data(version).nodes[node.0];
        node.rrsets
            .iter()
            .find(|stored| stored.rr_type == rr_type && stored.covers == covers)
            .map(|stored| stored.to_rrset(&node.name, self.class))
    }

    ////////////////////////////////////////////////////////////////////
    // ADD AND SUBTRACT                                                //
    ////////////////////////////////////////////////////////////////////

    /// Adds the records of `rrset` to the RRset of the same type at
    /// `node`. See [`AddOptions`] and [`AddOutcome`].
    pub fn add_rdataset(
        &mut self,
        version: &Version,
        node: NodeId,
        rrset: &Rrset,
        options: AddOptions,
    ) -> Result<AddOutcome> {
        if rrset.class != self.class {
            return Err(Error::ClassMismatch);
        }
        let class = self.class;
        let data = self.data_mut(version)?;
        let node = &mut data.nodes[node.0];
        let existing = node
            .rrsets
            .iter_mut()
            .find(|stored| stored.rr_type == rrset.rr_type && stored.covers == rrset.covers);

        let outcome = match existing {
            Some(stored) if options.merge => {
                if options.exact_ttl && stored.ttl != rrset.ttl {
                    return Err(Error::NotExact);
                }
                let mut changed = false;
                for rdata in rrset.rdatas().iter() {
                    if stored.rrset.insert(rrset.rr_type, rdata) {
                        changed = true;
                    } else if options.exact {
                        return Err(Error::NotExact);
                    }
                }
                stored.ttl = rrset.ttl;
                if changed {
                    AddOutcome::Added(stored.to_rrset(&node.name, class))
                } else {
                    AddOutcome::Unchanged(stored.to_rrset(&node.name, class))
                }
            }
            Some(stored) => {
                // Replacement. "Unchanged" means the replacement had no
                // observable effect.
                let unchanged = stored.ttl == rrset.ttl
                    && stored.rrset.equals(rrset.rdatas(), rrset.rr_type);
                stored.ttl = rrset.ttl;
                stored.rrset = rrset.rdatas.clone();
                if unchanged {
                    AddOutcome::Unchanged(stored.to_rrset(&node.name, class))
                } else {
                    AddOutcome::Added(stored.to_rrset(&node.name, class))
                }
            }
            None => {
                let stored = StoredRrset {
                    rr_type: rrset.rr_type,
                    covers: rrset.covers,
                    ttl: rrset.ttl,
                    rrset: rrset.rdatas.clone(),
                    resign: None,
                };
                let result = stored.to_rrset(&node.name, class);
                node.rrsets.push(stored);
                AddOutcome::Added(result)
            }
        };
        Ok(outcome)
    }

    /// Removes the records of `rrset` from the RRset of the same type
    /// at `node`. See [`SubtractOptions`] and [`SubtractOutcome`].
    pub fn subtract_rdataset(
        &mut self,
        version: &Version,
        node: NodeId,
        rrset: &Rrset,
        options: SubtractOptions,
    ) -> Result<SubtractOutcome> {
        if rrset.class != self.class {
            return Err(Error::ClassMismatch);
        }
        let class = self.class;
        let data = self.data_mut(version)?;
        let node = &mut data.nodes[node.0];
        let index = node
            .rrsets
            .iter()
            .position(|stored| stored.rr_type == rrset.rr_type && stored.covers == rrset.covers);
        let index = match index {
            Some(index) => index,
            None => return Ok(SubtractOutcome::NxRrset(None)),
        };

        if options.exact {
            let stored = &node.rrsets[index];
            for rdata in rrset.rdatas().iter() {
                if !stored.rrset.contains(rrset.rr_type, rdata) {
                    return Err(Error::NotExact);
                }
            }
        }

        let old = if options.want_old {
            Some(node.rrsets[index].to_rrset(&node.name, class))
        } else {
            None
        };

        let stored = &mut node.rrsets[index];
        let mut removed = false;
        for rdata in rrset.rdatas().iter() {
            if stored.rrset.remove(rrset.rr_type, rdata) {
                removed = true;
            }
        }

        if stored.rrset.is_empty() {
            node.rrsets.remove(index);
            Ok(SubtractOutcome::NxRrset(old))
        } else if removed {
            Ok(SubtractOutcome::Removed(stored.to_rrset(&node.name, class)))
        } else {
            Ok(SubtractOutcome::Unchanged(
                stored.to_rrset(&node.name, class),
            ))
        }
    }

    ////////////////////////////////////////////////////////////////////
    // RE-SIGNING TIMES                                                //
    ////////////////////////////////////////////////////////////////////

    /// Records the next re-signing time of the RRSIG RRset covering
    /// `covers` at `node`.
    pub fn set_resign_time(
        &mut self,
        version: &Version,
        node: NodeId,
        covers: Type,
        when: u32,
    ) -> Result<()> {
        let data = self.data_mut(version)?;
        let node = &mut data.nodes[node.0];
        if let Some(stored) = node
            .rrsets
            .iter_mut()
            .find(|stored| stored.rr_type == Type::RRSIG && stored.covers == covers)
        {
            stored.resign = Some(when);
        }
        Ok(())
    }

    /// Returns the recorded re-signing time of the RRSIG RRset covering
    /// `covers` at `node`.
    pub fn resign_time(&self, version: Option<&Version>, node: NodeId, covers: Type) -> Option<u32> {
        self.data(version).nodes[node.0]
            .rrsets
            .iter()
            .find(|stored| stored.rr_type == Type::RRSIG && stored.covers == covers)
            .and_then(|stored| stored.resign)
    }

    ////////////////////////////////////////////////////////////////////
    // ITERATION                                                       //
    ////////////////////////////////////////////////////////////////////

    /// Iterates over all RRsets in node-insertion order. RRsets within
    /// a node likewise appear in insertion order.
    pub fn rrsets<'a>(&'a self, version: Option<&Version>) -> impl Iterator<Item = Rrset> + 'a {
        let class = self.class;
        self.data(version).nodes.iter().flat_map(move |node| {
            node.rrsets
                .iter()
                .map(move |stored| stored.to_rrset(&node.name, class))
        })
    }

    /// Returns whether the given state holds no records.
    pub fn is_empty(&self, version: Option<&Version>) -> bool {
        self.data(version)
            .nodes
            .iter()
            .all(|node| node.rrsets.is_empty())
    }
}

impl Data {
    /// Merges a single record into this state, creating the node and
    /// RRset as needed. An RRset's TTL is that of its first record.
    fn merge_record(
        &mut self,
        owner: &Name,
        rr_type: Type,
        covers: Type,
        ttl: Ttl,
        rdata: &crate::rr::Rdata,
    ) {
        let index = match self.by_name.get(owner) {
            Some(&index) => index,
            None => {
                let index = self.nodes.len();
                self.nodes.push(Node {
                    name: owner.to_owned(),
                    rrsets: Vec::new(),
                });
                self.by_name.insert(owner.to_owned(), index);
                index
            }
        };
        let node = &mut self.nodes[index];
        match node
            .rrsets
            .iter_mut()
            .find(|stored| stored.rr_type == rr_type && stored.covers == covers)
        {
            Some(stored) => {
                stored.rrset.insert(rr_type, rdata);
            }
            None => {
                let mut rrset = crate::rr::RdataSetOwned::new();
                rrset.insert(rr_type, rdata);
                node.rrsets.push(StoredRrset {
                    rr_type,
                    covers,
                    ttl,
                    rrset,
                    resign: None,
                });
            }
        }
    }
}

impl StoredRrset {
    /// Builds an owned [`Rrset`] view of this stored RRset.
    fn to_rrset(&self, owner: &Name, class: Class) -> Rrset {
        let mut rrset = Rrset::new(owner.to_owned(), class, self.rr_type, self.ttl);
        rrset.covers = self.covers;
        rrset.trust = Trust::Ultimate;
        rrset.rdatas = self.rrset.clone();
        rrset
    }
}

/// Returns the type an RRSIG record covers (and `Type::from(0)` for
/// everything else).
pub fn covers_of(rr_type: Type, rdata: &crate::rr::Rdata) -> Type {
    if rr_type == Type::RRSIG && rdata.len() >= 2 {
        Type::from(u16::from_be_bytes([rdata[0], rdata[1]]))
    } else {
        Type::from(0)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rr::Rdata;

    fn new_db() -> Db {
        Db::new(Class::IN, "example.test.".parse().unwrap())
    }

    fn a_rrset(owner: &str, ttl: u32, addresses: &[[u8; 4]]) -> Rrset {
        let mut rrset = Rrset::new(owner.parse().unwrap(), Class::IN, Type::A, Ttl::from(ttl));
        for address in addresses {
            rrset.push_rdata(<&Rdata>::try_from(&address[..]).unwrap());
        }
        rrset
    }

    #[test]
    fn add_and_find_work() {
        let mut db = new_db();
        let version = db.new_version().unwrap();
        let rrset = a_rrset("www.example.test.", 3600, &[[192, 0, 2, 1]]);
        let node = db
            .find_node_mut(&version, &rrset.owner, true)
            .unwrap()
            .unwrap();
        match db
            .add_rdataset(&version, node, &rrset, AddOptions::default())
            .unwrap()
        {
            AddOutcome::Added(resulting) => assert_eq!(resulting, rrset),
            other => panic!("unexpected outcome: {:?}", other),
        }

        // Before commit, the committed state must not see the node.
        assert!(db.find_node(None, &rrset.owner).is_none());
        db.close_version(version, true);
        let node = db.find_node(None, &rrset.owner).unwrap();
        assert_eq!(
            db.find_rdataset(None, node, Type::A, Type::from(0)).unwrap(),
            rrset,
        );
    }

    #[test]
    fn discarded_version_leaves_no_trace() {
        let mut db = new_db();
        let version = db.new_version().unwrap();
        let rrset = a_rrset("www.example.test.", 3600, &[[192, 0, 2, 1]]);
        let node = db
            .find_node_mut(&version, &rrset.owner, true)
            .unwrap()
            .unwrap();
        db.add_rdataset(&version, node, &rrset, AddOptions::default())
            .unwrap();
        db.close_version(version, false);
        assert!(db.find_node(None, &rrset.owner).is_none());
    }

    #[test]
    fn only_one_version_may_be_open() {
        let mut db = new_db();
        let version = db.new_version().unwrap();
        assert!(matches!(db.new_version(), Err(Error::VersionAlreadyOpen)));
        db.close_version(version, false);
        db.new_version().unwrap();
    }

    #[test]
    fn exact_add_of_existing_data_fails() {
        let mut db = new_db();
        let version = db.new_version().unwrap();
        let rrset = a_rrset("www.example.test.", 3600, &[[192, 0, 2, 1]]);
        let node = db
            .find_node_mut(&version, &rrset.owner, true)
            .unwrap()
            .unwrap();
        let options = AddOptions {
            merge: true,
            exact: true,
            exact_ttl: true,
        };
        db.add_rdataset(&version, node, &rrset, options).unwrap();
        assert!(matches!(
            db.add_rdataset(&version, node, &rrset, options),
            Err(Error::NotExact),
        ));
    }

    #[test]
    fn exact_ttl_mismatch_fails() {
        let mut db = new_db();
        let version = db.new_version().unwrap();
        let rrset = a_rrset("www.example.test.", 3600, &[[192, 0, 2, 1]]);
        let node = db
            .find_node_mut(&version, &rrset.owner, true)
            .unwrap()
            .unwrap();
        let options = AddOptions {
            merge: true,
            exact: true,
            exact_ttl: true,
        };
        db.add_rdataset(&version, node, &rrset, options).unwrap();
        let other_ttl = a_rrset("www.example.test.", 7200, &[[192, 0, 2, 2]]);
        assert!(matches!(
            db.add_rdataset(&version, node, &other_ttl, options),
            Err(Error::NotExact),
        ));
    }

    #[test]
    fn subtract_distinguishes_outcomes() {
        let mut db = new_db();
        let version = db.new_version().unwrap();
        let rrset = a_rrset(
            "www.example.test.",
            3600,
            &[[192, 0, 2, 1], [192, 0, 2, 2]],
        );
        let node = db
            .find_node_mut(&version, &rrset.owner, true)
            .unwrap()
            .unwrap();
        db.add_rdataset(&version, node, &rrset, AddOptions::default())
            .unwrap();

        let options = SubtractOptions {
            exact: true,
            want_old: true,
        };

        // Partial removal leaves the rest of the RRset in place.
        let partial = a_rrset("www.example.test.", 3600, &[[192, 0, 2, 1]]);
        match db
            .subtract_rdataset(&version, node, &partial, options)
            .unwrap()
        {
            SubtractOutcome::Removed(remaining) => {
                assert_eq!(remaining, a_rrset("www.example.test.", 3600, &[[192, 0, 2, 2]]));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        // Exact removal of missing data fails.
        assert!(matches!(
            db.subtract_rdataset(&version, node, &partial, options),
            Err(Error::NotExact),
        ));

        // Complete removal reports NXRRSET with the old RRset.
        let rest = a_rrset("www.example.test.", 3600, &[[192, 0, 2, 2]]);
        match db
            .subtract_rdataset(&version, node, &rest, options)
            .unwrap()
        {
            SubtractOutcome::NxRrset(Some(old)) => assert_eq!(old, rest),
            other => panic!("unexpected outcome: {:?}", other),
        }

        // Removal from a nonexistent RRset reports NXRRSET, no old set.
        assert!(matches!(
            db.subtract_rdataset(&version, node, &rest, options),
            Ok(SubtractOutcome::NxRrset(None)),
        ));
    }

    #[test]
    fn resign_times_are_per_covered_type() {
        let mut db = new_db();
        let version = db.new_version().unwrap();
        let owner: Box<Name> = "example.test.".parse().unwrap();
        let mut sigs = Rrset::new(owner.clone(), Class::IN, Type::RRSIG, Ttl::from(3600));
        sigs.covers = Type::DS;
        // A minimal RRSIG-shaped rdata; only the covered type matters
        // for storage.
        let mut rdata = vec![0u8; 18];
        rdata[0..2].copy_from_slice(&u16::from(Type::DS).to_be_bytes());
        rdata.extend_from_slice(b"\x00");
        sigs.push_rdata(<&Rdata>::try_from(&rdata[..]).unwrap());
        let node = db.find_node_mut(&version, &owner, true).unwrap().unwrap();
        db.add_rdataset(&version, node, &sigs, AddOptions::default())
            .unwrap();
        db.set_resign_time(&version, node, Type::DS, 12345).unwrap();
        assert_eq!(db.resign_time(Some(&version), node, Type::DS), Some(12345));
        assert_eq!(db.resign_time(Some(&version), node, Type::A), None);
    }

    #[test]
    fn owner_case_is_recorded() {
        let mut db = new_db();
        let version = db.new_version().unwrap();
        let lower: Box<Name> = "www.example.test.".parse().unwrap();
        let upper: Box<Name> = "WWW.EXAMPLE.TEST.".parse().unwrap();
        let node = db.find_node_mut(&version, &lower, true).unwrap().unwrap();
        db.set_owner_case(&version, node, &upper).unwrap();
        assert_eq!(
            db.owner_case(Some(&version), node).wire_repr(),
            upper.wire_repr(),
        );
        // Lookups remain case-insensitive.
        assert!(db.find_node(Some(&version), &lower).is_some());
    }
}
