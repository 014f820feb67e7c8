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

//! Writing (and raw-format reading) of masterfiles.
//!
//! Two on-disk formats are supported:
//!
//! * The standard text format of [RFC 1035 § 5], written here and
//!   parsed by [`crate::zone_file`]. Output is controlled by a
//!   [`Style`].
//! * A binary "raw" format that round-trips RRsets without text
//!   conversion, written and [read](`raw::Reader`) by the [`raw`]
//!   submodule.
//!
//! [`dump_to_file`] writes either format atomically: the data goes to
//! a unique temporary file beside the target, which is synced,
//! optionally given an explicit modification time, and renamed over
//! the target. The temporary file is removed on any failure.
//! [`dump_to_file_async`] performs the same work on a worker thread.
//!
//! [RFC 1035 § 5]: https://datatracker.ietf.org/doc/html/rfc1035#section-5

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::SystemTime;

use crate::db::{Db, Version};

pub mod raw;
mod text;

pub use text::{dump_text, rdataset_to_text, Style};

////////////////////////////////////////////////////////////////////////
// FORMATS AND HEADERS                                                //
////////////////////////////////////////////////////////////////////////

/// A masterfile format.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Format {
    Text,
    Raw,
}

/// The header of a raw-format masterfile.
///
/// Version 0 files carry only `version` and `now`; version 1 files add
/// the remaining three fields.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RawHeader {
    pub version: u32,
    pub now: u32,
    pub flags: u32,
    pub sourceserial: u32,
    pub lastxfrin: u32,
}

/// The [`RawHeader::flags`] bit recording that `sourceserial` is set.
pub const RAW_FLAG_SOURCESERIALSET: u32 = 0x02;

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// Errors that may occur while writing or reading masterfiles.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),

    /// A raw-format file does not start with the raw format magic.
    BadMagic,

    /// A raw-format file has an unsupported version.
    UnsupportedVersion(u32),

    /// A raw-format record is structurally invalid.
    Corrupt,

    /// An asynchronous dump was canceled before it started.
    Canceled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::BadMagic => f.write_str("not a raw-format masterfile"),
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported raw-format version {}", version)
            }
            Self::Corrupt => f.write_str("corrupt raw-format masterfile"),
            Self::Canceled => f.write_str("dump canceled"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// A result type for masterfile operations.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// DUMPING TO FILES                                                   //
////////////////////////////////////////////////////////////////////////

/// Everything [`dump_to_file`] needs besides the [`Db`] itself, grouped
/// so that the asynchronous variant can move it to the worker thread.
#[derive(Clone)]
pub struct DumpOptions {
    pub format: Format,
    pub style: Style,
    pub raw_header: RawHeader,

    /// The modification time to give the target file. `None` leaves
    /// the natural mtime of the temporary file in place.
    pub mtime: Option<SystemTime>,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            format: Format::Text,
            style: Style::default(),
            raw_header: RawHeader::default(),
            mtime: None,
        }
    }
}

/// Dumps the given state of `db` to the file at `path`, atomically.
pub fn dump_to_file(
    db: &Db,
    version: Option<&Version>,
    options: &DumpOptions,
    path: &Path,
) -> Result<()> {
    let temp_path = temporary_path(path);
    let result = write_and_rename(db, version, options, path, &temp_path);
    if result.is_err() {
        // Never leave the temporary file behind.
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_and_rename(
    db: &Db,
    version: Option<&Version>,
    options: &DumpOptions,
    path: &Path,
    temp_path: &Path,
) -> Result<()> {
    let mut file = fs::File::create(temp_path)?;
    {
        let mut writer = io::BufWriter::new(&mut file);
        match options.format {
            Format::Text => dump_text(db, version, &options.style, &mut writer)?,
            Format::Raw => raw::write(db, version, &options.raw_header, &mut writer)?,
        }
        writer.flush()?;
    }
    file.sync_all()?;
    if let Some(mtime) = options.mtime {
        file.set_modified(mtime)?;
        file.sync_all()?;
    }
    drop(file);
    fs::rename(temp_path, path)?;
    Ok(())
}

/// Computes a unique temporary path in the same directory as `path`
/// (so that the final rename stays on one file system).
fn temporary_path(path: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let mut file_name = path.file_name().unwrap_or_default().to_os_string();
    file_name.push(format!(".tmp.{}.{}", std::process::id(), nanos));
    path.with_file_name(file_name)
}

/// Dumps the given state of `db` on a worker thread, calling `done`
/// with the result. If `cancel` is set before the worker begins, the
/// dump is abandoned and `done` receives [`Error::Canceled`].
///
/// The committed state at the time of the call is dumped (worker
/// threads cannot borrow an open version).
pub fn dump_to_file_async<F>(
    db: Arc<Db>,
    options: DumpOptions,
    path: PathBuf,
    cancel: Arc<AtomicBool>,
    done: F,
) -> thread::JoinHandle<()>
where
    F: FnOnce(Result<()>) + Send + 'static,
{
    thread::spawn(move || {
        let result = if cancel.load(Ordering::Acquire) {
            Err(Error::Canceled)
        } else {
            dump_to_file(&db, None, &options, &path)
        };
        done(result);
    })
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::class::Class;
    use crate::rr::{Rdata, Rrset, Ttl, Type};

    fn test_db() -> Db {
        let mut db = Db::new(Class::IN, "example.test.".parse().unwrap());
        let version = db.new_version().unwrap();
        let mut rrset = Rrset::new(
            "www.example.test.".parse().unwrap(),
            Class::IN,
            Type::A,
            Ttl::from(3600),
        );
        rrset.push_rdata(<&Rdata>::try_from(&[192, 0, 2, 1][..]).unwrap());
        let node = db
            .find_node_mut(&version, &rrset.owner, true)
            .unwrap()
            .unwrap();
        db.add_rdataset(&version, node, &rrset, Default::default())
            .unwrap();
        db.close_version(version, true);
        db
    }

    #[test]
    fn dump_to_file_replaces_target_atomically() {
        let dir = std::env::temp_dir().join(format!("keyward-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("zone.db");
        fs::write(&path, "old contents").unwrap();

        let db = test_db();
        dump_to_file(&db, None, &DumpOptions::default(), &path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("www.example.test."));
        assert!(contents.contains("192.0.2.1"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn dump_mtime_is_applied() {
        let dir = std::env::temp_dir().join(format!("keyward-test-mtime-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("zone.db");

        let mtime = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000_000);
        let options = DumpOptions {
            mtime: Some(mtime),
            ..Default::default()
        };
        let db = test_db();
        dump_to_file(&db, None, &options, &path).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), mtime);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn canceled_async_dump_reports_canceled() {
        let dir = std::env::temp_dir().join(format!("keyward-test-async-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("zone.db");

        let cancel = Arc::new(AtomicBool::new(true));
        let (sender, receiver) = mpsc::channel();
        let handle = dump_to_file_async(
            Arc::new(test_db()),
            DumpOptions::default(),
            path.clone(),
            cancel,
            move |result| sender.send(result).unwrap(),
        );
        handle.join().unwrap();
        assert!(matches!(receiver.recv().unwrap(), Err(Error::Canceled)));
        assert!(!path.exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
