//! The file-system facade: a flat tag→blob store per applet and
//! region.
//!
//! Mirrors `File::FileSystem` in `original_source` with the concrete
//! flash driver abstracted away: a missing file reads back as empty
//! with no error (`original_source`'s `ReadFile` has the same
//! behavior, used pervasively by `AlgoritmAttr::Load` and friends to
//! tell "never configured" apart from "malformed").

use std::collections::BTreeMap;

use crate::types::{AppId, Region, Tag};
use crate::Result;

/// Abstracts over the concrete flash/NVM driver.
///
/// Implementors own the real storage medium; this crate only ever
/// calls through this trait, never touches hardware directly.
pub trait FileSystem {
    /// Reads the blob at `(app, tag, region)`. A file that was never
    /// written (or was deleted) reads back as an empty `Vec`, not an
    /// error.
    fn read_file(&self, app: AppId, tag: Tag, region: Region) -> Result<Vec<u8>>;

    /// Writes `data` as the blob at `(app, tag, region)`, replacing
    /// any previous contents.
    fn write_file(&mut self, app: AppId, tag: Tag, region: Region, data: &[u8]) -> Result<()>;

    /// Removes the blob at `(app, tag, region)`, if any.
    fn delete_file(&mut self, app: AppId, tag: Tag, region: Region) -> Result<()>;
}

/// An in-memory [`FileSystem`], for bring-up and tests before a real
/// flash driver is wired in.
#[derive(Debug, Default, Clone)]
pub struct MemoryFileSystem {
    files: BTreeMap<(AppId, Tag, RegionKey), Vec<u8>>,
}

// `Region` doesn't derive `Ord`; key on a local mirror instead of
// widening its public API just for this map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum RegionKey {
    File,
    Secure,
}

impl From<Region> for RegionKey {
    fn from(r: Region) -> Self {
        match r {
            Region::File => RegionKey::File,
            Region::Secure => RegionKey::Secure,
        }
    }
}

impl MemoryFileSystem {
    /// An empty file system, as at first boot before any DO is
    /// written.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_file(&self, app: AppId, tag: Tag, region: Region) -> Result<Vec<u8>> {
        Ok(self
            .files
            .get(&(app, tag, region.into()))
            .cloned()
            .unwrap_or_default())
    }

    fn write_file(&mut self, app: AppId, tag: Tag, region: Region, data: &[u8]) -> Result<()> {
        self.files.insert((app, tag, region.into()), data.to_vec());
        Ok(())
    }

    fn delete_file(&mut self, app: AppId, tag: Tag, region: Region) -> Result<()> {
        self.files.remove(&(app, tag, region.into()));
        Ok(())
    }
}
