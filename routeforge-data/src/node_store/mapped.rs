//! Memory-mapped node store.
//!
//! Records are fixed 24-byte little-endian triples `(id: i64, lon: f64,
//! lat: f64)` appended to a file-backed mapping that doubles in size when
//! full. PBF extracts list nodes by ascending id, so the appended run stays
//! sorted and lookups binary-search it; the rare out-of-order id goes to an
//! in-memory overflow map instead.

use std::collections::HashMap;
use std::fs::File;
use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use camino::Utf8Path;
use geo::Coord;
use log::debug;
use memmap2::MmapMut;
use routeforge_fs::OutputFile;

use super::{NodeStore, NodeStoreError};

const RECORD_LEN: usize = 24;
const INITIAL_RECORDS: usize = 4096;

/// Node store spilling coordinates to a memory-mapped file.
///
/// The file is created by [`MappedNodeStore::create`], truncated to the
/// records actually written by [`NodeStore::finish`] and kept on disk. A
/// store dropped without finishing removes its file.
pub struct MappedNodeStore {
    // Declared before `output` so the mapping is released before the file.
    map: MmapMut,
    output: OutputFile,
    len: usize,
    capacity: usize,
    last_id: Option<i64>,
    overflow: HashMap<i64, Coord<f64>>,
}

impl MappedNodeStore {
    /// Create (or truncate) the backing file at `path` and map it.
    pub fn create(path: &Utf8Path) -> Result<Self, NodeStoreError> {
        let mut output = OutputFile::create(path).map_err(|source| NodeStoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map = map_records(output.file_mut(), INITIAL_RECORDS).map_err(|source| {
            NodeStoreError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
        debug!("mapped node store {path} with room for {INITIAL_RECORDS} nodes");
        Ok(Self {
            map,
            output,
            len: 0,
            capacity: INITIAL_RECORDS,
            last_id: None,
            overflow: HashMap::new(),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Utf8Path {
        self.output.path()
    }

    /// Number of nodes held outside the sorted run.
    pub fn overflow_len(&self) -> usize {
        self.overflow.len()
    }

    fn io_error(&self, source: io::Error) -> NodeStoreError {
        NodeStoreError::Io {
            path: self.output.path().to_path_buf(),
            source,
        }
    }

    fn grow(&mut self) -> Result<(), NodeStoreError> {
        let capacity = self
            .capacity
            .checked_mul(2)
            .filter(|records| records.checked_mul(RECORD_LEN).is_some())
            .ok_or_else(|| NodeStoreError::Full {
                path: self.output.path().to_path_buf(),
                max: self.capacity,
            })?;
        self.map.flush().map_err(|source| self.io_error(source))?;
        let map = map_records(self.output.file_mut(), capacity);
        self.map = map.map_err(|source| self.io_error(source))?;
        debug!(
            "grew node store {} to {capacity} records",
            self.output.path()
        );
        self.capacity = capacity;
        Ok(())
    }

    fn append(&mut self, id: i64, location: Coord<f64>) -> Result<(), NodeStoreError> {
        if self.len == self.capacity {
            self.grow()?;
        }
        let start = self.len * RECORD_LEN;
        let write = self
            .map
            .get_mut(start..start + RECORD_LEN)
            .ok_or_else(|| io::Error::other("record slot outside the mapping"))
            .and_then(|mut slot| {
                slot.write_i64::<LittleEndian>(id)?;
                slot.write_f64::<LittleEndian>(location.x)?;
                slot.write_f64::<LittleEndian>(location.y)
            });
        write.map_err(|source| self.io_error(source))?;
        self.len += 1;
        self.last_id = Some(id);
        Ok(())
    }

    fn record(&self, index: usize) -> Option<(i64, Coord<f64>)> {
        let start = index.checked_mul(RECORD_LEN)?;
        let mut bytes = self.map.get(start..start.checked_add(RECORD_LEN)?)?;
        let id = bytes.read_i64::<LittleEndian>().ok()?;
        let x = bytes.read_f64::<LittleEndian>().ok()?;
        let y = bytes.read_f64::<LittleEndian>().ok()?;
        Some((id, Coord { x, y }))
    }

    fn search(&self, id: i64) -> Option<Coord<f64>> {
        let (mut low, mut high) = (0, self.len);
        while low < high {
            let mid = low + (high - low) / 2;
            let (candidate, location) = self.record(mid)?;
            match candidate.cmp(&id) {
                std::cmp::Ordering::Less => low = mid + 1,
                std::cmp::Ordering::Greater => high = mid,
                std::cmp::Ordering::Equal => return Some(location),
            }
        }
        None
    }
}

impl NodeStore for MappedNodeStore {
    fn insert(&mut self, id: i64, location: Coord<f64>) -> Result<(), NodeStoreError> {
        if self.last_id.is_some_and(|last| id <= last) {
            self.overflow.insert(id, location);
            return Ok(());
        }
        self.append(id, location)
    }

    fn get(&self, id: i64) -> Option<Coord<f64>> {
        self.overflow
            .get(&id)
            .copied()
            .or_else(|| self.search(id))
    }

    fn len(&self) -> usize {
        self.len + self.overflow.len()
    }

    fn finish(self: Box<Self>) -> Result<(), NodeStoreError> {
        let Self {
            map,
            mut output,
            len,
            overflow,
            ..
        } = *self;
        let path = output.path().to_path_buf();
        let io_error = |source| NodeStoreError::Io {
            path: path.clone(),
            source,
        };
        map.flush().map_err(io_error)?;
        drop(map);
        let used = u64::try_from(len * RECORD_LEN)
            .map_err(|_| io::Error::other("node store length exceeds u64"))
            .map_err(io_error)?;
        output.file_mut().set_len(used).map_err(io_error)?;
        output.commit().map_err(io_error)?;
        debug!(
            "finished node store {path}: {len} mapped nodes, {} out of order",
            overflow.len()
        );
        Ok(())
    }
}

/// Size `file` for `records` entries and map it read-write.
#[expect(unsafe_code, reason = "memory-mapping a file is inherently unsafe")]
fn map_records(file: &File, records: usize) -> io::Result<MmapMut> {
    let bytes = records
        .checked_mul(RECORD_LEN)
        .and_then(|bytes| u64::try_from(bytes).ok())
        .ok_or_else(|| io::Error::other("node store size overflows u64"))?;
    file.set_len(bytes)?;
    // SAFETY: the file was created by the owning store and no other handle
    // writes to it. It only ever grows while an older mapping is alive, so
    // that mapping never observes truncated pages.
    unsafe { MmapMut::map_mut(file) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn workspace() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        (dir, root)
    }

    fn coord(id: i64) -> Coord<f64> {
        Coord {
            x: id as f64 * 0.001,
            y: -(id as f64) * 0.001,
        }
    }

    #[rstest]
    fn grows_past_the_initial_mapping(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let mut store = MappedNodeStore::create(&root.join("nodes.map")).expect("create");
        let count = i64::try_from(INITIAL_RECORDS * 2 + 5).expect("fits");
        for id in 1..=count {
            store.insert(id * 3, coord(id * 3)).expect("insert");
        }

        assert_eq!(store.len(), INITIAL_RECORDS * 2 + 5);
        assert_eq!(store.overflow_len(), 0);
        assert_eq!(store.get(3), Some(coord(3)));
        assert_eq!(store.get(count * 3), Some(coord(count * 3)));
        assert_eq!(store.get(4), None);
    }

    #[rstest]
    fn out_of_order_ids_use_the_overflow_map(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let mut store = MappedNodeStore::create(&root.join("nodes.map")).expect("create");
        for id in [10, 20, 5, 30, 20] {
            store.insert(id, coord(id + 1)).expect("insert");
        }
        store.insert(20, coord(99)).expect("reinsert");

        assert_eq!(store.overflow_len(), 2);
        assert_eq!(store.get(5), Some(coord(6)));
        assert_eq!(store.get(20), Some(coord(99)), "later insert wins");
        assert_eq!(store.get(30), Some(coord(31)));
    }

    #[rstest]
    fn finish_truncates_and_keeps_the_file(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let path = root.join("nodes.map");
        let mut store = MappedNodeStore::create(&path).expect("create");
        for id in 1..=3 {
            store.insert(id, coord(id)).expect("insert");
        }
        Box::new(store).finish().expect("finish");

        let bytes = std::fs::read(&path).expect("read map file");
        assert_eq!(bytes.len(), 3 * RECORD_LEN);
        let mut first = bytes.get(..RECORD_LEN).expect("first record");
        assert_eq!(first.read_i64::<LittleEndian>().expect("id"), 1);
    }

    #[rstest]
    fn dropping_an_unfinished_store_removes_the_file(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let path = root.join("nodes.map");
        let store = MappedNodeStore::create(&path).expect("create");
        assert!(path.exists());
        drop(store);
        assert!(!path.exists());
    }
}
