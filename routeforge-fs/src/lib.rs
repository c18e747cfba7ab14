//! Filesystem helpers shared by the routeforge crates.
//!
//! Every path is UTF-8 (`camino`) and every access goes through an ambient
//! `cap-std` directory handle resolved from the path's parent. Outputs are
//! written through [`OutputFile`], which removes the file again unless the
//! writer commits it.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use log::{debug, warn};
use std::fs::File;
use std::io::{self, Write};
use std::path::Component;

/// Open an existing UTF-8 path for reading.
pub fn open_utf8_file(path: &Utf8Path) -> io::Result<File> {
    fs_utf8::File::open_ambient(path, ambient_authority()).map(fs_utf8::File::into_std)
}

/// Create (or truncate) a file for reading and writing, creating missing
/// parent directories first.
pub fn create_utf8_file(path: &Utf8Path) -> io::Result<File> {
    ensure_parent_dir(path)?;
    let (dir, name) = open_dir_and_file(path)?;
    let mut options = fs_utf8::OpenOptions::new();
    options.read(true).write(true).create(true).truncate(true);
    dir.open_with(name.as_str(), &options)
        .map(fs_utf8::File::into_std)
}

/// Remove a file. A missing file is not an error.
pub fn remove_utf8_file(path: &Utf8Path) -> io::Result<()> {
    let (dir, name) = open_dir_and_file(path)?;
    match dir.remove_file(name.as_str()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Return whether a path exists and is a regular file.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.metadata(name.as_str()).map(|meta| meta.is_file())
}

/// Return whether two existing paths name the same file once symlinks and
/// `..` components are resolved.
pub fn same_file(a: &Utf8Path, b: &Utf8Path) -> io::Result<bool> {
    Ok(a.canonicalize_utf8()? == b.canonicalize_utf8()?)
}

/// Resolve the parent directory of `path` and return it with the file name.
fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("path {path} has no file name")))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Ensure the parent directory for `path` exists.
fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }

    let (base_dir, relative) = base_dir_and_relative(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

/// Split a parent path into an ambient base directory and a relative suffix.
fn base_dir_and_relative(parent: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_parent = parent.as_std_path();

    let (base, relative) = match std_parent.components().next() {
        // Windows drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_parent.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from parent path"))?
                .to_path_buf();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), std_parent.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative = Utf8PathBuf::from_path_buf(relative)
        .map_err(|_| io::Error::other("non-UTF-8 parent path"))?;

    Ok((dir, relative))
}

/// A freshly created output file that is removed on drop unless committed.
///
/// Targets hold one of these for the whole run, so a failure on any exit path
/// (error return, early drop, panic unwinding) never leaves a half-written
/// artefact behind.
///
/// # Examples
/// ```no_run
/// use std::io::Write;
/// use camino::Utf8Path;
/// use routeforge_fs::OutputFile;
///
/// # fn main() -> std::io::Result<()> {
/// let mut output = OutputFile::create(Utf8Path::new("out/graph.bin"))?;
/// output.file_mut().write_all(b"payload")?;
/// let path = output.commit()?;
/// assert!(path.ends_with("graph.bin"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OutputFile {
    path: Utf8PathBuf,
    file: File,
    committed: bool,
}

impl OutputFile {
    /// Create or truncate the file at `path`.
    pub fn create(path: &Utf8Path) -> io::Result<Self> {
        let file = create_utf8_file(path)?;
        debug!("created output file {path}");
        Ok(Self {
            path: path.to_path_buf(),
            file,
            committed: false,
        })
    }

    /// Location of the output on disk.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Mutable access to the underlying handle.
    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }

    /// Flush and sync the file, then keep it on disk.
    pub fn commit(mut self) -> io::Result<Utf8PathBuf> {
        self.file.sync_all()?;
        self.committed = true;
        Ok(std::mem::take(&mut self.path))
    }
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file_mut().flush()
    }
}

impl Drop for OutputFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match remove_utf8_file(&self.path) {
            Ok(()) => debug!("removed uncommitted output {}", self.path),
            Err(err) => warn!("failed to remove uncommitted output {}: {err}", self.path),
        }
    }
}
