//! Filesystem operations over sandboxed paths.
//!
//! Every operation takes a [`SandboxedPath`], so it can only touch files
//! inside the owning user's directory. Error messages name the absolute
//! path; the HTTP layer redacts the roots before responding.

use std::io::{ErrorKind, SeekFrom};

use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::content_type;
use crate::error::CoreError;
use crate::sandbox::{Sandbox, SandboxedPath};
use crate::types::DbId;

/// What currently exists at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// An open file ready to be streamed, with its download metadata.
///
/// `file` is positioned at the start.
#[derive(Debug)]
pub struct FileData {
    pub mime_type: &'static str,
    pub size: u64,
    pub name: String,
    pub file: tokio::fs::File,
}

/// Bytes inspected for content sniffing.
const SNIFF_LEN: usize = 16;

/// A file received from a client, not yet written.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Name supplied by the client; see [`sanitize_file_name`].
    pub file_name: String,
    pub bytes: Vec<u8>,
}

fn io_error(action: &str, path: &SandboxedPath, err: std::io::Error) -> CoreError {
    match err.kind() {
        ErrorKind::NotFound => CoreError::NotFound(format!("Not found: {}", path.as_str())),
        ErrorKind::AlreadyExists => {
            CoreError::Conflict(format!("Already exists: {}", path.as_str()))
        }
        _ => CoreError::Internal(format!("Failed to {action} {}: {err}", path.as_str())),
    }
}

/// Reduce a client-supplied file name to its final component.
///
/// Both `/` and `\` count as separators. Names that would not create a
/// regular file (`""`, `"."`, `".."`) are rejected.
pub fn sanitize_file_name(raw: &str) -> Result<&str, CoreError> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    match name {
        "" | "." | ".." => Err(CoreError::BadRequest(format!(
            "Invalid upload file name '{raw}'"
        ))),
        name if name.contains('\0') => Err(CoreError::BadRequest(
            "Upload file name must not contain NUL bytes".into(),
        )),
        name => Ok(name),
    }
}

/// Kind of entry at `path`, or `None` if nothing is there.
pub async fn entry_kind(path: &SandboxedPath) -> Option<EntryKind> {
    let meta = tokio::fs::metadata(path.as_path()).await.ok()?;
    if meta.is_dir() {
        Some(EntryKind::Directory)
    } else {
        Some(EntryKind::File)
    }
}

/// Names of the entries in a directory, sorted.
pub async fn list(path: &SandboxedPath) -> Result<Vec<String>, CoreError> {
    if entry_kind(path).await != Some(EntryKind::Directory) {
        return Err(CoreError::NotFound(format!(
            "Directory not found: {}",
            path.as_str()
        )));
    }

    let mut entries = tokio::fs::read_dir(path.as_path())
        .await
        .map_err(|e| io_error("list", path, e))?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| io_error("list", path, e))?
    {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Open a regular file for download.
///
/// Only the first few bytes are read, for content sniffing when the
/// extension says nothing.
pub async fn read(path: &SandboxedPath) -> Result<FileData, CoreError> {
    let meta = match tokio::fs::metadata(path.as_path()).await {
        Ok(meta) if meta.is_file() => meta,
        _ => {
            return Err(CoreError::NotFound(format!(
                "File not found: {}",
                path.as_str()
            )))
        }
    };

    let mut file = tokio::fs::File::open(path.as_path())
        .await
        .map_err(|e| io_error("open", path, e))?;
    let name = path.file_name().to_string();

    let head = read_head(&mut file)
        .await
        .map_err(|e| io_error("read", path, e))?;

    Ok(FileData {
        mime_type: content_type::detect(&name, &head),
        size: meta.len(),
        name,
        file,
    })
}

/// Read up to [`SNIFF_LEN`] bytes, then rewind.
async fn read_head(file: &mut tokio::fs::File) -> std::io::Result<Vec<u8>> {
    let mut head = vec![0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < SNIFF_LEN {
        let n = file.read(&mut head[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    head.truncate(filled);
    file.seek(SeekFrom::Start(0)).await?;
    Ok(head)
}

/// Create a directory and any missing parents.
///
/// Fails with [`CoreError::Conflict`] if anything already exists at `path`.
pub async fn make_dir(path: &SandboxedPath) -> Result<(), CoreError> {
    if entry_kind(path).await.is_some() {
        return Err(CoreError::Conflict(format!(
            "Directory already exists: {}",
            path.as_str()
        )));
    }
    tokio::fs::create_dir_all(path.as_path())
        .await
        .map_err(|e| io_error("create directory", path, e))
}

/// Write `uploads` into the directory at `dir`, creating it first.
///
/// An existing directory is only an error when there is nothing to upload:
/// `POST` to an existing path with no files is a failed `mkdir`, with files
/// it is an upload into that directory. Existing files are overwritten.
///
/// Every file name and target is checked before anything is created, so a
/// rejected batch leaves the filesystem as it was.
pub async fn store(dir: &SandboxedPath, uploads: &[Upload]) -> Result<usize, CoreError> {
    let names = uploads
        .iter()
        .map(|u| sanitize_file_name(&u.file_name))
        .collect::<Result<Vec<_>, _>>()?;

    match entry_kind(dir).await {
        Some(EntryKind::File) => {
            return Err(CoreError::Conflict(format!(
                "Not a directory: {}",
                dir.as_str()
            )));
        }
        Some(EntryKind::Directory) => {
            if uploads.is_empty() {
                return Err(CoreError::Conflict(format!(
                    "Directory already exists: {}",
                    dir.as_str()
                )));
            }
            for name in &names {
                let target = dir.child(name);
                if entry_kind(&target).await == Some(EntryKind::Directory) {
                    return Err(CoreError::Conflict(format!(
                        "A directory exists at {}",
                        target.as_str()
                    )));
                }
            }
        }
        None => make_dir(dir).await?,
    }

    for (name, upload) in names.iter().zip(uploads) {
        let target = dir.child(name);
        tokio::fs::write(target.as_path(), &upload.bytes)
            .await
            .map_err(|e| io_error("write", &target, e))?;
    }

    Ok(uploads.len())
}

/// Delete a file, or a directory with everything under it.
///
/// The user's own directory can never be deleted, empty or not.
pub async fn remove(path: &SandboxedPath) -> Result<(), CoreError> {
    if path.is_root() {
        return Err(CoreError::InvalidRequest(
            "Cannot delete the root directory".into(),
        ));
    }

    match entry_kind(path).await {
        None => Err(CoreError::NotFound(format!(
            "File or directory not found: {}",
            path.as_str()
        ))),
        Some(EntryKind::Directory) => tokio::fs::remove_dir_all(path.as_path())
            .await
            .map_err(|e| io_error("delete", path, e)),
        Some(EntryKind::File) => tokio::fs::remove_file(path.as_path())
            .await
            .map_err(|e| io_error("delete", path, e)),
    }
}

/// Create the directory owned by `user_id` if it does not exist yet.
pub async fn ensure_user_root(sandbox: &Sandbox, user_id: DbId) -> Result<SandboxedPath, CoreError> {
    let root = sandbox.resolve(user_id, "")?;
    tokio::fs::create_dir_all(root.as_path())
        .await
        .map_err(|e| io_error("create directory", &root, e))?;
    Ok(root)
}
