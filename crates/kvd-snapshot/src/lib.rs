//! Atomic on-disk storage for recurrent-state snapshots and sampling
//! profiles (spec.md §4.2, §6).
//!
//! Both file kinds are written to a sibling temp path and renamed into
//! place, so a reader never observes a torn file (spec.md §5).

use std::io::{Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use kvd_domain::error::{Error, Result};
use kvd_sampling::SamplingProfile;

/// Magic bytes identifying the snapshot wire format (spec.md §6).
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"SNP1";

/// A captured recurrent state: the model's opaque blob plus the token
/// count it represents (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrentStateSnapshot {
    pub blob: Vec<u8>,
    pub token_count: u64,
}

/// Write `bytes` to a temp file under the same directory as `path`, then
/// rename it into place. Returns the final file size.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<usize> {
    let tmp = tmp_path(path);
    {
        let mut f = std::fs::File::create(&tmp).map_err(Error::Io)?;
        f.write_all(bytes).map_err(Error::Io)?;
        f.sync_all().ok();
    }
    std::fs::rename(&tmp, path).map_err(Error::Io)?;
    Ok(bytes.len())
}

fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Persist a snapshot atomically. Returns the bytes written (spec.md
/// `/save` reply includes this count).
pub fn save_state(snapshot: &RecurrentStateSnapshot, path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    let token_count: u32 = snapshot
        .token_count
        .try_into()
        .map_err(|_| Error::Snapshot("token_count exceeds u32 range".into()))?;

    let mut buf = Vec::with_capacity(4 + 4 + 8 + snapshot.blob.len());
    buf.extend_from_slice(SNAPSHOT_MAGIC);
    buf.write_u32::<BigEndian>(token_count).map_err(Error::Io)?;
    buf.write_u64::<BigEndian>(snapshot.blob.len() as u64)
        .map_err(Error::Io)?;
    buf.extend_from_slice(&snapshot.blob);

    write_atomic(path, &buf)
        .map_err(|e| Error::Snapshot(format!("writing {}: {e}", path.display())))
}

/// Load a snapshot previously written by [`save_state`].
pub fn load_state(path: impl AsRef<Path>) -> Result<RecurrentStateSnapshot> {
    let path = path.as_ref();
    let mut f = std::fs::File::open(path)
        .map_err(|e| Error::Snapshot(format!("opening {}: {e}", path.display())))?;

    let mut magic = [0u8; 4];
    f.read_exact(&mut magic)
        .map_err(|_| Error::Snapshot("short read: missing magic header".into()))?;
    if &magic != SNAPSHOT_MAGIC {
        return Err(Error::Snapshot(format!(
            "bad magic: expected {:?}, got {:?}",
            SNAPSHOT_MAGIC, magic
        )));
    }

    let token_count = f
        .read_u32::<BigEndian>()
        .map_err(|_| Error::Snapshot("short read: missing token_count".into()))?;
    let blob_len = f
        .read_u64::<BigEndian>()
        .map_err(|_| Error::Snapshot("short read: missing blob length".into()))?;

    let mut blob = vec![0u8; blob_len as usize];
    f.read_exact(&mut blob)
        .map_err(|_| Error::Snapshot("short read: blob truncated".into()))?;

    Ok(RecurrentStateSnapshot {
        blob,
        token_count: token_count as u64,
    })
}

/// Persist a sampling profile as compact JSON (spec.md §4.2, §6).
pub fn save_profile(profile: SamplingProfile, path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    let json = profile.to_json()?;
    write_atomic(path, json.as_bytes())
        .map_err(|e| Error::Profile(format!("writing {}: {e}", path.display())))
}

/// Load a sampling profile from JSON, falling back to RWKV defaults for
/// any missing field (spec.md §4.2).
pub fn load_profile(path: impl AsRef<Path>) -> Result<SamplingProfile> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Profile(format!("opening {}: {e}", path.display())))?;
    SamplingProfile::from_json(&text)
        .map_err(|e| Error::Profile(format!("parsing {}: {e}", path.display())))
}
