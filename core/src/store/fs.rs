//! Filesystem-backed object store: `<root>/<bucket>/<key>`.
//!
//! Bodies are written to a hidden temp file beside the target and then
//! moved into place, so readers never observe a half-written artifact.

use super::{validate_key, ObjectStore};
use crate::{error::PipelineResult, types::ObjectKey};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct FsObjectStore {
    bucket_dir: PathBuf,
    bucket: String,
}

impl FsObjectStore {
    /// Open (creating if needed) the bucket directory under `root`.
    pub fn open(root: impl AsRef<Path>, bucket: &str) -> PipelineResult<Self> {
        let bucket_dir = root.as_ref().join(bucket);
        fs::create_dir_all(&bucket_dir)?;
        Ok(Self {
            bucket_dir,
            bucket: bucket.to_string(),
        })
    }

    pub fn bucket_dir(&self) -> &Path {
        &self.bucket_dir
    }

    fn path_for(&self, key: &str) -> PipelineResult<PathBuf> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.bucket_dir.clone(), |p, seg| p.join(seg)))
    }

    /// Write the body to a fresh temp file next to `target`.
    fn stage_temp(&self, target: &Path, body: &[u8]) -> PipelineResult<PathBuf> {
        let dir = target.parent().unwrap_or(&self.bucket_dir);
        fs::create_dir_all(dir)?;
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = dir.join(format!(
            ".{name}.tmp-{}-{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let mut file = fs::File::create(&temp)?;
        file.write_all(body)?;
        file.sync_all()?;
        Ok(temp)
    }

    fn collect_keys(&self, dir: &Path, prefix: &str, out: &mut Vec<ObjectKey>) -> PipelineResult<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                self.collect_keys(&path, prefix, out)?;
                continue;
            }
            let Ok(rel) = path.strip_prefix(&self.bucket_dir) else {
                continue;
            };
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            if key.starts_with(prefix) {
                out.push(key);
            }
        }
        Ok(())
    }
}

impl ObjectStore for FsObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn put(&self, key: &str, body: &[u8]) -> PipelineResult<()> {
        let target = self.path_for(key)?;
        let temp = self.stage_temp(&target, body)?;
        if let Err(e) = fs::rename(&temp, &target) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    fn put_if_absent(&self, key: &str, body: &[u8]) -> PipelineResult<bool> {
        let target = self.path_for(key)?;
        let temp = self.stage_temp(&target, body)?;
        // hard_link fails if the target exists, which makes the publish
        // step an atomic create-if-absent.
        let linked = fs::hard_link(&temp, &target);
        let _ = fs::remove_file(&temp);
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, key: &str) -> PipelineResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, prefix: &str) -> PipelineResult<Vec<ObjectKey>> {
        let mut keys = Vec::new();
        self.collect_keys(&self.bucket_dir, prefix, &mut keys)?;
        keys.sort();
        Ok(keys)
    }
}
