//! On-disk layout of an index directory.
//!
//! Every build writes a fresh `v-<millis>/` database next to the previous
//! ones and then flips the `CURRENT` pointer file, so an index that is
//! already open keeps its files until [`prune_versions`] removes them.
//!
//! ```text
//! <index_dir>/
//!   CURRENT            -> "v-1730000000000"
//!   v-1729990000000/   (older build, still readable)
//!   v-1730000000000/   verses.lance, meta.lance
//! ```
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fasih_core::error::Error;

pub const CURRENT_FILE: &str = "CURRENT";
const CURRENT_TMP: &str = "CURRENT.tmp";
const VERSION_PREFIX: &str = "v-";

fn is_version_name(name: &str) -> bool {
	name.strip_prefix(VERSION_PREFIX)
		.is_some_and(|ts| !ts.is_empty() && ts.bytes().all(|b| b.is_ascii_digit()))
}

/// Make sure `index_dir` is either absent, empty, or one of ours. Anything
/// else is left alone and reported.
pub fn prepare_index_dir(index_dir: &Path) -> Result<()> {
	if index_dir.exists() {
		if !index_dir.is_dir() {
			return Err(Error::VectorStore(format!("{} is not a directory", index_dir.display())).into());
		}
		for entry in fs::read_dir(index_dir).with_context(|| format!("reading {}", index_dir.display()))? {
			let name = entry?.file_name();
			let name = name.to_string_lossy();
			if name != CURRENT_FILE && name != CURRENT_TMP && !is_version_name(&name) {
				return Err(Error::VectorStore(format!(
					"refusing to build into {}: it holds '{name}', which is not part of a semantic index",
					index_dir.display()
				))
				.into());
			}
		}
	}
	fs::create_dir_all(index_dir).with_context(|| format!("creating {}", index_dir.display()))?;
	Ok(())
}

/// Create an unused `v-<millis>` directory under `index_dir`.
pub fn create_version_dir(index_dir: &Path) -> Result<PathBuf> {
	let mut stamp = Utc::now().timestamp_millis();
	loop {
		let dir = index_dir.join(format!("{VERSION_PREFIX}{stamp}"));
		match fs::create_dir(&dir) {
			Ok(()) => return Ok(dir),
			Err(e) if e.kind() == ErrorKind::AlreadyExists => stamp += 1,
			Err(e) => return Err(e).with_context(|| format!("creating {}", dir.display())),
		}
	}
}

/// Point `CURRENT` at `version_dir`. Write-then-rename, so readers see the old
/// or the new pointer and never a torn one.
pub fn publish_version(index_dir: &Path, version_dir: &Path) -> Result<()> {
	let name = version_dir
		.file_name()
		.map(|n| n.to_string_lossy().to_string())
		.filter(|n| is_version_name(n))
		.ok_or_else(|| Error::VectorStore(format!("{} is not a version directory", version_dir.display())))?;
	let tmp = index_dir.join(CURRENT_TMP);
	fs::write(&tmp, &name).with_context(|| format!("writing {}", tmp.display()))?;
	fs::rename(&tmp, index_dir.join(CURRENT_FILE)).with_context(|| format!("publishing {name}"))?;
	Ok(())
}

/// The published version directory, or `None` when nothing was ever published.
pub fn current_version(index_dir: &Path) -> Result<Option<PathBuf>> {
	let pointer = index_dir.join(CURRENT_FILE);
	let name = match fs::read_to_string(&pointer) {
		Ok(name) => name.trim().to_string(),
		Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
		Err(e) => return Err(e).with_context(|| format!("reading {}", pointer.display())),
	};
	if !is_version_name(&name) {
		return Err(Error::VectorStore(format!("{} names '{name}', not a version", pointer.display())).into());
	}
	let dir = index_dir.join(name);
	Ok(dir.is_dir().then_some(dir))
}

/// Delete every version except the published one. Call once no retriever
/// opened from an older version is still in use.
pub fn prune_versions(index_dir: &Path) -> Result<usize> {
	let Some(current) = current_version(index_dir)? else {
		return Ok(0);
	};
	let mut removed = 0;
	for entry in fs::read_dir(index_dir).with_context(|| format!("reading {}", index_dir.display()))? {
		let path = entry?.path();
		let is_stale = path.is_dir()
			&& path != current
			&& path.file_name().is_some_and(|n| is_version_name(&n.to_string_lossy()));
		if is_stale {
			fs::remove_dir_all(&path).with_context(|| format!("removing {}", path.display()))?;
			tracing::debug!(path = %path.display(), "pruned index version");
			removed += 1;
		}
	}
	Ok(removed)
}
