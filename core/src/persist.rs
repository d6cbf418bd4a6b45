use crate::config::MatchConfig;
use crate::error::{MatchError, Result, StateError};
use crate::index::RelevanceIndex;
use crate::matcher::MatchResult;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: usize,
    pub created_at: String,
    pub version: u32,
    pub corpus_fingerprint: String,
    pub config: MatchConfig,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn index(&self) -> PathBuf { self.root.join("index.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn matches(&self) -> PathBuf { self.root.join("matches.json") }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut f = File::create(path).map_err(|e| MatchError::io(path, e))?;
    f.write_all(bytes).map_err(|e| MatchError::io(path, e))
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    let mut f = File::open(path).map_err(|e| MatchError::io(path, e))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).map_err(|e| MatchError::io(path, e))?;
    Ok(buf)
}

fn ensure_root(paths: &IndexPaths) -> Result<()> {
    create_dir_all(&paths.root).map_err(|e| MatchError::io(&paths.root, e))
}

pub fn save_index(paths: &IndexPaths, index: &RelevanceIndex) -> Result<()> {
    ensure_root(paths)?;
    let bytes = bincode::serialize(index)?;
    write_file(&paths.index(), &bytes)
}

/// Load the index snapshot, refusing versions this build does not understand.
pub fn load_index(paths: &IndexPaths) -> Result<RelevanceIndex> {
    let meta = load_meta(paths)?;
    if meta.version != SNAPSHOT_VERSION {
        return Err(StateError::SnapshotVersion { expected: SNAPSHOT_VERSION, found: meta.version }.into());
    }
    let buf = read_file(&paths.index())?;
    let index: RelevanceIndex = bincode::deserialize(&buf)?;
    Ok(index)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    ensure_root(paths)?;
    let json = serde_json::to_string_pretty(meta)?;
    write_file(&paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let buf = read_file(&paths.meta())?;
    let meta: MetaFile = serde_json::from_slice(&buf)?;
    Ok(meta)
}

/// Write the hand-off JSON for the explanation stage.
pub fn save_matches(path: &Path, result: &MatchResult<'_>, include_scores: bool) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir).map_err(|e| MatchError::io(dir, e))?;
    }
    let json = serde_json::to_string_pretty(&result.handoff(include_scores)?)?;
    write_file(path, json.as_bytes())
}
