//! Snapshot file format:
//!
//! ```text
//! magic "CRMG" | version u32 LE | gzip(bincode(GraphSnapshot))
//! ```
//!
//! Writes go to a sibling temp file that is renamed into place, so a reader
//! never sees a half-written snapshot.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::error::StoreError;
use crate::graph::KnowledgeGraph;
use crate::graph::index::GraphSnapshot;

use super::StoreResult;

const MAGIC: &[u8; 4] = b"CRMG";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 2;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `graph` to `path`, replacing any previous snapshot.
pub fn save_snapshot(graph: &KnowledgeGraph, path: &Path) -> StoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let tmp = temp_path(path);
    {
        let file = File::create(&tmp).map_err(io_error(&tmp))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(MAGIC).map_err(io_error(&tmp))?;
        writer
            .write_all(&SNAPSHOT_VERSION.to_le_bytes())
            .map_err(io_error(&tmp))?;
        let mut encoder = GzEncoder::new(writer, Compression::default());
        bincode::serialize_into(&mut encoder, &graph.to_snapshot()).map_err(|e| {
            StoreError::Serialization {
                message: format!("failed to encode snapshot: {e}"),
            }
        })?;
        let mut writer = encoder.finish().map_err(io_error(&tmp))?;
        writer.flush().map_err(io_error(&tmp))?;
    }
    fs::rename(&tmp, path).map_err(io_error(path))?;
    tracing::info!(
        path = %path.display(),
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "saved snapshot"
    );
    Ok(())
}

/// Read a snapshot and rebuild the graph with all of its indexes.
pub fn load_snapshot(path: &Path) -> StoreResult<KnowledgeGraph> {
    let file = File::open(path).map_err(io_error(path))?;
    let mut reader = BufReader::new(file);

    let mut header = [0u8; 8];
    reader.read_exact(&mut header).map_err(|_| StoreError::Serialization {
        message: format!("{} is too short to be a snapshot", path.display()),
    })?;
    if &header[..4] != MAGIC {
        return Err(StoreError::Serialization {
            message: format!("{} is not a graph snapshot", path.display()),
        });
    }
    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != SNAPSHOT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: version,
            expected: SNAPSHOT_VERSION,
        });
    }

    let snapshot: GraphSnapshot =
        bincode::deserialize_from(GzDecoder::new(reader)).map_err(|e| StoreError::Serialization {
            message: format!("failed to decode snapshot: {e}"),
        })?;
    let graph = KnowledgeGraph::from_snapshot(snapshot).map_err(|e| StoreError::Serialization {
        message: e.to_string(),
    })?;
    tracing::info!(
        path = %path.display(),
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "loaded snapshot"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RdfTriple;

    #[test]
    fn temp_path_is_sibling() {
        let tmp = temp_path(Path::new("/data/graph.snap"));
        assert_eq!(tmp, PathBuf::from("/data/graph.snap.tmp"));
    }

    #[test]
    fn rejects_foreign_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bogus.snap");
        fs::write(&path, b"NOPE\x01\x00\x00\x00rest").unwrap();
        assert!(matches!(load_snapshot(&path), Err(StoreError::Serialization { .. })));
        fs::write(&path, b"CRM").unwrap();
        assert!(matches!(load_snapshot(&path), Err(StoreError::Serialization { .. })));
    }

    #[test]
    fn rejects_other_versions() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("graph.snap");
        let mut kg = KnowledgeGraph::new();
        kg.add_triples(&[RdfTriple::new("urn:a", "urn:p/rel", "urn:b")]);
        save_snapshot(&kg, &path).unwrap();
        let mut bytes = fs::read(&path).unwrap();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        fs::write(&path, bytes).unwrap();
        assert!(matches!(
            load_snapshot(&path),
            Err(StoreError::UnsupportedVersion { found: 99, expected: SNAPSHOT_VERSION })
        ));
    }
}
