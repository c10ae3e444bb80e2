//! Binary vector file format.
//!
//! # File Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (64 bytes)                                       │
//! ├─────────────────────────────────────────────────────────┤
//! │ Magic: "TRIALVEC" (8 bytes)                             │
//! │ Version: u32                                            │
//! │ Dimensionality: u32                                     │
//! │ Count: u64                                              │
//! │ Metric: u8 (0 = squared euclidean, 1 = cosine)          │
//! │ Reserved: [u8; 39]                                      │
//! ├─────────────────────────────────────────────────────────┤
//! │ Vectors: [[f32; dim]; count], little-endian             │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The file length must be exactly `64 + count * dim * 4`; anything else is
//! reported as `StoreCorrupt`.

use crate::index::{DistanceMetric, SimilarityIndex};
use crate::types::error::{IndexError, Result};
use memmap2::MmapOptions;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Magic number for file format validation.
const MAGIC: &[u8; 8] = b"TRIALVEC";

/// Current file format version.
const VERSION: u32 = 1;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 64;

/// Vector file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    magic: [u8; 8],
    version: u32,
    dim: u32,
    count: u64,
    metric: u8,
}

impl Header {
    fn new(dim: u32, count: u64, metric: DistanceMetric) -> Self {
        Self {
            magic: *MAGIC,
            version: VERSION,
            dim,
            count,
            metric: metric.to_tag(),
        }
    }

    fn validate(&self) -> Result<()> {
        if &self.magic != MAGIC {
            return Err(IndexError::corrupt(format!(
                "Invalid magic bytes: expected {:?}, got {:?}",
                MAGIC, self.magic
            )));
        }

        if self.version != VERSION {
            return Err(IndexError::corrupt(format!(
                "Unsupported version: expected {}, got {}",
                VERSION, self.version
            )));
        }

        Ok(())
    }

    fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..8].copy_from_slice(&self.magic);
        bytes[8..12].copy_from_slice(&self.version.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.dim.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.count.to_le_bytes());
        bytes[24] = self.metric;
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(IndexError::corrupt("File too small for header"));
        }

        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[0..8]);
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[8..12]);
        let mut dim = [0u8; 4];
        dim.copy_from_slice(&bytes[12..16]);
        let mut count = [0u8; 8];
        count.copy_from_slice(&bytes[16..24]);

        let header = Self {
            magic,
            version: u32::from_le_bytes(version),
            dim: u32::from_le_bytes(dim),
            count: u64::from_le_bytes(count),
            metric: bytes[24],
        };

        header.validate()?;
        Ok(header)
    }
}

/// Write all vectors of `index` to `path` and fsync.
///
/// # Errors
///
/// Returns `IndexError::Io` if file I/O fails
pub fn write_vectors(path: &Path, index: &SimilarityIndex) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let header = Header::new(index.dimension() as u32, index.len() as u64, index.metric());
    writer.write_all(&header.to_bytes())?;

    for value in index.as_slice() {
        writer.write_all(&value.to_le_bytes())?;
    }

    writer.flush()?;
    let file = writer.into_inner().map_err(|e| IndexError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}

/// Read a vector file back into a [`SimilarityIndex`].
///
/// # Errors
///
/// Returns `IndexError::StoreCorrupt` if the file cannot be opened, has an invalid
/// header, or its length disagrees with the header
pub fn read_vectors(path: &Path) -> Result<SimilarityIndex> {
    let file = File::open(path)
        .map_err(|e| IndexError::corrupt(format!("Failed to open {}: {}", path.display(), e)))?;

    let file_len = file
        .metadata()
        .map_err(|e| IndexError::corrupt(format!("Failed to stat {}: {}", path.display(), e)))?
        .len() as usize;
    if file_len < HEADER_SIZE {
        return Err(IndexError::corrupt(format!(
            "{} is {} bytes, smaller than the header",
            path.display(),
            file_len
        )));
    }

    // Safety: the file lives in a generation directory that is never rewritten
    // after its manifest is published.
    let mmap = unsafe {
        MmapOptions::new()
            .map(&file)
            .map_err(|e| IndexError::corrupt(format!("Failed to memory map file: {}", e)))?
    };

    let header = Header::from_bytes(&mmap[..HEADER_SIZE])?;
    let metric = DistanceMetric::from_tag(header.metric)
        .ok_or_else(|| IndexError::corrupt(format!("Unknown metric tag {}", header.metric)))?;

    let dim = header.dim as usize;
    let expected_len = (header.count as usize)
        .checked_mul(dim)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(HEADER_SIZE))
        .ok_or_else(|| IndexError::corrupt("Header count overflows"))?;
    if mmap.len() != expected_len {
        return Err(IndexError::corrupt(format!(
            "Header declares {} vectors of dim {} ({} bytes) but file has {} bytes",
            header.count,
            dim,
            expected_len,
            mmap.len()
        )));
    }

    let data: Vec<f32> = mmap[HEADER_SIZE..]
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    SimilarityIndex::from_raw(dim, metric, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_index() -> SimilarityIndex {
        let mut index = SimilarityIndex::new(3);
        index
            .insert(&[vec![1.0, 0.0, -0.5], vec![0.25, f32::MIN_POSITIVE, 3.5]])
            .unwrap();
        index
    }

    #[test]
    fn test_header_roundtrip() {
        let header = Header::new(384, 2, DistanceMetric::Cosine);
        let parsed = Header::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_vectors_roundtrip_bit_exact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectors.bin");
        let index = sample_index();

        write_vectors(&path, &index).unwrap();
        assert_eq!(
            std::fs::metadata(&path).unwrap().len() as usize,
            HEADER_SIZE + 2 * 3 * 4
        );

        let loaded = read_vectors(&path).unwrap();
        assert_eq!(loaded, index);
    }

    #[test]
    fn test_empty_index_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectors.bin");
        let index = SimilarityIndex::new(8);

        write_vectors(&path, &index).unwrap();
        let loaded = read_vectors(&path).unwrap();
        assert_eq!(loaded.dimension(), 8);
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_truncated_file_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectors.bin");
        write_vectors(&path, &sample_index()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

        assert!(matches!(read_vectors(&path), Err(IndexError::StoreCorrupt(_))));
    }

    #[test]
    fn test_bad_magic_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectors.bin");
        write_vectors(&path, &sample_index()).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] = b'X';
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(read_vectors(&path), Err(IndexError::StoreCorrupt(_))));
    }

    #[test]
    fn test_missing_file_is_corrupt() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            read_vectors(&dir.path().join("nope.bin")),
            Err(IndexError::StoreCorrupt(_))
        ));
    }
}
