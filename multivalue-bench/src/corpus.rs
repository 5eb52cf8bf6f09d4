//! Key corpus sources: a binary file of little-endian `u32` keys, or a
//! deterministic synthetic corpus with a fixed duplicate multiplicity.

use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::BenchError;

const KEY_BYTES: usize = std::mem::size_of::<u32>();

/// Read a key corpus file. The file length must be a multiple of 4 bytes.
pub fn load_keys(path: &Path) -> Result<Vec<u32>, BenchError> {
    let bytes = fs::read(path).map_err(|source| BenchError::CorpusIo {
        path: path.to_path_buf(),
        source,
    })?;

    if bytes.len() % KEY_BYTES != 0 {
        return Err(BenchError::CorpusFormat {
            path: path.to_path_buf(),
            len: bytes.len(),
        });
    }

    let keys: Vec<u32> = bytes
        .chunks_exact(KEY_BYTES)
        .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
        .collect();

    tracing::info!(path = %path.display(), keys = keys.len(), "loaded key corpus");
    Ok(keys)
}

/// Write keys in the format [`load_keys`] reads.
pub fn write_keys(path: &Path, keys: &[u32]) -> std::io::Result<()> {
    let bytes: Vec<u8> = keys.iter().flat_map(|k| k.to_le_bytes()).collect();
    fs::write(path, bytes)
}

/// Keys `1..=distinct`, each repeated `multiplicity` times in a row.
///
/// Zero is never produced; it is the table's empty-slot marker.
pub fn synthetic_keys(distinct: u32, multiplicity: usize) -> Vec<u32> {
    let mut keys = Vec::with_capacity(distinct as usize * multiplicity);
    for key in 1..=distinct {
        keys.extend(std::iter::repeat(key).take(multiplicity));
    }
    keys
}

/// Deterministic in-place shuffle, so any prefix samples the whole key range.
pub fn shuffle(keys: &mut [u32], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    keys.shuffle(&mut rng);
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn test_synthetic_multiplicity() {
        let keys = synthetic_keys(100, 8);
        assert_eq!(keys.len(), 800);
        assert_eq!(&keys[..9], &[1, 1, 1, 1, 1, 1, 1, 1, 2]);

        let mut counts: HashMap<u32, usize> = HashMap::new();
        for k in &keys {
            *counts.entry(*k).or_default() += 1;
        }
        assert_eq!(counts.len(), 100);
        assert!(counts.values().all(|&c| c == 8));
        assert!(!counts.contains_key(&0));
    }

    #[test]
    fn test_shuffle_is_deterministic_permutation() {
        let mut a = synthetic_keys(1000, 4);
        let mut b = a.clone();
        shuffle(&mut a, 42);
        shuffle(&mut b, 42);
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, synthetic_keys(1000, 4));
        assert_ne!(a, synthetic_keys(1000, 4));
    }

    #[test]
    fn test_load_round_trips_little_endian() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1, 0, 0, 0, 0x78, 0x56, 0x34, 0x12]).unwrap();
        file.flush().unwrap();

        let keys = load_keys(file.path()).unwrap();
        assert_eq!(keys, vec![1, 0x1234_5678]);

        write_keys(file.path(), &[9, 10, 11]).unwrap();
        assert_eq!(load_keys(file.path()).unwrap(), vec![9, 10, 11]);
    }

    #[test]
    fn test_partial_word_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1, 0, 0, 0, 2, 0]).unwrap();
        file.flush().unwrap();

        match load_keys(file.path()) {
            Err(BenchError::CorpusFormat { len, .. }) => assert_eq!(len, 6),
            other => panic!("expected CorpusFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_keys(&dir.path().join("absent.bin"));
        assert!(matches!(result, Err(BenchError::CorpusIo { .. })));
    }
}
