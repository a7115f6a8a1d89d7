use std::path::{Path, PathBuf};

use rand::distributions::Alphanumeric;
use rand::Rng;

/// How many `-NN` numeric suffixes are tried before falling back.
const NUMERIC_TRIALS: usize = 100;
/// How many random alphanumeric suffixes are tried before giving up.
const ALPHANUMERIC_TRIALS: usize = 5;
const SUFFIX_LEN: usize = 2;

/// Derives a path that does not exist on disk yet from `path`.
///
/// A non-existing input comes back unchanged. Otherwise a `-NN` suffix is
/// appended to the file stem (an existing numeric suffix is stripped first
/// and counting resumes from it, wrapping modulo [`NUMERIC_TRIALS`]); when
/// every numeric candidate is taken, a few random alphanumeric suffixes
/// are tried. Returns `None` when everything collides.
pub fn unique_path(path: &Path) -> Option<PathBuf> {
    if !path.exists() {
        return Some(path.to_path_buf());
    }
    let stem = path.file_stem()?.to_string_lossy().into_owned();
    let (base, start) = split_numeric_suffix(&stem);

    for trial in 0..NUMERIC_TRIALS {
        let number = (start + trial) % NUMERIC_TRIALS;
        let candidate = with_stem_suffix(path, &base, &format!("{number:02}"));
        if !candidate.exists() {
            return Some(candidate);
        }
    }

    let mut rng = rand::thread_rng();
    for _ in 0..ALPHANUMERIC_TRIALS {
        let suffix: String = (&mut rng)
            .sample_iter(Alphanumeric)
            .take(SUFFIX_LEN)
            .map(char::from)
            .collect();
        let candidate = with_stem_suffix(path, &base, &suffix);
        if !candidate.exists() {
            return Some(candidate);
        }
    }

    None
}

/// Splits a trailing `-NN` counter off the stem so repeated collisions do
/// not stack suffixes ("clip-03" -> ("clip", 3)).
fn split_numeric_suffix(stem: &str) -> (String, usize) {
    if let Some((base, digits)) = stem.rsplit_once('-') {
        if !base.is_empty() && !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(number) = digits.parse::<usize>() {
                return (base.to_string(), number % NUMERIC_TRIALS);
            }
        }
    }
    (stem.to_string(), 0)
}

fn with_stem_suffix(path: &Path, base: &str, suffix: &str) -> PathBuf {
    let mut name = format!("{base}-{suffix}");
    if let Some(extension) = path.extension() {
        name.push('.');
        name.push_str(&extension.to_string_lossy());
    }
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_missing_path_is_returned_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        assert_eq!(unique_path(&path), Some(path));
    }

    #[test]
    fn test_existing_path_gets_numeric_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        touch(&path);

        let unique = unique_path(&path).unwrap();

        assert_eq!(unique, dir.path().join("out-00.mp4"));
        assert!(!unique.exists());
    }

    #[test]
    fn test_counting_resumes_after_existing_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip-03.mp4");
        touch(&path);

        let unique = unique_path(&path).unwrap();

        // "clip-03" is the colliding input itself, so the next free
        // candidate is taken.
        assert_eq!(unique, dir.path().join("clip-04.mp4"));
    }

    #[test]
    fn test_suffix_does_not_stack() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take-99.mp4");
        touch(&path);

        let unique = unique_path(&path).unwrap();

        // The counter wraps instead of producing "take-99-00".
        assert_eq!(unique, dir.path().join("take-00.mp4"));
    }

    #[test]
    fn test_extension_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        touch(&path);

        let unique = unique_path(&path).unwrap();

        assert_eq!(unique.extension().unwrap(), "gif");
    }

    #[test]
    fn test_skips_taken_numeric_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        touch(&path);
        touch(&dir.path().join("out-00.mp4"));
        touch(&dir.path().join("out-01.mp4"));

        let unique = unique_path(&path).unwrap();

        assert_eq!(unique, dir.path().join("out-02.mp4"));
    }

    #[test]
    fn test_alphanumeric_fallback_when_counters_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("full.bin");
        touch(&path);
        for number in 0..100 {
            touch(&dir.path().join(format!("full-{number:02}.bin")));
        }

        let unique = unique_path(&path).unwrap();

        assert!(!unique.exists());
        let stem = unique.file_stem().unwrap().to_string_lossy().into_owned();
        let suffix = stem.rsplit_once('-').unwrap().1.to_string();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
