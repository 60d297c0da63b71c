use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::exif;
use crate::model::ImageData;

pub const JPEG_MIME: &str = "image/jpeg";
/// Leading bytes read for content sniffing.
pub const DEFAULT_SNIFF_BYTES: usize = 12;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Scan task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Sniff the MIME type of a file from its leading bytes.
pub fn sniff_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

/// Lists the JPEG files of one directory (not recursive) and decodes them.
///
/// Entries qualify by content, never by extension: a file is a JPEG when its
/// leading bytes sniff as `image/jpeg`. Sub-directories, special files and
/// broken links are skipped. Results keep directory-listing order.
///
/// An empty directory path means "no directory" and yields empty results
/// without touching the filesystem.
#[derive(Debug, Clone)]
pub struct Scanner {
    sniff_bytes: usize,
}

impl Default for Scanner {
    fn default() -> Self {
        Self {
            sniff_bytes: DEFAULT_SNIFF_BYTES,
        }
    }
}

impl Scanner {
    pub fn new(sniff_bytes: usize) -> Self {
        Self {
            sniff_bytes: sniff_bytes.max(DEFAULT_SNIFF_BYTES),
        }
    }

    /// Paths of the JPEG files in `dir`.
    ///
    /// Failing to open `dir` is an error; failures on individual entries are
    /// logged and the entry is skipped.
    pub fn list_jpegs(&self, dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if dir.as_os_str().is_empty() {
            return Ok(Vec::new());
        }

        std::fs::read_dir(dir).map_err(|source| ScanError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry in {}: {e}", dir.display());
                    continue;
                }
            };
            if self.is_jpeg(entry.path()) {
                paths.push(entry.into_path());
            }
        }

        log::debug!("Found {} JPEG(s) in {}", paths.len(), dir.display());
        Ok(paths)
    }

    /// Regular file whose leading bytes sniff as JPEG.
    pub fn is_jpeg(&self, path: &Path) -> bool {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return false,
            Err(e) => {
                log::debug!("Cannot stat {}: {e}", path.display());
                return false;
            }
        }

        let mut head = Vec::with_capacity(self.sniff_bytes);
        let read = File::open(path).and_then(|f| f.take(self.sniff_bytes as u64).read_to_end(&mut head));
        if let Err(e) = read {
            log::warn!("Cannot read {}: {e}", path.display());
            return false;
        }

        sniff_type(&head) == Some(JPEG_MIME)
    }

    pub fn list_all_images(&self, dir: &Path) -> Result<Vec<ImageData>, ScanError> {
        let paths = self.list_jpegs(dir)?;
        Ok(decode_all(&paths))
    }

    /// Number of JPEGs in `dir`, without decoding any of them.
    pub fn count_images(&self, dir: &Path) -> Result<usize, ScanError> {
        Ok(self.list_jpegs(dir)?.len())
    }

    /// Decode only the slice `[page * page_size, page * page_size + page_size)`.
    pub fn list_images_page(
        &self,
        dir: &Path,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<ImageData>, ScanError> {
        let paths = self.list_jpegs(dir)?;
        let Some(start) = page.checked_mul(page_size) else {
            return Ok(Vec::new());
        };
        let slice: Vec<PathBuf> = paths.into_iter().skip(start).take(page_size).collect();
        Ok(decode_all(&slice))
    }
}

fn decode_all(paths: &[PathBuf]) -> Vec<ImageData> {
    paths
        .iter()
        .filter_map(|path| match exif::read_image(path) {
            Ok(image) => Some(image),
            Err(e) => {
                log::error!("Skipping {}: {e:#}", path.display());
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use std::fs;
    use tempfile::TempDir;

    /// 5 JPEGs (two with misleading extensions), 3 non-JPEGs, 2 sub-directories.
    fn populated_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let jpeg = fixtures::plain_jpeg();
        for name in ["a.jpg", "b.jpeg", "c.JPG", "disguised.png", "noext"] {
            fs::write(dir.path().join(name), &jpeg).unwrap();
        }
        fs::write(dir.path().join("fake.jpg"), b"not a jpeg at all").unwrap();
        fs::write(dir.path().join("real.png"), fixtures::png_bytes()).unwrap();
        fs::write(dir.path().join("empty.jpg"), b"").unwrap();
        fs::create_dir(dir.path().join("sub.jpg")).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("deep.jpg"), &jpeg).unwrap();
        dir
    }

    // ── sniff_type ───────────────────────────────────────────────────

    #[test]
    fn sniff_jpeg_and_png() {
        assert_eq!(sniff_type(&fixtures::plain_jpeg()), Some(JPEG_MIME));
        assert_eq!(sniff_type(&fixtures::png_bytes()), Some("image/png"));
        assert_eq!(sniff_type(b"hello"), None);
        assert_eq!(sniff_type(b""), None);
    }

    // ── list / count ─────────────────────────────────────────────────

    #[test]
    fn filters_by_content_not_extension() {
        let dir = populated_dir();
        let scanner = Scanner::default();

        let mut names: Vec<String> = scanner
            .list_jpegs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.jpg", "b.jpeg", "c.JPG", "disguised.png", "noext"]);
    }

    #[test]
    fn count_matches_list() {
        let dir = populated_dir();
        let scanner = Scanner::default();
        assert_eq!(scanner.count_images(dir.path()).unwrap(), 5);
        assert_eq!(scanner.list_all_images(dir.path()).unwrap().len(), 5);
    }

    #[test]
    fn empty_path_is_empty_result() {
        let scanner = Scanner::default();
        assert!(scanner.list_all_images(Path::new("")).unwrap().is_empty());
        assert_eq!(scanner.count_images(Path::new("")).unwrap(), 0);
        assert!(scanner.list_images_page(Path::new(""), 0, 10).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let scanner = Scanner::default();
        let err = scanner.list_all_images(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ScanError::ReadDir { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_followed_broken_links_skipped() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target.bin");
        fs::write(&target, fixtures::plain_jpeg()).unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("link.jpg")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("broken.jpg")).unwrap();

        assert_eq!(Scanner::default().count_images(dir.path()).unwrap(), 2);
    }

    #[test]
    fn corrupt_exif_is_listed_with_empty_fields() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.jpg"), fixtures::jpeg_with_corrupt_exif()).unwrap();
        let scanner = Scanner::default();

        let images = scanner.list_all_images(dir.path()).unwrap();
        assert_eq!(scanner.count_images(dir.path()).unwrap(), images.len());
        assert_eq!(images.len(), 1);
        assert!(images[0].exif.is_empty());
        assert!(!images[0].base64.is_empty());
    }

    // ── pagination ───────────────────────────────────────────────────

    #[test]
    fn pages_are_slices_of_the_full_list() {
        let dir = populated_dir();
        let scanner = Scanner::default();
        let all = scanner.list_all_images(dir.path()).unwrap();
        let n = all.len();

        for page_size in [1, 2, 3, 5, 7] {
            for page in 0..4 {
                let got = scanner.list_images_page(dir.path(), page, page_size).unwrap();
                let expected_len = n.saturating_sub(page * page_size).min(page_size);
                assert_eq!(got.len(), expected_len, "page {page} size {page_size}");

                let start = (page * page_size).min(n);
                let end = (start + page_size).min(n);
                let expected: Vec<_> = all[start..end].iter().map(|i| i.path.clone()).collect();
                let got: Vec<_> = got.iter().map(|i| i.path.clone()).collect();
                assert_eq!(got, expected);
            }
        }
    }

    #[test]
    fn page_overflow_is_empty() {
        let dir = populated_dir();
        let page = Scanner::default()
            .list_images_page(dir.path(), usize::MAX, 2)
            .unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn zero_page_size_is_empty() {
        let dir = populated_dir();
        assert!(Scanner::default().list_images_page(dir.path(), 0, 0).unwrap().is_empty());
    }
}
