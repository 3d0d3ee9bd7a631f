use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model file not found: {0}")]
    Missing(PathBuf),
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

const DOWNLOAD_CHUNK: usize = 1024 * 1024;

/// Resolve a model file by name.
///
/// Order: user cache directory, bundled directory, then download into the cache.
pub fn resolve(
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(&model_cache_dir()?, name, url, bundled_dir, progress)
}

/// Same as [`resolve`] with an explicit cache directory.
pub fn resolve_in(
    cache_dir: &Path,
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    if let Some(bundled_path) = bundled_dir.map(|d| d.join(name)) {
        if bundled_path.exists() {
            return Ok(bundled_path);
        }
    }

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {name} from {url}");
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Accepts a user-supplied model path as-is, failing early if it is missing.
pub fn explicit(path: &Path) -> Result<PathBuf, ModelResolveError> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(ModelResolveError::Missing(path.to_path_buf()))
    }
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/facedetect/models/`
/// - Linux: `$XDG_CACHE_HOME/facedetect/models/` or `~/.cache/facedetect/models/`
/// - Windows: `%LOCALAPPDATA%/facedetect/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join("facedetect").join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let download_err = |source| ModelResolveError::Download {
        url: url.to_string(),
        source,
    };
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(download_err)?;
    let total = response.content_length().unwrap_or(0);

    // Written to a sibling file and renamed, so a failed download leaves nothing behind.
    let temp_path = dest.with_extension("part");
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ModelResolveError::Write { path, source }
    };
    let mut file = fs::File::create(&temp_path).map_err(write_err(&temp_path))?;

    let mut chunk = vec![0u8; DOWNLOAD_CHUNK];
    let mut downloaded: u64 = 0;
    loop {
        let n = match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&temp_path);
                return Err(write_err(&temp_path)(e));
            }
        };
        file.write_all(&chunk[..n])
            .map_err(write_err(&temp_path))?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err(&temp_path))?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(write_err(dest))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BAD_URL: &str = "http://invalid.nonexistent.example.com/model.onnx";

    #[test]
    fn test_resolve_in_prefers_cached_file() {
        let tmp = TempDir::new().unwrap();
        let cached = tmp.path().join("model.onnx");
        fs::write(&cached, b"cached").unwrap();

        let resolved = resolve_in(tmp.path(), "model.onnx", BAD_URL, None, None).unwrap();
        assert_eq!(resolved, cached);
    }

    #[test]
    fn test_resolve_in_falls_back_to_bundled() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("model.onnx"), b"bundled").unwrap();

        let resolved = resolve_in(&cache, "model.onnx", BAD_URL, Some(&bundled), None).unwrap();
        assert_eq!(resolved, bundled.join("model.onnx"));
        assert!(!cache.exists());
    }

    #[test]
    fn test_resolve_in_download_failure_leaves_no_files() {
        let tmp = TempDir::new().unwrap();
        let result = resolve_in(tmp.path(), "model.onnx", BAD_URL, None, None);
        assert!(matches!(result, Err(ModelResolveError::Download { .. })));
        assert!(!tmp.path().join("model.onnx").exists());
        assert!(!tmp.path().join("model.part").exists());
    }

    #[test]
    fn test_explicit_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.onnx");
        fs::write(&path, b"model").unwrap();
        assert_eq!(explicit(&path).unwrap(), path);
    }

    #[test]
    fn test_explicit_missing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.onnx");
        assert!(matches!(explicit(&path), Err(ModelResolveError::Missing(p)) if p == path));
    }

    #[test]
    fn test_model_cache_dir_names_project() {
        if let Ok(path) = model_cache_dir() {
            assert!(path.ends_with("facedetect/models"));
        }
    }
}
