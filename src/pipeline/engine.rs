//! Rendering engine provisioning: locate or fetch libpdfium and bind to it.
//!
//! Resolution order, first hit wins:
//!
//! 1. `PDFIUM_LIB_PATH` pointing at an existing library file
//! 2. a pdfium already installed system-wide
//! 3. the per-user cache (`~/.cache/roadmap-audit/pdfium-{RELEASE}/`)
//! 4. download the platform archive from bblanchon/pdfium-binaries into the cache
//!
//! Any failure along the way is [`AuditError::RenderingUnavailable`], which the
//! boundary reports as a transient infrastructure problem rather than a bad
//! document.

use crate::error::AuditError;
use pdfium_render::prelude::Pdfium;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// pdfium-binaries release tag (`chromium/{RELEASE}`).
pub const PDFIUM_RELEASE: &str = "7690";

const RELEASE_BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Library path resolved earlier in this process.
static LIBRARY_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Asset layout of one platform build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlatformAsset {
    archive: &'static str,
    member: &'static str,
    file_name: &'static str,
}

fn platform_asset(os: &str, arch: &str) -> Option<PlatformAsset> {
    let (archive, member, file_name) = match (os, arch) {
        ("macos", "aarch64") => ("pdfium-mac-arm64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
        ("macos", "x86_64") => ("pdfium-mac-x64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
        ("linux", "x86_64") => ("pdfium-linux-x64.tgz", "lib/libpdfium.so", "libpdfium.so"),
        ("linux", "aarch64") => ("pdfium-linux-arm64.tgz", "lib/libpdfium.so", "libpdfium.so"),
        ("windows", "x86_64") => ("pdfium-win-x64.tgz", "bin/pdfium.dll", "pdfium.dll"),
        ("windows", "aarch64") => ("pdfium-win-arm64.tgz", "bin/pdfium.dll", "pdfium.dll"),
        _ => return None,
    };
    Some(PlatformAsset {
        archive,
        member,
        file_name,
    })
}

fn current_asset() -> Result<PlatformAsset, AuditError> {
    let (os, arch) = (std::env::consts::OS, std::env::consts::ARCH);
    platform_asset(os, arch).ok_or_else(|| {
        AuditError::RenderingUnavailable(format!("no prebuilt pdfium for {os}/{arch}"))
    })
}

/// Directory holding the cached library.
///
/// `ROADMAP_AUDIT_PDFIUM_CACHE` overrides the platform cache directory.
pub fn cache_dir() -> PathBuf {
    let base = std::env::var_os("ROADMAP_AUDIT_PDFIUM_CACHE")
        .map(PathBuf::from)
        .or_else(|| dirs::cache_dir().map(|d| d.join("roadmap-audit")))
        .unwrap_or_else(|| std::env::temp_dir().join("roadmap-audit"));
    base.join(format!("pdfium-{PDFIUM_RELEASE}"))
}

/// Whether binding will succeed without a network round trip.
pub fn is_available_offline() -> bool {
    if env_library_path().is_some() || Pdfium::bind_to_system_library().is_ok() {
        return true;
    }
    current_asset()
        .map(|a| cache_dir().join(a.file_name).exists())
        .unwrap_or(false)
}

/// Bind to pdfium, provisioning the library if needed.
///
/// Blocking: may download ~30 MB on first use. Call from a blocking context.
pub fn bind() -> Result<Pdfium, AuditError> {
    if let Some(path) = LIBRARY_PATH.get() {
        return bind_at(path);
    }

    if let Some(path) = env_library_path() {
        let pdfium = bind_at(&path)?;
        let _ = LIBRARY_PATH.set(path);
        return Ok(pdfium);
    }

    if let Ok(bindings) = Pdfium::bind_to_system_library() {
        debug!("Bound to system pdfium");
        return Ok(Pdfium::new(bindings));
    }

    let path = ensure_cached()?;
    let pdfium = bind_at(&path)?;
    let _ = LIBRARY_PATH.set(path);
    Ok(pdfium)
}

/// Provision and bind once up front, so the first render does not pay for
/// the download.
pub fn prepare() -> Result<(), AuditError> {
    bind().map(|_| ())
}

fn bind_at(path: &Path) -> Result<Pdfium, AuditError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| {
            AuditError::RenderingUnavailable(format!("cannot load '{}': {e}", path.display()))
        })
}

fn env_library_path() -> Option<PathBuf> {
    let p = PathBuf::from(std::env::var_os("PDFIUM_LIB_PATH")?);
    if p.exists() {
        Some(p)
    } else {
        warn!("PDFIUM_LIB_PATH '{}' does not exist, ignoring", p.display());
        None
    }
}

/// Return the cached library path, downloading it first if absent.
fn ensure_cached() -> Result<PathBuf, AuditError> {
    let asset = current_asset()?;
    let dir = cache_dir();
    let lib = dir.join(asset.file_name);
    if lib.exists() {
        return Ok(lib);
    }

    let url = format!("{RELEASE_BASE_URL}/chromium%2F{PDFIUM_RELEASE}/{}", asset.archive);
    info!("Downloading pdfium from {}", url);

    std::fs::create_dir_all(&dir).map_err(|e| {
        AuditError::RenderingUnavailable(format!("cannot create '{}': {e}", dir.display()))
    })?;

    let archive = download(&url)?;
    unpack_member(&archive, asset.member, &lib)?;
    info!("pdfium cached at {}", lib.display());
    Ok(lib)
}

fn download(url: &str) -> Result<Vec<u8>, AuditError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("roadmap-audit/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| AuditError::RenderingUnavailable(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| AuditError::RenderingUnavailable(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(AuditError::RenderingUnavailable(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let mut buf = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
    response
        .read_to_end(&mut buf)
        .map_err(|e| AuditError::RenderingUnavailable(format!("read error: {e}")))?;
    debug!("Downloaded {} bytes", buf.len());
    Ok(buf)
}

/// Extract one member of a `.tgz` archive to `dest`.
fn unpack_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), AuditError> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let extract_err = |e: std::io::Error| AuditError::RenderingUnavailable(format!("extract: {e}"));

    let mut tar = Archive::new(GzDecoder::new(archive));
    for entry in tar.entries().map_err(extract_err)? {
        let mut entry = entry.map_err(extract_err)?;
        let matches = entry
            .path()
            .map(|p| p.to_string_lossy() == member)
            .map_err(extract_err)?;
        if matches {
            entry.unpack(dest).map_err(extract_err)?;
            return Ok(());
        }
    }

    Err(AuditError::RenderingUnavailable(format!(
        "'{member}' not found in archive"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_platforms_resolve() {
        let linux = platform_asset("linux", "x86_64").unwrap();
        assert_eq!(linux.file_name, "libpdfium.so");
        assert!(linux.member.ends_with(linux.file_name));

        let mac = platform_asset("macos", "aarch64").unwrap();
        assert_eq!(mac.archive, "pdfium-mac-arm64.tgz");

        assert!(platform_asset("freebsd", "x86_64").is_none());
    }

    #[test]
    fn cache_dir_is_versioned() {
        let d = cache_dir();
        assert!(d.to_string_lossy().contains(PDFIUM_RELEASE));
    }

    #[test]
    fn unpack_reports_missing_member() {
        let mut builder = tar::Builder::new(flate2::write::GzEncoder::new(
            Vec::new(),
            flate2::Compression::fast(),
        ));
        let payload = b"not a real library";
        let mut header = tar::Header::new_gnu();
        header.set_size(payload.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "lib/other.so", &payload[..])
            .unwrap();
        let archive = builder.into_inner().unwrap().finish().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("libpdfium.so");
        let err = unpack_member(&archive, "lib/libpdfium.so", &dest).unwrap_err();
        assert!(matches!(err, AuditError::RenderingUnavailable(_)));

        unpack_member(&archive, "lib/other.so", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), payload);
    }
}
