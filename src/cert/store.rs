use crate::cert::{CertificateMetadata, InspectOutputParser, SerialNumber};
use crate::toolkit::PkiToolkit;
use crate::utils::errors::{CaError, Result};
use crate::utils::paths::StorePaths;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const ENABLED_MODE: u32 = 0o644;
const DISABLED_MODE: u32 = 0o600;

/// Owns the directory of certificate files.
///
/// A certificate's enabled state is its file access flag (readable by others
/// = enabled, owner-only = disabled); the flag is re-read on every check,
/// never cached. Serials double as file base names, and the serial counter is
/// written by the toolkit during signing - the store only reads it.
pub struct CertificateStore {
    paths: StorePaths,
    toolkit: Arc<dyn PkiToolkit>,
}

impl CertificateStore {
    pub fn new(paths: StorePaths, toolkit: Arc<dyn PkiToolkit>) -> Self {
        Self { paths, toolkit }
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Last-used serial index from the counter file; absent or unreadable
    /// counters default to 1 (the index reserved for the CA root).
    pub fn last_index(&self) -> u64 {
        let Ok(contents) = fs::read_to_string(self.paths.serial_counter_file()) else {
            return 1;
        };
        contents
            .lines()
            .next()
            .and_then(|line| u64::from_str_radix(line.trim(), 16).ok())
            .unwrap_or(1)
    }

    /// True while no real certificate has ever been signed; first-time CA
    /// initialization is required in that case.
    pub fn is_uninitialized(&self) -> bool {
        self.last_index() <= 1
    }

    /// Next serial to hand out. Advisory only - concurrent submitters reading
    /// the same last index is a documented hazard, serialized in-process by
    /// the lifecycle controller.
    pub fn allocate_serial(&self) -> SerialNumber {
        SerialNumber::from_index(self.last_index() + 1)
    }

    /// Scan the store directory and materialize every recognized certificate
    /// file. Non-certificate files are skipped silently; a file whose
    /// extraction fails is logged and excluded rather than aborting the scan.
    pub async fn list(&self) -> Result<Vec<CertificateMetadata>> {
        let mut certs = Vec::new();

        let entries = match fs::read_dir(self.paths.store_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(certs),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("pem") {
                continue;
            }

            match self.extract(&path).await {
                Ok(cert) => certs.push(cert),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                }
            }
        }

        Ok(certs)
    }

    /// Metadata Extractor: toolkit inspect plus the access-flag snapshot
    async fn extract(&self, path: &Path) -> Result<CertificateMetadata> {
        let output = self.toolkit.inspect(path).await?;
        let enabled = is_enabled(path)?;
        InspectOutputParser::parse(&output, path.to_path_buf(), enabled)
    }

    /// Exactly-one lookup by serial. Zero matches is NotFound; more than one
    /// is an invariant violation reported as MultipleMatches before any file
    /// is touched.
    pub async fn lookup(&self, serial: &SerialNumber) -> Result<CertificateMetadata> {
        let mut matches: Vec<CertificateMetadata> = self
            .list()
            .await?
            .into_iter()
            .filter(|cert| cert.serial == *serial)
            .collect();

        match matches.len() {
            0 => Err(CaError::NotFound(serial.to_string())),
            1 => Ok(matches.swap_remove(0)),
            n => Err(CaError::MultipleMatches(format!(
                "{n} certificate files share serial {serial}"
            ))),
        }
    }

    /// Widen the access flag so the certificate becomes retrievable
    pub async fn enable(&self, serial: &SerialNumber) -> Result<()> {
        let cert = self.lookup(serial).await?;
        set_mode(&cert.path, ENABLED_MODE)
    }

    /// Narrow the access flag; disabling is access control, not deletion
    pub async fn disable(&self, serial: &SerialNumber) -> Result<()> {
        let cert = self.lookup(serial).await?;
        set_mode(&cert.path, DISABLED_MODE)
    }

    /// Remove the certificate and its sibling request/derived-cert artifacts.
    /// Missing siblings are ignored; the serial is never reused afterwards.
    pub async fn delete(&self, serial: &SerialNumber) -> Result<()> {
        let cert = self.lookup(serial).await?;
        fs::remove_file(&cert.path)?;

        for sibling in [
            cert.path.with_extension("csr"),
            cert.path.with_extension("crt"),
        ] {
            match fs::remove_file(&sibling) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// Certificate bytes, gated by the access flag re-read at call time
    pub async fn read_bytes(&self, serial: &SerialNumber) -> Result<Vec<u8>> {
        let cert = self.lookup(serial).await?;
        if !is_enabled(&cert.path)? {
            return Err(CaError::AccessDenied(serial.to_string()));
        }
        Ok(fs::read(&cert.path)?)
    }

    /// Root CA certificate bytes; always public, no enable/disable gate
    pub fn read_ca_cert(&self) -> Result<Vec<u8>> {
        let path = self.paths.ca_cert_file();
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CaError::NotFound(
                format!("CA certificate at {}", path.display()),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Mark a freshly signed certificate disabled (default-safe)
    pub fn disable_file(&self, serial: &SerialNumber) -> Result<()> {
        set_mode(&self.paths.cert_file(serial), DISABLED_MODE)
    }
}

/// Enabled means readable by others
pub fn is_enabled(path: &Path) -> Result<bool> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(path)?.permissions().mode();
        Ok(mode & 0o004 != 0)
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(true)
    }
}

fn set_mode(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(mode);
        fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode);
    }
    Ok(())
}
