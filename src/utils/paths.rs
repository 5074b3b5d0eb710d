use crate::cert::SerialNumber;
use crate::utils::errors::{CaError, Result};
use std::fs;
use std::path::{Path, PathBuf};

const PROGRAM_NAME: &str = "testca-rs";

/// Path derivation for the certificate store directory.
///
/// The store holds, per serial: `<serial>.csr` (submitted request),
/// `<serial>.pem` (signed certificate, access-flag gated) and optionally
/// `<serial>.crt` (derived cert-only artifact). Two store-global files live
/// alongside them: `ca.crt` and the `serial` counter.
#[derive(Debug, Clone)]
pub struct StorePaths {
    store_dir: PathBuf,
}

impl StorePaths {
    pub fn new(store_dir: PathBuf) -> Self {
        Self { store_dir }
    }

    /// Default store directory: ~/.local/share/testca-rs/keys/
    pub fn default_store_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|dir| dir.join(PROGRAM_NAME).join("keys"))
            .ok_or_else(|| CaError::Config("Cannot determine local data directory".to_string()))
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Signed certificate: <store>/<serial>.pem
    pub fn cert_file(&self, serial: &SerialNumber) -> PathBuf {
        self.store_dir.join(format!("{serial}.pem"))
    }

    /// Submitted request: <store>/<serial>.csr
    pub fn request_file(&self, serial: &SerialNumber) -> PathBuf {
        self.store_dir.join(format!("{serial}.csr"))
    }

    /// Derived cert-only artifact: <store>/<serial>.crt
    pub fn derived_cert_file(&self, serial: &SerialNumber) -> PathBuf {
        self.store_dir.join(format!("{serial}.crt"))
    }

    /// Root CA certificate: <store>/ca.crt
    pub fn ca_cert_file(&self) -> PathBuf {
        self.store_dir.join("ca.crt")
    }

    /// Serial counter, written by the toolkit during signing: <store>/serial
    pub fn serial_counter_file(&self) -> PathBuf {
        self.store_dir.join("serial")
    }

    /// Ensure the store directory exists with restrictive permissions
    pub fn ensure_store_dir(&self) -> Result<()> {
        if !self.store_dir.exists() {
            fs::create_dir_all(&self.store_dir)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mut perms = fs::metadata(&self.store_dir)?.permissions();
                perms.set_mode(0o700);
                fs::set_permissions(&self.store_dir, perms)?;
            }
        }
        Ok(())
    }
}
