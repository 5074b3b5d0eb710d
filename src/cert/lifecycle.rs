use crate::cert::query::{self, Query};
use crate::cert::store::{is_enabled, CertificateStore};
use crate::cert::SerialNumber;
use crate::toolkit::PkiToolkit;
use crate::utils::errors::{CaError, Result};
use std::fs;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Drives issuance: request submission, external signing, store update.
pub struct LifecycleController {
    store: CertificateStore,
    toolkit: Arc<dyn PkiToolkit>,
    /// Serializes allocate+write+sign so two in-process submitters cannot
    /// read the same last index. Cross-process submitters stay unguarded.
    submit_lock: Mutex<()>,
}

impl LifecycleController {
    pub fn new(store: CertificateStore, toolkit: Arc<dyn PkiToolkit>) -> Self {
        Self {
            store,
            toolkit,
            submit_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &CertificateStore {
        &self.store
    }

    /// Submit a signing request.
    ///
    /// An empty request is rejected before anything touches disk. On the
    /// first request ever the CA root is bootstrapped lazily. The freshly
    /// signed certificate is disabled immediately so a human must explicitly
    /// publish it. A signing failure carries the allocated serial and leaves
    /// the request artifact on disk for inspection or retry.
    pub async fn submit(&self, request_text: &str) -> Result<SerialNumber> {
        if request_text.trim().is_empty() {
            return Err(CaError::EmptyRequest);
        }

        let _guard = self.submit_lock.lock().await;

        self.store.paths().ensure_store_dir()?;

        if self.store.is_uninitialized() {
            tracing::info!("Initializing PKI infrastructure (this is the first request)");
            self.toolkit.init_ca().await?;
        }

        let serial = self.store.allocate_serial();
        tracing::info!("Saving request as {serial}");
        fs::write(self.store.paths().request_file(&serial), request_text)?;

        tracing::info!("Signing certificate request {serial}");
        match self.toolkit.sign(&serial).await {
            Ok(()) => {}
            Err(timeout @ CaError::ToolkitTimeout { .. }) => return Err(timeout),
            Err(e) => {
                return Err(CaError::SigningFailed {
                    serial,
                    reason: e.to_string(),
                })
            }
        }

        // Sign is atomic: either the certificate file exists now or it does not
        if !self.store.paths().cert_file(&serial).exists() {
            return Err(CaError::SigningFailed {
                serial,
                reason: "toolkit reported success but produced no certificate file".to_string(),
            });
        }

        // Default-safe: not retrievable until a human enables it
        self.store.disable_file(&serial)?;

        Ok(serial)
    }

    /// Certificate bytes by serial; AccessDenied while disabled
    pub async fn retrieve(&self, serial: &SerialNumber) -> Result<Vec<u8>> {
        self.store.read_bytes(serial).await
    }

    /// Certificate bytes by query; the query must resolve to exactly one
    /// certificate - the engine does not arbitrate ambiguity
    pub async fn retrieve_by_query(&self, query: &Query) -> Result<Vec<u8>> {
        let matches = query::find(self.store.list().await?, Some(query))?;
        match matches.len() {
            0 => Err(CaError::NotFound(format!(
                "no certificate matches {} {:?} {}",
                query.field.name(),
                query.op,
                query.value
            ))),
            1 => {
                let cert = &matches[0];
                if !is_enabled(&cert.path)? {
                    return Err(CaError::AccessDenied(cert.serial.to_string()));
                }
                Ok(fs::read(&cert.path)?)
            }
            n => Err(CaError::MultipleMatches(format!(
                "{n} certificates match {} {:?} {}; narrow the query",
                query.field.name(),
                query.op,
                query.value
            ))),
        }
    }

    /// Root CA certificate bytes; always public
    pub fn retrieve_ca(&self) -> Result<Vec<u8>> {
        self.store.read_ca_cert()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolkit::mock::MockToolkit;
    use crate::utils::paths::StorePaths;
    use tempfile::TempDir;

    const SAMPLE_CSR: &str = "-----BEGIN CERTIFICATE REQUEST-----\nMIIB...\n-----END CERTIFICATE REQUEST-----\n";

    fn setup_with(
        configure: impl FnOnce(&mut MockToolkit),
    ) -> (TempDir, LifecycleController, Arc<MockToolkit>) {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::new(dir.path().to_path_buf());
        let mut toolkit = MockToolkit::new(paths.clone());
        configure(&mut toolkit);
        let toolkit = Arc::new(toolkit);
        let store = CertificateStore::new(paths, toolkit.clone());
        (dir, LifecycleController::new(store, toolkit.clone()), toolkit)
    }

    fn setup() -> (TempDir, LifecycleController, Arc<MockToolkit>) {
        setup_with(|_| {})
    }

    #[tokio::test]
    async fn test_empty_request_is_rejected_before_any_side_effect() {
        let (dir, lifecycle, toolkit) = setup();

        assert!(matches!(
            lifecycle.submit("").await,
            Err(CaError::EmptyRequest)
        ));
        assert!(matches!(
            lifecycle.submit("   \n").await,
            Err(CaError::EmptyRequest)
        ));

        assert_eq!(*toolkit.init_calls.lock().unwrap(), 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_first_submit_initializes_ca_and_disables_certificate() {
        let (_dir, lifecycle, toolkit) = setup();

        let serial = lifecycle.submit(SAMPLE_CSR).await.unwrap();
        assert_eq!(serial.to_string(), "02");
        assert_eq!(*toolkit.init_calls.lock().unwrap(), 1);

        // Request artifact persisted under the serial's base name
        let csr = fs::read_to_string(lifecycle.store().paths().request_file(&serial)).unwrap();
        assert_eq!(csr, SAMPLE_CSR);

        // Freshly signed certificate is disabled by default
        assert!(matches!(
            lifecycle.retrieve(&serial).await,
            Err(CaError::AccessDenied(_))
        ));

        lifecycle.store().enable(&serial).await.unwrap();
        let bytes = lifecycle.retrieve(&serial).await.unwrap();
        assert_eq!(bytes, b"-----CERT 02-----\n");
    }

    #[tokio::test]
    async fn test_second_submit_skips_initialization() {
        let (_dir, lifecycle, toolkit) = setup();

        lifecycle.submit(SAMPLE_CSR).await.unwrap();
        let second = lifecycle.submit(SAMPLE_CSR).await.unwrap();

        assert_eq!(second.to_string(), "03");
        assert_eq!(*toolkit.init_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_signing_failure_carries_serial_and_keeps_request() {
        let (_dir, lifecycle, _toolkit) = setup_with(|t| t.fail_signing = true);

        let err = lifecycle.submit(SAMPLE_CSR).await.unwrap_err();
        let CaError::SigningFailed { serial, .. } = err else {
            panic!("expected SigningFailed, got {err}");
        };
        assert_eq!(serial.to_string(), "02");

        // The request stays on disk for inspection and retry
        assert!(lifecycle.store().paths().request_file(&serial).exists());
        assert!(!lifecycle.store().paths().cert_file(&serial).exists());
    }

    #[tokio::test]
    async fn test_retrieve_ca_is_ungated() {
        let (_dir, lifecycle, _toolkit) = setup();
        lifecycle.submit(SAMPLE_CSR).await.unwrap();

        // No enable call anywhere, yet the CA cert is public
        let ca = lifecycle.retrieve_ca().unwrap();
        assert_eq!(ca, b"-----CA CERT-----\n");
    }

    #[tokio::test]
    async fn test_retrieve_by_query_requires_exactly_one_match() {
        let (_dir, lifecycle, _toolkit) = setup();
        let first = lifecycle.submit(SAMPLE_CSR).await.unwrap();
        lifecycle.submit(SAMPLE_CSR).await.unwrap();

        // Both mock subjects start with "cert-"; ambiguous
        let broad = Query::parse("subject", "contains", "cert-").unwrap();
        assert!(matches!(
            lifecycle.retrieve_by_query(&broad).await,
            Err(CaError::MultipleMatches(_))
        ));

        let narrow = Query::parse("subject", "contains", "cert-02").unwrap();
        assert!(matches!(
            lifecycle.retrieve_by_query(&narrow).await,
            Err(CaError::AccessDenied(_))
        ));

        lifecycle.store().enable(&first).await.unwrap();
        let bytes = lifecycle.retrieve_by_query(&narrow).await.unwrap();
        assert_eq!(bytes, b"-----CERT 02-----\n");

        let none = Query::parse("subject", "is", "cert-99").unwrap();
        assert!(matches!(
            lifecycle.retrieve_by_query(&none).await,
            Err(CaError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_deleted_serial_no_longer_matches() {
        let (_dir, lifecycle, _toolkit) = setup();
        let serial = lifecycle.submit(SAMPLE_CSR).await.unwrap();

        lifecycle.store().delete(&serial).await.unwrap();

        let query = Query::parse("serial", "is", "2").unwrap();
        let matches = query::find(lifecycle.store().list().await.unwrap(), Some(&query)).unwrap();
        assert!(matches.is_empty());
    }
}
