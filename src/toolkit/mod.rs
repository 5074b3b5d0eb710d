use crate::cert::SerialNumber;
use crate::utils::errors::{CaError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// External PKI toolkit collaborator.
///
/// Three operations the core relies on: inspect is idempotent and
/// side-effect-free; initialize is valid only on an empty store; sign is
/// atomic from the store's point of view (it either produces the certificate
/// file or fails). The trait exists so the toolkit can be mocked in tests.
#[async_trait]
pub trait PkiToolkit: Send + Sync {
    /// Read-only metadata dump for a certificate file (`key=value` lines)
    async fn inspect(&self, path: &Path) -> Result<String>;

    /// One-time CA key/certificate bootstrap
    async fn init_ca(&self) -> Result<()>;

    /// Consume the pending request for `serial`, producing `<serial>.pem`
    async fn sign(&self, serial: &SerialNumber) -> Result<()>;
}

/// Toolkit implementation shelling out to openssl and an easy-rsa style
/// `pkitool` wrapper. Every invocation is bounded by a timeout so a hung
/// child process surfaces as an error instead of blocking the caller forever.
pub struct OpensslToolkit {
    openssl: PathBuf,
    pkitool: PathBuf,
    store_dir: PathBuf,
    timeout: Duration,
}

impl OpensslToolkit {
    pub fn new(
        store_dir: PathBuf,
        pkitool_override: Option<PathBuf>,
        timeout: Duration,
    ) -> Result<Self> {
        let openssl = which::which("openssl").map_err(|_| {
            CaError::Config("openssl not found in PATH. Please install OpenSSL.".to_string())
        })?;

        let pkitool = match pkitool_override {
            Some(path) => path,
            None => which::which("pkitool").map_err(|_| {
                CaError::Config(
                    "pkitool not found in PATH. Point --pkitool at your CA wrapper script."
                        .to_string(),
                )
            })?,
        };

        Ok(Self {
            openssl,
            pkitool,
            store_dir,
            timeout,
        })
    }

    async fn run(&self, program: &Path, args: &[String]) -> Result<std::process::Output> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .env("KEY_DIR", &self.store_dir)
            .kill_on_drop(true);

        let command_line = format!("{} {}", program.display(), args.join(" "));
        tracing::debug!("Executing: {command_line}");

        match timeout(self.timeout, cmd.output()).await {
            Ok(output) => Ok(output?),
            Err(_) => Err(CaError::ToolkitTimeout {
                command: command_line,
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }

    fn check_status(output: &std::process::Output, operation: &str) -> Result<()> {
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(CaError::Toolkit(format!(
            "{operation} exited with {}: {}",
            output.status,
            stderr.trim()
        )))
    }
}

#[async_trait]
impl PkiToolkit for OpensslToolkit {
    async fn inspect(&self, path: &Path) -> Result<String> {
        let args = vec![
            "x509".to_string(),
            "-noout".to_string(),
            "-subject".to_string(),
            "-serial".to_string(),
            "-modulus".to_string(),
            "-issuer".to_string(),
            "-email".to_string(),
            "-in".to_string(),
            path.display().to_string(),
        ];
        let output = self.run(&self.openssl, &args).await?;
        Self::check_status(&output, "inspect")?;
        Ok(String::from_utf8(output.stdout)?)
    }

    async fn init_ca(&self) -> Result<()> {
        let args = vec!["--batch".to_string(), "--initca".to_string()];
        let output = self.run(&self.pkitool, &args).await?;
        Self::check_status(&output, "initca")
    }

    async fn sign(&self, serial: &SerialNumber) -> Result<()> {
        let args = vec![
            "--batch".to_string(),
            "--sign".to_string(),
            serial.to_string(),
        ];
        let output = self.run(&self.pkitool, &args).await?;
        Self::check_status(&output, "sign")
    }
}

#[cfg(test)]
pub mod mock {
    //! In-memory toolkit used by store and lifecycle tests.

    use super::*;
    use crate::utils::paths::StorePaths;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::Mutex;

    /// Scripted toolkit: inspect output is looked up by file base name,
    /// init/sign write the same artifacts the real toolkit would.
    pub struct MockToolkit {
        paths: StorePaths,
        inspect_outputs: Mutex<HashMap<String, String>>,
        pub fail_signing: bool,
        pub init_calls: Mutex<u32>,
    }

    impl MockToolkit {
        pub fn new(paths: StorePaths) -> Self {
            Self {
                paths,
                inspect_outputs: Mutex::new(HashMap::new()),
                fail_signing: false,
                init_calls: Mutex::new(0),
            }
        }

        pub fn script_inspect(&self, base_name: &str, output: &str) {
            self.inspect_outputs
                .lock()
                .unwrap()
                .insert(base_name.to_string(), output.to_string());
        }

        fn write_counter(&self, index: u64) {
            fs::write(
                self.paths.serial_counter_file(),
                format!("{index:02X}\n"),
            )
            .unwrap();
        }
    }

    #[async_trait]
    impl PkiToolkit for MockToolkit {
        async fn inspect(&self, path: &Path) -> Result<String> {
            let base = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            self.inspect_outputs
                .lock()
                .unwrap()
                .get(&base)
                .cloned()
                .ok_or_else(|| CaError::Toolkit(format!("unscripted inspect for {base}")))
        }

        async fn init_ca(&self) -> Result<()> {
            *self.init_calls.lock().unwrap() += 1;
            fs::write(self.paths.ca_cert_file(), b"-----CA CERT-----\n")?;
            // The root certificate consumes the reserved index 1
            self.write_counter(1);
            Ok(())
        }

        async fn sign(&self, serial: &SerialNumber) -> Result<()> {
            if self.fail_signing {
                return Err(CaError::Toolkit("scripted signing failure".to_string()));
            }
            let cert_file = self.paths.cert_file(serial);
            fs::write(&cert_file, format!("-----CERT {serial}-----\n"))?;
            let index = u64::from_str_radix(serial.as_canonical(), 16)
                .map_err(|e| CaError::Toolkit(e.to_string()))?;
            self.write_counter(index);
            self.script_inspect(
                &serial.to_string(),
                &format!(
                    "subject= /O=Mock/CN=cert-{serial}\nserial={serial}\nModulus=AB{serial}\nissuer= /O=Mock/CN=Mock CA\n"
                ),
            );
            Ok(())
        }
    }
}
