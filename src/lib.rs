pub mod cert;
pub mod cli;
pub mod toolkit;
pub mod utils;

// Re-export specific items to avoid conflicts
pub use cert::{
    CertificateColumn, CertificateMetadata, CertificateStore, LifecycleController, Query,
    SerialNumber,
};
pub use cli::{args, commands};
pub use toolkit::{OpensslToolkit, PkiToolkit};
pub use utils::{errors, paths};
