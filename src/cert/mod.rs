pub mod lifecycle;
pub mod metadata;
pub mod parser;
pub mod query;
pub mod serial;
pub mod store;

pub use lifecycle::LifecycleController;
pub use metadata::{CertificateColumn, CertificateMetadata};
pub use parser::InspectOutputParser;
pub use query::{FieldType, MatchOp, Query, QueryField};
pub use serial::{SerialNumber, SerialNumberParseError};
pub use store::CertificateStore;
