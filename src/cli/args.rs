use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "testca-rs")]
#[command(version = "1.0.0")]
#[command(about = "A minimal test certificate authority front end")]
#[command(long_about = None)]
pub struct Cli {
    /// Certificate store directory
    #[arg(long, env = "TESTCA_STORE")]
    pub store_dir: Option<PathBuf>,

    /// CA wrapper script used for the initca and sign operations
    #[arg(long, env = "TESTCA_PKITOOL")]
    pub pkitool: Option<PathBuf>,

    /// Toolkit invocation timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub toolkit_timeout: u64,

    /// Enable verbose logging (repeat for more verbosity: -v INFO, -vv DEBUG, -vvv TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output raw tab-separated values (no formatting)
    #[arg(short, long)]
    pub raw: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List all certificates in the store
    List {
        /// Columns to display (comma-separated): serial,subject,email,issuer,modulus,enabled,path. Use +column to append to defaults.
        #[arg(long)]
        columns: Option<String>,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Find certificates by one field, operator and value
    Find {
        /// Query field: subject, serial, modulus, issuer or email
        field: String,

        /// Match operator: "is" or "contains"
        op: String,

        /// Value to compare against
        value: String,

        /// Columns to display (comma-separated). Use +column to append to defaults.
        #[arg(long)]
        columns: Option<String>,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Submit a certificate signing request
    Submit {
        /// CSR file path (reads stdin if not given)
        csr_file: Option<PathBuf>,
    },
    /// Enable a certificate so its bytes may be retrieved
    Enable {
        /// Certificate serial
        serial: String,
    },
    /// Disable a certificate (access control, not deletion)
    Disable {
        /// Certificate serial
        serial: String,
    },
    /// Delete a certificate and its request/derived artifacts
    Delete {
        /// Certificate serial
        serial: String,
    },
    /// Retrieve certificate bytes by serial or by query
    Retrieve {
        /// Certificate serial
        serial: Option<String>,

        /// Query field (alternative to a serial)
        #[arg(long, requires = "op", requires = "value", conflicts_with = "serial")]
        field: Option<String>,

        /// Match operator: "is" or "contains"
        #[arg(long)]
        op: Option<String>,

        /// Query value
        #[arg(long)]
        value: Option<String>,

        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Retrieve the root CA certificate (always public)
    RetrieveCa {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}
