use crate::cert::{
    query, CertificateColumn, CertificateMetadata, CertificateStore, LifecycleController, Query,
    SerialNumber,
};
use crate::cli::args::{Cli, Commands};
use crate::toolkit::OpensslToolkit;
use crate::utils::errors::{CaError, Result};
use crate::utils::output::{build_table_data, OutputFormat};
use crate::utils::paths::StorePaths;
use clap::CommandFactory;
use clap_complete::generate;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_COLUMNS: &[&str] = &["serial", "subject", "email", "enabled"];

pub async fn handle_command(cli: Cli) -> Result<()> {
    // Initialize logging - always to stderr
    if !cli.quiet {
        let log_level = match cli.verbose {
            0 => "testca_rs=warn",
            1 => "testca_rs=info",
            2 => "testca_rs=debug",
            _ => "testca_rs=trace",
        };

        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_env_filter(log_level)
            .init();
    }

    // Completion needs no store or toolkit
    if let Commands::Completion { shell } = &cli.command {
        let mut cmd = Cli::command();
        generate(*shell, &mut cmd, "testca-rs", &mut io::stdout());
        return Ok(());
    }

    let output = OutputFormat::new(cli.raw);
    let lifecycle = build_lifecycle(&cli)?;

    match cli.command {
        Commands::List { columns, json } => {
            let certs = lifecycle.store().list().await?;
            print_certificates(&certs, columns, json, &output)
        }
        Commands::Find {
            field,
            op,
            value,
            columns,
            json,
        } => {
            let query = Query::parse(&field, &op, &value)?;
            let certs = query::find(lifecycle.store().list().await?, Some(&query))?;
            print_certificates(&certs, columns, json, &output)
        }
        Commands::Submit { csr_file } => {
            let request = read_request(csr_file)?;
            let serial = lifecycle.submit(&request).await?;
            println!("{serial}");
            eprintln!("Certificate {serial} signed and disabled; enable it to publish.");
            Ok(())
        }
        Commands::Enable { serial } => {
            let serial = parse_serial(&serial)?;
            lifecycle.store().enable(&serial).await?;
            eprintln!("Enabled {serial}");
            Ok(())
        }
        Commands::Disable { serial } => {
            let serial = parse_serial(&serial)?;
            lifecycle.store().disable(&serial).await?;
            eprintln!("Disabled {serial}");
            Ok(())
        }
        Commands::Delete { serial } => {
            let serial = parse_serial(&serial)?;
            lifecycle.store().delete(&serial).await?;
            eprintln!("Deleted {serial}");
            Ok(())
        }
        Commands::Retrieve {
            serial,
            field,
            op,
            value,
            output: out_file,
        } => {
            let bytes = match (serial, field) {
                (Some(serial), _) => {
                    let serial = parse_serial(&serial)?;
                    lifecycle.retrieve(&serial).await?
                }
                (None, Some(field)) => {
                    let query = Query::parse(
                        &field,
                        op.as_deref().unwrap_or_default(),
                        value.as_deref().unwrap_or_default(),
                    )?;
                    lifecycle.retrieve_by_query(&query).await?
                }
                (None, None) => {
                    return Err(CaError::InvalidInput(
                        "retrieve needs a serial or --field/--op/--value".to_string(),
                    ))
                }
            };
            write_bytes(&bytes, out_file)
        }
        Commands::RetrieveCa { output: out_file } => {
            let bytes = lifecycle.retrieve_ca()?;
            write_bytes(&bytes, out_file)
        }
        Commands::Completion { .. } => unreachable!("handled above"),
    }
}

fn build_lifecycle(cli: &Cli) -> Result<LifecycleController> {
    let store_dir = match &cli.store_dir {
        Some(dir) => dir.clone(),
        None => StorePaths::default_store_dir()?,
    };
    let paths = StorePaths::new(store_dir.clone());

    let toolkit = Arc::new(OpensslToolkit::new(
        store_dir,
        cli.pkitool.clone(),
        Duration::from_secs(cli.toolkit_timeout),
    )?);

    let store = CertificateStore::new(paths, toolkit.clone());
    Ok(LifecycleController::new(store, toolkit))
}

fn parse_serial(serial: &str) -> Result<SerialNumber> {
    SerialNumber::parse(serial)
        .map_err(|e| CaError::InvalidInput(format!("invalid serial '{serial}': {e}")))
}

fn read_request(csr_file: Option<PathBuf>) -> Result<String> {
    match csr_file {
        Some(path) => Ok(std::fs::read_to_string(&path)?),
        None => {
            let mut request = String::new();
            io::stdin().read_to_string(&mut request)?;
            Ok(request)
        }
    }
}

fn write_bytes(bytes: &[u8], out_file: Option<PathBuf>) -> Result<()> {
    match out_file {
        Some(path) => {
            std::fs::write(&path, bytes)?;
            eprintln!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => {
            io::stdout().write_all(bytes)?;
        }
    }
    Ok(())
}

fn print_certificates(
    certs: &[CertificateMetadata],
    columns: Option<String>,
    json: bool,
    output: &OutputFormat,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(certs)?);
        return Ok(());
    }

    if certs.is_empty() {
        return Ok(());
    }

    let parsed_columns = parse_columns(columns)?;
    let mut data = vec![parsed_columns
        .iter()
        .map(|col| col.header().to_string())
        .collect::<Vec<_>>()];
    data.extend(build_table_data(certs, &parsed_columns));
    output.print_table(&data);
    Ok(())
}

/// Parse a comma-separated column list; a leading `+` appends to the defaults
fn parse_columns(columns: Option<String>) -> Result<Vec<CertificateColumn>> {
    let names: Vec<String> = match columns {
        Some(columns_str) if columns_str.starts_with('+') => {
            let mut names: Vec<String> = DEFAULT_COLUMNS.iter().map(|s| s.to_string()).collect();
            names.extend(
                columns_str[1..]
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            );
            names
        }
        Some(columns_str) => columns_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => DEFAULT_COLUMNS.iter().map(|s| s.to_string()).collect(),
    };

    names
        .iter()
        .map(|name| CertificateColumn::from_str(name).map_err(CaError::InvalidInput))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_columns_defaults() {
        let columns = parse_columns(None).unwrap();
        assert_eq!(columns.len(), DEFAULT_COLUMNS.len());
    }

    #[test]
    fn test_parse_columns_append_mode() {
        let columns = parse_columns(Some("+modulus,path".to_string())).unwrap();
        assert_eq!(columns.len(), DEFAULT_COLUMNS.len() + 2);
    }

    #[test]
    fn test_parse_columns_rejects_unknown() {
        assert!(parse_columns(Some("serial,bogus".to_string())).is_err());
    }
}
