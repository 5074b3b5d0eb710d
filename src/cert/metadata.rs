use crate::cert::SerialNumber;
use crate::utils::output::GetColumnValue;
use serde::Serialize;
use std::path::PathBuf;
use std::{fmt, str::FromStr};

/// Typed attribute record for one stored certificate, extracted via the
/// external toolkit's inspect operation.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateMetadata {
    pub serial: SerialNumber,
    pub subject: String,
    pub issuer: String,
    /// Absent when the certificate carries no email address
    pub email: Option<String>,
    /// Public-key modulus as hex
    pub modulus: String,
    pub path: PathBuf,
    /// Snapshot of the access flag at extraction time; the flag on the file
    /// itself stays authoritative
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub enum CertificateColumn {
    Serial,
    Subject,
    Email,
    Issuer,
    Modulus,
    Enabled,
    Path,
}

impl FromStr for CertificateColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serial" => Ok(Self::Serial),
            "subject" => Ok(Self::Subject),
            "email" => Ok(Self::Email),
            "issuer" => Ok(Self::Issuer),
            "modulus" => Ok(Self::Modulus),
            "enabled" | "e" => Ok(Self::Enabled),
            "path" => Ok(Self::Path),
            _ => Err(format!("Invalid column: {s}")),
        }
    }
}

impl CertificateColumn {
    pub fn header(&self) -> &'static str {
        match self {
            Self::Serial => "Serial",
            Self::Subject => "Subject",
            Self::Email => "Email",
            Self::Issuer => "Issuer",
            Self::Modulus => "Modulus",
            Self::Enabled => "E",
            Self::Path => "Path",
        }
    }
}

impl GetColumnValue for CertificateMetadata {
    fn get_column_value(&self, column: &CertificateColumn) -> String {
        match column {
            CertificateColumn::Serial => self.serial.to_string(),
            CertificateColumn::Subject => self.subject.clone(),
            CertificateColumn::Email => self.email.clone().unwrap_or_default(),
            CertificateColumn::Issuer => self.issuer.clone(),
            CertificateColumn::Modulus => self.modulus.clone(),
            CertificateColumn::Enabled => {
                if self.enabled {
                    "✓".to_string()
                } else {
                    " ".to_string()
                }
            }
            CertificateColumn::Path => self.path.display().to_string(),
        }
    }
}

impl fmt::Display for CertificateMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Serial: {}, Subject: {}, {}",
            self.serial,
            self.subject,
            if self.enabled { "enabled" } else { "disabled" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CertificateMetadata {
        CertificateMetadata {
            serial: SerialNumber::from_index(2),
            subject: "/O=Example/CN=Alice".to_string(),
            issuer: "/O=Example/CN=Test CA".to_string(),
            email: None,
            modulus: "00A1B2".to_string(),
            path: PathBuf::from("/tmp/store/02.pem"),
            enabled: false,
        }
    }

    #[test]
    fn test_column_values() {
        let cert = sample();
        assert_eq!(cert.get_column_value(&CertificateColumn::Serial), "02");
        assert_eq!(cert.get_column_value(&CertificateColumn::Email), "");
        assert_eq!(cert.get_column_value(&CertificateColumn::Enabled), " ");
    }

    #[test]
    fn test_column_from_str() {
        assert!(CertificateColumn::from_str("subject").is_ok());
        assert!(CertificateColumn::from_str("MODULUS").is_ok());
        assert!(CertificateColumn::from_str("not_a_column").is_err());
    }
}
