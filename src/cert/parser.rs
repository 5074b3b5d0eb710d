use crate::cert::{CertificateMetadata, SerialNumber};
use crate::utils::errors::{CaError, Result};
use std::collections::HashMap;
use std::path::PathBuf;

/// Parses the toolkit's line-oriented inspect output into a typed attribute
/// record.
///
/// The output is `key=value` lines (split on the first `=`, keys lower-cased,
/// both sides trimmed). The email option prints a bare line with no `=`; the
/// first such line becomes the email attribute.
pub struct InspectOutputParser;

const REQUIRED_FIELDS: &[&str] = &["subject", "serial", "modulus", "issuer"];

impl InspectOutputParser {
    /// Split inspect output into a lower-cased key/value mapping
    pub fn parse_fields(output: &str) -> (HashMap<String, String>, Option<String>) {
        let mut fields = HashMap::new();
        let mut email = None;

        for line in output.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.split_once('=') {
                Some((key, value)) => {
                    fields.insert(key.trim().to_lowercase(), value.trim().to_string());
                }
                None => {
                    // Bare line: the email option prints the address without a key
                    if email.is_none() {
                        email = Some(line.to_string());
                    }
                }
            }
        }

        (fields, email)
    }

    /// Build a certificate record from inspect output
    pub fn parse(output: &str, path: PathBuf, enabled: bool) -> Result<CertificateMetadata> {
        let (mut fields, email) = Self::parse_fields(output);

        for field in REQUIRED_FIELDS {
            if !fields.contains_key(*field) {
                return Err(CaError::Parse(format!(
                    "missing field '{field}' in inspect output for {}",
                    path.display()
                )));
            }
        }

        let serial_raw = fields.remove("serial").unwrap_or_default();
        let serial = SerialNumber::parse(&serial_raw).map_err(|e| {
            CaError::Parse(format!(
                "invalid serial '{serial_raw}' for {}: {e}",
                path.display()
            ))
        })?;

        Ok(CertificateMetadata {
            serial,
            subject: fields.remove("subject").unwrap_or_default(),
            issuer: fields.remove("issuer").unwrap_or_default(),
            email,
            modulus: fields.remove("modulus").unwrap_or_default(),
            path,
            enabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "subject= /O=Example/CN=Alice\n\
                          serial=02\n\
                          Modulus=00A1B2C3\n\
                          issuer= /O=Example/CN=Test CA\n\
                          alice@example.com\n";

    #[test]
    fn test_parse_full_output() {
        let cert =
            InspectOutputParser::parse(SAMPLE, PathBuf::from("/tmp/02.pem"), true).unwrap();
        assert_eq!(cert.serial.to_string(), "02");
        assert_eq!(cert.subject, "/O=Example/CN=Alice");
        assert_eq!(cert.issuer, "/O=Example/CN=Test CA");
        assert_eq!(cert.modulus, "00A1B2C3");
        assert_eq!(cert.email.as_deref(), Some("alice@example.com"));
        assert!(cert.enabled);
    }

    #[test]
    fn test_keys_are_lowercased() {
        let (fields, _) = InspectOutputParser::parse_fields("Modulus=AB\nSERIAL=02\n");
        assert_eq!(fields.get("modulus").map(String::as_str), Some("AB"));
        assert_eq!(fields.get("serial").map(String::as_str), Some("02"));
    }

    #[test]
    fn test_value_keeps_embedded_equals() {
        // Subject lines contain '=' inside the DN; only the first one splits
        let (fields, _) = InspectOutputParser::parse_fields("subject= /O=X/CN=Alice\n");
        assert_eq!(
            fields.get("subject").map(String::as_str),
            Some("/O=X/CN=Alice")
        );
    }

    #[test]
    fn test_missing_email_is_none() {
        let output = "subject= /CN=A\nserial=03\nModulus=AB\nissuer= /CN=CA\n";
        let cert = InspectOutputParser::parse(output, PathBuf::from("/tmp/03.pem"), false).unwrap();
        assert!(cert.email.is_none());
    }

    #[test]
    fn test_missing_required_field_is_parse_error() {
        let output = "subject= /CN=A\nserial=03\nissuer= /CN=CA\n";
        let err =
            InspectOutputParser::parse(output, PathBuf::from("/tmp/03.pem"), false).unwrap_err();
        assert!(matches!(err, CaError::Parse(msg) if msg.contains("modulus")));
    }

    #[test]
    fn test_garbage_serial_is_parse_error() {
        let output = "subject= /CN=A\nserial=zz\nModulus=AB\nissuer= /CN=CA\n";
        let err =
            InspectOutputParser::parse(output, PathBuf::from("/tmp/zz.pem"), false).unwrap_err();
        assert!(matches!(err, CaError::Parse(_)));
    }
}
