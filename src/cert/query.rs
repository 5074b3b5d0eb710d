use crate::cert::CertificateMetadata;
use crate::utils::errors::{CaError, Result};
use std::str::FromStr;

/// Declared comparison type of a queryable field.
///
/// Certificate fields have genuinely different equality semantics: hex
/// serials and moduli must ignore formatting noise, names must not. The
/// engine centralizes that policy instead of scattering it across callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Int,
    Hex,
}

/// Queryable certificate attribute with its fixed schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryField {
    Subject,
    Serial,
    Modulus,
    Issuer,
    Email,
}

impl QueryField {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Subject | Self::Issuer | Self::Email => FieldType::String,
            Self::Serial => FieldType::Int,
            Self::Modulus => FieldType::Hex,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Serial => "serial",
            Self::Modulus => "modulus",
            Self::Issuer => "issuer",
            Self::Email => "email",
        }
    }
}

impl FromStr for QueryField {
    type Err = CaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "subject" => Ok(Self::Subject),
            "serial" => Ok(Self::Serial),
            "modulus" => Ok(Self::Modulus),
            "issuer" => Ok(Self::Issuer),
            "email" => Ok(Self::Email),
            _ => Err(CaError::InvalidInput(format!(
                "unknown query field: {s} (expected subject, serial, modulus, issuer or email)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    Is,
    Contains,
}

impl FromStr for MatchOp {
    type Err = CaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "is" => Ok(Self::Is),
            "contains" => Ok(Self::Contains),
            _ => Err(CaError::InvalidInput(format!(
                "match operator must be \"is\" or \"contains\", got: {s}"
            ))),
        }
    }
}

/// One field, one operator, one typed value
#[derive(Debug, Clone)]
pub struct Query {
    pub field: QueryField,
    pub op: MatchOp,
    pub value: String,
}

impl Query {
    pub fn parse(field: &str, op: &str, value: &str) -> Result<Self> {
        Ok(Self {
            field: field.parse()?,
            op: op.parse()?,
            value: value.trim().to_string(),
        })
    }

    /// Evaluate one candidate. A certificate lacking the queried attribute
    /// passes unfiltered (the degenerate "show all" path applies per record).
    pub fn matches(&self, cert: &CertificateMetadata) -> Result<bool> {
        let Some(stored) = attribute_value(cert, self.field) else {
            return Ok(true);
        };

        let query_canon = canonical_query_value(self.field.field_type(), &self.value)?;
        let Some(stored_canon) = canonical_stored_value(self.field.field_type(), &stored) else {
            // A stored value the type cannot represent excludes the record
            tracing::warn!(
                "Excluding {}: {} value '{stored}' is not parseable",
                cert.path.display(),
                self.field.name()
            );
            return Ok(false);
        };

        let query_canon = query_canon.to_uppercase();
        let stored_canon = stored_canon.to_uppercase();

        Ok(match self.op {
            MatchOp::Is => stored_canon == query_canon,
            MatchOp::Contains => stored_canon.contains(&query_canon),
        })
    }
}

/// Filter a certificate set, preserving relative order. No query means every
/// certificate is returned unfiltered.
pub fn find(certs: Vec<CertificateMetadata>, query: Option<&Query>) -> Result<Vec<CertificateMetadata>> {
    let Some(query) = query else {
        return Ok(certs);
    };

    let mut matches = Vec::new();
    for cert in certs {
        if query.matches(&cert)? {
            matches.push(cert);
        }
    }
    Ok(matches)
}

fn attribute_value(cert: &CertificateMetadata, field: QueryField) -> Option<String> {
    match field {
        QueryField::Subject => Some(cert.subject.clone()),
        QueryField::Serial => Some(cert.serial.as_canonical().to_string()),
        QueryField::Modulus => Some(cert.modulus.clone()),
        QueryField::Issuer => Some(cert.issuer.clone()),
        QueryField::Email => cert.email.clone(),
    }
}

/// Canonicalize the caller-supplied value; an unparseable typed value is a
/// caller error, not a silent no-match
fn canonical_query_value(field_type: FieldType, value: &str) -> Result<String> {
    match field_type {
        FieldType::String => Ok(value.to_string()),
        FieldType::Int => {
            let parsed = if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
                u128::from_str_radix(hex, 16)
            } else {
                value.parse::<u128>()
            };
            parsed
                .map(|n| format!("{n:x}"))
                .map_err(|_| CaError::InvalidInput(format!("not a number: {value}")))
        }
        FieldType::Hex => Ok(canonical_hex(value)),
    }
}

/// Canonicalize a stored value; toolkit int fields are emitted as plain hex
fn canonical_stored_value(field_type: FieldType, value: &str) -> Option<String> {
    match field_type {
        FieldType::String => Some(value.to_string()),
        FieldType::Int => u128::from_str_radix(value, 16).ok().map(|n| format!("{n:x}")),
        FieldType::Hex => Some(canonical_hex(value)),
    }
}

/// Hex comparison ignores colons, whitespace and leading zeros
fn canonical_hex(value: &str) -> String {
    let stripped: String = value
        .chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .collect();
    stripped.trim_start_matches('0').to_string()
}
