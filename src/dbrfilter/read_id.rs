use std::borrow::Borrow;
use std::fmt;
use std::sync::LazyLock;

use bio::io::fastq;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DbrError;

static READ_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[:_]\d+[:_]\d+[:_]\d+)").unwrap());

/// Read identifier shared between a raw sequence record and the
/// alignment of that read. This is the lane/tile/x/y token embedded in
/// the instrument read name, e.g. `1:1101:15808:1492` from
/// `M00001:1:000000000-A1B2C:1:1101:15808:1492`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadId(String);

impl ReadId {
    /// Extracts the identifier from a read name, using the first
    /// four-integer token found anywhere in `name`.
    ///
    /// # Errors
    ///
    /// `DbrError::BadReadName` when the name contains no such token.
    pub fn parse(name: &str) -> Result<Self, DbrError> {
        READ_ID_RE
            .captures(name)
            .and_then(|caps| caps.get(1))
            .map(|m| ReadId(m.as_str().to_string()))
            .ok_or_else(|| DbrError::BadReadName(name.to_string()))
    }

    /// Extracts the identifier from the header line of a fastq
    /// record. The name is searched before the description.
    pub fn from_fastq(fq: &fastq::Record) -> Result<Self, DbrError> {
        match Self::parse(fq.id()) {
            Ok(id) => Ok(id),
            Err(e) => match fq.desc() {
                Some(desc) => Self::parse(desc).map_err(|_| e),
                None => Err(e),
            },
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Borrow<str> for ReadId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReadId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miseq_name() {
        let id = ReadId::parse("M00001:1:000000000-A1B2C:1:1101:15808:1492").unwrap();
        assert_eq!(id.as_str(), "1:1101:15808:1492");
    }

    #[test]
    fn underscore_name() {
        let id = ReadId::parse("HWI-STX_8_1101_15808_1492#0/1").unwrap();
        assert_eq!(id.as_str(), "8_1101_15808_1492");
    }

    #[test]
    fn first_token_wins() {
        let id = ReadId::parse("8:1101:15808:1492 1:N:0:ACGT").unwrap();
        assert_eq!(id.as_str(), "8:1101:15808:1492");
    }

    #[test]
    fn no_token() {
        assert_eq!(
            ReadId::parse("read_one"),
            Err(DbrError::BadReadName("read_one".to_string()))
        );
        assert!(ReadId::parse("1:2:3").is_err());
    }

    #[test]
    fn fastq_description() {
        let fq = fastq::Record::with_attrs("sample7", Some("2:1101:100:200"), b"ACGT", b"IIII");
        assert_eq!(ReadId::from_fastq(&fq).unwrap().as_str(), "2:1101:100:200");

        let fq = fastq::Record::with_attrs("sample7", Some("none"), b"ACGT", b"IIII");
        assert_eq!(
            ReadId::from_fastq(&fq),
            Err(DbrError::BadReadName("sample7".to_string()))
        );
    }
}
