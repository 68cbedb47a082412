use std::io::{self, BufRead};

use crate::error::DbrError;
use crate::read_id::ReadId;

/// Reference name of an unmapped read.
pub const UNMAPPED: &str = "*";

const PRIMARY_FLAG: &str = "0";
const MIN_FIELDS: usize = 11;

/// The fields of one alignment line that bear on duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentRecord {
    id: ReadId,
    flag: String,
    locus: String,
    pos: String,
    cigar: String,
    sequence: String,
    quality: String,
}

impl AlignmentRecord {
    /// Parses one tab-delimited alignment line.
    ///
    /// # Arguments
    ///
    /// * `line` is the text of the line, with or without its line
    /// terminator
    ///
    /// * `line_no` is the 1-based line number, for error reporting
    ///
    /// # Errors
    ///
    /// `DbrError::BadAlignmentLine` when the line has too few fields,
    /// and `DbrError::BadReadName` when the query name does not carry
    /// a read identifier.
    pub fn parse(line: &str, line_no: usize) -> Result<Self, DbrError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < MIN_FIELDS {
            return Err(DbrError::BadAlignmentLine {
                line: line_no,
                reason: format!("{} fields, expected at least {}", fields.len(), MIN_FIELDS),
            });
        }

        Ok(AlignmentRecord {
            id: ReadId::parse(fields[0])?,
            flag: fields[1].to_string(),
            locus: fields[2].to_string(),
            pos: fields[3].to_string(),
            cigar: fields[5].to_string(),
            sequence: fields[9].to_string(),
            quality: fields[10].to_string(),
        })
    }

    pub fn id(&self) -> &ReadId {
        &self.id
    }

    /// True only for a flag of exactly `0`, the one primary, forward,
    /// unpaired alignment of a read.
    pub fn is_primary(&self) -> bool {
        self.flag == PRIMARY_FLAG
    }

    pub fn locus(&self) -> &str {
        &self.locus
    }

    pub fn is_unmapped(&self) -> bool {
        self.locus == UNMAPPED
    }

    pub fn pos(&self) -> &str {
        &self.pos
    }

    pub fn cigar(&self) -> &str {
        &self.cigar
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn quality(&self) -> &str {
        &self.quality
    }

    pub fn into_parts(self) -> (ReadId, String, String, String) {
        (self.id, self.locus, self.sequence, self.quality)
    }
}

/// Alignment records from a text alignment stream. Header lines,
/// starting with `@`, and blank lines are skipped.
pub struct AlignmentRecords<R> {
    lines: io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> AlignmentRecords<R> {
    pub fn new(src: R) -> Self {
        AlignmentRecords {
            lines: src.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for AlignmentRecords<R> {
    type Item = anyhow::Result<AlignmentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            if line.starts_with('@') || line.trim().is_empty() {
                continue;
            }

            return Some(AlignmentRecord::parse(&line, self.line_no).map_err(Into::into));
        }
    }
}
