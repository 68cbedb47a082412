use thiserror::Error;

/// Errors arising from malformed or inconsistent sequencing data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbrError {
    #[error("No read identifier token in read name \"{0}\"")]
    BadReadName(String),

    #[error("Duplicate read identifier {id} (tag {tag})")]
    DuplicateReadId { id: String, tag: String },

    #[error("Unknown quality character {}", show_byte(.0))]
    UnknownQualityChar(u8),

    #[error("Bad alignment line {line}: {reason}")]
    BadAlignmentLine { line: usize, reason: String },

    #[error("Bad tag range \"{0}\"")]
    BadTagRange(String),

    #[error("Bad tag map: {0}")]
    BadTagMap(String),

    #[error("Bad option {option}: {reason}")]
    BadOption { option: String, reason: String },
}

fn show_byte(b: &u8) -> String {
    format!("'{}' (0x{:02x})", char::from(*b), b)
}
