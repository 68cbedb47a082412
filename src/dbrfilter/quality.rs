//! Representative quality of a read, used to choose among duplicates.
//!
//! Quality characters are scored on the Phred+33 scale restricted to
//! the printable range `"` (score 1) through `K` (score 42). Anything
//! outside that range is an error.

use crate::error::DbrError;

/// Lowest quality character in the table.
pub const MIN_QUAL_CHAR: u8 = b'"';
/// Highest quality character in the table.
pub const MAX_QUAL_CHAR: u8 = b'K';

const QUAL_OFFSET: u8 = 33;

/// Numeric score for one quality character.
///
/// # Errors
///
/// `DbrError::UnknownQualityChar` for characters outside the table.
pub fn char_score(q: u8) -> Result<u8, DbrError> {
    if (MIN_QUAL_CHAR..=MAX_QUAL_CHAR).contains(&q) {
        Ok(q - QUAL_OFFSET)
    } else {
        Err(DbrError::UnknownQualityChar(q))
    }
}

/// Median of a set of scores. The slice is sorted in place. An even
/// number of scores gives the mean of the two middle values. An empty
/// slice has median 0.
pub fn median(scores: &mut [u8]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }

    scores.sort_unstable();
    let mid = scores.len() / 2;
    if scores.len() % 2 == 0 {
        (f64::from(scores[mid - 1]) + f64::from(scores[mid])) / 2.0
    } else {
        f64::from(scores[mid])
    }
}

/// Median score of a quality string.
///
/// # Errors
///
/// `DbrError::UnknownQualityChar` for the first character outside the
/// table; no partial score is computed.
pub fn median_quality(qual: &[u8]) -> Result<f64, DbrError> {
    let mut scores = qual
        .iter()
        .map(|&q| char_score(q))
        .collect::<Result<Vec<u8>, DbrError>>()?;
    Ok(median(&mut scores))
}
