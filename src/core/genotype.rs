//! FORMAT key indexing and GT decoding
//!
//! Each data line rebuilds a small index over its FORMAT column: the
//! 1-based position of `GT` and a map from every other key to its
//! position. Key strings are interned once per parser so rebuilding the
//! index for every record does not reallocate them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::error::ScanError;

/// Per-parser deduplicating store for FORMAT key names.
///
/// `Arc<str>` handles stay valid for the life of the parser, so the
/// per-record position map can key on them without copying.
#[derive(Debug, Default)]
pub(crate) struct KeyInterner {
    keys: HashSet<Arc<str>>,
}

impl KeyInterner {
    pub(crate) fn intern(&mut self, key: &str) -> Arc<str> {
        if let Some(existing) = self.keys.get(key) {
            Arc::clone(existing)
        } else {
            let key: Arc<str> = Arc::from(key);
            self.keys.insert(Arc::clone(&key));
            key
        }
    }
}

/// Positions of the genotype keys within the current record's FORMAT
/// column, all 1-based. Rebuilt for every record.
#[derive(Debug, Default)]
pub(crate) struct GenotypeKeyPositions {
    pub(crate) number_of_positions: u32,
    /// Position of the reserved `GT` key; 0 when FORMAT had no `GT`.
    pub(crate) gt: u32,
    pub(crate) other_keys: HashMap<Arc<str>, u32>,
}

impl GenotypeKeyPositions {
    pub(crate) fn clear(&mut self) {
        self.number_of_positions = 0;
        self.gt = 0;
        self.other_keys.clear();
    }
}

/// What to do with the value at one FORMAT position of a genotype field.
///
/// Uncaptured positions are skipped byte for byte. The `Gt` capture
/// decodes the value into the parser-owned allele vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Capture {
    #[default]
    Skip,
    Gt,
}

/// Decodes a GT value such as `0|1`, `1/.`, `./.` or `2` into allele
/// indices. A `.` allele becomes `-1`. The last separator seen decides
/// `phased`: `|` phased, `/` unphased. When `alt_limit` is known (ALT has
/// been parsed for this record), an allele index strictly greater than
/// the number of ALT alleles is rejected.
pub(crate) fn decode_gt(
    token: &[u8],
    gt: &mut Vec<i32>,
    phased: &mut bool,
    alt_limit: Option<usize>,
) -> Option<ScanError> {
    gt.clear();

    if token.is_empty() {
        return Some(ScanError::EmptyGtValue);
    }

    let mut at = 0;
    loop {
        if at == token.len() {
            // A separator was the last byte of the value.
            return Some(ScanError::InvalidGtCharacter);
        }

        if token[at] == b'.' {
            gt.push(-1);
            at += 1;
        } else {
            let digit = token[at].wrapping_sub(b'0');
            if digit > 9 {
                return Some(ScanError::InvalidGtCharacter);
            }
            let mut allele = u32::from(digit);
            at += 1;
            while at < token.len() {
                let digit = token[at].wrapping_sub(b'0');
                if digit > 9 {
                    break;
                }
                allele = match allele
                    .checked_mul(10)
                    .and_then(|n| n.checked_add(u32::from(digit)))
                {
                    Some(n) => n,
                    None => return Some(ScanError::AlleleIndexOverflow),
                };
                at += 1;
            }
            gt.push(allele as i32);

            if let Some(limit) = alt_limit {
                if allele as usize > limit {
                    return Some(ScanError::AlleleIndexOutOfRange);
                }
            }
        }

        if at == token.len() {
            return None;
        }
        match token[at] {
            b'/' => *phased = false,
            b'|' => *phased = true,
            _ => return Some(ScanError::InvalidGtCharacter),
        }
        at += 1;
    }
}
