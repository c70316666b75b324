//! Error and event types
//!
//! The scanner never panics on malformed input and never returns `Result`
//! from its parsing operations; every operation reports one of the four
//! [`ParsingEvent`] statuses and leaves the failure details behind
//! accessors. The message strings below are part of the public contract.

use thiserror::Error;

/// Status of a parsing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsingEvent {
    /// The parser needs a new input buffer to continue. Call
    /// [`feed`](crate::core::VcfScanner::feed) with the next chunk; an
    /// empty chunk signals end of input.
    NeedMoreData,
    /// The requested field (or the header) has been parsed and its value
    /// is available through the corresponding accessor.
    Ok,
    /// Parsed successfully, but the parser recorded warnings. Retrieve
    /// them with [`warnings`](crate::core::VcfScanner::warnings).
    OkWithWarnings,
    /// A parsing error occurred. Retrieve the message with
    /// [`error`](crate::core::VcfScanner::error). Header errors are fatal
    /// for the parser instance; data line errors can be skipped with
    /// [`clear_line`](crate::core::VcfScanner::clear_line).
    Error,
}

/// A parsing failure. `Display` renders the exact user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("VCF files must start with '##fileformat'")]
    MissingFileFormat,

    #[error("Malformed meta-information line")]
    MalformedMetaInfo,

    #[error("Malformed VCF header line")]
    MalformedHeaderLine,

    #[error("Unexpected end of file while parsing VCF file header")]
    UnexpectedEofInHeader,

    /// A data line ended before the named mandatory column.
    #[error("Missing mandatory VCF field \"{0}\"")]
    MissingMandatoryField(&'static str),

    #[error("Missing an integer in the POS column")]
    MissingPos,

    #[error("Integer overflow in the POS column")]
    PosOverflow,

    #[error("Invalid data line format")]
    InvalidDataLine,

    /// FORMAT column present but the header declared no samples.
    #[error("No genotype information present")]
    NoGenotypeInfo,

    #[error("The number of genotype fields exceeds the number of samples")]
    TooManyGenotypeFields,

    /// More colon-separated values in a genotype than FORMAT keys.
    #[error("Too many genotype info fields")]
    TooManyGenotypeValues,

    #[error("Empty GT value")]
    EmptyGtValue,

    #[error("Integer overflow in allele index")]
    AlleleIndexOverflow,

    #[error("Allele index exceeds the number of alleles")]
    AlleleIndexOutOfRange,

    #[error("Invalid character in GT value")]
    InvalidGtCharacter,

    /// Operations called out of order. Also a debug assertion failure.
    #[error("{0}")]
    ApiMisuse(&'static str),
}

/// A non-fatal issue recorded while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// One-based line number where the issue was observed.
    pub line_number: u32,
    pub message: String,
}

/// Top-level error for programs that drive the scanner over files.
#[derive(Debug, Error)]
pub enum VcfToolError {
    #[error("VCF parse error at line {line}: {source}")]
    Scan {
        line: u32,
        #[source]
        source: ScanError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
