//! FastVcfScan - pull-mode, push-fed VCF parsing
//!
//! An incremental parser for the VCF (Variant Call Format) text format.
//! The caller drives both I/O and consumption: input arrives through
//! [`VcfScanner::feed`] as externally owned byte buffers, and each data
//! line field is parsed on demand with a dedicated `parse_*` call.
//!
//! # Features
//!
//! - Zero-copy tokenization; bytes are copied only when a token straddles
//!   two fed buffers
//! - No internal read loop and no blocking: any operation either finishes
//!   against the installed buffer or asks for more data
//! - Mid-line error recovery with [`VcfScanner::clear_line`]
//! - On-demand GT decoding with phasing detection
//!
//! # Example
//!
//! ```ignore
//! use fast_vcfscan::{ParsingEvent, VcfScanner};
//!
//! let data = std::fs::read("input.vcf")?;
//! let mut scanner = VcfScanner::new();
//!
//! // Feed until the header is complete.
//! let mut event = scanner.feed(&data);
//! assert_eq!(event, ParsingEvent::Ok);
//! println!("version {}", scanner.header().file_format_version());
//!
//! // Then pull each record field by field.
//! event = scanner.parse_loc();
//! println!("{}:{}", scanner.chrom(), scanner.pos());
//! ```

pub mod core;

// Re-export commonly used types
pub use core::{
    DelimClass, IntParse, MetaInfo, ParsingEvent, ScanError, Terminator, Tokenizer, VcfHeader,
    VcfScanner, VcfToolError, Warning,
};
