//! VCF header model
//!
//! A passive value object filled in by the scanner while it walks the
//! `##`-prefixed meta-information lines and the `#CHROM` column line.
//! Read-only for callers once the header has parsed.

use std::collections::BTreeMap;

/// Ordered multimap of meta-information keys to their values.
///
/// Keys are stored without the leading `##`; a key that occurs on several
/// lines (for example `INFO` or `FORMAT`) collects its values in file
/// order under a single entry.
pub type MetaInfo = BTreeMap<String, Vec<String>>;

/// Metadata extracted from the VCF header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcfHeader {
    pub(crate) file_format_version: String,
    pub(crate) meta_info: MetaInfo,
    pub(crate) genotype_info_present: bool,
    pub(crate) sample_ids: Vec<String>,
}

impl VcfHeader {
    /// The value of the `##fileformat` line, for example `VCFv4.3`.
    pub fn file_format_version(&self) -> &str {
        &self.file_format_version
    }

    pub fn meta_info(&self) -> &MetaInfo {
        &self.meta_info
    }

    /// True if the header line carried a FORMAT column, with or without
    /// sample columns after it.
    pub fn has_genotype_info(&self) -> bool {
        self.genotype_info_present
    }

    /// Sample IDs from the header line, in file order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_header_is_empty() {
        let header = VcfHeader::default();
        assert_eq!(header.file_format_version(), "");
        assert!(header.meta_info().is_empty());
        assert!(!header.has_genotype_info());
        assert!(header.sample_ids().is_empty());
    }

    #[test]
    fn repeated_keys_collect_in_order() {
        let mut header = VcfHeader::default();
        header
            .meta_info
            .entry("INFO".to_string())
            .or_default()
            .push("<ID=DP,Number=1,Type=Integer>".to_string());
        header
            .meta_info
            .entry("INFO".to_string())
            .or_default()
            .push("<ID=AF,Number=A,Type=Float>".to_string());

        let values = &header.meta_info()["INFO"];
        assert_eq!(values.len(), 2);
        assert!(values[0].contains("ID=DP"));
        assert!(values[1].contains("ID=AF"));
    }
}
