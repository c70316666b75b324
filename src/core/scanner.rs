//! Pull-mode VCF record state machine
//!
//! [`VcfScanner`] walks a VCF stream through the meta-information header,
//! the `#CHROM` column line, and any number of data lines. The caller
//! drives it field by field: each `parse_*` operation takes the stream
//! from its current position to the position after that field, returning
//! [`ParsingEvent::NeedMoreData`] whenever the installed buffer runs out.
//! [`feed`](VcfScanner::feed) installs the next buffer and resumes the
//! suspended operation.
//!
//! The scanner performs no I/O and stores no parsed data beyond the most
//! recently requested field (header metadata and sample IDs excepted).
//! Skipped fields are consumed without copying. After a data line error,
//! [`clear_line`](VcfScanner::clear_line) resynchronizes to the next
//! record.

use super::error::{ParsingEvent, ScanError, Warning};
use super::genotype::{decode_gt, Capture, GenotypeKeyPositions, KeyInterner};
use super::header::VcfHeader;
use super::tokenizer::{DelimClass, IntParse, Terminator, Tokenizer};

/// Number of mandatory data-line columns.
const MANDATORY_COLUMNS: usize = 8;

/// Column names in data-line order, used for missing-field diagnostics.
const COLUMN_NAMES: [&str; MANDATORY_COLUMNS + 2] = [
    "CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO", "FORMAT", "GENOTYPE",
];

/// Join of header progress and per-record progress. The record states
/// `ParsingChrom..=ParsingGenotypes` are in column order so that skipping
/// forward is a walk along the enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum State {
    ParsingFileFormat,
    ParsingMetaInfoKey,
    ParsingMetaInfoValue,
    ParsingHeaderLineColumns,
    ParsingSampleIds,
    ParsingChrom,
    ParsingPos,
    ParsingId,
    ParsingRef,
    ParsingAlt,
    ParsingQuality,
    ParsingFilter,
    ParsingInfoField,
    ParsingGenotypeFormat,
    ParsingGenotypes,
    EndOfDataLine,
    SkippingToNextLine,
    PeekingBeyondNewline,
}

impl State {
    /// Offset of a record state within [`COLUMN_NAMES`].
    fn column_offset(self) -> usize {
        self as usize - State::ParsingChrom as usize
    }

    /// The state after the next tab-delimited field.
    fn next_field(self) -> State {
        match self {
            State::ParsingChrom => State::ParsingPos,
            State::ParsingPos => State::ParsingId,
            State::ParsingId => State::ParsingRef,
            State::ParsingRef => State::ParsingAlt,
            State::ParsingAlt => State::ParsingQuality,
            State::ParsingQuality => State::ParsingFilter,
            State::ParsingFilter => State::ParsingInfoField,
            State::ParsingInfoField => State::ParsingGenotypeFormat,
            State::ParsingGenotypeFormat => State::ParsingGenotypes,
            other => other,
        }
    }
}

/// Which caller-visible list field a list parse is filling.
#[derive(Debug, Clone, Copy)]
enum ListKind {
    Ids,
    Alts,
    Filters,
}

fn token_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Incremental parser for VCF (Variant Call Format) streams.
///
/// The scanner parses the header first, then data lines one by one. All
/// header information is retained for the life of the scanner; data line
/// fields are overwritten as soon as the next field is requested.
///
/// There is no read loop inside: the caller supplies input with
/// [`feed`](VcfScanner::feed) whenever an operation returns
/// [`ParsingEvent::NeedMoreData`]. The fed buffer must stay untouched
/// until the operation completes, which the `'buf` borrow enforces.
#[derive(Debug)]
pub struct VcfScanner<'buf> {
    tokenizer: Tokenizer<'buf>,
    state: State,
    /// Tab-delimited fields still to consume before the suspended skip
    /// reaches its target field.
    fields_to_skip: usize,

    current_meta_info_key: String,
    header_columns_ok: usize,
    header: VcfHeader,

    next_list_index: usize,
    number_len: u32,

    chrom: String,
    pos: u32,
    ids: Vec<String>,
    ref_allele: String,
    alts: Vec<String>,
    alleles_parsed: bool,
    quality: String,
    filters: Vec<String>,
    info: Vec<String>,

    key_interner: KeyInterner,
    key_positions: GenotypeKeyPositions,
    captures: Vec<Capture>,
    current_genotype_field_index: usize,
    current_genotype_value_index: usize,
    gt_reordered: bool,
    gt: Vec<i32>,
    phased_gt: bool,

    warnings: Vec<Warning>,
    error: Option<ScanError>,
}

impl<'buf> Default for VcfScanner<'buf> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'buf> VcfScanner<'buf> {
    pub fn new() -> Self {
        VcfScanner {
            tokenizer: Tokenizer::new(),
            state: State::ParsingFileFormat,
            fields_to_skip: 0,
            current_meta_info_key: String::new(),
            header_columns_ok: 0,
            header: VcfHeader::default(),
            next_list_index: 0,
            number_len: 0,
            chrom: String::new(),
            pos: 0,
            ids: Vec::new(),
            ref_allele: String::new(),
            alts: Vec::new(),
            alleles_parsed: false,
            quality: String::new(),
            filters: Vec::new(),
            info: Vec::new(),
            key_interner: KeyInterner::default(),
            key_positions: GenotypeKeyPositions::default(),
            captures: Vec::new(),
            current_genotype_field_index: 0,
            current_genotype_value_index: 0,
            gt_reordered: false,
            gt: Vec::new(),
            phased_gt: false,
            warnings: Vec::new(),
            error: None,
        }
    }

    /// Supplies the next chunk of input and resumes the paused operation.
    ///
    /// Must be called right after construction (header parsing starts
    /// immediately) and whenever an operation returns
    /// [`ParsingEvent::NeedMoreData`]. An empty buffer signals EOF.
    pub fn feed(&mut self, buffer: &'buf [u8]) -> ParsingEvent {
        self.tokenizer.set_buffer(buffer);

        if self.state == State::ParsingGenotypes {
            return self.continue_parsing_genotype();
        }

        if self.state <= State::ParsingPos {
            if self.state < State::ParsingChrom {
                return self.continue_parsing_header();
            }
            if self.state == State::ParsingChrom {
                match self.parse_string_field(State::ParsingPos) {
                    ParsingEvent::Ok => self.chrom = token_string(self.tokenizer.token()),
                    other => return other,
                }
            }
            return self.continue_parsing_pos();
        }

        while self.fields_to_skip > 0 {
            let delim = self.tokenizer.find_delim(DelimClass::NewlineOrTab);
            if !self.tokenizer.skip_token(delim) {
                return ParsingEvent::NeedMoreData;
            }
            if self.tokenizer.at_eol() {
                let missing = self.state.column_offset() + 1 - self.fields_to_skip;
                self.fields_to_skip = 0;
                return self.missing_mandatory_field(missing);
            }
            self.fields_to_skip -= 1;
        }

        match self.state {
            State::ParsingId => self.continue_parsing_ids(),
            State::ParsingRef => match self.parse_string_field(State::ParsingAlt) {
                ParsingEvent::Ok => {
                    self.ref_allele = token_string(self.tokenizer.token());
                    self.continue_parsing_alts()
                }
                other => other,
            },
            State::ParsingAlt => self.continue_parsing_alts(),
            State::ParsingQuality => self.continue_parsing_quality(),
            State::ParsingFilter => self.continue_parsing_filters(),
            State::ParsingInfoField => self.continue_parsing_info(),
            State::ParsingGenotypeFormat => self.continue_parsing_genotype_format(),
            State::SkippingToNextLine => {
                let delim = self.tokenizer.find_newline();
                if !self.tokenizer.skip_token(delim) {
                    return ParsingEvent::NeedMoreData;
                }
                if self.tokenizer.buffer_is_empty() && !self.tokenizer.at_eof() {
                    self.state = State::PeekingBeyondNewline;
                    return ParsingEvent::NeedMoreData;
                }
                self.reset_data_line();
                ParsingEvent::Ok
            }
            State::PeekingBeyondNewline => {
                self.reset_data_line();
                ParsingEvent::Ok
            }
            _ => self.misuse("feed() called with no parsing operation in progress"),
        }
    }

    /// One-based line number of the line about to be (or being) parsed.
    pub fn line_number(&self) -> u32 {
        self.tokenizer.line_number()
    }

    /// The VCF header. Complete once the initial series of `feed` calls
    /// has returned [`ParsingEvent::Ok`].
    pub fn header(&self) -> &VcfHeader {
        &self.header
    }

    /// Warnings accumulated so far.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// The error behind the most recent [`ParsingEvent::Error`].
    pub fn error(&self) -> Option<&ScanError> {
        self.error.as_ref()
    }

    /// True once the entire input has been consumed.
    pub fn at_eof(&self) -> bool {
        self.tokenizer.at_eof()
    }

    /// Parses the CHROM and POS fields.
    pub fn parse_loc(&mut self) -> ParsingEvent {
        if self.state != State::ParsingChrom {
            if self.state < State::ParsingChrom {
                return self.misuse("the VCF header must be parsed before the first data line");
            }
            return self.misuse("clear_line() must be called before parse_loc()");
        }

        self.pos = 0;
        self.number_len = 0;

        match self.parse_string_field(State::ParsingPos) {
            ParsingEvent::Ok => self.chrom = token_string(self.tokenizer.token()),
            other => return other,
        }
        self.continue_parsing_pos()
    }

    /// CHROM field parsed by [`parse_loc`](VcfScanner::parse_loc).
    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    /// POS field parsed by [`parse_loc`](VcfScanner::parse_loc).
    pub fn pos(&self) -> u32 {
        self.pos
    }

    /// Parses the ID field. An ID of `.` yields an empty list.
    pub fn parse_ids(&mut self) -> ParsingEvent {
        self.next_list_index = 0;
        match self.skip_to_state(State::ParsingId) {
            ParsingEvent::Ok => self.continue_parsing_ids(),
            other => other,
        }
    }

    /// IDs parsed by [`parse_ids`](VcfScanner::parse_ids).
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Parses the REF and ALT fields.
    pub fn parse_alleles(&mut self) -> ParsingEvent {
        self.next_list_index = 0;
        match self.skip_to_state(State::ParsingRef) {
            ParsingEvent::Ok => {}
            other => return other,
        }
        match self.parse_string_field(State::ParsingAlt) {
            ParsingEvent::Ok => self.ref_allele = token_string(self.tokenizer.token()),
            other => return other,
        }
        self.continue_parsing_alts()
    }

    /// REF field parsed by [`parse_alleles`](VcfScanner::parse_alleles).
    pub fn ref_allele(&self) -> &str {
        &self.ref_allele
    }

    /// ALT alleles parsed by [`parse_alleles`](VcfScanner::parse_alleles).
    /// An ALT of `.` yields an empty list.
    pub fn alts(&self) -> &[String] {
        &self.alts
    }

    /// Parses the QUAL field.
    pub fn parse_quality(&mut self) -> ParsingEvent {
        match self.skip_to_state(State::ParsingQuality) {
            ParsingEvent::Ok => self.continue_parsing_quality(),
            other => other,
        }
    }

    /// Raw QUAL string parsed by
    /// [`parse_quality`](VcfScanner::parse_quality); empty for `.`.
    pub fn quality(&self) -> &str {
        &self.quality
    }

    /// Parses the FILTER field. `.` yields an empty list; `PASS` is
    /// surfaced verbatim.
    pub fn parse_filters(&mut self) -> ParsingEvent {
        self.next_list_index = 0;
        match self.skip_to_state(State::ParsingFilter) {
            ParsingEvent::Ok => self.continue_parsing_filters(),
            other => other,
        }
    }

    /// Filters parsed by [`parse_filters`](VcfScanner::parse_filters).
    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    /// Parses the INFO field into `KEY=VALUE` and bare-flag entries.
    pub fn parse_info(&mut self) -> ParsingEvent {
        self.info.clear();
        match self.skip_to_state(State::ParsingInfoField) {
            ParsingEvent::Ok => self.continue_parsing_info(),
            other => other,
        }
    }

    /// INFO entries parsed by [`parse_info`](VcfScanner::parse_info).
    pub fn info(&self) -> &[String] {
        &self.info
    }

    /// Parses the FORMAT column and rebuilds the genotype key index.
    ///
    /// Returns [`ParsingEvent::OkWithWarnings`] when `GT` is present but
    /// not the first key. When the line already ended at INFO there is no
    /// FORMAT column to parse: that is fine for a sample-less header and
    /// an error when the header declared samples.
    pub fn parse_genotype_format(&mut self) -> ParsingEvent {
        self.key_positions.clear();
        self.gt_reordered = false;
        if self.state == State::EndOfDataLine {
            if self.header.sample_ids.is_empty() {
                return ParsingEvent::Ok;
            }
            return self.data_line_error(ScanError::NoGenotypeInfo);
        }
        match self.skip_to_state(State::ParsingGenotypeFormat) {
            ParsingEvent::Ok => self.continue_parsing_genotype_format(),
            other => other,
        }
    }

    /// 1-based position of `key` in the current record's FORMAT column.
    /// `GT` has its own slot; see
    /// [`format_gt_position`](VcfScanner::format_gt_position).
    pub fn format_key_position(&self, key: &str) -> Option<u32> {
        self.key_positions.other_keys.get(key).copied()
    }

    /// 1-based position of `GT` in the current record's FORMAT column.
    pub fn format_gt_position(&self) -> Option<u32> {
        if self.key_positions.gt == 0 {
            None
        } else {
            Some(self.key_positions.gt)
        }
    }

    /// Total number of keys in the current record's FORMAT column.
    pub fn format_key_count(&self) -> u32 {
        self.key_positions.number_of_positions
    }

    /// Arms GT decoding for the genotype fields of the current record.
    ///
    /// Returns `false` and does nothing when the FORMAT column did not
    /// list `GT`. Must be called after
    /// [`parse_genotype_format`](VcfScanner::parse_genotype_format) for
    /// every record whose genotypes are wanted.
    pub fn capture_gt(&mut self) -> bool {
        let gt_position = self.key_positions.gt;
        if gt_position == 0 {
            return false;
        }
        let slot = (gt_position - 1) as usize;
        if self.captures.len() <= slot {
            self.captures.resize(slot + 1, Capture::Skip);
        }
        self.captures[slot] = Capture::Gt;
        true
    }

    /// Parses the next genotype field. Captured values are decoded;
    /// everything else is skipped byte for byte.
    pub fn parse_genotype(&mut self) -> ParsingEvent {
        if self.state != State::ParsingGenotypes {
            return self.misuse("parse_genotype_format() must be called before parse_genotype()");
        }

        if self.current_genotype_field_index >= self.header.sample_ids.len() {
            return self.data_line_error(ScanError::TooManyGenotypeFields);
        }

        self.current_genotype_value_index = 0;
        self.continue_parsing_genotype()
    }

    /// GT allele indices decoded by the most recent
    /// [`parse_genotype`](VcfScanner::parse_genotype); `-1` for `.`.
    pub fn gt(&self) -> &[i32] {
        &self.gt
    }

    /// True if the most recently decoded genotype was phased (`|`).
    pub fn is_phased_gt(&self) -> bool {
        self.phased_gt
    }

    /// True if at least one more genotype field remains on this line.
    pub fn genotype_available(&self) -> bool {
        self.tokenizer.terminator().is_byte(b'\t')
    }

    /// Skips the rest of the current data line, consuming the newline.
    ///
    /// Safe to call at any point within a record, including after a
    /// recoverable error. Call it after every line, even a fully parsed
    /// one: it also determines whether end of input has been reached.
    pub fn clear_line(&mut self) -> ParsingEvent {
        if !self.tokenizer.at_eof() && self.state != State::PeekingBeyondNewline {
            if self.state != State::EndOfDataLine {
                let delim = self.tokenizer.find_newline();
                if !self.tokenizer.skip_token(delim) {
                    self.state = State::SkippingToNextLine;
                    return ParsingEvent::NeedMoreData;
                }
            }
            if self.tokenizer.buffer_is_empty() && !self.tokenizer.at_eof() {
                // The newline was the last byte of the buffer. Peek at the
                // next buffer to tell end-of-line from end-of-input.
                self.state = State::PeekingBeyondNewline;
                return ParsingEvent::NeedMoreData;
            }
        }

        self.reset_data_line();
        ParsingEvent::Ok
    }

    fn reset_data_line(&mut self) {
        self.state = State::ParsingChrom;
        self.alleles_parsed = false;
    }

    fn reset_genotype_values(&mut self) {
        for capture in &mut self.captures {
            *capture = Capture::Skip;
        }
        self.current_genotype_field_index = 0;
        self.number_len = 0;
    }

    fn header_error(&mut self, error: ScanError) -> ParsingEvent {
        self.error = Some(error);
        ParsingEvent::Error
    }

    fn data_line_error(&mut self, error: ScanError) -> ParsingEvent {
        self.error = Some(error);
        ParsingEvent::Error
    }

    fn missing_mandatory_field(&mut self, column: usize) -> ParsingEvent {
        self.state = State::EndOfDataLine;
        self.data_line_error(ScanError::MissingMandatoryField(COLUMN_NAMES[column]))
    }

    fn misuse(&mut self, message: &'static str) -> ParsingEvent {
        debug_assert!(false, "{message}");
        self.error = Some(ScanError::ApiMisuse(message));
        ParsingEvent::Error
    }

    /// Parses one plain tab-delimited field, leaving it in the tokenizer.
    /// The line must not end here; `target` names the field that would
    /// otherwise be missing.
    fn parse_string_field(&mut self, target: State) -> ParsingEvent {
        let delim = self.tokenizer.find_delim(DelimClass::NewlineOrTab);
        if !self.tokenizer.prepare_token_or_accumulate(delim) {
            return ParsingEvent::NeedMoreData;
        }
        if self.tokenizer.at_eol() {
            return self.missing_mandatory_field(target.column_offset());
        }
        self.state = target;
        ParsingEvent::Ok
    }

    /// Parses a delimiter-separated list field into `kind`'s container,
    /// reusing its existing storage. A lone `.` produces an empty list.
    fn continue_parsing_list(
        &mut self,
        target: State,
        class: DelimClass,
        kind: ListKind,
    ) -> ParsingEvent {
        loop {
            let delim = self.tokenizer.find_delim(class);
            if !self.tokenizer.prepare_token_or_accumulate(delim) {
                return ParsingEvent::NeedMoreData;
            }
            if self.tokenizer.at_eol() {
                return self.missing_mandatory_field(target.column_offset());
            }
            if !self.tokenizer.token_is_dot() {
                let value = token_string(self.tokenizer.token());
                let container = match kind {
                    ListKind::Ids => &mut self.ids,
                    ListKind::Alts => &mut self.alts,
                    ListKind::Filters => &mut self.filters,
                };
                if self.next_list_index < container.len() {
                    container[self.next_list_index] = value;
                } else {
                    container.push(value);
                }
                self.next_list_index += 1;
            }
            if self.tokenizer.terminator().is_byte(b'\t') {
                break;
            }
        }

        let len = self.next_list_index;
        match kind {
            ListKind::Ids => self.ids.truncate(len),
            ListKind::Alts => self.alts.truncate(len),
            ListKind::Filters => self.filters.truncate(len),
        }
        self.state = target;
        ParsingEvent::Ok
    }

    /// Skips whole fields until `state` reaches `target`. A newline on the
    /// way means a mandatory field is missing.
    fn skip_to_state(&mut self, target: State) -> ParsingEvent {
        if self.state < State::ParsingChrom {
            return self.misuse("the VCF header must be parsed before the first data line");
        }
        if self.state > target {
            return self.misuse("clear_line() must be called before re-parsing an earlier field");
        }

        while self.state < target {
            let delim = self.tokenizer.find_delim(DelimClass::NewlineOrTab);
            if !self.tokenizer.skip_token(delim) {
                self.fields_to_skip = target.column_offset() - self.state.column_offset();
                self.state = target;
                return ParsingEvent::NeedMoreData;
            }
            if self.tokenizer.at_eol() {
                return self.missing_mandatory_field(self.state.column_offset() + 1);
            }
            self.state = self.state.next_field();
        }
        ParsingEvent::Ok
    }

    fn continue_parsing_header(&mut self) -> ParsingEvent {
        loop {
            match self.state {
                State::ParsingFileFormat => {
                    let delim = self.tokenizer.find_newline();
                    if !self.tokenizer.prepare_token_or_accumulate(delim) {
                        return ParsingEvent::NeedMoreData;
                    }
                    match self.tokenizer.token_key_value(b'=') {
                        Some((key, value)) if key == b"##fileformat" => {
                            self.header.file_format_version = token_string(value);
                        }
                        _ => return self.header_error(ScanError::MissingFileFormat),
                    }
                    self.state = State::ParsingMetaInfoKey;
                }

                State::ParsingMetaInfoKey => {
                    let delim = self.tokenizer.find_delim(DelimClass::NewlineTabEquals);
                    if !self.tokenizer.prepare_token_or_accumulate(delim) {
                        return ParsingEvent::NeedMoreData;
                    }
                    if self.tokenizer.at_eol() {
                        return self.header_error(ScanError::MalformedMetaInfo);
                    }
                    if self.tokenizer.terminator().is_byte(b'\t') {
                        // A tab instead of '=' means the header line has
                        // started; its first column carries the '#' prefix.
                        if self.tokenizer.token().get(1..) != Some(COLUMN_NAMES[0].as_bytes()) {
                            return self.header_error(ScanError::MalformedMetaInfo);
                        }
                        self.header_columns_ok = 1;
                        self.state = State::ParsingHeaderLineColumns;
                    } else {
                        // '=' found: the token is a ##KEY meta-info key.
                        let token = self.tokenizer.token();
                        if token.len() < 3 || !token.starts_with(b"##") {
                            return self.header_error(ScanError::MalformedMetaInfo);
                        }
                        self.current_meta_info_key = token_string(&token[2..]);
                        self.state = State::ParsingMetaInfoValue;
                    }
                }

                State::ParsingMetaInfoValue => {
                    let delim = self.tokenizer.find_newline();
                    if !self.tokenizer.prepare_token_or_accumulate(delim) {
                        return ParsingEvent::NeedMoreData;
                    }
                    if self.tokenizer.terminator() == Terminator::Eof {
                        return self.header_error(ScanError::UnexpectedEofInHeader);
                    }
                    let value = token_string(self.tokenizer.token());
                    self.header
                        .meta_info
                        .entry(self.current_meta_info_key.clone())
                        .or_default()
                        .push(value);
                    self.state = State::ParsingMetaInfoKey;
                }

                State::ParsingHeaderLineColumns => {
                    loop {
                        let delim = self.tokenizer.find_delim(DelimClass::NewlineOrTab);
                        if !self.tokenizer.prepare_token_or_accumulate(delim) {
                            return ParsingEvent::NeedMoreData;
                        }
                        if self.tokenizer.token() != COLUMN_NAMES[self.header_columns_ok].as_bytes()
                        {
                            return self.header_error(ScanError::MalformedHeaderLine);
                        }
                        self.header_columns_ok += 1;

                        if self.tokenizer.at_eol() {
                            if self.header_columns_ok < MANDATORY_COLUMNS {
                                return self.header_error(ScanError::MalformedHeaderLine);
                            }
                            if self.header_columns_ok > MANDATORY_COLUMNS {
                                // FORMAT is present but there are no samples.
                                self.header.genotype_info_present = true;
                            }
                            return self.end_of_header_line();
                        }

                        if self.header_columns_ok > MANDATORY_COLUMNS {
                            break;
                        }
                    }
                    self.header.genotype_info_present = true;
                    self.state = State::ParsingSampleIds;
                }

                State::ParsingSampleIds => {
                    loop {
                        let delim = self.tokenizer.find_delim(DelimClass::NewlineOrTab);
                        if !self.tokenizer.prepare_token_or_accumulate(delim) {
                            return ParsingEvent::NeedMoreData;
                        }
                        self.header
                            .sample_ids
                            .push(token_string(self.tokenizer.token()));
                        if !self.tokenizer.terminator().is_byte(b'\t') {
                            break;
                        }
                    }
                    return self.end_of_header_line();
                }

                _ => return self.misuse("the VCF header has already been parsed"),
            }
        }
    }

    fn end_of_header_line(&mut self) -> ParsingEvent {
        if self.tokenizer.buffer_is_empty() && !self.tokenizer.at_eof() {
            self.state = State::PeekingBeyondNewline;
            return ParsingEvent::NeedMoreData;
        }
        self.reset_data_line();
        ParsingEvent::Ok
    }

    fn continue_parsing_pos(&mut self) -> ParsingEvent {
        match self.tokenizer.parse_uint(&mut self.pos, &mut self.number_len) {
            IntParse::EndOfBuffer => return ParsingEvent::NeedMoreData,
            IntParse::IntegerOverflow => return self.data_line_error(ScanError::PosOverflow),
            IntParse::EndOfNumber => {}
        }

        if self.number_len == 0 {
            return self.data_line_error(ScanError::MissingPos);
        }
        if !self.tokenizer.terminator().is_byte(b'\t') {
            return self.data_line_error(ScanError::InvalidDataLine);
        }

        self.state = State::ParsingId;
        ParsingEvent::Ok
    }

    fn continue_parsing_ids(&mut self) -> ParsingEvent {
        self.continue_parsing_list(
            State::ParsingRef,
            DelimClass::NewlineTabSemicolon,
            ListKind::Ids,
        )
    }

    fn continue_parsing_alts(&mut self) -> ParsingEvent {
        let event = self.continue_parsing_list(
            State::ParsingQuality,
            DelimClass::NewlineTabComma,
            ListKind::Alts,
        );
        if event == ParsingEvent::Ok {
            self.alleles_parsed = true;
        }
        event
    }

    fn continue_parsing_quality(&mut self) -> ParsingEvent {
        match self.parse_string_field(State::ParsingFilter) {
            ParsingEvent::Ok => {}
            other => return other,
        }
        if self.tokenizer.token_is_dot() {
            self.quality.clear();
        } else {
            self.quality = token_string(self.tokenizer.token());
        }
        ParsingEvent::Ok
    }

    fn continue_parsing_filters(&mut self) -> ParsingEvent {
        self.continue_parsing_list(
            State::ParsingInfoField,
            DelimClass::NewlineTabSemicolon,
            ListKind::Filters,
        )
    }

    fn continue_parsing_info(&mut self) -> ParsingEvent {
        loop {
            let delim = self.tokenizer.find_delim(DelimClass::NewlineTabSemicolon);
            if !self.tokenizer.prepare_token_or_accumulate(delim) {
                return ParsingEvent::NeedMoreData;
            }
            if self.tokenizer.at_eol() {
                // INFO was the last field on this line; FORMAT is absent.
                self.state = State::EndOfDataLine;
                return ParsingEvent::Ok;
            }
            if !self.tokenizer.token_is_dot() {
                self.info.push(token_string(self.tokenizer.token()));
            }
            if self.tokenizer.terminator().is_byte(b'\t') {
                break;
            }
        }
        self.state = State::ParsingGenotypeFormat;
        ParsingEvent::Ok
    }

    fn continue_parsing_genotype_format(&mut self) -> ParsingEvent {
        loop {
            let delim = self.tokenizer.find_delim(DelimClass::NewlineTabColon);
            if !self.tokenizer.prepare_token_or_accumulate(delim) {
                return ParsingEvent::NeedMoreData;
            }
            if self.tokenizer.at_eol() {
                self.state = State::EndOfDataLine;
                if self.header.sample_ids.is_empty() {
                    return ParsingEvent::Ok;
                }
                return self.data_line_error(ScanError::NoGenotypeInfo);
            }

            let key = String::from_utf8_lossy(self.tokenizer.token());
            let key = self.key_interner.intern(&key);
            if &*key == "GT" {
                if self.key_positions.number_of_positions != 0 {
                    self.gt_reordered = true;
                    self.warnings.push(Warning {
                        line_number: self.tokenizer.line_number(),
                        message: "GT is not the first key of the FORMAT column".to_string(),
                    });
                }
                self.key_positions.number_of_positions += 1;
                self.key_positions.gt = self.key_positions.number_of_positions;
            } else {
                self.key_positions.number_of_positions += 1;
                let position = self.key_positions.number_of_positions;
                self.key_positions.other_keys.insert(key, position);
            }

            if self.tokenizer.terminator().is_byte(b'\t') {
                break;
            }
        }

        self.reset_genotype_values();
        self.state = State::ParsingGenotypes;
        if self.gt_reordered {
            ParsingEvent::OkWithWarnings
        } else {
            ParsingEvent::Ok
        }
    }

    fn continue_parsing_genotype(&mut self) -> ParsingEvent {
        loop {
            let capture = self
                .captures
                .get(self.current_genotype_value_index)
                .copied()
                .unwrap_or(Capture::Skip);

            match capture {
                Capture::Skip => {
                    let delim = self.tokenizer.find_delim(DelimClass::NewlineTabColon);
                    if !self.tokenizer.skip_token(delim) {
                        return ParsingEvent::NeedMoreData;
                    }
                    if self.tokenizer.at_eol() {
                        self.state = State::EndOfDataLine;
                        return ParsingEvent::Ok;
                    }
                }
                Capture::Gt => {
                    let delim = self.tokenizer.find_delim(DelimClass::NewlineTabColon);
                    if !self.tokenizer.prepare_token_or_accumulate(delim) {
                        return ParsingEvent::NeedMoreData;
                    }
                    if self.tokenizer.at_eol() {
                        self.state = State::EndOfDataLine;
                    }
                    let alt_limit = if self.alleles_parsed {
                        Some(self.alts.len())
                    } else {
                        None
                    };
                    if let Some(error) = decode_gt(
                        self.tokenizer.token(),
                        &mut self.gt,
                        &mut self.phased_gt,
                        alt_limit,
                    ) {
                        return self.data_line_error(error);
                    }
                    if self.tokenizer.at_eol() {
                        return ParsingEvent::Ok;
                    }
                }
            }

            if self.tokenizer.terminator().is_byte(b'\t') {
                self.current_genotype_field_index += 1;
                return ParsingEvent::Ok;
            }

            self.current_genotype_value_index += 1;
            if self.current_genotype_value_index >= self.key_positions.number_of_positions as usize
            {
                return self.data_line_error(ScanError::TooManyGenotypeValues);
            }
        }
    }
}
