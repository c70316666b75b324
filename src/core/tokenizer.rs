//! Byte-level VCF tokenization
//!
//! Scans a caller-owned buffer for field boundaries with zero-copy token
//! extraction. A token that straddles two fed buffers is stitched together
//! in an internal accumulator; everything else is a borrowed slice of the
//! caller's buffer.

use memchr::{memchr, memchr2, memchr3};

/// Delimiter classes used to find field boundaries.
///
/// Each class corresponds to one VCF field family: plain tab-delimited
/// fields, meta-information keys, semicolon lists, comma lists, and
/// colon-separated FORMAT/genotype values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelimClass {
    /// `\n` or `\t`: CHROM, POS, REF, QUAL, or any skipped field
    NewlineOrTab,
    /// `\n`, `\t`, or `=`: meta-information lines and the first header-line column
    NewlineTabEquals,
    /// `\n`, `\t`, or `;`: ID, FILTER, INFO
    NewlineTabSemicolon,
    /// `\n`, `\t`, or `,`: ALT
    NewlineTabComma,
    /// `\n`, `\t`, or `:`: FORMAT and genotype values
    NewlineTabColon,
}

/// The byte that ended the most recent token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// A delimiter byte from the input
    Byte(u8),
    /// End of input
    Eof,
}

impl Terminator {
    /// True if the terminator is the given byte.
    #[inline]
    pub fn is_byte(self, byte: u8) -> bool {
        self == Terminator::Byte(byte)
    }
}

/// Outcome of an incremental unsigned-integer parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntParse {
    /// A non-digit byte (or EOF) ended the number; the terminator is set
    EndOfNumber,
    /// The next digit would exceed `u32::MAX`; the terminator is not set
    IntegerOverflow,
    /// The buffer ran out mid-number; feed more data and call again
    EndOfBuffer,
}

/// Where the current token's bytes live.
#[derive(Debug, Clone, Copy)]
enum TokenRef<'buf> {
    Buffer(&'buf [u8]),
    Accumulated,
}

/// Incremental tokenizer over externally fed byte buffers.
///
/// The tokenizer never reads input itself. The caller installs a buffer
/// with [`set_buffer`](Tokenizer::set_buffer), then asks for delimiter
/// positions and tokens. When a token is cut off by the end of the buffer,
/// the pending bytes are copied into an accumulator and the partial parse
/// resumes transparently on the next buffer.
#[derive(Debug)]
pub struct Tokenizer<'buf> {
    current: &'buf [u8],
    eof_reached: bool,
    line_number: u32,
    terminator: Terminator,
    accumulating: bool,
    accumulator: Vec<u8>,
    token: TokenRef<'buf>,
}

impl<'buf> Default for Tokenizer<'buf> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'buf> Tokenizer<'buf> {
    pub fn new() -> Self {
        Tokenizer {
            current: &[],
            eof_reached: false,
            line_number: 1,
            terminator: Terminator::Byte(0),
            accumulating: false,
            accumulator: Vec::new(),
            token: TokenRef::Buffer(&[]),
        }
    }

    /// Installs the next input buffer. An empty buffer signals end of
    /// input and latches the EOF condition for all subsequent queries.
    pub fn set_buffer(&mut self, buffer: &'buf [u8]) {
        self.current = buffer;
        if buffer.is_empty() {
            self.eof_reached = true;
        }
    }

    /// True if the installed buffer has been fully consumed.
    #[inline]
    pub fn buffer_is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// True once an empty buffer has been fed.
    #[inline]
    pub fn at_eof(&self) -> bool {
        self.eof_reached
    }

    /// One-based line number of the line the tokenizer is currently on.
    #[inline]
    pub fn line_number(&self) -> u32 {
        self.line_number
    }

    /// The byte that terminated the most recent token.
    #[inline]
    pub fn terminator(&self) -> Terminator {
        self.terminator
    }

    /// Position of the next newline in the unconsumed buffer, if any.
    #[inline]
    pub fn find_newline(&self) -> Option<usize> {
        memchr(b'\n', self.current)
    }

    /// Position of the next byte from `class` in the unconsumed buffer.
    #[inline]
    pub fn find_delim(&self, class: DelimClass) -> Option<usize> {
        match class {
            DelimClass::NewlineOrTab => memchr2(b'\n', b'\t', self.current),
            DelimClass::NewlineTabEquals => memchr3(b'\n', b'\t', b'=', self.current),
            DelimClass::NewlineTabSemicolon => memchr3(b'\n', b'\t', b';', self.current),
            DelimClass::NewlineTabComma => memchr3(b'\n', b'\t', b',', self.current),
            DelimClass::NewlineTabColon => memchr3(b'\n', b'\t', b':', self.current),
        }
    }

    #[inline]
    fn set_terminator(&mut self, byte: u8) {
        self.terminator = Terminator::Byte(byte);
        if byte == b'\n' {
            self.line_number += 1;
        }
    }

    fn accumulate_remaining(&mut self) {
        if !self.accumulating {
            self.accumulating = true;
            self.accumulator.clear();
        }
        self.accumulator.extend_from_slice(self.current);
        self.current = &[];
    }

    /// Completes the token that ends at `end_of_token` (an index returned
    /// by [`find_newline`](Tokenizer::find_newline) or
    /// [`find_delim`](Tokenizer::find_delim)).
    ///
    /// Returns `true` when a token is ready. When `end_of_token` is `None`
    /// and EOF has not been reached, the remaining buffer is saved in the
    /// accumulator and `false` is returned; the caller must feed the next
    /// buffer and retry. At EOF the accumulated bytes become the final
    /// token (terminator [`Terminator::Eof`]).
    ///
    /// A `\r` immediately preceding a `\n` terminator is stripped from the
    /// token, even when the `\r` and the `\n` arrived in different buffers.
    pub fn prepare_token_or_accumulate(&mut self, end_of_token: Option<usize>) -> bool {
        let end = match end_of_token {
            Some(end) => end,
            None => {
                if !self.eof_reached {
                    self.accumulate_remaining();
                    return false;
                }
                // End of input: the accumulated bytes are the last token.
                self.terminator = Terminator::Eof;
                if self.accumulating {
                    self.accumulating = false;
                    self.token = TokenRef::Accumulated;
                } else {
                    self.token = TokenRef::Buffer(&[]);
                }
                return true;
            }
        };

        let delim = self.current[end];
        self.set_terminator(delim);

        let mut body = &self.current[..end];
        if !self.accumulating {
            if delim == b'\n' && body.last() == Some(&b'\r') {
                body = &body[..body.len() - 1];
            }
            self.token = TokenRef::Buffer(body);
        } else {
            self.accumulating = false;
            if !body.is_empty() {
                if delim == b'\n' && body.last() == Some(&b'\r') {
                    body = &body[..body.len() - 1];
                }
                self.accumulator.extend_from_slice(body);
            } else if delim == b'\n' && self.accumulator.last() == Some(&b'\r') {
                self.accumulator.pop();
            }
            self.token = TokenRef::Accumulated;
        }

        self.current = &self.current[end + 1..];
        true
    }

    /// Like [`prepare_token_or_accumulate`](Tokenizer::prepare_token_or_accumulate)
    /// but discards the token bytes. Any pending accumulation is dropped.
    pub fn skip_token(&mut self, end_of_token: Option<usize>) -> bool {
        self.accumulating = false;

        let end = match end_of_token {
            Some(end) => end,
            None => {
                if !self.eof_reached {
                    self.current = &[];
                    return false;
                }
                self.terminator = Terminator::Eof;
                return true;
            }
        };

        self.set_terminator(self.current[end]);
        self.current = &self.current[end + 1..];
        true
    }

    /// Consumes decimal digits from the buffer into `number`, counting
    /// them in `num_len`. Both accumulate across calls so a number split
    /// over a buffer seam parses correctly; the caller zeroes them before
    /// the first call for a new field.
    pub fn parse_uint(&mut self, number: &mut u32, num_len: &mut u32) -> IntParse {
        if self.current.is_empty() {
            if self.eof_reached {
                self.terminator = Terminator::Eof;
                return IntParse::EndOfNumber;
            }
            return IntParse::EndOfBuffer;
        }

        let mut consumed = 0;
        while consumed < self.current.len() {
            let byte = self.current[consumed];
            let digit = byte.wrapping_sub(b'0');
            if digit > 9 {
                self.set_terminator(byte);
                self.current = &self.current[consumed + 1..];
                return IntParse::EndOfNumber;
            }
            *number = match number
                .checked_mul(10)
                .and_then(|n| n.checked_add(u32::from(digit)))
            {
                Some(n) => n,
                None => {
                    self.current = &self.current[consumed..];
                    return IntParse::IntegerOverflow;
                }
            };
            *num_len += 1;
            consumed += 1;
        }

        self.current = &[];
        IntParse::EndOfBuffer
    }

    /// The most recently prepared token.
    #[inline]
    pub fn token(&self) -> &[u8] {
        match self.token {
            TokenRef::Buffer(slice) => slice,
            TokenRef::Accumulated => &self.accumulator,
        }
    }

    /// Parses the whole current token as a `u32`. Returns `None` for an
    /// empty token, a non-digit byte, or overflow.
    pub fn token_as_uint(&self) -> Option<u32> {
        let token = self.token();
        if token.is_empty() {
            return None;
        }
        let mut number: u32 = 0;
        for &byte in token {
            let digit = byte.wrapping_sub(b'0');
            if digit > 9 {
                return None;
            }
            number = number
                .checked_mul(10)
                .and_then(|n| n.checked_add(u32::from(digit)))?;
        }
        Some(number)
    }

    /// True if the token denotes a missing value: empty or a single `.`.
    #[inline]
    pub fn token_is_dot(&self) -> bool {
        let token = self.token();
        token.is_empty() || token == b"."
    }

    /// True if the most recent token was the last one on its line.
    #[inline]
    pub fn at_eol(&self) -> bool {
        matches!(self.terminator, Terminator::Byte(b'\n') | Terminator::Eof)
    }

    /// Splits the current token on the first occurrence of `delim`.
    pub fn token_key_value(&self, delim: u8) -> Option<(&[u8], &[u8])> {
        let token = self.token();
        memchr(delim, token).map(|at| (&token[..at], &token[at + 1..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newline_then_no_newline() {
        let mut tokenizer = Tokenizer::new();
        tokenizer.set_buffer(b"two\nlines");
        assert_eq!(tokenizer.line_number(), 1);
        assert!(!tokenizer.buffer_is_empty());
        assert!(!tokenizer.at_eof());

        let newline = tokenizer.find_newline();
        assert!(newline.is_some());
        assert!(tokenizer.prepare_token_or_accumulate(newline));
        assert_eq!(tokenizer.token(), b"two");
        assert_eq!(tokenizer.terminator(), Terminator::Byte(b'\n'));
        assert_eq!(tokenizer.line_number(), 2);

        // No second newline; the previous token must survive the miss.
        let newline = tokenizer.find_newline();
        assert!(newline.is_none());
        assert!(!tokenizer.prepare_token_or_accumulate(newline));
        assert!(!tokenizer.at_eof());

        tokenizer.set_buffer(b"");
        assert!(tokenizer.buffer_is_empty());
        assert!(tokenizer.at_eof());

        let newline = tokenizer.find_newline();
        assert!(tokenizer.prepare_token_or_accumulate(newline));
        assert_eq!(tokenizer.token(), b"lines");
        assert_eq!(tokenizer.terminator(), Terminator::Eof);
        assert!(tokenizer.at_eol());
    }

    #[test]
    fn skipping() {
        let mut tokenizer = Tokenizer::new();
        tokenizer.set_buffer(b"1\n2");

        let newline = tokenizer.find_newline();
        assert!(tokenizer.skip_token(newline));
        assert_eq!(tokenizer.terminator(), Terminator::Byte(b'\n'));
        assert_eq!(tokenizer.line_number(), 2);

        let newline = tokenizer.find_newline();
        assert!(newline.is_none());
        assert!(!tokenizer.skip_token(newline));
        assert!(!tokenizer.at_eof());

        tokenizer.set_buffer(b"");
        assert!(tokenizer.skip_token(tokenizer.find_newline()));
        assert_eq!(tokenizer.terminator(), Terminator::Eof);
    }

    #[test]
    fn empty_tokens() {
        let mut tokenizer = Tokenizer::new();
        tokenizer.set_buffer(b"\t\n");

        let delim = tokenizer.find_delim(DelimClass::NewlineOrTab);
        assert!(tokenizer.prepare_token_or_accumulate(delim));
        assert!(tokenizer.token().is_empty());
        assert!(!tokenizer.at_eol());

        let delim = tokenizer.find_delim(DelimClass::NewlineOrTab);
        assert!(tokenizer.prepare_token_or_accumulate(delim));
        assert!(tokenizer.token().is_empty());
        assert!(tokenizer.at_eol());
    }

    fn stitch3(parts: [&'static [u8]; 3]) -> Vec<u8> {
        let mut tokenizer = Tokenizer::new();

        tokenizer.set_buffer(parts[0]);
        let delim = tokenizer.find_delim(DelimClass::NewlineOrTab);
        assert!(!tokenizer.prepare_token_or_accumulate(delim));

        tokenizer.set_buffer(parts[1]);
        let delim = tokenizer.find_delim(DelimClass::NewlineOrTab);
        assert!(!tokenizer.prepare_token_or_accumulate(delim));

        tokenizer.set_buffer(parts[2]);
        let delim = tokenizer.find_delim(DelimClass::NewlineOrTab);
        assert!(tokenizer.prepare_token_or_accumulate(delim));

        tokenizer.token().to_vec()
    }

    #[test]
    fn seams() {
        let mut tokenizer = Tokenizer::new();
        tokenizer.set_buffer(b"");
        let delim = tokenizer.find_delim(DelimClass::NewlineOrTab);
        assert!(tokenizer.prepare_token_or_accumulate(delim));
        assert!(tokenizer.token().is_empty());

        assert_eq!(stitch3([b"heads ", b"and", b" tails\n"]), b"heads and tails");
        assert_eq!(
            stitch3([b"heads ", b"and", b" tails\r\n"]),
            b"heads and tails"
        );
        // The \r\n pair is split across the seam.
        assert_eq!(stitch3([b"grid", b"lock\r", b"\n"]), b"gridlock");
        assert_eq!(stitch3([b"grid", b"lock", b""]), b"gridlock");
    }

    #[test]
    fn key_value_splitting() {
        let mut tokenizer = Tokenizer::new();
        tokenizer.set_buffer(b"key=value\nnokeyvalue\n");

        let delim = tokenizer.find_delim(DelimClass::NewlineOrTab);
        assert!(tokenizer.prepare_token_or_accumulate(delim));

        let (key, value) = tokenizer.token_key_value(b'=').unwrap();
        assert_eq!(key, b"key");
        assert_eq!(value, b"value");

        let delim = tokenizer.find_delim(DelimClass::NewlineOrTab);
        assert!(tokenizer.prepare_token_or_accumulate(delim));
        assert!(tokenizer.token_key_value(b'=').is_none());
    }

    #[test]
    fn parse_uint_terminators_and_seams() {
        let mut tokenizer = Tokenizer::new();
        tokenizer.set_buffer(b"\t12345-6789");

        let delim = tokenizer.find_delim(DelimClass::NewlineOrTab);
        assert!(tokenizer.prepare_token_or_accumulate(delim));

        let (mut number, mut len) = (0u32, 0u32);
        assert_eq!(
            tokenizer.parse_uint(&mut number, &mut len),
            IntParse::EndOfNumber
        );
        assert_eq!(number, 12345);
        assert_eq!(len, 5);
        assert_eq!(tokenizer.terminator(), Terminator::Byte(b'-'));

        let (mut number, mut len) = (0u32, 0u32);
        assert_eq!(
            tokenizer.parse_uint(&mut number, &mut len),
            IntParse::EndOfBuffer
        );
        assert_eq!(number, 6789);
        assert_eq!(len, 4);

        // Exhausted buffer without EOF keeps asking for more.
        let (mut number, mut len) = (0u32, 0u32);
        assert_eq!(
            tokenizer.parse_uint(&mut number, &mut len),
            IntParse::EndOfBuffer
        );
        assert_eq!(number, 0);
        assert_eq!(len, 0);
    }

    #[test]
    fn parse_uint_overflow_and_eof() {
        let mut tokenizer = Tokenizer::new();
        tokenizer.set_buffer(b"4294967296");
        let (mut number, mut len) = (0u32, 0u32);
        assert_eq!(
            tokenizer.parse_uint(&mut number, &mut len),
            IntParse::IntegerOverflow
        );

        let mut tokenizer = Tokenizer::new();
        tokenizer.set_buffer(b"");
        let (mut number, mut len) = (0u32, 0u32);
        assert_eq!(
            tokenizer.parse_uint(&mut number, &mut len),
            IntParse::EndOfNumber
        );
        assert_eq!(number, 0);
        assert_eq!(len, 0);
        assert_eq!(tokenizer.terminator(), Terminator::Eof);
    }

    #[test]
    fn whole_token_as_uint() {
        let mut tokenizer = Tokenizer::new();
        tokenizer.set_buffer(b"123456789\n4294967296\n\n100X\n");

        let delim = tokenizer.find_delim(DelimClass::NewlineOrTab);
        assert!(tokenizer.prepare_token_or_accumulate(delim));
        assert_eq!(tokenizer.token_as_uint(), Some(123456789));

        // u32 overflow
        let delim = tokenizer.find_delim(DelimClass::NewlineOrTab);
        assert!(tokenizer.prepare_token_or_accumulate(delim));
        assert_eq!(tokenizer.token_as_uint(), None);

        // empty token
        let delim = tokenizer.find_delim(DelimClass::NewlineOrTab);
        assert!(tokenizer.prepare_token_or_accumulate(delim));
        assert_eq!(tokenizer.token_as_uint(), None);

        // trailing non-digit
        let delim = tokenizer.find_delim(DelimClass::NewlineOrTab);
        assert!(tokenizer.prepare_token_or_accumulate(delim));
        assert_eq!(tokenizer.token_as_uint(), None);
    }

    #[test]
    fn dot_and_eol_queries() {
        let mut tokenizer = Tokenizer::new();
        tokenizer.set_buffer(b".\n. \n");

        assert!(tokenizer.prepare_token_or_accumulate(tokenizer.find_newline()));
        assert_eq!(tokenizer.token(), b".");
        assert!(tokenizer.token_is_dot());
        assert!(tokenizer.at_eol());

        assert!(tokenizer.prepare_token_or_accumulate(tokenizer.find_newline()));
        assert_eq!(tokenizer.token(), b". ");
        assert!(!tokenizer.token_is_dot());
        assert!(tokenizer.at_eol());
    }

    #[test]
    fn delim_classes() {
        let cases: [(DelimClass, u8); 5] = [
            (DelimClass::NewlineOrTab, b'\t'),
            (DelimClass::NewlineTabEquals, b'='),
            (DelimClass::NewlineTabSemicolon, b';'),
            (DelimClass::NewlineTabComma, b','),
            (DelimClass::NewlineTabColon, b':'),
        ];
        for (class, delim) in cases {
            let input = [b"token".as_slice(), &[delim], b"rest\n"].concat();
            let mut tokenizer = Tokenizer::new();
            tokenizer.set_buffer(&input);
            let at = tokenizer.find_delim(class);
            assert_eq!(at, Some(5));
            assert!(tokenizer.prepare_token_or_accumulate(at));
            assert_eq!(tokenizer.token(), b"token");
            assert_eq!(tokenizer.terminator(), Terminator::Byte(delim));
        }
    }
}
