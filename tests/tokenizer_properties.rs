//! Property-based tests for the tokenizer
//!
//! The central guarantee is seam transparency: for any input and any way
//! of cutting it into feed chunks, the emitted token stream is identical
//! to the single-buffer token stream.

use fast_vcfscan::{DelimClass, IntParse, Terminator, Tokenizer};
use proptest::prelude::*;

/// Tokenizes `data` on the `{\n,\t}` class, feeding it in the segments
/// delimited by `boundaries` (sorted positions inside `data`). Returns
/// each token with its terminator.
fn tokenize_segmented(data: &[u8], boundaries: &[usize]) -> Vec<(Vec<u8>, Terminator)> {
    let mut tokenizer = Tokenizer::new();
    let mut tokens = Vec::new();

    let mut segments = Vec::new();
    let mut start = 0;
    for &boundary in boundaries {
        segments.push(&data[start..boundary]);
        start = boundary;
    }
    segments.push(&data[start..]);
    segments.push(b"" as &[u8]);

    'feed: for segment in segments {
        tokenizer.set_buffer(segment);
        loop {
            let delim = tokenizer.find_delim(DelimClass::NewlineOrTab);
            if !tokenizer.prepare_token_or_accumulate(delim) {
                continue 'feed;
            }
            tokens.push((tokenizer.token().to_vec(), tokenizer.terminator()));
            if tokenizer.terminator() == Terminator::Eof {
                return tokens;
            }
        }
    }
    tokens
}

/// Input bytes plus sorted interior cut points. Cuts are strictly inside
/// the data: an empty chunk would signal EOF by protocol.
fn arb_data_and_cuts() -> impl Strategy<Value = (Vec<u8>, Vec<usize>)> {
    "[A-Za-z0-9.;,:\t\n\r ]{0,60}"
        .prop_map(String::into_bytes)
        .prop_flat_map(|data| {
            let len = data.len();
            let cuts = if len < 2 {
                Just(Vec::new()).boxed()
            } else {
                prop::collection::vec(1..len, 0..6)
                    .prop_map(|mut cuts| {
                        cuts.sort_unstable();
                        cuts.dedup();
                        cuts
                    })
                    .boxed()
            };
            (Just(data), cuts)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Cutting the input into arbitrary feed chunks never changes the
    /// token stream.
    #[test]
    fn prop_seam_transparency((data, cuts) in arb_data_and_cuts()) {
        let whole = tokenize_segmented(&data, &[]);
        let segmented = tokenize_segmented(&data, &cuts);
        prop_assert_eq!(whole, segmented);
    }

    /// An unsigned integer split over any seam parses to the same value.
    #[test]
    fn prop_uint_across_seams(number in 0u32..=u32::MAX, cut in 1usize..10) {
        let text = format!("{}\t", number);
        let cut = cut.min(text.len());

        let mut tokenizer = Tokenizer::new();
        let (mut value, mut digits) = (0u32, 0u32);

        tokenizer.set_buffer(&text.as_bytes()[..cut]);
        let mut outcome = tokenizer.parse_uint(&mut value, &mut digits);
        if outcome == IntParse::EndOfBuffer {
            tokenizer.set_buffer(&text.as_bytes()[cut..]);
            outcome = tokenizer.parse_uint(&mut value, &mut digits);
        }

        prop_assert_eq!(outcome, IntParse::EndOfNumber);
        prop_assert_eq!(value, number);
        prop_assert_eq!(digits, number.to_string().len() as u32);
        prop_assert_eq!(tokenizer.terminator(), Terminator::Byte(b'\t'));
    }

    /// A `\r` before a `\n` terminator is stripped no matter where the
    /// seam falls inside the `\r\n` pair.
    #[test]
    fn prop_crlf_stripping(body in "[A-Za-z0-9]{0,12}", cut in 1usize..16) {
        let text = format!("{}\r\n", body);
        let cut = cut.min(text.len() - 1);

        let tokens = tokenize_segmented(text.as_bytes(), &[cut]);
        // The body token plus the empty final token at EOF.
        prop_assert_eq!(tokens.len(), 2);
        let (token, terminator) = &tokens[0];
        prop_assert_eq!(token.as_slice(), body.as_bytes());
        prop_assert_eq!(*terminator, Terminator::Byte(b'\n'));
        prop_assert_eq!(&tokens[1], &(Vec::new(), Terminator::Eof));
    }

    /// Line numbers count newline terminators exactly, one-based.
    #[test]
    fn prop_line_numbers(lines in 0u32..8, cut in 1usize..32) {
        let text = "x\n".repeat(lines as usize);
        let cut = cut.min(text.len());

        let mut tokenizer = Tokenizer::new();
        let mut seen = 0;
        for segment in [&text.as_bytes()[..cut], &text.as_bytes()[cut..], b"" as &[u8]] {
            tokenizer.set_buffer(segment);
            loop {
                let delim = tokenizer.find_delim(DelimClass::NewlineOrTab);
                if !tokenizer.prepare_token_or_accumulate(delim) {
                    break;
                }
                if tokenizer.terminator() == Terminator::Eof {
                    break;
                }
                seen += 1;
            }
            if tokenizer.terminator() == Terminator::Eof {
                break;
            }
        }

        prop_assert_eq!(seen, lines);
        prop_assert_eq!(tokenizer.line_number(), lines + 1);
    }
}
