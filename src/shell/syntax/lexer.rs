use super::tokens::Token;
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::{OsStrExt, OsStringExt};

/// Reserved symbols, in the order a word is searched for them.
const SYMBOLS: [u8; 6] = [b'&', b'<', b'>', b'|', b'=', b'$'];

/// Splits a line into tokens. Words are separated by ASCII spaces and every
/// reserved symbol is cut out of the word it appears in. There is no quoting:
/// a symbol inside a word is always significant. Words are kept as raw bytes,
/// so input that is not UTF-8 passes through untouched.
pub fn tokenize<S: AsRef<OsStr> + ?Sized>(line: &S) -> Vec<Token> {
    split_words(line.as_ref().as_bytes())
        .into_iter()
        .map(|w| Token::from(OsString::from_vec(w)))
        .collect()
}

fn split_words(line: &[u8]) -> Vec<Vec<u8>> {
    let mut words: Vec<Vec<u8>> = line
        .split(|&b| b == b' ')
        .filter(|w| !w.is_empty())
        .map(<[u8]>::to_vec)
        .collect();
    let mut i = 0;
    while i < words.len() {
        // the piece left at `i` may still hold symbols, so look again
        if !split_on_symbol(&mut words, i) {
            i += 1;
        }
    }
    words
}

/// Cuts `words[i]` around the first reserved symbol it contains, replacing it
/// with up to three pieces: prefix, symbol, suffix. Empty pieces are dropped.
/// Returns false when the word has nothing to split.
fn split_on_symbol(words: &mut Vec<Vec<u8>>, i: usize) -> bool {
    let word = &words[i];
    if word.len() < 2 {
        return false;
    }
    let found = SYMBOLS.iter().find_map(|&symbol| {
        word.iter()
            .position(|&b| b == symbol)
            .map(|pos| (pos, symbol))
    });
    let (pos, symbol) = match found {
        Some(found) => found,
        None => return false,
    };

    let prefix = &word[..pos];
    let suffix = &word[pos + 1..];
    let mut pieces = Vec::with_capacity(3);
    if !prefix.is_empty() {
        pieces.push(prefix.to_vec());
    }
    pieces.push(vec![symbol]);
    if !suffix.is_empty() {
        pieces.push(suffix.to_vec());
    }
    words.splice(i..=i, pieces);
    true
}
