use super::parsers::{
    is_block_comment_end, is_block_comment_start, is_line_comment_start, matches_tag,
    try_start_dollar_quote,
};

/// Lexical region of the byte currently being scanned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// Detect a quote, comment or dollar-quote opener at `idx`.
///
/// Returns the entered state and the index of the last byte belonging to the opener.
pub(super) fn open_at(bytes: &[u8], idx: usize) -> Option<(State, usize)> {
    match bytes[idx] {
        b'\'' => Some((State::SingleQuoted, idx)),
        b'"' => Some((State::DoubleQuoted, idx)),
        _ if is_line_comment_start(bytes, idx) => Some((State::LineComment, idx + 1)),
        _ if is_block_comment_start(bytes, idx) => Some((State::BlockComment(1), idx + 1)),
        b'$' => try_start_dollar_quote(bytes, idx).map(|(tag, end)| (State::DollarQuoted(tag), end)),
        _ => None,
    }
}

/// Consume the byte at `idx` inside a quoted or commented region.
///
/// Returns the next state and the index of the last byte consumed.
pub(super) fn advance(state: State, bytes: &[u8], idx: usize) -> (State, usize) {
    let b = bytes[idx];
    match state {
        State::Normal => (State::Normal, idx),
        State::SingleQuoted => match b {
            b'\'' if bytes.get(idx + 1) == Some(&b'\'') => (State::SingleQuoted, idx + 1),
            b'\'' => (State::Normal, idx),
            _ => (State::SingleQuoted, idx),
        },
        State::DoubleQuoted => match b {
            b'"' if bytes.get(idx + 1) == Some(&b'"') => (State::DoubleQuoted, idx + 1),
            b'"' => (State::Normal, idx),
            _ => (State::DoubleQuoted, idx),
        },
        State::LineComment => {
            if b == b'\n' {
                (State::Normal, idx)
            } else {
                (State::LineComment, idx)
            }
        }
        State::BlockComment(depth) => {
            if is_block_comment_start(bytes, idx) {
                (State::BlockComment(depth + 1), idx + 1)
            } else if is_block_comment_end(bytes, idx) {
                if depth == 1 {
                    (State::Normal, idx + 1)
                } else {
                    (State::BlockComment(depth - 1), idx + 1)
                }
            } else {
                (State::BlockComment(depth), idx)
            }
        }
        State::DollarQuoted(tag) => {
            if b == b'$' && matches_tag(bytes, idx, &tag) {
                (State::Normal, idx + tag.len() + 1)
            } else {
                (State::DollarQuoted(tag), idx)
            }
        }
    }
}

pub(super) fn scan_digits(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let mut idx = start;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == start {
        None
    } else {
        std::str::from_utf8(&bytes[start..idx])
            .ok()
            .map(|digits| (idx, digits))
    }
}
