//! Line text normalization.
//!
//! Authors write colour codes with an alternate marker (`&a`, `&l`, ...). The
//! host expects its native marker, so text is translated before it reaches a
//! proxy. Empty text means "no line" everywhere a line is set.

/// Native colour-code marker understood by the host.
pub const COLOR_CHAR: char = '\u{00A7}';

/// Alternate marker accepted in authored text.
pub const ALT_COLOR_CHAR: char = '&';

fn is_color_code(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), '0'..='9' | 'a'..='f' | 'k'..='o' | 'r')
}

/// Replace every `alt` + code pair with [`COLOR_CHAR`] + lower-case code.
///
/// An `alt` not followed by a valid code is left as-is.
pub fn translate_color_codes(alt: char, input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == alt {
            if let Some(&next) = chars.peek() {
                if is_color_code(next) {
                    out.push(COLOR_CHAR);
                    out.push(next.to_ascii_lowercase());
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Translate a line's text, or `None` if the line should not exist.
pub fn normalize_line(text: Option<&str>) -> Option<String> {
    match text {
        Some(text) if !text.is_empty() => Some(translate_color_codes(ALT_COLOR_CHAR, text)),
        _ => None,
    }
}
