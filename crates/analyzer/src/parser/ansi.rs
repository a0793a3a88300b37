/// ANSI escape code stripping
///
/// loguru colourises its console sink and those logs are often redirected
/// to files as-is. The colour codes sit between the `|` separators and would
/// otherwise leak into levels and callers.

use std::borrow::Cow;

/// Strip ANSI escape codes from a line
///
/// Handles:
/// - CSI sequences: `\x1b[...m`
/// - OSC sequences: `\x1b]...` (BEL or `ESC \` terminated)
/// - Other two-character escape sequences
///
/// Returns `Cow::Borrowed` when the line carries no escape at all.
pub fn strip_ansi_codes(input: &str) -> Cow<'_, str> {
    if !input.contains('\x1b') {
        return Cow::Borrowed(input);
    }

    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\x1b' {
            output.push(c);
            continue;
        }

        match chars.next() {
            // CSI: ESC [ params... final byte in 0x40-0x7E
            Some('[') => {
                for c in chars.by_ref() {
                    if ('\x40'..='\x7e').contains(&c) {
                        break;
                    }
                }
            }
            // OSC: ESC ] ... BEL | ESC \
            Some(']') => {
                while let Some(c) = chars.next() {
                    if c == '\x07' {
                        break;
                    }
                    if c == '\x1b' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            // lone trailing ESC or a two-character sequence
            _ => {}
        }
    }

    Cow::Owned(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_escape_is_borrowed() {
        let line = "2025-06-14 11:37:29.601 | INFO | agent:run:1 - ok";
        assert!(matches!(strip_ansi_codes(line), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strip_loguru_colours() {
        let line = "\x1b[32m2025-06-14 11:37:29.601\x1b[0m | \x1b[1mINFO    \x1b[0m | \x1b[36magent\x1b[0m:\x1b[36mrun\x1b[0m:\x1b[36m12\x1b[0m - \x1b[1mhello\x1b[0m";
        assert_eq!(
            strip_ansi_codes(line),
            "2025-06-14 11:37:29.601 | INFO     | agent:run:12 - hello"
        );
    }

    #[test]
    fn test_strip_osc_hyperlink() {
        let line = "see \x1b]8;;http://x\x07link\x1b]8;;\x1b\\ end";
        assert_eq!(strip_ansi_codes(line), "see link end");
    }

    #[test]
    fn test_trailing_escape() {
        assert_eq!(strip_ansi_codes("text\x1b"), "text");
    }

    #[test]
    fn test_unicode_survives() {
        assert_eq!(strip_ansi_codes("\x1b[31m任务失败\x1b[0m"), "任务失败");
    }
}
