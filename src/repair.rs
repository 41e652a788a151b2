//! Best-effort repair of malformed JSON escapes
//!
//! Extraction output occasionally arrives with stray backslashes — most
//! often a single `\` in prose that was never escaped. The repairer
//! doubles any backslash that does not begin a valid JSON escape so the
//! text becomes parseable. It never fails; the parse step downstream is
//! the actual failure detector.

/// The result of a repair pass.
///
/// `changed` is true exactly when the output differs from the input, so
/// callers can observe that degradation happened instead of inferring it.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub text: String,
    pub changed: bool,
}

fn is_simple_escape(c: char) -> bool {
    matches!(c, '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't')
}

fn is_unicode_escape(rest: &[char]) -> bool {
    rest.len() >= 4 && rest[..4].iter().all(|c| c.is_ascii_hexdigit())
}

/// Double every backslash that is not part of a valid JSON escape.
///
/// Valid escapes (`\"`, `\\`, `\/`, `\b`, `\f`, `\n`, `\r`, `\t`,
/// `\uXXXX`) pass through untouched; a valid `\\` consumes both
/// characters so the second backslash is not re-examined.
pub fn repair_json(raw: &str) -> RepairOutcome {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut changed = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '\\' {
            out.push(c);
            i += 1;
            continue;
        }
        match chars.get(i + 1) {
            Some(&next) if is_simple_escape(next) => {
                out.push('\\');
                out.push(next);
                i += 2;
            }
            Some('u') if is_unicode_escape(&chars[i + 2..]) => {
                out.push_str("\\u");
                i += 2;
            }
            _ => {
                out.push_str("\\\\");
                changed = true;
                i += 1;
            }
        }
    }

    RepairOutcome { text: out, changed }
}
