/// Collapse all whitespace to single spaces, trim, and lowercase.
///
/// Used only to build alignment match keys (paragraph `normalized` field,
/// `style_sig` inputs are untouched by this) — never for rendered output.
pub fn normalize_for_compare(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = true; // true so leading whitespace is dropped
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.extend(ch.to_lowercase());
            last_was_space = false;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_internal_whitespace() {
        assert_eq!(normalize_for_compare("The   Borrower\tshall"), "the borrower shall");
    }

    #[test]
    fn trims_leading_and_trailing_whitespace() {
        assert_eq!(normalize_for_compare("  hello \n"), "hello");
    }

    #[test]
    fn lowercases() {
        assert_eq!(normalize_for_compare("HELLO"), "hello");
    }

    #[test]
    fn empty_string_stays_empty() {
        assert_eq!(normalize_for_compare(""), "");
    }

    #[test]
    fn whitespace_only_collapses_to_empty() {
        assert_eq!(normalize_for_compare("   \t  "), "");
    }
}
