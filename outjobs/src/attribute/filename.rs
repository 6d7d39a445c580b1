/// Characters which are kept as-is in file names besides ASCII alphanumerics.
const ALLOWED_SPECIAL_CHARS: &[char] = &['-', '_', '.', '+', '(', ')'];

/// Makes an attribute value safe to be used as (part of) a file name.
///
/// Spaces become `_`, any other character outside `[A-Za-z0-9._+()-]` is
/// replaced by `_` as well. Case is preserved. Leading and trailing dots are
/// removed so that a value can never turn into `.`, `..` or a hidden file.
pub fn clean_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || ALLOWED_SPECIAL_CHARS.contains(&c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spaces_replaced_case_kept() {
        assert_eq!(clean_file_name("My Board Rev A"), "My_Board_Rev_A");
    }

    #[test]
    fn test_separators_replaced() {
        assert_eq!(clean_file_name("a/b\\c:d"), "a_b_c_d");
        assert_eq!(clean_file_name("x|y"), "x_y");
    }

    #[test]
    fn test_allowed_characters_kept() {
        assert_eq!(clean_file_name("v1.0-rc+(2)"), "v1.0-rc+(2)");
    }

    #[test]
    fn test_dots_trimmed() {
        assert_eq!(clean_file_name(".."), "");
        assert_eq!(clean_file_name(" .hidden. "), "hidden");
    }

    #[test]
    fn test_non_ascii_replaced() {
        assert_eq!(clean_file_name("Größe"), "Gr__e");
    }
}
