use super::filename::clean_file_name;

/// Nesting limit for values which themselves contain placeholders.
const MAX_EXPANSION_DEPTH: usize = 5;

/// Source of attribute values, e.g. a project/board/variant chain.
pub trait AttributeLookup {
    fn lookup(&self, key: &str) -> Option<String>;
}

impl<F> AttributeLookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// Replaces all resolvable placeholders in `text`.
///
/// `{{KEY}}` is replaced by the value of `KEY`, `{{KEY or OTHER}}` by the
/// first key which resolves. Placeholders which cannot be resolved are kept
/// literally.
pub fn substitute(text: &str, lookup: &dyn AttributeLookup) -> String {
    expand(text, lookup, None, 0)
}

/// Like [`substitute`], but every inserted value is sanitized with
/// [`clean_file_name`]. The literal parts of the template (including `/`
/// separators) are kept as they are.
pub fn substitute_path(template: &str, lookup: &dyn AttributeLookup) -> String {
    let filter: &dyn Fn(&str) -> String = &clean_file_name;
    expand(template, lookup, Some(filter), 0)
}

fn expand(
    text: &str,
    lookup: &dyn AttributeLookup,
    filter: Option<&dyn Fn(&str) -> String>,
    depth: usize,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        match resolve(&after[..end], lookup) {
            Some(mut value) => {
                if depth < MAX_EXPANSION_DEPTH && value.contains("{{") {
                    value = expand(&value, lookup, None, depth + 1);
                }
                match filter {
                    Some(filter) => out.push_str(&filter(&value)),
                    None => out.push_str(&value),
                }
            }
            None => out.push_str(&rest[start..start + end + 4]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn resolve(expression: &str, lookup: &dyn AttributeLookup) -> Option<String> {
    expression
        .split(" or ")
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .find_map(|key| lookup.lookup(key))
}
