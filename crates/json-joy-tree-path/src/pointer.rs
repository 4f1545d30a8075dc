//! Absolute pointer helpers.

/// Unescapes a pointer component: `~1` becomes `/`, `~0` becomes `~`.
///
/// ```
/// use json_joy_tree_path::unescape_component;
///
/// assert_eq!(unescape_component("a~0b"), "a~b");
/// assert_eq!(unescape_component("c~1d"), "c/d");
/// ```
pub fn unescape_component(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    let mut chars = component.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('~', Some('0')) => {
                chars.next();
                out.push('~');
            }
            ('~', Some('1')) => {
                chars.next();
                out.push('/');
            }
            (c, _) => out.push(c),
        }
    }
    out
}

/// Escapes a pointer component: `~` becomes `~0`, `/` becomes `~1`.
///
/// ```
/// use json_joy_tree_path::escape_component;
///
/// assert_eq!(escape_component("a~b"), "a~0b");
/// assert_eq!(escape_component("c/d"), "c~1d");
/// ```
pub fn escape_component(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for c in component.chars() {
        match c {
            '~' => out.push_str("~0"),
            '/' => out.push_str("~1"),
            c => out.push(c),
        }
    }
    out
}

/// Parses an absolute pointer. The empty string is the root.
///
/// A pointer without the leading `/` is accepted and read as if it had one.
pub fn parse_pointer(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }
    let body = pointer.strip_prefix('/').unwrap_or(pointer);
    body.split('/').map(unescape_component).collect()
}

/// Formats segments into an absolute pointer; the root formats as `""`.
pub fn format_pointer<S: AsRef<str>>(path: &[S]) -> String {
    let mut out = String::new();
    for segment in path {
        out.push('/');
        out.push_str(&escape_component(segment.as_ref()));
    }
    out
}

/// `true` when `ancestor` is a strict prefix of `path`.
pub fn is_ancestor<S: AsRef<str>>(ancestor: &[S], path: &[S]) -> bool {
    ancestor.len() < path.len()
        && ancestor
            .iter()
            .zip(path.iter())
            .all(|(a, b)| a.as_ref() == b.as_ref())
}

/// Checks that `index` is a canonical non-negative array index (no leading zeros).
pub fn is_valid_index(index: &str) -> bool {
    match index.as_bytes() {
        [b'0'] => true,
        [b'1'..=b'9', rest @ ..] => rest.iter().all(u8::is_ascii_digit),
        _ => false,
    }
}
