use std::{
    borrow::Cow,
    path::{Component, Path},
};

use cow_utils::CowUtils;

/// Normalize line endings to LF
///
/// Sources checked out on Windows keep CRLF endings; the compilers downstream
/// only care about `\n`, and normalizing keeps bundles byte-identical across
/// platforms.
pub fn normalize_line_endings(content: String) -> String {
    if content.contains('\r') {
        content
            .cow_replace("\r\n", "\n")
            .cow_replace('\r', "\n")
            .into_owned()
    } else {
        content
    }
}

/// Join the normal components of a path with forward slashes.
///
/// `Prefix`, `RootDir` and `CurDir` components are dropped; `ParentDir`
/// components are kept as `..`.
pub fn to_slash_components<'a>(components: impl Iterator<Item = Component<'a>>) -> String {
    let mut parts: Vec<Cow<'a, str>> = Vec::new();
    for component in components {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy()),
            Component::ParentDir => parts.push(Cow::Borrowed("..")),
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
        }
    }
    parts.join("/")
}

/// Quote a string as a JavaScript string literal.
///
/// JSON string syntax is a subset of JavaScript's, so serde_json's escaping is
/// reused as-is.
pub fn js_string_literal(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// Render a path for log output
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy()
        .cow_replace('\\', "/")
        .into_owned()
}
