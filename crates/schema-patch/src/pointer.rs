//! JSON Pointer (RFC 6901) helpers for schema paths.
//!
//! Schema patch paths interleave the literal segments `properties` and
//! `items` with property names, e.g.
//! `/properties/array/items/properties/sub`. Arrays in the schema model have
//! a single items-schema, so numeric indices never appear in editor output,
//! but [`crate::apply`] still understands them for plain documents.

/// A step in a path: a property name or one of the literal schema segments.
pub type PathStep = String;

/// A parsed JSON Pointer.
pub type Path = Vec<PathStep>;

/// Literal segment that precedes a property name inside an object schema.
pub const PROPERTIES: &str = "properties";

/// Literal segment that addresses an array schema's items.
pub const ITEMS: &str = "items";

/// Unescapes a path component: `~1` becomes `/`, `~0` becomes `~`.
///
/// ```
/// use schema_patch::pointer::unescape_component;
///
/// assert_eq!(unescape_component("a~0b"), "a~b");
/// assert_eq!(unescape_component("c~1d"), "c/d");
/// ```
pub fn unescape_component(component: &str) -> String {
    if !component.contains('~') {
        return component.to_string();
    }
    // ~1 first, otherwise "~01" would decode to "/"
    component.replace("~1", "/").replace("~0", "~")
}

/// Escapes a path component: `~` becomes `~0`, `/` becomes `~1`.
///
/// ```
/// use schema_patch::pointer::escape_component;
///
/// assert_eq!(escape_component("a~b"), "a~0b");
/// assert_eq!(escape_component("c/d"), "c~1d");
/// assert_eq!(escape_component("plain"), "plain");
/// ```
pub fn escape_component(component: &str) -> String {
    if !component.contains('/') && !component.contains('~') {
        return component.to_string();
    }
    component.replace('~', "~0").replace('/', "~1")
}

/// Parses a pointer string into components. The empty string is the root.
///
/// ```
/// use schema_patch::pointer::parse_json_pointer;
///
/// assert_eq!(parse_json_pointer(""), Vec::<String>::new());
/// assert_eq!(parse_json_pointer("/properties/a~1b"), vec!["properties", "a/b"]);
/// ```
pub fn parse_json_pointer(pointer: &str) -> Path {
    match pointer.strip_prefix('/') {
        Some(rest) => rest.split('/').map(unescape_component).collect(),
        None if pointer.is_empty() => Vec::new(),
        // Relative pointers are read as if they had a leading slash.
        None => pointer.split('/').map(unescape_component).collect(),
    }
}

/// Formats components into a pointer string. The root formats as `""`.
///
/// ```
/// use schema_patch::pointer::format_json_pointer;
///
/// let path = vec!["properties".to_string(), "field".to_string()];
/// assert_eq!(format_json_pointer(&path), "/properties/field");
/// assert_eq!(format_json_pointer(&[]), "");
/// ```
pub fn format_json_pointer(path: &[String]) -> String {
    let mut out = String::with_capacity(path.len() * 12);
    for component in path {
        out.push('/');
        out.push_str(&escape_component(component));
    }
    out
}

/// Returns true if `child` lies strictly below `parent`.
pub fn is_child(parent: &[String], child: &[String]) -> bool {
    parent.len() < child.len() && child.starts_with(parent)
}

/// If `path` addresses a property of an object schema
/// (`.../properties/<name>`), returns the path of that object schema and the
/// property name.
pub fn split_property_path(path: &[String]) -> Option<(&[String], &str)> {
    match path {
        [owner @ .., segment, name] if segment == PROPERTIES => Some((owner, name.as_str())),
        _ => None,
    }
}
