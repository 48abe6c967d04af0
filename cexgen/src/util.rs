//! Shared utility functions
//!
//! Small string helpers used across the synthesis modules.

/// Strip the scope qualifier from an identifier.
/// `java::my.pkg.C.f` becomes `my.pkg.C.f`, `symex_dynamic::dynamic_object1`
/// becomes `dynamic_object1`. Identifiers without a qualifier pass through.
pub fn strip_scope(identifier: &str) -> &str {
    match identifier.find("::") {
        Some(idx) => &identifier[idx + 2..],
        None => identifier,
    }
}

/// Escape a function display name into a valid Java class-name fragment.
/// Every character outside `[a-zA-Z0-9]` maps to `_`.
pub fn escape_identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Drop a trailing type-descriptor suffix (`:...`) from an identifier.
/// Scope qualifiers (`::`) do not count as a descriptor separator.
pub fn strip_descriptor(identifier: &str) -> &str {
    let bytes = identifier.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b':' {
            if i + 1 < bytes.len() && bytes[i + 1] == b':' {
                i += 2;
                continue;
            }
            return &identifier[..i];
        }
        i += 1;
    }
    identifier
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_scope_qualified() {
        assert_eq!(strip_scope("java::my.pkg.C.f"), "my.pkg.C.f");
        assert_eq!(strip_scope("symex_dynamic::dynamic_object1"), "dynamic_object1");
    }

    #[test]
    fn test_strip_scope_unqualified() {
        assert_eq!(strip_scope("plain"), "plain");
    }

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("my.pkg.C.f"), "my_pkg_C_f");
        assert_eq!(escape_identifier("C.<init>"), "C__init_");
        assert_eq!(escape_identifier("f"), "f");
    }

    #[test]
    fn test_strip_descriptor() {
        assert_eq!(strip_descriptor("my.pkg.C.f:(I)V"), "my.pkg.C.f");
        assert_eq!(strip_descriptor("my.pkg.C.f"), "my.pkg.C.f");
    }

    #[test]
    fn test_strip_descriptor_keeps_scope_qualifier() {
        assert_eq!(strip_descriptor("java::my.pkg.C.f:(I)V"), "java::my.pkg.C.f");
        assert_eq!(strip_descriptor("java::my.pkg.C.f"), "java::my.pkg.C.f");
    }
}
