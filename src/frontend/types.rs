//! Mapping of C++ type spellings onto [`Type`]

use crate::ast::Type;

/// Builtin and standard-library integer type names
const INTEGER_NAMES: &[&str] = &[
    "bool",
    "char",
    "signed",
    "unsigned",
    "short",
    "int",
    "long",
    "wchar_t",
    "char8_t",
    "char16_t",
    "char32_t",
    "size_t",
    "ssize_t",
    "ptrdiff_t",
    "intptr_t",
    "uintptr_t",
    "intmax_t",
    "uintmax_t",
    "int8_t",
    "int16_t",
    "int32_t",
    "int64_t",
    "uint8_t",
    "uint16_t",
    "uint32_t",
    "uint64_t",
    "int_fast8_t",
    "int_fast16_t",
    "int_fast32_t",
    "int_fast64_t",
    "uint_fast8_t",
    "uint_fast16_t",
    "uint_fast32_t",
    "uint_fast64_t",
    "int_least8_t",
    "int_least16_t",
    "int_least32_t",
    "int_least64_t",
    "uint_least8_t",
    "uint_least16_t",
    "uint_least32_t",
    "uint_least64_t",
];

const FLOATING_NAMES: &[&str] = &["float", "double", "float_t", "double_t"];

/// Kinds of tree-sitter nodes that end a declarator chain with a name
pub const DECLARATOR_NAME_KINDS: &[&str] = &[
    "identifier",
    "field_identifier",
    "type_identifier",
    "qualified_identifier",
    "destructor_name",
    "operator_name",
    "template_function",
];

/// Type for a builtin or well-known standard type name, with any `std::`
/// qualification stripped
pub fn builtin_type(name: &str) -> Option<Type> {
    let name = name.strip_prefix("std::").unwrap_or(name);
    if INTEGER_NAMES.contains(&name) {
        Some(Type::Integer)
    } else if FLOATING_NAMES.contains(&name) {
        Some(Type::Floating)
    } else if name == "void" {
        Some(Type::Named("void".to_string()))
    } else {
        None
    }
}

/// Type of a `sized_type_specifier` such as `unsigned long long` or
/// `long double`
pub fn sized_type(spelling: &str) -> Type {
    if spelling.split_whitespace().any(|w| w == "double") {
        Type::Floating
    } else {
        Type::Integer
    }
}

/// True when a `number_literal` spelling denotes a floating-point value
pub fn is_floating_literal(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    if lower.starts_with("0x") {
        return lower.contains('.') || lower.contains('p');
    }
    lower.contains('.') || lower.contains('e') || lower.ends_with('f')
}

/// Last component of a qualified name (`ns::Outer::Inner` -> `Inner`)
pub fn unqualified(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

/// Components of the qualifying prefix (`ns::Outer::Inner` -> `[ns, Outer]`)
pub fn qualifiers(name: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = name.split("::").map(str::trim).collect();
    parts.pop();
    parts.retain(|p| !p.is_empty());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_type() {
        assert_eq!(builtin_type("int"), Some(Type::Integer));
        assert_eq!(builtin_type("std::size_t"), Some(Type::Integer));
        assert_eq!(builtin_type("double"), Some(Type::Floating));
        assert_eq!(builtin_type("Widget"), None);
    }

    #[test]
    fn test_sized_type() {
        assert_eq!(sized_type("unsigned long long"), Type::Integer);
        assert_eq!(sized_type("long double"), Type::Floating);
    }

    #[test]
    fn test_is_floating_literal() {
        assert!(is_floating_literal("1.5"));
        assert!(is_floating_literal("1e9"));
        assert!(is_floating_literal("2.0f"));
        assert!(!is_floating_literal("0xFF"));
        assert!(!is_floating_literal("42u"));
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(unqualified("ns::Outer::Inner"), "Inner");
        assert_eq!(unqualified("plain"), "plain");
        assert_eq!(qualifiers("ns::Outer::Inner"), vec!["ns", "Outer"]);
        assert_eq!(qualifiers("::global"), Vec::<&str>::new());
    }
}
