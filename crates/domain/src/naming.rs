//! Name normalization for bus-facing field names.

/// Convert a camel-case (or Pascal-case) identifier into `snake_case`.
///
/// The first character is lowercased without a separator; every later
/// uppercase character becomes `_` followed by its lowercase form.
/// Characters that are not uppercase pass through untouched, so the
/// transform is idempotent on names that are already snake-cased.
#[must_use]
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut chars = name.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_lowercase());
    }
    for c in chars {
        if c.is_uppercase() {
            out.push('_');
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
