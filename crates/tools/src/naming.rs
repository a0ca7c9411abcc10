//! Identifier case helpers shared by the scaffolding tools and the text tool.

/// Split a free-form name into lowercase words. Handles spaces, `_`, `-`
/// and camelCase boundaries.
pub fn words(name: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

pub fn snake_case(name: &str) -> String {
    words(name).join("_")
}

pub fn kebab_case(name: &str) -> String {
    words(name).join("-")
}

pub fn pascal_case(name: &str) -> String {
    words(name)
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}

pub fn camel_case(name: &str) -> String {
    let pascal = pascal_case(name);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_mixed_names() {
        assert_eq!(words("user profile"), vec!["user", "profile"]);
        assert_eq!(words("userProfile-card_v2"), vec!["user", "profile", "card", "v2"]);
        assert!(words("  --  ").is_empty());
    }

    #[test]
    fn conversions() {
        assert_eq!(snake_case("Order Items"), "order_items");
        assert_eq!(kebab_case("orderItems"), "order-items");
        assert_eq!(pascal_case("login form"), "LoginForm");
        assert_eq!(camel_case("login form"), "loginForm");
    }
}
