//! Identifier to path-token conversion.
//!
//! # Responsibilities
//! - Turn CamelCase identifiers into separator-joined lowercase tokens
//! - Split converted names back into words
//! - Reduce a Rust type path to the bare type name
//!
//! # Design Decisions
//! - Every uppercase letter after the first character starts a new word,
//!   acronyms included (`UsersID` becomes `users_i_d`)
//! - No input is rejected; callers validate names before converting

/// Separator used when the configuration does not override it.
pub const DEFAULT_WORD_SEPARATOR: &str = "_";

/// Convert an identifier into a lowercase token string.
///
/// A separator is inserted before every uppercase ASCII letter except one in
/// the first position.
pub fn convert_name(name: &str, separator: &str) -> String {
    let mut converted = String::with_capacity(name.len() + 4);
    for (i, ch) in name.char_indices() {
        if i > 0 && ch.is_ascii_uppercase() {
            converted.push_str(separator);
        }
        converted.extend(ch.to_lowercase());
    }
    converted
}

/// Split a converted name into its words, dropping empty ones.
///
/// Empty words appear when the identifier itself carried a separator
/// (`Get_Name` converts to `get__name`).
pub fn split_words<'a>(converted: &'a str, separator: &str) -> Vec<&'a str> {
    converted
        .split(separator)
        .filter(|word| !word.is_empty())
        .collect()
}

/// Strip indirection, module path and generic arguments from a type name.
///
/// `&mut crate::api::UsersId<T>` becomes `UsersId`.
pub fn short_type_name(full: &str) -> &str {
    let mut name = full.trim_start();
    loop {
        let trimmed = name
            .trim_start_matches(['&', '*'])
            .trim_start_matches("mut ")
            .trim_start_matches("const ")
            .trim_start();
        if trimmed.len() == name.len() {
            break;
        }
        name = trimmed;
    }
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_name() {
        assert_eq!(convert_name("ImageUrl", "_"), "image_url");
        assert_eq!(convert_name("Users", "_"), "users");
        assert_eq!(convert_name("UsersId", "_"), "users_id");
        assert_eq!(convert_name("PostImageUrl", "-"), "post-image-url");
        assert_eq!(convert_name("", "_"), "");
    }

    #[test]
    fn test_acronyms_split_per_letter() {
        assert_eq!(convert_name("UsersID", "_"), "users_i_d");
        assert_eq!(convert_name("ID", "_"), "i_d");
    }

    #[test]
    fn test_split_words_drops_empty() {
        let converted = convert_name("Get_Name", "_");
        assert_eq!(converted, "get__name");
        assert_eq!(split_words(&converted, "_"), vec!["get", "name"]);
        assert!(split_words("", "_").is_empty());
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("resource_router::demo::UsersId"), "UsersId");
        assert_eq!(short_type_name("&mut app::Users"), "Users");
        assert_eq!(short_type_name("*const Users"), "Users");
        assert_eq!(short_type_name("app::Wrapper<app::Inner>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }
}
