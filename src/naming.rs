/// Converts `tox_options` into `ToxOptions`. Empty segments are dropped.
pub fn snake_to_pascal(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Converts `ToxOptions` into `tox_options`: an underscore goes before every
/// uppercase letter except the first character, then everything is lowercased.
pub fn pascal_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if i > 0 && c.is_uppercase() {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Drops the `struct ` qualifier the parser keeps on struct type names.
pub fn strip_struct_qualifier(name: &str) -> &str {
    name.strip_prefix("struct ").unwrap_or(name).trim()
}

/// Everything after the first occurrence of `marker`, or the whole name when
/// the marker is absent. `friend_get_status_message` with `get_` gives `status_message`.
pub fn keyword_after<'a>(name: &'a str, marker: &str) -> &'a str {
    match name.find(marker) {
        Some(index) => &name[index + marker.len()..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_to_pascal() {
        assert_eq!(snake_to_pascal("tox_options"), "ToxOptions");
        assert_eq!(snake_to_pascal("friend"), "Friend");
        assert_eq!(snake_to_pascal("offline_peer"), "OfflinePeer");
        assert_eq!(snake_to_pascal("Tox_Err_New"), "ToxErrNew");
        assert_eq!(snake_to_pascal("tox__x_"), "ToxX");
    }

    #[test]
    fn test_pascal_to_snake() {
        assert_eq!(pascal_to_snake("ToxOptions"), "tox_options");
        assert_eq!(pascal_to_snake("Tox"), "tox");
        assert_eq!(pascal_to_snake("OfflinePeer"), "offline_peer");
    }

    #[test]
    fn test_strip_struct_qualifier() {
        assert_eq!(strip_struct_qualifier("struct Tox"), "Tox");
        assert_eq!(strip_struct_qualifier("Tox_Options"), "Tox_Options");
    }

    #[test]
    fn test_keyword_after() {
        assert_eq!(keyword_after("self_get_name", "get_"), "name");
        assert_eq!(keyword_after("get_savedata_data", "get_"), "savedata_data");
        assert_eq!(keyword_after("hash", "get_"), "hash");
    }
}
