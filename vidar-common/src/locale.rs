/// Locales accepted by the platform for localized names and descriptions.
pub const LOCALES: &[&str] = &[
    "id", "da", "de", "en-GB", "en-US", "es-ES", "es-419", "fr", "hr", "it", "lt", "hu", "nl",
    "no", "pl", "pt-BR", "ro", "fi", "sv-SE", "vi", "tr", "cs", "el", "bg", "ru", "uk", "hi",
    "th", "zh-CN", "ja", "zh-TW", "ko",
];

pub fn is_locale(code: &str) -> bool {
    LOCALES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_locales() {
        assert!(is_locale("pt-BR"));
        assert!(is_locale("fr"));
        assert!(!is_locale("en"));
        assert!(!is_locale("klingon"));
    }
}
