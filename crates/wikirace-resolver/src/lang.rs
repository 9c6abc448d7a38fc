//! The wiki language table.
//!
//! A room's language selects which wiki the resolver talks to, so it must
//! be a code we know hosts a wiki — an arbitrary string would end up in a
//! hostname. The table covers the major Wikipedia editions.

/// Language codes with an active Wikipedia edition.
const SUPPORTED_LANGUAGES: &[&str] = &[
    "ar", "az", "bg", "bn", "ca", "cs", "cy", "da", "de", "el", "en", "eo", "es", "et", "eu",
    "fa", "fi", "fr", "gl", "he", "hi", "hr", "hu", "hy", "id", "it", "ja", "ka", "kk", "ko",
    "la", "lt", "lv", "mk", "ms", "nl", "nn", "no", "pl", "pt", "ro", "ru", "sh", "simple",
    "sk", "sl", "sq", "sr", "sv", "ta", "te", "th", "tr", "uk", "ur", "uz", "vi", "zh",
];

/// Returns `true` if `language` names a wiki the resolver can talk to.
pub fn is_supported_language(language: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&language)
}
