//! Locale registry: static metadata for the locales a site may enable.
//!
//! The registry is read-only reference data (names and flags) and is
//! initialized once with `OnceLock`. Which locales are *active* is a runtime
//! setting and lives in [`crate::config::Settings`], not here. Codes missing
//! from the registry are still valid locales; they just get generic metadata.

use std::sync::OnceLock;

/// Flag shown for locales without a registry entry.
pub const FALLBACK_FLAG: &str = "🌐";

/// Metadata for a known locale.
#[derive(Debug, Clone)]
pub struct LocaleInfo {
    /// ISO 639-1 code (e.g., "en", "fr")
    pub code: &'static str,

    /// English name (e.g., "French")
    pub name: &'static str,

    /// Native name (e.g., "Français")
    pub native_name: &'static str,

    /// Flag emoji used by the language switcher
    pub flag: &'static str,
}

/// Registry of known locales.
pub struct LocaleRegistry {
    locales: Vec<LocaleInfo>,
}

static REGISTRY: OnceLock<LocaleRegistry> = OnceLock::new();

impl LocaleRegistry {
    /// Get the shared registry instance.
    pub fn get() -> &'static LocaleRegistry {
        REGISTRY.get_or_init(|| LocaleRegistry {
            locales: known_locales(),
        })
    }

    /// Look up a locale by code.
    pub fn get_by_code(&self, code: &str) -> Option<&LocaleInfo> {
        self.locales.iter().find(|info| info.code == code)
    }

    /// All known locales, in registry order.
    pub fn list_all(&self) -> &[LocaleInfo] {
        &self.locales
    }

    /// Flag for a code, or [`FALLBACK_FLAG`] for unknown codes.
    pub fn flag_for(&self, code: &str) -> &'static str {
        self.get_by_code(code)
            .map(|info| info.flag)
            .unwrap_or(FALLBACK_FLAG)
    }

    pub fn is_known(&self, code: &str) -> bool {
        self.get_by_code(code).is_some()
    }
}

fn known_locales() -> Vec<LocaleInfo> {
    macro_rules! locale {
        ($code:expr, $name:expr, $native:expr, $flag:expr) => {
            LocaleInfo {
                code: $code,
                name: $name,
                native_name: $native,
                flag: $flag,
            }
        };
    }

    vec![
        locale!("en", "English", "English", "🇺🇸"),
        locale!("es", "Spanish", "Español", "🇪🇸"),
        locale!("fr", "French", "Français", "🇫🇷"),
        locale!("de", "German", "Deutsch", "🇩🇪"),
        locale!("it", "Italian", "Italiano", "🇮🇹"),
        locale!("pt", "Portuguese", "Português", "🇵🇹"),
        locale!("zh", "Chinese", "中文", "🇨🇳"),
        locale!("ja", "Japanese", "日本語", "🇯🇵"),
        locale!("ru", "Russian", "Русский", "🇷🇺"),
        locale!("nl", "Dutch", "Nederlands", "🇳🇱"),
        locale!("tr", "Turkish", "Türkçe", "🇹🇷"),
        locale!("pl", "Polish", "Polski", "🇵🇱"),
        locale!("ko", "Korean", "한국어", "🇰🇷"),
        locale!("ar", "Arabic", "العربية", "🇸🇦"),
        locale!("hi", "Hindi", "हिन्दी", "🇮🇳"),
        locale!("sv", "Swedish", "Svenska", "🇸🇪"),
        locale!("no", "Norwegian", "Norsk", "🇳🇴"),
        locale!("da", "Danish", "Dansk", "🇩🇰"),
        locale!("fi", "Finnish", "Suomi", "🇫🇮"),
        locale!("el", "Greek", "Ελληνικά", "🇬🇷"),
        locale!("he", "Hebrew", "עברית", "🇮🇱"),
        locale!("th", "Thai", "ไทย", "🇹🇭"),
        locale!("vi", "Vietnamese", "Tiếng Việt", "🇻🇳"),
        locale!("id", "Indonesian", "Bahasa Indonesia", "🇮🇩"),
        locale!("ms", "Malay", "Bahasa Melayu", "🇲🇾"),
        locale!("uk", "Ukrainian", "Українська", "🇺🇦"),
        locale!("cs", "Czech", "Čeština", "🇨🇿"),
        locale!("ro", "Romanian", "Română", "🇷🇴"),
        locale!("hu", "Hungarian", "Magyar", "🇭🇺"),
    ]
}
