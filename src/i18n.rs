/*
Display strings for the event board.

This module provides:
- A tiny embedded translations store for EN/RU (compile-time embedded JSON).
- A simple `tr` function to lookup translations by key + optional params.
- A `t` convenience wrapper using the default language (DEFAULT_LANG).

Usage:
    use crate::i18n;
    let msg = i18n::t("events.no_active");
    let more = i18n::tr(Some("ru"), "events.more_upcoming", Some(&[("count", "6")]));

Notes:
- Placeholders in translation strings use single-brace format: `{name}`.
- Default language is `en`. If a key is missing for the requested language,
  the fallback language will be used.
*/

use std::collections::HashMap;
use std::sync::OnceLock;

pub const DEFAULT_LANG: &str = "en";

static TRANSLATIONS: OnceLock<HashMap<String, HashMap<String, String>>> = OnceLock::new();

const EN_JSON: &str = r#"
{
  "events.loading": "Loading event timers...",
  "events.no_active": "No active events right now. Check back soon! ⏳",
  "events.no_upcoming": "No upcoming events scheduled.",
  "events.more_upcoming": "+ {count} more upcoming events...",
  "events.error": "⚠️ Error loading events: {err}. Try refreshing.",
  "events.status_active": "🔴 ACTIVE NOW",
  "events.status_scheduled": "📅 SCHEDULED",
  "events.ends_in": "Ends in {time}",
  "events.starts_in": "Starts in {time}",
  "duration.minutes": "{m}m",
  "duration.hours": "{h}h",
  "duration.hours_minutes": "{h}h {m}m",
  "error.unsupported_language": "Unsupported language: {lang}",
  "not_found.article": "No article with slug '{slug}'",
  "app.name": "Raider Board"
}
"#;

const RU_JSON: &str = r#"
{
  "events.loading": "Загрузка таймеров событий...",
  "events.no_active": "Сейчас нет активных событий. Загляните позже! ⏳",
  "events.no_upcoming": "Нет запланированных событий.",
  "events.more_upcoming": "+ ещё {count} предстоящих событий...",
  "events.error": "⚠️ Ошибка загрузки событий: {err}. Попробуйте обновить страницу.",
  "events.status_active": "🔴 ИДЁТ СЕЙЧАС",
  "events.status_scheduled": "📅 ЗАПЛАНИРОВАНО",
  "events.ends_in": "Закончится через {time}",
  "events.starts_in": "Начнётся через {time}",
  "duration.minutes": "{m} мин",
  "duration.hours": "{h} ч",
  "duration.hours_minutes": "{h} ч {m} мин",
  "error.unsupported_language": "Неподдерживаемый язык: {lang}",
  "not_found.article": "Статья '{slug}' не найдена"
}
"#;

/// Initialize translations map (lazy).
fn build_translations() -> HashMap<String, HashMap<String, String>> {
    let mut out: HashMap<String, HashMap<String, String>> = HashMap::new();

    // Parse EN
    let en_map: HashMap<String, String> = serde_json::from_str(EN_JSON).unwrap_or_else(|e| {
        panic!("failed to parse EN_JSON in i18n module: {}", e);
    });
    out.insert("en".to_string(), en_map);

    // Parse RU
    let ru_map: HashMap<String, String> = serde_json::from_str(RU_JSON).unwrap_or_else(|e| {
        panic!("failed to parse RU_JSON in i18n module: {}", e);
    });
    out.insert("ru".to_string(), ru_map);

    out
}

/// Returns the global translations map (lang -> (key -> message)).
fn translations() -> &'static HashMap<String, HashMap<String, String>> {
    TRANSLATIONS.get_or_init(build_translations)
}

/// Normalize a language tag into a short, lowercase code (e.g. "en-US" -> "en").
pub fn normalize_language(lang: &str) -> String {
    lang.split('-').next().unwrap_or(lang).trim().to_lowercase()
}

/// Returns true if the given language code has a translation table.
pub fn is_supported_language(lang: &str) -> bool {
    translations().contains_key(lang)
}

/// Supported language codes, sorted.
pub fn supported_languages() -> Vec<&'static str> {
    let mut langs: Vec<&'static str> = translations().keys().map(String::as_str).collect();
    langs.sort_unstable();
    langs
}

/// Translate a key using an explicit language (or default if None).
///
/// Missing keys fall back to the default language, then to the key itself.
pub fn tr(lang: Option<&str>, key: &str, params: Option<&[(&str, &str)]>) -> String {
    let map = translations();

    let desired = lang.unwrap_or(DEFAULT_LANG);

    let val = map
        .get(desired)
        .and_then(|m| m.get(key))
        .cloned()
        .or_else(|| map.get(DEFAULT_LANG).and_then(|m| m.get(key)).cloned())
        .unwrap_or_else(|| key.to_string());

    if let Some(params) = params {
        let mut s = val;
        for (k, v) in params {
            s = s.replace(&format!("{{{}}}", k), v);
        }
        s
    } else {
        val
    }
}

/// Convenience wrapper: translate using default language (DEFAULT_LANG).
pub fn t(key: &str) -> String {
    tr(None, key, None)
}
