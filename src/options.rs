use std::str::FromStr;

use egui::Color32;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::color::{normalize_hex_rgb, parse_hex_or};
use crate::store::{KeyValueStore, StorageChanges, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("unknown option key {0:?}")]
    UnknownKey(String),

    #[error("invalid value for option {key}: {source}")]
    InvalidValue {
        key: OptionKey,
        source: serde_json::Error,
    },
}

/// Every key the settings store may hold for us.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OptionKey {
    ShowFullUrl,
    ShowFullTitle,
    HideSelfTabs,
    KeepSingleSelfTab,
    SyncFoldState,
    TitleFontSize,
    InfoFontSize,
    LightGradientStart,
    LightGradientEnd,
    LightGradientAngle,
    DarkGradientStart,
    DarkGradientEnd,
    DarkGradientAngle,
    CompactView,
    InvertFaviconColors,
    ShowGroupTabCount,
    AutoDiscard,
    AutoDiscardAfterDays,
}

impl OptionKey {
    pub const ALL: [Self; 18] = [
        Self::ShowFullUrl,
        Self::ShowFullTitle,
        Self::HideSelfTabs,
        Self::KeepSingleSelfTab,
        Self::SyncFoldState,
        Self::TitleFontSize,
        Self::InfoFontSize,
        Self::LightGradientStart,
        Self::LightGradientEnd,
        Self::LightGradientAngle,
        Self::DarkGradientStart,
        Self::DarkGradientEnd,
        Self::DarkGradientAngle,
        Self::CompactView,
        Self::InvertFaviconColors,
        Self::ShowGroupTabCount,
        Self::AutoDiscard,
        Self::AutoDiscardAfterDays,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShowFullUrl => "showFullUrl",
            Self::ShowFullTitle => "showFullTitle",
            Self::HideSelfTabs => "hideSelfTabs",
            Self::KeepSingleSelfTab => "keepSingleSelfTab",
            Self::SyncFoldState => "syncFoldState",
            Self::TitleFontSize => "titleFontSize",
            Self::InfoFontSize => "infoFontSize",
            Self::LightGradientStart => "lightGradientStart",
            Self::LightGradientEnd => "lightGradientEnd",
            Self::LightGradientAngle => "lightGradientAngle",
            Self::DarkGradientStart => "darkGradientStart",
            Self::DarkGradientEnd => "darkGradientEnd",
            Self::DarkGradientAngle => "darkGradientAngle",
            Self::CompactView => "compactView",
            Self::InvertFaviconColors => "invertFaviconColors",
            Self::ShowGroupTabCount => "showGroupTabCount",
            Self::AutoDiscard => "autoDiscard",
            Self::AutoDiscardAfterDays => "autoDiscardAfterDays",
        }
    }

    /// Keys that change which lines exist or where they go, rather than how they look.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            Self::HideSelfTabs | Self::KeepSingleSelfTab | Self::SyncFoldState
        )
    }
}

impl std::fmt::Display for OptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionKey {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| OptionsError::UnknownKey(s.to_owned()))
    }
}

/// User preferences, persisted in the synchronized settings store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    pub show_full_url: bool,
    pub show_full_title: bool,

    /// Hide lines for the board's own page.
    pub hide_self_tabs: bool,

    /// Close every instance of the board's own page but the last one.
    pub keep_single_self_tab: bool,

    /// Mirror fold state with the browser's native group collapse.
    pub sync_fold_state: bool,

    pub title_font_size: f32,
    pub info_font_size: f32,

    pub light_gradient_start: String,
    pub light_gradient_end: String,
    pub light_gradient_angle: f32,
    pub dark_gradient_start: String,
    pub dark_gradient_end: String,
    pub dark_gradient_angle: f32,

    pub compact_view: bool,
    pub invert_favicon_colors: bool,
    pub show_group_tab_count: bool,

    pub auto_discard: bool,
    pub auto_discard_after_days: f64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            show_full_url: false,
            show_full_title: false,
            hide_self_tabs: true,
            keep_single_self_tab: true,
            sync_fold_state: true,
            title_font_size: 14.0,
            info_font_size: 11.0,
            light_gradient_start: "#E0EAFC".to_owned(),
            light_gradient_end: "#CFDEF3".to_owned(),
            light_gradient_angle: 135.0,
            dark_gradient_start: "#232526".to_owned(),
            dark_gradient_end: "#414345".to_owned(),
            dark_gradient_angle: 135.0,
            compact_view: false,
            invert_favicon_colors: false,
            show_group_tab_count: true,
            auto_discard: false,
            auto_discard_after_days: 7.0,
        }
    }
}

/// What a storage-change merge did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionsMerge {
    pub changed: Vec<OptionKey>,
}

impl OptionsMerge {
    pub fn is_structural(&self) -> bool {
        self.changed.iter().any(|key| key.is_structural())
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}

/// Resolved page background for one color scheme.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThemeGradient {
    pub start: Color32,
    pub end: Color32,
    pub angle_degrees: f32,
}

fn decode<T: serde::de::DeserializeOwned>(key: OptionKey, value: &Value) -> Result<T, OptionsError> {
    serde_json::from_value(value.clone()).map_err(|source| OptionsError::InvalidValue { key, source })
}

/// Hex colors coming from the store are normalized; garbage falls back to `default`.
fn decode_hex(key: OptionKey, value: &Value, default: &str) -> Result<String, OptionsError> {
    let raw: String = decode(key, value)?;
    Ok(normalize_hex_rgb(&raw).unwrap_or_else(|err| {
        log::warn!("option {key}: {err}; keeping {default}");
        default.to_owned()
    }))
}

impl Options {
    /// Read every recognized key from the settings store.
    ///
    /// Unknown keys and undecodable values are logged and skipped.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut options = Self::default();
        for (key, value) in store.get_all() {
            match options.set(&key, &value) {
                Ok(()) => {}
                Err(OptionsError::UnknownKey(key)) => {
                    log::debug!("ignoring unknown settings key {key:?}");
                }
                Err(err) => log::warn!("{err}"),
            }
        }
        options
    }

    /// Write every option back to the settings store.
    ///
    /// # Errors
    /// If the store rejects the write.
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        let Value::Object(map) = serde_json::to_value(self)? else {
            return Ok(());
        };
        store.set(map.into_iter().collect())
    }

    /// Set one option from its store representation.
    ///
    /// # Errors
    /// [`OptionsError::UnknownKey`] for keys we don't know, [`OptionsError::InvalidValue`] if the
    /// value has the wrong type. Invalid hex colors are not errors: they fall back to defaults.
    pub fn set(&mut self, key: &str, value: &Value) -> Result<(), OptionsError> {
        let key: OptionKey = key.parse()?;
        let defaults = Self::default();
        match key {
            OptionKey::ShowFullUrl => self.show_full_url = decode(key, value)?,
            OptionKey::ShowFullTitle => self.show_full_title = decode(key, value)?,
            OptionKey::HideSelfTabs => self.hide_self_tabs = decode(key, value)?,
            OptionKey::KeepSingleSelfTab => self.keep_single_self_tab = decode(key, value)?,
            OptionKey::SyncFoldState => self.sync_fold_state = decode(key, value)?,
            OptionKey::TitleFontSize => self.title_font_size = decode(key, value)?,
            OptionKey::InfoFontSize => self.info_font_size = decode(key, value)?,
            OptionKey::LightGradientStart => {
                self.light_gradient_start =
                    decode_hex(key, value, &defaults.light_gradient_start)?;
            }
            OptionKey::LightGradientEnd => {
                self.light_gradient_end = decode_hex(key, value, &defaults.light_gradient_end)?;
            }
            OptionKey::LightGradientAngle => self.light_gradient_angle = decode(key, value)?,
            OptionKey::DarkGradientStart => {
                self.dark_gradient_start = decode_hex(key, value, &defaults.dark_gradient_start)?;
            }
            OptionKey::DarkGradientEnd => {
                self.dark_gradient_end = decode_hex(key, value, &defaults.dark_gradient_end)?;
            }
            OptionKey::DarkGradientAngle => self.dark_gradient_angle = decode(key, value)?,
            OptionKey::CompactView => self.compact_view = decode(key, value)?,
            OptionKey::InvertFaviconColors => self.invert_favicon_colors = decode(key, value)?,
            OptionKey::ShowGroupTabCount => self.show_group_tab_count = decode(key, value)?,
            OptionKey::AutoDiscard => self.auto_discard = decode(key, value)?,
            OptionKey::AutoDiscardAfterDays => self.auto_discard_after_days = decode(key, value)?,
        }
        Ok(())
    }

    /// Merge a change notification from the settings store.
    ///
    /// Only recognized keys with a new value are applied.
    pub fn merge_changes(&mut self, changes: &StorageChanges) -> OptionsMerge {
        let mut merge = OptionsMerge::default();
        for (key, change) in changes {
            let Some(new_value) = &change.new_value else {
                continue;
            };
            match self.set(key, new_value) {
                Ok(()) => {
                    if let Ok(key) = key.parse() {
                        merge.changed.push(key);
                    }
                }
                Err(OptionsError::UnknownKey(key)) => {
                    log::debug!("ignoring change to unknown settings key {key:?}");
                }
                Err(err) => log::warn!("{err}"),
            }
        }
        merge
    }

    /// Auto-discard threshold in milliseconds, or `None` when auto-discard is off.
    pub fn auto_discard_threshold_ms(&self) -> Option<f64> {
        (self.auto_discard && self.auto_discard_after_days > 0.0)
            .then(|| self.auto_discard_after_days * 24.0 * 60.0 * 60.0 * 1000.0)
    }

    pub fn gradient(&self, dark_mode: bool) -> ThemeGradient {
        let defaults = Self::default();
        if dark_mode {
            ThemeGradient {
                start: parse_hex_or(
                    &self.dark_gradient_start,
                    parse_hex_or(&defaults.dark_gradient_start, Color32::BLACK),
                ),
                end: parse_hex_or(
                    &self.dark_gradient_end,
                    parse_hex_or(&defaults.dark_gradient_end, Color32::BLACK),
                ),
                angle_degrees: self.dark_gradient_angle,
            }
        } else {
            ThemeGradient {
                start: parse_hex_or(
                    &self.light_gradient_start,
                    parse_hex_or(&defaults.light_gradient_start, Color32::WHITE),
                ),
                end: parse_hex_or(
                    &self.light_gradient_end,
                    parse_hex_or(&defaults.light_gradient_end, Color32::WHITE),
                ),
                angle_degrees: self.light_gradient_angle,
            }
        }
    }
}

/// Tuned engine constants and diagnostics switches.
///
/// These are not user preferences, and are not persisted.
#[derive(Clone, Debug)]
pub struct EngineTuning {
    /// Fraction of a drop target's height, measured from its top, that resolves to "insert before".
    ///
    /// Anything below resolves to "insert after".
    pub drop_zone_split: f32,

    /// Pointer moves smaller than this (in points) since the last processed move are ignored.
    pub pointer_move_threshold: f32,

    /// Seconds to wait for a burst of browser events to settle before a full re-render.
    pub rerender_debounce: f64,

    /// Seconds during which moved-events are ignored after committing a single-tab drag.
    pub single_move_suppression: f64,

    /// Seconds after which unconsumed group-drag suppression entries are dropped.
    pub group_move_suppression_expiry: f64,

    /// Height of a tab line (points).
    pub line_height: f32,

    /// Height of a tab line in compact view (points).
    pub compact_line_height: f32,

    /// Height of a group header (points).
    pub group_header_height: f32,

    /// Width used when laying out the list (points).
    pub list_width: f32,

    /// If true, record reconciliation and drag decisions in a small ring buffer.
    pub debug_event_log: bool,

    /// Maximum number of debug log lines to keep (ring buffer).
    pub debug_event_log_capacity: usize,

    /// If true, check the document invariants after every handled event (debug-only).
    pub debug_integrity: bool,

    /// If true, panic on integrity issues (debug-only).
    pub debug_integrity_panic: bool,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            drop_zone_split: 0.2,
            pointer_move_threshold: 4.0,
            rerender_debounce: 0.1,
            single_move_suppression: 0.5,
            group_move_suppression_expiry: 3.0,
            line_height: 40.0,
            compact_line_height: 28.0,
            group_header_height: 32.0,
            list_width: 480.0,
            debug_event_log: false,
            debug_event_log_capacity: 200,
            debug_integrity: false,
            debug_integrity_panic: false,
        }
    }
}

/// Facts about where the board runs.
#[derive(Clone, Debug)]
pub struct Environment {
    /// URL of the board's own page (used to recognize "self" tabs).
    pub self_url: String,

    /// Base of the favicon resolution endpoint; the page URL is appended as `pageUrl`.
    pub favicon_endpoint: String,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            self_url: "chrome://newtab/".to_owned(),
            favicon_endpoint: "/_favicon/?size=32&pageUrl=".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StorageChange};

    #[test]
    fn keys_round_trip_through_strings() {
        for key in OptionKey::ALL {
            assert_eq!(key.as_str().parse::<OptionKey>().unwrap(), key);
        }
        assert!(matches!(
            "fontFamily".parse::<OptionKey>(),
            Err(OptionsError::UnknownKey(_))
        ));
    }

    #[test]
    fn serialized_names_match_keys() {
        let Value::Object(map) = serde_json::to_value(Options::default()).unwrap() else {
            panic!("options must serialize to an object");
        };
        for key in OptionKey::ALL {
            assert!(map.contains_key(key.as_str()), "missing {key}");
        }
        assert_eq!(map.len(), OptionKey::ALL.len());
    }

    #[test]
    fn load_skips_unknown_and_bad_values() {
        let store = MemoryStore::with_values([
            ("showFullUrl".to_owned(), Value::Bool(true)),
            ("legacyThing".to_owned(), Value::Bool(true)),
            ("titleFontSize".to_owned(), Value::from("big")),
            ("darkGradientStart".to_owned(), Value::from("abc")),
            ("lightGradientEnd".to_owned(), Value::from("not-a-color")),
        ]);
        let options = Options::load(&store);

        assert!(options.show_full_url);
        assert_eq!(options.title_font_size, Options::default().title_font_size);
        assert_eq!(options.dark_gradient_start, "#AABBCC");
        assert_eq!(options.light_gradient_end, Options::default().light_gradient_end);
    }

    #[test]
    fn merge_reports_structural_changes() {
        let mut options = Options::default();
        let mut changes = StorageChanges::new();
        changes.insert(
            "compactView".to_owned(),
            StorageChange {
                old_value: Some(Value::Bool(false)),
                new_value: Some(Value::Bool(true)),
            },
        );
        let merge = options.merge_changes(&changes);
        assert!(options.compact_view);
        assert!(!merge.is_structural());

        changes.insert(
            "syncFoldState".to_owned(),
            StorageChange {
                old_value: Some(Value::Bool(true)),
                new_value: Some(Value::Bool(false)),
            },
        );
        let merge = options.merge_changes(&changes);
        assert!(!options.sync_fold_state);
        assert!(merge.is_structural());
    }

    #[test]
    fn save_then_load_preserves_options() {
        let mut store = MemoryStore::new();
        let options = Options {
            auto_discard: true,
            auto_discard_after_days: 2.5,
            ..Default::default()
        };
        options.save(&mut store).unwrap();
        assert_eq!(Options::load(&store), options);
    }

    #[test]
    fn auto_discard_threshold() {
        let mut options = Options::default();
        assert_eq!(options.auto_discard_threshold_ms(), None);
        options.auto_discard = true;
        options.auto_discard_after_days = 1.0;
        assert_eq!(options.auto_discard_threshold_ms(), Some(86_400_000.0));
    }
}
