//! Normalization of the settings and energy mappings the server returns.
//!
//! Field spellings differ between device types and firmware generations
//! (`etoGridToday` vs `eToGridToday` vs `etogridTotal`). [`canonicalize`]
//! only ever *adds* the canonical spelling next to the raw one, so nothing
//! the server said is lost and the function is idempotent.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    command::TimeOfDay,
    device::{BatteryMode, DeviceType},
};

/// Canonical spelling and the aliases observed for it, per device family.
type AliasTable = &'static [(&'static str, &'static [&'static str])];

const MIN_TLX_ALIASES: AliasTable = &[
    ("etoGridToday", &["eToGridToday"]),
    ("etoGridTotal", &["eToGridTotal"]),
    ("elocalLoadToday", &["eLocalLoadToday"]),
    ("elocalLoadTotal", &["eLocalLoadTotal"]),
];

const MIX_SPH_ALIASES: AliasTable = &[
    ("etoGridToday", &["etogridToday"]),
    ("etoGridTotal", &["etogridTotal"]),
    ("edischargeToday", &["edischarge1Today"]),
    ("edischargeTotal", &["edischarge1Total"]),
];

const fn aliases(device_type: DeviceType) -> AliasTable {
    match device_type {
        DeviceType::MinTlx => MIN_TLX_ALIASES,
        DeviceType::MixSph | DeviceType::Spa => MIX_SPH_ALIASES,
    }
}

/// Adds canonical keys for the known alternate spellings of the device type,
/// leaving every raw key (and any unrecognized key) untouched. An already
/// present canonical key is never overwritten.
#[must_use]
pub fn canonicalize(mut raw: Map<String, Value>, device_type: DeviceType) -> Map<String, Value> {
    for (canonical, alternates) in aliases(device_type) {
        if raw.contains_key(*canonical) {
            continue;
        }
        if let Some(value) = alternates.iter().find_map(|alias| raw.get(*alias)).cloned() {
            raw.insert((*canonical).to_string(), value);
        }
    }
    raw
}

/// One parsed time-of-use segment, as stored in the device settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TimeSegment {
    pub segment_id: u8,
    /// Missing when the server reports `"null"` for the mode register.
    pub batt_mode: Option<BatteryMode>,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub enabled: bool,
}

impl TimeSegment {
    pub fn mode_name(&self) -> &'static str {
        self.batt_mode.map_or("Unknown", BatteryMode::name)
    }
}

struct SegmentKeys {
    start: &'static str,
    stop: &'static str,
    switch: &'static str,
    has_mode: bool,
}

const fn segment_keys(device_type: DeviceType) -> SegmentKeys {
    match device_type {
        DeviceType::MinTlx => SegmentKeys {
            start: "forcedTimeStart",
            stop: "forcedTimeStop",
            switch: "forcedStopSwitch",
            has_mode: true,
        },
        DeviceType::MixSph | DeviceType::Spa => SegmentKeys {
            start: "forcedChargeTimeStart",
            stop: "forcedChargeTimeStop",
            switch: "forcedChargeStopSwitch",
            has_mode: false,
        },
    }
}

/// Parses the nine time-of-use segments out of a settings mapping.
///
/// The server is sloppy here: times come as `"H:M"` without padding, absent
/// registers come as `"null"` strings, flags come as numbers or digit
/// strings. Anything unparseable falls back to a disabled midnight segment,
/// which is what the cloud UI shows for it too.
pub fn time_segments(settings: &Map<String, Value>, device_type: DeviceType) -> Vec<TimeSegment> {
    let keys = segment_keys(device_type);
    (1..=9)
        .map(|segment_id| {
            let batt_mode = if keys.has_mode {
                settings
                    .get(&format!("time{segment_id}Mode"))
                    .and_then(as_u8)
                    .and_then(BatteryMode::from_code)
            } else {
                None
            };
            TimeSegment {
                segment_id,
                batt_mode,
                start: parse_time(settings.get(&format!("{}{segment_id}", keys.start))),
                end: parse_time(settings.get(&format!("{}{segment_id}", keys.stop))),
                enabled: settings
                    .get(&format!("{}{segment_id}", keys.switch))
                    .and_then(as_u8)
                    .is_some_and(|switch| switch == 1),
            }
        })
        .collect()
}

fn parse_time(value: Option<&Value>) -> TimeOfDay {
    let Some(raw) = value.and_then(Value::as_str) else {
        return TimeOfDay::MIDNIGHT;
    };
    if raw.is_empty() || raw == "null" {
        return TimeOfDay::MIDNIGHT;
    }
    raw.split_once(':')
        .and_then(|(hour, minute)| {
            let hour = hour.trim().parse().ok()?;
            let minute = minute.trim().parse().ok()?;
            TimeOfDay::try_new(hour, minute).ok()
        })
        .unwrap_or(TimeOfDay::MIDNIGHT)
}

/// Flags and mode registers come back as numbers or digit strings,
/// depending on the firmware.
fn as_u8(value: &Value) -> Option<u8> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|number| u8::try_from(number).ok()),
        Value::String(string) => string.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn tlx_settings() -> Map<String, Value> {
        let Value::Object(map) = json!({
            "forcedTimeStart1": "8:0",
            "forcedTimeStop1": "16:0",
            "time1Mode": "1",
            "forcedStopSwitch1": 1,
            "forcedTimeStart2": "null",
            "forcedTimeStop2": "null",
            "time2Mode": "null",
            "forcedStopSwitch2": "0",
            "eToGridToday": "1.2",
        }) else {
            unreachable!()
        };
        map
    }

    #[test]
    fn test_canonicalize_adds_and_preserves_ok() {
        let canonical = canonicalize(tlx_settings(), DeviceType::MinTlx);
        assert_eq!(canonical.get("etoGridToday"), Some(&json!("1.2")));
        // The raw spelling stays next to the canonical one.
        assert_eq!(canonical.get("eToGridToday"), Some(&json!("1.2")));
    }

    #[test]
    fn test_canonicalize_is_idempotent_ok() {
        let once = canonicalize(tlx_settings(), DeviceType::MinTlx);
        let twice = canonicalize(once.clone(), DeviceType::MinTlx);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_canonicalize_never_overwrites_ok() {
        let mut raw = tlx_settings();
        raw.insert("etoGridToday".to_string(), json!("3.4"));
        let canonical = canonicalize(raw, DeviceType::MinTlx);
        assert_eq!(canonical.get("etoGridToday"), Some(&json!("3.4")));
    }

    #[test]
    fn test_time_segments_parse_ok() {
        let segments = time_segments(&tlx_settings(), DeviceType::MinTlx);
        assert_eq!(segments.len(), 9);

        let first = &segments[0];
        assert_eq!(first.batt_mode, Some(BatteryMode::BatteryFirst));
        assert_eq!(first.start.to_string(), "08:00");
        assert_eq!(first.end.to_string(), "16:00");
        assert!(first.enabled);

        // `"null"` registers fall back to a disabled midnight segment.
        let second = &segments[1];
        assert_eq!(second.batt_mode, None);
        assert_eq!(second.mode_name(), "Unknown");
        assert_eq!(second.start, TimeOfDay::MIDNIGHT);
        assert!(!second.enabled);
    }

    #[test]
    fn test_time_segments_mix_prefixes_ok() {
        let Value::Object(settings) = json!({
            "forcedChargeTimeStart1": "0:40",
            "forcedChargeTimeStop1": "4:30",
            "forcedChargeStopSwitch1": "1",
        }) else {
            unreachable!()
        };
        let segments = time_segments(&settings, DeviceType::MixSph);
        assert_eq!(segments[0].start.to_string(), "00:40");
        assert_eq!(segments[0].end.to_string(), "04:30");
        assert!(segments[0].enabled);
        assert_eq!(segments[0].batt_mode, None);
    }
}
