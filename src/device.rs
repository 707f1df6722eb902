use std::fmt::{Display, Formatter};

use comfy_table::Color;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Inverter families the cloud distinguishes.
///
/// The OpenApiV1 device list reports MIX/SPH hybrids as type code `5` and
/// MIN/TLX units as `7`. SPA AC-coupled units only exist on the legacy web
/// API, where devices are tagged with a string instead of a code.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    /// MIX/SPH hybrid inverters (also spelled SPH/MIX by the vendor).
    #[serde(rename = "mix", alias = "sph")]
    MixSph,

    /// MIN/TLX string inverters with an optional battery.
    #[serde(rename = "tlx", alias = "min")]
    MinTlx,

    /// SPA AC-coupled battery inverters, legacy API only.
    #[serde(rename = "spa")]
    Spa,
}

impl DeviceType {
    /// Numeric type code used by the OpenApiV1 device list.
    pub const fn code(self) -> Option<u8> {
        match self {
            Self::MixSph => Some(5),
            Self::MinTlx => Some(7),
            Self::Spa => None,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            5 => Some(Self::MixSph),
            7 => Some(Self::MinTlx),
            _ => None,
        }
    }

    /// String tag used by the legacy device list, and also the OpenApiV1 URL
    /// and serial-field prefix (`mix_sn`, `tlx_sn`).
    pub const fn tag(self) -> &'static str {
        match self {
            Self::MixSph => "mix",
            Self::MinTlx => "tlx",
            Self::Spa => "spa",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "mix" | "sph" => Some(Self::MixSph),
            "tlx" | "min" => Some(Self::MinTlx),
            "spa" => Some(Self::Spa),
            _ => None,
        }
    }

    /// Whether the inverter rejects overlapping enabled schedule windows.
    ///
    /// Disabled windows never conflict: the zero-filled placeholder slots the
    /// legacy schedule format requires would otherwise always collide.
    pub const fn forbids_window_overlap(self) -> bool {
        !matches!(self, Self::Spa)
    }

    /// The OpenApiV1 endpoint serving `kind` for this device type.
    ///
    /// The mapping is the vendor's static endpoint table. SPA devices are not
    /// served by the OpenApiV1 API at all.
    pub(crate) const fn v1_endpoint(self, kind: DataKind) -> Option<&'static str> {
        match (self, kind) {
            (Self::MixSph, DataKind::LastData) => Some("device/mix/mix_last_data"),
            (Self::MixSph, DataKind::BasicInfo | DataKind::Settings) => {
                Some("device/mix/mix_data_info")
            }
            (Self::MixSph, DataKind::HistoryData) => Some("device/mix/mix_data"),
            (Self::MixSph, DataKind::ReadParam) => Some("readMixParam"),
            (Self::MinTlx, DataKind::LastData) => Some("device/tlx/tlx_last_data"),
            (Self::MinTlx, DataKind::BasicInfo) => Some("device/tlx/tlx_data_info"),
            (Self::MinTlx, DataKind::HistoryData) => Some("device/tlx/tlx_data"),
            (Self::MinTlx, DataKind::Settings) => Some("device/tlx/tlx_set_info"),
            (Self::MinTlx, DataKind::ReadParam) => Some("readMinParam"),
            (Self::Spa, _) => None,
        }
    }

    pub(crate) fn require_v1_endpoint(self, kind: DataKind) -> Result<&'static str> {
        self.v1_endpoint(kind).ok_or_else(|| Error::Configuration {
            command: kind.label().to_string(),
            device_type: self,
        })
    }

    pub const fn color(self) -> Color {
        match self {
            Self::MixSph => Color::Cyan,
            Self::MinTlx => Color::Green,
            Self::Spa => Color::Magenta,
        }
    }
}

impl Display for DeviceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MixSph => write!(f, "MIX/SPH"),
            Self::MinTlx => write!(f, "MIN/TLX"),
            Self::Spa => write!(f, "SPA"),
        }
    }
}

/// Per-device-type data operations of the OpenApiV1 API.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum DataKind {
    LastData,
    BasicInfo,
    HistoryData,
    Settings,
    ReadParam,
}

impl DataKind {
    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::LastData => "device energy",
            Self::BasicInfo => "device details",
            Self::HistoryData => "device energy history",
            Self::Settings => "device settings",
            Self::ReadParam => "parameter read",
        }
    }
}

/// One inverter or battery unit, a read-only view over server-side state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "device_sn")]
    pub serial_number: String,

    /// Raw vendor type code; see [`Device::device_type`].
    #[serde(rename = "type")]
    pub type_code: u8,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default, rename = "datalogger_sn")]
    pub datalogger_serial_number: Option<String>,

    #[serde(default)]
    pub status: Option<i64>,

    #[serde(default, rename = "last_update_time")]
    pub last_updated_at: Option<String>,

    /// Owning plant, stamped by [`crate::api::v1::OpenApiV1::device_list`].
    #[serde(default)]
    pub plant_id: u64,
}

impl Device {
    pub fn new(serial_number: impl Into<String>, device_type: DeviceType, plant_id: u64) -> Self {
        Self {
            serial_number: serial_number.into(),
            type_code: match device_type.code() {
                Some(code) => code,
                None => 0,
            },
            model: None,
            datalogger_serial_number: None,
            status: None,
            last_updated_at: None,
            plant_id,
        }
    }

    pub const fn device_type(&self) -> Option<DeviceType> {
        DeviceType::from_code(self.type_code)
    }

    pub(crate) fn require_type(&self) -> Result<DeviceType> {
        self.device_type().ok_or_else(|| {
            Error::validation(
                "type",
                format!(
                    "device `{}` has unrecognized type code {}",
                    self.serial_number, self.type_code
                ),
            )
        })
    }
}

/// Battery priority mode of a time-of-use segment.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum BatteryMode {
    LoadFirst,
    BatteryFirst,
    GridFirst,
}

impl BatteryMode {
    pub const fn code(self) -> u8 {
        match self {
            Self::LoadFirst => 0,
            Self::BatteryFirst => 1,
            Self::GridFirst => 2,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::LoadFirst),
            1 => Some(Self::BatteryFirst),
            2 => Some(Self::GridFirst),
            _ => None,
        }
    }

    /// Title as the ShinePhone app shows it.
    pub const fn name(self) -> &'static str {
        match self {
            Self::LoadFirst => "Load First",
            Self::BatteryFirst => "Battery First",
            Self::GridFirst => "Grid First",
        }
    }

    pub const fn color(self) -> Color {
        match self {
            Self::LoadFirst => Color::DarkYellow,
            Self::BatteryFirst => Color::Green,
            Self::GridFirst => Color::Blue,
        }
    }
}

impl Display for BatteryMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for BatteryMode {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        Self::from_code(code)
            .ok_or_else(|| Error::validation("batt_mode", format!("{code} is not a battery mode")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_code_round_trip_ok() {
        assert_eq!(DeviceType::from_code(5), Some(DeviceType::MixSph));
        assert_eq!(DeviceType::from_code(7), Some(DeviceType::MinTlx));
        assert_eq!(DeviceType::from_code(1), None);
        assert_eq!(DeviceType::MixSph.code(), Some(5));
        assert_eq!(DeviceType::Spa.code(), None);
    }

    #[test]
    fn test_device_type_from_tag_ok() {
        assert_eq!(DeviceType::from_tag("mix"), Some(DeviceType::MixSph));
        assert_eq!(DeviceType::from_tag("sph"), Some(DeviceType::MixSph));
        assert_eq!(DeviceType::from_tag("tlx"), Some(DeviceType::MinTlx));
        assert_eq!(DeviceType::from_tag("spa"), Some(DeviceType::Spa));
        assert_eq!(DeviceType::from_tag("bat"), None);
    }

    #[test]
    fn test_spa_has_no_v1_endpoints_err() {
        let error = DeviceType::Spa.require_v1_endpoint(DataKind::Settings).unwrap_err();
        assert!(matches!(error, Error::Configuration { device_type: DeviceType::Spa, .. }));
    }

    #[test]
    fn test_settings_endpoints_differ_per_type_ok() {
        assert_eq!(
            DeviceType::MixSph.v1_endpoint(DataKind::Settings),
            Some("device/mix/mix_data_info")
        );
        assert_eq!(
            DeviceType::MinTlx.v1_endpoint(DataKind::Settings),
            Some("device/tlx/tlx_set_info")
        );
    }

    #[test]
    fn test_device_from_list_payload_ok() {
        let device: Device = serde_json::from_value(serde_json::json!({
            "device_sn": "RUK0CAE00J",
            "type": 7,
            "model": "MIN 4200TL-XH",
            "lost": false,
            "status": 1,
        }))
        .unwrap();
        assert_eq!(device.device_type(), Some(DeviceType::MinTlx));
        assert_eq!(device.plant_id, 0);
    }
}
