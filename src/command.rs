//! Typed parameter requests and their encoding into the wire formats the
//! settings endpoints expect.
//!
//! Each settable feature is an immutable value object. [`encode`] maps one of
//! them, for a given device type and command, onto either an ordered
//! `param1..paramN` list (the legacy and `tlxSet` contract) or a named field
//! mapping (the V1 MIX contract). The supported command set per device type
//! is a closed static table; everything is checked before a single byte goes
//! out.

use std::fmt::{Display, Formatter};

use bon::Builder;
use itertools::Itertools;
use serde::{Serialize, Serializer};

use crate::{
    device::{BatteryMode, DeviceType},
    error::{Error, Result},
};

/// A 24-hour wall-clock time.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self { hour: 0, minute: 0 };

    pub fn try_new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 {
            return Err(Error::validation("hour", format!("{hour} is not a valid hour")));
        }
        if minute > 59 {
            return Err(Error::validation("minute", format!("{minute} is not a valid minute")));
        }
        Ok(Self { hour, minute })
    }

    pub const fn hour(self) -> u8 {
        self.hour
    }

    pub const fn minute(self) -> u8 {
        self.minute
    }

    const fn minute_of_day(self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A start/end window with an enabled flag.
///
/// A window may wrap past midnight (23:00 to 06:00 is the typical off-peak
/// charge window). An enabled window must not be empty.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ScheduleWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub enabled: bool,
}

impl ScheduleWindow {
    /// The zero-filled placeholder the legacy schedule format requires for
    /// unused slots.
    pub const UNUSED: Self =
        Self { start: TimeOfDay::MIDNIGHT, end: TimeOfDay::MIDNIGHT, enabled: false };

    pub const fn new(start: TimeOfDay, end: TimeOfDay, enabled: bool) -> Self {
        Self { start, end, enabled }
    }

    fn validate(&self, field: &'static str) -> Result {
        if self.enabled && self.start == self.end {
            return Err(Error::validation(field, "an enabled window must not be empty"));
        }
        Ok(())
    }

    /// Half-open minute spans covered by the window, split at midnight when
    /// the window wraps.
    fn minute_spans(&self) -> Vec<(u16, u16)> {
        let start = self.start.minute_of_day();
        let end = self.end.minute_of_day();
        if start < end { vec![(start, end)] } else { vec![(start, 1440), (0, end)] }
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.minute_spans()
            .into_iter()
            .cartesian_product(other.minute_spans())
            .any(|((start_a, end_a), (start_b, end_b))| start_a < end_b && start_b < end_a)
    }
}

fn ensure_disjoint(windows: &[(&'static str, ScheduleWindow)]) -> Result {
    for (&(_, window_a), &(field_b, window_b)) in
        windows.iter().filter(|(_, window)| window.enabled).tuple_combinations()
    {
        if window_a.overlaps(&window_b) {
            return Err(Error::validation(field_b, "overlaps with another enabled window"));
        }
    }
    Ok(())
}

fn check_percent(field: &'static str, value: u8) -> Result {
    if value > 100 {
        return Err(Error::validation(field, format!("{value}% is outside the 0..=100 range")));
    }
    Ok(())
}

fn bool01(value: bool) -> String {
    u8::from(value).to_string()
}

/// One time-of-use segment write for MIN/TLX units
/// (`time_segment1` through `time_segment9`).
#[derive(Copy, Clone, Debug, Builder)]
pub struct TimeSegmentParams {
    /// Segment number, 1 through 9.
    pub segment_id: u8,
    pub batt_mode: BatteryMode,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    #[builder(default = true)]
    pub enabled: bool,
}

impl TimeSegmentParams {
    fn validate(&self) -> Result {
        if !(1..=9).contains(&self.segment_id) {
            return Err(Error::validation("segment_id", "must be between 1 and 9"));
        }
        ScheduleWindow::new(self.start, self.end, self.enabled).validate("end")
    }
}

/// AC charge time period write for MIX/SPH hybrids
/// (`mix_ac_charge_time_period` and `mix_ac_discharge_time_period`).
#[derive(Copy, Clone, Debug, Builder)]
pub struct MixAcChargeTimeParams {
    /// Charging power limit in percent.
    pub charge_power: u8,
    /// State of charge at which charging stops, in percent.
    pub charge_stop_soc: u8,
    #[builder(default = true)]
    pub mains_enabled: bool,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    #[builder(default = true)]
    pub enabled: bool,
}

impl MixAcChargeTimeParams {
    fn validate(&self) -> Result {
        check_percent("charge_power", self.charge_power)?;
        check_percent("charge_stop_soc", self.charge_stop_soc)?;
        ScheduleWindow::new(self.start, self.end, self.enabled).validate("end")
    }
}

/// The legacy three-slot AC charge schedule. Every slot must be present on
/// the wire; unused ones stay [`ScheduleWindow::UNUSED`].
#[derive(Copy, Clone, Debug, Builder)]
pub struct AcChargeScheduleParams {
    pub charge_power: u8,
    pub charge_stop_soc: u8,
    pub period1: ScheduleWindow,
    #[builder(default = ScheduleWindow::UNUSED)]
    pub period2: ScheduleWindow,
    #[builder(default = ScheduleWindow::UNUSED)]
    pub period3: ScheduleWindow,
}

impl AcChargeScheduleParams {
    const fn periods(&self) -> [(&'static str, ScheduleWindow); 3] {
        [("period1", self.period1), ("period2", self.period2), ("period3", self.period3)]
    }

    fn validate(&self, device_type: DeviceType) -> Result {
        check_percent("charge_power", self.charge_power)?;
        check_percent("charge_stop_soc", self.charge_stop_soc)?;
        for (field, period) in self.periods() {
            period.validate(field)?;
        }
        if device_type.forbids_window_overlap() {
            ensure_disjoint(&self.periods())?;
        }
        Ok(())
    }
}

/// Charge and discharge power limits with their stop SoC values
/// (`charge_power` and `discharge_power`).
#[derive(Copy, Clone, Debug, Builder)]
pub struct ChargeDischargeParams {
    pub charge_power: u8,
    pub charge_stop_soc: u8,
    pub discharge_power: u8,
    pub discharge_stop_soc: u8,
    #[builder(default)]
    pub ac_charge_enabled: bool,
}

impl ChargeDischargeParams {
    fn validate(&self) -> Result {
        check_percent("charge_power", self.charge_power)?;
        check_percent("charge_stop_soc", self.charge_stop_soc)?;
        check_percent("discharge_power", self.discharge_power)?;
        check_percent("discharge_stop_soc", self.discharge_stop_soc)?;
        Ok(())
    }
}

/// Export limit (`backflow_setting`).
#[derive(Copy, Clone, Debug)]
pub struct BackflowSettingParams {
    pub enabled: bool,
    /// 0 disables the limit, 1 limits on the meter, 2 on the CT clamp.
    pub mode: u8,
}

impl BackflowSettingParams {
    fn validate(&self) -> Result {
        if self.mode > 2 {
            return Err(Error::validation("mode", format!("{} is not a backflow mode", self.mode)));
        }
        Ok(())
    }
}

/// Inverter on/off toggle (`tlx_on_off`, `mix_on_off`, `spa_on_off`).
#[derive(Copy, Clone, Debug)]
pub struct PvOnOffParams {
    pub enabled: bool,
}

impl PvOnOffParams {
    /// The server expects the registers as four-digit literals.
    const fn wire_value(self) -> &'static str {
        if self.enabled { "0001" } else { "0000" }
    }
}

/// Grid voltage trip limits (`pv_grid_voltage`).
#[derive(Copy, Clone, Debug)]
pub struct GridVoltageParams {
    pub lower_volts: f64,
    pub upper_volts: f64,
}

impl GridVoltageParams {
    fn validate(&self) -> Result {
        if !(self.lower_volts.is_finite() && self.upper_volts.is_finite()) {
            return Err(Error::validation("lower_volts", "voltages must be finite"));
        }
        if self.lower_volts >= self.upper_volts {
            return Err(Error::validation(
                "upper_volts",
                "the upper limit must be greater than the lower limit",
            ));
        }
        Ok(())
    }
}

/// Off-grid (EPS) output parameters (`tlx_off_grid_enable`,
/// `mix_off_grid_enable`).
#[derive(Copy, Clone, Debug, Builder)]
pub struct OffGridParams {
    #[builder(default = true)]
    pub enabled: bool,
    /// Output voltage in volts.
    #[builder(default = 230)]
    pub voltage: u16,
    /// Output frequency, 50 or 60 Hz.
    #[builder(default = 50)]
    pub frequency: u8,
}

impl OffGridParams {
    fn validate(&self) -> Result {
        if self.frequency != 50 && self.frequency != 60 {
            return Err(Error::validation(
                "frequency",
                format!("{} Hz is not a grid frequency", self.frequency),
            ));
        }
        Ok(())
    }
}

/// Active/reactive power rates and the power factor (`pv_power_factor`).
#[derive(Copy, Clone, Debug, Builder)]
pub struct PowerParams {
    pub active_power: u8,
    #[builder(default)]
    pub reactive_power: u8,
    #[builder(default = 1.0)]
    pub power_factor: f64,
}

impl PowerParams {
    fn validate(&self) -> Result {
        check_percent("active_power", self.active_power)?;
        check_percent("reactive_power", self.reactive_power)?;
        if !(-1.0..=1.0).contains(&self.power_factor) {
            return Err(Error::validation(
                "power_factor",
                format!("{} is outside the -1..=1 range", self.power_factor),
            ));
        }
        Ok(())
    }
}

/// A typed configuration write, one variant per settable feature.
#[derive(Copy, Clone, Debug, derive_more::From)]
pub enum ParameterRequest {
    TimeSegment(TimeSegmentParams),
    MixAcChargeTime(MixAcChargeTimeParams),
    AcChargeSchedule(AcChargeScheduleParams),
    ChargeDischarge(ChargeDischargeParams),
    Backflow(BackflowSettingParams),
    PvOnOff(PvOnOffParams),
    GridVoltage(GridVoltageParams),
    OffGrid(OffGridParams),
    Power(PowerParams),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum RequestKind {
    TimeSegment,
    MixAcChargeTime,
    AcChargeSchedule,
    ChargeDischarge,
    Backflow,
    PvOnOff,
    GridVoltage,
    OffGrid,
    Power,
}

impl RequestKind {
    const fn label(self) -> &'static str {
        match self {
            Self::TimeSegment => "time segment",
            Self::MixAcChargeTime => "AC charge time period",
            Self::AcChargeSchedule => "AC charge schedule",
            Self::ChargeDischarge => "charge/discharge",
            Self::Backflow => "backflow setting",
            Self::PvOnOff => "on/off",
            Self::GridVoltage => "grid voltage",
            Self::OffGrid => "off-grid",
            Self::Power => "power factor",
        }
    }
}

impl ParameterRequest {
    const fn kind(&self) -> RequestKind {
        match self {
            Self::TimeSegment(_) => RequestKind::TimeSegment,
            Self::MixAcChargeTime(_) => RequestKind::MixAcChargeTime,
            Self::AcChargeSchedule(_) => RequestKind::AcChargeSchedule,
            Self::ChargeDischarge(_) => RequestKind::ChargeDischarge,
            Self::Backflow(_) => RequestKind::Backflow,
            Self::PvOnOff(_) => RequestKind::PvOnOff,
            Self::GridVoltage(_) => RequestKind::GridVoltage,
            Self::OffGrid(_) => RequestKind::OffGrid,
            Self::Power(_) => RequestKind::Power,
        }
    }

    fn validate(&self, device_type: DeviceType) -> Result {
        match self {
            Self::TimeSegment(params) => params.validate(),
            Self::MixAcChargeTime(params) => params.validate(),
            Self::AcChargeSchedule(params) => params.validate(device_type),
            Self::ChargeDischarge(params) => params.validate(),
            Self::Backflow(params) => params.validate(),
            Self::PvOnOff(_) => Ok(()),
            Self::GridVoltage(params) => params.validate(),
            Self::OffGrid(params) => params.validate(),
            Self::Power(params) => params.validate(),
        }
    }

    fn payload(&self, device_type: DeviceType, command: &str) -> Payload {
        let named = matches!(device_type, DeviceType::MixSph);
        match self {
            Self::TimeSegment(params) => Payload::Positional(vec![
                params.batt_mode.code().to_string(),
                params.start.hour().to_string(),
                params.start.minute().to_string(),
                params.end.hour().to_string(),
                params.end.minute().to_string(),
                bool01(params.enabled),
            ]),

            Self::MixAcChargeTime(params) => {
                let (power_field, soc_field) = if command.starts_with("mix_ac_discharge") {
                    ("dischargePower", "dischargeStopSoc")
                } else {
                    ("chargePower", "chargeStopSoc")
                };
                Payload::Named(vec![
                    (power_field, params.charge_power.to_string()),
                    (soc_field, params.charge_stop_soc.to_string()),
                    ("acChargeEnable", bool01(params.mains_enabled)),
                    ("startHour", params.start.hour().to_string()),
                    ("startMinute", params.start.minute().to_string()),
                    ("endHour", params.end.hour().to_string()),
                    ("endMinute", params.end.minute().to_string()),
                    ("enable", bool01(params.enabled)),
                ])
            }

            Self::AcChargeSchedule(params) => {
                let mut values = vec![
                    params.charge_power.to_string(),
                    params.charge_stop_soc.to_string(),
                ];
                for (_, period) in params.periods() {
                    values.push(format!("{:02}", period.start.hour()));
                    values.push(format!("{:02}", period.start.minute()));
                    values.push(format!("{:02}", period.end.hour()));
                    values.push(format!("{:02}", period.end.minute()));
                    values.push(bool01(period.enabled));
                }
                Payload::Positional(values)
            }

            Self::ChargeDischarge(params) => {
                if command == "discharge_power" {
                    Payload::Positional(vec![
                        params.discharge_power.to_string(),
                        params.discharge_stop_soc.to_string(),
                    ])
                } else {
                    Payload::Positional(vec![
                        params.charge_power.to_string(),
                        params.charge_stop_soc.to_string(),
                        bool01(params.ac_charge_enabled),
                    ])
                }
            }

            Self::Backflow(params) => {
                if named {
                    Payload::Named(vec![
                        ("backflowEnable", bool01(params.enabled)),
                        ("backflowMode", params.mode.to_string()),
                    ])
                } else {
                    Payload::Positional(vec![bool01(params.enabled), params.mode.to_string()])
                }
            }

            Self::PvOnOff(params) => {
                if named {
                    Payload::Named(vec![("onOff", params.wire_value().to_string())])
                } else {
                    Payload::Positional(vec![params.wire_value().to_string()])
                }
            }

            Self::GridVoltage(params) => {
                let lower = format!("{:.1}", params.lower_volts);
                let upper = format!("{:.1}", params.upper_volts);
                if named {
                    Payload::Named(vec![("vacLow", lower), ("vacHigh", upper)])
                } else {
                    Payload::Positional(vec![lower, upper])
                }
            }

            Self::OffGrid(params) => {
                if named {
                    Payload::Named(vec![
                        ("offGridEnable", bool01(params.enabled)),
                        ("offGridVoltage", params.voltage.to_string()),
                        ("offGridFrequency", params.frequency.to_string()),
                    ])
                } else {
                    Payload::Positional(vec![
                        bool01(params.enabled),
                        params.voltage.to_string(),
                        params.frequency.to_string(),
                    ])
                }
            }

            Self::Power(params) => Payload::Positional(vec![
                params.active_power.to_string(),
                params.reactive_power.to_string(),
                format!("{:.2}", params.power_factor),
            ]),
        }
    }
}

#[derive(Copy, Clone)]
struct CommandSpec {
    command: &'static str,
    kind: RequestKind,
}

const fn spec(command: &'static str, kind: RequestKind) -> CommandSpec {
    CommandSpec { command, kind }
}

const MIN_TLX_COMMANDS: &[CommandSpec] = &[
    spec("time_segment1", RequestKind::TimeSegment),
    spec("time_segment2", RequestKind::TimeSegment),
    spec("time_segment3", RequestKind::TimeSegment),
    spec("time_segment4", RequestKind::TimeSegment),
    spec("time_segment5", RequestKind::TimeSegment),
    spec("time_segment6", RequestKind::TimeSegment),
    spec("time_segment7", RequestKind::TimeSegment),
    spec("time_segment8", RequestKind::TimeSegment),
    spec("time_segment9", RequestKind::TimeSegment),
    spec("charge_power", RequestKind::ChargeDischarge),
    spec("discharge_power", RequestKind::ChargeDischarge),
    spec("backflow_setting", RequestKind::Backflow),
    spec("tlx_on_off", RequestKind::PvOnOff),
    spec("pv_grid_voltage", RequestKind::GridVoltage),
    spec("pv_power_factor", RequestKind::Power),
    spec("tlx_off_grid_enable", RequestKind::OffGrid),
];

const MIX_SPH_COMMANDS: &[CommandSpec] = &[
    spec("mix_ac_charge_time_period", RequestKind::MixAcChargeTime),
    spec("mix_ac_discharge_time_period", RequestKind::AcChargeSchedule),
    spec("backflow_setting", RequestKind::Backflow),
    spec("mix_on_off", RequestKind::PvOnOff),
    spec("pv_grid_voltage", RequestKind::GridVoltage),
    spec("mix_off_grid_enable", RequestKind::OffGrid),
];

const SPA_COMMANDS: &[CommandSpec] = &[
    spec("spa_ac_charge_time_period", RequestKind::AcChargeSchedule),
    spec("spa_ac_discharge_time_period", RequestKind::AcChargeSchedule),
    spec("spa_on_off", RequestKind::PvOnOff),
];

const fn commands(device_type: DeviceType) -> &'static [CommandSpec] {
    match device_type {
        DeviceType::MinTlx => MIN_TLX_COMMANDS,
        DeviceType::MixSph => MIX_SPH_COMMANDS,
        DeviceType::Spa => SPA_COMMANDS,
    }
}

/// Command names settable on the given device type.
pub fn supported_commands(device_type: DeviceType) -> impl Iterator<Item = &'static str> {
    commands(device_type).iter().map(|spec| spec.command)
}

/// The wire-level representation of an encoded parameter write.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Payload {
    /// Ordered values rendered as `param1..paramN` form fields.
    Positional(Vec<String>),
    /// Named form fields.
    Named(Vec<(&'static str, String)>),
}

/// A validated, fully encoded parameter write, ready for the transport.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncodedCommand {
    command: String,
    payload: Payload,
}

impl EncodedCommand {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Renders the full form body: the serial field, the command `type` and
    /// every parameter field. Positional payloads are padded with empty
    /// `paramN` fields up to `pad_to` (the `tlxSet` endpoint insists on all
    /// 19 being present).
    pub(crate) fn into_form(self, serial_field: &str, serial_number: &str) -> Vec<(String, String)> {
        self.into_padded_form(serial_field, serial_number, 0)
    }

    pub(crate) fn into_padded_form(
        self,
        serial_field: &str,
        serial_number: &str,
        pad_to: usize,
    ) -> Vec<(String, String)> {
        let mut form = vec![
            (serial_field.to_string(), serial_number.to_string()),
            ("type".to_string(), self.command),
        ];
        match self.payload {
            Payload::Positional(values) => {
                let count = values.len().max(pad_to);
                let values = values.into_iter().chain(std::iter::repeat_with(String::new));
                for (position, value) in (1..=count).zip(values) {
                    form.push((format!("param{position}"), value));
                }
            }
            Payload::Named(fields) => {
                form.extend(fields.into_iter().map(|(name, value)| (name.to_string(), value)));
            }
        }
        form
    }
}

/// Encodes a typed request into the exact field layout the device type's
/// settings endpoint expects.
///
/// Fails with [`Error::Configuration`] when the command is not in the device
/// type's command set, and with [`Error::Validation`] when a field violates
/// its constraint. No network traffic, no partial output.
pub fn encode(
    request: &ParameterRequest,
    device_type: DeviceType,
    command: &str,
) -> Result<EncodedCommand> {
    let Some(spec) = commands(device_type).iter().find(|spec| spec.command == command) else {
        return Err(Error::Configuration { command: command.to_string(), device_type });
    };
    if spec.kind != request.kind() {
        return Err(Error::validation(
            "params",
            format!("`{command}` expects {} parameters", spec.kind.label()),
        ));
    }
    if let ParameterRequest::TimeSegment(params) = request {
        let expected = format!("time_segment{}", params.segment_id);
        if expected != command {
            return Err(Error::validation(
                "segment_id",
                format!("segment {} does not match `{command}`", params.segment_id),
            ));
        }
    }
    request.validate(device_type)?;
    Ok(EncodedCommand {
        command: command.to_string(),
        payload: request.payload(device_type, command),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(hour: u8, minute: u8) -> TimeOfDay {
        TimeOfDay::try_new(hour, minute).unwrap()
    }

    #[test]
    fn test_time_of_day_display_ok() {
        assert_eq!(time(6, 0).to_string(), "06:00");
        assert_eq!(time(23, 5).to_string(), "23:05");
    }

    #[test]
    fn test_time_of_day_out_of_range_err() {
        let error = TimeOfDay::try_new(24, 0).unwrap_err();
        assert!(matches!(error, Error::Validation { field: "hour", .. }));
        let error = TimeOfDay::try_new(0, 60).unwrap_err();
        assert!(matches!(error, Error::Validation { field: "minute", .. }));
    }

    #[test]
    fn test_wrapping_windows_overlap_ok() {
        let over_midnight = ScheduleWindow::new(time(23, 0), time(6, 0), true);
        let morning = ScheduleWindow::new(time(5, 0), time(7, 0), true);
        let afternoon = ScheduleWindow::new(time(12, 0), time(18, 0), true);
        assert!(over_midnight.overlaps(&morning));
        assert!(!over_midnight.overlaps(&afternoon));
    }

    #[test]
    fn test_encode_mix_ac_charge_time_ok() {
        let params = MixAcChargeTimeParams::builder()
            .charge_power(80)
            .charge_stop_soc(95)
            .mains_enabled(true)
            .start(time(23, 0))
            .end(time(6, 0))
            .enabled(true)
            .build();
        let encoded =
            encode(&params.into(), DeviceType::MixSph, "mix_ac_charge_time_period").unwrap();
        assert_eq!(encoded.command(), "mix_ac_charge_time_period");
        assert_eq!(
            encoded.payload(),
            &Payload::Named(vec![
                ("chargePower", "80".to_string()),
                ("chargeStopSoc", "95".to_string()),
                ("acChargeEnable", "1".to_string()),
                ("startHour", "23".to_string()),
                ("startMinute", "0".to_string()),
                ("endHour", "6".to_string()),
                ("endMinute", "0".to_string()),
                ("enable", "1".to_string()),
            ]),
        );
    }

    #[test]
    fn test_encode_charge_power_out_of_range_err() {
        let params = MixAcChargeTimeParams::builder()
            .charge_power(150)
            .charge_stop_soc(95)
            .start(time(23, 0))
            .end(time(6, 0))
            .build();
        let error =
            encode(&params.into(), DeviceType::MixSph, "mix_ac_charge_time_period").unwrap_err();
        assert!(matches!(error, Error::Validation { field: "charge_power", .. }));
    }

    #[test]
    fn test_encode_boundary_percents_ok() {
        for soc in [0, 100] {
            let params = MixAcChargeTimeParams::builder()
                .charge_power(soc)
                .charge_stop_soc(soc)
                .start(time(1, 30))
                .end(time(5, 30))
                .build();
            encode(&params.into(), DeviceType::MixSph, "mix_ac_charge_time_period").unwrap();
        }
    }

    #[test]
    fn test_encode_unsupported_pairing_err() {
        let params = TimeSegmentParams::builder()
            .segment_id(1)
            .batt_mode(BatteryMode::BatteryFirst)
            .start(time(8, 0))
            .end(time(16, 0))
            .build();
        let error =
            encode(&params.into(), DeviceType::MinTlx, "mix_ac_charge_time_period").unwrap_err();
        match error {
            Error::Configuration { command, device_type } => {
                assert_eq!(command, "mix_ac_charge_time_period");
                assert_eq!(device_type, DeviceType::MinTlx);
            }
            other => panic!("expected a configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_kind_mismatch_err() {
        let params = PvOnOffParams { enabled: true };
        let error = encode(&params.into(), DeviceType::MinTlx, "charge_power").unwrap_err();
        assert!(matches!(error, Error::Validation { field: "params", .. }));
    }

    #[test]
    fn test_encode_time_segment_ok() {
        let params = TimeSegmentParams::builder()
            .segment_id(1)
            .batt_mode(BatteryMode::BatteryFirst)
            .start(time(8, 0))
            .end(time(16, 0))
            .enabled(true)
            .build();
        let encoded = encode(&params.into(), DeviceType::MinTlx, "time_segment1").unwrap();
        assert_eq!(
            encoded.payload(),
            &Payload::Positional(vec![
                "1".to_string(),
                "8".to_string(),
                "0".to_string(),
                "16".to_string(),
                "0".to_string(),
                "1".to_string(),
            ]),
        );
    }

    #[test]
    fn test_encode_segment_command_mismatch_err() {
        let params = TimeSegmentParams::builder()
            .segment_id(2)
            .batt_mode(BatteryMode::LoadFirst)
            .start(time(0, 1))
            .end(time(11, 59))
            .build();
        let error = encode(&params.into(), DeviceType::MinTlx, "time_segment1").unwrap_err();
        assert!(matches!(error, Error::Validation { field: "segment_id", .. }));
    }

    #[test]
    fn test_into_padded_form_pads_to_nineteen_ok() {
        let params = TimeSegmentParams::builder()
            .segment_id(1)
            .batt_mode(BatteryMode::GridFirst)
            .start(time(8, 0))
            .end(time(16, 0))
            .build();
        let encoded = encode(&params.into(), DeviceType::MinTlx, "time_segment1").unwrap();
        let form = encoded.into_padded_form("tlx_sn", "SERIAL", 19);
        assert_eq!(form.len(), 2 + 19);
        assert_eq!(form[0], ("tlx_sn".to_string(), "SERIAL".to_string()));
        assert_eq!(form[1], ("type".to_string(), "time_segment1".to_string()));
        assert_eq!(form[2], ("param1".to_string(), "2".to_string()));
        assert_eq!(form[7], ("param6".to_string(), "1".to_string()));
        assert_eq!(form[8], ("param7".to_string(), String::new()));
        assert_eq!(form[20], ("param19".to_string(), String::new()));
    }

    #[test]
    fn test_encode_legacy_schedule_layout_ok() {
        let params = AcChargeScheduleParams::builder()
            .charge_power(100)
            .charge_stop_soc(40)
            .period1(ScheduleWindow::new(time(0, 40), time(4, 30), true))
            .build();
        let encoded = encode(&params.into(), DeviceType::Spa, "spa_ac_charge_time_period").unwrap();
        let Payload::Positional(values) = encoded.payload() else {
            panic!("expected a positional payload");
        };
        assert_eq!(
            values,
            &[
                "100", "40", // power and stop SoC
                "00", "40", "04", "30", "1", // slot 1
                "00", "00", "00", "00", "0", // slot 2
                "00", "00", "00", "00", "0", // slot 3
            ],
        );
    }

    #[test]
    fn test_encode_overlapping_windows_err() {
        let params = AcChargeScheduleParams::builder()
            .charge_power(100)
            .charge_stop_soc(90)
            .period1(ScheduleWindow::new(time(23, 0), time(6, 0), true))
            .period2(ScheduleWindow::new(time(5, 0), time(7, 0), true))
            .build();
        let error =
            encode(&params.into(), DeviceType::MixSph, "mix_ac_discharge_time_period").unwrap_err();
        assert!(matches!(error, Error::Validation { field: "period2", .. }));
    }

    #[test]
    fn test_encode_identical_disabled_windows_ok() {
        let window = ScheduleWindow::new(time(1, 0), time(2, 0), false);
        let params = AcChargeScheduleParams::builder()
            .charge_power(100)
            .charge_stop_soc(90)
            .period1(window)
            .period2(window)
            .build();
        encode(&params.into(), DeviceType::MixSph, "mix_ac_discharge_time_period").unwrap();
    }

    #[test]
    fn test_encode_overlap_allowed_on_spa_ok() {
        let params = AcChargeScheduleParams::builder()
            .charge_power(100)
            .charge_stop_soc(90)
            .period1(ScheduleWindow::new(time(23, 0), time(6, 0), true))
            .period2(ScheduleWindow::new(time(5, 0), time(7, 0), true))
            .build();
        encode(&params.into(), DeviceType::Spa, "spa_ac_charge_time_period").unwrap();
    }

    #[test]
    fn test_encode_on_off_wire_values_ok() {
        let on = encode(
            &PvOnOffParams { enabled: true }.into(),
            DeviceType::MinTlx,
            "tlx_on_off",
        )
        .unwrap();
        assert_eq!(on.payload(), &Payload::Positional(vec!["0001".to_string()]));

        let off = encode(
            &PvOnOffParams { enabled: false }.into(),
            DeviceType::MixSph,
            "mix_on_off",
        )
        .unwrap();
        assert_eq!(off.payload(), &Payload::Named(vec![("onOff", "0000".to_string())]));
    }

    #[test]
    fn test_encode_grid_voltage_order_err() {
        let params = GridVoltageParams { lower_volts: 253.0, upper_volts: 184.0 };
        let error = encode(&params.into(), DeviceType::MinTlx, "pv_grid_voltage").unwrap_err();
        assert!(matches!(error, Error::Validation { field: "upper_volts", .. }));
    }

    #[test]
    fn test_encode_off_grid_frequency_err() {
        let params = OffGridParams::builder().frequency(55).build();
        let error = encode(&params.into(), DeviceType::MinTlx, "tlx_off_grid_enable").unwrap_err();
        assert!(matches!(error, Error::Validation { field: "frequency", .. }));
    }

    #[test]
    fn test_encode_discharge_power_subset_ok() {
        let params = ChargeDischargeParams::builder()
            .charge_power(90)
            .charge_stop_soc(100)
            .discharge_power(80)
            .discharge_stop_soc(10)
            .ac_charge_enabled(true)
            .build();
        let charge = encode(&params.into(), DeviceType::MinTlx, "charge_power").unwrap();
        assert_eq!(
            charge.payload(),
            &Payload::Positional(vec!["90".to_string(), "100".to_string(), "1".to_string()]),
        );
        let discharge = encode(&params.into(), DeviceType::MinTlx, "discharge_power").unwrap();
        assert_eq!(
            discharge.payload(),
            &Payload::Positional(vec!["80".to_string(), "10".to_string()]),
        );
    }

    #[test]
    fn test_supported_commands_closed_set_ok() {
        assert!(supported_commands(DeviceType::MinTlx).contains(&"time_segment9"));
        assert!(!supported_commands(DeviceType::MinTlx).contains(&"spa_on_off"));
        assert_eq!(supported_commands(DeviceType::Spa).count(), 3);
    }
}
