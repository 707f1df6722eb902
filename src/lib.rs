#![doc = include_str!("../README.md")]

pub mod api;
pub mod command;
pub mod device;
pub mod error;
pub mod settings;

pub use self::{
    api::{legacy::LegacyApi, v1::OpenApiV1},
    command::{EncodedCommand, ParameterRequest, Payload, ScheduleWindow, TimeOfDay, encode},
    device::{BatteryMode, Device, DeviceType},
    error::{Error, Result},
};
