use clap::{Parser, Subcommand};
use growatt_client::{BatteryMode, Device, DeviceType, TimeOfDay, api::v1::ReadParam};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Call the token-authenticated OpenApiV1 endpoints.
    #[clap(name = "v1")]
    V1(Box<V1Args>),

    /// Call the legacy session-cookie web API.
    #[clap(name = "server")]
    Server(Box<ServerArgs>),
}

#[derive(Parser)]
pub struct V1Args {
    #[clap(flatten)]
    pub connection: V1ConnectionArgs,

    #[command(subcommand)]
    pub command: V1Command,
}

#[derive(Parser)]
pub struct V1ConnectionArgs {
    /// OpenApiV1 access token.
    #[clap(long, env = "GROWATT_TOKEN", hide_env_values = true)]
    pub token: String,

    #[clap(
        long = "base-url",
        env = "GROWATT_BASE_URL",
        default_value = growatt_client::api::v1::DEFAULT_BASE_URL
    )]
    pub base_url: String,
}

#[derive(Subcommand)]
pub enum V1Command {
    /// List the plants of the account with their totals.
    Plants,

    /// List the devices of a plant.
    Devices(PlantArgs),

    /// Print the latest energy readings of a device.
    Energy(DeviceArgs),

    /// Print the settings registers of a device.
    Settings(DeviceArgs),

    /// Print the time-of-use segments of a device.
    Segments(DeviceArgs),

    /// Read a single holding parameter.
    ReadParam(ReadParamArgs),

    /// Write one time-of-use segment.
    WriteSegment(WriteSegmentArgs),

    /// Write the AC charge time period of a MIX/SPH hybrid.
    WriteCharge(WriteChargeArgs),
}

#[derive(Parser)]
pub struct PlantArgs {
    #[clap(long = "plant-id", env = "GROWATT_PLANT_ID")]
    pub plant_id: u64,
}

#[derive(Parser)]
pub struct DeviceArgs {
    /// Device serial number.
    #[clap(long, alias = "serial", env = "GROWATT_SERIAL_NUMBER")]
    pub serial_number: String,

    /// Device family: `mix`, `tlx` or `spa`.
    #[clap(long = "device-type", env = "GROWATT_DEVICE_TYPE", value_parser = parse_device_type)]
    pub device_type: DeviceType,

    #[clap(long = "plant-id", env = "GROWATT_PLANT_ID", default_value_t = 0)]
    pub plant_id: u64,
}

impl DeviceArgs {
    pub fn device(&self) -> Device {
        Device::new(&self.serial_number, self.device_type, self.plant_id)
    }
}

#[derive(Parser)]
pub struct ReadParamArgs {
    #[clap(flatten)]
    pub device: DeviceArgs,

    /// Named parameter id, for example `discharge_power`.
    #[clap(long = "param-id", conflicts_with_all = ["start_address", "end_address"])]
    pub param_id: Option<String>,

    /// First holding register to read.
    #[clap(long = "start-addr", requires = "end_address")]
    pub start_address: Option<u16>,

    /// Last holding register to read.
    #[clap(long = "end-addr", requires = "start_address")]
    pub end_address: Option<u16>,
}

impl ReadParamArgs {
    pub fn param(&self) -> anyhow::Result<ReadParam<'_>> {
        match (&self.param_id, self.start_address, self.end_address) {
            (Some(param_id), None, None) => Ok(ReadParam::Named(param_id)),
            (None, Some(start), Some(end)) => Ok(ReadParam::Registers { start, end }),
            _ => anyhow::bail!("specify either --param-id or --start-addr/--end-addr"),
        }
    }
}

#[derive(Parser)]
pub struct WriteSegmentArgs {
    #[clap(flatten)]
    pub device: DeviceArgs,

    /// Segment number, 1 through 9.
    #[clap(long = "segment-id")]
    pub segment_id: u8,

    /// Battery mode: `load-first`, `battery-first` or `grid-first`.
    #[clap(long, value_parser = parse_battery_mode)]
    pub mode: BatteryMode,

    /// Start time as `HH:MM`.
    #[clap(long, value_parser = parse_time_of_day)]
    pub start: TimeOfDay,

    /// End time as `HH:MM`.
    #[clap(long, value_parser = parse_time_of_day)]
    pub end: TimeOfDay,

    /// Write the segment disabled.
    #[clap(long)]
    pub disabled: bool,
}

#[derive(Parser)]
pub struct WriteChargeArgs {
    #[clap(flatten)]
    pub device: DeviceArgs,

    /// Charging power limit in percent.
    #[clap(long = "charge-power")]
    pub charge_power: u8,

    /// Stop charging at this state of charge, in percent.
    #[clap(long = "stop-soc")]
    pub charge_stop_soc: u8,

    /// Start time as `HH:MM`.
    #[clap(long, value_parser = parse_time_of_day)]
    pub start: TimeOfDay,

    /// End time as `HH:MM`.
    #[clap(long, value_parser = parse_time_of_day)]
    pub end: TimeOfDay,

    /// Do not charge from the mains.
    #[clap(long = "no-mains")]
    pub no_mains: bool,

    /// Write the period disabled.
    #[clap(long)]
    pub disabled: bool,
}

#[derive(Parser)]
pub struct ServerArgs {
    #[clap(flatten)]
    pub connection: ServerConnectionArgs,

    #[command(subcommand)]
    pub command: ServerCommand,
}

#[derive(Parser)]
pub struct ServerConnectionArgs {
    #[clap(long, env = "GROWATT_USERNAME")]
    pub username: String,

    #[clap(long, env = "GROWATT_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[clap(
        long = "base-url",
        env = "GROWATT_SERVER_URL",
        default_value = growatt_client::api::legacy::DEFAULT_BASE_URL
    )]
    pub base_url: String,

    /// Present as the mobile app; some server farms insist on it.
    #[clap(
        long = "user-agent",
        env = "GROWATT_USER_AGENT",
        default_value = "ShinePhone/8.1.17 (iPhone; iOS 15.6.1; Scale/2.00)"
    )]
    pub user_agent: String,
}

#[derive(Subcommand)]
pub enum ServerCommand {
    /// List the plants of the account.
    Plants,

    /// Print the plant overview with its device list.
    Dashboard(DashboardArgs),

    /// Print live status and energy totals of a MIX/SPH system.
    MixStatus(MixArgs),
}

#[derive(Parser)]
pub struct DashboardArgs {
    /// Plant id; defaults to the first plant of the account.
    #[clap(long = "plant-id")]
    pub plant_id: Option<String>,
}

#[derive(Parser)]
pub struct MixArgs {
    #[clap(long, alias = "serial", env = "GROWATT_SERIAL_NUMBER")]
    pub serial_number: String,

    #[clap(long = "plant-id", env = "GROWATT_PLANT_ID")]
    pub plant_id: String,
}

fn parse_device_type(value: &str) -> Result<DeviceType, String> {
    DeviceType::from_tag(value)
        .ok_or_else(|| format!("unknown device type `{value}` (expected `mix`, `tlx` or `spa`)"))
}

fn parse_battery_mode(value: &str) -> Result<BatteryMode, String> {
    match value {
        "load-first" | "0" => Ok(BatteryMode::LoadFirst),
        "battery-first" | "1" => Ok(BatteryMode::BatteryFirst),
        "grid-first" | "2" => Ok(BatteryMode::GridFirst),
        _ => Err(format!("unknown battery mode `{value}`")),
    }
}

fn parse_time_of_day(value: &str) -> Result<TimeOfDay, String> {
    let (hour, minute) =
        value.split_once(':').ok_or_else(|| format!("expected `HH:MM`, got `{value}`"))?;
    let hour = hour.parse().map_err(|_| format!("`{hour}` is not an hour"))?;
    let minute = minute.parse().map_err(|_| format!("`{minute}` is not a minute"))?;
    TimeOfDay::try_new(hour, minute).map_err(|error| error.to_string())
}
