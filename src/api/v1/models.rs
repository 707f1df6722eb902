use serde::Deserialize;
use serde_json::Value;

use crate::device::Device;

#[derive(Default, Deserialize)]
pub struct PlantList {
    #[serde(default)]
    pub count: u64,

    #[serde(default)]
    pub plants: Vec<PlantSummary>,
}

/// One power station as the `plant/list` endpoint reports it.
///
/// Numeric-looking fields stay [`Value`]: the server switches between JSON
/// numbers and quoted strings depending on the firmware behind the plant.
#[derive(Deserialize)]
pub struct PlantSummary {
    #[serde(rename = "plant_id")]
    pub id: u64,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub country: Option<String>,

    #[serde(default)]
    pub city: Option<String>,

    #[serde(default)]
    pub status: Option<i64>,

    #[serde(default)]
    pub peak_power: Option<Value>,

    #[serde(default)]
    pub current_power: Option<Value>,

    #[serde(default)]
    pub total_energy: Option<Value>,
}

#[derive(Default, Deserialize)]
pub struct DeviceList {
    #[serde(default)]
    pub count: u64,

    #[serde(default)]
    pub devices: Vec<Device>,
}
