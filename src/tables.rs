use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use growatt_client::{
    Device,
    api::{legacy::LegacyPlant, v1::PlantSummary},
    settings::TimeSegment,
};
use serde_json::Value;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

pub fn build_plants_table(plants: &[PlantSummary]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Id", "Name", "Location", "Peak", "Now", "Total"]);
    for plant in plants {
        table.add_row(vec![
            Cell::new(plant.id).add_attribute(Attribute::Dim),
            Cell::new(plant.name.as_deref().unwrap_or("")),
            Cell::new(location(plant)).add_attribute(Attribute::Dim),
            Cell::new(value_text(plant.peak_power.as_ref())).set_alignment(CellAlignment::Right),
            Cell::new(value_text(plant.current_power.as_ref()))
                .set_alignment(CellAlignment::Right),
            Cell::new(value_text(plant.total_energy.as_ref())).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn build_legacy_plants_table(plants: &[LegacyPlant]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Id", "Name", "Today", "Total", "Now"]);
    for plant in plants {
        table.add_row(vec![
            Cell::new(&plant.id).add_attribute(Attribute::Dim),
            Cell::new(&plant.name),
            Cell::new(value_text(plant.today_energy.as_ref())).set_alignment(CellAlignment::Right),
            Cell::new(value_text(plant.total_energy.as_ref())).set_alignment(CellAlignment::Right),
            Cell::new(value_text(plant.current_power.as_ref()))
                .set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn build_devices_table(devices: &[Device]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Serial", "Type", "Model", "Status", "Updated"]);
    for device in devices {
        let type_cell = match device.device_type() {
            Some(device_type) => Cell::new(device_type).fg(device_type.color()),
            None => Cell::new(format!("code {}", device.type_code)),
        };
        table.add_row(vec![
            Cell::new(&device.serial_number),
            type_cell,
            Cell::new(device.model.as_deref().unwrap_or("")),
            Cell::new(device.status.map(|status| status.to_string()).unwrap_or_default()),
            Cell::new(device.last_updated_at.as_deref().unwrap_or(""))
                .add_attribute(Attribute::Dim),
        ]);
    }
    table
}

pub fn build_segments_table(segments: &[TimeSegment]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["#", "Mode", "Start", "End", "Enabled"]);
    for segment in segments {
        let mode_cell = match segment.batt_mode {
            Some(mode) => Cell::new(mode).fg(mode.color()),
            None => Cell::new(segment.mode_name()).add_attribute(Attribute::Dim),
        };
        table.add_row(vec![
            Cell::new(segment.segment_id).add_attribute(Attribute::Dim),
            mode_cell,
            Cell::new(segment.start),
            Cell::new(segment.end),
            if segment.enabled {
                Cell::new("yes").fg(Color::Green)
            } else {
                Cell::new("no").add_attribute(Attribute::Dim)
            },
        ]);
    }
    table
}

fn location(plant: &PlantSummary) -> String {
    match (plant.city.as_deref(), plant.country.as_deref()) {
        (Some(city), Some(country)) => format!("{city}, {country}"),
        (Some(location), None) | (None, Some(location)) => location.to_string(),
        (None, None) => String::new(),
    }
}

/// The server switches between JSON numbers and quoted strings; render both
/// without the quotes.
fn value_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(value) => value.to_string(),
        None => String::new(),
    }
}
