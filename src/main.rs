mod cli;
mod tables;

use anyhow::Context;
use clap::{Parser, crate_version};
use growatt_client::{
    LegacyApi, OpenApiV1,
    command::{MixAcChargeTimeParams, TimeSegmentParams},
};
use serde_json::{Map, Value};
use tracing::info;

use crate::cli::{Args, Command, ServerArgs, ServerCommand, V1Args, V1Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::V1(args) => run_v1(*args).await,
        Command::Server(args) => run_server(*args).await,
    }
}

async fn run_v1(args: V1Args) -> anyhow::Result<()> {
    let api = OpenApiV1::with_base_url(&args.connection.token, args.connection.base_url)?;

    match args.command {
        V1Command::Plants => {
            let plants = api.plant_list().await?;
            info!(count = plants.count, "gotcha");
            println!("{}", tables::build_plants_table(&plants.plants));
        }

        V1Command::Devices(plant) => {
            let devices = api.device_list(plant.plant_id).await?;
            info!(count = devices.count, "gotcha");
            println!("{}", tables::build_devices_table(&devices.devices));
        }

        V1Command::Energy(device) => {
            print_json(&api.device_energy(&device.device()).await?)?;
        }

        V1Command::Settings(device) => {
            print_json(&api.device_settings(&device.device()).await?)?;
        }

        V1Command::Segments(device) => {
            let segments = api.time_segments(&device.device(), None).await?;
            println!("{}", tables::build_segments_table(&segments));
        }

        V1Command::ReadParam(args) => {
            let param = args.param()?;
            print_json(&api.read_parameter(&args.device.device(), param).await?)?;
        }

        V1Command::WriteSegment(args) => {
            let params = TimeSegmentParams::builder()
                .segment_id(args.segment_id)
                .batt_mode(args.mode)
                .start(args.start)
                .end(args.end)
                .enabled(!args.disabled)
                .build();
            let response = api.write_time_segment(&args.device.device(), params).await?;
            info!("done");
            print_json(&response)?;
        }

        V1Command::WriteCharge(args) => {
            let params = MixAcChargeTimeParams::builder()
                .charge_power(args.charge_power)
                .charge_stop_soc(args.charge_stop_soc)
                .mains_enabled(!args.no_mains)
                .start(args.start)
                .end(args.end)
                .enabled(!args.disabled)
                .build();
            let response = api
                .write_parameter(
                    &args.device.device(),
                    "mix_ac_charge_time_period",
                    &params.into(),
                )
                .await?;
            info!("done");
            print_json(&response)?;
        }
    }

    Ok(())
}

async fn run_server(args: ServerArgs) -> anyhow::Result<()> {
    let api = LegacyApi::new_with(args.connection.base_url, &args.connection.user_agent)?;
    let session = api.login(&args.connection.username, &args.connection.password).await?;

    match args.command {
        ServerCommand::Plants => {
            let plants = api.plant_list(session.user_id).await?;
            println!("{}", tables::build_legacy_plants_table(&plants.data));
            print_json(&plants.totals)?;
        }

        ServerCommand::Dashboard(dashboard) => {
            let plant_id = match dashboard.plant_id {
                Some(plant_id) => plant_id,
                None => api
                    .plant_list(session.user_id)
                    .await?
                    .data
                    .first()
                    .map(|plant| plant.id.clone())
                    .context("the account has no plants")?,
            };
            print_json(&api.plant_info(&plant_id).await?)?;
        }

        ServerCommand::MixStatus(mix) => {
            print_json(&api.mix_system_status(&mix.serial_number, &mix.plant_id).await?)?;
            print_json(&api.mix_totals(&mix.serial_number, &mix.plant_id).await?)?;
        }
    }

    api.logout().await?;
    Ok(())
}

fn print_json(map: &Map<String, Value>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(map)?);
    Ok(())
}
