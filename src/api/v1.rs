//! Client for the token-authenticated OpenApiV1 REST API.

mod models;

use std::time::Duration;

use bon::Builder;
use chrono::{Datelike, Local, NaiveDate};
use http::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::{info, instrument, trace, warn};

pub use self::models::{DeviceList, PlantList, PlantSummary};
use crate::{
    api::response::V1Response,
    command::{ParameterRequest, TimeSegmentParams, encode},
    device::{DataKind, Device, DeviceType},
    error::{Error, Result},
    settings::{self, TimeSegment},
};

pub const DEFAULT_BASE_URL: &str = "https://openapi.growatt.com/v1/";

const USER_AGENT: &str = concat!("growatt-client/", env!("CARGO_PKG_VERSION"));

/// The `tlxSet` endpoint rejects requests that do not carry all 19
/// positional parameters, empty or not.
const TLX_SET_PARAM_COUNT: usize = 19;

pub struct OpenApiV1 {
    client: Client,
    base_url: String,
}

impl OpenApiV1 {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(token: &str, base_url: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.append("token", HeaderValue::from_str(token)?);
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(15))
            .default_headers(headers)
            .build()?;
        Ok(Self { client, base_url: base_url.into() })
    }

    /// Lists the plants of the account with their aggregate totals.
    #[instrument(skip_all)]
    pub async fn plant_list(&self) -> Result<PlantList> {
        info!("fetching the plant list…");
        self.get("plant/list", &()).await
    }

    /// Basic information about one power station.
    #[instrument(skip_all, fields(plant_id = plant_id))]
    pub async fn plant_details(&self, plant_id: u64) -> Result<Map<String, Value>> {
        self.get("plant/details", &PlantQuery { plant_id }).await
    }

    /// Energy overview of one power station.
    #[instrument(skip_all, fields(plant_id = plant_id))]
    pub async fn plant_energy_overview(&self, plant_id: u64) -> Result<Map<String, Value>> {
        self.get("plant/data", &PlantQuery { plant_id }).await
    }

    /// Power readings of one day, sampled every five minutes.
    #[instrument(skip_all, fields(plant_id = plant_id, day = %day))]
    pub async fn plant_power(&self, plant_id: u64, day: NaiveDate) -> Result<Map<String, Value>> {
        #[derive(Serialize)]
        struct Query {
            plant_id: u64,
            date: String,
        }

        self.get("plant/power", &Query { plant_id, date: format_date(day) }).await
    }

    /// Plant energy totals over a day/month/year range.
    ///
    /// The server documents range limits per time unit but does not always
    /// enforce them; out-of-range requests are logged and sent as-is.
    #[instrument(skip_all, fields(plant_id = plant_id))]
    pub async fn plant_energy_history(
        &self,
        plant_id: u64,
        params: &PlantEnergyHistoryParams,
    ) -> Result<Map<String, Value>> {
        #[derive(Serialize)]
        struct Query {
            plant_id: u64,
            start_date: String,
            end_date: String,
            time_unit: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            page: Option<u32>,
            #[serde(skip_serializing_if = "Option::is_none")]
            perpage: Option<u32>,
        }

        let (start_date, end_date) = resolve_dates(params.start_date, params.end_date);
        match params.time_unit {
            TimeUnit::Day if (end_date - start_date).num_days() > 7 => {
                warn!("the date interval should not exceed 7 days in day mode");
            }
            TimeUnit::Month if end_date.year() - start_date.year() > 1 => {
                warn!("the start date should be within the same or previous year in month mode");
            }
            TimeUnit::Year if end_date.year() - start_date.year() > 20 => {
                warn!("the date interval should not exceed 20 years in year mode");
            }
            _ => {}
        }

        self.get(
            "plant/energy",
            &Query {
                plant_id,
                start_date: format_date(start_date),
                end_date: format_date(end_date),
                time_unit: params.time_unit.as_str(),
                page: params.page,
                perpage: params.per_page,
            },
        )
        .await
    }

    /// Lists the devices of a plant, each stamped with the owning plant id.
    #[instrument(skip_all, fields(plant_id = plant_id))]
    pub async fn device_list(&self, plant_id: u64) -> Result<DeviceList> {
        let mut list: DeviceList = self.get("device/list", &PlantQuery { plant_id }).await?;
        for device in &mut list.devices {
            device.plant_id = plant_id;
        }
        Ok(list)
    }

    /// Detailed data of one device.
    #[instrument(skip_all, fields(serial_number = %device.serial_number))]
    pub async fn device_details(&self, device: &Device) -> Result<Map<String, Value>> {
        let device_type = device.require_type()?;
        let data = self
            .get(
                device_type.require_v1_endpoint(DataKind::BasicInfo)?,
                &DeviceQuery { device_sn: &device.serial_number },
            )
            .await?;
        Ok(settings::canonicalize(data, device_type))
    }

    /// The latest energy readings of one device.
    #[instrument(skip_all, fields(serial_number = %device.serial_number))]
    pub async fn device_energy(&self, device: &Device) -> Result<Map<String, Value>> {
        let device_type = device.require_type()?;
        let form = [(format!("{}_sn", device_type.tag()), device.serial_number.clone())];
        let data = self
            .post_form(device_type.require_v1_endpoint(DataKind::LastData)?, &form)
            .await?;
        Ok(settings::canonicalize(data, device_type))
    }

    /// The writable settings of one device.
    #[instrument(skip_all, fields(serial_number = %device.serial_number))]
    pub async fn device_settings(&self, device: &Device) -> Result<Map<String, Value>> {
        let device_type = device.require_type()?;
        let data = self
            .get(
                device_type.require_v1_endpoint(DataKind::Settings)?,
                &DeviceQuery { device_sn: &device.serial_number },
            )
            .await?;
        Ok(settings::canonicalize(data, device_type))
    }

    /// Historical energy data of one device. The interval must not exceed
    /// 7 days, which the server enforces too.
    #[instrument(skip_all, fields(serial_number = %device.serial_number))]
    pub async fn device_energy_history(
        &self,
        device: &Device,
        params: &DeviceEnergyHistoryParams,
    ) -> Result<Map<String, Value>> {
        let device_type = device.require_type()?;
        let (start_date, end_date) = resolve_dates(params.start_date, params.end_date);
        if (end_date - start_date).num_days() > 7 {
            return Err(Error::validation("end_date", "date interval must not exceed 7 days"));
        }

        let mut form = vec![
            (format!("{}_sn", device_type.tag()), device.serial_number.clone()),
            ("start_date".to_string(), format_date(start_date)),
            ("end_date".to_string(), format_date(end_date)),
        ];
        if let Some(timezone) = &params.timezone {
            form.push(("timezone_id".to_string(), timezone.clone()));
        }
        if let Some(page) = params.page {
            form.push(("page".to_string(), page.to_string()));
        }
        if let Some(limit) = params.limit {
            form.push(("perpage".to_string(), limit.to_string()));
        }

        let data = self
            .post_form(device_type.require_v1_endpoint(DataKind::HistoryData)?, &form)
            .await?;
        Ok(settings::canonicalize(data, device_type))
    }

    /// Reads a holding parameter, either by its id or by register range.
    #[instrument(skip_all, fields(serial_number = %device.serial_number))]
    pub async fn read_parameter(
        &self,
        device: &Device,
        param: ReadParam<'_>,
    ) -> Result<Map<String, Value>> {
        #[derive(Serialize)]
        struct Form<'a> {
            device_sn: &'a str,
            #[serde(rename = "paramId")]
            param_id: &'a str,
            #[serde(rename = "startAddr")]
            start_address: u16,
            #[serde(rename = "endAddr")]
            end_address: u16,
        }

        let device_type = device.require_type()?;
        let (param_id, start_address, end_address) = match param {
            ReadParam::Named(id) => (id, 0, 0),
            ReadParam::Registers { start, end } => ("set_any_reg", start, end),
        };
        self.post_form(
            device_type.require_v1_endpoint(DataKind::ReadParam)?,
            &Form { device_sn: &device.serial_number, param_id, start_address, end_address },
        )
        .await
    }

    /// Encodes and writes a configuration parameter.
    ///
    /// Encoding failures (unknown command, constraint violations) surface
    /// before any request is sent. SPA devices cannot be written through the
    /// V1 API at all.
    #[instrument(skip_all, fields(serial_number = %device.serial_number, command = command))]
    pub async fn write_parameter(
        &self,
        device: &Device,
        command: &str,
        request: &ParameterRequest,
    ) -> Result<Map<String, Value>> {
        let device_type = device.require_type()?;
        let encoded = encode(request, device_type, command)?;
        let (path, pad_to) = match device_type {
            DeviceType::MinTlx => ("tlxSet", TLX_SET_PARAM_COUNT),
            DeviceType::MixSph => ("mixSet", 0),
            DeviceType::Spa => {
                return Err(Error::Configuration {
                    command: command.to_string(),
                    device_type,
                });
            }
        };
        info!("writing…");
        let serial_field = format!("{}_sn", device_type.tag());
        let form = encoded.into_padded_form(&serial_field, &device.serial_number, pad_to);
        self.post_form(path, &form).await
    }

    /// Writes one time-of-use segment; the command name is derived from the
    /// segment id.
    #[instrument(skip_all, fields(serial_number = %device.serial_number))]
    pub async fn write_time_segment(
        &self,
        device: &Device,
        params: TimeSegmentParams,
    ) -> Result<Map<String, Value>> {
        if !(1..=9).contains(&params.segment_id) {
            return Err(Error::validation("segment_id", "must be between 1 and 9"));
        }
        let command = format!("time_segment{}", params.segment_id);
        self.write_parameter(device, &command, &ParameterRequest::TimeSegment(params)).await
    }

    /// Parses the nine time-of-use segments of a device.
    ///
    /// Pass `cached_settings` from an earlier [`Self::device_settings`] call
    /// to spare the endpoint rate limit.
    #[instrument(skip_all, fields(serial_number = %device.serial_number))]
    pub async fn time_segments(
        &self,
        device: &Device,
        cached_settings: Option<&Map<String, Value>>,
    ) -> Result<Vec<TimeSegment>> {
        let device_type = device.require_type()?;
        match cached_settings {
            Some(cached) => Ok(settings::time_segments(cached, device_type)),
            None => {
                let fetched = self.device_settings(device).await?;
                Ok(settings::time_segments(&fetched, device_type))
            }
        }
    }

    async fn get<Q, D>(&self, path: &str, query: &Q) -> Result<D>
    where
        Q: Serialize,
        D: DeserializeOwned + Default,
    {
        let text = self
            .client
            .get(format!("{}{path}", self.base_url))
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        trace!(path = path, response = text.as_str(), "received");
        serde_json::from_str::<V1Response<D>>(&text)?.into()
    }

    async fn post_form<F, D>(&self, path: &str, form: &F) -> Result<D>
    where
        F: Serialize,
        D: DeserializeOwned + Default,
    {
        let text = self
            .client
            .post(format!("{}{path}", self.base_url))
            .form(form)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        trace!(path = path, response = text.as_str(), "received");
        serde_json::from_str::<V1Response<D>>(&text)?.into()
    }
}

#[derive(Serialize)]
struct PlantQuery {
    plant_id: u64,
}

#[derive(Serialize)]
struct DeviceQuery<'a> {
    device_sn: &'a str,
}

/// Parameter read addressing: a named parameter id, or a raw holding
/// register range (the `set_any_reg` mode). The two are mutually exclusive
/// by construction.
#[derive(Copy, Clone, Debug)]
pub enum ReadParam<'a> {
    Named(&'a str),
    Registers { start: u16, end: u16 },
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum TimeUnit {
    #[default]
    Day,
    Month,
    Year,
}

impl TimeUnit {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

#[derive(Clone, Debug, Default, Builder)]
pub struct PlantEnergyHistoryParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[builder(default)]
    pub time_unit: TimeUnit,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Clone, Debug, Default, Builder)]
pub struct DeviceEnergyHistoryParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub timezone: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Missing bounds collapse onto the other one, or onto today.
fn resolve_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> (NaiveDate, NaiveDate) {
    match (start, end) {
        (Some(start), Some(end)) => (start, end),
        (Some(start), None) => (start, start),
        (None, Some(end)) => (end, end),
        (None, None) => {
            let today = Local::now().date_naive();
            (today, today)
        }
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_dates_prefers_given_bounds_ok() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        assert_eq!(resolve_dates(Some(start), Some(end)), (start, end));
        assert_eq!(resolve_dates(Some(start), None), (start, start));
        assert_eq!(resolve_dates(None, Some(end)), (end, end));
    }

    #[test]
    fn test_time_unit_wire_names_ok() {
        assert_eq!(TimeUnit::Day.as_str(), "day");
        assert_eq!(TimeUnit::Month.as_str(), "month");
        assert_eq!(TimeUnit::Year.as_str(), "year");
    }
}
