//! Client for the legacy session-cookie web API, the one the ShinePhone app
//! talks to.
//!
//! Authentication is a cookie-backed login with the vendor's peculiar
//! password digest. Responses come in several envelope flavors (`back`,
//! `obj`, bare objects with a `success` flag), unwrapped per endpoint.

use std::time::Duration;

use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::{info, instrument, trace};

use crate::{
    command::{ParameterRequest, TimeSegmentParams, encode},
    device::DeviceType,
    error::{Error, Result},
    settings,
};

pub const DEFAULT_BASE_URL: &str = "https://server.growatt.com/";

const USER_AGENT: &str = concat!("growatt-client/", env!("CARGO_PKG_VERSION"));

pub struct LegacyApi {
    client: Client,
    base_url: String,
}

impl LegacyApi {
    pub fn new() -> Result<Self> {
        Self::new_with(DEFAULT_BASE_URL, USER_AGENT)
    }

    /// Some server farms only accept requests that look like the mobile app,
    /// hence the overridable user agent.
    pub fn new_with(base_url: impl Into<String>, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, base_url: base_url.into() })
    }

    /// Logs in and stores the session cookies on the client.
    #[instrument(skip_all, fields(username = username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<UserSession> {
        #[derive(serde::Deserialize)]
        struct Body {
            back: Back,
        }

        #[derive(serde::Deserialize)]
        struct Back {
            #[serde(default)]
            success: bool,
            #[serde(default)]
            msg: Option<String>,
            #[serde(default)]
            user: Option<Map<String, Value>>,
        }

        info!("logging in…");
        let form =
            [("userName", username.to_string()), ("password", hash_password(password))];
        let body: Body = self.post_form("newTwoLoginAPI.do", &form).await?;
        if !body.back.success {
            return Err(Error::Api {
                code: None,
                message: body.back.msg.unwrap_or_else(|| "login failed".to_string()),
            });
        }
        let user = body.back.user.unwrap_or_default();
        let user_id = user.get("id").and_then(as_i64).ok_or_else(|| Error::Api {
            code: None,
            message: "the login response did not include a user id".to_string(),
        })?;
        Ok(UserSession { user_id, user })
    }

    #[instrument(skip_all)]
    pub async fn logout(&self) -> Result {
        self.client
            .get(format!("{}logout.do", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Lists the plants of a user together with the account-wide totals.
    #[instrument(skip_all, fields(user_id = user_id))]
    pub async fn plant_list(&self, user_id: i64) -> Result<LegacyPlantList> {
        #[derive(serde::Deserialize)]
        struct Body {
            back: LegacyPlantList,
        }

        let body: Body = self
            .get("PlantListAPI.do", &[("userId", user_id.to_string())])
            .await?;
        Ok(body.back)
    }

    /// Plant overview including its device list.
    #[instrument(skip_all, fields(plant_id = plant_id))]
    pub async fn plant_info(&self, plant_id: &str) -> Result<Map<String, Value>> {
        self.get(
            "newTwoPlantAPI.do",
            &[
                ("op", "getAllDeviceListTwo"),
                ("plantId", plant_id),
                ("pageNum", "1"),
                ("pageSize", "1"),
            ],
        )
        .await
    }

    /// The devices of a plant, parsed out of [`Self::plant_info`].
    #[instrument(skip_all, fields(plant_id = plant_id))]
    pub async fn device_list(&self, plant_id: &str) -> Result<Vec<LegacyDevice>> {
        let info = self.plant_info(plant_id).await?;
        let devices = info.get("deviceList").cloned().unwrap_or(Value::Array(Vec::new()));
        Ok(serde_json::from_value(devices)?)
    }

    /// Static information about a MIX/SPH inverter.
    #[instrument(skip_all, fields(serial_number = mix_sn))]
    pub async fn mix_info(&self, mix_sn: &str) -> Result<Map<String, Value>> {
        let data = self
            .get_obj("newMixApi.do", &[("op", "getMixInfo"), ("mixId", mix_sn)])
            .await?;
        Ok(settings::canonicalize(data, DeviceType::MixSph))
    }

    /// Lifetime and daily energy totals of a MIX/SPH system.
    #[instrument(skip_all, fields(serial_number = mix_sn, plant_id = plant_id))]
    pub async fn mix_totals(&self, mix_sn: &str, plant_id: &str) -> Result<Map<String, Value>> {
        let data = self
            .get_obj(
                "newMixApi.do",
                &[("op", "getEnergyOverview"), ("mixId", mix_sn), ("plantId", plant_id)],
            )
            .await?;
        Ok(settings::canonicalize(data, DeviceType::MixSph))
    }

    /// Live power flows of a MIX/SPH system, in kilowatts.
    #[instrument(skip_all, fields(serial_number = mix_sn, plant_id = plant_id))]
    pub async fn mix_system_status(
        &self,
        mix_sn: &str,
        plant_id: &str,
    ) -> Result<Map<String, Value>> {
        let data = self
            .get_obj(
                "newMixApi.do",
                &[("op", "getSystemStatus_KW"), ("mixId", mix_sn), ("plantId", plant_id)],
            )
            .await?;
        Ok(settings::canonicalize(data, DeviceType::MixSph))
    }

    /// The full settings register set of a MIN/TLX inverter.
    #[instrument(skip_all, fields(serial_number = tlx_sn))]
    pub async fn tlx_all_settings(&self, tlx_sn: &str) -> Result<Map<String, Value>> {
        #[derive(Default, serde::Deserialize)]
        struct SetData {
            #[serde(default, rename = "tlxSetBean")]
            tlx_set_bean: Map<String, Value>,
        }

        let data: SetData = self
            .get_obj("newTlxApi.do", &[("op", "getTlxSetData"), ("serialNum", tlx_sn)])
            .await?;
        Ok(settings::canonicalize(data.tlx_set_bean, DeviceType::MinTlx))
    }

    /// Which settings the inverter actually supports; the counterpart of
    /// [`Self::tlx_all_settings`] for building a settings UI.
    #[instrument(skip_all, fields(serial_number = tlx_sn))]
    pub async fn tlx_enabled_settings(&self, tlx_sn: &str) -> Result<Map<String, Value>> {
        self.get_obj("newTlxApi.do", &[("op", "getTlxSetEnable"), ("serialNum", tlx_sn)])
            .await
    }

    /// Encodes and writes a configuration parameter through the legacy
    /// settings endpoint of the device type.
    #[instrument(skip_all, fields(serial_number = serial_number, command = command))]
    pub async fn update_inverter_setting(
        &self,
        device_type: DeviceType,
        serial_number: &str,
        command: &str,
        request: &ParameterRequest,
    ) -> Result<Map<String, Value>> {
        let encoded = encode(request, device_type, command)?;
        let path = match device_type {
            DeviceType::MinTlx => "newTlxSetApi.do",
            DeviceType::MixSph => "newMixSetApi.do",
            DeviceType::Spa => "newSpaSetApi.do",
        };
        info!("writing…");
        let form = encoded.into_form("serialNum", serial_number);
        let body: Map<String, Value> = self.post_form(path, &form).await?;
        check_success(&body)?;
        Ok(body)
    }

    /// Writes one time-of-use segment of a MIN/TLX inverter.
    #[instrument(skip_all, fields(serial_number = serial_number))]
    pub async fn update_tlx_time_segment(
        &self,
        serial_number: &str,
        params: TimeSegmentParams,
    ) -> Result<Map<String, Value>> {
        if !(1..=9).contains(&params.segment_id) {
            return Err(Error::validation("segment_id", "must be between 1 and 9"));
        }
        let command = format!("time_segment{}", params.segment_id);
        self.update_inverter_setting(
            DeviceType::MinTlx,
            serial_number,
            &command,
            &ParameterRequest::TimeSegment(params),
        )
        .await
    }

    /// GET with the `obj` envelope most `new*Api.do` operations use.
    async fn get_obj<Q, D>(&self, path: &str, query: &Q) -> Result<D>
    where
        Q: Serialize,
        D: DeserializeOwned + Default,
    {
        #[derive(serde::Deserialize)]
        #[serde(bound = "D: DeserializeOwned + Default")]
        struct Envelope<D> {
            #[serde(default)]
            obj: D,
        }

        let envelope: Envelope<D> = self.get(path, query).await?;
        Ok(envelope.obj)
    }

    async fn get<Q, D>(&self, path: &str, query: &Q) -> Result<D>
    where
        Q: Serialize,
        D: DeserializeOwned,
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
        Ok(serde_json::from_str(&text)?)
    }

    async fn post_form<F, D>(&self, path: &str, form: &F) -> Result<D>
    where
        F: Serialize,
        D: DeserializeOwned,
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
        Ok(serde_json::from_str(&text)?)
    }
}

/// A logged-in user. The session itself lives in the client's cookie store;
/// this only carries what the login response reported.
#[derive(Clone, Debug)]
pub struct UserSession {
    pub user_id: i64,
    pub user: Map<String, Value>,
}

#[derive(Default, serde::Deserialize)]
pub struct LegacyPlantList {
    #[serde(default, rename = "totalData")]
    pub totals: Map<String, Value>,

    #[serde(default)]
    pub data: Vec<LegacyPlant>,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct LegacyPlant {
    #[serde(rename = "plantId")]
    pub id: String,

    #[serde(rename = "plantName")]
    pub name: String,

    #[serde(default, rename = "totalEnergy")]
    pub total_energy: Option<Value>,

    #[serde(default, rename = "currentPower")]
    pub current_power: Option<Value>,

    #[serde(default, rename = "todayEnergy")]
    pub today_energy: Option<Value>,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct LegacyDevice {
    #[serde(rename = "deviceSn")]
    pub serial_number: String,

    #[serde(rename = "deviceType")]
    pub type_tag: String,

    /// Sic, the server misspells "alias".
    #[serde(default, rename = "deviceAilas")]
    pub alias: Option<String>,
}

impl LegacyDevice {
    pub fn device_type(&self) -> Option<DeviceType> {
        DeviceType::from_tag(&self.type_tag)
    }
}

/// The vendor's password digest: an md5 hex string with every `0` at an even
/// position replaced by `c`.
fn hash_password(password: &str) -> String {
    format!("{:x}", md5::compute(password.as_bytes()))
        .bytes()
        .enumerate()
        .map(|(position, byte)| {
            if byte == b'0' && position % 2 == 0 { 'c' } else { char::from(byte) }
        })
        .collect()
}

/// Settings writes answer with a bare object carrying a `success` flag.
fn check_success(body: &Map<String, Value>) -> Result {
    let success = match body.get("success") {
        Some(Value::Bool(success)) => *success,
        Some(Value::String(success)) => success == "true",
        _ => false,
    };
    if success {
        return Ok(());
    }
    Err(Error::Api {
        code: body.get("error").and_then(as_i64),
        message: body
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("the server reported a failure")
            .to_string(),
    })
}

/// Ids come back as numbers or digit strings, depending on the endpoint.
fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(string) => string.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_hash_password_ok() {
        // md5("password") = 5f4dcc3b5aa765d61d8327deb882cf99: no zeros, the
        // digest stays intact.
        assert_eq!(hash_password("password"), "5f4dcc3b5aa765d61d8327deb882cf99");
        // md5("growatt") = 6c649d2d285d62d30306182ed6863920: the zeros at
        // even positions 16 and 18 become `c`, the one at odd position 31
        // stays.
        assert_eq!(hash_password("growatt"), "6c649d2d285d62d3c3c6182ed6863920");
    }

    #[test]
    fn test_check_success_ok() {
        let Value::Object(body) = json!({"success": true, "msg": "time_segment1"}) else {
            unreachable!()
        };
        check_success(&body).unwrap();
    }

    #[test]
    fn test_check_success_err() {
        let Value::Object(body) = json!({"success": false, "msg": "504"}) else {
            unreachable!()
        };
        let error = check_success(&body).unwrap_err();
        match error {
            Error::Api { code: None, message } => assert_eq!(message, "504"),
            other => panic!("expected an API error, got {other:?}"),
        }
    }

    #[test]
    fn test_legacy_device_type_tag_ok() {
        let device: LegacyDevice = serde_json::from_value(json!({
            "deviceSn": "SARN601MFC",
            "deviceType": "mix",
            "deviceAilas": "Garage",
        }))
        .unwrap();
        assert_eq!(device.device_type(), Some(DeviceType::MixSph));
        assert_eq!(device.alias.as_deref(), Some("Garage"));
    }
}
