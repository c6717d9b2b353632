use serde::Deserialize;
use serde_json::Value;

/// Session payload as exported from the historical timing archive
#[derive(Debug, Deserialize)]
pub(crate) struct RichPayload {
    pub laps: Vec<RichLap>,
    #[serde(default)]
    pub drivers: Vec<RichDriver>,
}

/// Times are float seconds; absent or NaN values are exported as null
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RichLap {
    pub driver: String,
    pub lap_number: Option<f64>,
    #[serde(default)]
    pub lap_time: Option<f64>,
    #[serde(default)]
    pub sector1_time: Option<f64>,
    #[serde(default)]
    pub sector2_time: Option<f64>,
    #[serde(default)]
    pub sector3_time: Option<f64>,
    #[serde(default)]
    pub compound: Option<String>,
    #[serde(default)]
    pub position: Option<f64>,
    #[serde(default)]
    pub is_personal_best: Option<bool>,
    #[serde(default)]
    pub lap_start_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RichDriver {
    pub abbreviation: String,
    #[serde(default)]
    pub driver_number: Option<Value>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
}
