use serde::Deserialize;

/// Session payload from the live timing feed: separate endpoint tables
/// keyed by car number
#[derive(Debug, Deserialize)]
pub(crate) struct LivePayload {
    #[serde(default)]
    pub drivers: Vec<LiveDriver>,
    pub laps: Vec<LiveLap>,
    #[serde(default)]
    pub stints: Vec<LiveStint>,
    #[serde(default)]
    pub positions: Vec<LivePosition>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LiveDriver {
    pub driver_number: u32,
    #[serde(default)]
    pub name_acronym: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LiveLap {
    pub driver_number: u32,
    pub lap_number: u32,
    #[serde(default)]
    pub lap_duration: Option<f64>,
    #[serde(default)]
    pub duration_sector_1: Option<f64>,
    #[serde(default)]
    pub duration_sector_2: Option<f64>,
    #[serde(default)]
    pub duration_sector_3: Option<f64>,
    #[serde(default)]
    pub date_start: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LiveStint {
    pub driver_number: u32,
    #[serde(default)]
    pub lap_start: Option<u32>,
    #[serde(default)]
    pub lap_end: Option<u32>,
    #[serde(default)]
    pub compound: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LivePosition {
    pub driver_number: u32,
    pub date: String,
    pub position: u32,
}
