//! # Waste Collection Module
//!
//! Polls waste-collection sensors from Home Assistant and turns their next
//! pickup dates into views.
//!
//! ## Sensor States
//!
//! The sensors report German relative dates: `"In 3 Tagen"`, `"In 1 Tag"`,
//! `"Heute"` or `"Morgen"`. Any other state marks the sensor as unavailable.
//! A parsed state is stored as an absolute due date, so the remaining days
//! keep counting down between polls.
//!
//! ## Views
//!
//! - one dashboard with every polled sensor, in config order
//! - one detailed view per sensor whose pickup is at most
//!   `waste_detailed_days` away

use crate::config::{Config, SensorConfig};
use crate::dashboard::{DataSource, DataSourceError};
use crate::{DashboardElement, ViewData};
use chrono::{Local, NaiveDate, TimeDelta};
use reqwest::Client;
use serde::Deserialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Label for sensors whose state could not be parsed
pub const UNAVAILABLE_LABEL: &str = "Nicht verfügbar";

/// Last parsed state of one sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorState {
    Available { due_date: NaiveDate },
    Unavailable,
}

impl SensorState {
    /// Parse a sensor state relative to `today`.
    pub fn parse(state: &str, today: NaiveDate) -> Self {
        parse_remaining_days(state)
            .and_then(|days| today.checked_add_signed(TimeDelta::days(i64::from(days))))
            .map_or(SensorState::Unavailable, |due_date| SensorState::Available { due_date })
    }

    /// Days from `today` to the due date; never negative.
    pub fn remaining_days(&self, today: NaiveDate) -> Option<i64> {
        match self {
            SensorState::Available { due_date } => Some((*due_date - today).num_days().max(0)),
            SensorState::Unavailable => None,
        }
    }
}

/// `"In N Tag"` / `"In N Tagen"` → N, `"Heute"` → 0, `"Morgen"` → 1.
pub fn parse_remaining_days(state: &str) -> Option<u32> {
    let state = state.trim();
    match state {
        "Heute" => return Some(0),
        "Morgen" => return Some(1),
        _ => {}
    }

    let mut words = state.split_whitespace();
    match (words.next(), words.next(), words.next(), words.next()) {
        (Some("In"), Some(days), Some("Tag" | "Tagen"), None) => days.parse().ok(),
        _ => None,
    }
}

/// Human-readable remaining days.
pub fn remaining_days_label(days: i64) -> String {
    match days {
        0 => "Heute".to_string(),
        1 => "Morgen".to_string(),
        n => format!("{n} Tage"),
    }
}

#[derive(Deserialize)]
struct EntityState {
    #[serde(default)]
    state: Option<serde_json::Value>,
}

/// Minimal Home Assistant REST client.
pub struct HomeAssistantClient {
    client: Client,
    url: String,
    token: String,
}

impl HomeAssistantClient {
    pub fn new(url: &str, token: &str, timeout: Duration) -> Result<Self, DataSourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// `GET /api/states/{entity_id}`; the `state` field must be present and a
    /// string.
    pub async fn state(&self, entity_id: &str) -> Result<String, DataSourceError> {
        debug!(entity_id, "Getting sensor state");
        let response = self
            .client
            .get(format!("{}/api/states/{}", self.url, entity_id))
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?
            .error_for_status()?;
        debug!(entity_id, status = %response.status(), "Got response");

        let entity: EntityState = response.json().await?;
        match entity.state {
            Some(serde_json::Value::String(state)) => {
                debug!(entity_id, state = %state, "Sensor state");
                Ok(state)
            }
            other => Err(DataSourceError::InvalidState {
                entity_id: entity_id.to_string(),
                state: other.map_or_else(|| "missing".to_string(), |value| value.to_string()),
            }),
        }
    }
}

/// Waste-collection data source.
pub struct WasteModule {
    client: HomeAssistantClient,
    sensors: Vec<SensorConfig>,
    detailed_days: i64,
    alert_days: i64,
    /// Parallel to `sensors`; `None` until the first successful refresh
    states: Mutex<Vec<Option<SensorState>>>,
}

impl WasteModule {
    pub fn new(config: &Config) -> Result<Self, DataSourceError> {
        let ha = &config.home_assistant;
        let client = HomeAssistantClient::new(
            &ha.url,
            &ha.token,
            Duration::from_secs(ha.request_timeout_seconds),
        )?;
        Ok(Self {
            client,
            sensors: ha.sensors.clone(),
            detailed_days: config.waste_detailed_days,
            alert_days: config.waste_alert_days,
            states: Mutex::new(vec![None; ha.sensors.len()]),
        })
    }

    fn lock_states(&self) -> MutexGuard<'_, Vec<Option<SensorState>>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current states, parallel to the configured sensors.
    pub fn states(&self) -> Vec<Option<SensorState>> {
        self.lock_states().clone()
    }

    /// Replace every cached state at once.
    pub fn replace_states(&self, states: Vec<SensorState>) {
        let states = states.into_iter().map(Some).collect();
        *self.lock_states() = states;
    }

    /// Poll every sensor, parsing relative to `today`.
    ///
    /// The cache is only replaced when every sensor answered.
    pub async fn refresh_at(&self, today: NaiveDate) -> Result<(), DataSourceError> {
        let mut states = Vec::with_capacity(self.sensors.len());
        for sensor in &self.sensors {
            let state = SensorState::parse(&self.client.state(&sensor.entity_id).await?, today);
            match state {
                SensorState::Available { due_date } => {
                    info!(sensor = %sensor.friendly_name, due = %due_date, "Pickup scheduled")
                }
                SensorState::Unavailable => warn!(sensor = %sensor.name, "Sensor is unavailable"),
            }
            states.push(state);
        }

        if !states.is_empty() && states.iter().all(|s| *s == SensorState::Unavailable) {
            warn!("No sensors available");
        }
        self.replace_states(states);
        Ok(())
    }

    fn is_alert(&self, remaining: Option<i64>) -> bool {
        remaining.map_or(true, |days| days <= self.alert_days)
    }

    /// Views for the cached states as seen on `today`.
    pub fn views_for(&self, today: NaiveDate) -> Vec<ViewData> {
        let states = self.states();
        let polled: Vec<(&SensorConfig, Option<i64>)> = self
            .sensors
            .iter()
            .zip(states)
            .filter_map(|(sensor, state)| state.map(|s| (sensor, s.remaining_days(today))))
            .collect();

        if polled.is_empty() {
            return Vec::new();
        }

        let elements: Vec<DashboardElement> = polled
            .iter()
            .map(|(sensor, remaining)| {
                let alert = self.is_alert(*remaining);
                let text =
                    remaining.map_or_else(|| UNAVAILABLE_LABEL.to_string(), remaining_days_label);
                DashboardElement::new(&sensor.icon_path_small, text)
                    .with_icon_alert(alert)
                    .with_text_alert(alert)
            })
            .collect();
        let is_border_alert = elements.iter().any(|e| e.is_icon_alert);

        let mut views = vec![ViewData::Dashboard {
            elements,
            is_border_alert,
        }];

        for (sensor, remaining) in &polled {
            let Some(days) = *remaining else { continue };
            if days > self.detailed_days {
                continue;
            }
            views.push(ViewData::DetailedTwoLine {
                icon_path: sensor.icon_path_large.clone(),
                upper_text: sensor.friendly_name.clone(),
                lower_text: remaining_days_label(days),
                is_border_alert: false,
                is_icon_alert: self.is_alert(Some(days)),
                is_upper_text_alert: false,
                is_lower_text_alert: false,
            });
        }

        views
    }
}

impl DataSource for WasteModule {
    fn name(&self) -> &str {
        "waste"
    }

    async fn refresh(&self) -> Result<(), DataSourceError> {
        self.refresh_at(Local::now().date_naive()).await
    }

    fn current_views(&self) -> Vec<ViewData> {
        self.views_for(Local::now().date_naive())
    }
}
