use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{Args, Capability, Schema};

const WTTR_URL: &str = "https://wttr.in";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Current conditions from wttr.in for the location named by one input field.
pub struct WeatherCapability {
    location_field: String,
    schema: Schema,
    base_url: String,
    client: reqwest::Client,
}

impl Default for WeatherCapability {
    fn default() -> Self {
        Self::new("city")
    }
}

impl WeatherCapability {
    /// `location_field` is the input key holding the place name (e.g. `"city"`).
    pub fn new(location_field: impl Into<String>) -> Self {
        let location_field = location_field.into();
        Self {
            schema: Schema::new().required(location_field.clone()),
            location_field,
            base_url: WTTR_URL.to_string(),
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn format_report(location: &str, report: &WttrReport) -> Result<String> {
        let current = report
            .current_condition
            .first()
            .context("wttr.in returned no current conditions")?;
        let conditions = current
            .weather_desc
            .first()
            .map(|d| d.value.as_str())
            .unwrap_or("unknown");

        Ok(format!(
            "Weather in {location}:\n\
             Temperature: {}°C (feels like {}°C)\n\
             Conditions: {conditions}\n\
             Humidity: {}%\n\
             Wind: {} km/h",
            current.temp_c, current.feels_like_c, current.humidity, current.windspeed_kmph,
        ))
    }
}

#[async_trait]
impl Capability for WeatherCapability {
    fn name(&self) -> &str {
        "weather"
    }

    fn description(&self) -> &str {
        "Current temperature, conditions, humidity and wind for a location."
    }

    fn schema(&self) -> Option<&Schema> {
        Some(&self.schema)
    }

    async fn invoke(&self, args: &Args) -> Result<String> {
        let location = args
            .get(&self.location_field)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .with_context(|| format!("missing '{}' argument", self.location_field))?;

        let url = reqwest::Url::parse_with_params(
            &format!("{}/{}", self.base_url, location),
            &[("format", "j1")],
        )?;
        let resp = self
            .client
            .get(url)
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("weather unavailable for {location} ({})", resp.status());
        }

        let report: WttrReport = resp.json().await?;
        Self::format_report(location, &report)
    }
}

#[derive(Debug, Deserialize)]
struct WttrReport {
    current_condition: Vec<CurrentCondition>,
}

#[derive(Debug, Deserialize)]
struct CurrentCondition {
    #[serde(rename = "temp_C")]
    temp_c: String,
    #[serde(rename = "FeelsLikeC")]
    feels_like_c: String,
    #[serde(rename = "weatherDesc", default)]
    weather_desc: Vec<Description>,
    humidity: String,
    #[serde(rename = "windspeedKmph")]
    windspeed_kmph: String,
}

#[derive(Debug, Deserialize)]
struct Description {
    value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "current_condition": [{
            "temp_C": "18",
            "FeelsLikeC": "17",
            "weatherDesc": [{"value": "Partly cloudy"}],
            "humidity": "64",
            "windspeedKmph": "11"
        }]
    }"#;

    #[test]
    fn schema_requires_location_field() {
        let weather = WeatherCapability::new("destination");
        let schema = weather.schema().unwrap();
        assert_eq!(schema.fields().len(), 1);
        assert_eq!(schema.fields()[0].name, "destination");
        assert!(schema.fields()[0].required);
    }

    #[test]
    fn default_location_field_is_city() {
        let weather = WeatherCapability::default();
        assert_eq!(weather.schema().unwrap().fields()[0].name, "city");
    }

    #[test]
    fn formats_current_conditions() {
        let report: WttrReport = serde_json::from_str(SAMPLE).unwrap();
        let text = WeatherCapability::format_report("Porto", &report).unwrap();
        assert!(text.starts_with("Weather in Porto:"));
        assert!(text.contains("18°C (feels like 17°C)"));
        assert!(text.contains("Partly cloudy"));
        assert!(text.contains("Humidity: 64%"));
        assert!(text.contains("Wind: 11 km/h"));
    }

    #[test]
    fn empty_report_is_an_error() {
        let report: WttrReport = serde_json::from_str(r#"{"current_condition": []}"#).unwrap();
        assert!(WeatherCapability::format_report("Porto", &report).is_err());
    }

    #[tokio::test]
    async fn blank_location_fails_before_any_request() {
        let weather = WeatherCapability::default();
        let args = Args::from([("city".to_string(), "  ".to_string())]);
        let err = weather.invoke(&args).await.unwrap_err();
        assert!(err.to_string().contains("city"));
    }
}
