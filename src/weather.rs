//! Current weather for the area of interest.

use crate::{BoundingBox, DataService, ServiceError};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Weather conditions reported by the Data Service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub temperature: f64,
    pub description: String,
    pub wind_speed: f64,
    pub humidity: f64,
}

impl WeatherReport {
    /// One-line summary for the sidebar.
    pub fn summary(&self) -> String {
        format!(
            "{:.0}° {}, wind {:.0} mph, humidity {:.0}%",
            self.temperature, self.description, self.wind_speed, self.humidity
        )
    }
}

pub struct WeatherClient<D> {
    service: D,
}

impl<D: DataService> WeatherClient<D> {
    pub fn new(service: D) -> Self {
        Self { service }
    }

    /// Look up the weather for a bounding box.
    ///
    /// Boxes without area are rejected before any request is made.
    pub async fn lookup(&self, bbox: &BoundingBox) -> Result<WeatherReport, ServiceError> {
        if !bbox.has_area() {
            warn!("[WeatherClient] Bounding box {:?} has no area", bbox.as_array());
            return Err(ServiceError::InvalidRequest("bounding box has no area".into()));
        }
        let report = self.service.fetch_weather(bbox).await?;
        info!("[WeatherClient] {}", report.summary());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fake::FakeService;
    use futures::executor::block_on;
    use serde_json::json;

    fn report() -> WeatherReport {
        WeatherReport {
            temperature: 61.4,
            description: "scattered clouds".into(),
            wind_speed: 7.8,
            humidity: 32.0,
        }
    }

    #[test]
    fn test_decode_report() {
        let decoded: WeatherReport = serde_json::from_value(json!({
            "temperature": 61.4,
            "description": "scattered clouds",
            "wind_speed": 7.8,
            "humidity": 32
        }))
        .unwrap();
        assert_eq!(decoded, report());
        assert_eq!(decoded.summary(), "61° scattered clouds, wind 8 mph, humidity 32%");
    }

    #[test]
    fn test_lookup() {
        let service = FakeService::default();
        *service.weather.lock().unwrap() = Some(Ok(report()));
        let client = WeatherClient::new(service);

        let bbox = BoundingBox::new(-105.2, 37.1, -104.8, 37.5).unwrap();
        assert_eq!(block_on(client.lookup(&bbox)), Ok(report()));

        let flat = BoundingBox::new(-105.0, 37.0, -105.0, 37.0).unwrap();
        assert!(matches!(block_on(client.lookup(&flat)), Err(ServiceError::InvalidRequest(_))));
    }
}
