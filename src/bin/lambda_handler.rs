//! AWS Lambda handler for analytics requests
//!
//! Accepts a JSON request naming an as-of date, an optional reporting period
//! and agreements to score, and returns the summary, forms and utilization.
//!
//! Supports Lambda Function URLs for direct HTTP access. Records are read from
//! the CSV directory in `ANALYTICS_DATA_DIR` (default `data`).

use chrono::{Local, NaiveDate};
use insurance_analytics::settings::JsonFileSettings;
use insurance_analytics::{
    AgreementUtilization, AnalyticsConfig, AnalyticsService, AnalyticsSummary, InMemoryStore, Overrides,
    RegulatoryForms, ReportingPeriod,
};
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct AnalyticsRequest {
    /// Summary cut-off date; all records when omitted
    #[serde(default)]
    pub as_of: Option<NaiveDate>,

    /// Reporting period for the regulatory forms; forms are skipped unless both are set
    #[serde(default)]
    pub period_from: Option<NaiveDate>,

    #[serde(default)]
    pub period_to: Option<NaiveDate>,

    /// Flat base-per-secondary rate for the forms' secondary rendering
    #[serde(default)]
    pub secondary_rate: Option<f64>,

    /// Agreements to score; every agreement when empty
    #[serde(default)]
    pub agreement_ids: Vec<String>,

    /// Reference date for utilization (default: today)
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub summary: AnalyticsSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forms: Option<RegulatoryForms>,
    pub utilization: Vec<AgreementUtilization>,
    pub execution_time_ms: u64,
}

fn error_response(status: u16, message: &str) -> Result<Response<Body>, Error> {
    let body = serde_json::json!({ "error": message });
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Body::Text(body.to_string()))?)
}

fn json_response(body: &AnalyticsResponse) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type")
        .body(Body::Text(serde_json::to_string(body)?))?)
}

fn data_dir() -> PathBuf {
    std::env::var("ANALYTICS_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

fn load_service(request: &AnalyticsRequest) -> insurance_analytics::Result<AnalyticsService<InMemoryStore>> {
    let dir = data_dir();
    let mut config = AnalyticsConfig::from_env();
    if request.secondary_rate.is_some() {
        config.secondary_rate = request.secondary_rate;
    }

    let settings_path = std::env::var("ANALYTICS_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dir.join("settings.json"));
    let overrides = Overrides::load(&JsonFileSettings::new(settings_path))?;
    overrides.validate()?;

    let store = InMemoryStore::from_csv_dir(&dir, &config)?;
    Ok(AnalyticsService::new(store, config, overrides))
}

fn analyze(request: &AnalyticsRequest) -> insurance_analytics::Result<(AnalyticsSummary, Option<RegulatoryForms>, Vec<AgreementUtilization>)> {
    let service = load_service(request)?;
    let summary = service.compute_analytics_summary(request.as_of)?;

    let forms = match (request.period_from, request.period_to) {
        (Some(from), Some(to)) => {
            let period = ReportingPeriod::new(from, to)?;
            Some(service.compose_regulatory_forms(period, service.overrides())?)
        }
        _ => None,
    };

    let today = request.today.unwrap_or_else(|| Local::now().date_naive());
    let utilization = if request.agreement_ids.is_empty() {
        service.compute_all_utilization(today)?
    } else {
        request
            .agreement_ids
            .iter()
            .map(|id| service.compute_agreement_utilization(id, today))
            .collect::<insurance_analytics::Result<Vec<_>>>()?
    };

    Ok((summary, forms, utilization))
}

/// Lambda handler function
async fn handler(event: Request) -> Result<Response<Body>, Error> {
    let start = std::time::Instant::now();

    // Handle CORS preflight
    if event.method().as_str() == "OPTIONS" {
        return Ok(Response::builder()
            .status(200)
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "POST, OPTIONS")
            .header("Access-Control-Allow-Headers", "Content-Type")
            .body(Body::Empty)?);
    }

    let body_str = match event.body() {
        Body::Text(s) => s.clone(),
        Body::Binary(b) => String::from_utf8_lossy(b).to_string(),
        Body::Empty => "{}".to_string(),
    };

    let request: AnalyticsRequest = match serde_json::from_str(&body_str) {
        Ok(r) => r,
        Err(e) => return error_response(400, &format!("Invalid JSON: {}", e)),
    };

    let (summary, forms, utilization) = match analyze(&request) {
        Ok(result) => result,
        Err(e @ insurance_analytics::AnalyticsError::ValidationError(_)) => {
            return error_response(400, &e.to_string());
        }
        Err(e) => {
            error!("Analytics request failed: {}", e);
            return error_response(500, &e.to_string());
        }
    };

    let execution_time_ms = start.elapsed().as_millis() as u64;
    info!("Analytics request served in {} ms", execution_time_ms);

    json_response(&AnalyticsResponse {
        summary,
        forms,
        utilization,
        execution_time_ms,
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    run(service_fn(handler)).await
}
