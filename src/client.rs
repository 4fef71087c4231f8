use chrono::NaiveDate;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::ClientConfig;
use crate::error::{truncate_body, BilinkError};
use crate::transport::{Redirects, TimedTransport};
use crate::types::{DailyTotals, Location, LocationsEnvelope, RevenueCenter, RevenueCentersEnvelope};

pub const DAILY_TOTALS: &str = "getOperationsDailyTotals";
pub const LOCATIONS: &str = "getLocationDimensions";
pub const REVENUE_CENTERS: &str = "getRevenueCenterDimensions";

/// Bearer-authenticated calls against the BI read endpoints.
///
/// Knows nothing about token lifetimes: a 401/403 comes back as a
/// [`BilinkError::DataCall`] and the caller decides whether to refresh.
#[derive(Debug, Clone)]
pub struct BiClient {
    transport: TimedTransport,
    base_url: String,
}

impl BiClient {
    pub fn new(config: &ClientConfig, transport: TimedTransport) -> Self {
        Self {
            transport,
            base_url: format!("{}/bi/v1/{}", config.app_server, config.org_code),
        }
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }

    /// Per-revenue-center totals for one location and business date.
    pub async fn daily_totals(
        &self,
        id_token: &str,
        loc_ref: &str,
        bus_dt: NaiveDate,
    ) -> Result<DailyTotals, BilinkError> {
        let body = json!({
            "locRef": loc_ref,
            "busDt": bus_dt.format("%Y-%m-%d").to_string(),
        });
        self.post(id_token, DAILY_TOTALS, &body).await
    }

    pub async fn locations(&self, id_token: &str) -> Result<Vec<Location>, BilinkError> {
        let envelope: LocationsEnvelope = self.post(id_token, LOCATIONS, &json!({})).await?;
        Ok(envelope.locations)
    }

    pub async fn revenue_centers(
        &self,
        id_token: &str,
        loc_ref: &str,
    ) -> Result<Vec<RevenueCenter>, BilinkError> {
        let envelope: RevenueCentersEnvelope = self
            .post(id_token, REVENUE_CENTERS, &json!({ "locRef": loc_ref }))
            .await?;
        Ok(envelope.revenue_centers)
    }

    /// POST a JSON body to `endpoint` and decode the JSON reply.
    pub async fn post<T: DeserializeOwned>(
        &self,
        id_token: &str,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<T, BilinkError> {
        let request = self
            .transport
            .request(Redirects::Follow, Method::POST, &self.endpoint_url(endpoint))
            .header(AUTHORIZATION, format!("Bearer {id_token}"))
            .header(ACCEPT, "application/json")
            .json(body);
        let reply = self.transport.send(endpoint, request).await?;
        let status = reply.status.as_u16();

        if reply.status.is_server_error() {
            return Err(BilinkError::ServerError {
                operation: endpoint.to_string(),
                status,
                body: truncate_body(&reply.body),
            });
        }
        if !reply.is_success() {
            tracing::debug!(endpoint, status, "BI call rejected");
            return Err(BilinkError::DataCall {
                endpoint: endpoint.to_string(),
                status,
                body: truncate_body(&reply.body),
            });
        }

        reply.json().map_err(|e| {
            BilinkError::ProtocolError(format!("Failed to parse {endpoint} response: {e}"))
        })
    }
}
