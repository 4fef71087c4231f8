//! Read-only records returned by the BI endpoints.
//!
//! Every metric is optional: an absent field means the revenue center did not
//! report it, which is not the same as zero. Unrecognized fields are kept in
//! `extra` so nothing the service sends is dropped.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub loc_ref: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default, rename = "tz", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueCenter {
    pub num: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Daily aggregates for one revenue center.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueCenterTotals {
    #[serde(rename = "rvcNum")]
    pub rvc_num: i64,
    #[serde(default, rename = "netSlsTtl", skip_serializing_if = "Option::is_none")]
    pub net_sales: Option<f64>,
    #[serde(default, rename = "chkCnt", skip_serializing_if = "Option::is_none")]
    pub check_count: Option<i64>,
    #[serde(default, rename = "gstCnt", skip_serializing_if = "Option::is_none")]
    pub guest_count: Option<i64>,
    #[serde(default, rename = "vdTtl", skip_serializing_if = "Option::is_none")]
    pub void_total: Option<f64>,
    #[serde(default, rename = "mngrVdTtl", skip_serializing_if = "Option::is_none")]
    pub manager_void_total: Option<f64>,
    #[serde(default, rename = "dscTtl", skip_serializing_if = "Option::is_none")]
    pub discount_total: Option<f64>,
    #[serde(default, rename = "taxCollTtl", skip_serializing_if = "Option::is_none")]
    pub tax_total: Option<f64>,
    #[serde(default, rename = "svcChgTtl", skip_serializing_if = "Option::is_none")]
    pub service_charge_total: Option<f64>,
    #[serde(default, rename = "chkOpnCnt", skip_serializing_if = "Option::is_none")]
    pub open_check_count: Option<i64>,
    #[serde(default, rename = "chkOpnTtl", skip_serializing_if = "Option::is_none")]
    pub open_check_total: Option<f64>,
    #[serde(default, rename = "chkClsdCnt", skip_serializing_if = "Option::is_none")]
    pub closed_check_count: Option<i64>,
    #[serde(default, rename = "chkClsdTtl", skip_serializing_if = "Option::is_none")]
    pub closed_check_total: Option<f64>,
    #[serde(default, rename = "tblCnt", skip_serializing_if = "Option::is_none")]
    pub table_count: Option<i64>,
    #[serde(default, rename = "tblTurnCnt", skip_serializing_if = "Option::is_none")]
    pub table_turns: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotals {
    #[serde(default)]
    pub loc_ref: Option<String>,
    #[serde(default)]
    pub bus_dt: Option<String>,
    #[serde(default)]
    pub revenue_centers: Vec<RevenueCenterTotals>,
}

impl DailyTotals {
    /// Sum of reported net sales. `None` when no revenue center reported it.
    pub fn net_sales(&self) -> Option<f64> {
        sum(self.revenue_centers.iter().map(|r| r.net_sales))
    }

    pub fn guest_count(&self) -> Option<i64> {
        let mut reported = self.revenue_centers.iter().filter_map(|r| r.guest_count).peekable();
        reported.peek()?;
        Some(reported.sum())
    }
}

fn sum(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LocationsEnvelope {
    #[serde(default)]
    pub locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RevenueCentersEnvelope {
    #[serde(default)]
    pub revenue_centers: Vec<RevenueCenter>,
}
