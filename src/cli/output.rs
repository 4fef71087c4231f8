use std::fmt::Write as _;

use colored::Colorize;

use crate::error::BilinkError;
use crate::oauth::TokenSet;
use crate::types::{DailyTotals, Location, RevenueCenter};

use super::query::QueryOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Pretty,
    Json,
}

fn dash<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn money(value: Option<f64>) -> String {
    dash(value.map(|v| format!("{v:.2}")))
}

pub fn render_locations(locations: &[Location]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<12} {:<32} {}", "LOCREF", "NAME", "ACTIVE");
    for loc in locations {
        let _ = writeln!(
            out,
            "{:<12} {:<32} {}",
            loc.loc_ref,
            loc.name.as_deref().unwrap_or("-"),
            dash(loc.active)
        );
    }
    out
}

pub fn render_revenue_centers(centers: &[RevenueCenter]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<6} {}", "NUM", "NAME");
    for rvc in centers {
        let _ = writeln!(out, "{:<6} {}", rvc.num, rvc.name.as_deref().unwrap_or("-"));
    }
    out
}

pub fn render_daily_totals(totals: &DailyTotals) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Location {} on {}",
        totals.loc_ref.as_deref().unwrap_or("-"),
        totals.bus_dt.as_deref().unwrap_or("-")
    );
    let _ = writeln!(
        out,
        "{:<6} {:>12} {:>8} {:>8} {:>10} {:>10} {:>10}",
        "RVC", "NET SALES", "CHECKS", "GUESTS", "VOIDS", "DISCOUNTS", "TAX"
    );
    for rvc in &totals.revenue_centers {
        let _ = writeln!(
            out,
            "{:<6} {:>12} {:>8} {:>8} {:>10} {:>10} {:>10}",
            rvc.rvc_num,
            money(rvc.net_sales),
            dash(rvc.check_count),
            dash(rvc.guest_count),
            money(rvc.void_total),
            money(rvc.discount_total),
            money(rvc.tax_total)
        );
    }
    let _ = writeln!(
        out,
        "{:<6} {:>12} {:>8} {:>8}",
        "TOTAL",
        money(totals.net_sales()),
        "",
        dash(totals.guest_count())
    );
    out
}

pub fn print_query_output(output: &QueryOutput, mode: OutputMode) {
    match mode {
        OutputMode::Json => {
            let json = match output {
                QueryOutput::Locations(l) => serde_json::json!({ "locations": l }),
                QueryOutput::RevenueCenters(r) => serde_json::json!({ "revenueCenters": r }),
                QueryOutput::DailyTotals(t) => serde_json::to_value(t).unwrap_or_default(),
            };
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
        OutputMode::Pretty => {
            let text = match output {
                QueryOutput::Locations(l) => render_locations(l),
                QueryOutput::RevenueCenters(r) => render_revenue_centers(r),
                QueryOutput::DailyTotals(t) => render_daily_totals(t),
            };
            print!("{text}");
        }
    }
}

/// Report a token set without revealing any token material.
pub fn print_session(tenant: &str, action: &str, tokens: &TokenSet, mode: OutputMode) {
    match mode {
        OutputMode::Json => {
            let json = serde_json::json!({
                "tenant": tenant,
                "action": action,
                "expiresAt": tokens.expires_at().to_rfc3339(),
                "expiresIn": tokens.expires_in,
            });
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
        OutputMode::Pretty => {
            println!("{action} for '{tenant}'");
            println!("Session valid until {}", tokens.expires_at().to_rfc3339());
        }
    }
}

pub fn print_error(err: &BilinkError, json_mode: bool, is_tty: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&err.to_json()).unwrap_or_default());
        return;
    }
    let label = if is_tty {
        "Error".red().bold().to_string()
    } else {
        "Error".to_string()
    };
    eprintln!("{label}: {err}");
    if err.requires_bootstrap() {
        let hint = "Hint: the stored session can no longer be refreshed. Run: bilink login";
        if is_tty {
            eprintln!("{}", hint.dimmed());
        } else {
            eprintln!("{hint}");
        }
    }
}
