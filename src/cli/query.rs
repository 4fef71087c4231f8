use std::sync::Arc;

use chrono::NaiveDate;

use crate::client::BiClient;
use crate::error::BilinkError;
use crate::oauth::{TokenSet, TokenStore};
use crate::session::SessionGuard;
use crate::types::{DailyTotals, Location, RevenueCenter};

use super::TenantContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Locations,
    RevenueCenters { loc_ref: String },
    DailyTotals { loc_ref: String, bus_dt: NaiveDate },
}

#[derive(Debug, Clone)]
pub enum QueryOutput {
    Locations(Vec<Location>),
    RevenueCenters(Vec<RevenueCenter>),
    DailyTotals(DailyTotals),
}

pub fn parse_bus_dt(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|e| format!("expected a YYYY-MM-DD business date: {e}"))
}

async fn execute(bi: &BiClient, id_token: &str, query: &Query) -> Result<QueryOutput, BilinkError> {
    Ok(match query {
        Query::Locations => QueryOutput::Locations(bi.locations(id_token).await?),
        Query::RevenueCenters { loc_ref } => {
            QueryOutput::RevenueCenters(bi.revenue_centers(id_token, loc_ref).await?)
        }
        Query::DailyTotals { loc_ref, bus_dt } => {
            QueryOutput::DailyTotals(bi.daily_totals(id_token, loc_ref, *bus_dt).await?)
        }
    })
}

/// Store `current` if it differs from what the cache held. Runs after every
/// renewal so a rotated refresh token survives a later failure.
fn persist_if_changed(
    store: &TokenStore,
    tenant: &str,
    previous: Option<&TokenSet>,
    current: &TokenSet,
) -> Result<(), BilinkError> {
    if previous != Some(current) {
        store.save(tenant, current)?;
    }
    Ok(())
}

/// Make sure the tenant has a usable session, run `query`, and retry it once
/// after renewing when the data service answers 401/403.
pub async fn run_query(ctx: &TenantContext, query: &Query) -> Result<QueryOutput, BilinkError> {
    let client_config = ctx.config.client_config()?;
    let (oauth, bi) = crate::connect(&client_config, ctx.config.timeout())?;
    let guard = SessionGuard::new(Arc::new(oauth));
    let credentials = ctx.config.credentials();

    let store = TokenStore::from_env();
    let cached = store.load(&ctx.name);
    let tokens = guard.ensure_fresh(cached.clone(), &credentials).await?;
    persist_if_changed(&store, &ctx.name, cached.as_ref(), &tokens)?;

    match execute(&bi, &tokens.id_token, query).await {
        Err(e) if e.is_unauthorized() => {
            tracing::info!(tenant = %ctx.name, "data call unauthorized, renewing session once");
            guard.invalidate(&tokens).await;
            let renewed = guard.ensure_fresh(Some(tokens.clone()), &credentials).await?;
            persist_if_changed(&store, &ctx.name, Some(&tokens), &renewed)?;
            execute(&bi, &renewed.id_token, query).await
        }
        other => other,
    }
}
