use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{DashboardError, GraphqlError};
use crate::graphql::{decode, Transport};
use crate::models::{DataMode, Payload};
use crate::queries;

/// One rung of the fallback ladder.
#[derive(Clone, Copy)]
pub struct QueryStrategy {
    pub name: &'static str,
    pub document: &'static str,
    /// `None` means the rung is always attempted. Otherwise it only runs when
    /// the previous attempt failed in a way this rung fixes.
    pub recovers_from: Option<fn(&GraphqlError) -> bool>,
}

fn missing_created_at(err: &GraphqlError) -> bool {
    err.is_missing_field("createdAt")
}

pub const PROFILE_LADDER: [QueryStrategy; 4] = [
    QueryStrategy {
        name: "profile",
        document: queries::PROFILE_QUERY,
        recovers_from: None,
    },
    QueryStrategy {
        name: "profile-without-created-at",
        document: queries::PROFILE_QUERY_FALLBACK,
        recovers_from: Some(missing_created_at),
    },
    QueryStrategy {
        name: "legacy",
        document: queries::PROFILE_QUERY_LEGACY,
        recovers_from: None,
    },
    QueryStrategy {
        name: "legacy-without-created-at",
        document: queries::PROFILE_QUERY_LEGACY_FALLBACK,
        recovers_from: Some(missing_created_at),
    },
];

const TRANSACTIONS_LADDER: [QueryStrategy; 1] = [QueryStrategy {
    name: "transactions-page",
    document: queries::TRANSACTIONS_PAGE_QUERY,
    recovers_from: None,
}];

const PROJECTS_LADDER: [QueryStrategy; 1] = [QueryStrategy {
    name: "projects-page",
    document: queries::PROJECTS_PAGE_QUERY,
    recovers_from: None,
}];

pub fn ladder_for(mode: DataMode) -> &'static [QueryStrategy] {
    match mode {
        DataMode::Full => &PROFILE_LADDER,
        DataMode::Transactions => &TRANSACTIONS_LADDER,
        DataMode::Projects => &PROJECTS_LADDER,
    }
}

/// Tries each strategy in order and returns the first payload that decodes.
/// The last failure is reported once the ladder is exhausted.
pub async fn run_ladder<T>(
    transport: &T,
    token: &str,
    ladder: &[QueryStrategy],
) -> Result<Payload, DashboardError>
where
    T: Transport + ?Sized,
{
    let mut last_error: Option<GraphqlError> = None;

    for strategy in ladder {
        if let (Some(recovers), Some(err)) = (strategy.recovers_from, last_error.as_ref()) {
            if !recovers(err) {
                debug!(variant = strategy.name, "skipping query variant");
                continue;
            }
        }

        let attempt = transport
            .execute(strategy.document, json!({}), token)
            .await
            .and_then(decode::<Payload>);

        match attempt {
            Ok(payload) => {
                info!(variant = strategy.name, "core data loaded");
                return Ok(payload);
            }
            Err(err) => {
                warn!(variant = strategy.name, error = %err, "query variant failed");
                last_error = Some(err);
            }
        }
    }

    Err(DashboardError::Schema(last_error.unwrap_or_else(|| {
        GraphqlError::Response("no query variant available".to_string())
    })))
}

pub async fn fetch_core_data<T>(transport: &T, token: &str) -> Result<Payload, DashboardError>
where
    T: Transport + ?Sized,
{
    run_ladder(transport, token, &PROFILE_LADDER).await
}

pub async fn fetch_profile_data<T>(
    transport: &T,
    token: &str,
    mode: DataMode,
) -> Result<Payload, DashboardError>
where
    T: Transport + ?Sized,
{
    match mode {
        DataMode::Full => fetch_core_data(transport, token).await,
        _ => run_ladder(transport, token, ladder_for(mode)).await,
    }
}
