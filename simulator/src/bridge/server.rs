use crate::bridge::store::EventStore;
use crate::generator::profile::{GeneratorConfig, InteractionGenerator};
use log::{debug, info};
use pulsemap::query::{InteractionQuery, NrqlRequest, NrqlResponse, QueryWindow};
use pulsemap::widget::epoch_millis;
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use warp::{http::StatusCode, Filter};

fn token_after<'a>(tokens: &[&'a str], keyword: &str) -> Option<&'a str> {
    tokens
        .iter()
        .position(|token| token.eq_ignore_ascii_case(keyword))
        .and_then(|idx| tokens.get(idx + 1).copied())
}

/// Pulls the `SINCE`/`UNTIL` bounds out of an interaction query.
pub fn parse_window(query: &str) -> Result<QueryWindow, String> {
    let tokens: Vec<&str> = query.split_whitespace().collect();

    match token_after(&tokens, "FROM") {
        Some(event_type) if event_type == InteractionQuery::EVENT_TYPE => {}
        Some(other) => return Err(format!("unknown event type {other}")),
        None => return Err("missing FROM clause".into()),
    }

    let bound = |keyword: &str| -> Result<i64, String> {
        token_after(&tokens, keyword)
            .ok_or_else(|| format!("missing {keyword} clause"))?
            .parse::<i64>()
            .map_err(|e| format!("invalid {keyword} bound: {e}"))
    };

    let window = QueryWindow {
        since_ms: bound("SINCE")?,
        until_ms: bound("UNTIL")?,
    };
    if window.since_ms > window.until_ms {
        return Err("SINCE is after UNTIL".into());
    }
    Ok(window)
}

pub fn routes(
    store: EventStore,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let nrql_store = store.clone();
    let nrql_route = warp::path("nrql")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .map(move |request: NrqlRequest| match parse_window(&request.query) {
            Ok(window) => {
                let rows = nrql_store.query(request.account_id, window);
                debug!(
                    "account {} window {}..{} -> {} rows",
                    request.account_id,
                    window.since_ms,
                    window.until_ms,
                    rows.len()
                );
                warp::reply::with_status(
                    warp::reply::json(&NrqlResponse::from_rows(rows)),
                    StatusCode::OK,
                )
            }
            Err(err) => warp::reply::with_status(
                warp::reply::json(&json!({ "error": err })),
                StatusCode::BAD_REQUEST,
            ),
        });

    let health_route = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(move || warp::reply::json(&json!({"status": "ok", "events": store.len()})));

    nrql_route.or(health_route)
}

/// Appends a second's worth of events every second and prunes old ones.
pub async fn feed(store: EventStore, config: GeneratorConfig) {
    let mut generator = InteractionGenerator::new(config);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut last_ms = epoch_millis();

    loop {
        ticker.tick().await;
        let now_ms = epoch_millis();
        let window = QueryWindow {
            since_ms: last_ms + 1,
            until_ms: now_ms,
        };
        last_ms = now_ms;

        let batch = generator.batch(window);
        let appended = batch.len();
        store.append(batch);
        let pruned = store.prune(now_ms);
        debug!("feed appended {appended}, pruned {pruned}, holding {}", store.len());
    }
}

pub async fn serve(store: EventStore, address: SocketAddr) {
    info!("query backend listening on http://{address}");
    warp::serve(routes(store)).run(address).await;
}
