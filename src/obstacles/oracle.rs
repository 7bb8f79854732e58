//! External crossing oracle ("API" verification mode).
//!
//! The engine treats the real routing backend (Valhalla) as an opaque
//! bridge-crossing oracle behind this trait — the HTTP plumbing here is a
//! thin, swappable implementor, not part of the planning algorithm itself.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::Deserialize;

use crate::geometry::Point;

/// A segment crossing oracle. Returns `Some(true)`/`Some(false)` for a
/// definite verdict, `None` when the oracle could not answer (§7
/// `OracleUnavailable`: 4xx/5xx/timeout).
pub trait CrossingOracle: Send + Sync {
    fn check_crossing(&self, p: Point, q: Point) -> Option<bool>;
}

/// Per-segment cache wrapper around any oracle, keyed by the rounded
/// endpoint coordinates (stable across repeated queries for the same
/// delivery pair within a plan).
pub struct CachedOracle<O: CrossingOracle> {
    inner: O,
    cache: Mutex<HashMap<(SegKey, SegKey), Option<bool>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SegKey(i64, i64);

fn seg_key(p: Point) -> SegKey {
    SegKey((p.lat * 1e7).round() as i64, (p.lon * 1e7).round() as i64)
}

impl<O: CrossingOracle> CachedOracle<O> {
    pub fn new(inner: O) -> Self {
        CachedOracle {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl<O: CrossingOracle> CrossingOracle for CachedOracle<O> {
    fn check_crossing(&self, p: Point, q: Point) -> Option<bool> {
        let key = (seg_key(p), seg_key(q));
        if let Some(cached) = self.cache.lock().unwrap().get(&key) {
            return *cached;
        }
        let result = self.inner.check_crossing(p, q);
        self.cache.lock().unwrap().insert(key, result);
        result
    }
}

/// An oracle that never answers — used when API verification is requested
/// but no endpoint is configured.
pub struct UnavailableOracle;

impl CrossingOracle for UnavailableOracle {
    fn check_crossing(&self, _p: Point, _q: Point) -> Option<bool> {
        None
    }
}

const BRIDGE_KEYWORDS: [&str; 3] = ["bridge", "cross", "river"];
const BRIDGE_MANEUVER_TYPE: u32 = 8;
const REQUEST_DEADLINE: Duration = Duration::from_secs(10);
const RATE_LIMIT_SLEEP: Duration = Duration::from_millis(100);

/// Queries a Valhalla-compatible `/route` endpoint and inspects the
/// returned maneuvers for bridge/river language.
pub struct ValhallaOracle {
    endpoint: url::Url,
}

impl ValhallaOracle {
    pub fn new(endpoint: url::Url) -> Self {
        ValhallaOracle { endpoint }
    }
}

#[derive(Deserialize)]
struct RouteResponse {
    trip: Option<Trip>,
}

#[derive(Deserialize)]
struct Trip {
    legs: Vec<Leg>,
}

#[derive(Deserialize)]
struct Leg {
    #[serde(default)]
    maneuvers: Vec<Maneuver>,
}

#[derive(Deserialize)]
struct Maneuver {
    #[serde(default)]
    instruction: String,
    #[serde(rename = "type", default)]
    maneuver_type: u32,
}

impl CrossingOracle for ValhallaOracle {
    fn check_crossing(&self, p: Point, q: Point) -> Option<bool> {
        let payload = serde_json::json!({
            "locations": [
                {"lat": p.lat, "lon": p.lon},
                {"lat": q.lat, "lon": q.lon},
            ],
            "costing": "auto",
            "directions_options": {"units": "kilometers"},
        });

        let endpoint = self.endpoint.clone();
        let verdict = actix_rt::System::new().block_on(async move {
            let client = awc::Client::builder().timeout(REQUEST_DEADLINE).finish();
            let mut resp = match client.post(endpoint.as_str()).send_json(&payload).await {
                Ok(resp) => resp,
                Err(e) => {
                    log::warn!("valhalla oracle request failed: {e}");
                    return None;
                }
            };
            if !resp.status().is_success() {
                log::warn!("valhalla oracle returned status {}", resp.status());
                return None;
            }
            let body: RouteResponse = match resp.json().await {
                Ok(body) => body,
                Err(e) => {
                    log::warn!("valhalla oracle response parse failed: {e}");
                    return None;
                }
            };
            Some(route_crosses_bridge(&body))
        });

        std::thread::sleep(RATE_LIMIT_SLEEP);
        verdict
    }
}

fn route_crosses_bridge(resp: &RouteResponse) -> bool {
    let Some(trip) = &resp.trip else {
        return false;
    };
    for leg in &trip.legs {
        for maneuver in &leg.maneuvers {
            let lower = maneuver.instruction.to_lowercase();
            if BRIDGE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
                return true;
            }
            if maneuver.maneuver_type == BRIDGE_MANEUVER_TYPE {
                return true;
            }
        }
    }
    false
}
