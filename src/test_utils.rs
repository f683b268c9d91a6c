//! Fixtures shared by the unit tests.
use crate::transport::{Transport, TransportError};
use crate::PrefixInfo;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Send crate logs to the test harness output. Safe to call from every test.
pub(crate) fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub(crate) fn common_rpki_route() -> Value {
    json!({
        "rpkiStatus": "VALID",
        "rpkiMaxLength": 24,
        "asn": 12345,
        "rpslText": "route: 192.0.2.0/24",
        "rpslPk": "192.0.2.0/24AS12345/ML24",
    })
}

pub(crate) fn common_prefix_info() -> Value {
    json!({
        "prefix": "192.0.2.0/24",
        "categoryOverall": "success",
        "rir": "RIPE",
        "rpkiRoutes": [common_rpki_route()],
        "bgpOrigins": [12345],
        "irrRoutes": {},
        "messages": [],
        "prefixSortKey": "1",
        "goodnessOverall": 1,
    })
}

pub(crate) fn common_asn_data() -> Value {
    json!({
        "directOrigin": [common_prefix_info()],
        "overlaps": [],
    })
}

pub(crate) fn common_sets_data() -> Value {
    json!({
        "setsPerIrr": {
            "RIPE": ["AS-TEST1", "AS-TEST2"],
            "ARIN": ["AS-TEST3"],
            "AFRINIC": ["AS-TEST4", "AS-TEST5", "AS-TEST6"],
        }
    })
}

/// Build a validated record from the common fixture with a few fields replaced.
pub(crate) fn prefix_info(prefix: &str, category: &str) -> PrefixInfo {
    let mut data = common_prefix_info();
    data["prefix"] = json!(prefix);
    data["categoryOverall"] = json!(category);
    data["rpkiRoutes"] = json!([]);
    PrefixInfo::from_value(data).unwrap()
}

/// Transport replaying scripted responses. Once the script runs out every
/// request answers with HTTP 404.
pub(crate) struct FakeTransport {
    responses: Mutex<VecDeque<Result<String, TransportError>>>,
    requests: Arc<Mutex<Vec<String>>>,
    closes: Arc<Mutex<usize>>,
}

impl FakeTransport {
    pub(crate) fn new(responses: Vec<Result<String, TransportError>>) -> Self {
        FakeTransport {
            responses: Mutex::new(responses.into()),
            requests: Arc::new(Mutex::new(vec![])),
            closes: Arc::new(Mutex::new(0)),
        }
    }

    pub(crate) fn requests(&self) -> Arc<Mutex<Vec<String>>> {
        self.requests.clone()
    }

    pub(crate) fn close_count(&self) -> Arc<Mutex<usize>> {
        self.closes.clone()
    }
}

impl Transport for FakeTransport {
    fn get(&self, url: &str) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(TransportError::Status(404)))
    }

    fn close(&mut self) {
        *self.closes.lock().unwrap() += 1;
    }
}

/// Transport answering by URL, for tests issuing concurrent requests.
pub(crate) struct RoutedTransport {
    routes: Vec<(String, Result<String, TransportError>)>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl RoutedTransport {
    pub(crate) fn new(routes: Vec<(&str, Result<String, TransportError>)>) -> Self {
        RoutedTransport {
            routes: routes
                .into_iter()
                .map(|(url, response)| (url.to_string(), response))
                .collect(),
            requests: Arc::new(Mutex::new(vec![])),
        }
    }

    pub(crate) fn requests(&self) -> Arc<Mutex<Vec<String>>> {
        self.requests.clone()
    }
}

impl Transport for RoutedTransport {
    fn get(&self, url: &str) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.routes
            .iter()
            .find(|(route, _)| url.ends_with(route.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or(Err(TransportError::Status(404)))
    }

    fn close(&mut self) {}
}

/// Transport that holds every request for a while and records how many were
/// in flight at once. `route` answers with `body`, everything else with `[]`.
pub(crate) struct SlowTransport {
    route: String,
    body: String,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl SlowTransport {
    pub(crate) fn new(route: &str, body: String, delay: Duration) -> Self {
        SlowTransport {
            route: route.to_string(),
            body,
            delay,
            in_flight: AtomicUsize::new(0),
            peak: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn peak(&self) -> Arc<AtomicUsize> {
        self.peak.clone()
    }

    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Transport for SlowTransport {
    fn get(&self, url: &str) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match url.ends_with(self.route.as_str()) {
            true => Ok(self.body.clone()),
            false => Ok("[]".to_string()),
        }
    }

    fn close(&mut self) {}
}
