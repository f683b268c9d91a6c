/*!
# Overview

[irr-explorer][crate] is a client for the [IRR Explorer](https://irrexplorer.nlnog.net) API.
It looks up the routing and registry status of prefixes and autonomous systems, works out how the
returned prefixes overlap, and renders the results as terminal panels, JSON or CSV.

# Examples

## Looking up a prefix

[IrrExplorer::fetch_prefix_info] returns the queried prefix together with every less- and
more-specific prefix the service knows about. Records that fail validation are dropped, so every
returned [PrefixInfo] carries a valid CIDR prefix.

```no_run
use irr_explorer::{find_least_specific_prefix, IrrExplorer};

let explorer = IrrExplorer::new().unwrap();
let overlaps = explorer.fetch_prefix_info("192.0.2.0/24").unwrap();
for info in &overlaps {
    println!("{} {} {:?}", info.prefix, info.category_overall, info.bgp_origins);
}
println!("least specific: {:?}", find_least_specific_prefix(&overlaps));
```

## Looking up an ASN

```no_run
use irr_explorer::IrrExplorer;

let mut explorer = IrrExplorer::new().unwrap().base_url("https://irrexplorer.nlnog.net");
let response = explorer.fetch_asn_info("AS202196").unwrap();
let sets = explorer.fetch_asn_sets("AS202196").unwrap();
println!(
    "{} direct, {} overlapping, {} registries",
    response.direct_origin.len(),
    response.overlaps.len(),
    sets.sets_per_irr.len()
);
explorer.close();
```

## Failure handling

Timeouts and non-success HTTP answers degrade to empty results after the retry budget is used up.
A service that cannot be reached at all is reported as [IrrExplorerError::Unreachable]. Both
behaviors can be changed with [RetryPolicy].
*/

mod config;
mod display;
mod error;
mod format;
mod models;
mod overlaps;
mod query;
mod retry;
mod transport;
mod validate;

#[cfg(test)]
mod test_utils;

use serde_json::Value;
use std::fmt::Display;
use tracing::{debug, info, warn};

pub use config::{ExplorerConfig, DEFAULT_BASE_URL, DEFAULT_FOLLOW_UP_CONCURRENCY};
pub use display::{
    create_prefix_panel, get_rpki_status, get_status_style, render_as_sets, render_panel_groups,
};
pub use error::IrrExplorerError;
pub use format::{
    format_as_sets, format_direct_origins, format_overlapping_prefixes, format_prefix_result,
    CSV_HEADER,
};
pub use models::{
    parse_prefix_list, AsResponse, AsSets, Category, IrrRoute, Message, PrefixInfo, RpkiStatus,
};
pub use overlaps::{find_least_specific_prefix, severity, sort_and_group_panels, PanelGroup, PanelNode};
pub use query::{asn_query, prefix_query, OutputFormat};
pub use retry::{ExhaustedAction, RetryDecision, RetryOutcome, RetryPolicy};
pub use transport::{HttpTransport, Transport, TransportError};
pub use validate::{normalize_asn, validate_asn_format, validate_prefix_format, validate_url_format};

/// IrrExplorer maintains the service URL and the pooled HTTP connection used for queries.
///
/// The connection is released by [IrrExplorer::close], which is idempotent and also runs when
/// the client is dropped.
///
/// See [module doc][crate#examples] for usage examples.
pub struct IrrExplorer {
    pub base_url: String,
    policy: RetryPolicy,
    follow_up_concurrency: usize,
    transport: Box<dyn Transport>,
    closed: bool,
}

impl IrrExplorer {
    /// Construct a new client against the default instance.
    ///
    /// # Examples
    /// ```
    /// use irr_explorer::IrrExplorer;
    /// let explorer = IrrExplorer::new().unwrap();
    /// assert_eq!(explorer.base_url, "https://irrexplorer.nlnog.net");
    /// ```
    pub fn new() -> Result<Self, IrrExplorerError> {
        Self::from_config(&ExplorerConfig::default())
    }

    /// Construct a client from a loaded [ExplorerConfig].
    pub fn from_config(config: &ExplorerConfig) -> Result<Self, IrrExplorerError> {
        let transport = HttpTransport::new(config.timeout())?;
        Ok(Self::with_transport(&config.base_url, transport)
            .retry_policy(config.retry_policy())
            .follow_up_concurrency(config.follow_up_concurrency))
    }

    /// Construct a client on top of a custom [Transport].
    pub fn with_transport<S: Display, T: Transport + 'static>(base_url: S, transport: T) -> Self {
        IrrExplorer {
            base_url: base_url.to_string().trim_end_matches('/').to_string(),
            policy: RetryPolicy::default(),
            follow_up_concurrency: DEFAULT_FOLLOW_UP_CONCURRENCY,
            transport: Box::new(transport),
            closed: false,
        }
    }

    /// Configure the service URL.
    ///
    /// # Examples
    /// ```
    /// let explorer = irr_explorer::IrrExplorer::new()
    ///     .unwrap()
    ///     .base_url("https://irrexplorer.example.com/");
    /// assert_eq!(explorer.base_url, "https://irrexplorer.example.com");
    /// ```
    pub fn base_url<S: Display>(mut self, url: S) -> Self {
        self.base_url = url.to_string().trim_end_matches('/').to_string();
        self
    }

    /// Replace the retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Limit how many overlap lookups a prefix query runs at once. Zero is treated as one.
    pub fn follow_up_concurrency(mut self, limit: usize) -> Self {
        self.follow_up_concurrency = limit.max(1);
        self
    }

    pub fn concurrency_limit(&self) -> usize {
        self.follow_up_concurrency
    }

    /// Fetch the prefix and every prefix overlapping it, in server order.
    ///
    /// Returns an empty list when the service has nothing or the request degraded.
    pub fn fetch_prefix_info(&self, prefix: &str) -> Result<Vec<PrefixInfo>, IrrExplorerError> {
        if !validate_prefix_format(prefix) {
            return Err(IrrExplorerError::InvalidPrefix(prefix.to_string()));
        }
        let url = format!("{}/api/prefixes/prefix/{}", self.base_url, prefix);
        Ok(self
            .run_query(url.as_str())?
            .map(parse_prefix_list)
            .unwrap_or_default())
    }

    /// Fetch the prefixes originated by `asn` and the prefixes overlapping them.
    ///
    /// `asn` may be given with or without the `AS` prefix.
    pub fn fetch_asn_info(&self, asn: &str) -> Result<AsResponse, IrrExplorerError> {
        let asn = normalize_asn(asn)?;
        let url = format!("{}/api/prefixes/asn/{}", self.base_url, asn);
        Ok(self
            .run_query(url.as_str())?
            .map(AsResponse::from_value)
            .unwrap_or_default())
    }

    /// Fetch the AS-sets containing `asn`, per IRR database.
    pub fn fetch_asn_sets(&self, asn: &str) -> Result<AsSets, IrrExplorerError> {
        let asn = normalize_asn(asn)?;
        let url = format!("{}/api/sets/{}", self.base_url, asn);
        Ok(self
            .run_query(url.as_str())?
            .map(AsSets::from_value)
            .unwrap_or_default())
    }

    /// Release the pooled connection. Calling it more than once has no effect.
    pub fn close(&mut self) {
        if !self.closed {
            self.transport.close();
            self.closed = true;
            debug!("closed irr explorer client for {}", self.base_url);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Run one GET request under the retry policy.
    ///
    /// `Ok(None)` means the request degraded and the caller should use its empty default.
    fn run_query(&self, url: &str) -> Result<Option<Value>, IrrExplorerError> {
        if self.closed {
            return Err(IrrExplorerError::ClientClosed);
        }
        debug!("sending irr explorer query to {}", url);
        match self.policy.run(url, || self.transport.get(url)) {
            RetryOutcome::Success(body) => match serde_json::from_str::<Value>(&body) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    warn!("malformed JSON response from {}: {}", url, e);
                    Ok(None)
                }
            },
            RetryOutcome::Degraded(e) => {
                info!("no data from {}: {}", url, e);
                Ok(None)
            }
            RetryOutcome::Surfaced(TransportError::Closed) => Err(IrrExplorerError::ClientClosed),
            RetryOutcome::Surfaced(e) => Err(IrrExplorerError::Unreachable {
                base_url: self.base_url.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

impl Drop for IrrExplorer {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{common_asn_data, common_prefix_info, init_test_logging, FakeTransport};
    use serde_json::json;
    use std::time::Duration;

    fn explorer(transport: FakeTransport) -> IrrExplorer {
        IrrExplorer::with_transport("https://irrexplorer.example.com/", transport)
            .retry_policy(RetryPolicy::new(2, Duration::ZERO))
    }

    fn timeout() -> TransportError {
        TransportError::Timeout("Timeout".to_string())
    }

    #[test]
    fn test_fetch_prefix_info() {
        let transport = FakeTransport::new(vec![Ok(json!([common_prefix_info()]).to_string())]);
        let requests = transport.requests();
        let explorer = explorer(transport);

        let result = explorer.fetch_prefix_info("192.0.2.0/24").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].prefix.to_string(), "192.0.2.0/24");
        assert_eq!(
            requests.lock().unwrap().as_slice(),
            ["https://irrexplorer.example.com/api/prefixes/prefix/192.0.2.0/24"]
        );
    }

    #[test]
    fn test_fetch_prefix_info_drops_invalid_records() {
        init_test_logging();
        let mut bad = common_prefix_info();
        bad["prefix"] = json!("invalid_format");
        let body = json!([bad, common_prefix_info()]).to_string();
        let explorer = explorer(FakeTransport::new(vec![Ok(body)]));

        let result = explorer.fetch_prefix_info("192.0.2.0/24").unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_fetch_prefix_info_empty_response() {
        let explorer = explorer(FakeTransport::new(vec![Ok("[]".to_string())]));
        assert!(explorer.fetch_prefix_info("192.0.2.0/24").unwrap().is_empty());
    }

    #[test]
    fn test_fetch_prefix_info_timeout() {
        init_test_logging();
        let transport = FakeTransport::new(vec![Err(timeout()), Err(timeout())]);
        let requests = transport.requests();
        let explorer = explorer(transport);

        let result = explorer.fetch_prefix_info("192.0.2.0/24").unwrap();
        assert!(result.is_empty());
        assert_eq!(requests.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_fetch_prefix_info_invalid_input() {
        let explorer = explorer(FakeTransport::new(vec![]));
        assert!(matches!(
            explorer.fetch_prefix_info("invalid"),
            Err(IrrExplorerError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn test_fetch_asn_info_timeout() {
        let explorer = explorer(FakeTransport::new(vec![Err(timeout()), Err(timeout())]));
        let result = explorer.fetch_asn_info("AS12345").unwrap();
        assert_eq!(result, AsResponse::default());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"directOrigin": [], "overlaps": []})
        );
    }

    #[test]
    fn test_fetch_asn_info_with_backoff() {
        init_test_logging();
        let transport = FakeTransport::new(vec![
            Err(TransportError::Reset("Timeout".to_string())),
            Ok(common_asn_data().to_string()),
        ]);
        let requests = transport.requests();
        let explorer = explorer(transport);

        let result = explorer.fetch_asn_info("12345").unwrap();
        assert_eq!(result.direct_origin.len(), 1);
        assert_eq!(
            requests.lock().unwrap().as_slice(),
            [
                "https://irrexplorer.example.com/api/prefixes/asn/AS12345",
                "https://irrexplorer.example.com/api/prefixes/asn/AS12345"
            ]
        );
    }

    #[test]
    fn test_fetch_asn_info_connection_error() {
        let refused = TransportError::Connect("Connection error".to_string());
        let explorer = explorer(FakeTransport::new(vec![Err(refused.clone()), Err(refused)]));
        match explorer.fetch_asn_info("AS12345") {
            Err(IrrExplorerError::Unreachable { base_url, .. }) => {
                assert_eq!(base_url, "https://irrexplorer.example.com")
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_connection_error_degrades_when_configured() {
        let refused = TransportError::Connect("Connection error".to_string());
        let explorer = explorer(FakeTransport::new(vec![Err(refused.clone()), Err(refused)]))
            .retry_policy(
                RetryPolicy::new(2, Duration::ZERO).on_connect_failure(ExhaustedAction::Degrade),
            );
        assert!(explorer.fetch_prefix_info("192.0.2.0/24").unwrap().is_empty());
    }

    #[test]
    fn test_fetch_asn_info_http_error() {
        let transport = FakeTransport::new(vec![Err(TransportError::Status(500))]);
        let requests = transport.requests();
        let explorer = explorer(transport);
        assert_eq!(explorer.fetch_asn_info("AS12345").unwrap(), AsResponse::default());
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_fetch_asn_sets() {
        let body = json!({"setsPerIrr": {"RIPE": ["AS-TEST"]}}).to_string();
        let transport = FakeTransport::new(vec![Ok(body)]);
        let requests = transport.requests();
        let explorer = explorer(transport);

        let sets = explorer.fetch_asn_sets("as202196").unwrap();
        assert_eq!(sets.sets_per_irr["RIPE"], vec!["AS-TEST".to_string()]);
        assert_eq!(
            requests.lock().unwrap().as_slice(),
            ["https://irrexplorer.example.com/api/sets/AS202196"]
        );
    }

    #[test]
    fn test_fetch_asn_sets_empty_and_timeout() {
        let explorer = explorer(FakeTransport::new(vec![
            Ok("null".to_string()),
            Err(timeout()),
            Err(timeout()),
            Ok("not json".to_string()),
        ]));
        assert_eq!(explorer.fetch_asn_sets("AS12345").unwrap(), AsSets::default());
        assert_eq!(explorer.fetch_asn_sets("AS12345").unwrap(), AsSets::default());
        assert_eq!(explorer.fetch_asn_sets("AS12345").unwrap(), AsSets::default());
    }

    #[test]
    fn test_close_is_idempotent() {
        let transport = FakeTransport::new(vec![]);
        let closes = transport.close_count();
        let mut explorer = explorer(transport);

        explorer.close();
        explorer.close();
        assert!(explorer.is_closed());
        assert!(matches!(
            explorer.fetch_asn_info("AS12345"),
            Err(IrrExplorerError::ClientClosed)
        ));
        drop(explorer);
        assert_eq!(*closes.lock().unwrap(), 1);
    }

    #[test]
    fn test_drop_releases_transport() {
        let transport = FakeTransport::new(vec![]);
        let closes = transport.close_count();
        {
            let _explorer = explorer(transport);
        }
        assert_eq!(*closes.lock().unwrap(), 1);
    }

    #[test]
    fn test_follow_up_concurrency() {
        let explorer = explorer(FakeTransport::new(vec![]));
        assert_eq!(explorer.concurrency_limit(), DEFAULT_FOLLOW_UP_CONCURRENCY);
        let explorer = explorer.follow_up_concurrency(0);
        assert_eq!(explorer.concurrency_limit(), 1);

        let config = ExplorerConfig {
            follow_up_concurrency: 8,
            ..Default::default()
        };
        let explorer = IrrExplorer::from_config(&config).unwrap();
        assert_eq!(explorer.concurrency_limit(), 8);
    }
}
