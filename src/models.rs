//! Data model for IRR Explorer API responses.
//!
//! Every entity is parsed in two steps: the JSON is first deserialized into a
//! `Raw*` struct where every field is optional, then converted into the public
//! type with [TryFrom]. The conversion is where defaults are filled in and the
//! record invariants are checked, so a public value is always fully validated.
use crate::IrrExplorerError;
use ipnet::IpNet;
use itertools::Itertools;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tracing::warn;

/// RPKI route origin validation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpkiStatus {
    Valid,
    Invalid,
    Unknown,
    NotFound,
}

impl RpkiStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpkiStatus::Valid => "VALID",
            RpkiStatus::Invalid => "INVALID",
            RpkiStatus::Unknown => "UNKNOWN",
            RpkiStatus::NotFound => "NOT_FOUND",
        }
    }
}

impl Display for RpkiStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RpkiStatus {
    type Err = IrrExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VALID" => Ok(RpkiStatus::Valid),
            "INVALID" => Ok(RpkiStatus::Invalid),
            "UNKNOWN" => Ok(RpkiStatus::Unknown),
            "NOT_FOUND" => Ok(RpkiStatus::NotFound),
            other => Err(IrrExplorerError::InvalidRecord(format!(
                "unknown rpki status {}",
                other
            ))),
        }
    }
}

/// Health category assigned by the server to a prefix or a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Success,
    Info,
    Warning,
    Danger,
    Error,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Success => "success",
            Category::Info => "info",
            Category::Warning => "warning",
            Category::Danger => "danger",
            Category::Error => "error",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = IrrExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Category::Success),
            "info" => Ok(Category::Info),
            "warning" => Ok(Category::Warning),
            "danger" => Ok(Category::Danger),
            "error" => Ok(Category::Error),
            other => Err(IrrExplorerError::InvalidRecord(format!(
                "unknown category {}",
                other
            ))),
        }
    }
}

/// One registry or RPKI route object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrRoute {
    /// RPKI validation status of this route object
    pub rpki_status: RpkiStatus,
    /// ROA max length, only present for RPKI routes
    pub rpki_max_length: Option<u8>,
    /// origin ASN of the route object
    pub asn: u32,
    /// RPSL text of the object
    pub rpsl_text: String,
    /// RPSL primary key
    pub rpsl_pk: String,
}

/// Advisory message attached to a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub category: Category,
    pub text: String,
}

/// Status of one prefix as seen across BGP, RPKI and the IRR databases.
///
/// The `prefix` field is always a valid CIDR network: records whose prefix
/// does not parse are rejected during conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefixInfo {
    /// the prefix, IPv4 or IPv6
    pub prefix: IpNet,
    /// overall health category
    pub category_overall: Category,
    /// regional internet registry, if known
    pub rir: Option<String>,
    /// RPKI ROAs covering the prefix
    pub rpki_routes: Vec<IrrRoute>,
    /// origin ASNs seen in BGP, deduplicated in first-seen order
    pub bgp_origins: Vec<u32>,
    /// route objects per IRR database
    pub irr_routes: BTreeMap<String, Vec<IrrRoute>>,
    /// advisories in server order
    pub messages: Vec<Message>,
    /// opaque key, only used as the last tie-breaker when sorting
    pub prefix_sort_key: String,
    /// health score, higher is healthier
    pub goodness_overall: i64,
}

impl PrefixInfo {
    /// Mask length of the prefix.
    pub fn prefix_len(&self) -> u8 {
        self.prefix.prefix_len()
    }

    /// Parse one record from a JSON value.
    pub fn from_value(value: Value) -> Result<Self, IrrExplorerError> {
        let raw: RawPrefixInfo = serde_json::from_value(value)?;
        PrefixInfo::try_from(raw)
    }
}

impl Display for PrefixInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.prefix, self.category_overall)
    }
}

/// Results of an ASN query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsResponse {
    /// prefixes originated by the queried ASN
    pub direct_origin: Vec<PrefixInfo>,
    /// prefixes overlapping a directly originated prefix, announced by others
    pub overlaps: Vec<PrefixInfo>,
}

impl AsResponse {
    /// Parse an ASN query response. Anything that is not an object yields the
    /// empty response, and invalid records are dropped from their list.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return AsResponse::default();
        };
        AsResponse {
            direct_origin: parse_prefix_list(map.remove("directOrigin").unwrap_or(Value::Null)),
            overlaps: parse_prefix_list(map.remove("overlaps").unwrap_or(Value::Null)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.direct_origin.is_empty() && self.overlaps.is_empty()
    }
}

/// AS-set membership of an ASN, per IRR database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsSets {
    pub sets_per_irr: BTreeMap<String, Vec<String>>,
}

impl AsSets {
    /// Parse an AS-set response. `null`, non-objects and a missing
    /// `setsPerIrr` all yield the empty mapping. Non-string set names are skipped.
    pub fn from_value(value: Value) -> Self {
        let sets_per_irr = match value.get("setsPerIrr") {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(irr, sets)| {
                    let names = match sets {
                        Value::Array(items) => items
                            .iter()
                            .filter_map(|s| s.as_str().map(|s| s.to_string()))
                            .collect(),
                        _ => vec![],
                    };
                    (irr.clone(), names)
                })
                .collect(),
            _ => BTreeMap::new(),
        };
        AsSets { sets_per_irr }
    }

    pub fn is_empty(&self) -> bool {
        self.sets_per_irr.values().all(|sets| sets.is_empty())
    }
}

/// Parse a JSON array of prefix records, dropping every record that fails
/// validation. A value that is not an array yields an empty list.
pub fn parse_prefix_list(value: Value) -> Vec<PrefixInfo> {
    let Value::Array(items) = value else {
        return vec![];
    };
    items
        .into_iter()
        .filter_map(|item| match PrefixInfo::from_value(item) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("dropping invalid prefix record: {}", e);
                None
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawIrrRoute {
    rpki_status: Option<String>,
    rpki_max_length: Option<u8>,
    asn: Option<i64>,
    rpsl_text: Option<String>,
    rpsl_pk: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMessage {
    category: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPrefixInfo {
    prefix: Option<String>,
    category_overall: Option<String>,
    rir: Option<String>,
    rpki_routes: Option<Vec<Value>>,
    bgp_origins: Option<Vec<i64>>,
    irr_routes: Option<BTreeMap<String, Option<Vec<Value>>>>,
    messages: Option<Vec<Value>>,
    prefix_sort_key: Option<Value>,
    goodness_overall: Option<i64>,
}

fn parse_asn(asn: i64) -> Result<u32, IrrExplorerError> {
    match u32::try_from(asn) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(IrrExplorerError::InvalidRecord(format!(
            "asn {} out of range",
            asn
        ))),
    }
}

/// Parse the nested records of one prefix, dropping the ones that fail validation.
fn parse_nested<R, T>(items: Option<Vec<Value>>, prefix: &IpNet, kind: &str) -> Vec<T>
where
    R: DeserializeOwned,
    T: TryFrom<R, Error = IrrExplorerError>,
{
    items
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| {
            let parsed = serde_json::from_value::<R>(item)
                .map_err(IrrExplorerError::from)
                .and_then(T::try_from);
            match parsed {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("dropping invalid {} of {}: {}", kind, prefix, e);
                    None
                }
            }
        })
        .collect()
}

impl TryFrom<RawIrrRoute> for IrrRoute {
    type Error = IrrExplorerError;

    fn try_from(raw: RawIrrRoute) -> Result<Self, Self::Error> {
        let rpki_status = raw
            .rpki_status
            .ok_or_else(|| IrrExplorerError::InvalidRecord("route without rpkiStatus".to_string()))?
            .parse()?;
        let asn = raw
            .asn
            .ok_or_else(|| IrrExplorerError::InvalidRecord("route without asn".to_string()))?;
        Ok(IrrRoute {
            rpki_status,
            rpki_max_length: raw.rpki_max_length,
            asn: parse_asn(asn)?,
            rpsl_text: raw.rpsl_text.unwrap_or_default(),
            rpsl_pk: raw.rpsl_pk.unwrap_or_default(),
        })
    }
}

impl TryFrom<RawMessage> for Message {
    type Error = IrrExplorerError;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        let category = raw
            .category
            .ok_or_else(|| IrrExplorerError::InvalidRecord("message without category".to_string()))?
            .parse()?;
        Ok(Message {
            category,
            text: raw.text.unwrap_or_default(),
        })
    }
}

impl TryFrom<RawPrefixInfo> for PrefixInfo {
    type Error = IrrExplorerError;

    fn try_from(raw: RawPrefixInfo) -> Result<Self, Self::Error> {
        let prefix_str = raw
            .prefix
            .ok_or_else(|| IrrExplorerError::InvalidRecord("record without prefix".to_string()))?;
        let prefix = IpNet::from_str(prefix_str.trim()).map_err(|_| {
            IrrExplorerError::InvalidRecord(format!("invalid prefix {}", prefix_str))
        })?;
        let category_overall = raw
            .category_overall
            .ok_or_else(|| {
                IrrExplorerError::InvalidRecord(format!("{} without categoryOverall", prefix))
            })?
            .parse()?;

        let rpki_routes =
            parse_nested::<RawIrrRoute, IrrRoute>(raw.rpki_routes, &prefix, "rpki route");

        let bgp_origins = raw
            .bgp_origins
            .unwrap_or_default()
            .into_iter()
            .map(parse_asn)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .unique()
            .collect();

        let mut irr_routes = BTreeMap::new();
        for (irr, routes) in raw.irr_routes.unwrap_or_default() {
            let routes = parse_nested::<RawIrrRoute, IrrRoute>(routes, &prefix, "irr route");
            irr_routes.insert(irr, routes);
        }

        let messages = parse_nested::<RawMessage, Message>(raw.messages, &prefix, "message");

        let prefix_sort_key = match raw.prefix_sort_key {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
        };

        Ok(PrefixInfo {
            prefix,
            category_overall,
            rir: raw.rir,
            rpki_routes,
            bgp_origins,
            irr_routes,
            messages,
            prefix_sort_key,
            goodness_overall: raw.goodness_overall.unwrap_or(0),
        })
    }
}
