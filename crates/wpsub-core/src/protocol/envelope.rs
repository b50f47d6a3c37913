//! Normalized request envelope and CloudEvents attribute extraction.
//!
//! Binary content mode carries attributes as `ce-<name>` headers and the data
//! as the raw body. Structured mode (`application/cloudevents+json`) carries
//! everything in one JSON object, with binary data as `data_base64`.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde_json::Value;

use crate::error::{Result, WpsError};

/// Content type of a structured-mode CloudEvent.
pub const CLOUDEVENTS_JSON: &str = "application/cloudevents+json";

/// Header names are lower-cased, repeated headers comma-joined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventEnvelope {
    headers: BTreeMap<String, String>,
    body: Bytes,
}

impl EventEnvelope {
    /// Flatten a multi-valued header list and take ownership of the buffered body.
    pub fn normalize<I, K, V>(headers: I, body: Bytes) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map: BTreeMap<String, String> = BTreeMap::new();
        for (k, v) in headers {
            let name = k.as_ref().to_ascii_lowercase();
            let value = v.as_ref();
            map.entry(name)
                .and_modify(|cur| {
                    cur.push(',');
                    cur.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
        Self { headers: map, body }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Media type of the body without parameters, lower-cased.
    pub fn media_type(&self) -> Option<String> {
        self.header("content-type").map(media_type)
    }

    /// Extract CloudEvents attributes from either content mode.
    pub fn cloud_event(&self) -> Result<CloudEvent> {
        if self.media_type().as_deref() == Some(CLOUDEVENTS_JSON) {
            return self.structured();
        }

        let attr = |name: &str| self.header(&format!("ce-{name}")).map(str::to_string);
        Ok(CloudEvent {
            event_type: attr("type"),
            hub: attr("hub"),
            connection_id: attr("connectionid"),
            user_id: attr("userid"),
            event_name: attr("eventname"),
            signature: attr("signature"),
            data_content_type: self.media_type(),
            data: (!self.body.is_empty()).then(|| RawData::Inline(self.body.clone())),
        })
    }

    fn structured(&self) -> Result<CloudEvent> {
        let obj: serde_json::Map<String, Value> = serde_json::from_slice(&self.body)
            .map_err(|e| WpsError::MalformedEvent(format!("invalid structured cloudevent: {e}")))?;

        let attr = |name: &str| obj.get(name).and_then(Value::as_str).map(str::to_string);
        let mut data_content_type = attr("datacontenttype").map(|s| media_type(&s));

        let inline = match obj.get("data") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(Bytes::from(s.clone())),
            Some(other) => {
                data_content_type.get_or_insert_with(|| "application/json".to_string());
                Some(Bytes::from(other.to_string()))
            }
        };
        let base64 = attr("data_base64");

        let data = match (inline, base64) {
            (Some(_), Some(_)) => {
                return Err(WpsError::MalformedEvent(
                    "both data and data_base64 present".into(),
                ))
            }
            (Some(b), None) => Some(RawData::Inline(b)),
            (None, Some(s)) => Some(RawData::Base64(s)),
            (None, None) => None,
        };

        Ok(CloudEvent {
            event_type: attr("type"),
            hub: attr("hub"),
            connection_id: attr("connectionid"),
            user_id: attr("userid"),
            event_name: attr("eventname"),
            signature: attr("signature"),
            data_content_type,
            data,
        })
    }
}

/// Event data as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawData {
    /// Plain body (text, JSON or raw octets in binary mode).
    Inline(Bytes),
    /// Structured-mode `data_base64`, not yet decoded.
    Base64(String),
}

/// CloudEvents attributes relevant to the service's extension set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudEvent {
    pub event_type: Option<String>,
    pub hub: Option<String>,
    pub connection_id: Option<String>,
    pub user_id: Option<String>,
    pub event_name: Option<String>,
    pub signature: Option<String>,
    pub data_content_type: Option<String>,
    pub data: Option<RawData>,
}

fn media_type(raw: &str) -> String {
    raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}
