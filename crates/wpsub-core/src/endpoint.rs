//! Connection string parsing and derived service URLs.
//!
//! Format: `Endpoint=https://<host>;AccessKey=<key>;[Port=<port>;][Version=1.0;]`.
//! Keys are matched case-insensitively, unknown keys are ignored.

use url::Url;

use crate::auth::SigningKey;
use crate::error::{Result, WpsError};

/// Everything derived from one connection string. Immutable after parse.
#[derive(Debug, Clone)]
pub struct ConnectionDescriptor {
    /// Endpoint with the optional port override applied.
    pub service_host: Url,
    /// Endpoint with the port stripped; the service ignores port in `aud`.
    pub audience_base: Url,
    /// `service_host` with `http -> ws` / `https -> wss`.
    pub web_socket_host: Url,
    pub key: SigningKey,
}

impl ConnectionDescriptor {
    pub fn parse(conn: &str) -> Result<Self> {
        let mut endpoint = None;
        let mut key = None;
        let mut port = None;

        for part in conn.split(';') {
            let Some((k, v)) = part.split_once('=') else { continue };
            let v = v.trim();
            match k.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(v),
                "accesskey" => key = Some(v),
                "port" => port = Some(v),
                _ => {}
            }
        }

        let endpoint = endpoint
            .filter(|v| !v.is_empty())
            .ok_or_else(|| WpsError::InvalidConnectionString("missing Endpoint".into()))?;
        let key = key
            .filter(|v| !v.is_empty())
            .ok_or_else(|| WpsError::InvalidConnectionString("missing AccessKey".into()))?;

        let base = Url::parse(endpoint)
            .map_err(|e| WpsError::InvalidConnectionString(format!("bad Endpoint {endpoint}: {e}")))?;
        let ws_scheme = match base.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => {
                return Err(WpsError::InvalidConnectionString(format!(
                    "unsupported endpoint scheme: {other}"
                )))
            }
        };

        let mut audience_base = base.clone();
        audience_base.set_path("/");
        audience_base.set_query(None);
        audience_base.set_fragment(None);
        set_port(&mut audience_base, None)?;

        let mut service_host = audience_base.clone();
        if let Some(p) = port.filter(|p| !p.is_empty()) {
            let p: u16 = p
                .parse()
                .map_err(|_| WpsError::InvalidConnectionString(format!("bad Port: {p}")))?;
            set_port(&mut service_host, Some(p))?;
        } else {
            set_port(&mut service_host, base.port())?;
        }

        let mut web_socket_host = service_host.clone();
        web_socket_host
            .set_scheme(ws_scheme)
            .map_err(|_| WpsError::InvalidConnectionString("cannot derive websocket host".into()))?;

        Ok(Self {
            service_host,
            audience_base,
            web_socket_host,
            key: SigningKey::new(key)?,
        })
    }

    /// Audience for client tokens of `hub` (also the token `aud`).
    pub fn client_audience(&self, hub: &str) -> String {
        format!("{}client/hubs/{hub}", self.audience_base)
    }

    /// WebSocket URL a client connects to for `hub`.
    pub fn client_url(&self, hub: &str) -> String {
        format!("{}client/hubs/{hub}", self.web_socket_host)
    }

    /// Management path root for `hub` (no trailing slash).
    pub fn service_audience(&self, hub: &str) -> String {
        format!("{}api/hubs/{hub}", self.audience_base)
    }
}

/// Token audience for a management request: the URL with its port removed.
pub fn audience_for(url: &Url) -> Result<String> {
    let mut aud = url.clone();
    set_port(&mut aud, None)?;
    Ok(aud.into())
}

fn set_port(url: &mut Url, port: Option<u16>) -> Result<()> {
    url.set_port(port)
        .map_err(|_| WpsError::InvalidConnectionString("endpoint cannot carry a port".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_endpoint_without_port() {
        let d = ConnectionDescriptor::parse("Endpoint=https://x.example;AccessKey=k1;").unwrap();
        assert_eq!(d.service_host.as_str(), "https://x.example/");
        assert_eq!(d.web_socket_host.as_str(), "wss://x.example/");
        assert_eq!(d.audience_base.as_str(), "https://x.example/");
    }

    #[test]
    fn port_override_kept_out_of_audience() {
        let d = ConnectionDescriptor::parse("Endpoint=http://localhost;Port=8080;AccessKey=k;Version=1.0;")
            .unwrap();
        assert_eq!(d.service_host.as_str(), "http://localhost:8080/");
        assert_eq!(d.web_socket_host.as_str(), "ws://localhost:8080/");
        assert_eq!(d.audience_base.as_str(), "http://localhost/");
    }

    #[test]
    fn per_hub_paths() {
        let d = ConnectionDescriptor::parse("Endpoint=https://x.example;AccessKey=k1").unwrap();
        assert_eq!(d.client_audience("chat"), "https://x.example/client/hubs/chat");
        assert_eq!(d.client_url("chat"), "wss://x.example/client/hubs/chat");
        assert_eq!(d.service_audience("chat"), "https://x.example/api/hubs/chat");
    }

    #[test]
    fn missing_fields_rejected() {
        let e = ConnectionDescriptor::parse("AccessKey=k1;").unwrap_err();
        assert_eq!(e.kind(), "INVALID_CONNECTION_STRING");
        let e = ConnectionDescriptor::parse("Endpoint=https://x.example;").unwrap_err();
        assert_eq!(e.kind(), "INVALID_CONNECTION_STRING");
        let e = ConnectionDescriptor::parse("Endpoint=https://x.example;AccessKey=;").unwrap_err();
        assert_eq!(e.kind(), "INVALID_CONNECTION_STRING");
    }

    #[test]
    fn audience_drops_port_keeps_path_and_query() {
        let url = Url::parse("http://localhost:8080/api/health?api-version=2020-10-01").unwrap();
        assert_eq!(
            audience_for(&url).unwrap(),
            "http://localhost/api/health?api-version=2020-10-01"
        );
    }

    #[test]
    fn audience_of_portless_url_is_an_error() {
        let url = Url::parse("mailto:someone@x.example").unwrap();
        assert_eq!(audience_for(&url).unwrap_err().kind(), "INVALID_CONNECTION_STRING");
    }

    #[test]
    fn non_http_scheme_rejected() {
        assert!(ConnectionDescriptor::parse("Endpoint=ftp://x.example;AccessKey=k").is_err());
    }
}
