use serde::{Deserialize, Serialize};

use crate::config::serde_helpers::{LooseNumber, loose_bool, loose_string, null_default};

/// The structured deployment description the compiler consumes.
///
/// Field names on the wire follow the editing UI; every collection is optional.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ConfigDocument {
    #[serde(deserialize_with = "null_default")]
    pub general: GeneralSettings,
    #[serde(deserialize_with = "null_default")]
    pub domains: Vec<Domain>,
    #[serde(deserialize_with = "null_default")]
    pub subdomains: Vec<Subdomain>,
    #[serde(deserialize_with = "null_default")]
    pub handlers: Vec<RoutingHandler>,
    #[serde(rename = "accessLists", deserialize_with = "null_default")]
    pub access_lists: Vec<AccessControlList>,
    #[serde(rename = "basicAuths", deserialize_with = "null_default")]
    pub credentials: Vec<CredentialSet>,
    #[serde(deserialize_with = "null_default")]
    pub headers: Vec<HeaderRule>,
    #[serde(rename = "layer4", deserialize_with = "null_default")]
    pub raw_routes: Vec<RawRoute>,
}

impl ConfigDocument {
    /// Create a new document builder
    pub fn builder() -> ConfigDocumentBuilder {
        ConfigDocumentBuilder::default()
    }

    /// The document served when nothing has been stored yet.
    pub fn initial() -> Self {
        Self {
            general: GeneralSettings {
                http_port: LooseNumber::from("80"),
                https_port: LooseNumber::from("443"),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Builder for ConfigDocument, mostly useful in tests and tooling
#[derive(Default)]
pub struct ConfigDocumentBuilder {
    doc: ConfigDocument,
}

impl ConfigDocumentBuilder {
    pub fn general(mut self, general: GeneralSettings) -> Self {
        self.doc.general = general;
        self
    }

    pub fn domain(mut self, domain: Domain) -> Self {
        self.doc.domains.push(domain);
        self
    }

    pub fn subdomain(mut self, subdomain: Subdomain) -> Self {
        self.doc.subdomains.push(subdomain);
        self
    }

    pub fn handler(mut self, handler: RoutingHandler) -> Self {
        self.doc.handlers.push(handler);
        self
    }

    pub fn access_list(mut self, list: AccessControlList) -> Self {
        self.doc.access_lists.push(list);
        self
    }

    pub fn credential(mut self, credential: CredentialSet) -> Self {
        self.doc.credentials.push(credential);
        self
    }

    pub fn header(mut self, header: HeaderRule) -> Self {
        self.doc.headers.push(header);
        self
    }

    pub fn raw_route(mut self, route: RawRoute) -> Self {
        self.doc.raw_routes.push(route);
        self
    }

    pub fn build(self) -> ConfigDocument {
        self.doc
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GeneralSettings {
    #[serde(deserialize_with = "loose_bool")]
    pub enabled: bool,
    #[serde(rename = "enable_layer4", deserialize_with = "loose_bool")]
    pub layer4_enabled: bool,
    pub http_port: LooseNumber,
    pub https_port: LooseNumber,
    #[serde(deserialize_with = "null_default")]
    pub log_level: String,
    #[serde(deserialize_with = "null_default")]
    pub auto_https: String,
    #[serde(deserialize_with = "null_default")]
    pub tls_email: String,
    #[serde(deserialize_with = "null_default")]
    pub http_versions: String,
    #[serde(deserialize_with = "loose_string")]
    pub timeout_read_body: String,
    #[serde(deserialize_with = "loose_string")]
    pub timeout_read_header: String,
    #[serde(deserialize_with = "loose_string")]
    pub timeout_write: String,
    #[serde(deserialize_with = "loose_string")]
    pub timeout_idle: String,
    #[serde(deserialize_with = "loose_bool")]
    pub log_credentials: bool,
}

impl GeneralSettings {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Domain {
    #[serde(deserialize_with = "null_default")]
    pub id: String,
    #[serde(deserialize_with = "loose_bool")]
    pub enabled: bool,
    #[serde(rename = "fromDomain", deserialize_with = "null_default")]
    pub host: String,
    #[serde(rename = "fromPort")]
    pub port: LooseNumber,
    #[serde(rename = "disableTls", deserialize_with = "loose_bool")]
    pub tls_disabled: bool,
    #[serde(rename = "customCert", deserialize_with = "null_default")]
    pub custom_cert: String,
    #[serde(rename = "accessLog", deserialize_with = "loose_bool")]
    pub access_log: bool,
    #[serde(rename = "accesslist", deserialize_with = "null_default")]
    pub access_lists: Vec<String>,
    #[serde(rename = "basicauth", deserialize_with = "null_default")]
    pub credentials: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub client_auth_mode: String,
    #[serde(deserialize_with = "null_default")]
    pub client_auth_trust_pool: String,
    #[serde(deserialize_with = "null_default")]
    pub description: String,
}

impl Domain {
    /// An enabled domain with TLS on and every option at its default
    pub fn new(id: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            host: host.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Subdomain {
    #[serde(deserialize_with = "null_default")]
    pub id: String,
    #[serde(deserialize_with = "loose_bool")]
    pub enabled: bool,
    #[serde(rename = "reverse", deserialize_with = "null_default")]
    pub domain_id: String,
    #[serde(rename = "fromDomain", deserialize_with = "null_default")]
    pub fragment: String,
    #[serde(rename = "accesslist", deserialize_with = "null_default")]
    pub access_lists: Vec<String>,
    #[serde(rename = "basicauth", deserialize_with = "null_default")]
    pub credentials: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub description: String,
}

impl Subdomain {
    pub fn new(
        id: impl Into<String>,
        domain_id: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            domain_id: domain_id.into(),
            fragment: fragment.into(),
            ..Default::default()
        }
    }
}

/// Which request property an access list matches against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IpMatcher {
    #[default]
    RemoteIp,
    ClientIp,
}

impl IpMatcher {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpMatcher::RemoteIp => "remote_ip",
            IpMatcher::ClientIp => "client_ip",
        }
    }
}

impl From<String> for IpMatcher {
    fn from(value: String) -> Self {
        match value.trim() {
            "client_ip" => IpMatcher::ClientIp,
            _ => IpMatcher::RemoteIp,
        }
    }
}

impl From<IpMatcher> for String {
    fn from(value: IpMatcher) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AccessControlList {
    #[serde(deserialize_with = "null_default")]
    pub id: String,
    #[serde(rename = "accesslistName", deserialize_with = "null_default")]
    pub name: String,
    #[serde(rename = "clientIps", deserialize_with = "null_default")]
    pub client_ips: Vec<String>,
    /// `true` blocks the listed addresses, `false` admits only them
    #[serde(deserialize_with = "loose_bool")]
    pub invert: bool,
    #[serde(deserialize_with = "null_default")]
    pub request_matcher: IpMatcher,
    /// When set, rejected requests get this status instead of an aborted connection
    #[serde(rename = "http_response_code")]
    pub response_code: LooseNumber,
    #[serde(rename = "http_response_message", deserialize_with = "null_default")]
    pub response_message: String,
    #[serde(deserialize_with = "null_default")]
    pub description: String,
}

impl AccessControlList {
    pub fn new(id: impl Into<String>, client_ips: Vec<String>) -> Self {
        Self {
            id: id.into(),
            client_ips,
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CredentialSet {
    #[serde(deserialize_with = "null_default")]
    pub id: String,
    #[serde(rename = "basicauthuser", deserialize_with = "null_default")]
    pub username: String,
    #[serde(rename = "basicauthpass", deserialize_with = "null_default")]
    pub password: String,
    #[serde(deserialize_with = "null_default")]
    pub description: String,
}

impl CredentialSet {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }
}

/// Whether a header rule rewrites the upstream request or the downstream response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HeaderDirection {
    #[default]
    Up,
    Down,
}

impl HeaderDirection {
    pub fn directive(&self) -> &'static str {
        match self {
            HeaderDirection::Up => "header_up",
            HeaderDirection::Down => "header_down",
        }
    }
}

impl From<String> for HeaderDirection {
    fn from(value: String) -> Self {
        match value.trim() {
            "header_down" => HeaderDirection::Down,
            _ => HeaderDirection::Up,
        }
    }
}

impl From<HeaderDirection> for String {
    fn from(value: HeaderDirection) -> Self {
        value.directive().to_string()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HeaderRule {
    #[serde(deserialize_with = "null_default")]
    pub id: String,
    #[serde(rename = "headerUpDown", deserialize_with = "null_default")]
    pub direction: HeaderDirection,
    #[serde(rename = "headerType", deserialize_with = "null_default")]
    pub field: String,
    /// Empty means "delete the field"
    #[serde(rename = "headerValue", deserialize_with = "null_default")]
    pub value: String,
    #[serde(rename = "headerReplace", deserialize_with = "loose_bool")]
    pub replace: bool,
    #[serde(deserialize_with = "null_default")]
    pub description: String,
}

impl HeaderRule {
    pub fn new(
        id: impl Into<String>,
        direction: HeaderDirection,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            direction,
            field: field.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn is_delete(&self) -> bool {
        self.value.is_empty()
    }
}

/// How a handler's path is matched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PathMatch {
    /// `handle <path>`
    #[default]
    Prefix,
    /// `handle_path <path>/*`, the prefix is stripped before proxying
    Strip,
}

impl From<String> for PathMatch {
    fn from(value: String) -> Self {
        match value.trim() {
            "handle_path" => PathMatch::Strip,
            _ => PathMatch::Prefix,
        }
    }
}

impl From<PathMatch> for String {
    fn from(value: PathMatch) -> Self {
        match value {
            PathMatch::Prefix => "handle".to_string(),
            PathMatch::Strip => "handle_path".to_string(),
        }
    }
}

/// What a handler does with matched requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    #[default]
    ReverseProxy,
    Redirect,
    /// Any other directive name; the handler renders without an action body
    Unsupported(String),
}

impl From<String> for ActionKind {
    fn from(value: String) -> Self {
        match value.trim() {
            "" | "reverse_proxy" => ActionKind::ReverseProxy,
            "redir" | "redirect" => ActionKind::Redirect,
            other => ActionKind::Unsupported(other.to_string()),
        }
    }
}

impl From<ActionKind> for String {
    fn from(value: ActionKind) -> Self {
        match value {
            ActionKind::ReverseProxy => "reverse_proxy".to_string(),
            ActionKind::Redirect => "redir".to_string(),
            ActionKind::Unsupported(name) => name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoadBalancing {
    #[serde(rename = "lb_policy", deserialize_with = "null_default")]
    pub policy: String,
    #[serde(rename = "lb_retries")]
    pub retries: LooseNumber,
    #[serde(rename = "lb_try_duration", deserialize_with = "loose_string")]
    pub try_duration: String,
    #[serde(rename = "lb_try_interval", deserialize_with = "loose_string")]
    pub try_interval: String,
}

/// Active health-check settings.
///
/// Only uri/port/interval/timeout are rendered; the thresholds, expectations
/// and redirect flag are stored and round-tripped for later format revisions.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HealthCheck {
    #[serde(rename = "health_uri", deserialize_with = "null_default")]
    pub uri: String,
    #[serde(rename = "health_port")]
    pub port: LooseNumber,
    #[serde(rename = "health_interval", deserialize_with = "loose_string")]
    pub interval: String,
    #[serde(rename = "health_timeout", deserialize_with = "loose_string")]
    pub timeout: String,
    #[serde(rename = "health_passes")]
    pub passes: LooseNumber,
    #[serde(rename = "health_fails")]
    pub fails: LooseNumber,
    #[serde(rename = "health_status", deserialize_with = "loose_string")]
    pub expected_status: String,
    #[serde(rename = "health_body", deserialize_with = "loose_string")]
    pub expected_body: String,
    #[serde(rename = "health_follow_redirects", deserialize_with = "loose_bool")]
    pub follow_redirects: bool,
}

/// Passive health checking, judged from proxied traffic
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PassiveHealth {
    #[serde(rename = "passive_health_fail_duration", deserialize_with = "loose_string")]
    pub fail_duration: String,
    #[serde(rename = "passive_health_max_fails")]
    pub max_fails: LooseNumber,
    /// Space-separated status codes or classes such as `5xx`
    #[serde(rename = "passive_health_unhealthy_status", deserialize_with = "loose_string")]
    pub unhealthy_status: String,
    #[serde(rename = "passive_health_unhealthy_latency", deserialize_with = "loose_string")]
    pub unhealthy_latency: String,
    #[serde(rename = "passive_health_unhealthy_request_count")]
    pub unhealthy_request_count: LooseNumber,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RoutingHandler {
    #[serde(deserialize_with = "null_default")]
    pub id: String,
    #[serde(deserialize_with = "loose_bool")]
    pub enabled: bool,
    #[serde(rename = "reverse", deserialize_with = "null_default")]
    pub domain_id: String,
    #[serde(rename = "subdomain", deserialize_with = "null_default")]
    pub subdomain_id: String,
    #[serde(rename = "handleType", deserialize_with = "null_default")]
    pub path_match: PathMatch,
    #[serde(rename = "handlePath", deserialize_with = "null_default")]
    pub path: String,
    #[serde(rename = "accesslist", deserialize_with = "null_default")]
    pub access_lists: Vec<String>,
    #[serde(rename = "basicauth", deserialize_with = "null_default")]
    pub credentials: Vec<String>,
    #[serde(rename = "header", deserialize_with = "null_default")]
    pub headers: Vec<String>,
    #[serde(rename = "handleDirective", deserialize_with = "null_default")]
    pub action: ActionKind,
    #[serde(rename = "toDomain", deserialize_with = "null_default")]
    pub upstreams: Vec<String>,
    #[serde(rename = "toPort")]
    pub upstream_port: LooseNumber,
    #[serde(rename = "httpTls", deserialize_with = "loose_bool")]
    pub proxy_tls: bool,
    #[serde(rename = "http_tls_insecure_skip_verify", deserialize_with = "loose_bool")]
    pub proxy_tls_insecure: bool,
    #[serde(rename = "http_tls_server_name", deserialize_with = "null_default")]
    pub proxy_tls_server_name: String,
    /// CA bundle file name inside the certificate directory
    #[serde(rename = "http_tls_trusted_ca_certs", deserialize_with = "null_default")]
    pub proxy_tls_trusted_ca_certs: String,
    #[serde(rename = "http_version", deserialize_with = "loose_string")]
    pub proxy_http_versions: String,
    #[serde(rename = "http_keepalive", deserialize_with = "loose_string")]
    pub proxy_keepalive: String,
    #[serde(deserialize_with = "loose_bool")]
    pub ntlm: bool,
    #[serde(rename = "redir_status")]
    pub redirect_status: LooseNumber,
    #[serde(flatten)]
    pub load_balancing: LoadBalancing,
    #[serde(flatten)]
    pub health: HealthCheck,
    #[serde(flatten)]
    pub passive_health: PassiveHealth,
    #[serde(deserialize_with = "null_default")]
    pub description: String,
}

impl RoutingHandler {
    /// An enabled reverse-proxy handler attached directly to a domain
    pub fn proxy(
        id: impl Into<String>,
        domain_id: impl Into<String>,
        upstreams: Vec<String>,
        upstream_port: impl Into<LooseNumber>,
    ) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            domain_id: domain_id.into(),
            upstreams,
            upstream_port: upstream_port.into(),
            ..Default::default()
        }
    }

    /// An enabled redirect handler attached directly to a domain
    pub fn redirect(
        id: impl Into<String>,
        domain_id: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            domain_id: domain_id.into(),
            action: ActionKind::Redirect,
            upstreams: vec![target.into()],
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Layer4Protocol {
    #[default]
    Tcp,
    Udp,
}

impl From<String> for Layer4Protocol {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("udp") {
            Layer4Protocol::Udp
        } else {
            Layer4Protocol::Tcp
        }
    }
}

impl From<Layer4Protocol> for String {
    fn from(value: Layer4Protocol) -> Self {
        match value {
            Layer4Protocol::Tcp => "tcp".to_string(),
            Layer4Protocol::Udp => "udp".to_string(),
        }
    }
}

/// TLS towards a layer-4 upstream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OriginateTls {
    #[default]
    Off,
    Verify,
    SkipVerify,
}

impl From<String> for OriginateTls {
    fn from(value: String) -> Self {
        match value.trim() {
            "tls" => OriginateTls::Verify,
            "tls_insecure_skip_verify" => OriginateTls::SkipVerify,
            _ => OriginateTls::Off,
        }
    }
}

impl From<OriginateTls> for String {
    fn from(value: OriginateTls) -> Self {
        match value {
            OriginateTls::Off => String::new(),
            OriginateTls::Verify => "tls".to_string(),
            OriginateTls::SkipVerify => "tls_insecure_skip_verify".to_string(),
        }
    }
}

/// A raw TCP/UDP forwarding rule rendered into the global `layer4` block
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RawRoute {
    #[serde(deserialize_with = "null_default")]
    pub id: String,
    #[serde(deserialize_with = "loose_bool")]
    pub enabled: bool,
    #[serde(deserialize_with = "null_default")]
    pub sequence: String,
    #[serde(rename = "type", deserialize_with = "null_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_default")]
    pub protocol: Layer4Protocol,
    #[serde(rename = "fromDomain", deserialize_with = "null_default")]
    pub match_domains: Vec<String>,
    #[serde(rename = "fromPort")]
    pub from_port: LooseNumber,
    #[serde(rename = "matchers", deserialize_with = "null_default")]
    pub matcher: String,
    #[serde(rename = "toDomain", deserialize_with = "null_default")]
    pub upstreams: Vec<String>,
    #[serde(rename = "toPort")]
    pub upstream_port: LooseNumber,
    #[serde(rename = "terminateTls", deserialize_with = "loose_bool")]
    pub terminate_tls: bool,
    #[serde(rename = "proxyProtocol", deserialize_with = "null_default")]
    pub proxy_protocol: String,
    #[serde(deserialize_with = "null_default")]
    pub lb_policy: String,
    #[serde(rename = "passive_health_fail_duration", deserialize_with = "loose_string")]
    pub fail_duration: String,
    #[serde(rename = "passive_health_max_fails")]
    pub max_fails: LooseNumber,
    #[serde(deserialize_with = "null_default")]
    pub originate_tls: OriginateTls,
    #[serde(deserialize_with = "null_default")]
    pub description: String,
}

impl RawRoute {
    pub fn new(
        id: impl Into<String>,
        from_port: impl Into<LooseNumber>,
        upstreams: Vec<String>,
        upstream_port: impl Into<LooseNumber>,
    ) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            from_port: from_port.into(),
            upstreams,
            upstream_port: upstream_port.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ui_document() {
        let json = r#"{
            "general": {"enabled": true, "enable_layer4": false, "http_port": "80", "https_port": "", "log_level": "INFO"},
            "domains": [{"id": "d1", "enabled": true, "fromDomain": "example.com", "fromPort": "",
                         "accesslist": ["a1"], "basicauth": null, "disableTls": true, "customCert": ""}],
            "subdomains": [{"id": "s1", "enabled": true, "reverse": "d1", "fromDomain": "api"}],
            "handlers": [{"id": "h1", "enabled": true, "reverse": "d1", "handleType": "handle_path",
                          "handlePath": "/api", "handleDirective": "", "toDomain": ["10.0.0.1"],
                          "toPort": "8080", "lb_retries": 3, "health_passes": "2",
                          "health_follow_redirects": true}],
            "accessLists": [{"id": "a1", "clientIps": ["10.0.0.0/8"], "invert": false}],
            "basicAuths": [],
            "headers": [{"id": "x1", "headerUpDown": "header_down", "headerType": "X-Frame-Options",
                         "headerValue": "DENY", "headerReplace": ""}],
            "layer4": [{"id": "l1", "enabled": true, "protocol": "udp", "fromPort": "53",
                        "matchers": "any", "toDomain": ["1.1.1.1"], "toPort": 53}]
        }"#;

        let doc: ConfigDocument = serde_json::from_str(json).expect("Failed to decode document");

        assert!(doc.general.enabled);
        assert_eq!(doc.general.http_port.port(), Some(80));
        assert!(doc.general.https_port.is_blank());
        assert!(doc.domains[0].tls_disabled);
        assert!(doc.domains[0].credentials.is_empty());
        assert_eq!(doc.subdomains[0].domain_id, "d1");

        let handler = &doc.handlers[0];
        assert_eq!(handler.path_match, PathMatch::Strip);
        assert_eq!(handler.action, ActionKind::ReverseProxy);
        assert_eq!(handler.upstream_port.port(), Some(8080));
        assert_eq!(handler.load_balancing.retries.positive(), Some(3));
        assert_eq!(handler.health.passes.positive(), Some(2));
        assert!(handler.health.follow_redirects);

        assert_eq!(doc.headers[0].direction, HeaderDirection::Down);
        assert!(!doc.headers[0].replace);
        assert_eq!(doc.raw_routes[0].protocol, Layer4Protocol::Udp);
        assert_eq!(doc.raw_routes[0].upstream_port.port(), Some(53));
    }

    #[test]
    fn test_numeric_durations_and_statuses_decode() {
        let json = r#"{
            "general": {"timeout_idle": 30, "timeout_write": "1m"},
            "handlers": [{"id": "h", "lb_try_duration": 5, "lb_try_interval": 0.5,
                          "health_status": 200, "health_timeout": null,
                          "http_version": 1.1, "passive_health_fail_duration": 30,
                          "passive_health_max_fails": "3"}],
            "layer4": [{"id": "l", "passive_health_fail_duration": 10,
                        "originate_tls": "tls_insecure_skip_verify"}]
        }"#;

        let doc: ConfigDocument = serde_json::from_str(json).expect("Failed to decode document");

        assert_eq!(doc.general.timeout_idle, "30");
        assert_eq!(doc.general.timeout_write, "1m");
        let handler = &doc.handlers[0];
        assert_eq!(handler.load_balancing.try_duration, "5");
        assert_eq!(handler.load_balancing.try_interval, "0.5");
        assert_eq!(handler.health.expected_status, "200");
        assert!(handler.health.timeout.is_empty());
        assert_eq!(handler.proxy_http_versions, "1.1");
        assert_eq!(handler.passive_health.fail_duration, "30");
        assert_eq!(handler.passive_health.max_fails.positive(), Some(3));
        assert_eq!(doc.raw_routes[0].fail_duration, "10");
        assert_eq!(doc.raw_routes[0].originate_tls, OriginateTls::SkipVerify);
    }

    #[test]
    fn test_action_kind_from_wire() {
        assert_eq!(ActionKind::from(String::new()), ActionKind::ReverseProxy);
        assert_eq!(ActionKind::from("redir".to_string()), ActionKind::Redirect);
        assert_eq!(ActionKind::from("redirect".to_string()), ActionKind::Redirect);
        assert_eq!(
            ActionKind::from("file_server".to_string()),
            ActionKind::Unsupported("file_server".to_string())
        );
    }

    #[test]
    fn test_null_action_defaults_to_proxy() {
        let json = r#"{"id": "h", "handleDirective": null}"#;
        let handler: RoutingHandler = serde_json::from_str(json).expect("Failed to decode");
        assert_eq!(handler.action, ActionKind::ReverseProxy);
    }

    #[test]
    fn test_document_round_trips_through_yaml() {
        let doc = ConfigDocument::builder()
            .general(GeneralSettings::enabled())
            .domain(Domain::new("d1", "example.com"))
            .handler(RoutingHandler::redirect("h1", "d1", "https://other.example"))
            .build();

        let yaml = serde_yaml::to_string(&doc).expect("Failed to encode YAML");
        let back: ConfigDocument = serde_yaml::from_str(&yaml).expect("Failed to decode YAML");

        assert_eq!(back.domains[0].host, "example.com");
        assert_eq!(back.handlers[0].action, ActionKind::Redirect);
        assert_eq!(back.handlers[0].upstreams, vec!["https://other.example".to_string()]);
    }

    #[test]
    fn test_initial_document_ports() {
        let doc = ConfigDocument::initial();
        assert!(!doc.general.enabled);
        assert_eq!(doc.general.http_port.raw(), "80");
        assert_eq!(doc.general.https_port.raw(), "443");
    }
}
