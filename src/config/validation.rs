use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv6Addr};
use thiserror::Error;

use crate::config::models::{ActionKind, ConfigDocument};
use crate::config::serde_helpers::LooseNumber;

static HOST_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(https?://)?(\*\.)?[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("Host name regex is valid at compile time")
});

/// Unit-suffixed spans with optional fractions, such as `1.5s` or `1h30m`
static DURATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+(\.[0-9]+)?(ns|us|µs|ms|s|m|h|d))+$")
        .expect("Duration regex is valid at compile time")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Configuration validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Duplicate id '{id}' in {collection}; the last entry wins")]
    DuplicateId { collection: String, id: String },

    #[error("{owner} references unknown {kind} '{id}'")]
    DanglingReference {
        owner: String,
        kind: String,
        id: String,
    },

    #[error("Handler '{id}' is attached to neither a domain nor a subdomain")]
    UnattachedHandler { id: String },

    #[error("Invalid port in {field}: '{value}' (expected 1-65535)")]
    InvalidPort { field: String, value: String },

    #[error("Invalid duration in {field}: '{value}'")]
    InvalidDuration { field: String, value: String },

    #[error("Invalid IP address or CIDR in {field}: '{value}'")]
    InvalidAddress { field: String, value: String },

    #[error("Invalid host name in {field}: '{value}'")]
    InvalidHost { field: String, value: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Advisory checks over a configuration document.
///
/// Nothing reported here stops compilation; the compiler skips whatever it
/// cannot render. The findings exist so an operator can see why.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Fold every finding into a single error
    pub fn validate(doc: &ConfigDocument) -> ValidationResult<()> {
        let errors = Self::lint(doc);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// All findings, grouped by collection in document order
    pub fn lint(doc: &ConfigDocument) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        Self::check_duplicates(doc, &mut errors);
        Self::check_general(doc, &mut errors);
        Self::check_domains(doc, &mut errors);
        Self::check_subdomains(doc, &mut errors);
        Self::check_handlers(doc, &mut errors);
        Self::check_access_lists(doc, &mut errors);
        Self::check_raw_routes(doc, &mut errors);

        errors
    }

    fn check_duplicates(doc: &ConfigDocument, errors: &mut Vec<ValidationError>) {
        let collections: [(&str, Vec<&str>); 7] = [
            ("domains", doc.domains.iter().map(|d| d.id.as_str()).collect()),
            ("subdomains", doc.subdomains.iter().map(|s| s.id.as_str()).collect()),
            ("handlers", doc.handlers.iter().map(|h| h.id.as_str()).collect()),
            ("accessLists", doc.access_lists.iter().map(|a| a.id.as_str()).collect()),
            ("basicAuths", doc.credentials.iter().map(|c| c.id.as_str()).collect()),
            ("headers", doc.headers.iter().map(|h| h.id.as_str()).collect()),
            ("layer4", doc.raw_routes.iter().map(|r| r.id.as_str()).collect()),
        ];

        for (collection, ids) in collections {
            let mut seen = HashSet::new();
            let mut reported = HashSet::new();
            for id in ids {
                if !seen.insert(id) && reported.insert(id) {
                    errors.push(ValidationError::DuplicateId {
                        collection: collection.to_string(),
                        id: id.to_string(),
                    });
                }
            }
        }
    }

    fn check_general(doc: &ConfigDocument, errors: &mut Vec<ValidationError>) {
        let general = &doc.general;
        Self::check_port("general http_port", &general.http_port, errors);
        Self::check_port("general https_port", &general.https_port, errors);

        for (name, raw) in [
            ("read_body", &general.timeout_read_body),
            ("read_header", &general.timeout_read_header),
            ("write", &general.timeout_write),
            ("idle", &general.timeout_idle),
        ] {
            Self::check_duration(&format!("general timeout {name}"), raw, errors);
        }
    }

    fn check_domains(doc: &ConfigDocument, errors: &mut Vec<ValidationError>) {
        let access_lists = ids(doc.access_lists.iter().map(|a| a.id.as_str()));
        let credentials = ids(doc.credentials.iter().map(|c| c.id.as_str()));

        for domain in &doc.domains {
            let owner = format!("domain '{}'", domain.id);

            if !Self::is_valid_host(&domain.host) {
                errors.push(ValidationError::InvalidHost {
                    field: format!("{owner} fromDomain"),
                    value: domain.host.clone(),
                });
            }
            Self::check_port(&format!("{owner} fromPort"), &domain.port, errors);
            Self::check_refs(&owner, "access list", &domain.access_lists, &access_lists, errors);
            Self::check_refs(&owner, "credential", &domain.credentials, &credentials, errors);
        }
    }

    fn check_subdomains(doc: &ConfigDocument, errors: &mut Vec<ValidationError>) {
        let domains = ids(doc.domains.iter().map(|d| d.id.as_str()));
        let access_lists = ids(doc.access_lists.iter().map(|a| a.id.as_str()));
        let credentials = ids(doc.credentials.iter().map(|c| c.id.as_str()));

        for sub in &doc.subdomains {
            let owner = format!("subdomain '{}'", sub.id);

            if !domains.contains(sub.domain_id.as_str()) {
                errors.push(ValidationError::DanglingReference {
                    owner: owner.clone(),
                    kind: "domain".to_string(),
                    id: sub.domain_id.clone(),
                });
            }
            if sub.fragment.trim().is_empty() {
                errors.push(ValidationError::InvalidField {
                    field: format!("{owner} fromDomain"),
                    message: "Subdomain name cannot be empty".to_string(),
                });
            }
            Self::check_refs(&owner, "access list", &sub.access_lists, &access_lists, errors);
            Self::check_refs(&owner, "credential", &sub.credentials, &credentials, errors);
        }
    }

    fn check_handlers(doc: &ConfigDocument, errors: &mut Vec<ValidationError>) {
        let domains = ids(doc.domains.iter().map(|d| d.id.as_str()));
        let subdomains = ids(doc.subdomains.iter().map(|s| s.id.as_str()));
        let access_lists = ids(doc.access_lists.iter().map(|a| a.id.as_str()));
        let credentials = ids(doc.credentials.iter().map(|c| c.id.as_str()));
        let headers = ids(doc.headers.iter().map(|h| h.id.as_str()));

        for handler in &doc.handlers {
            let owner = format!("handler '{}'", handler.id);

            match (handler.domain_id.is_empty(), handler.subdomain_id.is_empty()) {
                (true, true) => errors.push(ValidationError::UnattachedHandler {
                    id: handler.id.clone(),
                }),
                (false, true) if !domains.contains(handler.domain_id.as_str()) => {
                    errors.push(ValidationError::DanglingReference {
                        owner: owner.clone(),
                        kind: "domain".to_string(),
                        id: handler.domain_id.clone(),
                    });
                }
                (_, false) if !subdomains.contains(handler.subdomain_id.as_str()) => {
                    errors.push(ValidationError::DanglingReference {
                        owner: owner.clone(),
                        kind: "subdomain".to_string(),
                        id: handler.subdomain_id.clone(),
                    });
                }
                _ => {}
            }

            Self::check_refs(&owner, "access list", &handler.access_lists, &access_lists, errors);
            Self::check_refs(&owner, "credential", &handler.credentials, &credentials, errors);
            Self::check_refs(&owner, "header", &handler.headers, &headers, errors);

            Self::check_port(&format!("{owner} toPort"), &handler.upstream_port, errors);
            Self::check_port(&format!("{owner} health_port"), &handler.health.port, errors);
            if handler.load_balancing.retries.is_malformed::<u32>() {
                errors.push(ValidationError::InvalidField {
                    field: format!("{owner} lb_retries"),
                    message: format!(
                        "'{}' is not a non-negative integer",
                        handler.load_balancing.retries
                    ),
                });
            }

            for (name, raw) in [
                ("lb_try_duration", &handler.load_balancing.try_duration),
                ("lb_try_interval", &handler.load_balancing.try_interval),
                ("health_interval", &handler.health.interval),
                ("health_timeout", &handler.health.timeout),
                ("passive_health_fail_duration", &handler.passive_health.fail_duration),
                ("passive_health_unhealthy_latency", &handler.passive_health.unhealthy_latency),
            ] {
                Self::check_duration(&format!("{owner} {name}"), raw, errors);
            }

            let targets = handler.upstreams.iter().filter(|t| !t.trim().is_empty()).count();
            match &handler.action {
                ActionKind::ReverseProxy if targets == 0 => {
                    errors.push(ValidationError::InvalidField {
                        field: format!("{owner} toDomain"),
                        message: "Proxy handlers need at least one upstream".to_string(),
                    });
                }
                ActionKind::Redirect if targets > 1 => {
                    errors.push(ValidationError::InvalidField {
                        field: format!("{owner} toDomain"),
                        message: format!("Redirects use only the first of {targets} targets"),
                    });
                }
                _ => {}
            }
        }
    }

    fn check_access_lists(doc: &ConfigDocument, errors: &mut Vec<ValidationError>) {
        for list in &doc.access_lists {
            for ip in list.client_ips.iter().map(|ip| ip.trim()).filter(|ip| !ip.is_empty()) {
                if !Self::is_valid_ip_or_cidr(ip) {
                    errors.push(ValidationError::InvalidAddress {
                        field: format!("access list '{}' clientIps", list.id),
                        value: ip.to_string(),
                    });
                }
            }
        }
    }

    fn check_raw_routes(doc: &ConfigDocument, errors: &mut Vec<ValidationError>) {
        for route in &doc.raw_routes {
            let owner = format!("layer4 route '{}'", route.id);
            Self::check_port(&format!("{owner} fromPort"), &route.from_port, errors);
            Self::check_port(&format!("{owner} toPort"), &route.upstream_port, errors);

            let version = route.proxy_protocol.trim();
            if !matches!(version, "" | "v1" | "v2") {
                errors.push(ValidationError::InvalidField {
                    field: format!("{owner} proxyProtocol"),
                    message: format!("'{version}' is not one of v1, v2"),
                });
            }
            Self::check_duration(
                &format!("{owner} passive_health_fail_duration"),
                &route.fail_duration,
                errors,
            );
        }
    }

    fn check_refs(
        owner: &str,
        kind: &str,
        refs: &[String],
        known: &HashSet<&str>,
        errors: &mut Vec<ValidationError>,
    ) {
        for id in refs.iter().filter(|id| !known.contains(id.as_str())) {
            errors.push(ValidationError::DanglingReference {
                owner: owner.to_string(),
                kind: kind.to_string(),
                id: id.clone(),
            });
        }
    }

    fn check_port(field: &str, port: &LooseNumber, errors: &mut Vec<ValidationError>) {
        if !port.is_blank() && port.port().is_none() {
            errors.push(ValidationError::InvalidPort {
                field: field.to_string(),
                value: port.raw().to_string(),
            });
        }
    }

    fn check_duration(field: &str, raw: &str, errors: &mut Vec<ValidationError>) {
        if !Self::is_valid_duration(raw) {
            errors.push(ValidationError::InvalidDuration {
                field: field.to_string(),
                value: raw.to_string(),
            });
        }
    }

    /// Blank, a bare number of seconds, a unit-suffixed span like `1.5s`,
    /// or a humantime span like `1m 30s`
    fn is_valid_duration(raw: &str) -> bool {
        let raw = raw.trim();
        raw.is_empty()
            || raw.bytes().all(|b| b.is_ascii_digit())
            || DURATION_REGEX.is_match(raw)
            || humantime::parse_duration(raw).is_ok()
    }

    fn is_valid_ip_or_cidr(value: &str) -> bool {
        let (addr, prefix) = match value.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (value, None),
        };
        let Ok(ip) = addr.parse::<IpAddr>() else {
            return false;
        };
        match prefix {
            None => true,
            Some(prefix) => {
                let max = if ip.is_ipv4() { 32 } else { 128 };
                prefix.parse::<u8>().is_ok_and(|p| p <= max)
            }
        }
    }

    fn is_valid_host(host: &str) -> bool {
        let host = host.trim();
        if host.is_empty() || host.len() > 253 {
            return false;
        }
        let bare = host
            .strip_prefix("https://")
            .or_else(|| host.strip_prefix("http://"))
            .unwrap_or(host);
        if let Some(inner) = bare.strip_prefix('[').and_then(|b| b.strip_suffix(']')) {
            return inner.parse::<Ipv6Addr>().is_ok();
        }
        HOST_REGEX.is_match(host)
    }

    /// Format multiple validation errors into a single message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        let mut message = format!("Found {} validation error(s):\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}

fn ids<'a>(iter: impl Iterator<Item = &'a str>) -> HashSet<&'a str> {
    iter.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::*;

    fn create_valid_document() -> ConfigDocument {
        ConfigDocument::builder()
            .general(GeneralSettings {
                http_port: "80".into(),
                timeout_idle: "2m".to_string(),
                ..GeneralSettings::enabled()
            })
            .domain(Domain {
                access_lists: vec!["a1".to_string()],
                credentials: vec!["c1".to_string()],
                ..Domain::new("d1", "example.com")
            })
            .subdomain(Subdomain::new("s1", "d1", "api"))
            .access_list(AccessControlList::new(
                "a1",
                vec!["10.0.0.0/8".to_string(), "2001:db8::1".to_string()],
            ))
            .credential(CredentialSet::new("c1", "admin", "hash"))
            .header(HeaderRule::new("x1", HeaderDirection::Up, "X-Real-IP", "{remote_host}"))
            .handler(RoutingHandler {
                headers: vec!["x1".to_string()],
                load_balancing: LoadBalancing {
                    try_duration: "1m30s".to_string(),
                    try_interval: "250".to_string(),
                    ..Default::default()
                },
                ..RoutingHandler::proxy("h1", "d1", vec!["app".to_string()], "3000")
            })
            .handler(RoutingHandler {
                subdomain_id: "s1".to_string(),
                ..RoutingHandler::redirect("h2", "", "https://example.com{uri}")
            })
            .raw_route(RawRoute {
                proxy_protocol: "v2".to_string(),
                ..RawRoute::new("l1", "443", vec!["10.0.0.2".to_string()], "443")
            })
            .build()
    }

    #[test]
    fn test_valid_document() {
        let doc = create_valid_document();
        assert!(ConfigValidator::lint(&doc).is_empty());
        assert!(ConfigValidator::validate(&doc).is_ok());
    }

    #[test]
    fn test_duplicate_ids_reported_once() {
        let mut doc = create_valid_document();
        doc.credentials.push(CredentialSet::new("c1", "other", "x"));
        doc.credentials.push(CredentialSet::new("c1", "third", "y"));

        let errors = ConfigValidator::lint(&doc);
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateId {
                collection: "basicAuths".to_string(),
                id: "c1".to_string(),
            }]
        );
    }

    #[test]
    fn test_dangling_references() {
        let mut doc = create_valid_document();
        doc.domains[0].access_lists.push("missing".to_string());
        doc.handlers[0].headers.push("nope".to_string());
        doc.subdomains[0].domain_id = "d9".to_string();

        let errors = ConfigValidator::lint(&doc);
        assert!(errors.contains(&ValidationError::DanglingReference {
            owner: "domain 'd1'".to_string(),
            kind: "access list".to_string(),
            id: "missing".to_string(),
        }));
        assert!(errors.contains(&ValidationError::DanglingReference {
            owner: "handler 'h1'".to_string(),
            kind: "header".to_string(),
            id: "nope".to_string(),
        }));
        assert!(errors.contains(&ValidationError::DanglingReference {
            owner: "subdomain 's1'".to_string(),
            kind: "domain".to_string(),
            id: "d9".to_string(),
        }));
    }

    #[test]
    fn test_unattached_handler() {
        let mut doc = create_valid_document();
        doc.handlers
            .push(RoutingHandler::proxy("h3", "", vec!["x".to_string()], "80"));

        let errors = ConfigValidator::lint(&doc);
        assert_eq!(errors, vec![ValidationError::UnattachedHandler { id: "h3".to_string() }]);
    }

    #[test]
    fn test_bad_ports_and_retries() {
        let mut doc = create_valid_document();
        doc.general.https_port = "70000".into();
        doc.handlers[0].upstream_port = "http".into();
        doc.handlers[0].load_balancing.retries = "-1".into();
        doc.raw_routes[0].from_port = "0".into();

        let errors = ConfigValidator::lint(&doc);
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.to_string().contains("general https_port")));
        assert!(errors.iter().any(|e| e.to_string().contains("lb_retries")));
    }

    #[test]
    fn test_bad_durations() {
        let mut doc = create_valid_document();
        doc.handlers[0].health.interval = "often".to_string();
        doc.general.timeout_write = "5 parsecs".to_string();

        let errors = ConfigValidator::lint(&doc);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, ValidationError::InvalidDuration { .. })));
    }

    #[test]
    fn test_fractional_durations_are_accepted() {
        let mut doc = create_valid_document();
        doc.handlers[0].health.interval = "1.5s".to_string();
        doc.handlers[0].load_balancing.try_interval = "250ms".to_string();
        doc.handlers[0].passive_health.fail_duration = "1h30m".to_string();
        doc.general.timeout_idle = "2m 30s".to_string();
        assert!(ConfigValidator::lint(&doc).is_empty());

        doc.handlers[0].passive_health.unhealthy_latency = "1.5".to_string();
        doc.raw_routes[0].fail_duration = "s5".to_string();
        let errors = ConfigValidator::lint(&doc);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, ValidationError::InvalidDuration { .. })));
    }

    #[test]
    fn test_bad_addresses() {
        let mut doc = create_valid_document();
        doc.access_lists[0].client_ips = vec![
            "10.0.0.1".to_string(),
            "10.0.0.0/33".to_string(),
            "not-an-ip".to_string(),
            "fe80::/64".to_string(),
        ];

        let errors = ConfigValidator::lint(&doc);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_host_names() {
        assert!(ConfigValidator::is_valid_host("example.com"));
        assert!(ConfigValidator::is_valid_host("https://example.com"));
        assert!(ConfigValidator::is_valid_host("*.example.com"));
        assert!(ConfigValidator::is_valid_host("localhost"));
        assert!(ConfigValidator::is_valid_host("[::1]"));
        assert!(!ConfigValidator::is_valid_host(""));
        assert!(!ConfigValidator::is_valid_host("bad host.com"));
        assert!(!ConfigValidator::is_valid_host("example.com:8080"));
    }

    #[test]
    fn test_handler_target_counts() {
        let mut doc = create_valid_document();
        doc.handlers[0].upstreams = vec![" ".to_string()];
        doc.handlers[1].upstreams.push("https://other.example".to_string());

        let errors = ConfigValidator::lint(&doc);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("at least one upstream"));
        assert!(errors[1].to_string().contains("first of 2 targets"));
    }

    #[test]
    fn test_proxy_protocol_values() {
        let mut doc = create_valid_document();
        doc.raw_routes[0].proxy_protocol = "v3".to_string();

        let errors = ConfigValidator::lint(&doc);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("proxyProtocol"));
    }

    #[test]
    fn test_validate_formats_numbered_list() {
        let mut doc = create_valid_document();
        doc.general.http_port = "eighty".into();
        doc.raw_routes[0].proxy_protocol = "v9".to_string();

        let err = ConfigValidator::validate(&doc).expect_err("Document should fail validation");
        let message = err.to_string();
        assert!(message.contains("Found 2 validation error(s)"));
        assert!(message.contains("  1. Invalid port in general http_port"));
        assert!(message.contains("  2. Invalid field"));
    }
}
