use std::collections::HashMap;

use crate::config::models::{ConfigDocument, Domain, Subdomain};
use crate::core::compiler::CompileOptions;

const HTTP_SCHEME: &str = "http://";
const HTTPS_SCHEME: &str = "https://";

/// How a site terminates TLS
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsDisposition {
    /// Plain HTTP, carried by the `http://` address prefix
    Disabled,
    /// Operator-supplied certificate and key
    CustomCert { cert: String, key: String },
    /// Locally issued certificate
    Internal,
}

/// An enabled domain together with everything served from its site block
#[derive(Debug, Clone)]
pub struct ResolvedSite<'a> {
    pub domain: &'a Domain,
    pub subdomains: Vec<&'a Subdomain>,
    pub addresses: Vec<String>,
    pub tls: TlsDisposition,
}

impl<'a> ResolvedSite<'a> {
    /// The comma-joined address list that opens the site block
    pub fn key(&self) -> String {
        self.addresses.join(", ")
    }

    pub fn serves_subdomain(&self, subdomain_id: &str) -> bool {
        self.subdomains.iter().any(|s| s.id == subdomain_id)
    }
}

/// Resolve every enabled domain in input order.
pub fn resolve_sites<'a>(
    doc: &'a ConfigDocument,
    options: &CompileOptions,
) -> Vec<ResolvedSite<'a>> {
    let mut by_domain: HashMap<&str, Vec<&Subdomain>> = HashMap::new();
    for sub in doc.subdomains.iter().filter(|s| s.enabled) {
        by_domain.entry(sub.domain_id.as_str()).or_default().push(sub);
    }

    doc.domains
        .iter()
        .filter(|d| d.enabled)
        .map(|domain| {
            let subdomains = by_domain.get(domain.id.as_str()).cloned().unwrap_or_default();
            resolve_site(domain, subdomains, options)
        })
        .collect()
}

fn resolve_site<'a>(
    domain: &'a Domain,
    subdomains: Vec<&'a Subdomain>,
    options: &CompileOptions,
) -> ResolvedSite<'a> {
    let port = effective_port(domain);
    let (explicit_scheme, bare_host) = split_scheme(domain.host.trim());
    let scheme = explicit_scheme.unwrap_or(if domain.tls_disabled {
        HTTP_SCHEME
    } else {
        HTTPS_SCHEME
    });

    let mut addresses = Vec::with_capacity(subdomains.len() + 1);
    addresses.push(format!("{scheme}{bare_host}:{port}"));
    for sub in &subdomains {
        addresses.push(format!("{scheme}{}.{bare_host}:{port}", sub.fragment.trim()));
    }

    ResolvedSite {
        domain,
        subdomains,
        addresses,
        tls: tls_disposition(domain, options),
    }
}

/// Explicit port, else 80 without TLS and 443 with it.
pub fn effective_port(domain: &Domain) -> String {
    match domain.port.port() {
        Some(port) => port.to_string(),
        None if domain.tls_disabled => "80".to_string(),
        None => "443".to_string(),
    }
}

fn split_scheme(host: &str) -> (Option<&'static str>, &str) {
    if let Some(rest) = host.strip_prefix(HTTPS_SCHEME) {
        (Some(HTTPS_SCHEME), rest)
    } else if let Some(rest) = host.strip_prefix(HTTP_SCHEME) {
        (Some(HTTP_SCHEME), rest)
    } else {
        (None, host)
    }
}

fn tls_disposition(domain: &Domain, options: &CompileOptions) -> TlsDisposition {
    if domain.tls_disabled {
        return TlsDisposition::Disabled;
    }
    let cert_file = domain.custom_cert.trim();
    if cert_file.is_empty() {
        return TlsDisposition::Internal;
    }
    TlsDisposition::CustomCert {
        cert: options.cert_path(cert_file),
        key: options.cert_path(&key_file_name(cert_file)),
    }
}

/// `site.pem` -> `site.key`; a name without an extension gets `.key` appended.
pub fn key_file_name(cert_file: &str) -> String {
    match cert_file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{stem}.key"),
        _ => format!("{cert_file}.key"),
    }
}
