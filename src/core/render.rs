use crate::config::models::{
    AccessControlList, ActionKind, HeaderRule, PathMatch, RoutingHandler,
};
use crate::core::caddyfile::Directive;
use crate::core::compiler::CompileOptions;
use crate::core::index::EntityIndex;
use crate::core::sites::{ResolvedSite, TlsDisposition};
use crate::core::values::{duration, present, quote_arg, upstream_list};

const SITE_MATCHER_PREFIX: &str = "@al_";
const HANDLER_MATCHER_PREFIX: &str = "@al_h_";

/// Renders resolved sites into directive blocks.
pub struct SiteRenderer<'a> {
    index: &'a EntityIndex<'a>,
    handlers: &'a [RoutingHandler],
    options: &'a CompileOptions,
}

impl<'a> SiteRenderer<'a> {
    pub fn new(
        index: &'a EntityIndex<'a>,
        handlers: &'a [RoutingHandler],
        options: &'a CompileOptions,
    ) -> Self {
        Self {
            index,
            handlers,
            options,
        }
    }

    /// TLS, access log, access control, basic auth, then handlers, in that order.
    pub fn render(&self, site: &ResolvedSite<'_>) -> Directive {
        let domain = site.domain;
        let mut body = Vec::new();

        if let Some(tls) = self.tls_clause(site) {
            body.push(tls);
        }
        if domain.access_log {
            body.push(Directive::new("log"));
        }
        body.extend(self.access_control(&domain.access_lists, SITE_MATCHER_PREFIX));
        body.extend(self.basic_auth(&domain.credentials));

        for handler in self.handlers.iter().filter(|h| attaches_to(h, site)) {
            body.push(self.handler_block(handler));
        }

        Directive::new(site.key()).block(body)
    }

    fn tls_clause(&self, site: &ResolvedSite<'_>) -> Option<Directive> {
        let tls = match &site.tls {
            TlsDisposition::Disabled => return None,
            TlsDisposition::Internal => Directive::new("tls").arg("internal"),
            TlsDisposition::CustomCert { cert, key } => {
                Directive::new("tls").arg(cert.as_str()).arg(key.as_str())
            }
        };

        let domain = site.domain;
        match present(&domain.client_auth_mode) {
            None => Some(tls),
            Some(mode) => {
                let mut client_auth = vec![Directive::new("mode").arg(mode)];
                if let Some(pool) = present(&domain.client_auth_trust_pool) {
                    client_auth
                        .push(Directive::new("trusted_ca_cert").arg(self.options.cert_path(pool)));
                }
                Some(tls.child(Directive::new("client_auth").block(client_auth)))
            }
        }
    }

    /// A named IP matcher and a rejection rule per resolvable, non-empty list
    fn access_control(&self, ids: &[String], prefix: &str) -> Vec<Directive> {
        let mut out = Vec::new();
        for id in ids {
            let Some(list) = self.index.access_list(id) else {
                tracing::debug!(access_list = %id, "Skipping unresolved access list reference");
                continue;
            };
            let ips: Vec<&str> = list
                .client_ips
                .iter()
                .map(|ip| ip.trim())
                .filter(|ip| !ip.is_empty())
                .collect();
            if ips.is_empty() {
                tracing::debug!(access_list = %id, "Skipping access list with no addresses");
                continue;
            }

            let matcher = format!("{prefix}{}", list.id);
            out.push(
                Directive::new(matcher.as_str())
                    .block(vec![Directive::new(list.request_matcher.as_str()).args(ips)]),
            );
            let reject = rejection(list);
            out.push(if list.invert {
                reject.arg(matcher)
            } else {
                reject.arg("not").arg(matcher)
            });
        }
        out
    }

    fn basic_auth(&self, ids: &[String]) -> Vec<Directive> {
        ids.iter()
            .filter_map(|id| {
                let found = self.index.credential(id);
                if found.is_none() {
                    tracing::debug!(credential = %id, "Skipping unresolved credential reference");
                }
                found
            })
            .map(|cred| {
                Directive::new("basicauth").block(vec![
                    Directive::new(cred.username.as_str()).arg(cred.password.as_str()),
                ])
            })
            .collect()
    }

    fn handler_block(&self, handler: &RoutingHandler) -> Directive {
        let path = handler.path.trim();
        let mut block = match handler.path_match {
            PathMatch::Strip => Directive::new("handle_path"),
            PathMatch::Prefix => Directive::new("handle"),
        };
        if !path.is_empty() {
            block = match handler.path_match {
                PathMatch::Strip => block.arg(format!("{path}/*")),
                PathMatch::Prefix => block.arg(path),
            };
        }

        let mut body = Vec::new();
        body.extend(self.access_control(&handler.access_lists, HANDLER_MATCHER_PREFIX));
        body.extend(self.basic_auth(&handler.credentials));

        let headers = self.resolve_headers(&handler.headers);
        match &handler.action {
            ActionKind::ReverseProxy => {
                if let Some(proxy) = self.reverse_proxy(handler, &headers) {
                    body.push(proxy);
                }
            }
            ActionKind::Redirect => {
                body.extend(headers.iter().map(|h| generic_header(h)));
                if let Some(redirect) = redirect(handler) {
                    body.push(redirect);
                }
            }
            ActionKind::Unsupported(name) => {
                tracing::debug!(
                    handler = %handler.id,
                    action = %name,
                    "Handler action has no renderer"
                );
                body.extend(headers.iter().map(|h| generic_header(h)));
            }
        }

        block.block(body)
    }

    fn resolve_headers(&self, ids: &[String]) -> Vec<&'a HeaderRule> {
        ids.iter()
            .filter_map(|id| {
                let found = self.index.header(id);
                if found.is_none() {
                    tracing::debug!(header = %id, "Skipping unresolved header reference");
                }
                found
            })
            .collect()
    }

    fn reverse_proxy(
        &self,
        handler: &RoutingHandler,
        headers: &[&HeaderRule],
    ) -> Option<Directive> {
        let upstreams = upstream_list(&handler.upstreams, &handler.upstream_port);
        if upstreams.is_empty() {
            tracing::debug!(handler = %handler.id, "Proxy handler has no upstreams");
            return None;
        }

        let mut body: Vec<Directive> = headers.iter().map(|h| proxy_header(h)).collect();
        if let Some(transport) = transport(handler, self.options) {
            body.push(transport);
        }
        body.extend(load_balancing(handler));
        body.extend(health_checks(handler));
        body.extend(passive_health(handler));

        Some(Directive::new("reverse_proxy").args(upstreams).block(body))
    }
}

/// Handlers bound to a subdomain only render under the site that serves it.
fn attaches_to(handler: &RoutingHandler, site: &ResolvedSite<'_>) -> bool {
    if !handler.enabled {
        return false;
    }
    if !handler.subdomain_id.is_empty() {
        let served = site.serves_subdomain(&handler.subdomain_id);
        if !served {
            tracing::debug!(
                handler = %handler.id,
                subdomain = %handler.subdomain_id,
                site = %site.domain.id,
                "Handler subdomain is not served by this site"
            );
        }
        return served;
    }
    if handler.domain_id.is_empty() {
        tracing::debug!(handler = %handler.id, "Skipping handler with no attachment");
        return false;
    }
    handler.domain_id == site.domain.id
}

/// `abort`, or `respond [message] <code>` when the list carries a status.
fn rejection(list: &AccessControlList) -> Directive {
    let Some(code) = list.response_code.parse::<u16>().filter(|c| *c != 0) else {
        return Directive::new("abort");
    };
    let respond = Directive::new("respond");
    let respond = match present(&list.response_message) {
        Some(message) => respond.arg(quote_arg(message)),
        None => respond,
    };
    respond.arg(code.to_string())
}

fn generic_header(rule: &HeaderRule) -> Directive {
    header_directive("header", rule)
}

fn proxy_header(rule: &HeaderRule) -> Directive {
    header_directive(rule.direction.directive(), rule)
}

fn header_directive(name: &str, rule: &HeaderRule) -> Directive {
    let field = rule.field.trim();
    if rule.is_delete() {
        Directive::new(name).arg(format!("-{field}"))
    } else {
        Directive::new(name).arg(field).arg(quote_arg(&rule.value))
    }
}

/// NTLM wins over the HTTP transport, which is only emitted when it has options.
fn transport(handler: &RoutingHandler, options: &CompileOptions) -> Option<Directive> {
    let mut opts = Vec::new();
    if handler.proxy_tls {
        opts.push(Directive::new("tls"));
        if handler.proxy_tls_insecure {
            opts.push(Directive::new("tls_insecure_skip_verify"));
        }
    }

    if handler.ntlm {
        return Some(Directive::new("transport").arg("http_ntlm").block(opts));
    }
    if handler.proxy_tls {
        if let Some(name) = present(&handler.proxy_tls_server_name) {
            opts.push(Directive::new("tls_server_name").arg(name));
        }
        if let Some(bundle) = present(&handler.proxy_tls_trusted_ca_certs) {
            opts.push(Directive::new("tls_trusted_ca_certs").arg(options.cert_path(bundle)));
        }
    }
    if let Some(versions) = present(&handler.proxy_http_versions) {
        opts.push(Directive::new("versions").args(versions.split_whitespace()));
    }
    if let Some(keepalive) = present(&handler.proxy_keepalive) {
        opts.push(Directive::new("keepalive").arg(keepalive));
    }

    (!opts.is_empty()).then(|| Directive::new("transport").arg("http").block(opts))
}

fn load_balancing(handler: &RoutingHandler) -> Vec<Directive> {
    let lb = &handler.load_balancing;
    let mut out = Vec::new();
    if let Some(policy) = present(&lb.policy) {
        out.push(Directive::new("lb_policy").args(policy.split_whitespace()));
    }
    if let Some(retries) = lb.retries.positive() {
        out.push(Directive::new("lb_retries").arg(retries.to_string()));
    }
    if let Some(d) = duration(&lb.try_duration) {
        out.push(Directive::new("lb_try_duration").arg(d));
    }
    if let Some(d) = duration(&lb.try_interval) {
        out.push(Directive::new("lb_try_interval").arg(d));
    }
    out
}

fn health_checks(handler: &RoutingHandler) -> Vec<Directive> {
    let health = &handler.health;
    let mut out = Vec::new();
    if let Some(uri) = present(&health.uri) {
        out.push(Directive::new("health_uri").arg(uri));
    }
    if let Some(port) = health.port.port() {
        out.push(Directive::new("health_port").arg(port.to_string()));
    }
    if let Some(d) = duration(&health.interval) {
        out.push(Directive::new("health_interval").arg(d));
    }
    if let Some(d) = duration(&health.timeout) {
        out.push(Directive::new("health_timeout").arg(d));
    }
    out
}

fn passive_health(handler: &RoutingHandler) -> Vec<Directive> {
    let passive = &handler.passive_health;
    let mut out = Vec::new();
    if let Some(d) = duration(&passive.fail_duration) {
        out.push(Directive::new("fail_duration").arg(d));
    }
    if let Some(n) = passive.max_fails.positive() {
        out.push(Directive::new("max_fails").arg(n.to_string()));
    }
    if let Some(statuses) = present(&passive.unhealthy_status) {
        out.push(Directive::new("unhealthy_status").args(statuses.split_whitespace()));
    }
    if let Some(d) = duration(&passive.unhealthy_latency) {
        out.push(Directive::new("unhealthy_latency").arg(d));
    }
    if let Some(n) = passive.unhealthy_request_count.positive() {
        out.push(Directive::new("unhealthy_request_count").arg(n.to_string()));
    }
    out
}

/// Only the first target is used; any others are ignored.
fn redirect(handler: &RoutingHandler) -> Option<Directive> {
    let target = handler.upstreams.iter().map(|t| t.trim()).find(|t| !t.is_empty())?;
    let mut redir = Directive::new("redir").arg(target);
    if let Some(status) = handler.redirect_status.parse::<u16>() {
        redir = redir.arg(status.to_string());
    }
    Some(redir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::{
        ConfigDocument, Domain, HeaderDirection, LoadBalancing, PassiveHealth, Subdomain,
    };
    use crate::core::sites::resolve_sites;

    fn defaults() -> CompileOptions {
        CompileOptions::default()
    }

    #[test]
    fn test_transport_selection() {
        let mut handler = RoutingHandler::proxy("h1", "d1", vec!["a".to_string()], "80");
        assert!(transport(&handler, &defaults()).is_none());

        handler.proxy_tls = true;
        assert_eq!(
            transport(&handler, &defaults()),
            Some(Directive::new("transport").arg("http").block(vec![Directive::new("tls")]))
        );

        handler.ntlm = true;
        handler.proxy_tls_server_name = "backend.internal".to_string();
        assert_eq!(
            transport(&handler, &defaults()),
            Some(Directive::new("transport").arg("http_ntlm").block(vec![Directive::new("tls")]))
        );

        handler.proxy_tls = false;
        assert_eq!(
            transport(&handler, &defaults()),
            Some(Directive::new("transport").arg("http_ntlm").block(vec![]))
        );
    }

    #[test]
    fn test_insecure_skip_verify_in_both_transports() {
        let mut handler = RoutingHandler {
            proxy_tls: true,
            proxy_tls_insecure: true,
            ..RoutingHandler::proxy("h1", "d1", vec!["a".to_string()], "443")
        };
        assert_eq!(
            transport(&handler, &defaults()),
            Some(Directive::new("transport").arg("http").block(vec![
                Directive::new("tls"),
                Directive::new("tls_insecure_skip_verify"),
            ]))
        );

        handler.ntlm = true;
        assert_eq!(
            transport(&handler, &defaults()),
            Some(Directive::new("transport").arg("http_ntlm").block(vec![
                Directive::new("tls"),
                Directive::new("tls_insecure_skip_verify"),
            ]))
        );
    }

    #[test]
    fn test_http_transport_options() {
        let mut handler = RoutingHandler {
            proxy_tls: true,
            proxy_tls_server_name: "backend.internal".to_string(),
            proxy_tls_trusted_ca_certs: "internal-ca.pem".to_string(),
            proxy_http_versions: "1.1 2".to_string(),
            proxy_keepalive: "off".to_string(),
            ..RoutingHandler::proxy("h1", "d1", vec!["a".to_string()], "443")
        };
        assert_eq!(
            transport(&handler, &CompileOptions::with_certs_dir("/data/certs")),
            Some(Directive::new("transport").arg("http").block(vec![
                Directive::new("tls"),
                Directive::new("tls_server_name").arg("backend.internal"),
                Directive::new("tls_trusted_ca_certs").arg("/data/certs/internal-ca.pem"),
                Directive::new("versions").arg("1.1").arg("2"),
                Directive::new("keepalive").arg("off"),
            ]))
        );

        // Without TLS the CA bundle and server name have nothing to apply to
        handler.proxy_tls = false;
        assert_eq!(
            transport(&handler, &defaults()),
            Some(Directive::new("transport").arg("http").block(vec![
                Directive::new("versions").arg("1.1").arg("2"),
                Directive::new("keepalive").arg("off"),
            ]))
        );
    }

    #[test]
    fn test_passive_health_directives() {
        let handler = RoutingHandler {
            passive_health: PassiveHealth {
                fail_duration: "30".to_string(),
                max_fails: "3".into(),
                unhealthy_status: "500 5xx".to_string(),
                unhealthy_latency: "2s".to_string(),
                unhealthy_request_count: "0".into(),
            },
            ..RoutingHandler::proxy("h1", "d1", vec!["a".to_string()], "80")
        };
        assert_eq!(
            passive_health(&handler),
            vec![
                Directive::new("fail_duration").arg("30s"),
                Directive::new("max_fails").arg("3"),
                Directive::new("unhealthy_status").arg("500").arg("5xx"),
                Directive::new("unhealthy_latency").arg("2s"),
            ]
        );
    }

    #[test]
    fn test_rejection_forms() {
        let mut list = AccessControlList::new("a1", vec!["10.0.0.1".to_string()]);
        assert_eq!(rejection(&list), Directive::new("abort"));

        list.response_message = "Access denied".to_string();
        assert_eq!(rejection(&list), Directive::new("abort"));

        list.response_code = "403".into();
        assert_eq!(
            rejection(&list),
            Directive::new("respond").arg("\"Access denied\"").arg("403")
        );

        list.response_message.clear();
        assert_eq!(rejection(&list), Directive::new("respond").arg("403"));
    }

    #[test]
    fn test_attachment_rules() {
        let doc = ConfigDocument::builder()
            .domain(Domain::new("da", "a.example"))
            .domain(Domain::new("db", "b.example"))
            .subdomain(Subdomain::new("sb", "db", "api"))
            .build();
        let sites = resolve_sites(&doc, &defaults());
        let (site_a, site_b) = (&sites[0], &sites[1]);

        let direct = RoutingHandler::proxy("h1", "da", vec!["a".to_string()], "80");
        assert!(attaches_to(&direct, site_a));
        assert!(!attaches_to(&direct, site_b));

        let disabled = RoutingHandler {
            enabled: false,
            ..direct.clone()
        };
        assert!(!attaches_to(&disabled, site_a));

        let unattached = RoutingHandler::proxy("h2", "", vec!["a".to_string()], "80");
        assert!(!attaches_to(&unattached, site_a));
        assert!(!attaches_to(&unattached, site_b));

        // The subdomain decides, even against a mismatched domain id
        let foreign = RoutingHandler {
            subdomain_id: "sb".to_string(),
            ..direct.clone()
        };
        assert!(!attaches_to(&foreign, site_a));
        assert!(attaches_to(&foreign, site_b));
    }

    #[test]
    fn test_header_forms() {
        let set = HeaderRule::new("x1", HeaderDirection::Down, "X-Frame-Options", "DENY");
        let delete = HeaderRule::new("x2", HeaderDirection::Up, "Server", "");

        assert_eq!(
            proxy_header(&set),
            Directive::new("header_down").arg("X-Frame-Options").arg("DENY")
        );
        assert_eq!(proxy_header(&delete), Directive::new("header_up").arg("-Server"));
        assert_eq!(generic_header(&delete), Directive::new("header").arg("-Server"));
    }

    #[test]
    fn test_load_balancing_skips_defaults() {
        let mut handler = RoutingHandler::proxy("h1", "d1", vec!["a".to_string()], "80");
        handler.load_balancing = LoadBalancing {
            policy: "round_robin".to_string(),
            retries: "0".into(),
            try_duration: "5".to_string(),
            try_interval: String::new(),
        };

        assert_eq!(
            load_balancing(&handler),
            vec![
                Directive::new("lb_policy").arg("round_robin"),
                Directive::new("lb_try_duration").arg("5s"),
            ]
        );
    }

    #[test]
    fn test_redirect_uses_first_target_only() {
        let mut handler = RoutingHandler::redirect("h1", "d1", "https://new.example{uri}");
        handler.upstreams.push("https://ignored.example".to_string());
        assert_eq!(
            redirect(&handler),
            Some(Directive::new("redir").arg("https://new.example{uri}"))
        );

        handler.redirect_status = "308".into();
        assert_eq!(
            redirect(&handler),
            Some(Directive::new("redir").arg("https://new.example{uri}").arg("308"))
        );

        handler.upstreams.clear();
        assert_eq!(redirect(&handler), None);
    }
}
