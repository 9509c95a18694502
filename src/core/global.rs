use crate::config::models::{GeneralSettings, OriginateTls, RawRoute};
use crate::core::caddyfile::Directive;
use crate::core::values::{duration, present, upstream_list};

const DEFAULT_LAYER4_PORT: &str = "443";

/// The process-wide options block, including layer-4 routes.
pub fn global_options(general: &GeneralSettings, raw_routes: &[RawRoute]) -> Directive {
    let mut options = Vec::new();

    if let Some(port) = general.http_port.port() {
        options.push(Directive::new("http_port").arg(port.to_string()));
    }
    if let Some(port) = general.https_port.port() {
        options.push(Directive::new("https_port").arg(port.to_string()));
    }
    if let Some(level) = present(&general.log_level) {
        options.push(Directive::new("log").block(vec![Directive::new("level").arg(level)]));
    }
    if let Some(mode) = present(&general.auto_https) {
        options.push(Directive::new("auto_https").arg(mode));
    }
    if let Some(email) = present(&general.tls_email) {
        options.push(Directive::new("email").arg(email));
    }
    if let Some(servers) = servers_block(general) {
        options.push(servers);
    }
    if general.layer4_enabled && !raw_routes.is_empty() {
        let routes = raw_routes.iter().filter(|r| r.enabled).map(layer4_route).collect();
        options.push(Directive::new("layer4").block(routes));
    }

    Directive::anonymous(options)
}

fn servers_block(general: &GeneralSettings) -> Option<Directive> {
    let timeouts: Vec<Directive> = [
        ("read_body", &general.timeout_read_body),
        ("read_header", &general.timeout_read_header),
        ("write", &general.timeout_write),
        ("idle", &general.timeout_idle),
    ]
    .into_iter()
    .filter_map(|(name, raw)| duration(raw).map(|d| Directive::new(name).arg(d)))
    .collect();

    let mut children = Vec::new();
    if let Some(protocols) = present(&general.http_versions) {
        children.push(Directive::new("protocols").args(protocols.split_whitespace()));
    }
    if general.log_credentials {
        children.push(Directive::new("log_credentials"));
    }
    if !timeouts.is_empty() {
        children.push(Directive::new("timeouts").block(timeouts));
    }

    (!children.is_empty()).then(|| Directive::new("servers").block(children))
}

fn layer4_route(route: &RawRoute) -> Directive {
    let listen = route
        .from_port
        .port()
        .map(|p| p.to_string())
        .unwrap_or_else(|| DEFAULT_LAYER4_PORT.to_string());

    let mut body = Vec::new();

    if let Some(matcher) = present(&route.matcher).filter(|m| *m != "any") {
        let filters = route.match_domains.iter().map(|d| d.trim()).filter(|d| !d.is_empty());
        body.push(Directive::new("match").block(vec![Directive::new(matcher).args(filters)]));
    }

    let upstreams = upstream_list(&route.upstreams, &route.upstream_port);
    if !upstreams.is_empty() {
        let mut proxy_opts = Vec::new();
        let version = route.proxy_protocol.trim();
        if version == "v1" || version == "v2" {
            proxy_opts.push(Directive::new("proxy_protocol").arg(version));
        }
        if let Some(policy) = present(&route.lb_policy) {
            proxy_opts.push(Directive::new("lb_policy").args(policy.split_whitespace()));
        }
        if let Some(d) = duration(&route.fail_duration) {
            proxy_opts.push(Directive::new("passive_health_fail_duration").arg(d));
        }
        if let Some(n) = route.max_fails.positive() {
            proxy_opts.push(Directive::new("passive_health_max_fails").arg(n.to_string()));
        }
        body.push(Directive::new("proxy").args(upstreams).block(proxy_opts));
    }

    if route.terminate_tls {
        body.push(Directive::new("tls"));
    }
    match route.originate_tls {
        OriginateTls::Off => {}
        OriginateTls::Verify => body.push(Directive::new("tls_client")),
        OriginateTls::SkipVerify => body.push(
            Directive::new("tls_client").block(vec![Directive::new("insecure_skip_verify")]),
        ),
    }

    Directive::new(format!(":{listen}")).block(body)
}
