use crate::config::models::ConfigDocument;
use crate::core::caddyfile::{self, Directive};
use crate::core::global::global_options;
use crate::core::index::EntityIndex;
use crate::core::render::SiteRenderer;
use crate::core::sites::resolve_sites;

pub const DEFAULT_CERTS_DIR: &str = "./certs";

/// Knobs that do not belong to the document itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Directory custom certificates and CA pools are referenced from
    pub certs_dir: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            certs_dir: DEFAULT_CERTS_DIR.to_string(),
        }
    }
}

impl CompileOptions {
    pub fn with_certs_dir(certs_dir: impl Into<String>) -> Self {
        Self {
            certs_dir: certs_dir.into(),
        }
    }

    /// Forward-slash path of a file inside the certificate directory
    pub fn cert_path(&self, file_name: &str) -> String {
        let dir = self.certs_dir.replace('\\', "/");
        let dir = dir.trim_end_matches('/');
        if dir.is_empty() {
            file_name.to_string()
        } else {
            format!("{dir}/{file_name}")
        }
    }
}

/// Result of one compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutput {
    pub text: String,
    /// Number of site blocks emitted
    pub sites: usize,
}

/// Turns a `ConfigDocument` into Caddyfile text.
///
/// Compilation is total: dangling references, disabled entities and empty
/// upstream lists drop the affected fragment instead of failing. Identical
/// input always yields identical output.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn compile(&self, doc: &ConfigDocument) -> String {
        self.compile_detailed(doc).text
    }

    pub fn compile_detailed(&self, doc: &ConfigDocument) -> CompileOutput {
        let mut blocks: Vec<Directive> = vec![global_options(&doc.general, &doc.raw_routes)];

        if !doc.general.enabled {
            tracing::debug!("Site output disabled, emitting global options only");
            return CompileOutput {
                text: caddyfile::format(&blocks),
                sites: 0,
            };
        }

        let index = EntityIndex::build(doc);
        let renderer = SiteRenderer::new(&index, &doc.handlers, &self.options);
        let sites = resolve_sites(doc, &self.options);
        blocks.extend(sites.iter().map(|site| renderer.render(site)));

        tracing::debug!(
            sites = sites.len(),
            handlers = doc.handlers.len(),
            "Compiled configuration document"
        );

        CompileOutput {
            text: caddyfile::format(&blocks),
            sites: sites.len(),
        }
    }
}

/// Compile with default options.
pub fn compile(doc: &ConfigDocument) -> String {
    Compiler::default().compile(doc)
}
