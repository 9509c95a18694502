//! Minimal directive tree for the block-structured output format.
//!
//! The renderer builds `Directive`s; `format` turns a list of top-level
//! blocks into text with one tab per nesting level and a blank line after
//! each top-level block.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub args: Vec<String>,
    /// `Some` always renders braces, even when empty
    pub block: Option<Vec<Directive>>,
}

impl Directive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            block: None,
        }
    }

    /// An anonymous block, used for the global options section
    pub fn anonymous(children: Vec<Directive>) -> Self {
        Self::new("").block(children)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn block(mut self, children: Vec<Directive>) -> Self {
        self.block = Some(children);
        self
    }

    /// Appends a child, opening the block if needed
    pub fn child(mut self, child: Directive) -> Self {
        self.block.get_or_insert_with(Vec::new).push(child);
        self
    }
}

/// Serialise top-level blocks, each followed by a blank line
pub fn format(blocks: &[Directive]) -> String {
    let mut out = String::new();
    for block in blocks {
        write_directive(&mut out, block, 0);
        out.push('\n');
    }
    out
}

fn write_directive(out: &mut String, directive: &Directive, depth: usize) {
    indent(out, depth);

    let mut head = directive.name.clone();
    for arg in &directive.args {
        if !head.is_empty() {
            head.push(' ');
        }
        head.push_str(arg);
    }
    out.push_str(&head);

    match &directive.block {
        None => out.push('\n'),
        Some(children) => {
            if head.is_empty() {
                out.push_str("{\n");
            } else {
                out.push_str(" {\n");
            }
            for child in children {
                write_directive(out, child, depth + 1);
            }
            indent(out, depth);
            out.push_str("}\n");
        }
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}
