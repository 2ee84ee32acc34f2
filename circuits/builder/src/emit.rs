//! Circom source emission.
//!
//! Nodes are visited in linear order and each one is handed to a single
//! dispatch function that matches on its [`NodeKind`]; adding a kind means
//! adding one arm there. Every identifier in the generated unit comes out of
//! one [`NameTable`], so labels, node ids and the auxiliary names derived from
//! them never collide.

use std::collections::{BTreeSet, HashSet};

use crate::config::CompilerConfig;
use crate::constants::{PLACEHOLDER_HEADER, RESERVED_IDENTIFIERS};
use crate::diagnostics::{has_fatal, Diagnostic};
use crate::error::EmitError;
use crate::graph::{hash_port, Node, NodeKind, Operator};
use crate::linearize::LinearOrder;
use crate::params::Primitive;

const INDENT: &str = "    ";

/// circomlib modules pulled in by the emitted code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Include {
    Comparators,
    Poseidon,
    Mux1,
}

impl Include {
    fn file(self) -> &'static str {
        match self {
            Include::Comparators => "comparators.circom",
            Include::Poseidon => "poseidon.circom",
            Include::Mux1 => "mux1.circom",
        }
    }
}

/// Allocates identifiers for one emitted unit.
#[derive(Debug)]
pub struct NameTable {
    taken: HashSet<String>,
}

impl NameTable {
    pub fn new(template_name: &str) -> Self {
        let mut taken: HashSet<String> = RESERVED_IDENTIFIERS
            .iter()
            .map(|name| name.to_string())
            .collect();
        taken.insert(template_name.to_string());
        Self { taken }
    }

    /// Claims `base` (or `base_2`, `base_3`, ...) together with every
    /// `name + suffix` in `derived`.
    pub fn allocate(&mut self, base: &str, derived: &[&str]) -> String {
        let mut candidate = base.to_string();
        let mut counter = 1u32;
        while !self.is_free(&candidate, derived) {
            counter += 1;
            candidate = format!("{base}_{counter}");
        }
        for suffix in derived {
            self.taken.insert(format!("{candidate}{suffix}"));
        }
        self.taken.insert(candidate.clone());
        candidate
    }

    fn is_free(&self, candidate: &str, derived: &[&str]) -> bool {
        !self.taken.contains(candidate)
            && derived
                .iter()
                .all(|suffix| !self.taken.contains(&format!("{candidate}{suffix}")))
    }
}

/// Signal identifier for an input/output label: `"Birth Year"` becomes
/// `birthYear`.
pub fn label_identifier(label: &str) -> String {
    let mut ident = String::with_capacity(label.len());
    let words = label
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty());
    for word in words {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if ident.is_empty() {
                ident.push(first.to_ascii_lowercase());
            } else {
                ident.push(first.to_ascii_uppercase());
            }
            ident.extend(chars);
        }
    }
    if ident.is_empty() {
        return "value".to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, 's');
    }
    ident
}

/// Identifier for an intermediate result: `n_` plus the id with every
/// non-alphanumeric character replaced by `_`.
pub fn node_identifier(id: &str) -> String {
    let mut ident = String::from("n_");
    ident.extend(
        id.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }),
    );
    ident
}

/// Whether `code` is a blocked-compilation stub rather than circuit source.
pub fn is_placeholder(code: &str) -> bool {
    code.starts_with(PLACEHOLDER_HEADER)
}

/// Stub returned in place of source when fatal diagnostics exist.
pub fn placeholder(diagnostics: &[Diagnostic]) -> String {
    let fatal: Vec<&Diagnostic> = diagnostics.iter().filter(|d| d.is_fatal()).collect();
    let mut lines = vec![
        PLACEHOLDER_HEADER.to_string(),
        format!(
            "// {} fatal diagnostic(s) must be resolved before source is generated",
            fatal.len()
        ),
    ];
    lines.extend(fatal.iter().map(|diagnostic| comment_line(&diagnostic.to_string())));
    finish_lines(lines)
}

fn blocked_by(error: &EmitError) -> String {
    finish_lines(vec![
        PLACEHOLDER_HEADER.to_string(),
        comment_line(&error.to_string()),
    ])
}

fn comment_line(text: &str) -> String {
    format!("// {}", text.replace(['\n', '\r'], " "))
}

fn finish_lines(lines: Vec<String>) -> String {
    let mut code = lines.join("\n");
    code.push('\n');
    code
}

pub struct CodeEmitter<'c> {
    config: &'c CompilerConfig,
}

impl<'c> CodeEmitter<'c> {
    pub fn new(config: &'c CompilerConfig) -> Self {
        Self { config }
    }

    /// Source for `order`, or a placeholder when `diagnostics` holds a fatal
    /// entry. Never returns partial source.
    pub fn emit(&self, order: &LinearOrder<'_>, diagnostics: &[Diagnostic]) -> String {
        if has_fatal(diagnostics) {
            return placeholder(diagnostics);
        }
        match self.try_emit(order) {
            Ok(code) => code,
            Err(err) => {
                tracing::warn!(error = %err, "emission refused a graph that passed validation");
                blocked_by(&err)
            }
        }
    }

    pub fn try_emit(&self, order: &LinearOrder<'_>) -> Result<String, EmitError> {
        let index = order.index();
        let mut emission = Emission::new(self.config);
        let mut results: Vec<Option<String>> = vec![None; index.graph().nodes.len()];

        for &position in order.positions() {
            let wired = index
                .incoming(position)
                .iter()
                .filter_map(|edge_idx| {
                    let (source, _) = index.endpoints(*edge_idx)?;
                    let value = results[source].clone()?;
                    Some((index.edge(*edge_idx).target_port.as_str(), value))
                })
                .collect();
            let ctx = NodeContext {
                node: index.node(position),
                wired,
            };
            results[position] = emission.node(&ctx)?;
        }

        tracing::debug!(
            nodes = order.len(),
            includes = emission.includes.len(),
            "emitted circuit source"
        );
        Ok(emission.finish())
    }
}

/// Source for `order` under the default configuration.
pub fn emit(order: &LinearOrder<'_>, diagnostics: &[Diagnostic]) -> String {
    CodeEmitter::new(&CompilerConfig::default()).emit(order, diagnostics)
}

struct NodeContext<'a> {
    node: &'a Node,
    /// `(target port, source expression)` for each wired input.
    wired: Vec<(&'a str, String)>,
}

impl NodeContext<'_> {
    fn port(&self, port: &str) -> Result<&str, EmitError> {
        self.wired
            .iter()
            .find(|(name, _)| *name == port)
            .map(|(_, value)| value.as_str())
            .ok_or_else(|| EmitError::UnwiredPort {
                node: self.node.id.clone(),
                port: port.to_string(),
            })
    }

    fn heading(&self, name: &str) -> String {
        format!("// {name}: {}", self.node.describe())
    }
}

struct Block {
    heading: Option<String>,
    lines: Vec<String>,
}

struct Emission<'c> {
    config: &'c CompilerConfig,
    names: NameTable,
    includes: BTreeSet<Include>,
    inputs: Vec<String>,
    outputs: Vec<String>,
    public: Vec<String>,
    blocks: Vec<Block>,
}

impl<'c> Emission<'c> {
    fn new(config: &'c CompilerConfig) -> Self {
        Self {
            config,
            names: NameTable::new(&config.template_name),
            includes: BTreeSet::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            public: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Emits one node and returns the expression carrying its value.
    fn node(&mut self, ctx: &NodeContext<'_>) -> Result<Option<String>, EmitError> {
        match &ctx.node.kind {
            NodeKind::PrivateInput { label } => Ok(Some(self.input(label, false))),
            NodeKind::PublicInput { label } => Ok(Some(self.input(label, true))),
            NodeKind::Operation { operator } => self.operation(ctx, *operator).map(Some),
            NodeKind::AdvancedOperation { operator, params } => {
                let primitive = Primitive::resolve(*operator, params, self.config).map_err(
                    |source| EmitError::Parameter {
                        node: ctx.node.id.clone(),
                        source,
                    },
                )?;
                self.primitive(ctx, primitive).map(Some)
            }
            NodeKind::BooleanOutput { label } | NodeKind::NumberOutput { label } => {
                self.output(ctx, label)?;
                Ok(None)
            }
        }
    }

    fn input(&mut self, label: &str, public: bool) -> String {
        let name = self.names.allocate(&label_identifier(label), &[]);
        self.inputs.push(format!("signal input {name};"));
        if public {
            self.public.push(name.clone());
        }
        name
    }

    fn output(&mut self, ctx: &NodeContext<'_>, label: &str) -> Result<(), EmitError> {
        let source = ctx.port("in")?;
        let name = self.names.allocate(&label_identifier(label), &[]);
        self.outputs.push(format!("signal output {name};"));
        self.push_block(None, vec![format!("{name} <== {source};")]);
        Ok(())
    }

    fn operation(&mut self, ctx: &NodeContext<'_>, operator: Operator) -> Result<String, EmitError> {
        let a = ctx.port("a")?;
        let b = ctx.port("b")?;
        let name = self.names.allocate(&node_identifier(&ctx.node.id), &[]);
        let bits = self.config.comparator_bits;
        let (lines, result) = match operator {
            Operator::Add | Operator::Subtract | Operator::Multiply => {
                let symbol = match operator {
                    Operator::Add => "+",
                    Operator::Subtract => "-",
                    _ => "*",
                };
                (
                    vec![format!("signal {name};"), format!("{name} <== {a} {symbol} {b};")],
                    name.clone(),
                )
            }
            Operator::Divide => (
                vec![
                    format!("signal {name};"),
                    format!("{name} <-- {a} / {b};"),
                    format!("{name} * {b} === {a};"),
                ],
                name.clone(),
            ),
            Operator::Gt | Operator::Lt | Operator::Eq => {
                self.includes.insert(Include::Comparators);
                let template = match operator {
                    Operator::Gt => format!("GreaterThan({bits})"),
                    Operator::Lt => format!("LessThan({bits})"),
                    _ => "IsEqual()".to_string(),
                };
                (
                    comparator(&name, &template, a, b),
                    format!("{name}.out"),
                )
            }
        };
        self.push_block(Some(ctx.heading(&name)), lines);
        Ok(result)
    }

    fn primitive(&mut self, ctx: &NodeContext<'_>, primitive: Primitive) -> Result<String, EmitError> {
        match primitive {
            Primitive::RangeCheck { min, max } => self.range_check(ctx, min, max),
            Primitive::Hash { inputs } => self.hash(ctx, inputs),
            Primitive::Conditional { condition } => self.conditional(ctx, condition),
            Primitive::MerkleProof { depth } => self.merkle_proof(ctx, depth),
            Primitive::Modulo { modulus } => self.modulo(ctx, modulus),
        }
    }

    fn range_check(&mut self, ctx: &NodeContext<'_>, min: u64, max: u64) -> Result<String, EmitError> {
        let value = ctx.port("in")?;
        let name = self
            .names
            .allocate(&node_identifier(&ctx.node.id), &["_ge", "_le"]);
        self.includes.insert(Include::Comparators);
        let bits = self.config.comparator_bits;
        let mut lines = comparator(
            &format!("{name}_ge"),
            &format!("GreaterEqThan({bits})"),
            value,
            &min.to_string(),
        );
        lines.extend(comparator(
            &format!("{name}_le"),
            &format!("LessEqThan({bits})"),
            value,
            &max.to_string(),
        ));
        lines.push(format!("signal {name};"));
        lines.push(format!("{name} <== {name}_ge.out * {name}_le.out;"));
        self.push_block(Some(ctx.heading(&name)), lines);
        Ok(name)
    }

    fn hash(&mut self, ctx: &NodeContext<'_>, inputs: usize) -> Result<String, EmitError> {
        let name = self.names.allocate(&node_identifier(&ctx.node.id), &[]);
        self.includes.insert(Include::Poseidon);
        let mut lines = vec![format!("component {name} = Poseidon({inputs});")];
        for position in 0..inputs {
            let value = ctx.port(&hash_port(position))?;
            lines.push(format!("{name}.inputs[{position}] <== {value};"));
        }
        self.push_block(Some(ctx.heading(&name)), lines);
        Ok(format!("{name}.out"))
    }

    fn conditional(&mut self, ctx: &NodeContext<'_>, condition: u64) -> Result<String, EmitError> {
        let selector = ctx.port("cond")?;
        let then_value = ctx.port("then")?;
        let else_value = ctx.port("else")?;
        let name = self.names.allocate(&node_identifier(&ctx.node.id), &["_sel"]);
        self.includes.insert(Include::Comparators);
        let mut lines = comparator(
            &format!("{name}_sel"),
            "IsEqual()",
            selector,
            &condition.to_string(),
        );
        lines.push(format!("signal {name};"));
        lines.push(format!(
            "{name} <== {name}_sel.out * ({then_value} - {else_value}) + {else_value};"
        ));
        self.push_block(Some(ctx.heading(&name)), lines);
        Ok(name)
    }

    fn merkle_proof(&mut self, ctx: &NodeContext<'_>, depth: u32) -> Result<String, EmitError> {
        let leaf = ctx.port("leaf")?;
        let root = ctx.port("root")?;
        let name = self
            .names
            .allocate(&node_identifier(&ctx.node.id), &["_level", "_mux", "_hash"]);
        let elements = self.names.allocate("pathElements", &[]);
        let indices = self.names.allocate("pathIndices", &[]);
        self.includes.extend([Include::Comparators, Include::Poseidon, Include::Mux1]);
        self.inputs.push(format!("signal input {elements}[{depth}];"));
        self.inputs.push(format!("signal input {indices}[{depth}];"));

        let level = format!("{name}_level");
        let mux = format!("{name}_mux");
        let hash = format!("{name}_hash");
        let body = INDENT;
        let mut lines = vec![
            format!("signal {level}[{}];", depth + 1),
            format!("component {mux}[{depth}];"),
            format!("component {hash}[{depth}];"),
            format!("{level}[0] <== {leaf};"),
            format!("for (var i = 0; i < {depth}; i++) {{"),
            format!("{body}{indices}[i] * (1 - {indices}[i]) === 0;"),
            format!("{body}{mux}[i] = MultiMux1(2);"),
            format!("{body}{mux}[i].c[0][0] <== {level}[i];"),
            format!("{body}{mux}[i].c[0][1] <== {elements}[i];"),
            format!("{body}{mux}[i].c[1][0] <== {elements}[i];"),
            format!("{body}{mux}[i].c[1][1] <== {level}[i];"),
            format!("{body}{mux}[i].s <== {indices}[i];"),
            format!("{body}{hash}[i] = Poseidon(2);"),
            format!("{body}{hash}[i].inputs[0] <== {mux}[i].out[0];"),
            format!("{body}{hash}[i].inputs[1] <== {mux}[i].out[1];"),
            format!("{body}{level}[i + 1] <== {hash}[i].out;"),
            "}".to_string(),
        ];
        lines.extend(comparator(
            &name,
            "IsEqual()",
            &format!("{level}[{depth}]"),
            root,
        ));
        self.push_block(Some(ctx.heading(&name)), lines);
        Ok(format!("{name}.out"))
    }

    fn modulo(&mut self, ctx: &NodeContext<'_>, modulus: u64) -> Result<String, EmitError> {
        let value = ctx.port("in")?;
        let name = self
            .names
            .allocate(&node_identifier(&ctx.node.id), &["_q", "_qbits", "_lt"]);
        self.includes.insert(Include::Comparators);
        let bits = self.config.comparator_bits;
        let mut lines = vec![
            format!("signal {name}_q;"),
            format!("signal {name};"),
            format!("{name}_q <-- {value} \\ {modulus};"),
            format!("{name} <-- {value} % {modulus};"),
            format!("{value} === {name}_q * {modulus} + {name};"),
            format!("component {name}_qbits = Num2Bits({bits});"),
            format!("{name}_qbits.in <== {name}_q;"),
        ];
        lines.extend(comparator(
            &format!("{name}_lt"),
            &format!("LessThan({bits})"),
            &name,
            &modulus.to_string(),
        ));
        lines.push(format!("{name}_lt.out === 1;"));
        self.push_block(Some(ctx.heading(&name)), lines);
        Ok(name)
    }

    fn push_block(&mut self, heading: Option<String>, lines: Vec<String>) {
        self.blocks.push(Block { heading, lines });
    }

    fn finish(self) -> String {
        let template = &self.config.template_name;
        let mut lines = vec![
            format!("pragma circom {};", self.config.circom_version),
            String::new(),
        ];
        if !self.includes.is_empty() {
            lines.extend(
                self.includes
                    .iter()
                    .map(|include| format!("include \"{}\";", self.config.include_path(include.file()))),
            );
            lines.push(String::new());
        }
        lines.push(format!("template {template}() {{"));
        lines.extend(
            self.inputs
                .iter()
                .chain(&self.outputs)
                .map(|declaration| format!("{INDENT}{declaration}")),
        );
        for block in &self.blocks {
            lines.push(String::new());
            lines.extend(block.heading.iter().map(|heading| format!("{INDENT}{heading}")));
            lines.extend(block.lines.iter().map(|line| format!("{INDENT}{line}")));
        }
        lines.push("}".to_string());
        lines.push(String::new());
        if self.public.is_empty() {
            lines.push(format!("component main = {template}();"));
        } else {
            lines.push(format!(
                "component main {{public [{}]}} = {template}();",
                self.public.join(", ")
            ));
        }
        finish_lines(lines)
    }
}

/// Instantiates a two-input comparator component.
fn comparator(name: &str, template: &str, left: &str, right: &str) -> Vec<String> {
    vec![
        format!("component {name} = {template};"),
        format!("{name}.in[0] <== {left};"),
        format!("{name}.in[1] <== {right};"),
    ]
}
