//! GraphML violation witnesses.
//!
//! A witness is a chain of edges from an entry node to a violation node.
//! Each assignment step of the counterexample that comes from user code
//! contributes one node and the edge leading to it. Edges carry the
//! assignment as an assumption, the function entered, and the source line
//! with its token range.

use crate::error::{WitnessError, WitnessResult};
use crate::step::{GotoTrace, StepKind, TraceStep};
use crate::tokenizer::{tokenize_file, TokenMap};
use gbmc_expr::{Expr, ExprPrinter, SymbolTable, INTERNAL_PREFIX, TEMPORARY_MARKER};
use std::collections::HashMap;
use std::fmt::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// Header data of the witness graph.
#[derive(Debug, Clone)]
pub struct WitnessConfig {
    pub producer: String,
    pub source_language: String,
}

impl Default for WitnessConfig {
    fn default() -> Self {
        Self {
            producer: "GBMC".to_string(),
            source_language: "C".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessNode {
    pub id: String,
    pub entry: bool,
    pub violation: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WitnessEdge {
    pub source: String,
    pub target: String,
    pub origin_file_name: Option<String>,
    pub assumption: Option<String>,
    pub enter_function: Option<String>,
    pub startline: Option<u32>,
    pub endline: Option<u32>,
    pub tokens: Option<String>,
    pub sourcecode: Option<String>,
}

#[derive(Debug, Clone)]
enum Element {
    Node(WitnessNode),
    Edge(WitnessEdge),
}

/// (id, for, attr.name, attr.type, default)
const KEYS: &[(&str, &str, &str, &str, Option<&str>)] = &[
    ("assumption", "edge", "assumption", "string", None),
    ("enterFunction", "edge", "enterFunction", "string", None),
    ("startline", "edge", "startline", "int", None),
    ("endline", "edge", "endline", "int", None),
    ("tokens", "edge", "tokens", "string", None),
    ("sourcecode", "edge", "sourcecode", "string", None),
    ("originFileName", "edge", "originFileName", "string", None),
    ("entry", "node", "isEntryNode", "boolean", Some("false")),
    ("violation", "node", "isViolationNode", "boolean", Some("false")),
    ("sourcecodelang", "graph", "sourcecodelang", "string", None),
    ("producer", "graph", "producer", "string", None),
];

/// A witness graph. Nodes and edges keep their creation order.
#[derive(Debug, Clone)]
pub struct Witness {
    config: WitnessConfig,
    elements: Vec<Element>,
    node_count: usize,
    last_node: String,
}

impl Witness {
    /// A graph holding only the entry node.
    pub fn new(config: WitnessConfig) -> Self {
        let mut witness = Self {
            config,
            elements: Vec::new(),
            node_count: 0,
            last_node: String::new(),
        };
        witness.last_node = witness.add_node(true, false);
        witness
    }

    fn add_node(&mut self, entry: bool, violation: bool) -> String {
        let id = format!("n{}", self.node_count);
        self.node_count += 1;
        self.elements.push(Element::Node(WitnessNode {
            id: id.clone(),
            entry,
            violation,
        }));
        id
    }

    /// Add a node and an edge to it from the previous node. `edge`
    /// supplies the annotations; its endpoints are filled in here.
    pub fn extend(&mut self, mut edge: WitnessEdge) {
        let target = self.add_node(false, false);
        edge.source = std::mem::replace(&mut self.last_node, target.clone());
        edge.target = target;
        self.elements.push(Element::Edge(edge));
    }

    /// Close the chain with the violation node.
    pub fn finish(&mut self) {
        let target = self.add_node(false, true);
        let source = std::mem::replace(&mut self.last_node, target.clone());
        self.elements.push(Element::Edge(WitnessEdge {
            source,
            target,
            ..WitnessEdge::default()
        }));
    }

    pub fn nodes(&self) -> impl Iterator<Item = &WitnessNode> {
        self.elements.iter().filter_map(|e| match e {
            Element::Node(node) => Some(node),
            Element::Edge(_) => None,
        })
    }

    pub fn edges(&self) -> impl Iterator<Item = &WitnessEdge> {
        self.elements.iter().filter_map(|e| match e {
            Element::Edge(edge) => Some(edge),
            Element::Node(_) => None,
        })
    }

    /// The GraphML document, tab-indented.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, r#"<?xml version="1.0" encoding="utf-8"?>"#)?;
        writeln!(
            out,
            r#"<graphml xmlns="http://graphml.graphdrawing.org/xmlns" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#
        )?;
        for (id, target, name, ty, default) in KEYS {
            let open = format!(
                r#"<key id="{id}" for="{target}" attr.name="{name}" attr.type="{ty}""#
            );
            match default {
                Some(default) => {
                    writeln!(out, "\t{open}>")?;
                    writeln!(out, "\t\t<default>{default}</default>")?;
                    writeln!(out, "\t</key>")?;
                }
                None => writeln!(out, "\t{open}/>")?,
            }
        }

        writeln!(out, "\t<graph edgedefault=\"directed\">")?;
        data(out, 2, "sourcecodelang", &self.config.source_language)?;
        data(out, 2, "producer", &self.config.producer)?;

        for element in &self.elements {
            match element {
                Element::Node(node) => {
                    if !node.entry && !node.violation {
                        writeln!(out, "\t\t<node id=\"{}\"/>", node.id)?;
                        continue;
                    }
                    writeln!(out, "\t\t<node id=\"{}\">", node.id)?;
                    if node.entry {
                        data(out, 3, "entry", "true")?;
                    }
                    if node.violation {
                        data(out, 3, "violation", "true")?;
                    }
                    writeln!(out, "\t\t</node>")?;
                }
                Element::Edge(edge) => render_edge(out, edge)?,
            }
        }

        writeln!(out, "\t</graph>")?;
        writeln!(out, "</graphml>")
    }

    pub fn write_graphml(&self, path: &Path) -> WitnessResult<()> {
        std::fs::write(path, self.render()).map_err(|source| WitnessError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), nodes = self.node_count, "wrote witness");
        Ok(())
    }
}

fn render_edge(out: &mut String, edge: &WitnessEdge) -> std::fmt::Result {
    let startline = edge.startline.map(|l| l.to_string());
    let endline = edge.endline.map(|l| l.to_string());
    let fields = [
        ("originFileName", edge.origin_file_name.as_deref()),
        ("assumption", edge.assumption.as_deref()),
        ("enterFunction", edge.enter_function.as_deref()),
        ("startline", startline.as_deref()),
        ("endline", endline.as_deref()),
        ("tokens", edge.tokens.as_deref()),
        ("sourcecode", edge.sourcecode.as_deref()),
    ];
    let open = format!(
        "\t\t<edge source=\"{}\" target=\"{}\"",
        escape_xml(&edge.source),
        escape_xml(&edge.target)
    );
    if fields.iter().all(|(_, v)| v.is_none()) {
        return writeln!(out, "{open}/>");
    }
    writeln!(out, "{open}>")?;
    for (key, value) in fields {
        if let Some(value) = value {
            data(out, 3, key, value)?;
        }
    }
    writeln!(out, "\t\t</edge>")
}

fn data(out: &mut String, depth: usize, key: &str, value: &str) -> std::fmt::Result {
    writeln!(
        out,
        "{}<data key=\"{key}\">{}</data>",
        "\t".repeat(depth),
        escape_xml(value)
    )
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Builds witnesses from traces. Source files are tokenized once each.
pub struct WitnessGenerator<'a> {
    ns: &'a SymbolTable,
    config: WitnessConfig,
    token_cache: HashMap<String, Option<TokenMap>>,
}

impl<'a> WitnessGenerator<'a> {
    pub fn new(ns: &'a SymbolTable, config: WitnessConfig) -> Self {
        Self {
            ns,
            config,
            token_cache: HashMap::new(),
        }
    }

    pub fn generate(&mut self, trace: &GotoTrace<'_>) -> Witness {
        let mut witness = Witness::new(self.config.clone());
        let mut last_function = String::new();

        for step in trace.iter() {
            let Some(lhs) = self.qualifying_lhs(step) else {
                continue;
            };
            let location = &step.pc.location;
            let mut edge = WitnessEdge::default();
            if !location.file.is_empty() {
                edge.origin_file_name = Some(location.file.clone());
            }
            edge.assumption = self.assumption(step, lhs);

            let function = step
                .pc
                .function
                .strip_prefix("c::")
                .unwrap_or(&step.pc.function);
            if function != last_function {
                edge.enter_function = Some(function.to_string());
                last_function = function.to_string();
            }

            if location.line != 0 {
                edge.startline = Some(location.line);
                edge.endline = Some(location.line);
                if let Some(tokens) = self.line_tokens(&location.file, location.line) {
                    let first = tokens[0].0;
                    let last = tokens[tokens.len() - 1].0;
                    edge.tokens = Some(if tokens.len() == 1 {
                        first.to_string()
                    } else {
                        format!("{first},{last}")
                    });
                    let texts: Vec<&str> = tokens.iter().map(|(_, t)| t.as_str()).collect();
                    edge.sourcecode = Some(texts.join(" "));
                }
            }
            witness.extend(edge);
        }

        witness.finish();
        debug!(
            nodes = witness.nodes().count(),
            edges = witness.edges().count(),
            "built witness"
        );
        witness
    }

    /// Left-hand side of an assignment step from user code to a named,
    /// non-temporary variable.
    fn qualifying_lhs<'s>(&self, step: &'s TraceStep<'_>) -> Option<&'s Expr> {
        if step.kind != StepKind::Assignment {
            return None;
        }
        let location = step.pc.location.to_string();
        if location.contains("built-in") || location.contains("library") {
            return None;
        }
        let lhs = step.lhs.as_ref()?;
        let name = lhs.symbol_name()?;
        if name.contains(TEMPORARY_MARKER) {
            return None;
        }
        Some(lhs)
    }

    fn assumption(&self, step: &TraceStep<'_>, lhs: &Expr) -> Option<String> {
        if lhs.ty.is_array() {
            return None;
        }
        let value = step.value.as_ref()?;
        let mut printer = ExprPrinter::new(self.ns);
        let lhs_text = normalize_lhs(&printer.print(lhs));
        let value_text = normalize_value(&printer.print(value));

        let assumption = format!("{lhs_text} = {value_text};");
        let rhs_ty = &step.rhs.as_ref().unwrap_or(value).ty;
        let internal = assumption.contains(INTERNAL_PREFIX)
            || assumption.contains("&dynamic_")
            || assumption.contains("invalid-object")
            || rhs_ty.is_union()
            || rhs_ty.is_struct();
        (!internal).then_some(assumption)
    }

    /// Tokens on `line` of `file`, tokenizing the file on first use.
    fn line_tokens(&mut self, file: &str, line: u32) -> Option<Vec<(usize, String)>> {
        if file.is_empty() {
            return None;
        }
        let map = self
            .token_cache
            .entry(file.to_string())
            .or_insert_with(|| match tokenize_file(Path::new(file)) {
                Ok(map) => Some(map),
                Err(err) => {
                    warn!(file, %err, "cannot tokenize source file, witness has no source code");
                    None
                }
            })
            .as_ref()?;
        map.get(&line).filter(|tokens| !tokens.is_empty()).cloned()
    }
}

/// Build a witness for `trace` and write it to `path`.
pub fn generate_goto_trace_in_graphml_format(
    ns: &SymbolTable,
    trace: &GotoTrace<'_>,
    config: WitnessConfig,
    path: &Path,
) -> WitnessResult<Witness> {
    let witness = WitnessGenerator::new(ns, config).generate(trace);
    witness.write_graphml(path)?;
    Ok(witness)
}

/// Cut renaming decorations: everything from the first `@`, `&` or `$`.
fn normalize_lhs(text: &str) -> String {
    match text.find(|c| matches!(c, '@' | '&' | '$')) {
        Some(i) => text[..i].to_string(),
        None => text.to_string(),
    }
}

/// Cut at `@`, drop a float suffix, and close an unbalanced quote.
fn normalize_value(text: &str) -> String {
    let mut value = match text.find('@') {
        Some(i) => text[..i].to_string(),
        None => text.to_string(),
    };
    let number_len = value
        .strip_suffix(|c| c == 'f' || c == 'F')
        .filter(|number| is_decimal_literal(number))
        .map(str::len);
    if let Some(len) = number_len {
        value.truncate(len);
    }
    if value.matches('"').count() % 2 == 1 {
        value.push('"');
    }
    value
}

fn is_decimal_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    digits.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbmc_expr::{Location, Symbol, Type};
    use gbmc_goto::Instruction;
    use std::io::Write as _;

    fn ns() -> SymbolTable {
        let mut ns = SymbolTable::new();
        for (name, base) in [("c::main::x", "x"), ("c::f::y", "y")] {
            ns.insert(Symbol::variable(name, base, Type::int())).unwrap();
        }
        ns
    }

    fn int(v: i128) -> Expr {
        Expr::int(v, Type::int())
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_lhs("x@1#2"), "x");
        assert_eq!(normalize_lhs("p&0"), "p");
        assert_eq!(normalize_lhs("y$object"), "y");
        assert_eq!(normalize_value("5@3"), "5");
        assert_eq!(normalize_value("1.5f"), "1.5");
        assert_eq!(normalize_value("-2e3F"), "-2e3");
        assert_eq!(normalize_value("buf"), "buf");
        assert_eq!(normalize_value("&self"), "&self");
        assert_eq!(normalize_value("\"abc"), "\"abc\"");
        assert_eq!(normalize_value("\"abc\""), "\"abc\"");
    }

    #[test]
    fn test_minimal_witness() {
        let pc = Instruction::skip();
        let mut trace = GotoTrace::new();
        trace.push(TraceStep::assertion(&pc, 0, false)).unwrap();

        let witness = WitnessGenerator::new(&ns(), WitnessConfig::default()).generate(&trace);
        let nodes: Vec<_> = witness.nodes().collect();
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].entry && !nodes[0].violation);
        assert!(nodes[1].violation && !nodes[1].entry);
        let edges: Vec<_> = witness.edges().collect();
        assert_eq!(edges.len(), 1);
        assert_eq!((edges[0].source.as_str(), edges[0].target.as_str()), ("n0", "n1"));

        let text = witness.render();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<graphml"));
        assert!(text.contains("\t\t<node id=\"n0\">\n\t\t\t<data key=\"entry\">true</data>\n\t\t</node>\n"));
        assert!(text.contains("\t\t<edge source=\"n0\" target=\"n1\"/>\n"));
        assert!(text.contains("\t\t<data key=\"producer\">GBMC</data>\n"));
        assert!(text.ends_with("\t</graph>\n</graphml>\n"));
        assert!(text.find("<key id=\"producer\"").unwrap() < text.find("<graph ").unwrap());
    }

    #[test]
    fn test_chain_with_source() {
        let mut source = tempfile::NamedTempFile::new().unwrap();
        write!(source, "int main() {{\n  x = 1;\n}}\nvoid f() {{ y = 2; }}\n").unwrap();
        let file = source.path().to_string_lossy().to_string();

        let x = Expr::symbol("c::main::x", Type::int());
        let y = Expr::symbol("c::f::y", Type::int());
        let tmp = Expr::symbol("c::main::$tmp::t1", Type::int());
        let a = Instruction::assign(x.clone(), int(1))
            .with_location(Location::new(&file, 2))
            .with_function("c::main");
        let b = Instruction::assign(x.clone(), int(3))
            .with_location(Location::new(&file, 2))
            .with_function("c::main");
        let c = Instruction::assign(y.clone(), int(2))
            .with_location(Location::new(&file, 4))
            .with_function("c::f");
        let builtin = Instruction::assign(x.clone(), int(9))
            .with_location(Location::new("<built-in>", 1))
            .with_function("c::main");

        let mut trace = GotoTrace::new();
        trace.push(TraceStep::assignment(&a, 1, x.clone(), int(1))).unwrap();
        trace.push(TraceStep::assignment(&a, 2, tmp.clone(), int(0))).unwrap();
        trace.push(TraceStep::assignment(&builtin, 3, x.clone(), int(9))).unwrap();
        trace.push(TraceStep::assignment(&b, 4, x, int(3))).unwrap();
        trace.push(TraceStep::assignment(&c, 5, y, int(2))).unwrap();

        let witness = WitnessGenerator::new(&ns(), WitnessConfig::default()).generate(&trace);
        assert_eq!(witness.nodes().count(), 5);
        let edges: Vec<_> = witness.edges().collect();
        assert_eq!(edges.len(), 4);

        assert_eq!(edges[0].source, "n0");
        assert_eq!(edges[0].target, "n1");
        assert_eq!(edges[0].assumption.as_deref(), Some("x = 1;"));
        assert_eq!(edges[0].enter_function.as_deref(), Some("main"));
        assert_eq!(edges[0].startline, Some(2));
        assert_eq!(edges[0].tokens.as_deref(), Some("6,9"));
        assert_eq!(edges[0].sourcecode.as_deref(), Some("x = 1 ;"));
        assert_eq!(edges[0].origin_file_name.as_deref(), Some(file.as_str()));

        assert_eq!(edges[1].assumption.as_deref(), Some("x = 3;"));
        assert_eq!(edges[1].enter_function, None);

        assert_eq!(edges[2].enter_function.as_deref(), Some("f"));
        assert_eq!(edges[2].sourcecode.as_deref(), Some("void f ( ) { y = 2 ; }"));
        assert_eq!(edges[2].tokens.as_deref(), Some("11,20"));

        assert_eq!(edges[3].source, "n3");
        assert_eq!(edges[3].target, "n4");
        assert_eq!(edges[3].assumption, None);
    }

    #[test]
    fn test_suppressed_assumptions() {
        let s_ty = Type::struct_of("s", vec![("a".to_string(), Type::int())]);
        let s = Expr::symbol("c::main::s", s_ty.clone());
        let arr = Expr::symbol("c::main::arr", Type::array_of(Type::int(), Some(2)));
        let guard = Expr::symbol("c::main::__GBMC_alloc", Type::int());
        let pc = Instruction::skip();

        let mut trace = GotoTrace::new();
        trace
            .push(TraceStep::assignment(&pc, 0, s, Expr::symbol("c::main::t", s_ty)))
            .unwrap();
        trace
            .push(TraceStep::assignment(&pc, 1, arr, Expr::symbol("c::main::b", Type::int())))
            .unwrap();
        trace.push(TraceStep::assignment(&pc, 2, guard, int(0))).unwrap();

        let witness = WitnessGenerator::new(&ns(), WitnessConfig::default()).generate(&trace);
        let edges: Vec<_> = witness.edges().collect();
        assert_eq!(edges.len(), 4);
        assert!(edges.iter().all(|e| e.assumption.is_none()));
        assert!(edges.iter().all(|e| e.startline.is_none()));
    }

    #[test]
    fn test_unreadable_source() {
        let x = Expr::symbol("c::main::x", Type::int());
        let pc = Instruction::assign(x.clone(), int(1))
            .with_location(Location::new("/nonexistent/main.c", 7));
        let mut trace = GotoTrace::new();
        trace.push(TraceStep::assignment(&pc, 0, x, int(1))).unwrap();

        let ns = ns();
        let mut generator = WitnessGenerator::new(&ns, WitnessConfig::default());
        let witness = generator.generate(&trace);
        let edge = witness.edges().next().unwrap();
        assert_eq!(edge.startline, Some(7));
        assert_eq!(edge.sourcecode, None);
        assert_eq!(edge.assumption.as_deref(), Some("x = 1;"));
        assert_eq!(generator.token_cache.get("/nonexistent/main.c"), Some(&None));
    }

    #[test]
    fn test_write_graphml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("witness.graphml");
        let trace = GotoTrace::new();
        let witness = generate_goto_trace_in_graphml_format(
            &ns(),
            &trace,
            WitnessConfig {
                producer: "tool <1.0>".to_string(),
                source_language: "C".to_string(),
            },
            &path,
        )
        .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, witness.render());
        assert!(written.contains("tool &lt;1.0&gt;"));

        let missing = dir.path().join("missing").join("w.graphml");
        assert!(matches!(
            witness.write_graphml(&missing),
            Err(WitnessError::Io { .. })
        ));
    }
}
