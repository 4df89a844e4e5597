//! Render validated plans as Mermaid source.
//!
//! Output is deterministic: elements and relationships are emitted in the
//! order the plan declares them, one per line, after a fixed preamble.

use crate::DiagramKind;
use crate::plan::*;

const INDENT: &str = "    ";
const PLACEHOLDER: &str = "Could not generate a valid diagram from the code.";

const FLOWCHART_STYLES: [&str; 4] = [
    "classDef startEnd fill:#2ecc71,stroke:#27ae60,color:#fff,font-weight:bold",
    "classDef process fill:#3498db,stroke:#2980b9,color:#fff",
    "classDef decision fill:#e67e22,stroke:#d35400,color:#fff",
    "classDef data fill:#9b59b6,stroke:#8e44ad,color:#fff",
];

/// Compile any validated plan.
pub fn compile(plan: &ValidatedPlan) -> String {
    match plan {
        ValidatedPlan::Flowchart(p) => compile_flowchart(p),
        ValidatedPlan::Sequence(p) => compile_sequence(p),
        ValidatedPlan::Class(p) => compile_class(p),
        ValidatedPlan::EntityRelation(p) => compile_er(p),
    }
}

pub fn compile_flowchart(plan: &FlowchartPlan) -> String {
    let mut doc = Document::new(DiagramKind::Flowchart);
    for style in FLOWCHART_STYLES {
        doc.line(style);
    }

    if plan.nodes.is_empty() {
        doc.line(format!("error[\"{PLACEHOLDER}\"]"));
        return doc.finish();
    }

    for node in &plan.nodes {
        let label = escape_quoted(&node.label);
        let shape = match node.kind {
            NodeKind::StartEnd => format!("([\"{label}\"])"),
            NodeKind::Process => format!("[\"{label}\"]"),
            NodeKind::Decision => format!("{{\"{label}\"}}"),
            NodeKind::Data => format!("[/\"{label}\"/]"),
        };
        doc.line(format!("{}{shape}:::{}", node.id, node.kind.as_str()));
    }

    for edge in &plan.edges {
        match edge.label.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            Some(label) => doc.line(format!(
                "{} -- \"{}\" --> {}",
                edge.from,
                escape_quoted(label),
                edge.to
            )),
            None => doc.line(format!("{} --> {}", edge.from, edge.to)),
        }
    }

    doc.finish()
}

pub fn compile_sequence(plan: &SequencePlan) -> String {
    let mut doc = Document::new(DiagramKind::Sequence);

    if plan.participants.is_empty() {
        doc.line(format!("participant error as {PLACEHOLDER}"));
        return doc.finish();
    }

    for p in &plan.participants {
        let description = escape_sequence_text(&p.description);
        if description.is_empty() || description == p.alias {
            doc.line(format!("participant {}", p.alias));
        } else {
            doc.line(format!("participant {} as {description}", p.alias));
        }
    }

    for step in &plan.steps {
        let arrow = match step.kind {
            StepKind::Sync => "->>",
            StepKind::Async => "-)",
            StepKind::Reply => "-->>",
        };
        doc.line(format!(
            "{}{arrow}{}: {}",
            step.from,
            step.to,
            escape_sequence_text(&step.label)
        ));
    }

    doc.finish()
}

/// Relationships read `from` → `to`. For inheritance `from` is the subclass and
/// renders as `Sub --|> Parent`; instruction templates must use the same
/// direction or every hierarchy comes out inverted.
pub fn compile_class(plan: &ClassPlan) -> String {
    let mut doc = Document::new(DiagramKind::Class);

    if plan.classes.is_empty() {
        doc.line(format!("class error[\"{PLACEHOLDER}\"]"));
        return doc.finish();
    }

    for class in &plan.classes {
        let properties = class.properties.iter().filter_map(|p| class_member(p));
        let methods = class
            .methods
            .iter()
            .filter_map(|m| class_member(m))
            .map(|m| if m.contains('(') { m } else { format!("{m}()") });
        let members: Vec<String> = properties.chain(methods).collect();

        if members.is_empty() {
            doc.line(format!("class {}", class.id));
            continue;
        }
        doc.open(format!("class {}", class.id));
        for member in members {
            doc.line(member);
        }
        doc.close();
    }

    for rel in &plan.relationships {
        let arrow = match rel.kind {
            RelationKind::Inheritance => "--|>",
            RelationKind::Composition => "*--",
            RelationKind::Aggregation => "o--",
            RelationKind::Association => "-->",
        };
        let mut line = format!("{} {arrow} {}", rel.from, rel.to);
        if let Some(label) = rel.label.as_deref().map(flatten).filter(|l| !l.is_empty()) {
            line.push_str(" : ");
            line.push_str(&escape_quoted(&label));
        }
        doc.line(line);
    }

    doc.finish()
}

pub fn compile_er(plan: &ErPlan) -> String {
    let mut doc = Document::new(DiagramKind::EntityRelation);

    if plan.entities.is_empty() {
        doc.open("error");
        doc.line(format!("string message \"{PLACEHOLDER}\""));
        doc.close();
        return doc.finish();
    }

    for entity in &plan.entities {
        if entity.columns.is_empty() {
            doc.line(&entity.name);
            continue;
        }
        doc.open(&entity.name);
        for column in &entity.columns {
            let mut line = format!(
                "{} {}",
                attribute_token(&column.data_type, "string"),
                attribute_token(&column.name, "field")
            );
            if !column.keys.is_empty() {
                let keys: Vec<_> = column.keys.iter().map(|k| k.as_str()).collect();
                line.push(' ');
                line.push_str(&keys.join(", "));
            }
            doc.line(line);
        }
        doc.close();
    }

    for rel in &plan.relationships {
        doc.line(format!(
            "{} {} {} : \"{}\"",
            rel.from,
            rel.cardinality.to_token(),
            rel.to,
            escape_quoted(&rel.label)
        ));
    }

    doc.finish()
}

// ── Text helpers ────────────────────────────────────────────────

/// Accumulates indented lines under a diagram declaration.
struct Document {
    lines: Vec<String>,
    depth: usize,
}

impl Document {
    fn new(kind: DiagramKind) -> Self {
        Self {
            lines: vec![kind.declaration().to_string()],
            depth: 1,
        }
    }

    fn line(&mut self, text: impl AsRef<str>) {
        self.lines
            .push(format!("{}{}", INDENT.repeat(self.depth), text.as_ref()));
    }

    /// Emit `header {` and indent until the matching [`Document::close`].
    fn open(&mut self, header: impl AsRef<str>) {
        self.line(format!("{} {{", header.as_ref()));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    fn finish(self) -> String {
        self.lines.join("\n")
    }
}

/// Collapse line breaks and runs of whitespace into single spaces.
fn flatten(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text that sits inside a `"..."` token: quotes become `&quot;`.
pub fn escape_quoted(s: &str) -> String {
    flatten(s).replace('"', "&quot;")
}

/// Free text in sequence diagrams, where `;` also separates statements.
/// Uses Mermaid's `#code;` entities; `;` goes first so the quote entity survives.
fn escape_sequence_text(s: &str) -> String {
    flatten(s).replace(';', "#59;").replace('"', "#quot;")
}

/// A class member line. Braces would close the class body early.
fn class_member(s: &str) -> Option<String> {
    let member = flatten(&s.replace(['{', '}'], " "));
    (!member.is_empty()).then_some(member)
}

/// ER attribute types and names are bare words: `[A-Za-z0-9_\-()\[\]]`.
/// Words the lexer reads as key markers get a `_` suffix.
fn attribute_token(s: &str, fallback: &str) -> String {
    let mut token: String = flatten(s)
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '(' | ')' | '[' | ']'))
        .collect();
    if ["pk", "fk", "uk"].iter().any(|k| token.eq_ignore_ascii_case(k)) {
        token.push('_');
    }
    if token.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
        token
    } else if token.is_empty() {
        fallback.to_string()
    } else {
        format!("_{token}")
    }
}
