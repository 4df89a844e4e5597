//! Typed plans produced by validation and consumed by the Mermaid compiler.
//!
//! Every identifier stored here already satisfies [`crate::identifier::is_identifier`],
//! and every `from`/`to` names an element declared in the same plan.

use crate::DiagramKind;

/// A closed set of string-tagged values (node kinds, arrow kinds, key kinds).
///
/// `parse_exact` is what validation uses; `normalize` is the lenient lookup the
/// sanitizer uses to rewrite sloppy spellings into the canonical one.
pub trait ClosedSet: Sized + Copy + 'static {
    const ALL: &'static [Self];
    /// Extra accepted spellings, compared after folding.
    const SYNONYMS: &'static [(&'static str, Self)];

    fn as_str(self) -> &'static str;

    fn parse_exact(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }

    fn normalize(s: &str) -> Option<Self> {
        let folded = fold(s);
        if folded.is_empty() {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|v| fold(v.as_str()) == folded)
            .or_else(|| {
                Self::SYNONYMS
                    .iter()
                    .find(|(syn, _)| fold(syn) == folded)
                    .map(|(_, v)| *v)
            })
    }

    /// Canonical spellings joined for error messages, e.g. `'sync', 'async', 'reply'`.
    fn expected() -> String {
        Self::ALL
            .iter()
            .map(|v| format!("'{}'", v.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Lowercase and drop separators so `Start/End`, `start_end` and `startEnd` compare equal.
fn fold(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_' | '/' | '.'))
        .flat_map(char::to_lowercase)
        .collect()
}

// ── Flowchart ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    StartEnd,
    Process,
    Decision,
    Data,
}

impl ClosedSet for NodeKind {
    const ALL: &'static [Self] = &[
        NodeKind::StartEnd,
        NodeKind::Process,
        NodeKind::Decision,
        NodeKind::Data,
    ];
    const SYNONYMS: &'static [(&'static str, Self)] = &[
        ("start", NodeKind::StartEnd),
        ("end", NodeKind::StartEnd),
        ("terminal", NodeKind::StartEnd),
        ("terminator", NodeKind::StartEnd),
        ("action", NodeKind::Process),
        ("step", NodeKind::Process),
        ("condition", NodeKind::Decision),
        ("branch", NodeKind::Decision),
        ("io", NodeKind::Data),
        ("input", NodeKind::Data),
        ("output", NodeKind::Data),
        ("input/output", NodeKind::Data),
    ];

    fn as_str(self) -> &'static str {
        match self {
            NodeKind::StartEnd => "startEnd",
            NodeKind::Process => "process",
            NodeKind::Decision => "decision",
            NodeKind::Data => "data",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowEdge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlowchartPlan {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

// ── Sequence ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Sync,
    Async,
    Reply,
}

impl ClosedSet for StepKind {
    const ALL: &'static [Self] = &[StepKind::Sync, StepKind::Async, StepKind::Reply];
    const SYNONYMS: &'static [(&'static str, Self)] = &[
        ("synchronous", StepKind::Sync),
        ("call", StepKind::Sync),
        ("request", StepKind::Sync),
        ("asynchronous", StepKind::Async),
        ("message", StepKind::Async),
        ("event", StepKind::Async),
        ("return", StepKind::Reply),
        ("response", StepKind::Reply),
    ];

    fn as_str(self) -> &'static str {
        match self {
            StepKind::Sync => "sync",
            StepKind::Async => "async",
            StepKind::Reply => "reply",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub alias: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceStep {
    pub from: String,
    pub to: String,
    pub label: String,
    pub kind: StepKind,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SequencePlan {
    pub participants: Vec<Participant>,
    pub steps: Vec<SequenceStep>,
}

// ── Class ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Inheritance,
    Composition,
    Aggregation,
    Association,
}

impl ClosedSet for RelationKind {
    const ALL: &'static [Self] = &[
        RelationKind::Inheritance,
        RelationKind::Composition,
        RelationKind::Aggregation,
        RelationKind::Association,
    ];
    const SYNONYMS: &'static [(&'static str, Self)] = &[
        ("extends", RelationKind::Inheritance),
        ("inherits", RelationKind::Inheritance),
        ("generalization", RelationKind::Inheritance),
        ("implements", RelationKind::Inheritance),
        ("realization", RelationKind::Inheritance),
        ("composes", RelationKind::Composition),
        ("aggregates", RelationKind::Aggregation),
        ("uses", RelationKind::Association),
        ("dependency", RelationKind::Association),
        ("reference", RelationKind::Association),
    ];

    fn as_str(self) -> &'static str {
        match self {
            RelationKind::Inheritance => "inheritance",
            RelationKind::Composition => "composition",
            RelationKind::Aggregation => "aggregation",
            RelationKind::Association => "association",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub id: String,
    pub properties: Vec<String>,
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassRelationship {
    pub from: String,
    pub to: String,
    pub kind: RelationKind,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassPlan {
    pub classes: Vec<ClassDef>,
    pub relationships: Vec<ClassRelationship>,
}

// ── Entity-relation ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    PrimaryKey,
    ForeignKey,
}

impl ClosedSet for KeyKind {
    const ALL: &'static [Self] = &[KeyKind::PrimaryKey, KeyKind::ForeignKey];
    const SYNONYMS: &'static [(&'static str, Self)] = &[
        ("primary key", KeyKind::PrimaryKey),
        ("primary", KeyKind::PrimaryKey),
        ("foreign key", KeyKind::ForeignKey),
        ("foreign", KeyKind::ForeignKey),
        ("references", KeyKind::ForeignKey),
    ];

    fn as_str(self) -> &'static str {
        match self {
            KeyKind::PrimaryKey => "PK",
            KeyKind::ForeignKey => "FK",
        }
    }
}

/// One end of an ER relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    ZeroOrOne,
    ExactlyOne,
    ZeroOrMore,
    OneOrMore,
}

impl Multiplicity {
    const LEFT: [(&'static str, Multiplicity); 4] = [
        ("|o", Multiplicity::ZeroOrOne),
        ("||", Multiplicity::ExactlyOne),
        ("}o", Multiplicity::ZeroOrMore),
        ("}|", Multiplicity::OneOrMore),
    ];
    const RIGHT: [(&'static str, Multiplicity); 4] = [
        ("o|", Multiplicity::ZeroOrOne),
        ("||", Multiplicity::ExactlyOne),
        ("o{", Multiplicity::ZeroOrMore),
        ("|{", Multiplicity::OneOrMore),
    ];

    pub fn left_token(self) -> &'static str {
        Self::token(&Self::LEFT, self)
    }

    pub fn right_token(self) -> &'static str {
        Self::token(&Self::RIGHT, self)
    }

    fn token(table: &[(&'static str, Multiplicity); 4], m: Multiplicity) -> &'static str {
        table
            .iter()
            .find(|(_, v)| *v == m)
            .map(|(t, _)| *t)
            .unwrap_or("||")
    }
}

/// A parsed Mermaid ER cardinality such as `||--o{`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cardinality {
    pub left: Multiplicity,
    pub identifying: bool,
    pub right: Multiplicity,
}

impl Cardinality {
    /// Parse the exact six-character Mermaid form. No whitespace is tolerated.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != 6 || !s.is_ascii() {
            return None;
        }
        let (left, rest) = s.split_at(2);
        let (line, right) = rest.split_at(2);
        let left = Multiplicity::LEFT
            .iter()
            .find(|(t, _)| *t == left)
            .map(|(_, m)| *m)?;
        let right = Multiplicity::RIGHT
            .iter()
            .find(|(t, _)| *t == right)
            .map(|(_, m)| *m)?;
        let identifying = match line {
            "--" => true,
            ".." => false,
            _ => return None,
        };
        Some(Self {
            left,
            identifying,
            right,
        })
    }

    pub fn to_token(self) -> String {
        format!(
            "{}{}{}",
            self.left.left_token(),
            if self.identifying { "--" } else { ".." },
            self.right.right_token()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    /// Declared order, duplicates removed.
    pub keys: Vec<KeyKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErRelationship {
    pub from: String,
    pub to: String,
    pub cardinality: Cardinality,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ErPlan {
    pub entities: Vec<Entity>,
    pub relationships: Vec<ErRelationship>,
}

// ── Dispatch ────────────────────────────────────────────────────

/// A plan that passed validation, tagged by diagram kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedPlan {
    Flowchart(FlowchartPlan),
    Sequence(SequencePlan),
    Class(ClassPlan),
    EntityRelation(ErPlan),
}

impl ValidatedPlan {
    pub fn kind(&self) -> DiagramKind {
        match self {
            ValidatedPlan::Flowchart(_) => DiagramKind::Flowchart,
            ValidatedPlan::Sequence(_) => DiagramKind::Sequence,
            ValidatedPlan::Class(_) => DiagramKind::Class,
            ValidatedPlan::EntityRelation(_) => DiagramKind::EntityRelation,
        }
    }
}
