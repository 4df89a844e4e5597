use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The diagram grammars the pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagramKind {
    Flowchart,
    Sequence,
    Class,
    EntityRelation,
}

impl DiagramKind {
    pub const ALL: [DiagramKind; 4] = [
        DiagramKind::Flowchart,
        DiagramKind::Sequence,
        DiagramKind::Class,
        DiagramKind::EntityRelation,
    ];

    /// Human-readable name, as shown in pickers and messages.
    pub fn display_name(self) -> &'static str {
        match self {
            DiagramKind::Flowchart => "Flowchart",
            DiagramKind::Sequence => "Sequence Diagram",
            DiagramKind::Class => "Class Diagram",
            DiagramKind::EntityRelation => "ER Diagram",
        }
    }

    /// The Mermaid declaration keyword that opens every document of this kind.
    pub fn declaration(self) -> &'static str {
        match self {
            DiagramKind::Flowchart => "graph TD",
            DiagramKind::Sequence => "sequenceDiagram",
            DiagramKind::Class => "classDiagram",
            DiagramKind::EntityRelation => "erDiagram",
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown diagram kind \"{0}\" (expected flowchart, sequence, class or er)")]
pub struct UnknownDiagramKind(pub String);

impl FromStr for DiagramKind {
    type Err = UnknownDiagramKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match folded.as_str() {
            "flowchart" | "flow" | "graph" => Ok(DiagramKind::Flowchart),
            "sequence" | "sequencediagram" => Ok(DiagramKind::Sequence),
            "class" | "classdiagram" => Ok(DiagramKind::Class),
            "er" | "erdiagram" | "entityrelation" | "entityrelationship" => {
                Ok(DiagramKind::EntityRelation)
            }
            _ => Err(UnknownDiagramKind(s.to_string())),
        }
    }
}

/// One user invocation: the selected code and the diagram it should become.
#[derive(Debug, Clone)]
pub struct DiagramRequest {
    pub source_text: String,
    pub diagram_kind: DiagramKind,
}

impl DiagramRequest {
    pub fn new(source_text: impl Into<String>, diagram_kind: DiagramKind) -> Self {
        Self {
            source_text: source_text.into(),
            diagram_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loose_kind_names() {
        assert_eq!("Flowchart".parse(), Ok(DiagramKind::Flowchart));
        assert_eq!(" sequence ".parse(), Ok(DiagramKind::Sequence));
        assert_eq!("Class Diagram".parse(), Ok(DiagramKind::Class));
        assert_eq!("ER".parse(), Ok(DiagramKind::EntityRelation));
        assert_eq!("entity-relation".parse(), Ok(DiagramKind::EntityRelation));
        assert!("gantt".parse::<DiagramKind>().is_err());
    }

    #[test]
    fn display_names_match_picker_labels() {
        let names: Vec<_> = DiagramKind::ALL.iter().map(|k| k.to_string()).collect();
        assert_eq!(
            names,
            ["Flowchart", "Sequence Diagram", "Class Diagram", "ER Diagram"]
        );
    }
}
