use structurify_core::DiagramKind;

const FLOWCHART_PROMPT: &str = r#"You are a code analysis engine. Your only task is to analyze the user's code snippet and convert its logical flow into a JSON object representing a flowchart.

- The JSON object must conform to this structure: {"nodes": [], "edges": []}.
- Each node must have an "id", a "label" (a short description) and a "type".
- Node "id" MUST be a unique, single word (e.g. "process1", "check_user"). It cannot contain spaces or punctuation.
- Node "type" MUST be one of: "startEnd", "process", "decision" or "data".
- Each edge must have "from" and "to" properties naming node ids, and may have a "label".
- Edges leaving a "decision" node must have a "label" (e.g. "Yes", "No", "True", "False").

CRITICAL: Your entire response MUST be a single, valid JSON object. Do NOT add any explanations, markdown formatting, or other text."#;

const SEQUENCE_PROMPT: &str = r#"You are an expert in code analysis. Convert the user's code into a JSON object for a sequence diagram.

- The JSON must have "participants" (actors or components) and "steps" (interactions), in call order.
- Each participant needs an "alias" (a single word such as "A" or "UserService") and a "description".
- Each step must have "from" and "to" aliases, a "label" for the action, and a "type": "sync", "async" or "reply".

CRITICAL: Respond with a single, valid JSON object only. Do NOT add any explanations or markdown."#;

const CLASS_PROMPT: &str = r#"You are an expert in code analysis. Convert the user's code into a JSON object for a class diagram.

- The JSON must have "classes" and "relationships".
- Each class needs an "id" (the class name as a single word), a "properties" array of strings and a "methods" array of strings.
- Each relationship must have "from", "to", a "type" ("inheritance", "composition", "aggregation" or "association") and an optional "label".
- For "inheritance", "from" is the subclass and "to" is the parent. For "composition" and "aggregation", "from" is the owner.

CRITICAL: Respond with a single, valid JSON object only. Do NOT add any explanations or markdown."#;

const ER_PROMPT: &str = r#"You are an expert in database-related code analysis. Convert the user's code (e.g. ORM models, SQL schemas) into a JSON object for an ER diagram.

- The JSON must have "entities" and "relationships".
- Each entity "name" MUST be a single word (e.g. "Users", "OrderItems").
- Each entity has a "columns" array; each column has a "name", a "type" and a "keys" array containing any of "PK" and "FK".
- Each relationship must have "from", "to", a "cardinality" written in Mermaid notation (e.g. "||--o{", "|o--||") and a "label".

CRITICAL: Respond with a single, valid JSON object only. Entity names must not contain spaces or special characters."#;

/// The built-in system instruction for a diagram kind.
pub fn system_prompt(kind: DiagramKind) -> &'static str {
    match kind {
        DiagramKind::Flowchart => FLOWCHART_PROMPT,
        DiagramKind::Sequence => SEQUENCE_PROMPT,
        DiagramKind::Class => CLASS_PROMPT,
        DiagramKind::EntityRelation => ER_PROMPT,
    }
}

/// Wrap the selected code as the user turn.
pub fn user_message(code: &str) -> String {
    let fence = if code.contains("```") { "````" } else { "```" };
    format!("Code snippet to analyze:\n{fence}\n{code}\n{fence}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_prompt_names_its_collections() {
        let expected = [
            (DiagramKind::Flowchart, ["\"nodes\"", "\"edges\""]),
            (DiagramKind::Sequence, ["\"participants\"", "\"steps\""]),
            (DiagramKind::Class, ["\"classes\"", "\"relationships\""]),
            (DiagramKind::EntityRelation, ["\"entities\"", "\"relationships\""]),
        ];
        for (kind, collections) in expected {
            let prompt = system_prompt(kind);
            for c in collections {
                assert!(prompt.contains(c), "{kind} prompt should mention {c}");
            }
            assert!(prompt.contains("CRITICAL"));
        }
    }

    #[test]
    fn user_message_fences_code() {
        assert_eq!(
            user_message("fn main() {}"),
            "Code snippet to analyze:\n```\nfn main() {}\n```"
        );
        assert!(user_message("/// ```rust\n/// ```").starts_with("Code snippet to analyze:\n````\n"));
    }
}
