//! Flattening of the `knowledge` section into prompt text.

use toml::Value;

/// Compile configured knowledge into deterministic plain text.
///
/// A string is used as-is, a list becomes one line per entry, and a table is
/// walked in file order: nested tables become upper-cased headers, lists
/// become `- item` lines and scalars `key: value`.
pub fn compile_knowledge(knowledge: Option<&Value>) -> String {
    let Some(value) = knowledge else {
        return String::new();
    };

    let mut out = String::new();
    match value {
        Value::String(s) => out.push_str(s),
        Value::Array(items) => {
            for item in items {
                let line = scalar_text(item);
                if !line.trim().is_empty() {
                    push_line(&mut out, &line);
                }
            }
        }
        Value::Table(table) => append_table(&mut out, table, 0),
        other => out.push_str(&scalar_text(other)),
    }

    out.trim().to_string()
}

fn append_table(out: &mut String, table: &toml::Table, depth: usize) {
    let indent = "  ".repeat(depth);
    for (key, value) in table {
        match value {
            Value::Table(inner) => {
                push_line(out, &format!("{indent}{}:", key.to_uppercase()));
                append_table(out, inner, depth + 1);
            }
            Value::Array(items) => {
                push_line(out, &format!("{indent}{key}:"));
                for item in items {
                    push_line(out, &format!("{indent}- {}", scalar_text(item)));
                }
            }
            other => push_line(out, &format!("{indent}{key}: {}", scalar_text(other))),
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_line(out: &mut String, line: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(line);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knowledge_of(toml_src: &str) -> Value {
        let table: toml::Table = toml::from_str(toml_src).unwrap();
        table.get("knowledge").cloned().unwrap()
    }

    #[test]
    fn none_is_empty() {
        assert_eq!(compile_knowledge(None), "");
    }

    #[test]
    fn string_is_trimmed() {
        let value = knowledge_of("knowledge = \"  PvP is off.  \"");
        assert_eq!(compile_knowledge(Some(&value)), "PvP is off.");
    }

    #[test]
    fn list_skips_blank_entries() {
        let value = knowledge_of(r#"knowledge = ["No griefing", "", "Be kind"]"#);
        assert_eq!(compile_knowledge(Some(&value)), "No griefing\nBe kind");
    }

    #[test]
    fn table_keeps_file_order() {
        let value = knowledge_of(
            r#"
[knowledge]
website = "example.net"
max_homes = 3
rules = ["No griefing", "No spam"]

[knowledge.staff]
owner = "Alex"
"#,
        );
        assert_eq!(
            compile_knowledge(Some(&value)),
            "website: example.net\nmax_homes: 3\nrules:\n- No griefing\n- No spam\nSTAFF:\n  owner: Alex"
        );
    }

    #[test]
    fn same_input_same_output() {
        let value = knowledge_of("[knowledge]\nb = 1\na = 2\n");
        assert_eq!(
            compile_knowledge(Some(&value)),
            compile_knowledge(Some(&value))
        );
        assert_eq!(compile_knowledge(Some(&value)), "b: 1\na: 2");
    }
}
