//! The per-driver type-parser registry. Resolves caller-supplied
//! `TypeParser` names to backend OIDs once, then answers `(oid) -> decoder`
//! lookups for the lifetime of the driver instance.

use std::collections::HashMap;
use std::sync::Arc;

use pgshape_core::{PgShapeError, TypeParser, Value};

type Decoder = Arc<dyn Fn(&str) -> Value + Send + Sync>;

/// Resolved decoders keyed by backend OID, installed for both the scalar and
/// (when present) array form of every named type parser.
pub struct TypeRegistry {
    decoders: HashMap<u32, Decoder>,
}

impl TypeRegistry {
    /// Looks up the decoder installed for `oid`, if any. Callers fall back to
    /// the underlying client's default text decoding when this returns
    /// `None`.
    pub fn decoder_for(&self, oid: u32) -> Option<&Decoder> {
        self.decoders.get(&oid)
    }
}

/// Executes the one-shot `pg_type` lookup and installs scalar and array
/// decoders for every requested name. Absence of a requested name is fatal:
/// it aborts bring-up of the driver instance that requested it.
pub async fn build_type_registry(
    client: &tokio_postgres::Client,
    type_parsers: &[TypeParser],
) -> Result<TypeRegistry, PgShapeError> {
    let mut decoders: HashMap<u32, Decoder> = HashMap::new();

    if type_parsers.is_empty() {
        return Ok(TypeRegistry { decoders });
    }

    let names: Vec<&str> = type_parsers.iter().map(|p| p.name.as_str()).collect();
    let rows = client
        .query(
            "SELECT oid, typarray, typname FROM pg_type WHERE typname = ANY($1::text[])",
            &[&names],
        )
        .await
        .map_err(|e| PgShapeError::Driver(Box::new(e)))?;

    let mut found: HashMap<String, (u32, u32)> = HashMap::new();
    for row in &rows {
        let typname: String = row.get("typname");
        let oid: u32 = row.get("oid");
        let typarray: u32 = row.get("typarray");
        found.insert(typname, (oid, typarray));
    }

    for parser in type_parsers {
        let Some(&(oid, typarray)) = found.get(&parser.name) else {
            return Err(PgShapeError::Driver(Box::new(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("type parser registration failed: unknown type name {:?}", parser.name),
            ))));
        };

        let scalar = parser.parse.clone();
        decoders.insert(oid, scalar.clone());

        if typarray != 0 {
            let array_decoder: Decoder = Arc::new(move |text: &str| {
                Value::Array(
                    parse_pg_text_array(text)
                        .into_iter()
                        .map(|element| match element {
                            Some(raw) => scalar(&raw),
                            None => Value::Null,
                        })
                        .collect(),
                )
            });
            decoders.insert(typarray, array_decoder);
        }
    }

    Ok(TypeRegistry { decoders })
}

/// Parses PostgreSQL's text array wire grammar: `{elem1,elem2,...}`,
/// unquoted `NULL` for a null element, double-quoting for elements
/// containing `,`, `{`, `}`, `"`, `\`, or whitespace, and backslash-escaping
/// inside quoted elements. An unquoted element may itself be a brace-nested
/// sub-array (`{{1,2},{3,4}}`); brace depth is tracked so the top-level
/// comma that separates elements is never confused with a comma belonging
/// to a nested sub-array. Returns the raw element strings (`None` for
/// `NULL`, the nested-array text unparsed for a sub-array element); the
/// caller maps each through the scalar decoder it already has for the
/// element type — for a genuinely multi-dimensional column that decoder is
/// itself an array decoder, so one call here flattens one dimension.
fn parse_pg_text_array(input: &str) -> Vec<Option<String>> {
    let trimmed = input.trim();
    let inner = match trimmed.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        Some(inner) => inner,
        None => return Vec::new(),
    };

    if inner.is_empty() {
        return Vec::new();
    }

    let mut elements = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        let mut current = String::new();
        let mut quoted = false;
        let mut saw_any_char = false;

        if chars.peek() == Some(&'"') {
            quoted = true;
            saw_any_char = true;
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            current.push(escaped);
                        }
                    }
                    '"' => break,
                    other => current.push(other),
                }
            }
        } else {
            let mut depth: i32 = 0;
            while let Some(&c) = chars.peek() {
                if c == ',' && depth == 0 {
                    break;
                }
                match c {
                    '{' => depth += 1,
                    '}' => depth -= 1,
                    _ => {}
                }
                saw_any_char = true;
                current.push(c);
                chars.next();
            }
        }

        if !quoted && current == "NULL" {
            elements.push(None);
        } else if saw_any_char || quoted {
            elements.push(Some(current));
        } else {
            elements.push(Some(String::new()));
        }

        match chars.next() {
            Some(',') => continue,
            _ => break,
        }
    }

    elements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_elements() {
        assert_eq!(
            parse_pg_text_array("{1,2,3}"),
            vec![Some("1".to_string()), Some("2".to_string()), Some("3".to_string())]
        );
    }

    #[test]
    fn unquoted_null_becomes_none() {
        assert_eq!(
            parse_pg_text_array("{a,NULL,b}"),
            vec![Some("a".to_string()), None, Some("b".to_string())]
        );
    }

    #[test]
    fn quoted_elements_preserve_commas_and_braces() {
        assert_eq!(
            parse_pg_text_array(r#"{"a,b","{c}"}"#),
            vec![Some("a,b".to_string()), Some("{c}".to_string())]
        );
    }

    #[test]
    fn backslash_escapes_are_unescaped_within_quotes() {
        assert_eq!(
            parse_pg_text_array(r#"{"quote\"inside"}"#),
            vec![Some("quote\"inside".to_string())]
        );
    }

    #[test]
    fn empty_array_yields_no_elements() {
        assert_eq!(parse_pg_text_array("{}"), Vec::<Option<String>>::new());
    }

    #[test]
    fn quoted_empty_string_is_distinct_from_null() {
        assert_eq!(parse_pg_text_array(r#"{""}"#), vec![Some(String::new())]);
    }

    #[test]
    fn nested_braces_stay_intact_as_one_element() {
        assert_eq!(
            parse_pg_text_array("{{1,2},{3,4}}"),
            vec![Some("{1,2}".to_string()), Some("{3,4}".to_string())]
        );
    }
}
