//! Output paths - minimal dotted path subset
//!
//! Supports:
//! - a.b.c (dot notation)
//! - a[0].b or a.0.b (array index)
//!
//! Used to pick fields out of provider outputs and live status documents.

use serde_json::Value;

use crate::error::SkyError;

/// A parsed path segment
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Field(String),
    Index(usize),
}

/// Parse a dotted path into segments
pub fn parse(path: &str) -> Result<Vec<Segment>, SkyError> {
    let invalid = || SkyError::InvalidOutputPath {
        path: path.to_string(),
    };

    if path.is_empty() {
        return Err(invalid());
    }

    let mut segments = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            return Err(invalid());
        }

        if let Some(bracket_pos) = part.find('[') {
            let field = &part[..bracket_pos];
            if !field.is_empty() {
                segments.push(Segment::Field(field.to_string()));
            }
            if !part.ends_with(']') {
                return Err(invalid());
            }
            let index: usize = part[bracket_pos + 1..part.len() - 1]
                .parse()
                .map_err(|_| invalid())?;
            segments.push(Segment::Index(index));
        } else if let Ok(index) = part.parse::<usize>() {
            segments.push(Segment::Index(index));
        } else {
            segments.push(Segment::Field(part.to_string()));
        }
    }

    Ok(segments)
}

/// Walk `value` along `segments`; `None` when any step is missing or null
pub fn apply<'a>(value: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    let mut current = value;
    for segment in segments {
        current = match segment {
            Segment::Field(name) => current.get(name)?,
            Segment::Index(idx) => current.get(*idx)?,
        };
    }
    (!current.is_null()).then_some(current)
}

/// Display form of parsed segments (`a.b[0].c`)
pub fn render(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Field(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            Segment::Index(idx) => out.push_str(&format!("[{idx}]")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_dotted_and_indexed() {
        assert_eq!(
            parse("loadBalancer.ingress[0].ip").unwrap(),
            vec![
                Segment::Field("loadBalancer".into()),
                Segment::Field("ingress".into()),
                Segment::Index(0),
                Segment::Field("ip".into()),
            ]
        );
        assert_eq!(parse("items.1").unwrap()[1], Segment::Index(1));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(parse("").is_err());
        assert!(parse("a..b").is_err());
        assert!(parse("a[x]").is_err());
        assert!(parse("a[0").is_err());
    }

    #[test]
    fn apply_walks_nested_values() {
        let status = json!({"loadBalancer": {"ingress": [{"ip": "20.1.2.3"}]}});
        let segments = parse("loadBalancer.ingress[0].ip").unwrap();
        assert_eq!(apply(&status, &segments), Some(&json!("20.1.2.3")));
    }

    #[test]
    fn apply_treats_null_as_missing() {
        let status = json!({"loadBalancer": {"ingress": null}});
        assert_eq!(apply(&status, &parse("loadBalancer.ingress").unwrap()), None);
        assert_eq!(apply(&status, &parse("loadBalancer.ingress[0]").unwrap()), None);
    }

    #[test]
    fn render_round_trips_display() {
        let segments = parse("metadata.name").unwrap();
        assert_eq!(render(&segments), "metadata.name");
        assert_eq!(render(&parse("a.0.b").unwrap()), "a[0].b");
    }
}
