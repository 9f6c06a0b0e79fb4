use crate::location::Location;
use crate::resolver::{looks_like_url, MAX_CANDIDATE_LEN};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathCandidate {
    pub location: Location,
    pub raw_value: String,
}

/// Which strings count as candidates.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub keys: Vec<String>,
    pub patterns: Vec<Regex>,
}

impl Selection {
    /// No keys and no patterns means heuristic mode.
    pub fn is_targeted(&self) -> bool {
        !self.keys.is_empty() || !self.patterns.is_empty()
    }

    fn matches(&self, field: &str) -> bool {
        self.keys.iter().any(|k| k == field) || self.patterns.iter().any(|p| p.is_match(field))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reach {
    Plain,
    /// Direct value of a selected field.
    Selected,
    /// Element of an array held by a selected field.
    SelectedElement,
}

/// Collect candidates in document order: object fields as encountered,
/// array elements by index.
pub fn discover(doc: &Value, selection: &Selection, extensions: &[String]) -> Vec<PathCandidate> {
    let targeted = selection.is_targeted();
    let suffixes: Vec<String> = extensions
        .iter()
        .map(|e| format!(".{}", e.trim_start_matches('.').to_lowercase()))
        .collect();

    let mut found = Vec::new();
    let mut stack: Vec<(&Value, Location, Reach)> = vec![(doc, Location::root(), Reach::Plain)];
    while let Some((node, loc, reach)) = stack.pop() {
        match node {
            Value::String(s) => {
                let hit = if targeted {
                    reach != Reach::Plain
                } else {
                    is_path_like(s, &suffixes)
                };
                if hit {
                    found.push(PathCandidate { location: loc, raw_value: s.clone() });
                }
            }
            Value::Object(map) => {
                let children: Vec<_> = map
                    .iter()
                    .map(|(field, value)| {
                        let reach = if targeted && selection.matches(field) {
                            Reach::Selected
                        } else {
                            Reach::Plain
                        };
                        (value, loc.key(field), reach)
                    })
                    .collect();
                stack.extend(children.into_iter().rev());
            }
            Value::Array(items) => {
                let reach = if reach == Reach::Selected {
                    Reach::SelectedElement
                } else {
                    Reach::Plain
                };
                stack.extend(items.iter().enumerate().rev().map(|(i, v)| (v, loc.index(i), reach)));
            }
            _ => {}
        }
    }
    found
}

fn is_path_like(s: &str, suffixes: &[String]) -> bool {
    if s.is_empty() || s.len() > MAX_CANDIDATE_LEN {
        return false;
    }
    if s.contains('/') || s.contains('\\') || looks_like_url(s) {
        return true;
    }
    let lower = s.to_lowercase();
    suffixes.iter().any(|suffix| lower.ends_with(suffix.as_str()))
}
