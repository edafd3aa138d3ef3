use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Type of a JSON node found by the structure scanner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeType {
    Object,
    Array,
}

/// Coordinates of a JSON structure within a larger text, including nested children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjCoords {
    pub start: usize,
    pub end: usize, // inclusive index of the closing bracket/brace
    pub kind: NodeType,
    pub children: Vec<ObjCoords>,
}

impl ObjCoords {
    pub fn new(start: usize, end: usize, kind: NodeType, children: Vec<ObjCoords>) -> Self {
        Self { start, end, kind, children }
    }

    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..=self.end]
    }
}

#[derive(Debug)]
struct Frame {
    start: usize,
    kind: NodeType,
    children: Vec<ObjCoords>,
}

/// Remove Markdown fence markers the way completions usually wrap JSON:
/// the first "```json", then the first newline, then the first remaining "```".
pub fn strip_code_fences(text: &str) -> String {
    text.replacen("```json", "", 1)
        .replacen('\n', "", 1)
        .replacen("```", "", 1)
        .trim()
        .to_string()
}

/// Find all JSON object/array structures in the given text. Coordinates are byte indices.
#[instrument(target = "question_forge::json", skip(text))]
pub fn find_json_structures(text: &str) -> Vec<ObjCoords> {
    let bytes = text.as_bytes();
    let mut results: Vec<ObjCoords> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match b {
                b'\\' => escape = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        let closing = match b {
            b'"' => {
                in_string = true;
                None
            }
            b'{' => {
                stack.push(Frame { start: i, kind: NodeType::Object, children: Vec::new() });
                None
            }
            b'[' => {
                stack.push(Frame { start: i, kind: NodeType::Array, children: Vec::new() });
                None
            }
            b'}' => Some(NodeType::Object),
            b']' => Some(NodeType::Array),
            _ => None,
        };

        if let Some(kind) = closing {
            // Unbalanced closers are dropped along with the frame they popped
            if let Some(frame) = stack.pop() {
                if frame.kind == kind {
                    let node = ObjCoords::new(frame.start, i, kind, frame.children);
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => results.push(node),
                    }
                }
            }
        }
    }

    debug!(target: "question_forge::json", count = results.len(), "found root structures");
    results
}

/// Return the first structure (parent before children, in discovery order) that deserializes as `T`.
pub fn extract_first<T: DeserializeOwned>(text: &str) -> Option<T> {
    fn visit<T: DeserializeOwned>(text: &str, node: &ObjCoords) -> Option<T> {
        if let Ok(v) = serde_json::from_str::<T>(node.slice(text)) {
            return Some(v);
        }
        node.children.iter().find_map(|child| visit::<T>(text, child))
    }

    find_json_structures(text).iter().find_map(|node| visit::<T>(text, node))
}

/// Parse a model completion as `T`: first after fence stripping, then by scanning for an embedded structure.
pub fn parse_completion<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<T>(&cleaned) {
        Ok(v) => Ok(v),
        Err(e) => {
            debug!(target: "question_forge::json", error = %e, "direct parse failed, scanning for embedded JSON");
            extract_first::<T>(raw).ok_or(e)
        }
    }
}
