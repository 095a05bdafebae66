//! YAML front matter extraction
//!
//! A document may open with a block fenced by `---` lines. The block is parsed
//! as a YAML mapping and removed from the content handed to the assembler.

use mdconv_core::{AppError, DocumentMetadata};
use serde_json::{Map, Number, Value};
use serde_yaml::Value as YamlValue;

const BOM: char = '\u{feff}';

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("Invalid YAML{}: {message}", .line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Syntax {
        /// 1-based line in the original document
        line: Option<usize>,
        message: String,
    },

    #[error("Front matter must be a mapping of keys to values")]
    NotAMapping { line: usize },

    #[error("Failed to serialize metadata: {0}")]
    Serialize(String),
}

impl From<MetadataError> for AppError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::Syntax { line, message } => AppError::MetadataSyntax { line, message },
            MetadataError::NotAMapping { line } => AppError::MetadataSyntax {
                line: Some(line),
                message: "front matter must be a mapping of keys to values".to_string(),
            },
            MetadataError::Serialize(msg) => AppError::Internal(msg),
        }
    }
}

fn is_opening_fence(line: &str) -> bool {
    line.trim_end() == "---"
}

fn is_closing_fence(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed == "---" || trimmed == "..."
}

/// Split `text` into its front matter and remaining content.
///
/// Without a complete fenced block the input comes back unchanged with empty
/// metadata.
pub fn extract(text: &str) -> Result<(DocumentMetadata, String), MetadataError> {
    let body = text.strip_prefix(BOM).unwrap_or(text);

    let Some((first_line, after_first)) = body.split_once('\n') else {
        return Ok((DocumentMetadata::new(), text.to_string()));
    };
    if !is_opening_fence(first_line) {
        return Ok((DocumentMetadata::new(), text.to_string()));
    }

    let block_start = body.len() - after_first.len();
    let mut offset = block_start;
    let mut closing = None;

    for line in after_first.split_inclusive('\n') {
        let without_newline = line.strip_suffix('\n').unwrap_or(line);
        if is_closing_fence(without_newline) {
            closing = Some((offset, offset + line.len()));
            break;
        }
        offset += line.len();
    }

    let Some((block_end, content_start)) = closing else {
        return Ok((DocumentMetadata::new(), text.to_string()));
    };

    let block = &body[block_start..block_end];
    let metadata = parse_block(block)?;

    Ok((metadata, body[content_start..].to_string()))
}

/// Parse the YAML between the fences. Line numbers are shifted by one for the
/// opening fence.
fn parse_block(block: &str) -> Result<DocumentMetadata, MetadataError> {
    if block.trim().is_empty() {
        return Ok(DocumentMetadata::new());
    }

    let parsed: YamlValue = serde_yaml::from_str(block).map_err(|e| MetadataError::Syntax {
        line: e.location().map(|loc| loc.line() + 1),
        message: first_sentence(&e.to_string()),
    })?;

    match untag(parsed) {
        YamlValue::Null => Ok(DocumentMetadata::new()),
        YamlValue::Mapping(mapping) => Ok(mapping
            .into_iter()
            .map(|(k, v)| (key_to_string(k), yaml_to_json(v)))
            .collect()),
        _ => Err(MetadataError::NotAMapping {
            line: first_value_line(block),
        }),
    }
}

/// Document line of the first line in the block carrying YAML content.
fn first_value_line(block: &str) -> usize {
    let index = block
        .lines()
        .position(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .unwrap_or(0);
    // Past the opening fence, 1-based
    index + 2
}

/// serde_yaml appends "at line X column Y" to its messages; the line is
/// reported separately, relative to the whole document.
fn first_sentence(message: &str) -> String {
    message
        .split(" at line ")
        .next()
        .unwrap_or(message)
        .trim()
        .to_string()
}

fn untag(value: YamlValue) -> YamlValue {
    match value {
        YamlValue::Tagged(tagged) => untag(tagged.value),
        other => other,
    }
}

fn key_to_string(key: YamlValue) -> String {
    match untag(key) {
        YamlValue::String(s) => s,
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

fn yaml_to_json(value: YamlValue) -> Value {
    match untag(value) {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(n.to_string()))
            }
        }
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(mapping) => Value::Object(
            mapping
                .into_iter()
                .map(|(k, v)| (key_to_string(k), yaml_to_json(v)))
                .collect::<Map<String, Value>>(),
        ),
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

/// Serialize metadata back into a fenced block. Empty metadata renders as
/// nothing.
pub fn render_front_matter(metadata: &DocumentMetadata) -> Result<String, MetadataError> {
    if metadata.is_empty() {
        return Ok(String::new());
    }

    let yaml = serde_yaml::to_string(metadata.as_map())
        .map_err(|e| MetadataError::Serialize(e.to_string()))?;

    Ok(format!("---\n{}---\n", yaml))
}
