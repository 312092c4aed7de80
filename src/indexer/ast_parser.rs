use super::ChunkExtractor;
use crate::types::{ChunkKind, ExtractedChunk};
use anyhow::{Context, Result};
use tree_sitter::{Node, Parser};

const ANONYMOUS: &str = "<anonymous>";

/// tree-sitter based extractor for Python functions and classes
///
/// Every `function_definition` and `class_definition` becomes a chunk, nested
/// methods included, in document order.
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonChunkExtractor;

impl PythonChunkExtractor {
    pub fn new() -> Self {
        Self
    }

    fn collect(node: Node, source: &str, result: &mut Vec<ExtractedChunk>) {
        let kind = match node.kind() {
            "function_definition" => Some(ChunkKind::Function),
            "class_definition" => Some(ChunkKind::Class),
            _ => None,
        };

        if let Some(kind) = kind {
            let name = node
                .child_by_field_name("name")
                .and_then(|n| n.utf8_text(source.as_bytes()).ok())
                .filter(|n| !n.is_empty())
                .unwrap_or(ANONYMOUS);

            result.push(ExtractedChunk {
                name: name.to_string(),
                kind,
                code: source[node.start_byte()..node.end_byte()].to_string(),
                // Tree-sitter rows are 0-indexed
                start_line: node.start_position().row + 1,
                end_line: node.end_position().row + 1,
            });
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            Self::collect(child, source, result);
        }
    }
}

impl ChunkExtractor for PythonChunkExtractor {
    fn extract(&self, file_path: &str, content: &str) -> Result<Vec<ExtractedChunk>> {
        // Parser is not Sync, so one per call
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .context("Failed to set parser language")?;

        let Some(tree) = parser.parse(content, None) else {
            tracing::warn!("Parser produced no tree for {}", file_path);
            return Ok(Vec::new());
        };

        let mut chunks = Vec::new();
        Self::collect(tree.root_node(), content, &mut chunks);

        tracing::debug!("Extracted {} chunks from {}", chunks.len(), file_path);
        Ok(chunks)
    }
}
