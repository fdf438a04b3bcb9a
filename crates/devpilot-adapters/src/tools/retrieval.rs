//! Retrieval-class tools.
//!
//! A `RetrievalTool` asks a `DocumentRetriever` for the top `k` documents
//! matching the call's `query` and serializes them for the transcript. The
//! graph then replaces that raw text with a model-written digest.
//!
//! `KeywordRetriever` is a small in-memory retriever ranking documents by
//! query term overlap. Markdown corpora are split on headings, one document
//! per section.

use std::{
    collections::HashSet,
    fs,
    path::Path,
    sync::Arc,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use devpilot_contracts::message::Arguments;
use devpilot_core::traits::ToolAdapter;

use crate::error::{AdapterError, AdapterResult};

use super::string_arg;

/// Documents returned per query unless overridden.
pub const DEFAULT_TOP_K: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    /// The `k` best documents for `query`, best first.
    async fn retrieve(&self, query: &str, k: usize) -> AdapterResult<Vec<Document>>;
}

// ── RetrievalTool ─────────────────────────────────────────────────────────────

pub struct RetrievalTool {
    /// Names the corpus in error strings, e.g. "Docker".
    label: String,
    retriever: Arc<dyn DocumentRetriever>,
    k: usize,
}

impl RetrievalTool {
    pub fn new(label: impl Into<String>, retriever: Arc<dyn DocumentRetriever>) -> Self {
        Self {
            label: label.into(),
            retriever,
            k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }
}

/// `Source: {metadata}\nContent: {content}` per document, blank-line separated.
pub fn serialize_documents(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|doc| {
            format!(
                "Source: {}\nContent: {}",
                Value::Object(doc.metadata.clone()),
                doc.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl ToolAdapter for RetrievalTool {
    async fn invoke(&self, arguments: &Arguments) -> String {
        let Some(query) = string_arg(arguments, "query") else {
            return format!("Error retrieving {} documents: missing 'query' argument", self.label);
        };
        match self.retriever.retrieve(query, self.k).await {
            Ok(documents) => {
                info!(corpus = %self.label, hits = documents.len(), "documents retrieved");
                serialize_documents(&documents)
            }
            Err(e) => format!("Error retrieving {} documents: {}", self.label, e),
        }
    }
}

// ── KeywordRetriever ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct KeywordRetriever {
    documents: Vec<Document>,
}

impl KeywordRetriever {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Load every `.md` file directly under `dir`, in file name order, split
    /// into one document per heading section.
    pub fn from_dir(dir: &Path) -> AdapterResult<Self> {
        let io = |source: std::io::Error| AdapterError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths: Vec<_> = fs::read_dir(dir)
            .map_err(io)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
            .collect();
        paths.sort();

        let mut documents = Vec::new();
        for path in &paths {
            let text = fs::read_to_string(path).map_err(|source| AdapterError::Io {
                path: path.clone(),
                source,
            })?;
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            documents.extend(split_markdown(&source, &text));
        }

        if documents.is_empty() {
            return Err(AdapterError::Corpus {
                reason: format!("no markdown documents under '{}'", dir.display()),
            });
        }
        debug!(dir = %dir.display(), files = paths.len(), documents = documents.len(), "corpus loaded");
        Ok(Self { documents })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl DocumentRetriever for KeywordRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> AdapterResult<Vec<Document>> {
        let terms = tokenize(query);
        let mut scored: Vec<(usize, usize)> = self
            .documents
            .iter()
            .enumerate()
            .filter_map(|(idx, doc)| {
                let words = tokenize(&doc.content);
                let score = terms.iter().filter(|t| words.contains(*t)).count();
                (score > 0).then_some((score, idx))
            })
            .collect();
        // Highest score first; ties keep corpus order.
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, idx)| self.documents[idx].clone())
            .collect())
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1)
        .map(str::to_lowercase)
        .collect()
}

/// Split markdown on `#`..`####` headings. Text before the first heading
/// becomes its own section.
fn split_markdown(source: &str, text: &str) -> Vec<Document> {
    let mut sections = Vec::new();
    let mut heading: Option<String> = None;
    let mut body = String::new();

    let mut flush = |heading: &Option<String>, body: &mut String| {
        let content = body.trim();
        if !content.is_empty() {
            let mut metadata = Map::new();
            metadata.insert("source".to_string(), json!(source));
            if let Some(h) = heading {
                metadata.insert("section".to_string(), json!(h));
            }
            sections.push(Document {
                content: content.to_string(),
                metadata,
            });
        }
        body.clear();
    };

    for line in text.lines() {
        let hashes = line.chars().take_while(|c| *c == '#').count();
        if (1..=4).contains(&hashes) && line[hashes..].starts_with(' ') {
            flush(&heading, &mut body);
            heading = Some(line[hashes..].trim().to_string());
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }
    flush(&heading, &mut body);
    sections
}
