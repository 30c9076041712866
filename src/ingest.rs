//! Ingestion form and strategy selection.
//!
//! The operator may fill in a file, a URL and a block of text at the same
//! time; exactly one of them is ingested per submission, picked by
//! [`IngestionStrategy::resolve`] in the order file → URL → text. An empty
//! form resolves to nothing and no request is made.

use anyhow::Result;
use std::path::PathBuf;

use crate::client::{FileUpload, RagApi, TextIngestRequest, UrlIngestRequest};
use crate::console::{IngestOutcome, IngestionConsole};
use crate::error::ApiResult;
use crate::models::{IngestionResult, Tag};

/// Operator input for the next ingestion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestForm {
    pub file: Option<FileUpload>,
    pub url: String,
    pub text: String,
    /// Source name recorded for a text ingestion.
    pub source_name: String,
    pub tags: Vec<Tag>,
}

/// The single ingestion performed by one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestionStrategy {
    File(FileUpload),
    Url(UrlIngestRequest),
    Text(TextIngestRequest),
}

impl IngestionStrategy {
    pub fn resolve(form: &IngestForm) -> Option<Self> {
        if let Some(file) = &form.file {
            return Some(IngestionStrategy::File(file.clone()));
        }
        if !form.url.is_empty() {
            return Some(IngestionStrategy::Url(UrlIngestRequest {
                url: form.url.clone(),
            }));
        }
        if !form.text.is_empty() {
            let keywords = if form.tags.is_empty() {
                None
            } else {
                Some(form.tags.iter().map(|t| t.text.clone()).collect())
            };
            return Some(IngestionStrategy::Text(TextIngestRequest {
                text: form.text.clone(),
                source: form.source_name.clone(),
                keywords,
            }));
        }
        None
    }

    pub fn kind(&self) -> &'static str {
        match self {
            IngestionStrategy::File(_) => "file",
            IngestionStrategy::Url(_) => "url",
            IngestionStrategy::Text(_) => "text",
        }
    }

    pub async fn dispatch(&self, api: &dyn RagApi, project: &str) -> ApiResult<IngestionResult> {
        match self {
            IngestionStrategy::File(file) => api.ingest_file(project, file).await,
            IngestionStrategy::Url(request) => api.ingest_url(project, request).await,
            IngestionStrategy::Text(request) => api.ingest_text(project, request).await,
        }
    }

    /// Reset the inputs this strategy used, after it succeeded.
    pub(crate) fn consume(&self, form: &mut IngestForm) {
        match self {
            IngestionStrategy::File(_) => form.file = None,
            IngestionStrategy::Url(_) => form.url.clear(),
            IngestionStrategy::Text(_) => {
                form.text.clear();
                form.source_name.clear();
                form.tags.clear();
            }
        }
    }
}

/// CLI entry point for `ragc ingest`.
pub async fn run_ingest(
    console: &IngestionConsole,
    file: Option<PathBuf>,
    url: Option<String>,
    text: Option<String>,
    source: Option<String>,
    keywords: Vec<String>,
) -> Result<()> {
    if let Some(path) = file {
        let upload = FileUpload::from_path(&path).await.map_err(|e| {
            anyhow::anyhow!("Failed to read file {}: {}", path.display(), e)
        })?;
        console.select_file(upload);
    }
    if let Some(url) = url {
        console.set_url(&url);
    }
    if let Some(text) = text {
        console.set_text(&text);
    }
    if let Some(source) = source {
        console.set_source_name(&source);
    }
    for keyword in keywords {
        console.add_tag(&keyword);
    }

    match console.submit().await {
        IngestOutcome::Ingested(result) => {
            println!("ingested:  {}", result.source);
            println!("documents: {}", result.documents_produced);
            if result.chunks > 0 {
                println!("chunks:    {}", result.chunks);
            }
        }
        IngestOutcome::NothingToIngest => {
            println!("Nothing to ingest. Pass --file, --url, or --text.");
        }
        IngestOutcome::Failed | IngestOutcome::InFlight => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_form() -> IngestForm {
        IngestForm {
            file: Some(FileUpload::new("a.pdf", b"%PDF".to_vec())),
            url: "https://example.com".into(),
            text: "some text".into(),
            source_name: "notes".into(),
            tags: vec![Tag::new("a")],
        }
    }

    #[test]
    fn test_file_wins_over_url_and_text() {
        let strategy = IngestionStrategy::resolve(&full_form()).unwrap();
        assert_eq!(strategy.kind(), "file");
    }

    #[test]
    fn test_url_wins_over_text() {
        let mut form = full_form();
        form.file = None;
        let strategy = IngestionStrategy::resolve(&form).unwrap();
        assert_eq!(
            strategy,
            IngestionStrategy::Url(UrlIngestRequest {
                url: "https://example.com".into()
            })
        );
    }

    #[test]
    fn test_empty_form_resolves_to_nothing() {
        assert!(IngestionStrategy::resolve(&IngestForm::default()).is_none());

        // A source name or tags alone are not something to ingest.
        let form = IngestForm {
            source_name: "notes".into(),
            tags: vec![Tag::new("x")],
            ..Default::default()
        };
        assert!(IngestionStrategy::resolve(&form).is_none());
    }

    #[test]
    fn test_text_without_tags_omits_keywords() {
        let form = IngestForm {
            text: "hello".into(),
            source_name: "greeting".into(),
            ..Default::default()
        };
        let IngestionStrategy::Text(request) = IngestionStrategy::resolve(&form).unwrap() else {
            panic!("expected text strategy");
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"text": "hello", "source": "greeting"})
        );
    }

    #[test]
    fn test_text_with_tags_sends_keywords() {
        let form = IngestForm {
            text: "hello".into(),
            source_name: "greeting".into(),
            tags: vec![Tag::new("a"), Tag::new("b")],
            ..Default::default()
        };
        let IngestionStrategy::Text(request) = IngestionStrategy::resolve(&form).unwrap() else {
            panic!("expected text strategy");
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"text": "hello", "source": "greeting", "keywords": ["a", "b"]})
        );
    }

    #[test]
    fn test_consume_clears_only_used_inputs() {
        let mut form = full_form();
        IngestionStrategy::resolve(&form).unwrap().consume(&mut form);
        assert!(form.file.is_none());
        assert_eq!(form.url, "https://example.com");
        assert_eq!(form.text, "some text");

        IngestionStrategy::resolve(&form).unwrap().consume(&mut form);
        assert!(form.url.is_empty());
        assert_eq!(form.text, "some text");

        IngestionStrategy::resolve(&form).unwrap().consume(&mut form);
        assert!(form.text.is_empty());
        assert!(form.source_name.is_empty());
        assert!(form.tags.is_empty());
    }
}
