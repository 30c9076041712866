//! "Local AI" vs "Public AI" classification of a project.
//!
//! A project is local when its LLM is declared private and its embedding
//! model is not listed as public in the catalog. An embedding model the
//! catalog does not know about counts as private.

use serde::Serialize;

use crate::models::{InfoCatalog, ProjectMetadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrivacyClass {
    LocalAi,
    PublicAi,
}

impl PrivacyClass {
    pub fn of(project: &ProjectMetadata, catalog: &InfoCatalog) -> Self {
        if is_local(project, catalog) {
            PrivacyClass::LocalAi
        } else {
            PrivacyClass::PublicAi
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PrivacyClass::LocalAi => "Local AI",
            PrivacyClass::PublicAi => "Public AI",
        }
    }

    pub fn explanation(self) -> &'static str {
        match self {
            PrivacyClass::LocalAi => "You are NOT SHARING any data with external entities.",
            PrivacyClass::PublicAi => "You ARE SHARING data with external entities.",
        }
    }
}

pub fn is_local(project: &ProjectMetadata, catalog: &InfoCatalog) -> bool {
    let embedding_public = catalog.embeddings.iter().any(|entry| {
        project.embeddings.as_deref() == Some(entry.name.as_str())
            && entry.privacy.as_deref() == Some("public")
    });

    !embedding_public && project.llm_privacy.as_deref() == Some("private")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CatalogEntry;

    fn project(embeddings: &str, llm_privacy: Option<&str>) -> ProjectMetadata {
        ProjectMetadata {
            name: "docs".into(),
            embeddings: Some(embeddings.into()),
            llm_privacy: llm_privacy.map(str::to_string),
            ..Default::default()
        }
    }

    fn catalog(entries: &[(&str, &str)]) -> InfoCatalog {
        InfoCatalog {
            embeddings: entries
                .iter()
                .map(|(name, privacy)| CatalogEntry {
                    name: name.to_string(),
                    privacy: Some(privacy.to_string()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_unknown_embedding_counts_as_private() {
        let p = project("custom-embedder", Some("private"));
        assert!(is_local(&p, &InfoCatalog::default()));
        assert!(is_local(&p, &catalog(&[("openai", "public")])));
    }

    #[test]
    fn test_public_embedding_is_public_ai() {
        let p = project("openai", Some("private"));
        assert!(!is_local(&p, &catalog(&[("openai", "public")])));
    }

    #[test]
    fn test_public_llm_is_public_ai() {
        let c = catalog(&[("mpnet", "private")]);
        assert!(!is_local(&project("mpnet", Some("public")), &c));
        assert!(!is_local(&project("mpnet", None), &c));
    }

    #[test]
    fn test_private_everything_is_local() {
        let p = project("mpnet", Some("private"));
        let c = catalog(&[("mpnet", "private"), ("openai", "public")]);
        assert!(is_local(&p, &c));
        assert_eq!(PrivacyClass::of(&p, &c), PrivacyClass::LocalAi);
        assert_eq!(PrivacyClass::of(&p, &c).label(), "Local AI");
    }

    #[test]
    fn test_non_public_privacy_value_does_not_downgrade() {
        let p = project("mpnet", Some("private"));
        assert!(is_local(&p, &catalog(&[("mpnet", "unknown")])));
    }
}
