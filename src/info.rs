//! Global catalog cache and the `ragc info` / `ragc show` commands.
//!
//! [`ProjectInfoCache`] fetches `GET /info` at most once and hands out the
//! same snapshot to every controller that shares it. A failed fetch is not
//! cached; callers get an empty catalog (every embedding then counts as
//! private) and may try again on their next mount.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::client::RagApi;
use crate::error::ApiResult;
use crate::models::{InfoCatalog, ProjectMetadata};
use crate::privacy::PrivacyClass;

#[derive(Default)]
pub struct ProjectInfoCache {
    cell: OnceCell<Arc<InfoCatalog>>,
}

impl ProjectInfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache pre-filled with `catalog`; never hits the network.
    pub fn with_catalog(catalog: InfoCatalog) -> Self {
        Self {
            cell: OnceCell::new_with(Some(Arc::new(catalog))),
        }
    }

    /// Fetch the catalog on first use.
    pub async fn fetch(&self, api: &dyn RagApi) -> ApiResult<Arc<InfoCatalog>> {
        self.cell
            .get_or_try_init(|| async move { api.info().await.map(Arc::new) })
            .await
            .cloned()
    }

    /// The cached catalog, or an empty one if it was never fetched.
    pub fn get(&self) -> Arc<InfoCatalog> {
        self.cell
            .get()
            .cloned()
            .unwrap_or_else(|| Arc::new(InfoCatalog::default()))
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

/// CLI entry point for `ragc info`.
pub async fn run_info(api: &dyn RagApi) -> Result<()> {
    let catalog = api.info().await?;

    println!("Backend version: {}", catalog.version);
    println!();
    println!("  {:<40} PRIVACY", "EMBEDDING");
    for e in &catalog.embeddings {
        println!("  {:<40} {}", e.name, e.privacy.as_deref().unwrap_or("-"));
    }
    println!();
    println!("  {:<40} PRIVACY", "LLM");
    for l in &catalog.llms {
        println!("  {:<40} {}", l.name, l.privacy.as_deref().unwrap_or("-"));
    }
    println!();
    println!("  Loaders: {}", catalog.loaders.len());
    for loader in &catalog.loaders {
        match loader.as_str() {
            Some(s) => println!("    {}", s),
            None => println!("    {}", loader),
        }
    }

    Ok(())
}

/// Print a project snapshot with its privacy classification.
pub fn print_project(project: &ProjectMetadata, catalog: &InfoCatalog) {
    let class = PrivacyClass::of(project, catalog);

    println!("--- Project {} ---", project.name);
    println!("privacy:         {} ({})", class.label(), class.explanation());
    println!("llm:             {}", project.llm);
    if let Some(t) = &project.llm_type {
        println!("llm_type:        {}", t);
    }
    println!("vectorstore:     {}", project.vectorstore.as_deref().unwrap_or("-"));
    if !project.is_vision() {
        println!("embeddings:      {}", project.embeddings.as_deref().unwrap_or("-"));
        println!(
            "documents:       {}",
            project
                .documents
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
        if let Some(m) = project.metadatas {
            println!("metadatas:       {}", m);
        }
        if let Some(k) = project.k {
            println!("k:               {}", k);
        }
        if let Some(score) = project.score {
            println!("score:           {}", score);
        }
    }
    println!("sandboxed:       {}", if project.sandboxed { "yes" } else { "no" });
    if let Some(sp) = &project.sandbox_project {
        println!("sandbox_project: {}", sp);
    }
    if let Some(c) = &project.censorship {
        println!("censorship:      {}", c);
    }
    if let Some(system) = &project.system {
        println!();
        println!("--- System prompt ---");
        println!("{}", system);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prefilled_cache_is_loaded() {
        let cache = ProjectInfoCache::with_catalog(InfoCatalog {
            version: "1.2".into(),
            ..Default::default()
        });
        assert!(cache.is_loaded());
        assert_eq!(cache.get().version, "1.2");
    }

    #[test]
    fn test_empty_cache_returns_default_catalog() {
        let cache = ProjectInfoCache::new();
        assert!(!cache.is_loaded());
        assert!(cache.get().embeddings.is_empty());
    }
}
