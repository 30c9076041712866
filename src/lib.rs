//! # RAG Console
//!
//! Client-side console for a retrieval-augmented-generation backend that
//! speaks JSON over HTTP.
//!
//! Two controllers sit on top of a shared [`client::RagApi`]:
//!
//! - [`chat::ChatSession`] threads successive questions into one
//!   server-tracked conversation, one question in flight at a time.
//! - [`console::IngestionConsole`] shows project metadata, lists or searches
//!   embedded fragments depending on corpus size, and ingests files, URLs
//!   or raw text.
//!
//! ## Architecture
//!
//! ```text
//!  ┌─────────────┐   ┌──────────────────┐
//!  │ ChatSession │   │ IngestionConsole │
//!  └──────┬──────┘   └────────┬─────────┘
//!         │  ProjectInfoCache │
//!         ├───────────────────┤
//!         ▼                   ▼
//!  ┌─────────────────────────────────┐
//!  │ RagApi (HttpClient + Credentials)│──▶ backend
//!  └─────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Backend payloads and controller data |
//! | [`error`] | Request errors and the operator error log |
//! | [`client`] | `RagApi` trait, reqwest client, credentials |
//! | [`info`] | Global catalog cache |
//! | [`privacy`] | Local/public AI classification |
//! | [`chat`] | Chat session state machine |
//! | [`ingest`] | Ingestion form and strategy selection |
//! | [`console`] | Project console: listing, search, ingestion |
//! | [`stats`] | Token usage overview |

pub mod chat;
pub mod client;
pub mod config;
pub mod console;
pub mod error;
pub mod info;
pub mod ingest;
pub mod models;
pub mod privacy;
pub mod stats;
