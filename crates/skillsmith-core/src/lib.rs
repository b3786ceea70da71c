//! Skillsmith core - registry and discovery engine for agent skills.
//!
//! This crate implements the ingestion, security-scanning, scoring,
//! cataloging, search, and recommendation pipeline for Markdown-based
//! "skill" documents. It does not execute or sandbox skills; it discovers,
//! vets, and surfaces them.
//!
//! # Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌───────────┐   ┌─────────┐   ┌────────────────────┐
//! │ Fetch Client │ → │ Validator │ → │ Scanner │ → │ Scoring/Quarantine │
//! └──────────────┘   └───────────┘   └─────────┘   └────────────────────┘
//!                                                              │
//!                                                              ▼
//!                                                      ┌───────────────┐
//!                                                      │ Catalog Store │
//!                                                      └───────────────┘
//!                                                        │         │
//!                                                        ▼         ▼
//!                                               ┌──────────────┐ ┌─────────────┐
//!                                               │ Search Engine│ │ Recommender │
//!                                               └──────────────┘ └─────────────┘
//! ```
//!
//! Every scan and trust-tier transition appends to the hash-chained audit
//! log (`audit`).

#![warn(missing_docs)]

pub mod audit;
pub mod catalog;
pub mod compare;
pub mod config;
pub mod embedding;
pub mod errors;
pub mod fetch;
pub mod quarantine;
pub mod recommend;
pub mod scanner;
pub mod scoring;
pub mod search;
pub mod search_engine;
pub mod skill_md;
pub mod suggest_install;
pub mod sync;
pub mod types;
pub mod validate;

pub use audit::AuditLog;
pub use catalog::CatalogStore;
pub use compare::compare;
pub use config::CoreConfig;
pub use embedding::{cosine_similarity, embed_skill_text, embed_text, EMBEDDING_DIM, EMBEDDING_MODEL_ID};
pub use errors::{CoreError, ErrorKind, Result};
pub use fetch::{AuthMode, GitHubProvider, RateLimitStatus, UpstreamProvider};
pub use quarantine::QuarantineStore;
pub use scanner::{scan, ScannerConfig};
pub use search::{reciprocal_rank_fusion, weighted_sum_fusion, FusionMethod};
pub use search_engine::SearchEngine;
pub use suggest_install::suggest_install;
pub use sync::{SyncMode, SyncOptions, SyncReport};
pub use types::*;
pub use validate::{ValidatedSkill, ValidationOptions};
