//! depush - version-change propagation library
//!
//! Given a set of version changes, either written explicitly or read from a
//! source repository's own manifests, this library rewrites the matching
//! version fields in each target repository's checked-out working copy:
//! - Maven (pom.xml, including `${property}` references)
//! - npm (package.json)
//! - Helm (requirements.yaml below Chart.yaml)
//! - Homebrew (Formula/*.rb, with checksum refresh)
//! - Jenkins plugin lists (plugins.txt)
//! - Loose files (gradle.properties, Dockerfile)
//!
//! Every candidate change is classified per repository as valid, invalid
//! (filtered) or failed (no field matched).

pub mod checksum;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod update;
