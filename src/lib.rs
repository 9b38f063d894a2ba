//! # ExpertAgent
//!
//! An educational chat backend that forwards a student's message to a
//! language model and, when the model asks for it, attaches a ranked
//! selection of learning resources to the reply.
//!
//! ## Architecture
//!
//! ```text
//!   POST /chat
//!       │
//!       ▼
//! ┌──────────────┐   ┌────────────┐   ┌──────────┐   ┌──────────────┐
//! │  Completion  │──▶│  trigger   │──▶│   rank   │──▶│    reply     │
//! │ (OpenAI API) │   │ (marker →  │   │ (catalog │   │ (strip + top │
//! └──────────────┘   │  keywords) │   │  scoring)│   │  N labels)   │
//!                    └────────────┘   └────┬─────┘   └──────────────┘
//!                                          │
//!                                     ┌────┴─────┐
//!                                     │  SQLite  │
//!                                     └──────────┘
//! ```
//!
//! The model requests resources by ending its reply with
//! `RESOURCE_REQUESTED: <keywords>`. Keywords are matched against each
//! resource's topic and content; the best three are returned as labels
//! alongside the reply with the marker line removed.
//!
//! ## Quick Start
//!
//! ```bash
//! expertagent init                    # create database
//! expertagent seed                    # load sample resources
//! expertagent rank binary search      # rank the catalog offline
//! expertagent chat "What is recursion?"
//! expertagent serve                   # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`trigger`] | Resource-request marker detection |
//! | [`rank`] | Keyword scoring over the catalog |
//! | [`reply`] | Reply stripping and resource labels |
//! | [`completion`] | Completion service abstraction |
//! | [`catalog`] | Learning-resource store |
//! | [`chat`] | Chat orchestration |
//! | [`students`] | Student records |
//! | [`documents`] | Document folders and documents |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod catalog;
pub mod chat;
pub mod completion;
pub mod config;
pub mod db;
pub mod documents;
pub mod migrate;
pub mod models;
pub mod rank;
pub mod reply;
pub mod server;
pub mod students;
pub mod trigger;
