//! # docforge
//!
//! Turns a source document into a runnable program with a small crew of
//! LLM-backed agents.
//!
//! This library provides:
//! - Agents with a read-only or a code-executing capability
//! - Tasks run strictly in order, each seeing every earlier result
//! - Tools for reading local files and searching online documentation
//! - A sandbox for running generated code under time and memory limits
//! - A small numeric HTTP service the generated code can target
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docforge::{config::Config, llm::OpenAiClient, pipeline::PipelineDefinition};
//!
//! let config = Config::from_env()?;
//! let llm = Arc::new(OpenAiClient::new(&config.api_key, &config.llm_base_url)?);
//! let mut crew = PipelineDefinition::from_config(&config)?.build(&config, llm)?;
//! let output = crew.run().await?;
//! println!("{}", output.final_output);
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod context;
pub mod crew;
pub mod events;
pub mod llm;
pub mod numerics;
pub mod persist;
pub mod pipeline;
pub mod sandbox;
pub mod task;
pub mod tools;

pub use agent::{Agent, AgentError, AgentProfile, AgentSettings};
pub use config::Config;
pub use context::ExecutionContext;
pub use crew::{Crew, CrewError, CrewOutput};
pub use task::{Task, TaskOutput};
