//! # Quiver
//!
//! Executes ordered collections of declaratively defined HTTP requests,
//! substituting `{{...}}` placeholders from environment variables and
//! prior responses, and evaluating structured assertions against each
//! response. One failing request never aborts a run; every request gets
//! a result and the caller decides what overall success means.
//!
//! ```no_run
//! use quiver::{run_collection, Collection, RunOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let collection = Collection::from_path("smoke.yaml")?;
//!     let results = run_collection(&collection, &RunOptions::default()).await?;
//!     assert!(results.iter().all(|result| result.passed));
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod cli;
pub mod collection;
pub mod environment;
pub mod http;
pub mod runner;
pub mod template;

pub use assertions::{evaluate, evaluate_operators, AssertionMap, AssertionResult};
pub use collection::{Collection, LoadError, RequestSpec};
pub use environment::{load_environment, EnvironmentError};
pub use http::{ErrorCode, HttpClient, PreparedRequest, ReqwestClient, RequestError, ResponseRecord};
pub use runner::{
    run_collection, run_collection_with, ExecutionContext, RequestResult, RunOptions, RunnerError,
};
pub use template::{interpolate, interpolate_deep, resolve_path};
