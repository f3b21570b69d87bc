//! Tokenizer, cursor-stable re-highlighting engine, and
//! stepped-execution client for a small pseudocode teaching
//! language.
//!
//! # Quick start
//!
//! ## Tokenize
//!
//! ```
//! use pseudocode_rs::{TokenKind, detokenize, tokenize};
//!
//! let input = "FOR i FROM 1 TO 3 DO\n  PRINT i\nENDFOR";
//! let tokens = tokenize(input);
//! assert_eq!(tokens[0].kind, TokenKind::Keyword);
//! assert_eq!(detokenize(&tokens), input);
//! ```
//!
//! ## Keep a surface highlighted while typing
//!
//! ```
//! use std::time::{Duration, Instant};
//! use pseudocode_rs::Highlighter;
//!
//! let quiet = Duration::from_millis(100);
//! let mut editor = Highlighter::new(quiet);
//! let t0 = Instant::now();
//! editor.input(t0, "PRINT ");
//! editor.input(t0 + Duration::from_millis(20), "\"hi\"");
//!
//! let state = editor.tick(t0 + Duration::from_millis(120)).unwrap();
//! assert_eq!(state.caret, 10);
//! assert_eq!(editor.passes(), 1);
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod config;
pub mod consistency;
pub mod editor;
pub mod lexer;
pub mod protocol;
pub mod reconcile;
pub mod remote;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod token;

pub use config::{Config, ConfigError};
pub use consistency::{ConsistencyReport, RunTrace, check, compare};
pub use editor::{EditorState, Position, Selection, Surface};
pub use lexer::tokenize;
pub use protocol::{StepLine, StepRecord, StepReply, Variables};
pub use reconcile::reconcile;
pub use remote::{HttpRemote, Interpretation, Remote, RemoteError};
pub use render::{Node, Presentation};
pub use scheduler::{Highlighter, RenderScheduler};
pub use session::{ExecutionClient, ExecutionSession, Outcome, SessionError, SessionStatus};
pub use token::{Span, Token, TokenKind, detokenize};

/// Unified error type for the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Configuration could not be read.
    #[error("{0}")]
    Config(#[from] ConfigError),
    /// A remote call failed.
    #[error("{0}")]
    Remote(#[from] RemoteError),
    /// A session operation was rejected or failed.
    #[error("{0}")]
    Session(#[from] SessionError),
}

/// Read the configuration from the environment and connect to the
/// configured interpreter service.
pub fn connect_from_env() -> Result<(Config, HttpRemote), Error> {
    let config = Config::from_env()?;
    let remote = HttpRemote::from_config(&config)?;
    Ok((config, remote))
}
