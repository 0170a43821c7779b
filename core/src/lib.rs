//! Typed blocking client for the Splitwise REST API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network; a `Transport` executes the round-trip in between.
//! `Splitwise` combines the two behind one trait per resource family.
//!
//! # Design
//! - `SplitwiseClient` is stateless: a base URL and an auth provider.
//! - Each endpoint is split into `build_*` (produces request) and `parse_*`
//!   (classifies status, decodes the envelope), so the I/O boundary is
//!   explicit.
//! - By-share expenses are encoded by `compose`, which writes the base
//!   expense and the indexed participant keys into one flat JSON object.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod auth;
pub mod client;
pub mod compose;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod resources;
pub mod transport;
pub mod types;
pub mod update;

pub use auth::{ApiKeyAuth, AuthError, AuthProvider};
pub use client::{SplitwiseClient, SERVER_ADDRESS};
pub use compose::{compose_by_share, validate_shares, ExpenseByShare};
pub use config::{ClientConfig, ConfigError};
pub use context::{CallContext, CancelHandle};
pub use error::{check_status, ApiError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use resources::{Categories, Currencies, Expenses, Friends, Groups, Splitwise, Users};
pub use transport::{Transport, UreqTransport};
pub use types::*;
pub use update::{UserField, UserUpdate};
