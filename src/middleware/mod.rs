//! Plug-and-play CMU EntraID authentication and route gating for Axum.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cmu_entraid_gate::middleware::{BrokerConfig, auth_routes, with_route_gate};
//!
//! // 1. Configure from environment (missing values are reported when used)
//! let config = BrokerConfig::from_env();
//!
//! // 2. Mount auth routes next to your pages
//! let app = axum::Router::new()
//!     .route("/main", get(main_page))
//!     .merge(auth_routes(&config, config.auth_client(), config.backend_client()));
//!
//! // 3. Gate every navigation
//! let app = with_route_gate(app, &config, config.backend_client());
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod gate;
mod roles;
mod routes;
mod state;
mod traits;
mod types;

pub use config::BrokerConfig;
pub use error::AuthError;
pub use extractor::{SessionReader, SessionUser};
pub use gate::{GateDecision, RouteClass, RoutePolicy, with_route_gate};
pub use roles::EdgeRoleResolver;
pub use routes::auth_routes;
pub use traits::{BackendDirectory, IdentityProvider};
pub use types::{ApiResponse, MeResponse, SignInRequest};
