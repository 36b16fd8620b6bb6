//! `rollcall-auth`: stateless authentication/authorization gateway.
//!
//! Token codec, identity resolution, the per-request authentication pipeline,
//! the permission matrix and the startup seeder. Storage is reached only
//! through [`CredentialStore`]; HTTP framing lives in the API crate.

pub mod authorize;
pub mod claims;
pub mod credential;
pub mod gateway;
pub mod password;
pub mod principal;
pub mod resolver;
pub mod roles;
pub mod seeder;
pub mod token;

pub use authorize::{AuthDecision, Evaluation, PathPattern, PermissionMatrix, PermissionRule, Requirement};
pub use claims::{TokenClaims, TokenError, validate_claims};
pub use credential::{Credential, CredentialStore, StoreError};
pub use gateway::{AuthGateway, GatewayOutcome, RejectReason, extract_bearer};
pub use password::{HashError, SecretHasher};
pub use principal::Principal;
pub use resolver::{IdentityResolver, ResolveError};
pub use roles::{Role, UnknownRole};
pub use seeder::{AdminSeed, SeedError, SeedReport, seed};
pub use token::{CodecConfigError, IssueError, IssuedToken, TokenCodec};
