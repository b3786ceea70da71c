//! Retrieve upstream content under strict rate-limit and authentication
//! policies, abstracting the provider so scheduler and validator do not
//! know transport details (C1).

mod auth;
mod client;
mod rate_limit;
mod ssrf;

pub use auth::AuthMode;
pub use client::{Candidate, CandidatePage, FetchedDocument, GitHubProvider, SearchCursor, SearchFilters, UpstreamProvider};
pub use rate_limit::{Backoff, RateLimitStatus};
pub use ssrf::assert_not_blocked;
