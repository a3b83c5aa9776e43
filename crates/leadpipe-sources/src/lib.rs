pub mod apify;
pub mod client;
pub mod error;
pub mod normalize;
pub(crate) mod rate_limit;
pub mod registry;
pub mod synthetic;
pub mod types;
pub mod web_search;

pub use apify::ApifySource;
pub use client::{build_http_client, RetryPolicy};
pub use error::SourceError;
pub use normalize::{is_valid_email, normalize_all, normalize_raw_lead};
pub use registry::{build_registry, LeadSource, SourceRegistry};
pub use synthetic::SyntheticSource;
pub use types::RawLead;
pub use web_search::WebSearchSource;
