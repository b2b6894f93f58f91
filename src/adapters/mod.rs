pub mod provider;
pub mod store;

pub use provider::{
    FixedPeriodSource, HttpPeriodSource, ListedMatch, PeriodListing, PeriodSource,
    MATCHES_PER_PERIOD,
};
pub use store::{highest_local_period, DocumentStore, FsDocumentStore, InMemoryDocumentStore};
