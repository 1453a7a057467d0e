pub mod defs;
pub mod state;

pub use defs::{
    CandidateItem, DigestItem, DispatchError, FeedEntry, FeedSource, MailTransport,
    OutgoingMessage, SeenRecord, SummaryFailure,
};
pub use state::{DedupStore, SqliteDedupStore, StoreError};
