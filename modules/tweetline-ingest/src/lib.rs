pub mod decode;
pub mod error;
pub mod fetcher;
pub mod linking;
pub mod normalize;
pub mod paginator;
pub mod wire;

pub use decode::{BodySource, DecodingFetcher, PageDecoder, TimelineDecoder, TimelineEntity};
pub use error::{EntryError, FetchError, NormalizeError};
pub use fetcher::{fetch_fn, FnFetcher, PageFetcher, RawPage};
pub use linking::{assemble_threads, link_replies, mark_pinned};
pub use normalize::{normalize_post, normalize_profile, Normalize, NormalizeOptions};
pub use paginator::{
    DoneReason, Entry, EntrySink, EntryStream, FailReason, Paginator, PaginatorConfig, Session,
    SessionState,
};
pub use tweetline_common::{Post, Profile};
