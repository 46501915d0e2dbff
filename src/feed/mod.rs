/// Story feed pagination

pub mod paginator;

pub use paginator::{
    load_page, refresh_key, FeedConfig, FeedLoad, FeedPage, FeedPaginator, FeedSnapshot,
    DEFAULT_PAGE_SIZE,
};
