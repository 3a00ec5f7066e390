pub mod query_range;
pub mod selector;

pub mod prelude {
    pub use crate::query_range::{
        Direction, EpochNanos, LogEntry, QueryData, QueryRangeRequest, QueryRangeResponse,
        StreamResult, QUERY_RANGE_PATH,
    };
    pub use crate::selector::stream_selector;
}
