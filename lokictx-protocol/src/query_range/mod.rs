mod request;
mod response;
mod timestamp;

pub use request::{Direction, QueryRangeRequest, QUERY_RANGE_PATH};
pub use response::{LogEntry, QueryData, QueryRangeResponse, StreamResult};
pub use timestamp::EpochNanos;
