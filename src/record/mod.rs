pub mod base;
pub mod dates;
pub mod macros;
pub mod payload;
pub mod remote;

pub use base::Record;
pub use dates::{parse_date, parse_date_str};
pub use payload::PayloadExt;
pub use remote::{
    CREATED_AT_KEY, DEFAULT_REMOTE_ID_KEY_PATH, DEFAULT_REMOTE_ID_PAYLOAD_KEY, RemoteRecord,
    UPDATED_AT_KEY, remote_entity,
};
