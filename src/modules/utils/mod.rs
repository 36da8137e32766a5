pub mod io;
pub mod logging;
pub mod time;

pub use io::{is_valid_email, read_line};
pub use logging::{format_sensitive, initialize_logging, log_data_operation, log_registration_event};
pub use time::{format_duration, format_timestamp, get_current_timestamp};
