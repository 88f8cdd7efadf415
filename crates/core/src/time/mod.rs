pub mod record_date;

pub use record_date::{current_month, resolve_record_date};
