pub mod contract;
pub mod receipt;

pub use receipt::{ExpenseRecord, ExtractionResult, ReceiptItem, UNCATEGORIZED};
