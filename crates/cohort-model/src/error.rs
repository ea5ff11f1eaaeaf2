use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid period label '{label}': expected YYYY-MM or YYYY-Qn")]
    InvalidPeriodLabel { label: String },
    #[error("date arithmetic out of range: {date} {operation}")]
    DateOutOfRange {
        date: NaiveDate,
        operation: String,
    },
}

pub type Result<T> = std::result::Result<T, ModelError>;
