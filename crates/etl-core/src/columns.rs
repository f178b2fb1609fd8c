//! Column names shared by the pipeline stages.

pub const STORE_ID: &str = "Store_ID";
pub const DATE: &str = "Date";
pub const MONTH: &str = "Month";
pub const DEPT: &str = "Dept";
pub const IS_HOLIDAY: &str = "IsHoliday";
pub const WEEKLY_SALES: &str = "Weekly_Sales";
pub const CPI: &str = "CPI";
pub const UNEMPLOYMENT: &str = "Unemployment";
pub const AVG_SALES: &str = "Avg_Sales";

/// Columns of the clean table, in output order.
pub const CLEAN_COLUMNS: [&str; 7] = [
    STORE_ID,
    MONTH,
    DEPT,
    IS_HOLIDAY,
    WEEKLY_SALES,
    CPI,
    UNEMPLOYMENT,
];

/// Columns of the monthly aggregate table, in output order.
pub const AGG_COLUMNS: [&str; 2] = [MONTH, AVG_SALES];
