pub mod cache;
pub mod export;
pub mod profile;
pub mod workbook;
