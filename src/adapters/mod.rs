// Adapters layer: concrete implementations for external systems (filesystem, spreadsheets, inbox).

pub mod sources;
pub mod spreadsheet;
pub mod storage;
