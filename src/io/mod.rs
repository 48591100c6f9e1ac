/// CSV export of forecast and evaluation tables.
pub mod export;
pub mod import;
