pub mod catalog;
pub mod reports;
pub mod stock;
pub mod transfers;
