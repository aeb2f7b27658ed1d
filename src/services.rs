pub mod auth;
pub mod catalog_service;
pub mod ledger_service;
pub mod projection_service;
pub mod report_service;
pub mod reversal_service;
pub mod transfer_service;

#[cfg(test)]
pub(crate) mod test_support;
