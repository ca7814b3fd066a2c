pub mod countdown;
pub mod dispatcher;
pub mod feed_client;
pub mod intake_store;
pub mod reconciliation;
