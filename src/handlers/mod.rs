pub mod api;
pub mod campaigns;
pub mod stream;
pub mod webhooks;
