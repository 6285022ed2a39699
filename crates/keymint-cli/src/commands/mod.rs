pub mod client;
pub mod code;
pub mod envelope;
pub mod key;
pub mod token;
