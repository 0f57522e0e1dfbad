pub mod client;
pub mod cmd;
pub mod error;
pub mod post;
pub mod similarity;
