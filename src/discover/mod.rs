pub mod cidr;
pub mod targets;

pub use cidr::Ipv4Cidr;
pub use targets::{expand_inputs, extract_tokens, TargetSpec};
