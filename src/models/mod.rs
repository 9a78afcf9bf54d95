pub mod arrears;
pub mod attendance;
pub mod common;
pub mod forecast;
pub mod stipend;
