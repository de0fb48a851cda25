pub mod clock;
pub mod http;
pub mod mail;
pub mod throttle;
pub mod token;
