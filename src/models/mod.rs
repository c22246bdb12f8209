pub mod connection_state;
pub mod host_address;
pub mod projection;
pub mod reading;
pub mod selection;
pub mod user_command;
