//! Types shared between the sensor dashboard and anything that publishes to
//! it: the feed wire format and the physical units carried in it.

pub mod packet;
pub mod physical;
