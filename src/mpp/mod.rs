//! MPP inverter protocol: the command catalog, resolution of requested text to a catalog
//! entry, and the checksum/response helpers the descriptors rely on.

pub mod catalog;
pub mod command;
pub mod crc;
pub mod resolver;
pub mod response;
