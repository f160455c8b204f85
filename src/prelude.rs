pub use anyhow::{anyhow, bail, Context, Result};
pub use log::{debug, error, info, trace, warn};

pub use std::io::Write;
pub use std::str::FromStr;
pub use std::sync::Arc;

pub use crate::config::{self, Config};
pub use crate::error::{Error, TransportError};
pub use crate::inverter::{InverterSession, SessionConfig};
pub use crate::mpp::{self, catalog::Catalog, command::CommandDescriptor, resolver::ResolvedCommand};
pub use crate::options::Options;
pub use crate::transport::{self, Execution, Outcome, Transport};
