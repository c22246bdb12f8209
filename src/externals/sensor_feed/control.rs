use anyhow::Result;
use tokio::sync::broadcast::Sender;
use tracing::debug;

use crate::models::host_address::HostAddress;

/// Handle used by the dashboard to point the feed at another host.
#[derive(Debug, Clone)]
pub struct FeedControl {
    tx_connect: Sender<HostAddress>,
    default_port: u16,
}

impl FeedControl {
    pub fn new(tx_connect: Sender<HostAddress>, default_port: u16) -> Self {
        Self {
            tx_connect,
            default_port,
        }
    }

    /// Validate user input of the form `host[:port]` and request a
    /// connection to it. The current connection, if any, is replaced.
    pub fn connect(&self, input: &str) -> Result<HostAddress> {
        let address = HostAddress::parse(input, self.default_port)?;
        self.request(address.clone())?;
        Ok(address)
    }

    /// Request a connection to an already validated address.
    pub fn request(&self, address: HostAddress) -> Result<()> {
        debug!("Requesting connection to {}.", address);
        self.tx_connect.send(address)?;
        Ok(())
    }
}
