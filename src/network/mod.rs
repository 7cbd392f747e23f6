use std::{net::IpAddr, time::Duration};

use log::{info, warn};
use tokio::net::UdpSocket;

use crate::{
    config::{NetworkConfig, NetworkMode},
    error::NeopixelError,
};

/// Brings the network up once at startup and reports our address.
#[allow(async_fn_in_trait)]
pub trait Associate {
    async fn associate(&self) -> Result<IpAddr, NeopixelError>;
}

/// An address fixed in the config
pub struct StaticAssociation(pub IpAddr);

impl Associate for StaticAssociation {
    async fn associate(&self) -> Result<IpAddr, NeopixelError> {
        Ok(self.0)
    }
}

/// Asks the routing table which local address reaches `target`, retrying
/// until the interface has one.
pub struct ProbeAssociation {
    pub target: String,
    pub attempts: u32,
    pub retry_delay: Duration,
}

impl ProbeAssociation {
    async fn probe(&self) -> Result<IpAddr, NeopixelError> {
        // Connecting a UDP socket sends nothing, it only picks a route
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(&self.target).await?;
        let ip = socket.local_addr()?.ip();

        if ip.is_unspecified() {
            return Err(NeopixelError::AssociationFailure(
                "no address assigned yet".to_string(),
            ));
        }
        Ok(ip)
    }
}

impl Associate for ProbeAssociation {
    async fn associate(&self) -> Result<IpAddr, NeopixelError> {
        let mut last_error = NeopixelError::AssociationFailure("no attempts made".to_string());

        for attempt in 1..=self.attempts {
            match self.probe().await {
                Ok(ip) => {
                    info!("Network: associated as {}", ip);
                    return Ok(ip);
                }
                Err(e) => {
                    warn!(
                        "Network: attempt {}/{} failed: {}",
                        attempt, self.attempts, e
                    );
                    last_error = e;
                }
            }

            if attempt < self.attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(NeopixelError::AssociationFailure(last_error.to_string()))
    }
}

/// Never associates. Runs the lights on their own.
pub struct Disabled;

impl Associate for Disabled {
    async fn associate(&self) -> Result<IpAddr, NeopixelError> {
        Err(NeopixelError::AssociationFailure(
            "networking disabled".to_string(),
        ))
    }
}

/// Associate the way `config` asks to
pub async fn associate(config: &NetworkConfig) -> Result<IpAddr, NeopixelError> {
    match &config.mode {
        NetworkMode::Static(ip) => StaticAssociation(*ip).associate().await,
        NetworkMode::Probe => {
            ProbeAssociation {
                target: config.probe_target.clone(),
                attempts: config.attempts,
                retry_delay: Duration::from_millis(config.retry_delay_ms),
            }
            .associate()
            .await
        }
        NetworkMode::Disabled => Disabled.associate().await,
    }
}
