use std::net::{IpAddr, SocketAddr};

use anyhow::Error;
use log::{error, warn};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    actuator::Actuator,
    config::Config,
    control::SharedControl,
    display::{Link, StatusDisplay},
    lights::LightController,
    server::Server,
};

pub mod actuator;
pub mod color;
pub mod config;
pub mod control;
pub mod display;
pub mod error;
pub mod http;
pub mod lights;
pub mod network;
pub mod server;

pub mod prelude {
    pub use crate::{
        actuator::Actuator,
        color::*,
        config::*,
        control::*,
        display::*,
        error::NeopixelError,
        lights::*,
        network::{associate, Associate},
        server::Server,
    };
}

/// What `launch` left running
pub struct Running {
    pub control: SharedControl,
    /// Our address, or `None` if association failed
    pub address: Option<IpAddr>,
    /// Where the server is listening, if it was started
    pub local_addr: Option<SocketAddr>,
    pub actuator: JoinHandle<()>,
    pub server: Option<JoinHandle<()>>,
}

/// Start the actuator, associate, and start the server if we got an
/// address. The lights run while association is retried. Without an
/// address they keep running, showing the failure on the display.
pub async fn launch(
    config: &Config,
    lights: LightController,
    display: impl StatusDisplay + 'static,
) -> Result<Running, Error> {
    let control = SharedControl::new(config.defaults.control_state(), config.defaults.min_speed());

    let (link, receiver) = watch::channel(Link::Connecting);
    let actuator = Actuator::new(control.clone(), lights, display, receiver);
    let actuator = tokio::spawn(actuator.run());

    let address = match network::associate(&config.network).await {
        Ok(ip) => Some(ip),
        Err(e) => {
            error!("Network: {}", e);
            None
        }
    };
    link.send_replace(Link::from(address));

    let (server, local_addr) = match address {
        Some(_) => {
            let listener = Server::bind(&config.server).await?;
            let local_addr = listener.local_addr()?;
            let server = Server::new(control.clone(), &config.server);
            (Some(tokio::spawn(server.serve(listener))), Some(local_addr))
        }
        None => {
            warn!("Server: not starting without a network");
            (None, None)
        }
    };

    Ok(Running {
        control,
        address,
        local_addr,
        actuator,
        server,
    })
}
