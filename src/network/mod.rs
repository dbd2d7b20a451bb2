//! Network interface bring-up
//!
//! The radio has two independent roles: it can host its own network
//! (access point) and join an existing one (station), in any combination.
//! [`bring_up`] drives a [`Radio`] into the roles the config asks for before
//! the server binds. Association failures are reported here and never reach
//! the server.

pub mod radio;

use std::net::Ipv4Addr;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::{NetworkConfig, RoleConfig};

pub use radio::{HostRadio, Radio};

/// Delay between association checks while waiting for the station to join.
const ASSOCIATION_POLL: std::time::Duration = std::time::Duration::from_millis(100);

/// A radio role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    AccessPoint,
    Station,
}

/// What one role ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMode {
    AccessPoint,
    Station,
    Disabled,
}

impl NetworkMode {
    pub fn for_role(role: Role, enabled: bool) -> Self {
        match (role, enabled) {
            (_, false) => NetworkMode::Disabled,
            (Role::AccessPoint, true) => NetworkMode::AccessPoint,
            (Role::Station, true) => NetworkMode::Station,
        }
    }
}

/// Address configuration of one interface, as reported by the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceConfig {
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub dns: Ipv4Addr,
}

/// Modes in effect after bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStatus {
    pub access_point: NetworkMode,
    pub station: NetworkMode,
}

impl NetworkStatus {
    pub fn is_offline(&self) -> bool {
        self.access_point == NetworkMode::Disabled && self.station == NetworkMode::Disabled
    }
}

pub async fn bring_up<R: Radio>(radio: &mut R, cfg: &NetworkConfig) -> Result<NetworkStatus> {
    bring_up_access_point(radio, &cfg.access_point)?;
    bring_up_station(radio, &cfg.station, cfg.connect_timeout()).await?;

    let status = NetworkStatus {
        access_point: NetworkMode::for_role(Role::AccessPoint, cfg.access_point.enabled),
        station: NetworkMode::for_role(Role::Station, cfg.station.enabled),
    };
    debug!(?status, "Network bring-up finished");
    Ok(status)
}

fn bring_up_access_point<R: Radio>(radio: &mut R, role: &RoleConfig) -> Result<()> {
    if !role.enabled {
        return radio
            .set_active(Role::AccessPoint, false)
            .context("failed to disable access point");
    }

    radio
        .configure_access_point(&role.ssid, &role.password)
        .with_context(|| format!("failed to configure access point {}", role.ssid))?;
    radio
        .set_active(Role::AccessPoint, true)
        .context("failed to enable access point")?;

    info!(ssid = %role.ssid, "Access point up");
    if let Some(ifconfig) = radio.ifconfig(Role::AccessPoint) {
        info!("access point config: {:?}", ifconfig);
    }
    Ok(())
}

async fn bring_up_station<R: Radio>(
    radio: &mut R,
    role: &RoleConfig,
    connect_timeout: std::time::Duration,
) -> Result<()> {
    if !role.enabled {
        return radio
            .set_active(Role::Station, false)
            .context("failed to disable station");
    }

    if !radio.is_connected() {
        info!(ssid = %role.ssid, "connecting to network...");
        radio
            .set_active(Role::Station, true)
            .context("failed to enable station")?;
        radio
            .connect(&role.ssid, &role.password)
            .with_context(|| format!("failed to join {}", role.ssid))?;

        tokio::time::timeout(connect_timeout, async {
            while !radio.is_connected() {
                tokio::time::sleep(ASSOCIATION_POLL).await;
            }
        })
        .await
        .with_context(|| {
            format!(
                "station did not associate with {} within {:?}",
                role.ssid, connect_timeout
            )
        })?;
    }

    if let Some(ifconfig) = radio.ifconfig(Role::Station) {
        info!("network config: {:?}", ifconfig);
    }
    Ok(())
}
