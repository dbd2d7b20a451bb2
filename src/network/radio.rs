use std::net::Ipv4Addr;

use anyhow::Result;

use super::{InterfaceConfig, Role};

/// The Wi-Fi hardware as seen by bring-up.
pub trait Radio {
    fn set_active(&mut self, role: Role, active: bool) -> Result<()>;

    fn is_active(&self, role: Role) -> bool;

    /// Start joining `ssid`. Association completes asynchronously; poll
    /// [`Radio::is_connected`].
    fn connect(&mut self, ssid: &str, password: &str) -> Result<()>;

    fn is_connected(&self) -> bool;

    fn configure_access_point(&mut self, ssid: &str, password: &str) -> Result<()>;

    /// Address configuration of an active role.
    fn ifconfig(&self, role: Role) -> Option<InterfaceConfig>;
}

/// Radio stand-in for running on a host, where the IP stack is already up.
///
/// Joining always succeeds immediately and both roles report loopback
/// addresses.
#[derive(Debug, Default)]
pub struct HostRadio {
    access_point: bool,
    station: bool,
    connected: bool,
}

impl Radio for HostRadio {
    fn set_active(&mut self, role: Role, active: bool) -> Result<()> {
        match role {
            Role::AccessPoint => self.access_point = active,
            Role::Station => {
                self.station = active;
                if !active {
                    self.connected = false;
                }
            }
        }
        Ok(())
    }

    fn is_active(&self, role: Role) -> bool {
        match role {
            Role::AccessPoint => self.access_point,
            Role::Station => self.station,
        }
    }

    fn connect(&mut self, ssid: &str, _password: &str) -> Result<()> {
        if !self.station {
            anyhow::bail!("station role is not active");
        }
        tracing::debug!(ssid, "Host radio joined");
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn configure_access_point(&mut self, ssid: &str, _password: &str) -> Result<()> {
        if ssid.is_empty() {
            anyhow::bail!("access point SSID must not be empty");
        }
        Ok(())
    }

    fn ifconfig(&self, role: Role) -> Option<InterfaceConfig> {
        if !self.is_active(role) {
            return None;
        }
        Some(InterfaceConfig {
            ip: Ipv4Addr::LOCALHOST,
            netmask: Ipv4Addr::new(255, 0, 0, 0),
            gateway: Ipv4Addr::LOCALHOST,
            dns: Ipv4Addr::LOCALHOST,
        })
    }
}
