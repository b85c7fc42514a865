//! IPv4 multicast membership management.
//!
//! Keeps a per-socket table of joined groups next to the kernel-level
//! membership, so datagrams from groups a socket never joined can be
//! rejected at the application level (the soft filter). On platforms where
//! Ethernet multicast must be programmed on the device, a driver hook is
//! consulted on join and leave.

use std::collections::HashMap;
use std::net::{Ipv4Addr, UdpSocket};

use log::{debug, warn};
use parking_lot::Mutex;

use crate::transport::InitState;
use crate::{Error, Result};

/// Hook programming hardware multicast filters on the network device.
pub trait EthernetDriver: Send {
    /// Adds the group to the device filter.
    ///
    /// # Errors
    ///
    /// Implementations fail with `Nok` when the device rejects the filter.
    fn add_membership(&self, group: Ipv4Addr) -> Result<()>;

    /// Removes the group from the device filter.
    ///
    /// # Errors
    ///
    /// Implementations fail with `Nok` when the device rejects the change.
    fn drop_membership(&self, group: Ipv4Addr) -> Result<()>;
}

impl std::fmt::Debug for dyn EthernetDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EthernetDriver")
    }
}

#[derive(Debug, Default)]
struct JoinTable {
    /// Joined groups per socket id.
    joined: HashMap<usize, Vec<Ipv4Addr>>,
}

/// Registry of multicast memberships.
#[derive(Debug)]
pub struct MulticastRegistry {
    state: InitState,
    table: Mutex<JoinTable>,
    driver: Mutex<Option<Box<dyn EthernetDriver>>>,
    /// Capability flag: the platform needs device-level filter updates.
    hardware_filtering: bool,
}

impl MulticastRegistry {
    #[must_use]
    pub fn new(hardware_filtering: bool) -> Self {
        let registry = Self {
            state: InitState::new(),
            table: Mutex::new(JoinTable::default()),
            driver: Mutex::new(None),
            hardware_filtering,
        };
        registry.state.initialize().expect("fresh registry");
        registry
    }

    /// Installs the device driver hook used when hardware filtering is on.
    pub fn set_driver(&self, driver: Box<dyn EthernetDriver>) {
        *self.driver.lock() = Some(driver);
    }

    /// Joins an IPv4 multicast group on a socket.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameters` when the address is not multicast,
    /// `InvalidState` when the registry is shut down, and with the socket
    /// error otherwise.
    pub fn join(
        &self,
        socket_id: usize,
        socket: &UdpSocket,
        group: Ipv4Addr,
        interface: Ipv4Addr,
    ) -> Result<()> {
        self.state.check_initialized()?;
        if !group.is_multicast() {
            return Err(Error::InvalidParameters);
        }

        let mut table = self.table.lock();
        let groups = table.joined.entry(socket_id).or_default();
        if groups.contains(&group) {
            return Ok(());
        }

        socket.join_multicast_v4(&group, &interface)?;
        if self.hardware_filtering {
            if let Some(driver) = self.driver.lock().as_ref() {
                if let Err(err) = driver.add_membership(group) {
                    warn!("device multicast filter add failed: {err}");
                    let _ = socket.leave_multicast_v4(&group, &interface);
                    return Err(err);
                }
            }
        }
        groups.push(group);
        debug!("socket {socket_id} joined multicast group {group}");
        Ok(())
    }

    /// Leaves a group; unknown memberships are ignored.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` when the registry is shut down, and with
    /// the socket error otherwise.
    pub fn leave(
        &self,
        socket_id: usize,
        socket: &UdpSocket,
        group: Ipv4Addr,
        interface: Ipv4Addr,
    ) -> Result<()> {
        self.state.check_initialized()?;
        let mut table = self.table.lock();
        let Some(groups) = table.joined.get_mut(&socket_id) else {
            return Ok(());
        };
        let Some(position) = groups.iter().position(|joined| *joined == group) else {
            return Ok(());
        };
        groups.remove(position);

        socket.leave_multicast_v4(&group, &interface)?;
        if self.hardware_filtering {
            if let Some(driver) = self.driver.lock().as_ref() {
                if let Err(err) = driver.drop_membership(group) {
                    warn!("device multicast filter drop failed: {err}");
                }
            }
        }
        debug!("socket {socket_id} left multicast group {group}");
        Ok(())
    }

    /// Soft filter: whether a datagram received from `source_group` should
    /// be accepted on this socket. Datagrams from groups the socket did not
    /// join are rejected here even if the kernel delivered them.
    #[must_use]
    pub fn should_accept(&self, socket_id: usize, source_group: Ipv4Addr) -> bool {
        if !source_group.is_multicast() {
            return true;
        }
        self.table
            .lock()
            .joined
            .get(&socket_id)
            .is_some_and(|groups| groups.contains(&source_group))
    }

    /// Drops every membership record of a socket (e.g. when it closes).
    pub fn forget_socket(&self, socket_id: usize) {
        self.table.lock().joined.remove(&socket_id);
    }

    /// Shuts the registry down; later joins are rejected.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` when not initialized.
    pub fn clear(&self) -> Result<()> {
        self.state.deinitialize()?;
        self.table.lock().joined.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn test_socket() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").unwrap()
    }

    #[test]
    fn join_requires_multicast_address() {
        let registry = MulticastRegistry::new(false);
        let socket = test_socket();
        let unicast = Ipv4Addr::new(192, 168, 1, 1);
        assert!(matches!(
            registry.join(1, &socket, unicast, Ipv4Addr::UNSPECIFIED),
            Err(Error::InvalidParameters)
        ));
    }

    #[test]
    fn soft_filter_rejects_unjoined_groups() {
        let registry = MulticastRegistry::new(false);
        let socket = test_socket();
        let group = Ipv4Addr::new(239, 0, 0, 1);
        let other_group = Ipv4Addr::new(239, 0, 0, 2);

        registry
            .join(1, &socket, group, Ipv4Addr::UNSPECIFIED)
            .unwrap();
        assert!(registry.should_accept(1, group));
        assert!(!registry.should_accept(1, other_group));
        // A different socket never joined anything.
        assert!(!registry.should_accept(2, group));
        // Unicast sources pass the filter untouched.
        assert!(registry.should_accept(1, Ipv4Addr::new(10, 0, 0, 1)));

        registry
            .leave(1, &socket, group, Ipv4Addr::UNSPECIFIED)
            .unwrap();
        assert!(!registry.should_accept(1, group));
    }

    #[test]
    fn driver_hook_called_with_hardware_filtering() {
        struct CountingDriver(Arc<AtomicUsize>);
        impl EthernetDriver for CountingDriver {
            fn add_membership(&self, _group: Ipv4Addr) -> Result<()> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            fn drop_membership(&self, _group: Ipv4Addr) -> Result<()> {
                Ok(())
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let registry = MulticastRegistry::new(true);
        registry.set_driver(Box::new(CountingDriver(Arc::clone(&calls))));

        let socket = test_socket();
        registry
            .join(1, &socket, Ipv4Addr::new(239, 0, 0, 7), Ipv4Addr::UNSPECIFIED)
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cleared_registry_rejects_joins() {
        let registry = MulticastRegistry::new(false);
        registry.clear().unwrap();
        let socket = test_socket();
        assert!(matches!(
            registry.join(1, &socket, Ipv4Addr::new(239, 0, 0, 1), Ipv4Addr::UNSPECIFIED),
            Err(Error::InvalidState)
        ));
    }
}
