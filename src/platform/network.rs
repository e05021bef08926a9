use super::{NetworkInterface, PlatformError, PlatformResult};
use crate::config::NetworkConfig;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use tracing::{debug, info, warn};

/// List IPv4 interface addresses.
#[cfg(unix)]
pub fn detect_interfaces() -> PlatformResult<Vec<NetworkInterface>> {
    use std::ffi::CStr;

    let mut addrs: *mut libc::ifaddrs = std::ptr::null_mut();
    if unsafe { libc::getifaddrs(&mut addrs) } != 0 {
        return Err(PlatformError::Io(std::io::Error::last_os_error()));
    }

    let mut interfaces = Vec::new();
    let mut cursor = addrs;
    while !cursor.is_null() {
        let ifa = unsafe { &*cursor };
        cursor = ifa.ifa_next;

        if ifa.ifa_addr.is_null() {
            continue;
        }
        let family = unsafe { (*ifa.ifa_addr).sa_family } as libc::c_int;
        if family != libc::AF_INET {
            continue;
        }

        let sin = unsafe { &*(ifa.ifa_addr as *const libc::sockaddr_in) };
        let ip = Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr));
        let name = unsafe { CStr::from_ptr(ifa.ifa_name) }
            .to_string_lossy()
            .to_string();
        let flags = ifa.ifa_flags;

        interfaces.push(NetworkInterface {
            name,
            ip_address: IpAddr::V4(ip),
            is_loopback: flags & (libc::IFF_LOOPBACK as libc::c_uint) != 0 || ip.is_loopback(),
            is_up: flags & (libc::IFF_UP as libc::c_uint) != 0,
        });
    }

    unsafe { libc::freeifaddrs(addrs) };

    debug!("Detected {} IPv4 interface address(es)", interfaces.len());
    Ok(interfaces)
}

#[cfg(not(unix))]
pub fn detect_interfaces() -> PlatformResult<Vec<NetworkInterface>> {
    let ip = probe_default_route()?;
    Ok(vec![NetworkInterface {
        name: "default".to_string(),
        ip_address: ip,
        is_loopback: ip.is_loopback(),
        is_up: true,
    }])
}

/// Address of the interface the OS would route public traffic through.
/// No packet is sent; connecting a UDP socket only selects a route.
pub fn probe_default_route() -> PlatformResult<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket
        .connect("8.8.8.8:80")
        .map_err(|e| PlatformError::NetworkConfig(format!("No default route: {}", e)))?;
    Ok(socket.local_addr()?.ip())
}

/// Addresses to emit resources for, in configuration order or detection order.
///
/// Falls back to the default-route probe, then to loopback, so the list is never empty.
pub fn advertised_addresses(config: &NetworkConfig) -> Vec<IpAddr> {
    let explicit: Vec<IpAddr> = config
        .interfaces
        .iter()
        .filter_map(|s| match s.parse() {
            Ok(ip) => Some(ip),
            Err(_) => {
                warn!("Ignoring invalid advertised address: {}", s);
                None
            }
        })
        .collect();
    if !explicit.is_empty() {
        return explicit;
    }

    let mut addresses: Vec<IpAddr> = match detect_interfaces() {
        Ok(interfaces) => select_addresses(&interfaces, config.include_loopback),
        Err(e) => {
            warn!("Interface detection failed: {}", e);
            Vec::new()
        }
    };

    if addresses.is_empty() {
        match probe_default_route() {
            Ok(ip) => addresses.push(ip),
            Err(e) => debug!("Default route probe failed: {}", e),
        }
    }
    if addresses.is_empty() {
        addresses.push(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    for ip in &addresses {
        info!("Advertising resources on {}", ip);
    }
    addresses
}

fn select_addresses(interfaces: &[NetworkInterface], include_loopback: bool) -> Vec<IpAddr> {
    let mut out: Vec<IpAddr> = Vec::new();
    for interface in interfaces {
        if !interface.is_up || (interface.is_loopback && !include_loopback) {
            continue;
        }
        if !out.contains(&interface.ip_address) {
            out.push(interface.ip_address);
        }
    }
    out
}
