//! nmap XML report parsing (`-oX -`).
//!
//! Only the elements the probes consume are modelled; everything else in the
//! report is ignored.

use serde::Deserialize;

use crate::error_handling::ProbeError;
use crate::models::{DiscoveredHost, OpenPort, OsClass, OsMatch, VulnFinding};

#[derive(Debug, Deserialize)]
pub(crate) struct NmapRun {
    #[serde(rename = "host", default)]
    pub hosts: Vec<Host>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Host {
    #[serde(rename = "address", default)]
    pub addresses: Vec<Address>,
    pub status: Option<Status>,
    pub ports: Option<Ports>,
    pub os: Option<Os>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Address {
    #[serde(rename = "@addr")]
    pub addr: String,
    #[serde(rename = "@addrtype")]
    pub addr_type: String,
    #[serde(rename = "@vendor")]
    pub vendor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Status {
    #[serde(rename = "@state")]
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Ports {
    #[serde(rename = "port", default)]
    pub ports: Vec<Port>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Port {
    #[serde(rename = "@protocol")]
    pub protocol: String,
    #[serde(rename = "@portid")]
    pub port_id: u16,
    pub state: PortState,
    pub service: Option<Service>,
    #[serde(rename = "script", default)]
    pub scripts: Vec<Script>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PortState {
    #[serde(rename = "@state")]
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Service {
    #[serde(rename = "@name")]
    pub name: Option<String>,
    #[serde(rename = "@product")]
    pub product: Option<String>,
    #[serde(rename = "@version")]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Script {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@output", default)]
    pub output: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Os {
    #[serde(rename = "osmatch", default)]
    pub matches: Vec<XmlOsMatch>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct XmlOsMatch {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@accuracy", default)]
    pub accuracy: u8,
    #[serde(rename = "osclass", default)]
    pub classes: Vec<XmlOsClass>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct XmlOsClass {
    #[serde(rename = "@type")]
    pub device_type: Option<String>,
    #[serde(rename = "@vendor")]
    pub vendor: Option<String>,
    #[serde(rename = "@osfamily")]
    pub family: Option<String>,
    #[serde(rename = "@osgen")]
    pub generation: Option<String>,
    #[serde(rename = "@accuracy")]
    pub accuracy: Option<u8>,
}

pub(crate) fn parse_report(xml: &str) -> Result<NmapRun, ProbeError> {
    quick_xml::de::from_str(xml).map_err(|e| ProbeError::Parse(e.to_string()))
}

impl Host {
    fn is_up(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.state == "up")
    }

    fn address_of(&self, kind: &str) -> Option<&Address> {
        self.addresses.iter().find(|a| a.addr_type == kind)
    }

    fn ip(&self) -> Option<&str> {
        self.address_of("ipv4")
            .or_else(|| self.address_of("ipv6"))
            .map(|a| a.addr.as_str())
    }

    fn open_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports
            .iter()
            .flat_map(|p| p.ports.iter())
            .filter(|p| p.state.state == "open")
    }
}

impl NmapRun {
    /// Hosts reported up, with their MAC and MAC vendor when known.
    pub fn discovered_hosts(&self) -> Vec<DiscoveredHost> {
        self.hosts
            .iter()
            .filter(|h| h.is_up())
            .filter_map(|h| {
                let ip = h.ip()?;
                let mac = h.address_of("mac");
                Some(DiscoveredHost {
                    ip: ip.to_string(),
                    mac: mac.map(|m| m.addr.clone()),
                    vendor: mac.and_then(|m| m.vendor.clone()),
                })
            })
            .collect()
    }

    /// Open ports of the host with address `ip`.
    pub fn open_ports(&self, ip: &str) -> Vec<OpenPort> {
        self.host(ip)
            .map(|h| {
                h.open_ports()
                    .map(|p| {
                        let service = p.service.as_ref();
                        OpenPort {
                            port: p.port_id,
                            protocol: p.protocol.clone(),
                            service: service.and_then(|s| s.name.clone()).unwrap_or_default(),
                            product: service.and_then(|s| s.product.clone()).unwrap_or_default(),
                            version: service.and_then(|s| s.version.clone()).unwrap_or_default(),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// OS candidates for `ip`, in the order nmap ranked them.
    pub fn os_matches(&self, ip: &str) -> Vec<OsMatch> {
        self.host(ip)
            .and_then(|h| h.os.as_ref())
            .map(|os| {
                os.matches
                    .iter()
                    .map(|m| OsMatch {
                        name: m.name.clone(),
                        accuracy: m.accuracy,
                        os_class: m
                            .classes
                            .iter()
                            .map(|c| OsClass {
                                vendor: c.vendor.clone(),
                                family: c.family.clone(),
                                generation: c.generation.clone(),
                                device_type: c.device_type.clone(),
                                accuracy: c.accuracy,
                            })
                            .collect(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Script results attached to any port of `ip`.
    pub fn script_findings(&self, ip: &str) -> Vec<VulnFinding> {
        let Some(host) = self.host(ip) else {
            return Vec::new();
        };
        host.ports
            .iter()
            .flat_map(|p| p.ports.iter())
            .flat_map(|port| {
                port.scripts.iter().map(move |s| VulnFinding {
                    port: port.port_id,
                    protocol: port.protocol.clone(),
                    script: s.id.clone(),
                    output: s.output.clone(),
                })
            })
            .collect()
    }

    fn host(&self, ip: &str) -> Option<&Host> {
        self.hosts
            .iter()
            .find(|h| h.addresses.iter().any(|a| a.addr == ip))
            .or_else(|| match self.hosts.as_slice() {
                // A hostname target resolves to an address we were not given.
                [only] => Some(only),
                _ => None,
            })
    }
}
