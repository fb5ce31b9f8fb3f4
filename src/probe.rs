use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;

/// OpenMoko vendor id used by the Black Magic Probe.
pub const BMP_VID: u16 = 0x1d50;
/// Product ids of the application firmware and the DFU bootloader.
pub const BMP_PIDS: [u16; 2] = [0x6018, 0x6017];

/// macOS names the first sub-interface /dev/cu.usbmodem<serial>1
static MACOS_GDB_DEVICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/dev/cu\.usbmodem([A-F0-9]*)1$").unwrap());

/// One discovered serial device, snapshotted at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    pub device: String,
    pub vid: u16,
    pub pid: u16,
    pub serial_number: String,
    pub location: String,
    pub interface: String,
}

/// All matching interfaces of the connected probes, split by function.
/// Enumeration order is preserved; index 0 is the default selection.
#[derive(Debug, Default)]
pub struct ProbePair {
    pub gdb: Vec<PortDescriptor>,
    pub uart: Vec<PortDescriptor>,
}

/// Whether a descriptor is the probe's GDB server endpoint (as opposed to
/// its UART endpoint). Pure over the descriptor value so it tests without
/// hardware.
pub fn is_gdb_interface(port: &PortDescriptor) -> bool {
    port.interface == "Black Magic GDB Server"
        || MACOS_GDB_DEVICE.is_match(&port.device)
        || port.location.ends_with('0')
}

/// Filters the enumerated devices down to Black Magic Probe interfaces and
/// partitions them into GDB servers and UARTs.
pub fn detect_probes(ports: &[PortDescriptor]) -> ProbePair {
    let mut pair = ProbePair::default();
    for port in ports {
        if port.vid != BMP_VID || !BMP_PIDS.contains(&port.pid) {
            continue;
        }
        if is_gdb_interface(port) {
            pair.gdb.push(port.clone());
        } else {
            pair.uart.push(port.clone());
        }
    }
    pair
}

/// Enumerates all USB serial devices currently known to the OS.
pub fn enumerate_ports() -> anyhow::Result<Vec<PortDescriptor>> {
    let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;

    let descriptors = ports
        .into_iter()
        .filter_map(|port| match port.port_type {
            serialport::SerialPortType::UsbPort(info) => Some(PortDescriptor {
                device: port.port_name,
                vid: info.vid,
                pid: info.pid,
                serial_number: info.serial_number.unwrap_or_default(),
                // serialport does not expose a USB bus location; the
                // interface number keeps the trailing-zero heuristic
                // meaningful (the GDB server is interface 0)
                location: info
                    .interface
                    .map(|n| n.to_string())
                    .unwrap_or_default(),
                interface: info.product.unwrap_or_default(),
            }),
            _ => None,
        })
        .collect();

    Ok(descriptors)
}

/// First descriptor whose serial number contains `snr` as a substring.
pub fn search_serial<'a>(snr: &str, ports: &'a [PortDescriptor]) -> Option<&'a PortDescriptor> {
    ports.iter().find(|p| p.serial_number.contains(snr))
}

/// Resolves the device path to connect to. `--port` wins verbatim, then a
/// `--serial` substring lookup, then the first enumerated interface.
pub fn select_port(
    serial: Option<&str>,
    port: Option<&str>,
    ports: &[PortDescriptor],
) -> anyhow::Result<String> {
    if let Some(port) = port {
        return Ok(port.to_string());
    }
    if let Some(snr) = serial {
        let found = search_serial(snr, ports).context("no probe with this serial found")?;
        return Ok(found.device.clone());
    }
    let first = ports.first().context("no matching probe interface found")?;
    Ok(first.device.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(device: &str, interface: &str, location: &str) -> PortDescriptor {
        PortDescriptor {
            device: device.to_string(),
            vid: BMP_VID,
            pid: 0x6018,
            serial_number: "7EBA8C9A".to_string(),
            location: location.to_string(),
            interface: interface.to_string(),
        }
    }

    #[test]
    fn test_classification_by_interface_label() {
        let port = descriptor("/dev/ttyACM0", "Black Magic GDB Server", "1-2:1.2");
        assert!(is_gdb_interface(&port));
    }

    #[test]
    fn test_classification_by_macos_device_path() {
        let port = descriptor("/dev/cu.usbmodem7EBA8C9A1", "", "1-2:1.2");
        assert!(is_gdb_interface(&port));
    }

    #[test]
    fn test_classification_by_location_suffix() {
        let port = descriptor("/dev/ttyACM0", "Black Magic UART Port", "1-2:1.0");
        assert!(is_gdb_interface(&port));
    }

    #[test]
    fn test_classification_uart() {
        let port = descriptor("/dev/ttyACM1", "Black Magic UART Port", "1-2:1.2");
        assert!(!is_gdb_interface(&port));
    }

    #[test]
    fn test_detect_probes_partitions_every_match() {
        let gdb = descriptor("/dev/ttyACM0", "Black Magic GDB Server", "1-2:1.0");
        let uart = descriptor("/dev/ttyACM1", "Black Magic UART Port", "1-2:1.2");
        let mut other = descriptor("/dev/ttyUSB0", "Some FTDI", "1-3:1.0");
        other.vid = 0x0403;
        other.pid = 0x6001;

        let pair = detect_probes(&[gdb.clone(), uart.clone(), other]);
        assert_eq!(pair.gdb, vec![gdb]);
        assert_eq!(pair.uart, vec![uart]);
    }

    #[test]
    fn test_detect_probes_rejects_foreign_pid() {
        let mut port = descriptor("/dev/ttyACM0", "Black Magic GDB Server", "1-2:1.0");
        port.pid = 0x6019;
        let pair = detect_probes(&[port]);
        assert!(pair.gdb.is_empty());
        assert!(pair.uart.is_empty());
    }

    #[test]
    fn test_search_serial_substring() {
        let a = descriptor("/dev/ttyACM0", "Black Magic GDB Server", "1-2:1.0");
        let mut b = a.clone();
        b.device = "/dev/ttyACM2".to_string();
        b.serial_number = "95B7ABCD".to_string();

        let ports = [a.clone(), b.clone()];
        let found = search_serial("ABCD", &ports).expect("serial not found");
        assert_eq!(found.device, "/dev/ttyACM2");
        assert!(search_serial("FFFF", &[a, b]).is_none());
    }

    #[test]
    fn test_select_port_precedence() {
        let a = descriptor("/dev/ttyACM0", "Black Magic GDB Server", "1-2:1.0");
        let mut b = a.clone();
        b.device = "/dev/ttyACM2".to_string();
        b.serial_number = "95B7ABCD".to_string();
        let ports = [a, b];

        // explicit port wins verbatim
        let selected = select_port(Some("ABCD"), Some("/dev/ttyS9"), &ports).unwrap();
        assert_eq!(selected, "/dev/ttyS9");

        // then serial lookup
        let selected = select_port(Some("ABCD"), None, &ports).unwrap();
        assert_eq!(selected, "/dev/ttyACM2");

        // then the first enumerated interface
        let selected = select_port(None, None, &ports).unwrap();
        assert_eq!(selected, "/dev/ttyACM0");

        assert!(select_port(Some("FFFF"), None, &ports).is_err());
        assert!(select_port(None, None, &[]).is_err());
    }
}
