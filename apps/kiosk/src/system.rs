//! Host metrics and MAC lookup from Linux `/proc` and `/sys`.

use std::fs;
use std::path::Path;

use tagsakay_device::SystemProbe;

const NET_CLASS: &str = "/sys/class/net";

pub struct HostProbe;

impl SystemProbe for HostProbe {
    fn free_memory(&self) -> u64 {
        fs::read_to_string("/proc/meminfo")
            .ok()
            .and_then(|text| parse_mem_available(&text))
            .unwrap_or(0)
    }

    fn network_connected(&self) -> bool {
        interfaces().iter().any(|name| {
            let operstate = Path::new(NET_CLASS).join(name).join("operstate");
            read_trimmed(&operstate).as_deref() == Some("up")
        })
    }
}

/// MAC of the first non-loopback interface with a real address.
pub fn primary_mac_address() -> Option<String> {
    interfaces()
        .into_iter()
        .filter_map(|name| read_trimmed(&Path::new(NET_CLASS).join(name).join("address")))
        .find(|mac| is_usable_mac(mac))
}

fn interfaces() -> Vec<String> {
    let Ok(entries) = fs::read_dir(NET_CLASS) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name != "lo")
        .collect();
    names.sort();
    names
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

fn is_usable_mac(mac: &str) -> bool {
    !mac.is_empty() && mac.chars().any(|c| c.is_ascii_hexdigit() && c != '0')
}

/// `MemAvailable` in bytes.
fn parse_mem_available(meminfo: &str) -> Option<u64> {
    meminfo.lines().find_map(|line| {
        let value = line.strip_prefix("MemAvailable:")?;
        let kib = value.trim().trim_end_matches("kB").trim().parse::<u64>().ok()?;
        Some(kib * 1024)
    })
}
