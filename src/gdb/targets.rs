use std::sync::LazyLock;

use regex::Regex;

use crate::gdb::mi::MiRecord;

/// A scan listing line: index number, whitespace, target description.
static TARGET_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s+(.*)\n?$").unwrap());

/// Collects the targets announced by a `monitor swdp_scan` / `jtag_scan`
/// reply stream. Feed records until `feed` reports the scan has finished.
#[derive(Debug, Default)]
pub struct TargetScan {
    targets: Vec<String>,
}

impl TargetScan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one reply record. Returns `Ok(true)` once the terminating
    /// result record arrived; a result status other than `done` is a
    /// protocol violation and fails the whole scan.
    pub fn feed(&mut self, record: &MiRecord) -> anyhow::Result<bool> {
        match record {
            MiRecord::Target(payload) => {
                // lines that are not part of the numbered listing are noise
                if let Some(captures) = TARGET_LINE.captures(payload) {
                    self.targets.push(captures[2].to_string());
                }
                Ok(false)
            }
            MiRecord::Result { message, .. } => {
                anyhow::ensure!(message == "done", "target scan failed: ^{message}");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Scan results in arrival order (ascending index as GDB emits them).
    pub fn into_targets(self) -> Vec<String> {
        self.targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done() -> MiRecord {
        MiRecord::Result {
            message: "done".to_string(),
            payload: String::new(),
        }
    }

    #[test]
    fn test_scan_collects_targets_in_order() {
        let mut scan = TargetScan::new();
        assert!(!scan.feed(&MiRecord::Target("1  STM32F4\n".to_string())).unwrap());
        assert!(!scan.feed(&MiRecord::Target("2  STM32F1\n".to_string())).unwrap());
        assert!(scan.feed(&done()).unwrap());
        assert_eq!(scan.into_targets(), vec!["STM32F4", "STM32F1"]);
    }

    #[test]
    fn test_scan_skips_unrelated_records() {
        let mut scan = TargetScan::new();
        scan.feed(&MiRecord::Console("Target voltage: 3.3V\n".to_string()))
            .unwrap();
        scan.feed(&MiRecord::Target("Available Targets:\n".to_string()))
            .unwrap();
        scan.feed(&MiRecord::Target("  1  STM32F405\n".to_string()))
            .unwrap();
        assert!(scan.feed(&done()).unwrap());
        assert_eq!(scan.into_targets(), vec!["STM32F405"]);
    }

    #[test]
    fn test_scan_error_result_is_fatal() {
        let mut scan = TargetScan::new();
        scan.feed(&MiRecord::Target("1  STM32F4\n".to_string()))
            .unwrap();
        let result = scan.feed(&MiRecord::Result {
            message: "error".to_string(),
            payload: String::new(),
        });
        assert!(result.is_err());
    }
}
