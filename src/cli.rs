use clap::{Parser, ValueEnum};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// List targets reachable through the probe
    List,
    /// Load a firmware file to the target and verify it
    Flash,
    /// Erase the target flash
    Erase,
    /// Open an interactive GDB shell on the target
    Debug,
    /// Open a serial terminal on the probe UART interface
    Term,
    /// Reset the target using the reset pin
    Reset,
}

#[derive(Parser, Debug)]
#[command(version, about = "Black Magic Probe helper tool.", long_about = None)]
pub struct CommandLineArgs {
    /// Task to perform
    #[clap(value_enum, default_value_t = Action::List)]
    pub action: Action,

    /// File to load to the target (hex or elf)
    pub file: Option<String>,

    /// Use JTAG transport
    #[clap(long, action)]
    pub jtag: bool,

    /// Use SWD transport (default)
    #[clap(long, action)]
    pub swd: bool,

    /// Reset target while connecting
    #[clap(long, action)]
    pub connect_srst: bool,

    /// Enable target power
    #[clap(long, action)]
    pub tpwr: bool,

    /// Choose specific probe by serial number
    #[clap(long)]
    pub serial: Option<String>,

    /// Choose specific probe by port
    #[clap(long)]
    pub port: Option<String>,

    /// Choose specific target by number
    #[clap(long, default_value_t = 1)]
    pub attach: u32,

    /// Path to GDB
    #[clap(long, default_value = "gdb-multiarch")]
    pub gdb_path: String,

    /// Serial terminal command, %s is replaced by the port
    #[clap(long, default_value = "screen %s 115200")]
    pub term_cmd: String,
}

impl CommandLineArgs {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Checks mutually exclusive flags. Must pass before any device access.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.swd && self.jtag {
            anyhow::bail!("you may only choose one protocol (--swd or --jtag)");
        }
        if self.serial.is_some() && self.port.is_some() {
            anyhow::bail!("you may only specify the probe by port or by serial");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_from(args: &[&str]) -> CommandLineArgs {
        <CommandLineArgs as Parser>::try_parse_from(args).expect("Failed to parse args")
    }

    #[test]
    fn test_defaults() {
        let args = parse_from(&["bmptool"]);
        assert_eq!(args.action, Action::List);
        assert_eq!(args.attach, 1);
        assert_eq!(args.gdb_path, "gdb-multiarch");
        assert_eq!(args.term_cmd, "screen %s 115200");
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_transport_flags_are_exclusive() {
        let args = parse_from(&["bmptool", "--jtag", "--swd"]);
        assert!(args.validate().is_err());

        assert!(parse_from(&["bmptool", "--jtag"]).validate().is_ok());
        assert!(parse_from(&["bmptool", "--swd"]).validate().is_ok());
    }

    #[test]
    fn test_probe_selection_flags_are_exclusive() {
        let args = parse_from(&["bmptool", "--serial", "ABCD", "--port", "/dev/ttyACM0"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_flash_action_with_file() {
        let args = parse_from(&["bmptool", "flash", "firmware.elf"]);
        assert_eq!(args.action, Action::Flash);
        assert_eq!(args.file.as_deref(), Some("firmware.elf"));
    }
}
