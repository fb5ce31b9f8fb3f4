use anyhow::ensure;

use bmptool::{
    actions,
    cli::{Action, CommandLineArgs},
    probe,
};

fn main() -> anyhow::Result<()> {
    let args = CommandLineArgs::parse();
    args.validate()?;

    let ports = probe::enumerate_ports()?;
    let probes = probe::detect_probes(&ports);
    ensure!(!probes.gdb.is_empty(), "no Black Magic Probes found");

    match args.action {
        Action::Term => actions::run_term(&args, &probes),
        Action::Debug => actions::run_debug(&args, &probes),
        _ => actions::run_scripted(&args, &probes),
    }
}
