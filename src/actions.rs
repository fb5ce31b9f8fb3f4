use std::process::{Command, Stdio};

use anyhow::{Context, ensure};
use colored::Colorize;

use crate::{
    cli::{Action, CommandLineArgs},
    download::{DownloadEvent, DownloadProgress},
    gdb::{GDB_TIMEOUT, GdbSession, mi::MiRecord, targets::TargetScan},
    probe::{PortDescriptor, ProbePair, select_port},
};

/// Opens the configured serial terminal on the probe UART interface and
/// returns once it exits.
pub fn run_term(args: &CommandLineArgs, probes: &ProbePair) -> anyhow::Result<()> {
    let port = select_port(args.serial.as_deref(), args.port.as_deref(), &probes.uart)?;
    let command = args.term_cmd.replacen("%s", &port, 1);

    Command::new("sh")
        .args(["-c", &command])
        .status()
        .with_context(|| format!("Failed to run terminal command '{command}'"))?;
    Ok(())
}

/// Launches an interactive GDB shell preconfigured for the selected probe.
/// Fire-and-forget, the shell's exit code does not matter here.
pub fn run_debug(args: &CommandLineArgs, probes: &ProbePair) -> anyhow::Result<()> {
    print_gdb_servers(&probes.gdb);
    let port = select_port(args.serial.as_deref(), args.port.as_deref(), &probes.gdb)?;

    let mut cmd = Command::new(&args.gdb_path);
    cmd.args(["-ex", &format!("target extended-remote {port}")]);
    if args.tpwr {
        cmd.args(["-ex", "monitor tpwr enable"]);
    }
    if args.connect_srst {
        cmd.args(["-ex", "monitor connect_srst enable"]);
    }
    if args.jtag {
        cmd.args(["-ex", "monitor jtag_scan"]);
    } else {
        cmd.args(["-ex", "monitor swdp_scan"]);
    }
    cmd.args(["-ex", &format!("attach {}", args.attach)]);
    if let Some(file) = &args.file {
        cmd.arg(file);
    }

    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .with_context(|| format!("Failed to launch GDB '{}'", args.gdb_path))?;
    Ok(())
}

/// Drives a scripted GDB session: connect, scan, then the selected action.
pub fn run_scripted(args: &CommandLineArgs, probes: &ProbePair) -> anyhow::Result<()> {
    print_gdb_servers(&probes.gdb);
    let port = select_port(args.serial.as_deref(), args.port.as_deref(), &probes.gdb)?;
    println!("connecting to [{port}]...");

    let mut session = GdbSession::start(&args.gdb_path, args.file.as_deref())?;
    ensure!(
        session.write_and_wait_for_result(
            &format!("-target-select extended-remote {port}"),
            "connecting",
            "connected",
        )?,
        "connecting failed"
    );

    if args.connect_srst {
        ensure!(
            session.write_and_wait_for_result(
                "monitor connect_srst enable",
                "enabling connect-time reset",
                "done",
            )?,
            "enabling connect-time reset failed"
        );
    }
    if args.tpwr {
        ensure!(
            session.write_and_wait_for_result(
                "monitor tpwr enable",
                "enabling target power",
                "done",
            )?,
            "enabling target power failed"
        );
    }

    let targets = scan_targets(&mut session, args.jtag)?;
    ensure!(!targets.is_empty(), "no targets found");
    println!("found following targets:");
    for target in &targets {
        println!("\t{target}");
    }
    println!();

    if args.action == Action::List {
        return Ok(());
    }

    ensure!(
        session.write_and_wait_for_result(
            &format!("-target-attach {}", args.attach),
            "attaching to target",
            "done",
        )?,
        "attaching to target failed"
    );

    match args.action {
        Action::Reset => {
            ensure!(
                session.write_and_wait_for_result("monitor hard_srst", "resetting target", "done")?,
                "resetting target failed"
            );
        }
        Action::Erase => {
            println!("erasing...");
            ensure!(
                session.write_and_wait_for_result("-target-flash-erase", "erasing target", "done")?,
                "erasing target failed"
            );
        }
        Action::Flash => {
            download(&mut session)?;
            ensure!(
                session.write_and_wait_for_result("compare-sections", "checking flash", "done")?,
                "checking flash failed"
            );
            ensure!(
                session.write_and_wait_for_result("kill", "killing", "done")?,
                "killing failed"
            );
        }
        _ => unreachable!("list, term and debug are handled above"),
    }

    Ok(())
}

/// Scans the bus for attachable targets. SWD is the default transport.
fn scan_targets(session: &mut GdbSession, jtag: bool) -> anyhow::Result<Vec<String>> {
    if jtag {
        println!("scanning using JTAG...");
        session.write("monitor jtag_scan")?;
    } else {
        println!("scanning using SWD...");
        session.write("monitor swdp_scan")?;
    }

    let mut scan = TargetScan::new();
    loop {
        let record = session.next_record(GDB_TIMEOUT)?;
        if scan.feed(&record)? {
            return Ok(scan.into_targets());
        }
    }
}

/// Runs `-target-download` and renders section-by-section progress until
/// the terminating result record.
fn download(session: &mut GdbSession) -> anyhow::Result<()> {
    session.write("-target-download")?;
    let mut progress = DownloadProgress::new();
    loop {
        match session.next_record(GDB_TIMEOUT)? {
            MiRecord::Result { message, payload } => {
                ensure!(message == "done", "download failed: ^{message},{payload}");
                progress.finish();
                return Ok(());
            }
            MiRecord::Output(payload) => {
                // non-status output lines are skipped
                if let Some(event) = DownloadEvent::parse(&payload) {
                    progress.handle(&event);
                }
            }
            _ => {}
        }
    }
}

/// Prints every discovered GDB server with its serial number and marks the
/// default selection.
fn print_gdb_servers(servers: &[PortDescriptor]) {
    println!("found following Black Magic GDB servers:");
    for (i, server) in servers.iter().enumerate() {
        print!("\t[{}] ", server.device);
        if server.serial_number.len() > 1 {
            print!("Serial: {} ", server.serial_number);
        }
        if i == 0 {
            print!("{}", "<- default".cyan());
        }
        println!();
    }
}
