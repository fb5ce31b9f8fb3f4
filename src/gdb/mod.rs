use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use crossbeam::channel::{Receiver, Sender};

pub mod mi;
pub mod targets;

use mi::MiRecord;

/// Upper bound for one command/reply exchange.
pub const GDB_TIMEOUT: Duration = Duration::from_secs(100);

/// A GDB process driven through its machine interface. One command is
/// outstanding at a time; every step waits for the previous result record.
pub struct GdbSession {
    child: Child,
    stdin: ChildStdin,
    records_recver: Receiver<MiRecord>,
}

impl GdbSession {
    /// Spawns GDB in MI mode and starts the reply reader thread.
    pub fn start(gdb_path: &str, file: Option<&str>) -> anyhow::Result<Self> {
        let mut cmd = Command::new(gdb_path);
        cmd.args(["--nx", "--quiet", "--interpreter=mi2"]);
        if let Some(file) = file {
            cmd.arg(file);
        }
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn GDB process '{gdb_path}'"))?;
        let stdin = child
            .stdin
            .take()
            .context("Failed to take stdin of GDB process")?;
        let stdout = child
            .stdout
            .take()
            .context("Failed to take stdout of GDB process")?;

        let (records_sender, records_recver) = crossbeam::channel::unbounded();
        let _ = read_records_threaded(stdout, records_sender);

        Ok(Self {
            child,
            stdin,
            records_recver,
        })
    }

    /// Sends one command line to GDB.
    pub fn write(&mut self, command: &str) -> anyhow::Result<()> {
        writeln!(self.stdin, "{command}")
            .and_then(|_| self.stdin.flush())
            .with_context(|| format!("Failed to send GDB command '{command}'"))
    }

    /// Blocks for the next reply record. A timeout and a closed stream are
    /// both unrecoverable.
    pub fn next_record(&self, timeout: Duration) -> anyhow::Result<MiRecord> {
        self.records_recver
            .recv_timeout(timeout)
            .context("No reply from GDB within timeout")
    }

    /// Sends `command` and reads records until the terminating result
    /// record, printing each record for traceability. Returns whether the
    /// result status matched `expected`; callers treat false as fatal.
    pub fn write_and_wait_for_result(
        &mut self,
        command: &str,
        description: &str,
        expected: &str,
    ) -> anyhow::Result<bool> {
        self.write(command)?;
        loop {
            let record = self.next_record(GDB_TIMEOUT)?;
            println!("{record:?}");
            if let MiRecord::Result { message, .. } = record {
                if message == expected {
                    println!("{} {}", description, "successful.".green());
                    return Ok(true);
                }
                eprintln!("{} {}", description, "failed.".red());
                return Ok(false);
            }
        }
    }
}

impl Drop for GdbSession {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

/// Reads MI lines from the given stream and sends the parsed records to the
/// channel until EOF (process ended) or the receiver is gone.
fn read_records_threaded<R: std::io::Read + Send + 'static>(
    stream: R,
    records_sender: Sender<MiRecord>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    eprintln!("Error reading GDB output: {e}");
                    break;
                }
            };
            if let Some(record) = mi::parse_line(&line) {
                if records_sender.send(record).is_err() {
                    break; // channel closed
                }
            }
        }
    })
}
