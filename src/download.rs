use std::sync::LazyLock;

use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use regex::Regex;

/// Status line emitted by `-target-download`. Every field is optional in a
/// given message.
static DOWNLOAD_STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\+download,\{(?:section="(.*?)")?,?(?:section-sent="(.*?)")?,?(?:section-size="(.*?)")?,?(?:total-sent="(.*?)")?,?(?:total-size="(.*?)")?,?\}$"#,
    )
    .unwrap()
});

/// One parsed download status message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadEvent {
    pub section: Option<String>,
    pub section_sent: Option<u64>,
    pub section_size: Option<u64>,
    pub total_sent: Option<u64>,
    pub total_size: Option<u64>,
}

impl DownloadEvent {
    /// Parses a raw output payload. Payloads that are not download status
    /// lines yield `None` and are skipped by the caller.
    pub fn parse(payload: &str) -> Option<DownloadEvent> {
        let captures = DOWNLOAD_STATUS.captures(payload)?;
        let number = |i: usize| captures.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
        Some(DownloadEvent {
            section: captures.get(1).map(|m| m.as_str().to_string()),
            section_sent: number(2),
            section_size: number(3),
            total_sent: number(4),
            total_size: number(5),
        })
    }
}

/// Renders the progress of one flash run: a one-time total-size banner,
/// one progress bar per section, and absolute position updates.
pub struct DownloadProgress {
    first: bool,
    current_section: Option<String>,
    bar: Option<ProgressBar>,
}

impl DownloadProgress {
    pub fn new() -> Self {
        Self {
            first: true,
            current_section: None,
            bar: None,
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
        )
        .unwrap()
        .progress_chars("#>-")
    }

    /// Applies one download event to the display. Events without a
    /// bar-affecting field leave the prior state unchanged.
    pub fn handle(&mut self, event: &DownloadEvent) {
        if self.first && let Some(total) = event.total_size {
            self.first = false;
            println!("downloading... total size: {}", HumanBytes(total));
        }

        if let Some(section) = &event.section
            && self.current_section.as_ref() != Some(section)
            && let Some(size) = event.section_size
        {
            if let Some(bar) = self.bar.take() {
                bar.finish();
            }
            println!(
                "downloading section [{}] ({})",
                section,
                HumanBytes(size)
            );
            let bar = ProgressBar::new(size);
            bar.set_style(Self::bar_style());
            bar.set_message(section.clone());
            self.bar = Some(bar);
            self.current_section = Some(section.clone());
        }

        if let (Some(sent), Some(bar)) = (event.section_sent, self.bar.as_ref()) {
            bar.set_position(sent);
        }
    }

    /// Closes the active bar after the terminating result record.
    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
        println!("downloading finished");
    }
}

impl Default for DownloadProgress {
    fn default() -> Self {
        Self::new()
    }
}
