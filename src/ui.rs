use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::cell::Cell;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty)
    }

    fn use_pretty(&self) -> bool {
        self.is_tty && !matches!(self.mode, UiMode::Plain)
    }

    /// Spinner for a setup step such as opening the video or loading a model.
    pub fn stage(&self, name: &str) -> StageGuard {
        let spinner = self.spinner(format!("{name}…"));
        if spinner.is_none() {
            eprintln!("==> {}", name);
        }
        StageGuard {
            name: name.to_string(),
            start: Instant::now(),
            spinner,
        }
    }

    /// Progress line for the frame scan, counting frames read and intervals
    /// closed for the target label.
    pub fn scan(&self, video: &str, label: &str) -> ScanProgress {
        let spinner = self.spinner(format!("Scanning {video} for {label}…"));
        if spinner.is_none() {
            eprintln!("==> Scanning {video} for {label}");
        }
        ScanProgress {
            video: video.to_string(),
            label: label.to_string(),
            start: Instant::now(),
            frames_read: Cell::new(0),
            intervals_closed: Cell::new(0),
            spinner,
        }
    }

    fn spinner(&self, message: String) -> Option<ProgressBar> {
        if !self.use_pretty() {
            return None;
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_draw_target(ProgressDrawTarget::stderr());
        spinner.enable_steady_tick(Duration::from_millis(120));
        let style = ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(message);
        Some(spinner)
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let message = format!("✔ {} ({})", self.name, format_duration(self.start.elapsed()));
        finish(self.spinner.as_ref(), message);
    }
}

pub struct ScanProgress {
    video: String,
    label: String,
    start: Instant,
    frames_read: Cell<u64>,
    intervals_closed: Cell<usize>,
    spinner: Option<ProgressBar>,
}

impl ScanProgress {
    /// Record scan progress. Plain mode only reports the totals on drop.
    pub fn update(&self, frames_read: u64, intervals_closed: usize) {
        self.frames_read.set(frames_read);
        self.intervals_closed.set(intervals_closed);
        if let Some(spinner) = &self.spinner {
            spinner.set_message(self.progress_line());
        }
    }

    fn progress_line(&self) -> String {
        format!(
            "Scanning {} for {}… {} frames read, {} intervals closed",
            self.video,
            self.label,
            self.frames_read.get(),
            self.intervals_closed.get()
        )
    }

    fn summary_line(&self) -> String {
        format!(
            "✔ Scanned {} frames of {} ({})",
            self.frames_read.get(),
            self.video,
            format_duration(self.start.elapsed())
        )
    }
}

impl Drop for ScanProgress {
    fn drop(&mut self) {
        finish(self.spinner.as_ref(), self.summary_line());
    }
}

fn finish(spinner: Option<&ProgressBar>, message: String) {
    match spinner {
        Some(spinner) => spinner.finish_with_message(message),
        None => eprintln!("{message}"),
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_parsing() {
        assert_eq!(Ui::from_args(Some("plain"), true).mode, UiMode::Plain);
        assert_eq!(Ui::from_args(Some("pretty"), true).mode, UiMode::Pretty);
        assert_eq!(Ui::from_args(None, true).mode, UiMode::Auto);
    }

    #[test]
    fn pretty_requires_tty() {
        assert!(!Ui::new(UiMode::Pretty, false).use_pretty());
        assert!(!Ui::new(UiMode::Plain, true).use_pretty());
        assert!(Ui::new(UiMode::Auto, true).use_pretty());
    }

    #[test]
    fn scan_progress_reports_frames_and_intervals() {
        let progress = Ui::new(UiMode::Plain, false).scan("herd.mp4", "cow");
        progress.update(120, 2);
        assert_eq!(
            progress.progress_line(),
            "Scanning herd.mp4 for cow… 120 frames read, 2 intervals closed"
        );
        assert!(progress
            .summary_line()
            .starts_with("✔ Scanned 120 frames of herd.mp4 ("));
    }

    #[test]
    fn durations_switch_units() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }
}
