use std::io::{self, Write};
use std::sync::RwLock;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

const TIP_DURATION: Duration = Duration::from_secs(1);
const MESSAGE_READ_TIME: Duration = Duration::from_secs(1);
const MIN_TIP_VISIBILITY: Duration = Duration::from_millis(750);
const INPUT_TIPS: &[&str] = &["You can press 'q' to finish early"];

/// Bar that console output must be printed above.
static ACTIVE: RwLock<Option<ProgressBar>> = RwLock::new(None);

pub struct SpinnerHandle {
    spinner: ProgressBar,
    tx: Sender<String>,
}

impl SpinnerHandle {
    /// Starts the spinner. Tips about the key listener rotate in while no progress arrives.
    pub fn start(hidden: bool, input_enabled: bool) -> Self {
        let pb = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        let style = ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&[
                "▁▁▁▁▁",
                "▁▂▂▂▁",
                "▁▄▂▄▁",
                "▂▄▆▄▂",
                "▄▆█▆▄",
                "▂▄▆▄▂",
                "▁▄▂▄▁",
                "▁▂▂▂▁",
            ]);

        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(100));

        if let Ok(mut active) = ACTIVE.write() {
            *active = Some(pb.clone());
        }

        let tips: &'static [&'static str] = if input_enabled { INPUT_TIPS } else { &[] };
        let (tx, rx) = mpsc::channel::<String>();
        let pb_clone = pb.clone();

        thread::spawn(move || {
            let mut tip_index = 0;
            let mut next_action_time = Instant::now() + TIP_DURATION;
            let mut is_showing_tip = false;
            let mut last_tip_time = Instant::now();

            loop {
                if pb_clone.is_finished() {
                    break;
                }

                let wait_time = next_action_time.saturating_duration_since(Instant::now());

                match rx.recv_timeout(wait_time) {
                    Ok(mut msg) => {
                        if is_showing_tip {
                            let elapsed = last_tip_time.elapsed();
                            if elapsed < MIN_TIP_VISIBILITY {
                                thread::sleep(MIN_TIP_VISIBILITY - elapsed);
                            }
                            is_showing_tip = false;
                        }
                        while let Ok(newer_msg) = rx.try_recv() {
                            msg = newer_msg;
                        }
                        pb_clone.set_message(msg);
                        next_action_time = Instant::now() + MESSAGE_READ_TIME;
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        if !tips.is_empty() {
                            let tip = tips[tip_index % tips.len()];
                            pb_clone.set_message(format!("{}", tip.italic().white()));
                            tip_index += 1;
                            is_showing_tip = true;
                            last_tip_time = Instant::now();
                        }
                        next_action_time = Instant::now() + TIP_DURATION;
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        break;
                    }
                }
            }
        });

        SpinnerHandle { spinner: pb, tx }
    }

    pub fn set_message(&self, msg: String) {
        self.spinner.set_message(msg);
    }

    /// Progress hook for the scanner: `count` hosts found so far.
    pub fn host_counter(&self) -> impl Fn(usize) + Send + Sync + 'static {
        let tx = self.tx.clone();
        move |count| {
            let _ = tx.send(format!(
                "Identified {} hosts so far...",
                count.to_string().green().bold()
            ));
        }
    }

    pub fn finish_and_clear(&self) {
        self.spinner.finish_and_clear();
        if let Ok(mut active) = ACTIVE.write() {
            *active = None;
        }
    }
}

impl Drop for SpinnerHandle {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.finish_and_clear();
        }
    }
}

/// Console writer for the log formatter. Lines are printed above the active spinner.
pub struct SpinnerWriter;

impl SpinnerWriter {
    fn emit(text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()
    }
}

impl io::Write for SpinnerWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let msg = String::from_utf8_lossy(buf);
        // Raw mode drops the implicit carriage return.
        let msg = if crossterm::terminal::is_raw_mode_enabled().unwrap_or(false) {
            msg.replace("\r\n", "\n").replace('\n', "\r\n")
        } else {
            msg.into_owned()
        };

        let active: Option<ProgressBar> = ACTIVE.read().ok().and_then(|guard| guard.clone());
        match active {
            Some(pb) if !pb.is_hidden() => pb.suspend(|| Self::emit(&msg))?,
            _ => Self::emit(&msg)?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}
