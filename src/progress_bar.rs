pub use crate::traits::Progress;

use log::{Level, LevelFilter};

/// Progress of an event loop
///
/// The exact format is decided at run time depending on whether we are
/// writing to an interactive terminal or a non-interactive output. No
/// progress is shown unless the log level is exactly `info`.
pub enum ProgressBar {
    Hidden,
    Terminal(indicatif::ProgressBar),
    Log(logbar::ProgressBar),
}

impl Default for ProgressBar {
    fn default() -> Self {
        Self::Hidden
    }
}

impl ProgressBar {
    /// A new progress bar counting up to `len` events
    pub fn new(len: u64, message: &str) -> Self {
        if log::max_level().to_level() != Some(Level::Info) {
            return Self::Hidden;
        }
        let bar = if console::Term::stderr().features().is_attended() {
            Self::terminal(len, message)
        } else {
            Self::log(len, message)
        };
        // log messages would garble the bar
        log::set_max_level(LevelFilter::Off);
        bar
    }

    fn terminal(len: u64, message: &str) -> Self {
        let bar = indicatif::ProgressBar::new(len);
        if let Ok(style) = indicatif::ProgressStyle::default_bar()
            .template("{bar:60.cyan/cyan} {msg} {pos}/{len} [{elapsed}]")
        {
            bar.set_style(style);
        }
        bar.set_message(message.to_owned());
        Self::Terminal(bar)
    }

    fn log(len: u64, message: &str) -> Self {
        eprintln!("{message}");
        let style = logbar::Style::new().indicator('█');
        Self::Log(logbar::ProgressBar::with_style(len as usize, style))
    }
}

impl Progress for ProgressBar {
    fn inc(&self, i: u64) {
        match self {
            Self::Hidden => {}
            Self::Terminal(bar) => bar.inc(i),
            Self::Log(bar) => bar.inc(i as usize),
        }
    }

    fn finish(&self) {
        match self {
            Self::Hidden => return,
            Self::Terminal(bar) => bar.finish(),
            Self::Log(bar) => bar.finish(),
        }
        log::set_max_level(LevelFilter::Info);
    }
}
