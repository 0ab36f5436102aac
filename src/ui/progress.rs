//! Spinner for long-running feed operations

use super::context::UiContext;
use console::style;
use std::time::Instant;

/// Shows a spinner while a push hashes and stores an archive. Plain
/// contexts print a start line and a result line with the elapsed time.
pub struct TaskSpinner {
    fancy: bool,
    spinner: Option<cliclack::ProgressBar>,
    started: Option<Instant>,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            fancy: ctx.use_fancy_output(),
            spinner: None,
            started: None,
        }
    }

    pub fn start(&mut self, message: &str) {
        self.started = Some(Instant::now());
        if self.fancy {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    pub fn stop(&mut self, message: &str) {
        let message = self.with_elapsed(message);
        match self.spinner.take() {
            Some(spinner) => spinner.stop(message),
            None => println!("{} {}", style("[OK]").green(), message),
        }
    }

    pub fn stop_error(&mut self, message: &str) {
        let message = self.with_elapsed(message);
        match self.spinner.take() {
            Some(spinner) => spinner.error(message),
            None => println!("{} {}", style("[FAIL]").red(), message),
        }
    }

    fn with_elapsed(&mut self, message: &str) -> String {
        match self.started.take() {
            Some(started) => format!("{} ({:.1?})", message, started.elapsed()),
            None => message.to_string(),
        }
    }
}
