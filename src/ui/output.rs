//! Status lines and key/value listings

use super::context::UiContext;
use console::{style, Style};

#[derive(Clone, Copy)]
enum Status {
    Ok,
    Warn,
    Info,
}

impl Status {
    fn tag(self) -> console::StyledObject<&'static str> {
        match self {
            Status::Ok => style("[OK]").green(),
            Status::Warn => style("[WARN]").yellow(),
            Status::Info => style("[INFO]").cyan(),
        }
    }
}

fn emit(ctx: &UiContext, status: Status, line: String) {
    if ctx.use_fancy_output() {
        let _ = match status {
            Status::Ok => cliclack::log::success(line),
            Status::Warn => cliclack::log::warning(line),
            Status::Info => cliclack::log::info(line),
        };
    } else {
        println!("  {} {}", status.tag(), line);
    }
}

/// Heading for a listing
pub fn intro(ctx: &UiContext, title: &str) {
    let title = style(title).cyan().bold();
    if ctx.use_fancy_output() {
        let _ = cliclack::intro(title);
    } else {
        println!("{}\n", title);
    }
}

/// Heading for one package's details
pub fn section(ctx: &UiContext, title: &str) {
    println!();
    if ctx.use_fancy_output() {
        let _ = cliclack::log::info(style(title).bold());
    } else {
        println!("{}", style(title).bold());
    }
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    emit(ctx, Status::Ok, message.to_string());
}

pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    emit(ctx, Status::Ok, format!("{} ({})", message, style(detail).dim()));
}

pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    emit(ctx, Status::Warn, format!("{} - {}", message, style(hint).dim()));
}

pub fn step_info(ctx: &UiContext, message: &str) {
    emit(ctx, Status::Info, message.to_string());
}

pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    key_value_styled(ctx, key, value, &Style::new());
}

/// Key/value where the value is highlighted when `ok` and dimmed otherwise
pub fn key_value_status(ctx: &UiContext, key: &str, value: &str, ok: bool) {
    let value_style = if ok {
        Style::new().green()
    } else {
        Style::new().dim()
    };
    key_value_styled(ctx, key, value, &value_style);
}

fn key_value_styled(ctx: &UiContext, key: &str, value: &str, value_style: &Style) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value_style.apply_to(value));
    } else {
        println!("  {}: {}", key, value);
    }
}
