use std::future::Future;
use std::time::Duration;

use crossterm::tty::IsTty;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::ui::{Attributes, Color, RenderConfig, StyleSheet, Styled};

use super::TERMINAL_STDERR;

/// Set to `1` to never prompt, e.g. in scripts that pipe through a pty.
pub const NO_PROMPT_VAR: &str = "_CATALOG_ADMIN_NO_PROMPT";

#[derive(Debug, Clone)]
pub struct Confirm {
    pub default: Option<bool>,
}

pub struct Spinner<F>(F);
impl<F: Future> Spinner<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[derive(Debug, Clone)]
pub struct Dialog<'a, Type> {
    pub message: &'a str,
    pub help_message: Option<&'a str>,
    pub typed: Type,
}

impl Dialog<'_, Confirm> {
    pub async fn prompt(self) -> inquire::error::InquireResult<bool> {
        let message = self.message.to_owned();
        let help_message: Option<String> = self.help_message.map(ToOwned::to_owned);
        let default = self.typed.default;

        let answer = tokio::task::spawn_blocking(move || {
            let _stderr_lock = TERMINAL_STDERR.lock();

            let mut dialog = inquire::Confirm::new(&message).with_render_config(admin_theme());

            if let Some(default) = default {
                dialog = dialog.with_default(default);
            }

            if let Some(ref help_message) = help_message {
                dialog = dialog.with_help_message(help_message);
            }

            dialog.prompt()
        })
        .await;

        match answer {
            Ok(answer) => answer,
            Err(join_error) => Err(inquire::InquireError::Custom(Box::new(join_error))),
        }
    }
}

impl<F: Future> Dialog<'_, Spinner<F>> {
    /// Await the future, showing a spinner if it takes longer than `start_spinning_after`.
    pub async fn spin_with_delay(self, start_spinning_after: Duration) -> F::Output {
        let work = self.typed.0;
        tokio::pin!(work);

        tokio::select! {
            output = &mut work => return output,
            _ = tokio::time::sleep(start_spinning_after) => {},
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {wide_msg} {prefix:>}") {
            spinner.set_style(style);
        }
        spinner.set_message(self.message.to_string());
        if let Some(help_message) = self.help_message {
            spinner.set_prefix(help_message.to_string())
        }
        spinner.enable_steady_tick(Duration::from_millis(100));

        let output = work.await;
        spinner.finish_and_clear();
        output
    }

    pub async fn spin(self) -> F::Output {
        self.spin_with_delay(Duration::from_millis(300)).await
    }
}

impl Dialog<'_, ()> {
    /// True if stderr and stdin are ttys
    pub fn can_prompt() -> bool {
        if std::env::var(NO_PROMPT_VAR).is_ok_and(|v| v == "1") {
            return false;
        }
        std::io::stderr().is_tty() && std::io::stdin().is_tty()
    }
}

pub fn admin_theme() -> RenderConfig<'static> {
    let mut render_config = RenderConfig::default_colored();

    render_config.answered_prompt_prefix = Styled::new(">").with_fg(Color::LightMagenta);
    render_config.prompt_prefix = Styled::new("!").with_fg(Color::LightMagenta);
    render_config.prompt = StyleSheet::new().with_attr(Attributes::BOLD);
    render_config.help_message = Styled::new("").with_fg(Color::LightBlue).style;
    render_config.answer = Styled::new("").with_fg(Color::LightMagenta).style;

    render_config
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[tokio::test]
    async fn spinner_returns_output_of_fast_work() {
        let output = Dialog {
            message: "working",
            help_message: None,
            typed: Spinner::new(async { 42 }),
        }
        .spin()
        .await;
        assert_eq!(output, 42);
    }

    #[tokio::test]
    async fn spinner_returns_output_of_slow_work() {
        let output = Dialog {
            message: "working",
            help_message: Some("please wait"),
            typed: Spinner::new(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                "done"
            }),
        }
        .spin_with_delay(Duration::from_millis(1))
        .await;
        assert_eq!(output, "done");
    }

    #[test]
    #[serial]
    fn no_prompt_var_disables_prompts() {
        temp_env::with_var(NO_PROMPT_VAR, Some("1"), || {
            assert!(!Dialog::can_prompt());
        });
    }
}
