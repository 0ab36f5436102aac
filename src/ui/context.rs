//! Terminal detection for feed command output

use std::io::IsTerminal;

/// Environment variables set by common CI runners
const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
    "BUILDKITE",
    "TEAMCITY_VERSION",
    "TF_BUILD",
];

/// How command results are rendered on stdout
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    fancy: bool,
}

impl UiContext {
    /// Fancy output needs stdout on a terminal outside CI. Logs go to
    /// stderr and nothing prompts, so stdin is not consulted.
    pub fn detect() -> Self {
        let fancy = std::io::stdout().is_terminal() && !Self::in_ci();
        if std::env::var_os("NO_COLOR").is_some() {
            console::set_colors_enabled(false);
        }
        Self { fancy }
    }

    /// Plain line-oriented output, used when piping and in tests
    pub fn plain() -> Self {
        Self { fancy: false }
    }

    /// Spinners and cliclack framing
    pub fn use_fancy_output(&self) -> bool {
        self.fancy
    }

    fn in_ci() -> bool {
        CI_VARS.iter().any(|var| std::env::var_os(var).is_some())
    }
}
