//! Terminal output for the CLI. Everything goes to stderr.

use std::fmt::Display;

use console::{Style, Term};

pub(crate) struct Output {
    term: Term,
    label: Style,
    ok: Style,
    failed: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            label: Style::new().dim(),
            ok: Style::new().green(),
            failed: Style::new().red().bold(),
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    /// Print the address the server is about to listen on.
    pub(crate) fn listening(&self, host: &str, port: u16) {
        self.line(&format!(
            "web2050 listening on {}",
            self.ok.apply_to(format_args!("http://{host}:{port}"))
        ));
    }

    /// Print an indented `label value` line.
    pub(crate) fn field(&self, label: &str, value: impl Display) {
        self.line(&format!("  {:<10} {value}", self.label.apply_to(label)));
    }

    pub(crate) fn note(&self, text: &str) {
        self.line(&format!("  {}", self.label.apply_to(text)));
    }

    pub(crate) fn deleted(&self, key: &str) {
        self.line(&format!("{} {key}", self.ok.apply_to("deleted")));
    }

    pub(crate) fn failure(&self, err: &dyn Display) {
        self.line(&format!("{} {err}", self.failed.apply_to("error:")));
    }
}
