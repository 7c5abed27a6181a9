use console::{Emoji, style};
use serde::Serialize;

pub static SUCCESS_ICON: Emoji<'_, '_> = Emoji("✅ ", "");
pub static ERROR_ICON: Emoji<'_, '_> = Emoji("❌ ", "");
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");

// Everything human-facing goes to stderr; stdout carries JSON only.

pub fn print_success(msg: &str) {
    eprintln!("{} {}", SUCCESS_ICON, style(msg).green());
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", ERROR_ICON, style(msg).red().bold());
}

pub fn print_status(label: &str, msg: &str) {
    eprintln!("  {} {}: {}", GEAR, style(label).bold().cyan(), msg);
}

/// Pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Titled list of commands for help output.
pub struct GuideSection {
    title: String,
    rows: Vec<(String, String)>,
}

impl GuideSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn command(mut self, name: &str, about: &str) -> Self {
        self.rows.push((name.to_string(), about.to_string()));
        self
    }

    pub fn print(&self) {
        eprintln!("\n {}", style(&self.title).bold().underlined());
        let width = self.rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        for (name, about) in &self.rows {
            let padded = format!("{:<width$}", name, width = width);
            eprintln!("   {}  {}", style(padded).green(), about);
        }
    }
}
