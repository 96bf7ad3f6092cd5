//! Dialoguer theme and banner for the interactive annotator.

use console::{style, Style};
use dialoguer::theme::ColorfulTheme;

/// Returns a `ColorfulTheme` with Vista's prompt styling.
///
/// - Prompt prefix: cyan `?`
/// - Active item indicator: cyan `▸`
/// - Success prefix: green `✓`
/// - Error prefix: red `✗`
pub fn vista_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("?".to_string()).for_stderr().cyan(),
        prompt_style: Style::new().for_stderr().bold(),
        prompt_suffix: style("›".to_string()).for_stderr().bright().black(),
        active_item_prefix: style("▸".to_string()).for_stderr().cyan(),
        active_item_style: Style::new().for_stderr().cyan(),
        success_prefix: style("✓".to_string()).for_stderr().green(),
        success_suffix: style("·".to_string()).for_stderr().bright().black(),
        error_prefix: style("✗".to_string()).for_stderr().red(),
        error_style: Style::new().for_stderr().red(),
        values_style: Style::new().for_stderr().green(),
        ..ColorfulTheme::default()
    }
}

/// Boxed banner with the version and the image being annotated, on stderr.
pub fn print_banner(subtitle: &str) {
    let version_line = format!("Vista annotator v{}", vista_core::VERSION);
    let inner_width = version_line.len().max(subtitle.chars().count()) + 4;

    let cyan = Style::new().for_stderr().cyan();
    eprintln!();
    eprintln!("{}", cyan.apply_to(format!("  ╔{:═<inner_width$}╗", "")));
    eprintln!("{}", cyan.apply_to(format!("  ║{version_line:^inner_width$}║")));
    eprintln!("{}", cyan.apply_to(format!("  ║{subtitle:^inner_width$}║")));
    eprintln!("{}", cyan.apply_to(format!("  ╚{:═<inner_width$}╝", "")));
    eprintln!();
}
