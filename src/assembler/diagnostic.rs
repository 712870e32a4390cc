use crate::error::assembler::AssemblerError;
use colored::Colorize;
use std::fmt::Write;

/// Renders an error with a pointer into the offending source line.
pub fn render(err: &AssemblerError) -> String {
    let mut diag = String::new();
    let AssemblerError::Source { location, kind } = err else {
        let _ = write!(diag, "{} {}", "error:".red().bold(), err);
        return diag;
    };

    let _ = writeln!(diag, "{} {}", "error:".red().bold(), kind);
    let _ = writeln!(
        diag,
        " {} {}:{}:{}",
        "-->".blue().bold(),
        location.file,
        location.line,
        location.column
    );
    if !location.text.is_empty() {
        let gutter = "|".blue().bold();
        let underline = " ".repeat(location.column.saturating_sub(1));
        let _ = writeln!(diag, "     {}", gutter);
        let _ = writeln!(diag, "{:>4} {} {}", location.line, gutter, location.text.trim_end());
        let _ = write!(diag, "     {} {}{}", gutter, underline, "^".red().bold());
    }
    diag
}
