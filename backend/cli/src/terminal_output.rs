//! Terminal output utilities: notes and table rendering.

// ---------------------------------------------------------------------------
// ANSI Color/Style helpers
// ---------------------------------------------------------------------------

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

/// Strip ANSI escape codes from a string.
pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

fn visible_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

// ---------------------------------------------------------------------------
// Formatted notes
// ---------------------------------------------------------------------------

pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}i{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}!{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}x{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}ok{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

/// A reply from the engine, as shown in the console.
pub fn bot_line(msg: &str) -> String {
    if supports_color() {
        format!("{GREEN}bot>{RESET} {msg}")
    } else {
        format!("bot> {msg}")
    }
}

pub fn dim(msg: &str) -> String {
    if supports_color() {
        format!("{DIM}{msg}{RESET}")
    } else {
        msg.to_string()
    }
}

// ---------------------------------------------------------------------------
// Table rendering
// ---------------------------------------------------------------------------

/// Render a left-aligned table. Widths count characters, so CJK ids line up
/// only approximately.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let num_cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| visible_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(num_cols) {
            widths[i] = widths[i].max(visible_width(cell));
        }
    }

    let pad = |s: &str, width: usize| format!("{s}{}", " ".repeat(width.saturating_sub(visible_width(s))));

    let mut out = String::new();
    let header: Vec<String> = headers.iter().enumerate().map(|(i, h)| pad(h, widths[i])).collect();
    out.push_str(&format!("  {}\n", header.join("  ").trim_end()));
    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("  {}\n", sep.join("  ")));
    for row in rows {
        let cells: Vec<String> = (0..num_cols)
            .map(|i| pad(row.get(i).map(String::as_str).unwrap_or(""), widths[i]))
            .collect();
        out.push_str(&format!("  {}\n", cells.join("  ").trim_end()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_ansi() {
        let colored = format!("{GREEN}hello{RESET}");
        assert_eq!(strip_ansi(&colored), "hello");
    }

    #[test]
    fn renders_table_with_aligned_columns() {
        let rows = vec![
            vec!["assistant_v2".to_string(), "2".to_string()],
            vec!["cat".to_string(), "0".to_string()],
        ];
        let table = render_table(&["ID", "Dialogs"], &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[3].starts_with("  cat           0"));
    }
}
