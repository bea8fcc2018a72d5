//! Output formatting helpers for human-readable CLI output.

use std::io::Write;

/// Print a table with aligned columns.
///
/// `headers` and each row in `rows` must have the same length.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }

    let col_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:<width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_line.join("  "));

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .take(col_count)
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect();
        println!("{}", line.join("  "));
    }
}

/// Print a labeled value, aligned for scanning.
pub fn print_field(label: &str, value: impl std::fmt::Display) {
    println!("{label:<24}{value}");
}

/// Ask the operator to confirm a destructive action by typing the expected
/// phrase. Returns false (and prints a note) on anything else.
pub fn confirm(prompt: &str, expected: &str) -> bool {
    print!("{prompt} [type '{expected}' to continue]: ");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    if line.trim() == expected {
        true
    } else {
        println!("aborted");
        false
    }
}
