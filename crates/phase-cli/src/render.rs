//! Render de tablas de ancho fijo para la salida humana.

pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() && cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }

    let mut out = String::new();
    let header_line: Vec<String> = headers.iter()
                                          .enumerate()
                                          .map(|(i, h)| format!("{h:<width$}", width = widths[i]))
                                          .collect();
    out.push_str(&header_line.join("  "));
    out.push('\n');
    out.push_str(&widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
    out.push('\n');
    for row in rows {
        let line: Vec<String> = row.iter()
                                   .enumerate()
                                   .map(|(i, cell)| format!("{cell:<width$}", width = widths.get(i).copied().unwrap_or(0)))
                                   .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}
