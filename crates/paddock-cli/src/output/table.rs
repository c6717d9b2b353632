use anyhow::Result;
use owo_colors::OwoColorize;
use std::io::Write;

/// Column-aligned text table that can also be written as CSV
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }
        widths
    }

    pub fn render(&self, color: bool) -> String {
        let widths = self.widths();
        let line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{:<width$}", cell, width = w))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let header = line(&self.headers);
        let mut out = if color {
            format!("{}\n", header.bold())
        } else {
            format!("{}\n", header)
        };
        for row in &self.rows {
            out.push_str(&line(row));
            out.push('\n');
        }
        out
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn print_csv(&self) -> Result<()> {
        self.write_csv(std::io::stdout().lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new(["Pos", "Driver", "Team"]);
        table.row(["1", "LEC", "Ferrari"]);
        table.row(["10", "VER", "Red Bull Racing"]);
        table
    }

    #[test]
    fn test_render_aligns_columns() {
        insta::assert_snapshot!(sample().render(false), @r"
        Pos  Driver  Team
        1    LEC     Ferrari
        10   VER     Red Bull Racing
        ");
    }

    #[test]
    fn test_csv_quotes_when_needed() {
        let mut table = Table::new(["driver", "team"]);
        table.row(["PER", "Red Bull, Racing"]);
        let mut buf = Vec::new();
        table.write_csv(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "driver,team\nPER,\"Red Bull, Racing\"\n"
        );
    }
}
