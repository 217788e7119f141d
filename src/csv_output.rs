//! CSV rendering for statistics tables

/// One CSV table: a header row and data rows of already-formatted fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Create an empty table with the given column names
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a data row
    pub fn add_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.header.len());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn push_row(output: &mut String, fields: &[String]) {
        output.push_str(&fields.join(","));
        output.push('\n');
    }

    /// Header line followed by one line per row
    ///
    /// Fields are column names and numbers, which never need quoting.
    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        Self::push_row(&mut output, &self.header);
        for row in &self.rows {
            Self::push_row(&mut output, row);
        }
        output
    }
}

/// Format a density or deviation with four decimals
pub fn format_real(value: f64) -> String {
    format!("{:.4}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_header_only() {
        let table = CsvTable::new(["NumBlocks", "Average"]);
        assert_eq!(table.to_csv(), "NumBlocks,Average\n");
        assert!(table.is_empty());
    }

    #[test]
    fn test_csv_rows() {
        let mut table = CsvTable::new(["BlockSize", "Average", "StandardDeviation"]);
        table.add_row(vec!["784".into(), format_real(0.6525), format_real(0.0124)]);
        table.add_row(vec!["625".into(), format_real(0.65), format_real(0.0)]);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.to_csv(),
            "BlockSize,Average,StandardDeviation\n784,0.6525,0.0124\n625,0.6500,0.0000\n"
        );
    }

    #[test]
    fn test_csv_fields_are_written_verbatim() {
        let mut table = CsvTable::new(["Block", "PercentageOfOnes"]);
        table.add_row(vec!["0".into(), format_real(-0.5)]);
        assert_eq!(table.to_csv(), "Block,PercentageOfOnes\n0,-0.5000\n");
    }

    #[test]
    fn test_format_real_rounds() {
        assert_eq!(format_real(0.123456), "0.1235");
        assert_eq!(format_real(1.0), "1.0000");
    }
}
