/// Minimal CSV writer for report downloads.
#[derive(Debug, Default)]
pub struct CsvWriter {
    buffer: String,
}

impl CsvWriter {
    pub fn with_header(columns: &[&str]) -> Self {
        let mut writer = CsvWriter::default();
        writer.write_row(columns.iter().copied());
        writer
    }

    pub fn write_row<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) {
        let line = fields.into_iter().map(escape_field).collect::<Vec<_>>().join(",");
        self.buffer.push_str(&line);
        self.buffer.push_str("\r\n");
    }

    pub fn finish(self) -> String {
        self.buffer
    }
}

/// Quotes fields holding separators or quotes, and neutralizes spreadsheet formulas.
pub fn escape_field(field: &str) -> String {
    let field = if field.starts_with(['=', '+', '-', '@']) {
        format!("'{field}")
    } else {
        field.to_string()
    };
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_and_formula_prefixes_are_escaped() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("=cmd()"), "'=cmd()");
    }

    #[test]
    fn rows_are_crlf_terminated() {
        let mut csv = CsvWriter::with_header(&["a", "b"]);
        csv.write_row(["1", "x,y"]);
        assert_eq!(csv.finish(), "a,b\r\n1,\"x,y\"\r\n");
    }
}
