use regex::Regex;
use tracing::trace;

use crate::record::{Record, RecordSchema};
use crate::{Error, Result};

/// The configured line pattern, compiled once per run.
///
/// A line matches only when the pattern matches starting at its first byte
/// and every named group captured something. Anything else is a non-match,
/// never an error. One trailing newline is dropped before matching, so `$`
/// still matches a text node that ends the line with `\n`.
#[derive(Debug, Clone)]
pub struct LinePattern {
    regex: Regex,
    schema: RecordSchema,
}

impl LinePattern {
    /// Compiles `source` and checks that its named groups are exactly the
    /// fields of `schema`.
    pub fn compile(source: &str, schema: &RecordSchema) -> Result<Self> {
        let regex = Regex::new(source)?;

        let groups: Vec<&str> = regex.capture_names().flatten().collect();
        if groups.is_empty() {
            return Err(Error::Configuration(format!(
                "pattern '{source}' has no named capture groups"
            )));
        }

        if let Some(unknown) = groups.iter().find(|g| !schema.has_field(g)) {
            return Err(Error::Configuration(format!(
                "pattern group '{unknown}' is not a field of record type '{}'",
                schema.name
            )));
        }

        if let Some(missing) = schema.fields.iter().find(|f| !groups.contains(&f.as_str())) {
            return Err(Error::Configuration(format!(
                "record type '{}' field '{missing}' has no pattern group",
                schema.name
            )));
        }

        Ok(Self {
            regex,
            schema: schema.clone(),
        })
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn match_line(&self, line: &str) -> Option<Record> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let captures = self.regex.captures(line)?;
        if captures.get(0).map_or(true, |m| m.start() != 0) {
            trace!(line, "match does not start at line start");
            return None;
        }

        let mut pairs = Vec::with_capacity(self.schema.fields.len());
        for field in &self.schema.fields {
            let Some(value) = captures.name(field) else {
                trace!(line, field = field.as_str(), "group left unset");
                return None;
            };
            pairs.push((field.as_str(), value.as_str()));
        }

        self.schema.record(pairs).ok()
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.match_line(line).is_some()
    }
}
