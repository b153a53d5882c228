use crate::error::RecordError;

pub fn parse_columns<'a>(line: &'a str, delimiter: &str) -> Vec<&'a str> {
    line.split(delimiter).collect()
}

#[derive(Debug)]
pub struct Record<'a> {
    pub line: &'a str,
    pub columns: Vec<&'a str>,
}

impl<'a> Record<'a> {
    pub fn parse(line: &'a str, delimiter: &str) -> Self {
        Self {
            line,
            columns: parse_columns(line, delimiter),
        }
    }

    /// A blank line splits into one empty column and carries no record.
    pub fn is_empty(&self) -> bool {
        matches!(self.columns.as_slice(), [only] if only.is_empty())
    }

    pub fn column(&self, index: usize) -> Result<&'a str, RecordError> {
        self.columns
            .get(index)
            .copied()
            .ok_or(RecordError::MissingColumn {
                index,
                available: self.columns.len(),
            })
    }

    pub fn object_id(&self, index: usize) -> Result<u64, RecordError> {
        let value = self.column(index)?;
        value
            .parse::<u64>()
            .map_err(|_| RecordError::MalformedRecord {
                value: value.to_string(),
            })
    }

    pub fn project(&self, indices: &[usize], delimiter: &str) -> Result<String, RecordError> {
        let picked = indices
            .iter()
            .map(|&index| self.column(index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(picked.join(delimiter))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionPolicy {
    Static(String),
    Column(usize),
    Bare,
}

impl ExtensionPolicy {
    pub fn new(fixed: &str, column: Option<usize>) -> Self {
        match (fixed.is_empty(), column) {
            (false, _) => ExtensionPolicy::Static(fixed.to_string()),
            (true, Some(index)) => ExtensionPolicy::Column(index),
            (true, None) => ExtensionPolicy::Bare,
        }
    }

    pub fn extension<'r>(&'r self, record: &Record<'r>) -> Result<&'r str, RecordError> {
        match self {
            ExtensionPolicy::Static(ext) => Ok(ext.as_str()),
            ExtensionPolicy::Column(index) => record.column(*index),
            ExtensionPolicy::Bare => Ok(""),
        }
    }
}
