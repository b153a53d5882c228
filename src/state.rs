use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunState {
    pub lines: u64,
    pub skipped: u64,
    pub successful: u64,
    pub failed: u64,
    pub duplicates: u64,
    pub missing: u64,
    /// Audit runs always report `missing`, even when it stays at zero.
    pub audit: bool,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_audit() -> Self {
        Self {
            audit: true,
            ..Self::default()
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lines processed: {}, skipped rows: {}, successfully copied: {}, duplicates skipped: {}, failed: {}",
            self.lines, self.skipped, self.successful, self.duplicates, self.failed
        )?;
        if self.audit {
            write!(f, ", missing: {}", self.missing)?;
        }
        Ok(())
    }
}
