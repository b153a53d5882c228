/// Only adjacent repeats are caught.
#[derive(Debug, Default)]
pub struct DuplicateGuard {
    last: Option<u64>,
}

impl DuplicateGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_duplicate(&mut self, id: u64) -> bool {
        if self.last == Some(id) {
            return true;
        }
        self.last = Some(id);
        false
    }

    pub fn last(&self) -> Option<u64> {
        self.last
    }
}
