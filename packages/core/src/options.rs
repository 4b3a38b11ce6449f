//! Options for opening a byte channel.

use crate::Error;

/// How a channel is opened.
///
/// Mirrors `std::fs::OpenOptions`, consuming and returning `self` so the
/// calls chain:
///
/// ```rust
/// use kvfs_core::OpenOptions;
///
/// let options = OpenOptions::new().write(true).create(true);
/// assert!(options.is_write());
/// ```
///
/// With neither `write` nor `append` set, the channel is read-only.
/// `append` implies `write`. `create`, `create_new` and `truncate` only
/// apply to writable channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptions {
    read: bool,
    write: bool,
    append: bool,
    create: bool,
    create_new: bool,
    truncate: bool,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    #[must_use]
    pub fn write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    /// Start writing at the current end of the value.
    #[must_use]
    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Create the key if it does not exist.
    #[must_use]
    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Create the key, failing if it already exists.
    #[must_use]
    pub fn create_new(mut self, create_new: bool) -> Self {
        self.create_new = create_new;
        self
    }

    /// Replace an existing value with an empty one on open.
    #[must_use]
    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    pub fn is_read(&self) -> bool {
        self.read || !self.is_write()
    }

    pub fn is_write(&self) -> bool {
        self.write || self.append
    }

    pub fn is_append(&self) -> bool {
        self.append
    }

    pub(crate) fn creates(&self) -> bool {
        self.is_write() && (self.create || self.create_new)
    }

    pub(crate) fn creates_new(&self) -> bool {
        self.is_write() && self.create_new
    }

    pub(crate) fn truncates(&self) -> bool {
        self.is_write() && self.truncate
    }

    /// Reject contradictory combinations.
    pub fn validate(&self) -> Result<(), Error> {
        if self.append && self.truncate {
            return Err(Error::invalid_argument("append and truncate are exclusive"));
        }
        if self.append && self.read {
            return Err(Error::invalid_argument("append and read are exclusive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_read_only() {
        let options = OpenOptions::new();
        assert!(options.is_read());
        assert!(!options.is_write());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn append_implies_write() {
        let options = OpenOptions::new().append(true);
        assert!(options.is_write());
        assert!(!options.is_read());
        assert!(options.is_append());
    }

    #[test]
    fn read_write() {
        let options = OpenOptions::new().read(true).write(true);
        assert!(options.is_read());
        assert!(options.is_write());
    }

    #[test]
    fn create_flags_need_write() {
        let options = OpenOptions::new().create(true).truncate(true);
        assert!(!options.creates());
        assert!(!options.truncates());

        let options = options.write(true);
        assert!(options.creates());
        assert!(options.truncates());
        assert!(!options.creates_new());
    }

    #[test]
    fn contradictions_rejected() {
        assert!(OpenOptions::new().append(true).truncate(true).validate().is_err());
        assert!(OpenOptions::new().append(true).read(true).validate().is_err());
    }
}
