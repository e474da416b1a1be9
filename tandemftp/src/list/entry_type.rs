/// Describes the kind of a directory entry.
/// The target of a symlink, when the listing reports it, is kept on the [`super::Entry`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EntryType {
    /// Regular file, or anything which is neither a directory nor a link
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
}

impl EntryType {
    /// Returns whether the entry is a directory
    pub fn is_directory(&self) -> bool {
        matches!(self, EntryType::Directory)
    }

    /// Returns whether the entry is a file
    pub fn is_file(&self) -> bool {
        matches!(self, EntryType::File)
    }

    /// Returns whether the entry is a symlink
    pub fn is_symlink(&self) -> bool {
        matches!(self, EntryType::Symlink)
    }
}
