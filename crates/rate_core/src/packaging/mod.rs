//! Packaging of converted sets: filtered asset copy, staged-file moves,
//! zip archives and archive import.

mod archive;
mod copy;
mod error;
mod packager;

pub use archive::{create_archive, extract_archive, list_archive};
pub use copy::{
    copy_tree_filtered, has_extension, is_partial_name, move_file, remove_dir_quietly,
    remove_file_quietly, PARTIAL_PREFIX,
};
pub use error::{PackagingError, PackagingResult};
pub use packager::{PackageRequest, Packager};
