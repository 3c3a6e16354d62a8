pub mod directory;

pub use directory::{find_doctor, search_doctors, search_hospitals, DirectoryService};
