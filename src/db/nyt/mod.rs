pub mod connections_archive;
pub mod lib_nyt;
