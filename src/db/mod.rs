pub mod nyt;
pub mod prod_db;
