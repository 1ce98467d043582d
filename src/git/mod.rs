mod oracle;
mod repo;

pub use oracle::{Oracle, Walk};
pub use repo::GitRepo;
