mod accounts;
mod resources;
mod store;
mod vars;

pub use store::{run_migrations, PostgresStore};
