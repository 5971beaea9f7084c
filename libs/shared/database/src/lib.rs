pub mod error;
pub mod patch;
pub mod query;
pub mod supabase;

pub use error::DatabaseError;
pub use patch::Patch;
pub use query::{condition, contains_pattern, escape_like, QueryBuilder};
pub use supabase::SupabaseClient;
