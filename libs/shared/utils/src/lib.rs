pub mod jwt;
pub mod test_utils;
pub mod view_scope;

pub use view_scope::ViewScope;
