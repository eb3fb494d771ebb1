pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use router::blog_routes;
pub use services::blog::BlogService;
