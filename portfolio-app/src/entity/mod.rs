pub mod prelude;

pub mod blog_category;
pub mod blog_post;
pub mod project;
pub mod project_category;
