pub use super::blog_category::Entity as BlogCategory;
pub use super::blog_post::Entity as BlogPost;
pub use super::project::Entity as Project;
pub use super::project_category::Entity as ProjectCategory;
