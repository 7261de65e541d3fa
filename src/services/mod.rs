pub mod blog;
pub mod form;

pub use blog::BlogRepository;
pub use form::BlogForm;
