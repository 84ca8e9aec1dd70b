pub mod parent;

pub use parent::ParentService;
