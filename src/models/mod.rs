pub mod repository;
pub mod commit;
pub mod event;
pub mod technology;
pub mod analysis;

pub use repository::*;
pub use commit::*;
pub use event::*;
pub use technology::*;
pub use analysis::*;
