mod id;
mod lenient;
mod media;
mod project;
mod response;
mod task;
mod user;

pub use id::*;
pub use lenient::parse_date;
pub use media::*;
pub use project::*;
pub use response::*;
pub use task::*;
pub use user::*;
