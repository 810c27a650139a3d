mod installation;
mod user;

pub use installation::*;
pub use user::*;
