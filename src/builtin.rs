mod logger;
mod recovery;
mod static_serve;

pub use logger::Logger;
pub use recovery::Recovery;
pub use static_serve::StaticFiles;
