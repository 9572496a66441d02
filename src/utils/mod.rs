pub mod cancel;
pub mod ident;

pub use cancel::CancellationToken;
