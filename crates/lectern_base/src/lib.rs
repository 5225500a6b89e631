/* 📖 # What lives in lectern_base?

lectern_base holds everything the book engine needs from its surroundings: the error type,
tracing setup, and the platform abstraction layer (filesystem access and the HTTP server).
The engine only ever talks to the outside world through these types.
*/

pub mod error;
pub mod pal;
pub mod tracing;

pub use error::{ErrorKind, LecternError, LecternResult, ResultExt};
pub use pal::{FilePath, MockPal, Pal, PalHandle, RealPal};
